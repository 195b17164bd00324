//! Tactical reading: atari status, ladder chases, CFG distance.

use crate::constants::*;
use crate::engine::Engine;
use crate::position::{
    all_neighbors, compute_block, line_height, neighbors, play_move, Point, Position,
};

/// Result of `fix_atari`: whether the block at the queried point is in
/// atari, plus capture-or-escape candidate moves paired with the size
/// of the block each one captures or saves.
#[derive(Debug, Default)]
pub struct AtariStatus {
    pub in_atari: bool,
    pub moves: Vec<Point>,
    pub sizes: Vec<usize>,
}

impl AtariStatus {
    fn push(&mut self, mv: Point, size: usize) {
        if !self.moves.contains(&mv) {
            self.moves.push(mv);
            self.sizes.push(size);
        }
    }
}

/// Atari and capture analysis of the block at `pt`.
///
/// - An opponent block in atari yields its liberty as a capture.
/// - An opponent block on exactly two liberties is read as a ladder
///   when `twolib_test` is set (with `twolib_edgeonly` restricting the
///   expensive read to first-line liberties), and a working attack is
///   reported as a capture threat.
/// - For an own block in atari, the counter-capture liberties of
///   adjacent opponent blocks in atari come first, then the escape on
///   the last liberty, provided the escape gains at least two
///   liberties and, when it gains exactly two, does not run into a
///   working ladder.
///
/// `singlept_ok` skips lone stones entirely: they are not worth saving
/// in a playout.
pub fn fix_atari(
    eng: &mut Engine,
    pos: &Position,
    pt: Point,
    singlept_ok: bool,
    twolib_test: bool,
    twolib_edgeonly: bool,
) -> AtariStatus {
    fix_atari_at(eng, pos, pt, singlept_ok, twolib_test, twolib_edgeonly, 0)
}

fn fix_atari_at(
    eng: &mut Engine,
    pos: &Position,
    pt: Point,
    singlept_ok: bool,
    twolib_test: bool,
    twolib_edgeonly: bool,
    depth: usize,
) -> AtariStatus {
    let mut status = AtariStatus::default();
    let (stones, libs) = compute_block(eng, pos, pt, 3);
    let size = stones.len();

    if singlept_ok && size == 1 {
        return status;
    }

    if libs.len() >= 2 {
        if twolib_test
            && libs.len() == 2
            && size > 1
            && (!twolib_edgeonly || (line_height(libs[0]) == 0 && line_height(libs[1]) == 0))
        {
            if let Some(attack) = read_ladder_attack_at(eng, pos, pt, libs[0], libs[1], depth) {
                status.push(attack, size);
            }
        }
        return status;
    }

    status.in_atari = true;
    let lib = libs[0];

    if pos.color[pt] == OPPONENT {
        status.push(lib, size);
        return status;
    }

    // Counter-capture: a neighboring opponent block in atari buys the
    // surrounded block a tempo.
    let mut scanned: Vec<Point> = Vec::new();
    for &s in &stones {
        for q in neighbors(s) {
            if pos.color[q] != OPPONENT || scanned.contains(&q) {
                continue;
            }
            let (other_stones, other_libs) = compute_block(eng, pos, q, 2);
            scanned.extend_from_slice(&other_stones);
            if other_libs.len() == 1 {
                status.push(other_libs[0], other_stones.len());
            }
        }
    }

    // Escape on the last liberty, if it actually buys liberties.
    let mut escaped = pos.clone();
    if play_move(eng, &mut escaped, lib).is_ok() {
        let (_, new_libs) = compute_block(eng, &escaped, lib, 3);
        let runs_into_ladder = new_libs.len() == 2
            && read_ladder_attack_at(eng, &escaped, lib, new_libs[0], new_libs[1], depth).is_some();
        if new_libs.len() >= 2 && !runs_into_ladder {
            status.push(lib, size);
        }
    }

    status
}

/// Try to capture a two-liberty block in a ladder.
///
/// For each liberty: play it, then ask `fix_atari` (without the
/// two-liberty analysis, so the chase stays single-minded) whether the
/// block is now in atari with no way out. The recursion through the
/// escape test reads the whole ladder; it terminates because every
/// level fills a point of a copied board.
pub fn read_ladder_attack(
    eng: &mut Engine,
    pos: &Position,
    pt: Point,
    l1: Point,
    l2: Point,
) -> Option<Point> {
    read_ladder_attack_at(eng, pos, pt, l1, l2, 0)
}

fn read_ladder_attack_at(
    eng: &mut Engine,
    pos: &Position,
    pt: Point,
    l1: Point,
    l2: Point,
    depth: usize,
) -> Option<Point> {
    debug_assert!(depth <= N * N, "runaway ladder recursion");
    for lib in [l1, l2] {
        let mut chased = pos.clone();
        if play_move(eng, &mut chased, lib).is_err() {
            continue;
        }
        let answer = fix_atari_at(eng, &chased, pt, false, false, false, depth + 1);
        if answer.in_atari && answer.moves.is_empty() {
            return Some(lib);
        }
    }
    None
}

/// Distance map from `src` in the common-fate graph: stepping within a
/// same-color block is free, any other step costs one. Unreachable and
/// OUT points stay at -1.
pub fn cfg_distances(pos: &Position, src: Point) -> Vec<i32> {
    let mut dist = vec![-1i32; BOARDSIZE];
    let mut queue = Vec::with_capacity(BOARDSIZE);
    dist[src] = 0;
    queue.push(src);
    let mut head = 0;
    while head < queue.len() {
        let pt = queue[head];
        head += 1;
        for q in all_neighbors(pt) {
            let c = pos.color[q];
            if c == OUT {
                continue;
            }
            let step = if c != EMPTY && c == pos.color[pt] { 0 } else { 1 };
            let d = dist[pt] + step;
            if dist[q] < 0 || d < dist[q] {
                dist[q] = d;
                queue.push(q);
            }
        }
    }
    dist
}
