//! Heuristic playouts.
//!
//! A playout plays to two consecutive passes (or the game-length cap),
//! choosing moves from three sources in order of preference: captures
//! around the last two moves, 3x3 pattern replies there, then a random
//! sweep of the board. Suggested and random moves alike are rolled
//! against a self-atari check and undone when rejected.

use crate::constants::*;
use crate::engine::Engine;
use crate::position::{
    all_neighbors, env8, is_eye, is_eyeish, pass_move, play_move, str_coord, undo_move, Point,
    Position,
};
use crate::sets::PointList;
use crate::tactics::fix_atari;

/// Run one playout. Returns the score from the perspective of the side
/// to move at entry. `amaf` records who first played each point (+1
/// Black, -1 White); `owner` accumulates final ownership per point.
pub fn mcplayout(
    eng: &mut Engine,
    pos: &mut Position,
    amaf: &mut [i8; BOARDSIZE],
    mut owner: Option<&mut [i32; BOARDSIZE]>,
    disp: bool,
) -> f64 {
    let start_n = pos.n;
    let mut passes = 0;
    let mut moves = PointList::with_capacity(BOARDSIZE);
    let mut sizes: Vec<usize> = Vec::new();

    while passes < 2 && pos.n < MAX_GAME_LEN {
        let mut chosen = None;
        let local = last_moves_neighbors(eng, pos);

        moves.clear();
        sizes.clear();
        gen_capture_moves(
            eng,
            pos,
            local.as_slice(),
            PROB_HEURISTIC_CAPTURE,
            false,
            &mut moves,
            &mut sizes,
        );
        if !moves.is_empty() {
            chosen = choose_from(eng, pos, moves.as_slice(), PROB_SSAREJECT, disp, "capture");
        }

        if chosen.is_none() {
            moves.clear();
            gen_pat3_moves(eng, pos, local.as_slice(), PROB_HEURISTIC_PAT3, &mut moves);
            if !moves.is_empty() {
                chosen = choose_from(eng, pos, moves.as_slice(), PROB_SSAREJECT, disp, "pat3");
            }
        }

        if chosen.is_none() {
            moves.clear();
            gen_random_moves(eng, pos, &mut moves);
            chosen = choose_from(eng, pos, moves.as_slice(), PROB_RSAREJECT, disp, "random");
        }

        match chosen {
            Some(mv) => {
                // the move is already on the board; its ply is n-1
                if amaf[mv] == 0 {
                    amaf[mv] = if (pos.n - 1) % 2 == 0 { 1 } else { -1 };
                }
                passes = 0;
            }
            None => {
                pass_move(pos);
                passes += 1;
            }
        }
    }

    let outcome = score(pos);
    if let Some(owner) = owner.as_deref_mut() {
        accumulate_owner(pos, owner);
    }
    if disp {
        log::debug!("playout ended at ply {} with score {outcome:.1}", pos.n);
    }
    if start_n % 2 != pos.n % 2 {
        -outcome
    } else {
        outcome
    }
}

/// The shuffled neighborhoods of the last two moves, the last move's
/// group first: the focus of the cheap in-playout tactics.
pub fn last_moves_neighbors(eng: &mut Engine, pos: &Position) -> PointList {
    let mut local = PointList::with_capacity(20);
    for anchor in [pos.last, pos.last2] {
        if anchor == PASS_MOVE {
            continue;
        }
        let mut group = PointList::with_capacity(9);
        group.push(anchor);
        for q in all_neighbors(anchor) {
            if pos.color[q] != OUT {
                group.push(q);
            }
        }
        group.shuffle(&mut eng.rng);
        for &pt in group.iter() {
            local.insert(pt);
        }
    }
    local
}

/// Capture-or-save moves for every block touching the point set. With
/// probability `1 - prob` the whole source is skipped. `expensive_ok`
/// admits ladder reading away from the board edge.
pub fn gen_capture_moves(
    eng: &mut Engine,
    pos: &Position,
    set: &[Point],
    prob: f64,
    expensive_ok: bool,
    moves: &mut PointList,
    sizes: &mut Vec<usize>,
) {
    if eng.rng.float01() > prob {
        return;
    }
    eng.suggested.clear();
    for &pt in set {
        if pos.color[pt] != TO_PLAY && pos.color[pt] != OPPONENT {
            continue;
        }
        let status = fix_atari(eng, pos, pt, false, true, !expensive_ok);
        for (i, &mv) in status.moves.iter().enumerate() {
            if !eng.suggested.is_marked(mv) {
                eng.suggested.mark(mv);
                moves.push(mv);
                sizes.push(status.sizes[i]);
            }
        }
    }
}

/// Empty points of the set matching a 3x3 pattern. With probability
/// `1 - prob` the whole source is skipped.
pub fn gen_pat3_moves(
    eng: &mut Engine,
    pos: &Position,
    set: &[Point],
    prob: f64,
    moves: &mut PointList,
) {
    if eng.rng.float01() > prob {
        return;
    }
    for &pt in set {
        if pos.color[pt] == EMPTY && eng.pat3.matches(env8(pos, pt)) {
            moves.push(pt);
        }
    }
}

/// Every empty non-self-eye point, scanned from a random start so the
/// fallback does not favor the top of the board.
pub fn gen_random_moves(eng: &mut Engine, pos: &Position, moves: &mut PointList) {
    let span = (BOARD_MAX - BOARD_MIN) as u32;
    let start = BOARD_MIN + eng.rng.below(span) as usize;
    let consider = |pt: Point, moves: &mut PointList| {
        if pos.color[pt] == EMPTY && is_eye(pos, pt) != TO_PLAY {
            moves.push(pt);
        }
    };
    for pt in start..BOARD_MAX {
        consider(pt, moves);
    }
    for pt in BOARD_MIN..start {
        consider(pt, moves);
    }
}

/// Play the first acceptable move of the list on `pos` and return it.
///
/// Illegal candidates are skipped; a legal one is rolled against the
/// rejection probability and taken back if it leaves the mover's stone
/// needing rescue. Moves capturing more than one stone are accepted
/// outright — they are never losing in a playout, and single-level
/// undo does not cover them.
fn choose_from(
    eng: &mut Engine,
    pos: &mut Position,
    moves: &[Point],
    reject_prob: f64,
    disp: bool,
    source: &str,
) -> Option<Point> {
    for &mv in moves {
        let Ok(receipt) = play_move(eng, pos, mv) else {
            continue;
        };
        if receipt.captured <= 1 && eng.rng.float01() <= reject_prob {
            let status = fix_atari(eng, pos, mv, true, true, true);
            if !status.moves.is_empty() {
                if disp {
                    log::debug!("rejected self-atari {} ({source})", str_coord(mv));
                }
                undo_move(pos, &receipt);
                continue;
            }
        }
        if disp {
            log::debug!("played {} ({source})", str_coord(mv));
        }
        return Some(mv);
    }
    None
}

/// Area score of a finished position from the side to move: stones
/// plus single-color surrounded empty points, komi against Black.
pub fn score(pos: &Position) -> f64 {
    let mut total = if pos.n % 2 == 0 {
        -pos.komi as f64
    } else {
        pos.komi as f64
    };
    for pt in BOARD_MIN..BOARD_MAX {
        let c = pos.color[pt];
        let owner = if c == EMPTY { is_eyeish(pos, pt) } else { c };
        match owner {
            TO_PLAY => total += 1.0,
            OPPONENT => total -= 1.0,
            _ => {}
        }
    }
    total
}

/// Fold the final position into the per-point ownership map, positive
/// for Black.
fn accumulate_owner(pos: &Position, owner: &mut [i32; BOARDSIZE]) {
    let black_is_to_play = pos.n % 2 == 0;
    for pt in BOARD_MIN..BOARD_MAX {
        let c = pos.color[pt];
        let holder = if c == EMPTY { is_eyeish(pos, pt) } else { c };
        let delta = match holder {
            TO_PLAY => 1,
            OPPONENT => -1,
            _ => continue,
        };
        owner[pt] += if black_is_to_play { delta } else { -delta };
    }
}

/// Mean and standard deviation of `games` playout scores from the
/// empty board, from Black's perspective. A cheap sanity check and
/// speed benchmark.
pub fn mcbenchmark(eng: &mut Engine, games: usize) -> (f64, f64) {
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let mut amaf = Box::new([0i8; BOARDSIZE]);
    for i in 0..games {
        amaf.fill(0);
        let mut pos = Position::new();
        let s = mcplayout(eng, &mut pos, &mut amaf, None, false);
        sum += s;
        sum_sq += s * s;
        if (i + 1) % 500 == 0 {
            log::info!("benchmark: {} playouts done", i + 1);
        }
    }
    let mean = sum / games as f64;
    let var = (sum_sq / games as f64 - mean * mean).max(0.0);
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::parse_coord;

    #[test]
    fn playout_terminates_consistently() {
        let mut eng = Engine::new(7);
        let mut pos = Position::new();
        let mut amaf = Box::new([0i8; BOARDSIZE]);
        let s = mcplayout(&mut eng, &mut pos, &mut amaf, None, false);
        assert!(s.is_finite());
        assert!(pos.n >= 2, "a playout plays at least the final passes");
        assert!(pos.n <= MAX_GAME_LEN + 2);
        assert!(crate::position::env_ok(&pos));
    }

    #[test]
    fn playout_is_deterministic_under_seed() {
        let run = |seed| {
            let mut eng = Engine::new(seed);
            let mut pos = Position::new();
            let mut amaf = Box::new([0i8; BOARDSIZE]);
            let s = mcplayout(&mut eng, &mut pos, &mut amaf, None, false);
            (s, pos.n)
        };
        assert_eq!(run(123), run(123));
    }

    #[test]
    fn amaf_records_first_player_only() {
        let mut eng = Engine::new(5);
        let mut pos = Position::new();
        let mut amaf = Box::new([0i8; BOARDSIZE]);
        mcplayout(&mut eng, &mut pos, &mut amaf, None, false);
        let marked = amaf.iter().filter(|&&v| v != 0).count();
        assert!(marked > 0, "someone must have played");
        for pt in 0..BOARDSIZE {
            if !(BOARD_MIN..BOARD_MAX).contains(&pt) {
                assert_eq!(amaf[pt], 0, "no AMAF outside the board");
            }
        }
    }

    #[test]
    fn score_counts_area_and_komi() {
        let mut eng = Engine::new(1);
        let mut pos = Position::new();
        // lone black stone: Black to move sees one point minus komi
        crate::position::play_move(&mut eng, &mut pos, parse_coord("E5").unwrap()).unwrap();
        pass_move(&mut pos);
        // back to Black's view: the stone counts +1, komi counts -7.5
        assert_eq!(score(&pos), 1.0 - 7.5);
        // from White's view the same board is the negation
        pass_move(&mut pos);
        assert_eq!(score(&pos), 7.5 - 1.0);
    }

    #[test]
    fn eyeish_territory_is_attributed() {
        let mut eng = Engine::new(1);
        let mut pos = Position::new();
        // black diamond owns E5 as territory
        for mv in ["E4", "A1", "E6", "pass", "D5", "pass", "F5"] {
            let pt = parse_coord(mv).unwrap();
            play_move(&mut eng, &mut pos, pt).unwrap();
        }
        // Black: 4 stones + 1 territory point; White: 1 stone (A1)
        // White to move: score = komi + 1 - 5
        assert_eq!(score(&pos), 7.5 + 1.0 - 5.0);
    }

    #[test]
    fn random_moves_skip_own_eyes() {
        let mut eng = Engine::new(1);
        let mut pos = Position::new();
        // Black diamond plus clean diagonals around E5, Black to move.
        for mv in ["E4", "A1", "E6", "pass", "D5", "pass", "F5", "pass"] {
            let pt = parse_coord(mv).unwrap();
            play_move(&mut eng, &mut pos, pt).unwrap();
        }
        assert!(pos.black_to_play());
        let mut moves = PointList::new();
        gen_random_moves(&mut eng, &pos, &mut moves);
        assert!(!moves.is_empty());
        assert!(
            !moves.contains(parse_coord("E5").unwrap()),
            "a playout must not fill its own eye"
        );
    }

    #[test]
    fn capture_generator_offers_the_rescue() {
        let mut eng = Engine::new(1);
        let mut pos = Position::new();
        // Black C8 in atari after White D8; the generator scanning the
        // last move's neighborhood must offer C7 (and the sizes line up).
        for mv in ["C8", "C9", "E9", "B8", "F9", "D8"] {
            play_move(&mut eng, &mut pos, parse_coord(mv).unwrap()).unwrap();
        }
        if N != 9 {
            return;
        }
        let local = last_moves_neighbors(&mut eng, &pos);
        let mut moves = PointList::new();
        let mut sizes = Vec::new();
        gen_capture_moves(&mut eng, &pos, local.as_slice(), 1.0, false, &mut moves, &mut sizes);
        assert!(moves.contains(parse_coord("C7").unwrap()));
        assert_eq!(moves.len(), sizes.len());
    }

    #[test]
    fn benchmark_reports_finite_stats() {
        let mut eng = Engine::new(1);
        let (mean, dev) = mcbenchmark(&mut eng, 10);
        assert!(mean.is_finite());
        assert!(dev >= 0.0);
    }
}
