//! Large ("gridcular") pattern dictionary.
//!
//! Patterns are concentric neighborhoods of a candidate move, grown
//! ring by ring in the gridcular metric d(dx,dy) = |dx|+|dy|+max(|dx|,|dy|)
//! up to 141 offsets within radius 7. Each prefix of the offset
//! sequence is hashed into a 64-bit Zobrist key; a key identifies a
//! shape up to nothing at all — the dictionary therefore stores every
//! pattern under all eight board symmetries.
//!
//! The dictionary itself is a single open-addressed table of 2^KSIZE
//! slots probed by double hashing. Key 0 marks an empty slot; a real
//! pattern hashing to 0 would be skipped (odds 2^-64, accepted).
//!
//! Matching walks the rings outward, extending the key incrementally
//! and remembering the widest hit; it gives up after two consecutive
//! ring misses beyond the last hit, since wider shapes only specialize
//! narrower ones.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context, Result};
use regex::Regex;

use crate::constants::{EMPTY, N, OPPONENT, OUT, W};
use crate::position::{Point, Position};
use crate::rng::Lcg;

/// Ring count of the gridcular sequence.
pub const PAT_RINGS: usize = 12;

/// Total offsets at the widest ring.
pub const PAT_LEN: usize = 141;

/// Widest coordinate reached by any offset; also the border width of
/// `LargeBoard`.
pub const PAT_RADIUS: usize = 7;

/// log2 of the production table size (~16 bytes per slot).
pub const KSIZE: u32 = 25;

/// One past the last offset of each ring.
const RING_END: [usize; PAT_RINGS] = [9, 13, 21, 29, 37, 49, 61, 73, 89, 105, 121, 141];

/// Offsets (dx, dy) in gridcular order: each ring appends the points
/// of the next distance band, symmetric under the dihedral group.
#[rustfmt::skip]
const OFFSETS: [(i8, i8); PAT_LEN] = [
    (0, 0),
    (0, 1), (0, -1), (1, 0), (-1, 0), (1, 1), (-1, 1), (1, -1), (-1, -1),
    (0, 2), (0, -2), (2, 0), (-2, 0),
    (1, 2), (-1, 2), (1, -2), (-1, -2), (2, 1), (-2, 1), (2, -1), (-2, -1),
    (2, 2), (-2, 2), (2, -2), (-2, -2), (0, 3), (0, -3), (3, 0), (-3, 0),
    (1, 3), (-1, 3), (1, -3), (-1, -3), (3, 1), (-3, 1), (3, -1), (-3, -1),
    (2, 3), (-2, 3), (2, -3), (-2, -3), (3, 2), (-3, 2), (3, -2), (-3, -2),
    (0, 4), (0, -4), (4, 0), (-4, 0),
    (1, 4), (-1, 4), (1, -4), (-1, -4), (4, 1), (-4, 1), (4, -1), (-4, -1),
    (3, 3), (-3, 3), (3, -3), (-3, -3),
    (2, 4), (-2, 4), (2, -4), (-2, -4), (4, 2), (-4, 2), (4, -2), (-4, -2),
    (0, 5), (0, -5), (5, 0), (-5, 0),
    (1, 5), (-1, 5), (1, -5), (-1, -5), (5, 1), (-5, 1), (5, -1), (-5, -1),
    (3, 4), (-3, 4), (3, -4), (-3, -4), (4, 3), (-4, 3), (4, -3), (-4, -3),
    (2, 5), (-2, 5), (2, -5), (-2, -5), (5, 2), (-5, 2), (5, -2), (-5, -2),
    (4, 4), (-4, 4), (4, -4), (-4, -4), (0, 6), (0, -6), (6, 0), (-6, 0),
    (1, 6), (-1, 6), (1, -6), (-1, -6), (6, 1), (-6, 1), (6, -1), (-6, -1),
    (3, 5), (-3, 5), (3, -5), (-3, -5), (5, 3), (-5, 3), (5, -3), (-5, -3),
    (2, 6), (-2, 6), (2, -6), (-2, -6), (6, 2), (-6, 2), (6, -2), (-6, -2),
    (4, 5), (-4, 5), (4, -5), (-4, -5), (5, 4), (-5, 4), (5, -4), (-5, -4),
    (0, 7), (0, -7), (7, 0), (-7, 0),
];

/// Odd primes for the double-hashing step, selected by four key bits.
const PROBE_STEPS: [usize; 16] = [3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59];

/// Hashing colors: empty 0, off-board 1, opponent 2, side to move 3.
fn board_code(stone: u8) -> u8 {
    match stone {
        EMPTY => 0,
        OUT => 1,
        OPPONENT => 2,
        _ => 3,
    }
}

/// Pattern-file alphabet to hashing color; `O` and `x` both mean the
/// other side.
fn text_code(cell: u8) -> Option<u8> {
    match cell {
        b'.' => Some(0),
        b'#' | b' ' => Some(1),
        b'O' | b'x' => Some(2),
        b'X' => Some(3),
        _ => None,
    }
}

/// Side of the wide board: the playing area plus a border wide enough
/// that every gridcular offset of every playable point stays inside.
pub const LB_W: usize = N + 2 * PAT_RADIUS;

/// Board copy with a radius-wide OUT frame, the only input of the
/// signature computation.
pub struct LargeBoard {
    cells: Box<[u8; LB_W * LB_W]>,
}

impl LargeBoard {
    pub fn from_position(pos: &Position) -> Self {
        let mut cells = Box::new([1u8; LB_W * LB_W]);
        for row in 1..=N {
            for col in 1..=N {
                cells[(row - 1 + PAT_RADIUS) * LB_W + (col - 1 + PAT_RADIUS)] =
                    board_code(pos.color[row * W + col]);
            }
        }
        LargeBoard { cells }
    }

    /// Wide-board index of a flat-board point.
    pub fn index_of(pt: Point) -> usize {
        let row = pt / W;
        let col = pt % W;
        (row - 1 + PAT_RADIUS) * LB_W + (col - 1 + PAT_RADIUS)
    }

    #[inline]
    fn code_at(&self, base: usize, dx: i8, dy: i8) -> u8 {
        let idx = base as isize + dy as isize * LB_W as isize + dx as isize;
        self.cells[idx as usize]
    }
}

#[derive(Clone, Copy, Default)]
struct Slot {
    key: u64,
    id: u32,
    prob: f32,
}

enum Probe {
    Found(usize),
    Vacant(usize),
}

pub struct LargePatternDict {
    slots: Vec<Slot>,
    /// Zobrist words per (offset, hashing color).
    zobrist: Vec<[u64; 4]>,
    /// Offset-index permutation per board symmetry.
    perms: Vec<[u16; PAT_LEN]>,
    patterns: usize,
    duplicates: usize,
}

impl LargePatternDict {
    /// The no-dictionary dictionary: every probe misses.
    pub fn empty() -> Self {
        LargePatternDict {
            slots: Vec::new(),
            zobrist: Vec::new(),
            perms: Vec::new(),
            patterns: 0,
            duplicates: 0,
        }
    }

    /// Allocate a 2^ksize table and derive the Zobrist words and the
    /// symmetry permutations. The words come from a fixed-seed LCG so
    /// two runs assign every shape the same key.
    pub fn with_ksize(ksize: u32) -> Self {
        assert!((8..=32).contains(&ksize), "unusable table size");
        let mut words = Lcg::new(0x5eed);
        let zobrist = (0..PAT_LEN)
            .map(|_| {
                std::array::from_fn(|_| (words.next_u32() as u64) << 32 | words.next_u32() as u64)
            })
            .collect();
        LargePatternDict {
            slots: vec![Slot::default(); 1usize << ksize],
            zobrist,
            perms: symmetry_permutations(),
            patterns: 0,
            duplicates: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns == 0
    }

    /// Distinct (shape, symmetry) entries in the table.
    pub fn len(&self) -> usize {
        self.patterns
    }

    /// Double-hashing probe: start and step both come from the key,
    /// the step is odd so it cycles the whole power-of-two table.
    fn probe(&self, key: u64) -> Result<Probe> {
        let len = self.slots.len();
        let mut h = (key >> 20) as usize & (len - 1);
        let step = PROBE_STEPS[(key >> 45) as usize & 15];
        for _ in 0..len {
            let slot = &self.slots[h];
            if slot.key == key {
                return Ok(Probe::Found(h));
            }
            if slot.key == 0 {
                return Ok(Probe::Vacant(h));
            }
            h += step;
            if h >= len {
                h -= len;
            }
        }
        bail!("pattern table full")
    }

    fn find(&self, key: u64) -> Option<&Slot> {
        match self.probe(key) {
            Ok(Probe::Found(i)) => Some(&self.slots[i]),
            _ => None,
        }
    }

    fn insert(&mut self, key: u64, id: u32, prob: f32) -> Result<()> {
        if key == 0 {
            log::warn!("pattern {id} hashes to the empty-slot key, skipped");
            return Ok(());
        }
        match self.probe(key)? {
            Probe::Found(_) => self.duplicates += 1,
            Probe::Vacant(i) => {
                self.slots[i] = Slot { key, id, prob };
                self.patterns += 1;
            }
        }
        Ok(())
    }

    /// Key of a pattern string under board symmetry `sym`.
    fn text_key(&self, cells: &[u8], sym: usize) -> Option<u64> {
        let perm = &self.perms[sym];
        let mut key = 0u64;
        for (i, &cell) in cells.iter().enumerate() {
            key ^= self.zobrist[perm[i] as usize][text_code(cell)? as usize];
        }
        Some(key)
    }

    /// Insert a spatial pattern under all eight symmetries.
    fn insert_pattern(&mut self, id: u32, cells: &[u8], prob: f32) -> Result<()> {
        if cells.len() > PAT_LEN {
            bail!("pattern {id} wider than the gridcular sequence");
        }
        for sym in 0..8 {
            match self.text_key(cells, sym) {
                Some(key) => self.insert(key, id, prob)?,
                None => {
                    log::warn!("pattern {id} uses an unknown cell, skipped");
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Probability of the widest pattern matching at `pt`, if any
    /// carries one. Walks the rings outward, extending the signature
    /// incrementally; two ring misses past the last hit end the walk.
    pub fn probability(&self, board: &LargeBoard, pt: Point) -> Option<f32> {
        if self.slots.is_empty() {
            return None;
        }
        let base = LargeBoard::index_of(pt);
        let mut key = 0u64;
        let mut best = None;
        let mut matched = 0;
        let mut last_ring = 0;
        let mut i = 0;
        for &end in &RING_END {
            while i < end {
                let (dx, dy) = OFFSETS[i];
                key ^= self.zobrist[i][board.code_at(base, dx, dy) as usize];
                i += 1;
            }
            match self.find(key) {
                Some(slot) if slot.prob >= 0.0 => {
                    best = Some(slot.prob);
                    matched = end;
                }
                _ => {
                    if matched < last_ring {
                        break;
                    }
                }
            }
            last_ring = end;
        }
        best
    }

    /// Ids matched at each ring, widest last. Debug surface; does not
    /// short-circuit.
    pub fn matching_ids(&self, board: &LargeBoard, pt: Point) -> Vec<(usize, u32)> {
        let mut found = Vec::new();
        if self.slots.is_empty() {
            return found;
        }
        let base = LargeBoard::index_of(pt);
        let mut key = 0u64;
        let mut i = 0;
        for (ring, &end) in RING_END.iter().enumerate() {
            while i < end {
                let (dx, dy) = OFFSETS[i];
                key ^= self.zobrist[i][board.code_at(base, dx, dy) as usize];
                i += 1;
            }
            if let Some(slot) = self.find(key) {
                found.push((ring + 1, slot.id));
            }
        }
        found
    }

    /// Load the two pattern files.
    ///
    /// `patterns.prob` records `prob id id (s:spatial_id)` per line and
    /// fills the spatial-id to probability map; `patterns.spat` records
    /// `id diameter pattern_string` and feeds the table. `#` starts a
    /// comment in both.
    pub fn load_files(prob_file: &Path, spat_file: &Path, ksize: u32) -> Result<Self> {
        let mut probs: Vec<f32> = Vec::new();
        let prob_line = Regex::new(r"^([0-9.eE+-]+)\s+\S+\s+\S+\s+\(s:(\d+)\)").unwrap();
        let reader = BufReader::new(
            File::open(prob_file).with_context(|| format!("open {}", prob_file.display()))?,
        );
        for line in reader.lines() {
            let line = line?;
            if line.starts_with('#') {
                continue;
            }
            let Some(rec) = prob_line.captures(line.trim_start()) else {
                continue;
            };
            let prob: f32 = rec[1].parse().with_context(|| format!("bad prob in {line:?}"))?;
            let id: usize = rec[2].parse()?;
            if probs.len() <= id {
                probs.resize(id + 1, -1.0);
            }
            probs[id] = prob;
        }

        let mut dict = LargePatternDict::with_ksize(ksize);
        let spat_line = Regex::new(r"^(\d+)\s+(\d+)\s+(\S+)").unwrap();
        let reader = BufReader::new(
            File::open(spat_file).with_context(|| format!("open {}", spat_file.display()))?,
        );
        for line in reader.lines() {
            let line = line?;
            if line.starts_with('#') {
                continue;
            }
            let Some(rec) = spat_line.captures(line.trim_start()) else {
                continue;
            };
            let id: u32 = rec[1].parse()?;
            let prob = probs.get(id as usize).copied().unwrap_or(-1.0);
            dict.insert_pattern(id, rec[3].as_bytes(), prob)?;
        }
        if dict.duplicates > 0 {
            log::debug!(
                "{} symmetric pattern variants were already present",
                dict.duplicates
            );
        }
        Ok(dict)
    }
}

/// For each of the eight dihedral transforms, the permutation taking
/// an offset index to the index of its image. Rings map onto
/// themselves, so prefixes of the sequence stay prefixes.
fn symmetry_permutations() -> Vec<[u16; PAT_LEN]> {
    let span = 2 * PAT_RADIUS as isize + 1;
    let mut index_of = vec![u16::MAX; (span * span) as usize];
    for (i, &(dx, dy)) in OFFSETS.iter().enumerate() {
        let key = (dy as isize + PAT_RADIUS as isize) * span + dx as isize + PAT_RADIUS as isize;
        index_of[key as usize] = i as u16;
    }
    (0..8)
        .map(|sym| {
            std::array::from_fn(|i| {
                let (mut dx, mut dy) = (OFFSETS[i].0 as isize, OFFSETS[i].1 as isize);
                if sym & 4 != 0 {
                    std::mem::swap(&mut dx, &mut dy);
                }
                if sym & 1 != 0 {
                    dx = -dx;
                }
                if sym & 2 != 0 {
                    dy = -dy;
                }
                let key = (dy + PAT_RADIUS as isize) * span + dx + PAT_RADIUS as isize;
                let mapped = index_of[key as usize];
                debug_assert!(mapped != u16::MAX, "offset set not symmetry-closed");
                mapped
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn gridcular_sequence_shape() {
        assert_eq!(OFFSETS.len(), PAT_LEN);
        assert_eq!(*RING_END.last().unwrap(), PAT_LEN);
        // strictly growing rings, none adding more than 20 offsets
        let mut prev = 0;
        for &end in &RING_END {
            assert!(end > prev);
            assert!(end - prev <= 20);
            prev = end;
        }
        // no duplicate offsets, radius bound holds
        for (i, &(dx, dy)) in OFFSETS.iter().enumerate() {
            assert!(dx.unsigned_abs() as usize <= PAT_RADIUS);
            assert!(dy.unsigned_abs() as usize <= PAT_RADIUS);
            assert!(!OFFSETS[..i].contains(&(dx, dy)), "duplicate offset {dx},{dy}");
        }
        // rings are bands of non-decreasing gridcular distance
        let gridcular = |(dx, dy): (i8, i8)| {
            let (ax, ay) = (dx.unsigned_abs() as usize, dy.unsigned_abs() as usize);
            ax + ay + ax.max(ay)
        };
        let mut start = 0;
        let mut prev_max = 0;
        for &end in &RING_END {
            let band: Vec<usize> = OFFSETS[start..end].iter().map(|&o| gridcular(o)).collect();
            let lo = *band.iter().min().unwrap();
            let hi = *band.iter().max().unwrap();
            assert!(lo >= prev_max, "ring distances must not interleave");
            prev_max = hi;
            start = end;
        }
    }

    #[test]
    fn symmetries_permute_rings() {
        let perms = symmetry_permutations();
        assert_eq!(perms.len(), 8);
        for perm in &perms {
            // bijective
            let mut seen = [false; PAT_LEN];
            for &j in perm.iter() {
                assert!(!seen[j as usize]);
                seen[j as usize] = true;
            }
            // ring-stable: an index never leaves its ring
            let ring_of = |i: usize| RING_END.iter().position(|&end| i < end).unwrap();
            for (i, &j) in perm.iter().enumerate() {
                assert_eq!(ring_of(i), ring_of(j as usize));
            }
        }
        // identity is among them
        assert!(perms.iter().any(|p| p.iter().enumerate().all(|(i, &j)| i == j as usize)));
    }

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("tenuki-test-{}-{name}", std::process::id()));
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_and_matches_under_all_symmetries() {
        // A radius-1 shape: move point, a friendly stone east, an
        // enemy stone north, empty elsewhere. Written in the canonical
        // orientation only; the loader must cover the other seven.
        let prob = write_temp("sym.prob", "# comment\n0.250000 17 4 (s:7)\n");
        let spat = write_temp("sym.spat", "# comment\n7 3 ..x.X....\n");
        let dict = LargePatternDict::load_files(&prob, &spat, 10).unwrap();
        // eight symmetries of an asymmetric shape are eight entries
        assert_eq!(dict.len(), 8);

        let mut eng = crate::engine::Engine::new(1);
        let mut pos = Position::new();
        // Black E6 then White F5: with White to move the north stone
        // is the opponent's and the east stone is White's own...
        crate::position::play_move(&mut eng, &mut pos, crate::position::parse_coord("E6").unwrap())
            .unwrap();
        crate::position::play_move(&mut eng, &mut pos, crate::position::parse_coord("F5").unwrap())
            .unwrap();
        pass_to_white(&mut pos);
        let board = LargeBoard::from_position(&pos);
        let e5 = crate::position::parse_coord("E5").unwrap();
        assert_eq!(dict.probability(&board, e5), Some(0.25));
        let ids = dict.matching_ids(&board, e5);
        assert_eq!(ids, vec![(1, 7)]);

        std::fs::remove_file(prob).ok();
        std::fs::remove_file(spat).ok();
    }

    /// Make it White's turn without disturbing the stones.
    fn pass_to_white(pos: &mut Position) {
        if pos.black_to_play() {
            crate::position::pass_move(pos);
        }
    }

    #[test]
    fn probability_prefers_wider_matches() {
        let prob = write_temp(
            "wide.prob",
            "0.100000 1 1 (s:1)\n0.900000 1 1 (s:2)\n",
        );
        // id 1: lone move point surrounded by empty (ring 1);
        // id 2: the same plus an empty ring 2 — strictly wider.
        let spat = write_temp("wide.spat", "1 3 .........\n2 4 .............\n");
        let dict = LargePatternDict::load_files(&prob, &spat, 10).unwrap();
        let pos = Position::new();
        let board = LargeBoard::from_position(&pos);
        let e5 = crate::position::parse_coord("E5").unwrap();
        assert_eq!(dict.probability(&board, e5), Some(0.9));
        std::fs::remove_file(prob).ok();
        std::fs::remove_file(spat).ok();
    }

    #[test]
    fn missing_prob_entry_matches_nothing_usable() {
        let prob = write_temp("none.prob", "# empty\n");
        let spat = write_temp("none.spat", "9 3 .........\n");
        let dict = LargePatternDict::load_files(&prob, &spat, 10).unwrap();
        let pos = Position::new();
        let board = LargeBoard::from_position(&pos);
        let e5 = crate::position::parse_coord("E5").unwrap();
        // the shape is in the table for the debug surface...
        assert!(!dict.matching_ids(&board, e5).is_empty());
        // ...but carries no probability
        assert_eq!(dict.probability(&board, e5), None);
        std::fs::remove_file(prob).ok();
        std::fs::remove_file(spat).ok();
    }

    #[test]
    fn missing_files_fail_to_load() {
        let err = LargePatternDict::load_files(
            Path::new("/nonexistent.prob"),
            Path::new("/nonexistent.spat"),
            10,
        );
        assert!(err.is_err());
    }

    #[test]
    fn empty_dictionary_never_matches() {
        let dict = LargePatternDict::empty();
        let pos = Position::new();
        let board = LargeBoard::from_position(&pos);
        let e5 = crate::position::parse_coord("E5").unwrap();
        assert_eq!(dict.probability(&board, e5), None);
        assert!(dict.matching_ids(&board, e5).is_empty());
    }

    #[test]
    fn insert_reports_duplicates() {
        let mut dict = LargePatternDict::with_ksize(10);
        dict.insert(42, 1, 0.5).unwrap();
        assert_eq!(dict.len(), 1);
        dict.insert(42, 1, 0.5).unwrap();
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.duplicates, 1);
        assert!(dict.find(42).is_some());
        assert!(dict.find(43).is_none());
    }
}
