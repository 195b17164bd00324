//! Board geometry and engine tuning constants.
//!
//! The board side is fixed at build time through cargo features:
//! `board9x9` (default), `board13x13` or `board19x19`. Changing the side
//! requires a rebuild because the flat board layout, the neighbor offsets
//! and the pattern machinery are all derived from `N` at compile time.

/// Board side. Standard Go sizes are 9, 13 and 19.
#[cfg(feature = "board9x9")]
pub const N: usize = 9;

#[cfg(feature = "board13x13")]
pub const N: usize = 13;

#[cfg(feature = "board19x19")]
pub const N: usize = 19;

#[cfg(any(
    all(feature = "board9x9", feature = "board13x13"),
    all(feature = "board9x9", feature = "board19x19"),
    all(feature = "board13x13", feature = "board19x19"),
))]
compile_error!("enable exactly one boardNxN feature");

#[cfg(not(any(feature = "board9x9", feature = "board13x13", feature = "board19x19")))]
compile_error!("enable exactly one boardNxN feature");

/// Row stride of the flat board: N playable columns plus the shared
/// OUT column 0 that serves as both right and left border.
pub const W: usize = N + 1;

/// Flat board length, including the OUT frame. With this layout
/// `pt + delta` stays inside the array for every neighbor offset of
/// every playable point, so the hot path never tests board edges.
pub const BOARDSIZE: usize = (N + 1) * (N + 2) + 1;

/// First index a board scan must consider (start of the first row).
pub const BOARD_MIN: usize = N + 1;

/// One past the last playable index.
pub const BOARD_MAX: usize = BOARDSIZE - N - 1;

/// Playouts are cut off after this many plies.
pub const MAX_GAME_LEN: usize = N * N * 3;

/// Neighbor offsets in the flat board: N, E, S, W, NE, SE, SW, NW.
pub const DELTA: [isize; 8] = [
    -(W as isize),
    1,
    W as isize,
    -1,
    1 - W as isize,
    W as isize + 1,
    W as isize - 1,
    -(W as isize) - 1,
];

// Stone bytes. The board is kept "swap-cased": the side to move is
// always TO_PLAY, regardless of which real color it is.

pub const TO_PLAY: u8 = b'X';
pub const OPPONENT: u8 = b'x';
pub const EMPTY: u8 = b'.';
pub const OUT: u8 = b' ';

/// Pass sentinel. Index 0 is part of the OUT frame, so it never
/// collides with a playable point.
pub const PASS_MOVE: usize = 0;

/// Resign sentinel, distinct from every board point and from PASS.
pub const RESIGN_MOVE: usize = usize::MAX;

// Search parameters.

/// Default simulations per generated move.
pub const N_SIMS: usize = 1400;

/// RAVE equivalence: the visit count at which AMAF and true statistics
/// weigh equally in the urgency blend.
pub const RAVE_EQUIV: usize = 3500;

/// Visits a leaf needs before it is expanded.
pub const EXPAND_VISITS: u32 = 8;

/// Expansion threshold used when the large-pattern files are missing;
/// cheaper expansion lets in-tree statistics stand in for the priors.
pub const EXPAND_VISITS_BARE: u32 = 4;

/// Simulations between progress reports.
pub const REPORT_PERIOD: usize = 200;

/// Resign when the best child's winrate drops below this.
pub const RESIGN_THRES: f64 = 0.2;

/// Early stop: winrate needed after 20% of the simulations.
pub const FASTPLAY20_THRES: f64 = 0.8;

/// Early stop: winrate needed after 5% of the simulations.
pub const FASTPLAY5_THRES: f64 = 0.95;

// Priors seeded into freshly expanded children, in (visits, wins)
// equivalents.

pub const PRIOR_EVEN: u32 = 10;
pub const PRIOR_SELFATARI: u32 = 10;
pub const PRIOR_CAPTURE_ONE: u32 = 15;
pub const PRIOR_CAPTURE_MANY: u32 = 30;
pub const PRIOR_PAT3: u32 = 10;
pub const PRIOR_LARGEPATTERN: u32 = 100;

/// Bonus by CFG distance 1, 2, 3 from the last move.
pub const PRIOR_CFG: [u32; 3] = [24, 22, 8];

pub const PRIOR_EMPTYAREA: u32 = 10;

// Playout policy probabilities.

pub const PROB_HEURISTIC_CAPTURE: f64 = 0.9;
pub const PROB_HEURISTIC_PAT3: f64 = 0.95;

/// Self-atari rejection rate for heuristically suggested moves.
pub const PROB_SSAREJECT: f64 = 0.9;

/// Self-atari rejection rate for random moves; kept lower so nakade
/// and snap-back moves still happen.
pub const PROB_RSAREJECT: f64 = 0.5;
