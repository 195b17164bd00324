//! tenuki: a minimalistic Monte-Carlo Go engine.
//!
//! The engine proposes moves by growing a RAVE-scored search tree over
//! heuristic random playouts, with priors from local tactics, 3x3
//! shapes and a large-pattern dictionary.
//!
//! ```no_run
//! use tenuki::engine::Engine;
//! use tenuki::mcts::{tree_search, Tree};
//! use tenuki::position::{parse_coord, play_move, str_coord, Position};
//!
//! let mut engine = Engine::new(1);
//! let mut pos = Position::new();
//! play_move(&mut engine, &mut pos, parse_coord("E5").unwrap()).unwrap();
//!
//! let mut tree = Tree::new(&pos);
//! let mut owner = Box::new([0i32; tenuki::constants::BOARDSIZE]);
//! let reply = tree_search(&mut engine, &mut tree, 400, &mut owner, false);
//! println!("reply: {}", str_coord(reply));
//! ```

pub mod constants;
pub mod engine;
pub mod gtp;
pub mod largepat;
pub mod mcts;
pub mod pat3;
pub mod playout;
pub mod position;
pub mod rng;
pub mod sets;
pub mod tactics;
