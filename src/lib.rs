//! tengen: a Monte Carlo tree search Go engine.
//!
//! The crate is layered bottom-up:
//! - [`constants`] and [`vertex`]: board geometry on a padded 1D array
//! - [`hash`]: Zobrist position hashing
//! - [`board`]: incremental game state with O(1) amortized moves
//! - [`playout`]: simulation policies and the playout runner
//! - [`mcts`]: the UCT search tree and engine
//! - [`gtp`]: the Go Text Protocol front end
//!
//! The board size is fixed at compile time via the `board9x9` (default)
//! or `board13x13` feature.

pub mod board;
pub mod constants;
pub mod gtp;
pub mod hash;
pub mod mcts;
pub mod playout;
pub mod vertex;
