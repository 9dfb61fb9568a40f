//! Board geometry and default engine parameters.
//!
//! The board lives in a 1D array with a one-vertex guard ring so that
//! neighbor lookups never need bounds checks.
//!
//! # Board Size Configuration
//!
//! The board size is controlled by Cargo features:
//! - `board9x9` (default): 9x9 board
//! - `board13x13`: 13x13 board
//!
//! ```sh
//! cargo build                                               # 9x9 (default)
//! cargo build --no-default-features --features board13x13   # 13x13
//! ```

// =============================================================================
// Board Geometry
// =============================================================================

/// Board size (NxN).
#[cfg(feature = "board9x9")]
pub const N: usize = 9;

#[cfg(feature = "board13x13")]
pub const N: usize = 13;

// Compile-time check: exactly one board size feature must be enabled
#[cfg(all(feature = "board9x9", feature = "board13x13"))]
compile_error!("Cannot enable both 'board9x9' and 'board13x13' features at the same time");

#[cfg(not(any(feature = "board9x9", feature = "board13x13")))]
compile_error!("Must enable exactly one board size feature: 'board9x9' or 'board13x13'");

/// Padded board width (one off-board guard column on each side).
pub const W: usize = N + 2;

/// Total padded array size, guard ring included.
pub const CNT: usize = W * W;

/// Number of on-board vertices.
pub const AREA: usize = N * N;

/// Maximum game length (4 times board area to allow for captures and replays).
pub const MAX_GAME_LEN: usize = AREA * 4;

/// Move-count ceiling for a single playout.
pub const MAX_PLAYOUT_LEN: usize = AREA * 2;

// =============================================================================
// Playout parameters
// =============================================================================

/// Mercy rule: stop a playout early once the stone-count lead is decisive.
pub const DEFAULT_USE_MERCY_RULE: bool = false;

/// Approx-score margin that triggers the mercy rule.
pub const DEFAULT_MERCY_THRESHOLD: u32 = 25;

/// Plies during which the opening bias is active.
pub const OPENING_MOVE_LIMIT: usize = 7;

/// Cap on atari vertices collected per color by the recent-atari scan.
pub const RECENT_ATARI_CAP: usize = 10;

/// Depth cap (in cloned boards) for the iterative ladder search.
pub const LADDER_STACK_CAP: usize = 50;

// =============================================================================
// UCT parameters (untuned; kept as overridable defaults)
// =============================================================================

/// Exploration rate multiplying log(parent visits) in the UCB bonus.
pub const DEFAULT_EXPLORE_RATE: f32 = 1.0;

/// Simulated games per genmove decision.
pub const DEFAULT_PLAYOUT_CNT: usize = 100_000;

/// Visit count after which a leaf is expanded.
pub const DEFAULT_MATURE_THRESHOLD: f32 = 100.0;

/// Prior visit count a fresh node starts with.
pub const DEFAULT_NODE_PRIOR: f32 = 1.0;

/// Mean outcome past which the engine resigns instead of playing on.
pub const DEFAULT_RESIGN_MEAN: f32 = 0.95;

/// Hard cap on tree nodes; the tree stops growing when it is reached.
pub const DEFAULT_MAX_NODES: usize = 1_000_000;

/// Maximum descent depth recorded per simulation.
pub const MAX_TREE_DEPTH: usize = 1000;

/// UCB locality boost for the orthogonal ring around a recent move.
pub const DEFAULT_LOCALITY_ORTH: f32 = 2.2;

/// UCB locality boost for the diagonal ring around a recent move.
pub const DEFAULT_LOCALITY_DIAG: f32 = 1.21;

/// UCB locality boost for the two-away jump ring around a recent move.
pub const DEFAULT_LOCALITY_JUMP: f32 = 1.21;
