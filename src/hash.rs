//! Zobrist position hashing.
//!
//! One independent random key per (player, vertex) pair, generated once
//! from a seed and injected into every [`Board`](crate::board::Board).
//! The board hash is the XOR of the keys of all placed stones, updated
//! incrementally on every placement and removal.

use crate::constants::CNT;
use crate::vertex::{Player, Vertex};

/// Immutable table of position-hash keys.
pub struct Zobrist {
    keys: [[u64; CNT]; 2],
}

impl Zobrist {
    /// Generate the table deterministically from `seed`.
    pub fn new(seed: u64) -> Zobrist {
        let mut rng = fastrand::Rng::with_seed(seed);
        let mut keys = [[0u64; CNT]; 2];
        for table in &mut keys {
            for key in table.iter_mut() {
                *key = rng.u64(..);
            }
        }
        Zobrist { keys }
    }

    /// Key for a stone of `player` at `v`.
    #[inline]
    pub fn key(&self, player: Player, v: Vertex) -> u64 {
        self.keys[player.idx()][v.raw()]
    }
}
