//! Monte Carlo playout policies and the playout runner.
//!
//! A policy proposes one move for the player to act; the runner applies
//! policy moves until both players pass, the game runs too long, or the
//! mercy rule fires. Policies only ever return moves that are safe for
//! `play_legal`: pseudo-legal, not the ko recapture, and never a filling
//! of the mover's own solid eye (which is what lets playouts terminate).

use crate::board::Board;
use crate::constants::{
    DEFAULT_MERCY_THRESHOLD, DEFAULT_USE_MERCY_RULE, MAX_PLAYOUT_LEN, N, OPENING_MOVE_LIMIT,
    RECENT_ATARI_CAP,
};
use crate::vertex::{Color, Player, Vertex};

/// Move generator used inside playouts.
pub trait Policy {
    /// Propose a move for `board.act_player()`; `Vertex::PASS` when no
    /// playable point remains.
    fn gen_move(&mut self, board: &Board) -> Vertex;
}

/// A vertex a playout is allowed to occupy.
fn playable(board: &Board, pl: Player, v: Vertex) -> bool {
    board.color_at(v) == Color::Empty
        && board.is_pseudo_legal(pl, v)
        && !board.is_eyelike(pl, v)
}

/// Scan the empty-vertex array from a random start, wrapping around;
/// the first playable point wins, pass if there is none.
fn uniform_move(rng: &mut fastrand::Rng, board: &Board, pl: Player) -> Vertex {
    let cnt = board.empty_count();
    if cnt == 0 {
        return Vertex::PASS;
    }
    let start = rng.usize(0..cnt);
    for i in 0..cnt {
        let v = board.empty_at((start + i) % cnt);
        if playable(board, pl, v) {
            return v;
        }
    }
    Vertex::PASS
}

/// Uniformly random playouts; the baseline every heuristic stage falls
/// back to.
pub struct UniformPolicy {
    rng: fastrand::Rng,
}

impl UniformPolicy {
    pub fn new(seed: u64) -> UniformPolicy {
        UniformPolicy { rng: fastrand::Rng::with_seed(seed) }
    }
}

impl Policy for UniformPolicy {
    fn gen_move(&mut self, board: &Board) -> Vertex {
        uniform_move(&mut self.rng, board, board.act_player())
    }
}

/// Stage switches for [`HeuristicPolicy`]; all on by default.
#[derive(Clone, Copy)]
pub struct PolicyConfig {
    pub use_opening: bool,
    pub use_atari: bool,
    pub use_local: bool,
}

impl Default for PolicyConfig {
    fn default() -> PolicyConfig {
        PolicyConfig { use_opening: true, use_atari: true, use_local: true }
    }
}

/// Light playout policy: opening bias, atari responses, local answers,
/// then the uniform fallback. Each stage fires with a fixed probability
/// and yields to the next when it finds nothing playable.
pub struct HeuristicPolicy {
    rng: fastrand::Rng,
    config: PolicyConfig,
    opening_block: Vec<Vertex>,
    opening_ring: Vec<Vertex>,
}

impl HeuristicPolicy {
    pub fn new(seed: u64, config: PolicyConfig) -> HeuristicPolicy {
        let center = (N - 1) / 2;
        let mut opening_block = Vec::new();
        let mut opening_ring = Vec::new();
        for v in Vertex::all_on_board() {
            let dr = v.row().abs_diff(center);
            let dc = v.col().abs_diff(center);
            if dr <= 2 && dc <= 2 {
                opening_block.push(v);
            } else if dr.max(dc) == 3 {
                opening_ring.push(v);
            }
        }
        HeuristicPolicy {
            rng: fastrand::Rng::with_seed(seed),
            config,
            opening_block,
            opening_ring,
        }
    }

    /// Early moves go to the center block, sometimes to the ring around
    /// it, to avoid the pure-random tendency to start on the edge.
    fn opening_move(&mut self, board: &Board, pl: Player) -> Option<Vertex> {
        if board.move_no() >= OPENING_MOVE_LIMIT {
            return None;
        }
        let set = if self.rng.u32(0..10) < 9 {
            &self.opening_block
        } else {
            &self.opening_ring
        };
        // first playable vertex, scanning from a random start
        let start = self.rng.usize(0..set.len());
        for i in 0..set.len() {
            let v = set[(start + i) % set.len()];
            if playable(board, pl, v) {
                return Some(v);
            }
        }
        None
    }

    /// React to ataris created near the last few moves: usually press a
    /// capture, occasionally rescue an own chain when the ladder works.
    fn atari_move(&mut self, board: &Board, pl: Player) -> Option<Vertex> {
        let (blacks, whites) = board.find_recent_atari(RECENT_ATARI_CAP);
        let (own, enemy) = match pl {
            Player::Black => (blacks, whites),
            Player::White => (whites, blacks),
        };

        if !own.is_empty() && self.rng.u32(0..4) == 0 {
            let v = own[self.rng.usize(0..own.len())];
            if playable(board, pl, v) && board.is_ladder(v, pl) == pl {
                return Some(v);
            }
        }
        if !enemy.is_empty() && self.rng.u32(0..4) != 0 {
            let v = enemy[self.rng.usize(0..enemy.len())];
            if playable(board, pl, v) {
                return Some(v);
            }
        }
        None
    }

    /// Sometimes answer right next to the opponent's last stone: a
    /// contact move, a diagonal, or a two-space jump.
    fn local_move(&mut self, board: &Board, pl: Player) -> Option<Vertex> {
        let last = board.last_vertex_of(board.last_player());
        if !last.is_on_board() {
            return None;
        }
        let cands: Vec<Vertex> = match self.rng.u32(0..7) {
            0 => [(2, 0), (-2, 0), (0, 2), (0, -2)]
                .into_iter()
                .filter_map(|(dr, dc)| last.shifted(dr, dc))
                .collect(),
            1 => last.diag_nbrs().into_iter().collect(),
            2 | 3 => last.orth_nbrs().into_iter().collect(),
            _ => return None,
        };
        let cands: Vec<Vertex> = cands
            .into_iter()
            .filter(|&v| v.is_on_board() && playable(board, pl, v))
            .collect();
        if cands.is_empty() {
            None
        } else {
            Some(cands[self.rng.usize(0..cands.len())])
        }
    }
}

impl Policy for HeuristicPolicy {
    fn gen_move(&mut self, board: &Board) -> Vertex {
        let pl = board.act_player();
        if self.config.use_opening {
            if let Some(v) = self.opening_move(board, pl) {
                return v;
            }
        }
        if self.config.use_atari {
            if let Some(v) = self.atari_move(board, pl) {
                return v;
            }
        }
        if self.config.use_local {
            if let Some(v) = self.local_move(board, pl) {
                return v;
            }
        }
        uniform_move(&mut self.rng, board, pl)
    }
}

/// Why a playout stopped.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlayoutStatus {
    /// Both players passed; the position is scorable.
    PassPass,
    /// The stone-count lead crossed the mercy threshold.
    Mercy,
    /// The move cap was hit; usually a pathological cycle.
    TooLong,
}

/// Drives a policy to the end of one simulated game.
#[derive(Clone, Copy)]
pub struct Playout {
    pub use_mercy_rule: bool,
    pub mercy_threshold: u32,
}

impl Default for Playout {
    fn default() -> Playout {
        Playout {
            use_mercy_rule: DEFAULT_USE_MERCY_RULE,
            mercy_threshold: DEFAULT_MERCY_THRESHOLD,
        }
    }
}

impl Playout {
    /// Play policy moves on `board` until a stop condition; returns the
    /// stop reason and the number of moves played.
    pub fn run(&self, board: &mut Board, policy: &mut dyn Policy) -> (PlayoutStatus, usize) {
        let mut moves_played = 0;
        loop {
            if board.both_players_passed() {
                return (PlayoutStatus::PassPass, moves_played);
            }
            if moves_played >= MAX_PLAYOUT_LEN {
                return (PlayoutStatus::TooLong, moves_played);
            }
            if self.use_mercy_rule
                && board.approx_score().unsigned_abs() > self.mercy_threshold
            {
                return (PlayoutStatus::Mercy, moves_played);
            }
            let pl = board.act_player();
            let v = policy.gen_move(board);
            board.play_legal(pl, v);
            moves_played += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Zobrist;
    use std::sync::Arc;

    fn board() -> Board {
        Board::new(Arc::new(Zobrist::new(123)))
    }

    #[test]
    fn uniform_playout_terminates_scorable() {
        let mut b = board();
        let mut policy = UniformPolicy::new(7);
        let (status, moves) = Playout::default().run(&mut b, &mut policy);
        assert_eq!(status, PlayoutStatus::PassPass);
        assert!(moves <= MAX_PLAYOUT_LEN);
        b.check();
    }

    #[test]
    fn heuristic_playout_terminates() {
        let mut b = board();
        let mut policy = HeuristicPolicy::new(7, PolicyConfig::default());
        let (status, _) = Playout::default().run(&mut b, &mut policy);
        assert_eq!(status, PlayoutStatus::PassPass);
        b.check();
    }

    #[test]
    fn same_seed_same_playout() {
        let mut a = board();
        let mut b = board();
        let mut pa = HeuristicPolicy::new(99, PolicyConfig::default());
        let mut pb = HeuristicPolicy::new(99, PolicyConfig::default());
        Playout::default().run(&mut a, &mut pa);
        Playout::default().run(&mut b, &mut pb);
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.move_no(), b.move_no());
    }

    #[test]
    fn mercy_rule_stops_lopsided_games() {
        let mut b = board();
        // hand black a big head start
        for (i, v) in Vertex::all_on_board().enumerate() {
            if i >= DEFAULT_MERCY_THRESHOLD as usize + 2 {
                break;
            }
            b.play_legal(Player::Black, v);
        }
        let runner = Playout { use_mercy_rule: true, mercy_threshold: DEFAULT_MERCY_THRESHOLD };
        let mut policy = UniformPolicy::new(3);
        let (status, moves) = runner.run(&mut b, &mut policy);
        assert_eq!(status, PlayoutStatus::Mercy);
        assert_eq!(moves, 0);
    }

    #[test]
    fn opening_moves_stay_central() {
        let b = board();
        let mut policy = HeuristicPolicy::new(5, PolicyConfig::default());
        let center = (N - 1) / 2;
        for _ in 0..50 {
            let v = policy.gen_move(&b);
            assert!(v.row().abs_diff(center) <= 3);
            assert!(v.col().abs_diff(center) <= 3);
        }
    }

    #[test]
    fn policy_presses_fresh_atari() {
        let mut b = board();
        let e5 = Vertex::from_gtp("E5").unwrap();
        b.play_legal(Player::White, e5);
        for s in ["E4", "E6", "D5"] {
            b.play_legal(Player::Black, Vertex::from_gtp(s).unwrap());
        }
        // white tenuki keeps the atari within the recent-move window
        b.play_legal(Player::White, Vertex::from_gtp("A1").unwrap());
        let config = PolicyConfig { use_opening: false, ..Default::default() };
        let mut captured = 0;
        for seed in 0..40 {
            let mut policy = HeuristicPolicy::new(seed, config);
            if policy.gen_move(&b) == Vertex::from_gtp("F5").unwrap() {
                captured += 1;
            }
        }
        // the capture stage fires three times out of four; demand a majority
        assert!(captured > 20, "captured only {captured}/40 times");
    }
}
