//! Incremental Go board: legality, captures, undo, scoring.
//!
//! The board keeps, per vertex, a packed neighbor counter, a union-find
//! chain id and a circular chain ring, and per chain a pseudo-liberty
//! count and sum. "Pseudo" means a liberty adjacent to k stones of the
//! chain is counted k times; `lib_cnt == 1` still implies a unique real
//! liberty and then `lib_sum` *is* that liberty, which gives an O(1)
//! atari lookup. All of this is updated incrementally so a playout move
//! costs amortized constant time.
//!
//! Boards are plain values: cloning yields a fully independent copy,
//! which is the only branching mechanism used by ladder reading and
//! playout simulation.

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, bail};

use crate::constants::{AREA, CNT, LADDER_STACK_CAP, MAX_GAME_LEN, N};
use crate::hash::Zobrist;
use crate::vertex::{Color, Move, Player, Vertex};

/// Outcome classification of the most recent `play_legal`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveStatus {
    /// Move applied normally.
    Ok,
    /// The move was a suicide; the placed stones were removed again.
    Suicide,
}

/// Packed per-vertex neighbor summary: three saturating 4-bit counters
/// for black-or-off-board, white-or-off-board and empty neighbors.
/// Off-board counts as a stone of both colors so that an edge eye is
/// recognized as fully surrounded.
#[derive(Clone, Copy, PartialEq, Eq)]
struct NbrCounter(u32);

const NBR_MAX: u32 = 4;
const F_SHIFT: [u32; 3] = [0, 4, 8];
const F_MASK: u32 = 0xF;

const PLAYER_INC: [u32; 2] = [
    (1u32 << F_SHIFT[0]).wrapping_sub(1 << F_SHIFT[2]),
    (1u32 << F_SHIFT[1]).wrapping_sub(1 << F_SHIFT[2]),
];

const OFF_BOARD_INC: u32 = (1u32 << F_SHIFT[0])
    .wrapping_add(1 << F_SHIFT[1])
    .wrapping_sub(1 << F_SHIFT[2]);

impl NbrCounter {
    const fn empty() -> NbrCounter {
        NbrCounter(NBR_MAX << F_SHIFT[2])
    }

    #[inline]
    fn player_inc(&mut self, pl: Player) {
        self.0 = self.0.wrapping_add(PLAYER_INC[pl.idx()]);
    }

    #[inline]
    fn player_dec(&mut self, pl: Player) {
        self.0 = self.0.wrapping_sub(PLAYER_INC[pl.idx()]);
    }

    #[inline]
    fn off_board_inc(&mut self) {
        self.0 = self.0.wrapping_add(OFF_BOARD_INC);
    }

    #[inline]
    fn empty_cnt(self) -> u32 {
        self.0 >> F_SHIFT[2]
    }

    #[inline]
    fn player_cnt(self, pl: Player) -> u32 {
        (self.0 >> F_SHIFT[pl.idx()]) & F_MASK
    }

    #[inline]
    fn player_cnt_is_max(self, pl: Player) -> bool {
        let mask = NBR_MAX << F_SHIFT[pl.idx()];
        self.0 & mask == mask
    }
}

/// Liberty record of one chain, indexed by the chain id vertex.
#[derive(Clone, Copy)]
struct Chain {
    lib_cnt: u32,
    /// Wrapping sum of liberty vertex indices. Exact for stone chains;
    /// the records of off-board guard vertices are never read.
    lib_sum: u32,
}

const NO_MOVE: Move = Move {
    player: Player::White,
    vertex: Vertex::NONE,
};

/// The mutable game-state aggregate.
#[derive(Clone)]
pub struct Board {
    color_at: [Color; CNT],
    nbr_cnt: [NbrCounter; CNT],
    chain_id: [Vertex; CNT],
    chain_next: [Vertex; CNT],
    chains: [Chain; CNT],

    empty_v: [Vertex; AREA],
    empty_pos: [u16; CNT],
    empty_cnt: usize,
    last_empty_cnt: usize,

    move_history: [Move; MAX_GAME_LEN],
    move_no: usize,
    last_move_status: MoveStatus,

    player_v_cnt: [u32; 2],
    player_last_v: [Vertex; 2],
    last_player: Player,

    hash: u64,
    ko_v: Vertex,
    komi: i32,

    zobrist: Arc<Zobrist>,
}

impl Board {
    /// A cleared board using the given hash table.
    pub fn new(zobrist: Arc<Zobrist>) -> Board {
        let mut board = Board {
            color_at: [Color::OffBoard; CNT],
            nbr_cnt: [NbrCounter::empty(); CNT],
            chain_id: [Vertex::NONE; CNT],
            chain_next: [Vertex::NONE; CNT],
            chains: [Chain { lib_cnt: 0, lib_sum: 0 }; CNT],
            empty_v: [Vertex::NONE; AREA],
            empty_pos: [0; CNT],
            empty_cnt: 0,
            last_empty_cnt: 0,
            move_history: [NO_MOVE; MAX_GAME_LEN],
            move_no: 0,
            last_move_status: MoveStatus::Ok,
            player_v_cnt: [0; 2],
            player_last_v: [Vertex::NONE; 2],
            last_player: Player::White,
            hash: 0,
            ko_v: Vertex::NONE,
            komi: 0,
            zobrist,
        };
        board.clear();
        board
    }

    /// Reset to the empty-board state. Komi returns to the default
    /// (white wins the draws).
    pub fn clear(&mut self) {
        self.set_komi(-0.5);
        self.empty_cnt = 0;
        self.player_v_cnt = [0; 2];
        self.player_last_v = [Vertex::NONE; 2];
        self.move_no = 0;
        self.last_player = Player::White; // act player is the other
        self.last_move_status = MoveStatus::Ok;
        self.ko_v = Vertex::NONE;

        for idx in 0..CNT {
            self.color_at[idx] = Color::OffBoard;
            self.nbr_cnt[idx] = NbrCounter::empty();
            self.chain_next[idx] = Vertex::of_raw(idx);
            self.chain_id[idx] = Vertex::of_raw(idx);
            self.chains[idx] = Chain { lib_cnt: NBR_MAX, lib_sum: 0 };
        }
        for v in Vertex::all_on_board() {
            self.color_at[v.raw()] = Color::Empty;
            self.empty_pos[v.raw()] = self.empty_cnt as u16;
            self.empty_v[self.empty_cnt] = v;
            self.empty_cnt += 1;
            for nbr in v.orth_nbrs() {
                if !nbr.is_on_board() {
                    self.nbr_cnt[v.raw()].off_board_inc();
                }
            }
        }
        self.last_empty_cnt = self.empty_cnt;
        self.hash = self.recalc_hash();
        self.check_instr();
    }

    // -------------------------------------------------------------------------
    // Accessors

    #[inline]
    pub fn color_at(&self, v: Vertex) -> Color {
        self.color_at[v.raw()]
    }

    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    #[inline]
    pub fn ko_v(&self) -> Vertex {
        self.ko_v
    }

    /// Player to move, derived from the last mover.
    #[inline]
    pub fn act_player(&self) -> Player {
        self.last_player.other()
    }

    #[inline]
    pub fn last_player(&self) -> Player {
        self.last_player
    }

    #[inline]
    pub fn move_no(&self) -> usize {
        self.move_no
    }

    #[inline]
    pub fn move_history(&self) -> &[Move] {
        &self.move_history[..self.move_no]
    }

    #[inline]
    pub fn last_move_status(&self) -> MoveStatus {
        self.last_move_status
    }

    #[inline]
    pub fn last_vertex_of(&self, pl: Player) -> Vertex {
        self.player_last_v[pl.idx()]
    }

    #[inline]
    pub fn stone_count(&self, pl: Player) -> u32 {
        self.player_v_cnt[pl.idx()]
    }

    #[inline]
    pub fn empty_count(&self) -> usize {
        self.empty_cnt
    }

    /// The i-th entry of the dense empty-vertex array; order is arbitrary
    /// but stable between moves, suitable for uniform sampling.
    #[inline]
    pub fn empty_at(&self, i: usize) -> Vertex {
        self.empty_v[i]
    }

    #[inline]
    pub fn both_players_passed(&self) -> bool {
        self.player_last_v[0] == Vertex::PASS && self.player_last_v[1] == Vertex::PASS
    }

    /// Stones removed by the most recent move, from the change in the
    /// empty-vertex count.
    #[inline]
    pub fn last_capture_size(&self) -> usize {
        self.empty_cnt + 1 - self.last_empty_cnt
    }

    /// True komi from Black's perspective; the half point makes draws
    /// impossible.
    pub fn komi(&self) -> f32 {
        self.komi as f32 - 0.5
    }

    /// Set komi as a Black-perspective float; stored rounded up so all
    /// internal scoring stays integral.
    pub fn set_komi(&mut self, fkomi: f32) {
        self.komi = fkomi.ceil() as i32;
    }

    #[inline]
    fn chain(&self, v: Vertex) -> &Chain {
        &self.chains[self.chain_id[v.raw()].raw()]
    }

    #[inline]
    fn chain_mut(&mut self, v: Vertex) -> &mut Chain {
        let cid = self.chain_id[v.raw()].raw();
        &mut self.chains[cid]
    }

    // -------------------------------------------------------------------------
    // Legality

    /// Fast pre-filter used inside playouts. Accepts pass. Does not
    /// detect multi-stone suicide; that is resolved by `play_legal`
    /// after the fact.
    pub fn is_pseudo_legal(&self, pl: Player, v: Vertex) -> bool {
        v == Vertex::PASS
            || !self.nbr_cnt[v.raw()].player_cnt_is_max(pl.other())
            || (!self.eye_is_ko(pl, v) && !self.eye_is_suicide(v))
    }

    #[inline]
    fn eye_is_ko(&self, pl: Player, v: Vertex) -> bool {
        v == self.ko_v && pl == self.last_player.other()
    }

    /// Filling this surrounded point captures nothing: every adjacent
    /// chain keeps at least one liberty after losing `v`.
    fn eye_is_suicide(&self, v: Vertex) -> bool {
        let nbrs = v.orth_nbrs();
        'chain: for (i, &n) in nbrs.iter().enumerate() {
            if !self.color_at[n.raw()].is_player() {
                continue;
            }
            let cid = self.chain_id[n.raw()];
            for &m in &nbrs[..i] {
                if self.chain_id[m.raw()] == cid {
                    continue 'chain; // chain already counted
                }
            }
            let adjacency = nbrs
                .iter()
                .filter(|m| self.chain_id[m.raw()] == cid)
                .count() as u32;
            if self.chains[cid.raw()].lib_cnt == adjacency {
                return false; // that chain would die: a capture, not suicide
            }
        }
        true
    }

    /// All 4 orthogonal neighbors are `pl` (or edge), and at most one
    /// diagonal is enemy-colored, with the off-board diagonals of an
    /// edge point counting as a single intrusion.
    pub fn is_eyelike(&self, pl: Player, v: Vertex) -> bool {
        debug_assert_eq!(self.color_at[v.raw()], Color::Empty);
        if !self.nbr_cnt[v.raw()].player_cnt_is_max(pl) {
            return false;
        }
        let mut enemy_diag = 0;
        let mut off_board_diag = 0;
        for d in v.diag_nbrs() {
            match self.color_at[d.raw()] {
                Color::OffBoard => off_board_diag += 1,
                c if c == Color::of_player(pl.other()) => enemy_diag += 1,
                _ => {}
            }
        }
        enemy_diag + ((off_board_diag > 0) as i32) < 2
    }

    // -------------------------------------------------------------------------
    // Mutation

    /// Apply a move assumed pseudo-legal. Ignores the simple-ko ban and
    /// will play (then immediately erase) a single-stone suicide,
    /// reporting it via `last_move_status`.
    pub fn play_legal(&mut self, pl: Player, v: Vertex) {
        if v == Vertex::PASS {
            self.basic_play(pl, Vertex::PASS);
            self.last_move_status = MoveStatus::Ok;
            self.check_instr();
            return;
        }
        debug_assert!(v.is_on_board());
        debug_assert_eq!(self.color_at[v.raw()], Color::Empty);

        if self.nbr_cnt[v.raw()].player_cnt_is_max(pl.other()) {
            self.play_eye_legal(pl, v);
        } else {
            self.play_not_eye(pl, v);
        }
        self.check_instr();
    }

    /// Bookkeeping shared by every move; must run before the stone is
    /// placed because it snapshots the empty-vertex count.
    fn basic_play(&mut self, pl: Player, v: Vertex) {
        debug_assert!(self.move_no < MAX_GAME_LEN);
        self.ko_v = Vertex::NONE;
        self.last_empty_cnt = self.empty_cnt;
        self.last_player = pl;
        self.player_last_v[pl.idx()] = v;
        self.move_history[self.move_no] = Move::new(pl, v);
        self.move_no += 1;
    }

    fn play_not_eye(&mut self, pl: Player, v: Vertex) {
        self.basic_play(pl, v);
        self.place_stone(pl, v);

        for nbr in v.orth_nbrs() {
            self.nbr_cnt[nbr.raw()].player_inc(pl);

            if !self.color_at[nbr.raw()].is_player() {
                continue;
            }
            let chain = self.chain_mut(nbr);
            chain.lib_cnt -= 1;
            chain.lib_sum = chain.lib_sum.wrapping_sub(v.raw() as u32);

            if self.color_at[nbr.raw()] != Color::of_player(pl) {
                if self.chain(nbr).lib_cnt == 0 {
                    self.remove_chain(nbr);
                }
            } else if self.chain_id[nbr.raw()] != self.chain_id[v.raw()] {
                // merge the smaller-liberty chain into the larger
                if self.chain(v).lib_cnt > self.chain(nbr).lib_cnt {
                    self.merge_chains(v, nbr);
                } else {
                    self.merge_chains(nbr, v);
                }
            }
        }

        if self.chain(v).lib_cnt == 0 {
            debug_assert_eq!(self.last_empty_cnt - self.empty_cnt, 1);
            self.remove_chain(v);
            self.last_move_status = MoveStatus::Suicide;
        } else {
            self.last_move_status = MoveStatus::Ok;
        }
    }

    /// Placement into a point whose opponent neighbor count is already
    /// saturated. Exactly these placements can create an immediate
    /// recapture ko, so they get their own simpler path: pre-take the
    /// liberty from all neighbor chains, place, then remove the dead.
    fn play_eye_legal(&mut self, pl: Player, v: Vertex) {
        for nbr in v.orth_nbrs() {
            let chain = self.chain_mut(nbr);
            chain.lib_cnt -= 1;
            chain.lib_sum = chain.lib_sum.wrapping_sub(v.raw() as u32);
        }

        self.basic_play(pl, v);
        self.place_stone(pl, v);

        for nbr in v.orth_nbrs() {
            self.nbr_cnt[nbr.raw()].player_inc(pl);
        }
        for nbr in v.orth_nbrs() {
            if self.color_at[nbr.raw()].is_player() && self.chain(nbr).lib_cnt == 0 {
                self.remove_chain(nbr);
            }
        }
        debug_assert_ne!(self.chain(v).lib_cnt, 0);

        if self.last_empty_cnt == self.empty_cnt {
            // captured exactly one stone inside an eye: simple ko
            self.ko_v = self.empty_v[self.empty_cnt - 1];
        } else {
            self.ko_v = Vertex::NONE;
        }
        self.last_move_status = MoveStatus::Ok;
    }

    fn place_stone(&mut self, pl: Player, v: Vertex) {
        self.hash ^= self.zobrist.key(pl, v);
        self.player_v_cnt[pl.idx()] += 1;
        self.color_at[v.raw()] = Color::of_player(pl);

        self.empty_cnt -= 1;
        let moved = self.empty_v[self.empty_cnt];
        self.empty_pos[moved.raw()] = self.empty_pos[v.raw()];
        self.empty_v[self.empty_pos[v.raw()] as usize] = moved;

        debug_assert_eq!(self.chain_next[v.raw()], v);
        self.chain_id[v.raw()] = v;
        let mut lib_sum = 0u32;
        for nbr in v.orth_nbrs() {
            if self.color_at[nbr.raw()] == Color::Empty {
                lib_sum = lib_sum.wrapping_add(nbr.raw() as u32);
            }
        }
        self.chains[v.raw()] = Chain {
            lib_cnt: self.nbr_cnt[v.raw()].empty_cnt(),
            lib_sum,
        };
    }

    fn remove_stone(&mut self, v: Vertex) {
        let pl = self.color_at[v.raw()].to_player().expect("stone expected");
        self.hash ^= self.zobrist.key(pl, v);
        self.player_v_cnt[pl.idx()] -= 1;
        self.color_at[v.raw()] = Color::Empty;

        self.empty_pos[v.raw()] = self.empty_cnt as u16;
        self.empty_v[self.empty_cnt] = v;
        self.empty_cnt += 1;
        self.chain_id[v.raw()] = v;
    }

    /// Relink the ring of `v_new` into `v_base` and relabel its stones.
    /// O(size of the smaller chain), never O(board).
    fn merge_chains(&mut self, v_base: Vertex, v_new: Vertex) {
        let (add_cnt, add_sum) = {
            let c = self.chain(v_new);
            (c.lib_cnt, c.lib_sum)
        };
        let base = self.chain_mut(v_base);
        base.lib_cnt += add_cnt;
        base.lib_sum = base.lib_sum.wrapping_add(add_sum);

        let base_id = self.chain_id[v_base.raw()];
        let mut act = v_new;
        loop {
            self.chain_id[act.raw()] = base_id;
            act = self.chain_next[act.raw()];
            if act == v_new {
                break;
            }
        }
        self.chain_next.swap(v_base.raw(), v_new.raw());
    }

    /// Remove every stone of the chain containing `v`, crediting the
    /// freed liberties back to the neighbor chains.
    fn remove_chain(&mut self, v: Vertex) {
        let old_player = self.color_at[v.raw()].to_player().expect("stone expected");

        let mut act = v;
        loop {
            self.remove_stone(act);
            act = self.chain_next[act.raw()];
            if act == v {
                break;
            }
        }

        let mut act = v;
        loop {
            for nbr in act.orth_nbrs() {
                self.nbr_cnt[nbr.raw()].player_dec(old_player);
                let chain = self.chain_mut(nbr);
                chain.lib_cnt += 1;
                chain.lib_sum = chain.lib_sum.wrapping_add(act.raw() as u32);
            }
            let tmp = act;
            act = self.chain_next[act.raw()];
            self.chain_next[tmp.raw()] = tmp;
            if act == v {
                break;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Strict play and undo (interactive use, not simulation)

    /// Full legality gate: rejects off-board and occupied vertices,
    /// pseudo-illegal moves, suicides, and any move repeating a position
    /// from this game's history. Leaves the board unchanged on rejection.
    pub fn try_play(&mut self, pl: Player, v: Vertex) -> bool {
        if v == Vertex::PASS {
            self.play_legal(pl, v);
            return true;
        }
        if !v.is_on_board() || self.color_at[v.raw()] != Color::Empty {
            return false;
        }
        if !self.is_pseudo_legal(pl, v) {
            return false;
        }
        self.play_legal(pl, v);
        if self.last_move_status != MoveStatus::Ok || self.is_hash_repeated() {
            let ok = self.undo();
            debug_assert!(ok);
            return false;
        }
        true
    }

    pub fn is_strict_legal(&mut self, pl: Player, v: Vertex) -> bool {
        if !self.try_play(pl, v) {
            return false;
        }
        let ok = self.undo();
        debug_assert!(ok);
        true
    }

    /// Replays the whole history except the last move onto a cleared
    /// board. O(move count); meant for interactive correction.
    pub fn undo(&mut self) -> bool {
        if self.move_no == 0 {
            return false;
        }
        let komi = self.komi;
        let replay: Vec<Move> = self.move_history[..self.move_no - 1].to_vec();
        self.clear();
        self.komi = komi;
        for mv in replay {
            self.play_legal(mv.player, mv.vertex);
        }
        true
    }

    /// Whether the current position hash occurred earlier in this game,
    /// by replaying the history on a scratch board.
    pub fn is_hash_repeated(&self) -> bool {
        if self.move_no == 0 {
            return false;
        }
        let mut tmp = Board::new(self.zobrist.clone());
        for mv in &self.move_history[..self.move_no - 1] {
            tmp.play_legal(mv.player, mv.vertex);
            if self.hash == tmp.hash {
                return true;
            }
        }
        false
    }

    // -------------------------------------------------------------------------
    // Scoring (integral; true score is value - 0.5, White wins at <= 0)

    /// Stone-count difference plus komi; ignores territory.
    pub fn approx_score(&self) -> i32 {
        self.komi + self.player_v_cnt[0] as i32 - self.player_v_cnt[1] as i32
    }

    pub fn approx_winner(&self) -> Player {
        Player::winner_of(self.approx_score())
    }

    /// Approx score plus one point per empty vertex whose 4 neighbors are
    /// all a single color.
    pub fn score(&self) -> i32 {
        let mut eye_score = 0;
        for &v in &self.empty_v[..self.empty_cnt] {
            eye_score += self.nbr_cnt[v.raw()].player_cnt_is_max(Player::Black) as i32;
            eye_score -= self.nbr_cnt[v.raw()].player_cnt_is_max(Player::White) as i32;
        }
        self.approx_score() + eye_score
    }

    pub fn winner(&self) -> Player {
        Player::winner_of(self.score())
    }

    /// Tromp-Taylor score: each player also claims every empty region
    /// reachable only through their stones. Two flood fills; used at
    /// terminal evaluation, not inside the playout loop.
    pub fn tt_score(&self) -> i32 {
        let mut reach = [0i32; 2];
        for pl in [Player::Black, Player::White] {
            let mut visited = [false; CNT];
            let mut queue: Vec<Vertex> = Vec::with_capacity(AREA);
            for v in Vertex::all_on_board() {
                if self.color_at[v.raw()] == Color::of_player(pl) {
                    visited[v.raw()] = true;
                    queue.push(v);
                }
            }
            while let Some(v) = queue.pop() {
                reach[pl.idx()] += 1;
                for nbr in v.orth_nbrs() {
                    if !visited[nbr.raw()] && self.color_at[nbr.raw()] == Color::Empty {
                        visited[nbr.raw()] = true;
                        queue.push(nbr);
                    }
                }
            }
        }
        self.komi + reach[0] - reach[1]
    }

    /// +1 if Black wins the Tromp-Taylor count, -1 otherwise.
    pub fn tt_winner_score(&self) -> i32 {
        if self.tt_score() > 0 { 1 } else { -1 }
    }

    /// Ownership of a single vertex: stone color, or eye ownership for an
    /// empty vertex, else 0.
    pub fn vertex_score(&self, v: Vertex) -> i32 {
        match self.color_at[v.raw()] {
            Color::Black => 1,
            Color::White => -1,
            Color::Empty => {
                self.nbr_cnt[v.raw()].player_cnt_is_max(Player::Black) as i32
                    - self.nbr_cnt[v.raw()].player_cnt_is_max(Player::White) as i32
            }
            Color::OffBoard => 0,
        }
    }

    // -------------------------------------------------------------------------
    // Atari and ladder queries

    /// If the chain containing `group` has exactly one real liberty,
    /// return it; `Vertex::NONE` otherwise. O(1) when the pseudo count
    /// is 1; otherwise the sum/count division yields the only possible
    /// candidate, which is verified by neighbor matching.
    pub fn in_atari(&self, group: Vertex) -> Vertex {
        if !group.is_on_board() || !self.color_at[group.raw()].is_player() {
            return Vertex::NONE;
        }
        let cid = self.chain_id[group.raw()];
        let chain = &self.chains[cid.raw()];

        if chain.lib_cnt == 1 {
            return Vertex::of_raw(chain.lib_sum as usize);
        }
        if chain.lib_cnt > 0 && chain.lib_sum % chain.lib_cnt == 0 {
            let cand = Vertex::of_raw((chain.lib_sum / chain.lib_cnt) as usize);
            if cand.is_on_board() && self.color_at[cand.raw()] == Color::Empty {
                let matches = cand
                    .orth_nbrs()
                    .into_iter()
                    .filter(|n| self.chain_id[n.raw()] == cid)
                    .count() as u32;
                if matches == chain.lib_cnt {
                    return cand;
                }
            }
        }
        Vertex::NONE
    }

    /// Atari liberties of chains touching the last (up to) 3 moves,
    /// capped at `cap` per color. Returns (black, white) vertex lists.
    pub fn find_recent_atari(&self, cap: usize) -> (Vec<Vertex>, Vec<Vertex>) {
        let mut blacks = Vec::new();
        let mut whites = Vec::new();

        for i in 1..=3 {
            if i >= self.move_no {
                break;
            }
            let center = self.move_history[self.move_no - i].vertex;
            if !center.is_on_board() {
                continue;
            }
            for vv in std::iter::once(center).chain(center.orth_nbrs()) {
                if !self.color_at[vv.raw()].is_player() {
                    continue;
                }
                let cid = self.chain_id[vv.raw()];
                if self.chains[cid.raw()].lib_cnt != 1 {
                    continue;
                }
                let lib = Vertex::of_raw(self.chains[cid.raw()].lib_sum as usize);
                let out = match self.color_at[vv.raw()] {
                    Color::Black => &mut blacks,
                    _ => &mut whites,
                };
                if out.len() < cap {
                    out.push(lib);
                }
            }
        }
        (blacks, whites)
    }

    /// Atari liberties of every chain on the board, each chain visited
    /// once, capped at `cap` per color.
    pub fn find_all_atari(&self, cap: usize) -> (Vec<Vertex>, Vec<Vertex>) {
        let mut blacks = Vec::new();
        let mut whites = Vec::new();
        let mut seen = [false; CNT];

        for v in Vertex::all_on_board() {
            let cid = self.chain_id[v.raw()];
            if seen[cid.raw()] {
                continue;
            }
            seen[cid.raw()] = true;
            if !self.color_at[cid.raw()].is_player() {
                continue;
            }
            let atari_v = self.in_atari(cid);
            if atari_v == Vertex::NONE {
                continue;
            }
            let out = match self.color_at[cid.raw()] {
                Color::Black => &mut blacks,
                _ => &mut whites,
            };
            if out.len() < cap {
                out.push(atari_v);
            }
        }
        (blacks, whites)
    }

    /// Whether the `p` group in atari at liberty `atari` can escape a
    /// ladder. Returns the player judged to hold the group after best
    /// play. Iterative with a bounded stack of cloned boards; on
    /// overflow the conservative "captured" verdict is returned.
    pub fn is_ladder(&self, atari: Vertex, p: Player) -> Player {
        let mut stack: Vec<(Board, Vertex)> = Vec::with_capacity(LADDER_STACK_CAP);
        stack.push((self.clone(), atari));

        'escape: while let Some((mut board, atari)) = stack.pop() {
            debug_assert!(atari.is_on_board());
            debug_assert_eq!(board.color_at[atari.raw()], Color::Empty);

            if !board.is_pseudo_legal(p, atari) {
                continue; // cannot even try this line; treat as escaped
            }
            board.play_legal(p, atari);
            if board.last_move_status != MoveStatus::Ok {
                return p.other(); // the escape was suicide
            }

            let cid = board.chain_id[atari.raw()];
            let lib_cnt = board.chains[cid.raw()].lib_cnt;
            if lib_cnt >= 3 {
                continue; // escaped on this line
            }
            if lib_cnt == 1 {
                return p.other(); // captured
            }
            debug_assert_eq!(lib_cnt, 2);

            // Fleeing may have put an adjacent enemy chain in atari; then
            // the escape works by capturing first.
            let enemy = Color::of_player(p.other());
            for x in atari.orth_nbrs() {
                if board.color_at[x.raw()] == enemy && board.in_atari(x) != Vertex::NONE {
                    continue 'escape;
                }
            }

            let mut libs: Vec<Vertex> = atari
                .orth_nbrs()
                .into_iter()
                .filter(|x| board.color_at[x.raw()] == Color::Empty)
                .collect();

            match libs.len() {
                0 => continue, // connected out to liberties elsewhere; assume escape
                1 => {
                    let lib_sum = board.chains[cid.raw()].lib_sum;
                    if 2 * libs[0].raw() as u32 == lib_sum {
                        return p.other(); // the single point counted twice: capture next move
                    }
                    let second =
                        Vertex::of_raw(lib_sum.wrapping_sub(libs[0].raw() as u32) as usize);
                    if !second.is_on_board() || board.color_at[second.raw()] != Color::Empty {
                        continue; // merged into a wider group; assume escape
                    }
                    libs.push(second);
                }
                2 => {}
                _ => continue,
            }

            if stack.len() + 2 > LADDER_STACK_CAP {
                return p.other(); // out of depth; conservative verdict
            }
            for (attack, next_atari) in [(libs[0], libs[1]), (libs[1], libs[0])] {
                if board.is_pseudo_legal(p.other(), attack) {
                    let mut branch = board.clone();
                    branch.play_legal(p.other(), attack);
                    stack.push((branch, next_atari));
                }
            }
        }
        p // every opponent line exhausted: the group escapes
    }

    // -------------------------------------------------------------------------
    // Plain-text board format

    /// Dump: board size line, then one row of color characters per line.
    pub fn to_ascii(&self) -> String {
        let mut out = format!("{N}\n");
        for row in 0..N {
            for col in 0..N {
                out.push(self.color_at[Vertex::of_coords(row, col).raw()].to_char());
            }
            out.push('\n');
        }
        out
    }

    /// Build a board from the `to_ascii` format. The size must match the
    /// compiled board size and every stone must be strictly playable in
    /// row-major order; any failure leaves nothing half-built.
    pub fn from_ascii(zobrist: Arc<Zobrist>, input: &str) -> anyhow::Result<Board> {
        let mut tokens = input.split_whitespace();
        let size: usize = tokens
            .next()
            .context("missing board size")?
            .parse()
            .context("bad board size")?;
        if size != N {
            bail!("board size {size} does not match compiled size {N}");
        }

        let cells: Vec<char> = tokens.flat_map(|t| t.chars()).collect();
        if cells.len() != AREA {
            bail!("expected {AREA} cells, found {}", cells.len());
        }

        let mut board = Board::new(zobrist);
        for (i, &c) in cells.iter().enumerate() {
            let color = Color::from_char(c).with_context(|| format!("bad character {c:?}"))?;
            let Some(pl) = color.to_player() else { continue };
            let v = Vertex::of_coords(i / N, i % N);
            if !board.try_play(pl, v) {
                bail!("stone at {} is not strictly playable", v.to_gtp());
            }
        }
        Ok(board)
    }

    /// Replace this board with a position loaded from text. The board is
    /// untouched when loading fails.
    pub fn load_ascii(&mut self, input: &str) -> anyhow::Result<()> {
        *self = Board::from_ascii(self.zobrist.clone(), input)?;
        Ok(())
    }

    pub fn zobrist(&self) -> &Arc<Zobrist> {
        &self.zobrist
    }

    // -------------------------------------------------------------------------
    // Invariant verification (instrumentation)

    fn recalc_hash(&self) -> u64 {
        let mut hash = 0;
        for v in Vertex::all_on_board() {
            if let Some(pl) = self.color_at[v.raw()].to_player() {
                hash ^= self.zobrist.key(pl, v);
            }
        }
        hash
    }

    /// Debug-build hook: full verification after every mutation, nothing
    /// in release.
    #[inline]
    fn check_instr(&self) {
        if cfg!(debug_assertions) {
            self.check();
        }
    }

    /// Recompute every incremental structure from scratch and assert it
    /// matches. Aborts on mismatch; a failure here is an engine bug, not
    /// a user error.
    pub fn check(&self) {
        self.check_empty_v();
        assert_eq!(self.hash, self.recalc_hash(), "hash out of sync");
        self.check_color_at();
        self.check_nbr_cnt();
        self.check_chains();
    }

    fn check_empty_v(&self) {
        assert!(self.empty_cnt <= AREA);
        let mut noticed = [false; CNT];
        for &v in &self.empty_v[..self.empty_cnt] {
            assert!(v.is_on_board());
            assert!(!noticed[v.raw()], "duplicate empty vertex");
            noticed[v.raw()] = true;
        }
        let mut stones = [0u32; 2];
        for v in Vertex::all_on_board() {
            let is_empty = self.color_at[v.raw()] == Color::Empty;
            assert_eq!(is_empty, noticed[v.raw()]);
            if is_empty {
                assert!((self.empty_pos[v.raw()] as usize) < self.empty_cnt);
                assert_eq!(self.empty_v[self.empty_pos[v.raw()] as usize], v);
            }
            if let Some(pl) = self.color_at[v.raw()].to_player() {
                stones[pl.idx()] += 1;
            }
        }
        assert_eq!(stones, self.player_v_cnt);
    }

    fn check_color_at(&self) {
        for idx in 0..CNT {
            let v = Vertex::of_raw(idx);
            assert_eq!(self.color_at[idx] != Color::OffBoard, v.is_on_board());
        }
    }

    fn check_nbr_cnt(&self) {
        for v in Vertex::all_on_board() {
            let mut black_or_off = 0;
            let mut white_or_off = 0;
            let mut empty = 0;
            for nbr in v.orth_nbrs() {
                match self.color_at[nbr.raw()] {
                    Color::Black => black_or_off += 1,
                    Color::White => white_or_off += 1,
                    Color::Empty => empty += 1,
                    Color::OffBoard => {
                        black_or_off += 1;
                        white_or_off += 1;
                    }
                }
            }
            let nc = self.nbr_cnt[v.raw()];
            assert_eq!(nc.player_cnt(Player::Black), black_or_off);
            assert_eq!(nc.player_cnt(Player::White), white_or_off);
            assert_eq!(nc.empty_cnt(), empty);
        }
    }

    fn check_chains(&self) {
        let mut seen = [false; CNT];
        for v in Vertex::all_on_board() {
            if !self.color_at[v.raw()].is_player() {
                assert_eq!(self.chain_next[v.raw()], v);
                continue;
            }
            for nbr in v.orth_nbrs() {
                if self.color_at[nbr.raw()] == self.color_at[v.raw()] {
                    assert_eq!(self.chain_id[v.raw()], self.chain_id[nbr.raw()]);
                }
            }
            let cid = self.chain_id[v.raw()];
            if seen[cid.raw()] {
                continue;
            }
            seen[cid.raw()] = true;

            // walk the ring from the id vertex and recompute liberties
            let mut lib_cnt = 0u32;
            let mut lib_sum = 0u32;
            let mut members = 0;
            let mut act = cid;
            loop {
                members += 1;
                assert!(members <= AREA, "chain ring does not close");
                assert_eq!(self.chain_id[act.raw()], cid);
                assert_eq!(self.color_at[act.raw()], self.color_at[cid.raw()]);
                for nbr in act.orth_nbrs() {
                    if self.color_at[nbr.raw()] == Color::Empty {
                        lib_cnt += 1;
                        lib_sum = lib_sum.wrapping_add(nbr.raw() as u32);
                    }
                }
                act = self.chain_next[act.raw()];
                if act == cid {
                    break;
                }
            }
            assert_ne!(lib_cnt, 0, "chain with no liberties survived");
            assert_eq!(lib_cnt, self.chains[cid.raw()].lib_cnt);
            assert_eq!(lib_sum, self.chains[cid.raw()].lib_sum);
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "   ")?;
        for col in 0..N {
            let mut c = b'A' + col as u8;
            if c >= b'I' {
                c += 1;
            }
            write!(f, " {}", c as char)?;
        }
        writeln!(f)?;
        for row in 0..N {
            write!(f, "{:>3}", N - row)?;
            for col in 0..N {
                let ch = self.color_at[Vertex::of_coords(row, col).raw()].to_char();
                write!(f, " {ch}")?;
            }
            writeln!(f, " {}", N - row)?;
        }
        write!(f, "   ")?;
        for col in 0..N {
            let mut c = b'A' + col as u8;
            if c >= b'I' {
                c += 1;
            }
            write!(f, " {}", c as char)?;
        }
        writeln!(f)
    }
}
