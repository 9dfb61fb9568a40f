//! UCT search on top of the playout machinery.
//!
//! The tree is a pool of nodes indexed by `NodeId`; freed subtrees go on
//! a freelist so a long game never reallocates. Each simulation clones
//! the root board, descends by UCB with a locality boost around the last
//! two moves, expands leaves once they are mature, rolls out with the
//! playout policy, and propagates the black-positive outcome sample back
//! along the descent path.

use crate::board::{Board, MoveStatus};
use crate::constants::{
    DEFAULT_EXPLORE_RATE, DEFAULT_LOCALITY_DIAG, DEFAULT_LOCALITY_JUMP, DEFAULT_LOCALITY_ORTH,
    DEFAULT_MATURE_THRESHOLD, DEFAULT_MAX_NODES, DEFAULT_NODE_PRIOR, DEFAULT_PLAYOUT_CNT,
    DEFAULT_RESIGN_MEAN, MAX_TREE_DEPTH,
};
use crate::playout::{HeuristicPolicy, Playout, PlayoutStatus, Policy, PolicyConfig};
use crate::vertex::{Color, Player, Vertex};

/// Running outcome statistic of one node.
#[derive(Clone, Copy)]
pub struct Stat {
    update_count: f32,
    sample_sum: f32,
}

impl Stat {
    /// The prior acts as virtual visits around a neutral outcome, so a
    /// fresh node neither looks won nor lost.
    pub fn new(prior: f32) -> Stat {
        Stat { update_count: prior, sample_sum: 0.0 }
    }

    pub fn update(&mut self, sample: f32) {
        self.update_count += 1.0;
        self.sample_sum += sample;
    }

    pub fn update_count(&self) -> f32 {
        self.update_count
    }

    /// Black-positive mean outcome.
    pub fn mean(&self) -> f32 {
        self.sample_sum / self.update_count
    }

    /// Mean from `pl`'s point of view plus the exploration bonus.
    pub fn ucb(&self, pl: Player, explore_coeff: f32) -> f32 {
        pl.sign() as f32 * self.mean() + (explore_coeff / self.update_count).sqrt()
    }
}

pub type NodeId = u32;

struct Node {
    /// The player who made the move leading into this node.
    player: Player,
    v: Vertex,
    stat: Stat,
    children: Vec<NodeId>,
}

/// Fixed-capacity node arena with a freelist.
struct NodePool {
    slots: Vec<Node>,
    free: Vec<NodeId>,
    max_nodes: usize,
}

impl NodePool {
    fn new(max_nodes: usize) -> NodePool {
        NodePool { slots: Vec::new(), free: Vec::new(), max_nodes }
    }

    fn alloc(&mut self, node: Node) -> Option<NodeId> {
        if let Some(id) = self.free.pop() {
            self.slots[id as usize] = node;
            return Some(id);
        }
        if self.slots.len() >= self.max_nodes {
            return None;
        }
        self.slots.push(node);
        Some((self.slots.len() - 1) as NodeId)
    }

    fn release(&mut self, id: NodeId) {
        self.slots[id as usize].children = Vec::new();
        self.free.push(id);
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.slots[id as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.slots[id as usize]
    }

    fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

/// Tunables of the search engine; defaults are the engine's played
/// strength, tests dial them way down.
#[derive(Clone, Copy)]
pub struct UctConfig {
    pub playout_cnt: usize,
    pub explore_rate: f32,
    pub mature_threshold: f32,
    pub node_prior: f32,
    pub resign_mean: f32,
    pub max_nodes: usize,
    pub locality_orth: f32,
    pub locality_diag: f32,
    pub locality_jump: f32,
    pub seed: u64,
}

impl Default for UctConfig {
    fn default() -> UctConfig {
        UctConfig {
            playout_cnt: DEFAULT_PLAYOUT_CNT,
            explore_rate: DEFAULT_EXPLORE_RATE,
            mature_threshold: DEFAULT_MATURE_THRESHOLD,
            node_prior: DEFAULT_NODE_PRIOR,
            resign_mean: DEFAULT_RESIGN_MEAN,
            max_nodes: DEFAULT_MAX_NODES,
            locality_orth: DEFAULT_LOCALITY_ORTH,
            locality_diag: DEFAULT_LOCALITY_DIAG,
            locality_jump: DEFAULT_LOCALITY_JUMP,
            seed: 0,
        }
    }
}

/// Exploration-coefficient multiplier for moves near a recent stone.
/// The rings around the two centers combine by max, never by product.
fn locality_factor(config: &UctConfig, v: Vertex, centers: [Vertex; 2]) -> f32 {
    let mut factor = 1.0f32;
    if !v.is_on_board() {
        return factor;
    }
    for center in centers {
        if !center.is_on_board() {
            continue;
        }
        let dr = (v.row() as i32 - center.row() as i32).abs();
        let dc = (v.col() as i32 - center.col() as i32).abs();
        let ring = match (dr, dc) {
            (0, 1) | (1, 0) => config.locality_orth,
            (1, 1) => config.locality_diag,
            (0, 2) | (2, 0) => config.locality_jump,
            _ => 1.0,
        };
        factor = factor.max(ring);
    }
    factor
}

/// The search tree plus the descent path of the current simulation.
struct Tree {
    pool: NodePool,
    root: NodeId,
    history: Vec<NodeId>,
}

impl Tree {
    fn new(max_nodes: usize, root_player: Player, prior: f32) -> Tree {
        let mut pool = NodePool::new(max_nodes);
        let root = pool
            .alloc(Node {
                player: root_player,
                v: Vertex::NONE,
                stat: Stat::new(prior),
                children: Vec::new(),
            })
            .unwrap_or(0);
        Tree { pool, root, history: vec![root] }
    }

    /// Throw the whole tree away and start over from a fresh root.
    fn reset(&mut self, root_player: Player, prior: f32) {
        self.free_subtree(self.root);
        self.root = self
            .pool
            .alloc(Node {
                player: root_player,
                v: Vertex::NONE,
                stat: Stat::new(prior),
                children: Vec::new(),
            })
            .unwrap_or(0); // cannot fail: the pool was just emptied
        self.history.clear();
        self.history.push(self.root);
    }

    fn start_descent(&mut self) {
        self.history.truncate(1);
    }

    fn act_node(&self) -> NodeId {
        *self.history.last().unwrap_or(&self.root)
    }

    fn depth(&self) -> usize {
        self.history.len()
    }

    /// Pick the UCB-maximal child of the act node, with the locality
    /// boost toward the last two stones of `board`, and step into it.
    fn uct_descend(&mut self, board: &Board, config: &UctConfig) -> NodeId {
        let parent = self.act_node();
        let explore_coeff =
            self.pool.node(parent).stat.update_count().ln() * config.explore_rate;
        let centers = [
            board.last_vertex_of(Player::Black),
            board.last_vertex_of(Player::White),
        ];

        let mut best = self.pool.node(parent).children[0];
        let mut best_value = f32::NEG_INFINITY;
        for &child in &self.pool.node(parent).children {
            let node = self.pool.node(child);
            // the boost widens exploration only; the mean is untouched
            let factor = locality_factor(config, node.v, centers);
            let value = node.stat.ucb(node.player, factor * explore_coeff);
            if value > best_value {
                best_value = value;
                best = child;
            }
        }
        self.history.push(best);
        best
    }

    fn alloc_child(&mut self, parent: NodeId, player: Player, v: Vertex, prior: f32) -> bool {
        let Some(id) = self.pool.alloc(Node {
            player,
            v,
            stat: Stat::new(prior),
            children: Vec::new(),
        }) else {
            return false;
        };
        self.pool.node_mut(parent).children.push(id);
        true
    }

    /// Prune the node the descent just entered; used when its move turns
    /// out to be unplayable on the current path.
    fn delete_act_node(&mut self) {
        debug_assert!(self.history.len() > 1);
        let Some(act) = self.history.pop() else { return };
        let parent = self.act_node();
        self.pool.node_mut(parent).children.retain(|&c| c != act);
        self.free_subtree(act);
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(act) = stack.pop() {
            stack.extend_from_slice(&self.pool.node(act).children);
            self.pool.release(act);
        }
    }

    fn update_history(&mut self, sample: f32) {
        for i in 0..self.history.len() {
            let id = self.history[i];
            self.pool.node_mut(id).stat.update(sample);
        }
    }

    fn node_count(&self) -> usize {
        self.pool.live_count()
    }
}

/// The full search engine: tree, playout runner and policy.
pub struct Uct<P: Policy> {
    pub config: UctConfig,
    tree: Tree,
    playout: Playout,
    policy: P,
}

impl Uct<HeuristicPolicy> {
    /// Engine with the default heuristic policy, sharing `seed`.
    pub fn new(config: UctConfig) -> Uct<HeuristicPolicy> {
        let policy = HeuristicPolicy::new(config.seed, PolicyConfig::default());
        Uct::with_policy(config, policy)
    }
}

impl<P: Policy> Uct<P> {
    pub fn with_policy(config: UctConfig, policy: P) -> Uct<P> {
        Uct {
            config,
            tree: Tree::new(config.max_nodes, Player::White, config.node_prior),
            playout: Playout::default(),
            policy,
        }
    }

    /// Reset the tree for a search by `pl` and give the root one child
    /// per strictly legal move, plus pass. Superko is filtered here and
    /// only here; in-tree descent below the root relies on the cheap
    /// pseudo-legality check.
    pub fn prepare(&mut self, board: &Board, pl: Player) {
        let prior = self.config.node_prior;
        self.tree.reset(pl.other(), prior);
        let root = self.tree.root;
        self.tree.alloc_child(root, pl, Vertex::PASS, prior);
        let mut probe = board.clone();
        for i in 0..board.empty_count() {
            let v = board.empty_at(i);
            if probe.is_strict_legal(pl, v) {
                if !self.tree.alloc_child(root, pl, v, prior) {
                    break;
                }
            }
        }
    }

    /// Run the configured number of simulations from `board` and return
    /// the move for `pl`: a vertex, `PASS`, or `RESIGN` when the best
    /// mean is hopeless.
    pub fn genmove(&mut self, board: &Board, pl: Player) -> Vertex {
        self.prepare(board, pl);
        for _ in 0..self.config.playout_cnt {
            self.do_playout(board);
        }

        let Some((v, mean, _)) = self.best_root_child() else {
            return Vertex::PASS;
        };
        if (pl.sign() as f32) * mean < -self.config.resign_mean {
            return Vertex::RESIGN;
        }
        v
    }

    /// Most-visited root child as (vertex, black-positive mean, visits).
    pub fn best_root_child(&self) -> Option<(Vertex, f32, f32)> {
        let root = self.tree.root;
        let mut best: Option<(Vertex, f32, f32)> = None;
        for &child in &self.tree.pool.node(root).children {
            let node = self.tree.pool.node(child);
            let visits = node.stat.update_count();
            if best.is_none_or(|(_, _, b)| visits > b) {
                best = Some((node.v, node.stat.mean(), visits));
            }
        }
        best
    }

    /// One simulation: descend, maybe expand, roll out, backpropagate.
    /// Public so a caller with a time budget can drive the loop itself.
    pub fn do_playout(&mut self, base: &Board) {
        let mut board = base.clone();
        self.tree.start_descent();

        loop {
            if board.both_players_passed() {
                // in-tree terminal position: exact score, no rollout
                let sample = board.tt_winner_score() as f32;
                self.tree.update_history(sample);
                return;
            }
            let act = self.tree.act_node();
            if self.tree.pool.node(act).children.is_empty() {
                let mature =
                    self.tree.pool.node(act).stat.update_count() > self.config.mature_threshold;
                if mature && self.expand(act, &board) {
                    continue;
                }
                break;
            }
            let child = self.tree.uct_descend(&board, &self.config);
            let node = self.tree.pool.node(child);
            let (mv_pl, mv_v) = (node.player, node.v);
            if mv_v != Vertex::PASS
                && (board.color_at(mv_v) != Color::Empty || !board.is_pseudo_legal(mv_pl, mv_v))
            {
                self.tree.delete_act_node();
                return;
            }
            board.play_legal(mv_pl, mv_v);
            if board.last_move_status() != MoveStatus::Ok {
                self.tree.delete_act_node();
                return;
            }
            if self.tree.depth() >= MAX_TREE_DEPTH {
                break;
            }
        }

        let (status, _) = self.playout.run(&mut board, &mut self.policy);
        let sample = match status {
            PlayoutStatus::PassPass | PlayoutStatus::TooLong => board.tt_winner_score() as f32,
            PlayoutStatus::Mercy => {
                if board.approx_score() > 0 { 1.0 } else { -1.0 }
            }
        };
        self.tree.update_history(sample);
    }

    /// Give the act node one child per pseudo-legal empty vertex, plus
    /// pass. Eye fills stay in: the tree must be able to find mandatory
    /// false-eye connections the playout policy refuses to play. Pass
    /// goes in first so a successful expansion is never empty; a full
    /// pool just truncates the child list.
    fn expand(&mut self, act: NodeId, board: &Board) -> bool {
        let child_player = board.act_player();
        let prior = self.config.node_prior;
        if !self.tree.alloc_child(act, child_player, Vertex::PASS, prior) {
            return false;
        }
        for i in 0..board.empty_count() {
            let v = board.empty_at(i);
            if board.is_pseudo_legal(child_player, v) {
                if !self.tree.alloc_child(act, child_player, v, prior) {
                    break;
                }
            }
        }
        true
    }

    pub fn node_count(&self) -> usize {
        self.tree.node_count()
    }

    /// Root children sorted by visit count, one line each; diagnostic
    /// output in the spirit of a principal-variation dump.
    pub fn root_summary(&self) -> String {
        let root = self.tree.root;
        let mut rows: Vec<(f32, f32, Vertex)> = self
            .tree
            .pool
            .node(root)
            .children
            .iter()
            .map(|&c| {
                let n = self.tree.pool.node(c);
                (n.stat.update_count(), n.stat.mean(), n.v)
            })
            .collect();
        rows.sort_by(|a, b| b.0.total_cmp(&a.0));
        let mut out = String::new();
        for (visits, mean, v) in rows.into_iter().take(10) {
            out.push_str(&format!("{:>5} {:8.0} {:+.3}\n", v.to_gtp(), visits, mean));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Zobrist;
    use std::sync::Arc;

    fn board() -> Board {
        Board::new(Arc::new(Zobrist::new(77)))
    }

    fn small_config() -> UctConfig {
        UctConfig {
            playout_cnt: 300,
            mature_threshold: 10.0,
            max_nodes: 50_000,
            seed: 4,
            ..Default::default()
        }
    }

    #[test]
    fn stat_mean_and_sign() {
        let mut s = Stat::new(1.0);
        s.update(1.0);
        s.update(1.0);
        s.update(-1.0);
        // prior counts as one neutral visit
        assert!((s.mean() - 0.25).abs() < 1e-6);
        assert!(s.ucb(Player::Black, 1.0) > s.ucb(Player::White, 1.0));
    }

    #[test]
    fn pool_reuses_freed_slots() {
        let mut pool = NodePool::new(4);
        let node = |v| Node {
            player: Player::Black,
            v,
            stat: Stat::new(1.0),
            children: Vec::new(),
        };
        let a = pool.alloc(node(Vertex::PASS)).unwrap();
        let _b = pool.alloc(node(Vertex::PASS)).unwrap();
        pool.release(a);
        assert_eq!(pool.live_count(), 1);
        let c = pool.alloc(node(Vertex::NONE)).unwrap();
        assert_eq!(c, a);
    }

    #[test]
    fn pool_respects_cap() {
        let mut pool = NodePool::new(1);
        let mk = || Node {
            player: Player::White,
            v: Vertex::PASS,
            stat: Stat::new(1.0),
            children: Vec::new(),
        };
        assert!(pool.alloc(mk()).is_some());
        assert!(pool.alloc(mk()).is_none());
    }

    #[test]
    fn locality_rings_combine_by_max() {
        let config = UctConfig::default();
        let v = Vertex::from_gtp("E4").unwrap();
        let orth = Vertex::from_gtp("E5").unwrap();
        let orth2 = Vertex::from_gtp("D4").unwrap();
        let diag = Vertex::from_gtp("D5").unwrap();
        // next to both recent stones: the factors never multiply
        assert_eq!(locality_factor(&config, v, [orth, orth2]), config.locality_orth);
        // one orthogonal ring, one diagonal ring: the stronger wins
        assert_eq!(locality_factor(&config, v, [orth, diag]), config.locality_orth);
        assert_eq!(locality_factor(&config, v, [Vertex::NONE, diag]), config.locality_diag);
        assert_eq!(locality_factor(&config, Vertex::PASS, [orth, diag]), 1.0);
    }

    #[test]
    fn locality_boosts_losing_local_moves_too() {
        let mut b = board();
        b.play_legal(Player::Black, Vertex::from_gtp("E5").unwrap());
        let config = UctConfig::default();

        // white to move, both candidates look lost for white
        let mut tree = Tree::new(100, Player::Black, 1.0);
        let local = Vertex::from_gtp("E4").unwrap();
        let distant = Vertex::from_gtp("A1").unwrap();
        tree.alloc_child(tree.root, Player::White, local, 1.0);
        tree.alloc_child(tree.root, Player::White, distant, 1.0);
        for _ in 0..8 {
            tree.pool.node_mut(tree.root).stat.update(1.0);
        }
        let children = tree.pool.node(tree.root).children.clone();
        for &c in &children {
            for _ in 0..4 {
                tree.pool.node_mut(c).stat.update(1.0);
            }
        }

        // a negative mean must not turn the boost into a penalty
        let picked = tree.uct_descend(&b, &config);
        assert_eq!(tree.pool.node(picked).v, local);
    }

    #[test]
    fn root_children_include_false_eye_fills() {
        let mut b = board();
        for s in ["D4", "F4", "E3", "E5"] {
            b.play_legal(Player::Black, Vertex::from_gtp(s).unwrap());
        }
        b.play_legal(Player::White, Vertex::from_gtp("D5").unwrap());
        let eye = Vertex::from_gtp("E4").unwrap();
        assert!(b.is_eyelike(Player::Black, eye));
        assert!(b.is_strict_legal(Player::Black, eye));

        // E4 is a false eye; the connection must be searchable
        let mut uct = Uct::new(small_config());
        uct.prepare(&b, Player::Black);
        let root = uct.tree.root;
        let children: Vec<Vertex> = uct
            .tree
            .pool
            .node(root)
            .children
            .iter()
            .map(|&c| uct.tree.pool.node(c).v)
            .collect();
        assert!(children.contains(&eye));
    }

    #[test]
    fn genmove_is_strictly_legal() {
        let mut b = board();
        let mut uct = Uct::new(small_config());
        let v = uct.genmove(&b, Player::Black);
        assert_ne!(v, Vertex::RESIGN);
        assert!(v == Vertex::PASS || b.is_strict_legal(Player::Black, v));
    }

    #[test]
    fn genmove_takes_the_big_capture() {
        let mut b = board();
        // five white stones on the second line with one liberty left
        for s in ["C2", "D2", "E2", "F2", "G2"] {
            b.play_legal(Player::White, Vertex::from_gtp(s).unwrap());
        }
        for s in ["C1", "D1", "E1", "F1", "G1", "C3", "D3", "E3", "F3", "B2", "H2"] {
            b.play_legal(Player::Black, Vertex::from_gtp(s).unwrap());
        }
        b.play_legal(Player::White, Vertex::from_gtp("G5").unwrap());
        // komi keeps the game close unless the capture succeeds
        b.set_komi(-6.5);
        assert_eq!(b.in_atari(Vertex::from_gtp("C2").unwrap()), Vertex::from_gtp("G3").unwrap());

        let mut uct = Uct::new(small_config());
        let v = uct.genmove(&b, Player::Black);
        assert_eq!(v, Vertex::from_gtp("G3").unwrap());
    }

    #[test]
    fn tree_reset_frees_everything() {
        let b = board();
        let mut uct = Uct::new(UctConfig {
            playout_cnt: 50,
            mature_threshold: 2.0,
            seed: 9,
            ..Default::default()
        });
        uct.genmove(&b, Player::Black);
        assert!(uct.node_count() > 1);
        uct.tree.reset(Player::White, 1.0);
        assert_eq!(uct.node_count(), 1);
    }
}
