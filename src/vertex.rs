//! Vertex, player and color value types.
//!
//! A [`Vertex`] is an index into the padded 1D board array. Row 0 is the
//! top row of the board; GTP coordinates count rows from the bottom.
//! Pass, resign and "no vertex" are sentinel indices past the array so
//! that every per-vertex map stays a plain array.

use crate::constants::{CNT, N, W};

/// A point on the board, or one of the sentinels.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Vertex(u16);

impl Vertex {
    /// Pass move.
    pub const PASS: Vertex = Vertex(CNT as u16);
    /// "No vertex" sentinel.
    pub const NONE: Vertex = Vertex(CNT as u16 + 1);
    /// Resignation marker, returned by the search engine only.
    pub const RESIGN: Vertex = Vertex(CNT as u16 + 2);

    /// Vertex at 0-based on-board coordinates.
    #[inline]
    pub fn of_coords(row: usize, col: usize) -> Vertex {
        debug_assert!(row < N && col < N);
        Vertex(((row + 1) * W + col + 1) as u16)
    }

    /// Vertex from a raw padded-array index.
    #[inline]
    pub fn of_raw(idx: usize) -> Vertex {
        debug_assert!(idx < CNT + 3);
        Vertex(idx as u16)
    }

    /// Raw index into the padded array.
    #[inline]
    pub fn raw(self) -> usize {
        self.0 as usize
    }

    /// True for every padded-array index, including the guard ring.
    #[inline]
    pub fn is_in_array(self) -> bool {
        (self.0 as usize) < CNT
    }

    /// True only for playable vertices.
    #[inline]
    pub fn is_on_board(self) -> bool {
        let idx = self.0 as usize;
        if idx >= CNT {
            return false;
        }
        let (r, c) = (idx / W, idx % W);
        r >= 1 && r <= N && c >= 1 && c <= N
    }

    /// 0-based row; valid only for on-board vertices.
    #[inline]
    pub fn row(self) -> usize {
        self.0 as usize / W - 1
    }

    /// 0-based column; valid only for on-board vertices.
    #[inline]
    pub fn col(self) -> usize {
        self.0 as usize % W - 1
    }

    /// The 4 orthogonal neighbors. The guard ring makes this safe for any
    /// on-board vertex without bounds checks.
    #[inline]
    pub fn orth_nbrs(self) -> [Vertex; 4] {
        debug_assert!(self.is_on_board());
        let i = self.0;
        [
            Vertex(i - W as u16),
            Vertex(i - 1),
            Vertex(i + 1),
            Vertex(i + W as u16),
        ]
    }

    /// The 4 diagonal neighbors; same safety argument as [`orth_nbrs`].
    ///
    /// [`orth_nbrs`]: Vertex::orth_nbrs
    #[inline]
    pub fn diag_nbrs(self) -> [Vertex; 4] {
        debug_assert!(self.is_on_board());
        let i = self.0;
        [
            Vertex(i - W as u16 - 1),
            Vertex(i - W as u16 + 1),
            Vertex(i + W as u16 - 1),
            Vertex(i + W as u16 + 1),
        ]
    }

    /// Checked shift by (rows, cols); `None` unless the result is on board.
    /// Needed for the ±2 jump rings, which may leave the padded array.
    #[inline]
    pub fn shifted(self, dr: isize, dc: isize) -> Option<Vertex> {
        if !self.is_on_board() {
            return None;
        }
        let r = self.row() as isize + dr;
        let c = self.col() as isize + dc;
        if r < 0 || c < 0 || r >= N as isize || c >= N as isize {
            return None;
        }
        Some(Vertex::of_coords(r as usize, c as usize))
    }

    /// Iterator over all on-board vertices, row-major.
    pub fn all_on_board() -> impl Iterator<Item = Vertex> {
        (0..N).flat_map(|row| (0..N).map(move |col| Vertex::of_coords(row, col)))
    }

    /// Parse a GTP coordinate such as `"D4"` or `"pass"`.
    /// Column letters skip `I`; rows count from the bottom.
    pub fn from_gtp(s: &str) -> Option<Vertex> {
        if s.eq_ignore_ascii_case("pass") {
            return Some(Vertex::PASS);
        }
        if s.eq_ignore_ascii_case("resign") {
            return Some(Vertex::RESIGN);
        }
        let bytes = s.as_bytes();
        if bytes.len() < 2 {
            return None;
        }
        let col_char = bytes[0].to_ascii_uppercase();
        if !col_char.is_ascii_uppercase() || col_char == b'I' {
            return None;
        }
        let mut col = (col_char - b'A') as usize;
        if col_char > b'I' {
            col -= 1;
        }
        let row_num: usize = s[1..].parse().ok()?;
        if col >= N || row_num < 1 || row_num > N {
            return None;
        }
        Some(Vertex::of_coords(N - row_num, col))
    }

    /// Format as a GTP coordinate.
    pub fn to_gtp(self) -> String {
        if self == Vertex::PASS {
            return "pass".into();
        }
        if self == Vertex::RESIGN {
            return "resign".into();
        }
        if !self.is_on_board() {
            return "none".into();
        }
        let mut c = b'A' + self.col() as u8;
        if c >= b'I' {
            c += 1;
        }
        format!("{}{}", c as char, N - self.row())
    }
}

/// One of the two players.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Player {
    Black,
    White,
}

impl Player {
    #[inline]
    pub fn other(self) -> Player {
        match self {
            Player::Black => Player::White,
            Player::White => Player::Black,
        }
    }

    #[inline]
    pub fn idx(self) -> usize {
        match self {
            Player::Black => 0,
            Player::White => 1,
        }
    }

    /// +1 for Black, -1 for White; the sign outcome samples carry.
    #[inline]
    pub fn sign(self) -> i32 {
        match self {
            Player::Black => 1,
            Player::White => -1,
        }
    }

    /// Winner of an integral score (White wins the half-point draws).
    #[inline]
    pub fn winner_of(score: i32) -> Player {
        if score <= 0 { Player::White } else { Player::Black }
    }

    pub fn from_gtp(s: &str) -> Option<Player> {
        match s.to_ascii_lowercase().as_str() {
            "b" | "black" => Some(Player::Black),
            "w" | "white" => Some(Player::White),
            _ => None,
        }
    }
}

/// Contents of a vertex.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Color {
    Black,
    White,
    Empty,
    OffBoard,
}

impl Color {
    #[inline]
    pub fn of_player(pl: Player) -> Color {
        match pl {
            Player::Black => Color::Black,
            Player::White => Color::White,
        }
    }

    #[inline]
    pub fn is_player(self) -> bool {
        matches!(self, Color::Black | Color::White)
    }

    #[inline]
    pub fn to_player(self) -> Option<Player> {
        match self {
            Color::Black => Some(Player::Black),
            Color::White => Some(Player::White),
            _ => None,
        }
    }

    /// Character used by the plain-text board format.
    pub fn to_char(self) -> char {
        match self {
            Color::Black => '#',
            Color::White => 'O',
            Color::Empty => '.',
            Color::OffBoard => '*',
        }
    }

    pub fn from_char(c: char) -> Option<Color> {
        match c {
            '#' => Some(Color::Black),
            'O' => Some(Color::White),
            '.' => Some(Color::Empty),
            _ => None,
        }
    }
}

/// A (player, vertex) pair as recorded in the move history.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Move {
    pub player: Player,
    pub vertex: Vertex,
}

impl Move {
    #[inline]
    pub fn new(player: Player, vertex: Vertex) -> Move {
        Move { player, vertex }
    }
}
