use crate::board::{in_bounds, Board, Coordinate, Side, BOARD_SIZE};
use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// The 8 compass directions, dx-major. Feature vectors and learning keys use
/// indices into this table.
pub const DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Legal placements, at most one per cell.
pub type MoveList = ArrayVec<Coordinate, 64>;

/// Anchor cells of a move; one per capturing line, so never more than 8.
pub type Ends = SmallVec<[Change; 8]>;

#[inline]
pub fn direction_index(dx: i32, dy: i32) -> Option<usize> {
    DIRECTIONS.iter().position(|&d| d == (dx, dy))
}

/// Index of the direction pointing from `from` toward `to`, by coordinate signs.
/// `None` when both cells coincide.
#[inline]
pub fn direction_toward(from_x: i32, from_y: i32, to_x: i32, to_y: i32) -> Option<usize> {
    direction_index((to_x - from_x).signum(), (to_y - from_y).signum())
}

/// A single cell transition caused by a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Change {
    pub x: i32,
    pub y: i32,
    pub old: Side,
    pub new: Side,
}

impl Change {
    pub fn new(x: i32, y: i32, old: Side, new: Side) -> Self {
        Change { x, y, old, new }
    }

    #[inline]
    pub fn location(&self) -> (i32, i32) {
        (self.x, self.y)
    }
}

/// One full turn: the placement (first change), the flips, and the anchors.
///
/// `turn == Side::None` marks a request that did nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub turn: Side,
    pub changes: Vec<Change>,
    pub ends: Ends,
}

impl Move {
    pub fn none() -> Self {
        Move {
            turn: Side::None,
            changes: Vec::new(),
            ends: Ends::new(),
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.turn == Side::None
    }

    /// The placement change, if this is a real move.
    #[inline]
    pub fn placement(&self) -> Option<&Change> {
        self.changes.first()
    }

    /// Flipped cells, without the placement.
    pub fn flips(&self) -> &[Change] {
        self.changes.get(1..).unwrap_or(&[])
    }
}

/// Number of opposing disks `side` would flank from (x, y) along (dx, dy).
/// Zero when the run is empty or not closed by a `side` disk.
pub fn flank_length(board: &Board, x: i32, y: i32, dx: i32, dy: i32, side: Side) -> i32 {
    if !side.is_player() {
        return 0;
    }
    let other = side.opponent();
    let mut count = 0;
    let mut wx = x + dx;
    let mut wy = y + dy;
    while board.get(wx, wy) == other {
        count += 1;
        wx += dx;
        wy += dy;
    }
    if count > 0 && board.get(wx, wy) == side {
        count
    } else {
        0
    }
}

pub fn can_place(board: &Board, x: i32, y: i32, side: Side) -> bool {
    if !side.is_player() || !in_bounds(x, y) || board.get(x, y) != Side::None {
        return false;
    }
    DIRECTIONS
        .iter()
        .any(|&(dx, dy)| flank_length(board, x, y, dx, dy, side) > 0)
}

/// All legal cells for `side`, scanned x-major then y.
pub fn get_legal_moves(board: &Board, side: Side) -> MoveList {
    let mut moves = MoveList::new();
    for x in 0..BOARD_SIZE {
        for y in 0..BOARD_SIZE {
            if can_place(board, x, y, side) {
                moves.push(Coordinate::new(x, y));
            }
        }
    }
    moves
}

pub fn has_legal_move(board: &Board, side: Side) -> bool {
    (0..BOARD_SIZE).any(|x| (0..BOARD_SIZE).any(|y| can_place(board, x, y, side)))
}

/// Computes the changes and anchors of placing `side` at (x, y) without applying them.
/// Returns `Move::none()` if no line captures.
pub fn build_move(board: &Board, x: i32, y: i32, side: Side) -> Move {
    if !side.is_player() || !in_bounds(x, y) || board.get(x, y) != Side::None {
        return Move::none();
    }

    let mut changes = Vec::with_capacity(20);
    let mut ends = Ends::new();
    for &(dx, dy) in DIRECTIONS.iter() {
        let run = flank_length(board, x, y, dx, dy, side);
        if run == 0 {
            continue;
        }
        if changes.is_empty() {
            changes.push(Change::new(x, y, Side::None, side));
        }
        for step in 1..=run {
            let (fx, fy) = (x + dx * step, y + dy * step);
            changes.push(Change::new(fx, fy, board.get(fx, fy), side));
        }
        let (ex, ey) = (x + dx * (run + 1), y + dy * (run + 1));
        ends.push(Change::new(ex, ey, side, side));
    }

    if changes.is_empty() {
        return Move::none();
    }
    Move {
        turn: side,
        changes,
        ends,
    }
}
