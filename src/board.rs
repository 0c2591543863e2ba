use serde::{Deserialize, Serialize};
use std::fmt;

/// Board width and height. The board is always 8×8.
pub const BOARD_SIZE: i32 = 8;
pub const CELL_COUNT: usize = 64;

/// Colour of a cell, or of the player to move.
///
/// `None` doubles as "empty cell" and "nobody to move" (game over).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    #[default]
    None = 0,
    Black = 1,
    White = 2,
}

impl Side {
    #[inline]
    pub fn opponent(self) -> Side {
        match self {
            Side::Black => Side::White,
            Side::White => Side::Black,
            Side::None => Side::None,
        }
    }

    #[inline]
    pub fn is_player(self) -> bool {
        self != Side::None
    }

    #[inline]
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Side::Black,
            2 => Side::White,
            _ => Side::None,
        }
    }

    /// Single-character glyph used by the text board dump.
    pub fn glyph(self) -> char {
        match self {
            Side::None => '.',
            Side::Black => 'X',
            Side::White => 'O',
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Side::None => "none",
            Side::Black => "black",
            Side::White => "white",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    pub fn new(x: i32, y: i32) -> Self {
        Coordinate { x, y }
    }

    #[inline]
    pub fn in_bounds(&self) -> bool {
        in_bounds(self.x, self.y)
    }
}

#[inline]
pub fn in_bounds(x: i32, y: i32) -> bool {
    (0..BOARD_SIZE).contains(&x) && (0..BOARD_SIZE).contains(&y)
}

/// Fixed 64-cell board, indexed `y * 8 + x`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    #[serde(with = "cell_array")]
    cells: [Side; CELL_COUNT],
}

/// serde only derives fixed arrays up to 32 elements; cells travel as a sequence.
mod cell_array {
    use super::{Side, CELL_COUNT};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(cells: &[Side; CELL_COUNT], s: S) -> Result<S::Ok, S::Error> {
        cells.as_slice().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[Side; CELL_COUNT], D::Error> {
        let cells = Vec::<Side>::deserialize(d)?;
        let len = cells.len();
        cells
            .try_into()
            .map_err(|_| D::Error::invalid_length(len, &"64 cells"))
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// An empty board.
    pub fn new() -> Self {
        Board {
            cells: [Side::None; CELL_COUNT],
        }
    }

    /// Off-board coordinates read as `Side::None`, which terminates every line walk.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Side {
        if !in_bounds(x, y) {
            return Side::None;
        }
        self.cells[(y * BOARD_SIZE + x) as usize]
    }

    /// Writes outside the board are ignored.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, side: Side) {
        if !in_bounds(x, y) {
            return;
        }
        self.cells[(y * BOARD_SIZE + x) as usize] = side;
    }

    pub fn count(&self, side: Side) -> usize {
        self.cells.iter().filter(|&&c| c == side).count()
    }

    pub fn cells(&self) -> &[Side; CELL_COUNT] {
        &self.cells
    }

    pub fn clear(&mut self) {
        self.cells = [Side::None; CELL_COUNT];
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        fmt::Display::fmt(self, f)
    }
}

/// Rows are printed top-down (y = 7 first), matching the on-screen orientation.
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in (0..BOARD_SIZE).rev() {
            for x in 0..BOARD_SIZE {
                if x > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{}", self.get(x, y).glyph())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
