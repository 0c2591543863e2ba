//! Symmetry-reduced features of a candidate move.
//!
//! The board has 8-fold symmetry. Every cell folds into one of 10 canonical places in
//! the lower-left octant:
//!
//! ```text
//! y=3:       9
//! y=2:     7 8
//! y=1:   4 5 6
//! y=0: 0 1 2 3
//!   x: 0 1 2 3
//! ```
//!
//! Directions go through the same mirror/swap and are then coded counter-clockwise
//! from east: 0=E 1=NE 2=N 3=NW 4=W 5=SW 6=S 7=SE.

use crate::board::{in_bounds, Side, BOARD_SIZE};
use crate::game::GameState;
use crate::moves::DIRECTIONS;
use arrayvec::ArrayVec;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub const PLACE_COUNT: usize = 10;
pub const DIRECTION_COUNT: usize = 8;
pub const NEIGHBOR_COUNT_RANGE: usize = 8;
pub const AFFECTED_DISKS_RANGE: usize = 7;
pub const COLOR_CHANGE_RANGE: usize = 7;
pub const ISLANDS_RANGE: usize = 5;

/// Canonical direction vectors indexed by direction code.
const CANONICAL_DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

static PLACE_TABLE: Lazy<[u8; 64]> = Lazy::new(|| {
    let mut table = [0u8; 64];
    for y in 0..BOARD_SIZE {
        for x in 0..BOARD_SIZE {
            table[(y * BOARD_SIZE + x) as usize] = fold_place(x, y);
        }
    }
    table
});

/// One feature vector: a (move location, direction) pair seen from the mover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Features {
    /// In range [0, 9].
    pub generalized_place: u8,
    /// Canonical direction code in range [0, 7].
    pub direction: u8,
    /// Occupied cells before the first empty one, in [0, 7].
    pub neighbor_count: u8,
    /// Opponent disks that would be flipped along this line, in [0, 6].
    pub affected_disks_count: u8,
    /// Colour changes among the neighbouring disks, in [0, 6]. Weak feature.
    pub neighbor_color_change_count: u8,
    /// Runs of disks separated by empty cells, in [0, 4]. Weak feature.
    pub islands_count: u8,
}

/// Mirror into the lower-left quadrant, then order so that x >= y.
#[inline]
fn fold(x: i32, y: i32) -> (i32, i32, bool, bool, bool) {
    let mirror_x = x >= BOARD_SIZE / 2;
    let mirror_y = y >= BOARD_SIZE / 2;
    let fx = if mirror_x { BOARD_SIZE - 1 - x } else { x };
    let fy = if mirror_y { BOARD_SIZE - 1 - y } else { y };
    let swap = fx < fy;
    if swap {
        (fy, fx, mirror_x, mirror_y, swap)
    } else {
        (fx, fy, mirror_x, mirror_y, swap)
    }
}

fn fold_place(x: i32, y: i32) -> u8 {
    let (fx, fy, ..) = fold(x, y);
    let place = match fy {
        0 => fx,
        1 => fx + 3,
        2 => fx + 5,
        _ => fx + 6,
    };
    place as u8
}

/// Canonical place of (x, y). Off-board input is a caller bug.
#[inline]
pub fn generalized_place(x: i32, y: i32) -> u8 {
    debug_assert!(in_bounds(x, y), "place ({x}, {y}) is off the board");
    PLACE_TABLE[(y * BOARD_SIZE + x) as usize]
}

/// Canonical code of direction (dx, dy) taken from (x, y). `None` for the null direction.
pub fn generalized_direction(x: i32, y: i32, dx: i32, dy: i32) -> Option<u8> {
    if dx == 0 && dy == 0 {
        return None;
    }
    let (_, _, mirror_x, mirror_y, swap) = fold(x, y);
    let mut cdx = if mirror_x { -dx } else { dx };
    let mut cdy = if mirror_y { -dy } else { dy };
    if swap {
        std::mem::swap(&mut cdx, &mut cdy);
    }
    CANONICAL_DIRECTIONS
        .iter()
        .position(|&d| d == (cdx.signum(), cdy.signum()))
        .map(|code| code as u8)
}

/// Inverse of [`generalized_direction`]: the real (dx, dy) at (x, y) for a canonical code.
/// `None` for codes outside [0, 7].
pub fn ungeneralized_direction(x: i32, y: i32, code: u8) -> Option<(i32, i32)> {
    let (_, _, mirror_x, mirror_y, swap) = fold(x, y);
    let (mut dx, mut dy) = *CANONICAL_DIRECTIONS.get(code as usize)?;
    if swap {
        std::mem::swap(&mut dx, &mut dy);
    }
    if mirror_x {
        dx = -dx;
    }
    if mirror_y {
        dy = -dy;
    }
    Some((dx, dy))
}

/// Feature vectors for the side to move placing at (x, y), one per entry of
/// [`DIRECTIONS`], in that order.
pub fn extract(state: &GameState, x: i32, y: i32) -> ArrayVec<Features, 8> {
    let turn = state.current_turn();
    let place = generalized_place(x, y);
    DIRECTIONS
        .iter()
        .filter_map(|&(dx, dy)| {
            let direction = generalized_direction(x, y, dx, dy)?;
            let mut features = walk(state, turn, x, y, dx, dy);
            features.generalized_place = place;
            features.direction = direction;
            Some(features)
        })
        .collect()
}

fn walk(state: &GameState, turn: Side, x: i32, y: i32, dx: i32, dy: i32) -> Features {
    let mut features = Features::default();
    let mut passed_empty = false;
    let mut passed_own = false;
    let mut last = Side::None;
    let (mut wx, mut wy) = (x + dx, y + dy);

    while in_bounds(wx, wy) {
        let side = state.get(wx, wy);
        if !passed_empty {
            if side != Side::None {
                features.neighbor_count += 1;
            }
            if !passed_own {
                if side == Side::None {
                    features.affected_disks_count = 0;
                } else if side != turn {
                    features.affected_disks_count += 1;
                }
            }
            if side != Side::None && last != Side::None && side != last {
                features.neighbor_color_change_count += 1;
            }
        }
        if side != Side::None && last == Side::None {
            features.islands_count += 1;
        }

        if side == Side::None {
            passed_empty = true;
        }
        if side == turn {
            passed_own = true;
        }
        last = side;
        wx += dx;
        wy += dy;
    }

    if !passed_own {
        features.affected_disks_count = 0;
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_map() {
        assert_eq!(generalized_place(0, 0), 0);
        assert_eq!(generalized_place(7, 7), 0);
        assert_eq!(generalized_place(3, 0), 3);
        assert_eq!(generalized_place(0, 3), 3);
        assert_eq!(generalized_place(1, 1), 4);
        assert_eq!(generalized_place(6, 2), 5);
        assert_eq!(generalized_place(2, 2), 7);
        assert_eq!(generalized_place(3, 3), 9);
        assert_eq!(generalized_place(4, 4), 9);
        let mut seen: Vec<u8> = PLACE_TABLE.to_vec();
        seen.sort();
        seen.dedup();
        assert_eq!(seen, (0..PLACE_COUNT as u8).collect::<Vec<_>>());
    }

    #[test]
    fn test_direction_codes_in_canonical_corner() {
        // (1, 0) needs neither mirror nor swap.
        assert_eq!(generalized_direction(1, 0, 1, 0), Some(0));
        assert_eq!(generalized_direction(1, 0, 1, 1), Some(1));
        assert_eq!(generalized_direction(1, 0, 0, 1), Some(2));
        assert_eq!(generalized_direction(1, 0, -1, 1), Some(3));
        assert_eq!(generalized_direction(1, 0, -1, 0), Some(4));
        assert_eq!(generalized_direction(1, 0, -1, -1), Some(5));
        assert_eq!(generalized_direction(1, 0, 0, -1), Some(6));
        assert_eq!(generalized_direction(1, 0, 1, -1), Some(7));
    }

    #[test]
    fn test_mirrored_corners_agree() {
        // Pointing along the edge from every corner is the same canonical direction.
        let east_from_origin = generalized_direction(0, 0, 1, 0);
        assert_eq!(generalized_direction(7, 0, -1, 0), east_from_origin);
        assert_eq!(generalized_direction(0, 7, 1, 0), east_from_origin);
        assert_eq!(generalized_direction(7, 7, -1, 0), east_from_origin);
        // (0, 1) from (1, 0) mirrors onto (1, 0) from (0, 1) through the diagonal swap.
        assert_eq!(
            generalized_direction(0, 1, 1, 0),
            generalized_direction(1, 0, 0, 1)
        );
    }

    #[test]
    fn test_inverse_closes() {
        for x in 0..8 {
            for y in 0..8 {
                for &(dx, dy) in DIRECTIONS.iter() {
                    let code = generalized_direction(x, y, dx, dy).unwrap();
                    assert!((code as usize) < DIRECTION_COUNT);
                    assert_eq!(ungeneralized_direction(x, y, code), Some((dx, dy)));
                }
            }
        }
    }

    #[test]
    fn test_rejects_null_direction_and_bad_code() {
        for x in 0..8 {
            for y in 0..8 {
                assert_eq!(generalized_direction(x, y, 0, 0), None);
                assert_eq!(ungeneralized_direction(x, y, DIRECTION_COUNT as u8), None);
                assert_eq!(ungeneralized_direction(x, y, u8::MAX), None);
            }
        }
    }

    #[test]
    fn test_opening_features() {
        let game = GameState::new();
        let features = extract(&game, 5, 3);
        // West of (5, 3): white (4, 3) then black (3, 3), then empties.
        let west = features[1];
        assert_eq!(west.neighbor_count, 2);
        assert_eq!(west.affected_disks_count, 1);
        assert_eq!(west.neighbor_color_change_count, 1);
        assert_eq!(west.islands_count, 1);
        // East of (5, 3) is empty all the way.
        let east = features[6];
        assert_eq!(east, Features {
            generalized_place: east.generalized_place,
            direction: east.direction,
            ..Features::default()
        });
        assert!(features.iter().all(|f| f.generalized_place == 8));
    }

    #[test]
    fn test_affected_needs_own_disk() {
        let mut game = GameState::new();
        game.board_mut().clear();
        game.board_mut().set(1, 0, Side::White);
        game.board_mut().set(2, 0, Side::White);
        game.board_mut().set(4, 0, Side::Black);
        let features = extract(&game, 0, 0);
        let east = features[6];
        assert_eq!(east.neighbor_count, 2);
        // The black disk sits beyond an empty cell, so nothing is flanked.
        assert_eq!(east.affected_disks_count, 0);
        assert_eq!(east.islands_count, 2);
        assert_eq!(east.neighbor_color_change_count, 0);
    }
}
