//! Post-game credit assignment.
//!
//! The finished game is replayed from the opening. Each (move, capturing line) pair
//! owns impact records on the cells it changed. Later moves that flip those cells
//! decay the records and hand the owner a share of the new placement; later moves
//! anchored on one of them extend the owner's records along the anchored line.
//! At the end, a key's raw impact is the weight of its records that still show the
//! winner's colour, normalised per side and scaled by that side's game feedback.

use crate::board::Side;
use crate::error::EvolvingError;
use crate::features::{self, Features};
use crate::game::GameState;
use crate::moves::{direction_toward, Change, Move};
use arrayvec::ArrayVec;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Share of the game feedback granted for winning at all.
pub const WIN_BASE_FEEDBACK: f32 = 0.25;
/// Factor applied each time an impact is carried further.
pub const IMPACT_REDUCTION: f32 = 0.125;
/// Floor for the per-side normaliser.
const MIN_MAX_IMPACT: f32 = 1e-6;

type Location = (i32, i32);

/// A capturing line of one history move: (index into history, index into `DIRECTIONS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImpactKey {
    pub move_index: usize,
    pub direction: usize,
}

#[derive(Debug, Clone, Copy)]
struct Impact {
    /// Latest change seen at the record's cell.
    change: Change,
    factor: f32,
}

/// Impact records in an arena, indexed both ways. Each (key, location) pair holds
/// at most one record; a record may be shared by both indexes.
#[derive(Default)]
struct ImpactArena {
    records: Vec<Impact>,
    by_key: FxHashMap<ImpactKey, FxHashMap<Location, usize>>,
    by_location: FxHashMap<Location, FxHashMap<ImpactKey, usize>>,
}

impl ImpactArena {
    fn insert(&mut self, key: ImpactKey, impact: Impact) {
        let id = self.records.len();
        let location = impact.change.location();
        self.records.push(impact);
        self.by_key.entry(key).or_default().insert(location, id);
        self.by_location.entry(location).or_default().insert(key, id);
    }

    /// Inserts unless the key already holds a stronger record at that cell.
    fn offer(&mut self, key: ImpactKey, impact: Impact) {
        let location = impact.change.location();
        let existing = self
            .by_key
            .get(&key)
            .and_then(|cells| cells.get(&location))
            .map(|&id| self.records[id].factor);
        if existing.is_some_and(|factor| factor > impact.factor) {
            return;
        }
        self.insert(key, impact);
    }

    /// Owners with a record at `location`, in key order.
    fn owners_at(&self, location: Location) -> Vec<(ImpactKey, usize)> {
        let mut owners: Vec<(ImpactKey, usize)> = self
            .by_location
            .get(&location)
            .map(|m| m.iter().map(|(&k, &id)| (k, id)).collect())
            .unwrap_or_default();
        owners.sort_unstable_by_key(|&(k, _)| k);
        owners
    }

    /// Sum, per key, of the records whose latest change shows `winner`.
    fn raw_impacts(&self, winner: Side) -> FxHashMap<ImpactKey, f32> {
        self.by_key
            .iter()
            .map(|(&key, cells)| {
                let total = cells
                    .values()
                    .map(|&id| self.records[id])
                    .filter(|r| r.change.new == winner)
                    .map(|r| r.factor)
                    .sum();
                (key, total)
            })
            .collect()
    }
}

/// Feedback for the 8 feature vectors of one history move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveFeedback {
    pub turn: Side,
    pub x: i32,
    pub y: i32,
    /// Features seen by the mover before playing, in `DIRECTIONS` order.
    pub features: ArrayVec<Features, 8>,
    /// In [-1, 1], aligned with `features`.
    pub feedback: [f32; 8],
}

/// Everything a learning pass writes, computed without touching the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPlan {
    pub winner: Side,
    pub black_feedback: f32,
    pub white_feedback: f32,
    pub moves: Vec<MoveFeedback>,
}

/// Game-level feedback for black; white gets the negation.
///
/// `(2 * ratio - 1) * 0.75 + 0.25` for a black win, `- 0.25` for a loss, no bonus
/// for a draw. Always within [-1, 1].
pub fn black_feedback(black: usize, white: usize) -> f32 {
    let total = black + white;
    let ratio = if total == 0 {
        0.5
    } else {
        black as f32 / total as f32
    };
    let bonus = match black.cmp(&white) {
        std::cmp::Ordering::Greater => WIN_BASE_FEEDBACK,
        std::cmp::Ordering::Less => -WIN_BASE_FEEDBACK,
        std::cmp::Ordering::Equal => 0.0,
    };
    (ratio * 2.0 - 1.0) * (1.0 - WIN_BASE_FEEDBACK) + bonus
}

/// A history being replayed from the opening, with the impact records so far.
struct Replay {
    state: GameState,
    arena: ImpactArena,
}

impl Replay {
    fn new() -> Self {
        Replay {
            state: GameState::new(),
            arena: ImpactArena::default(),
        }
    }

    /// Credits history move `index`, then applies it. The returned entry carries the
    /// mover's features from before the move and no feedback yet.
    fn step(&mut self, index: usize, mv: &Move) -> Result<MoveFeedback, EvolvingError> {
        let placement = verify_mover(&self.state, index, mv)?;
        let (px, py) = placement.location();
        let arena = &mut self.arena;

        // Captured cells that carried earlier impacts: decay in place, re-point at the
        // new change, and give each owner a share of the new placement.
        for change in mv.flips() {
            for (owner, id) in arena.owners_at(change.location()) {
                let factor = arena.records[id].factor * IMPACT_REDUCTION;
                arena.records[id] = Impact {
                    change: *change,
                    factor,
                };
                arena.offer(
                    owner,
                    Impact {
                        change: *placement,
                        factor,
                    },
                );
            }
        }

        // Anchors: whoever owns the anchor cell shares in every cell of the line.
        for end in &mv.ends {
            let Some(direction) = direction_toward(px, py, end.x, end.y) else {
                continue;
            };
            let owners = arena.owners_at(end.location());
            if owners.is_empty() {
                continue;
            }
            for change in line_changes(mv, px, py, direction) {
                for &(owner, id) in &owners {
                    let factor = arena.records[id].factor * IMPACT_REDUCTION;
                    arena.offer(owner, Impact { change, factor });
                }
            }
        }

        // Direct impacts. The placement belongs to every capturing line.
        for change in mv.flips() {
            if let Some(direction) = direction_toward(px, py, change.x, change.y) {
                let key = ImpactKey {
                    move_index: index,
                    direction,
                };
                arena.insert(key, Impact { change: *change, factor: 1.0 });
            }
        }
        for end in &mv.ends {
            if let Some(direction) = direction_toward(px, py, end.x, end.y) {
                let key = ImpactKey {
                    move_index: index,
                    direction,
                };
                arena.insert(
                    key,
                    Impact {
                        change: *placement,
                        factor: 1.0,
                    },
                );
            }
        }

        let entry = MoveFeedback {
            turn: mv.turn,
            x: px,
            y: py,
            features: features::extract(&self.state, px, py),
            feedback: [0.0; 8],
        };

        if self.state.make_move(px, py).is_none() {
            return Err(EvolvingError::IllegalHistory { index, x: px, y: py });
        }
        trace!(index, x = px, y = py, turn = %mv.turn, "replayed");
        Ok(entry)
    }
}

/// Replays `finished` and computes per-feature feedback.
pub fn run(finished: &GameState) -> Result<LearningPlan, EvolvingError> {
    let black = finished.disk_count(Side::Black);
    let white = finished.disk_count(Side::White);
    let black_fb = black_feedback(black, white);
    let white_fb = -black_fb;
    let winner = finished.winner();

    let history = finished.history();
    let mut replay = Replay::new();
    let mut moves = Vec::with_capacity(history.len());
    for (index, mv) in history.iter().enumerate() {
        moves.push(replay.step(index, mv)?);
    }
    let Replay { state, arena } = replay;

    if state.board() != finished.board() {
        return Err(EvolvingError::ReplayMismatch);
    }

    let raw = arena.raw_impacts(winner);
    let mut max_black = MIN_MAX_IMPACT;
    let mut max_white = MIN_MAX_IMPACT;
    for (key, &impact) in &raw {
        match moves[key.move_index].turn {
            Side::Black => max_black = max_black.max(impact),
            Side::White => max_white = max_white.max(impact),
            Side::None => {}
        }
    }

    for (index, entry) in moves.iter_mut().enumerate() {
        let (side_fb, max) = match entry.turn {
            Side::Black => (black_fb, max_black),
            _ => (white_fb, max_white),
        };
        for (direction, slot) in entry.feedback.iter_mut().enumerate() {
            let key = ImpactKey {
                move_index: index,
                direction,
            };
            let impact = raw.get(&key).copied().unwrap_or(0.0);
            *slot = impact / max * side_fb;
        }
    }

    debug!(
        moves = moves.len(),
        black,
        white,
        black_feedback = black_fb,
        max_black,
        max_white,
        "credit assigned"
    );

    Ok(LearningPlan {
        winner,
        black_feedback: black_fb,
        white_feedback: white_fb,
        moves,
    })
}

fn verify_mover<'a>(
    state: &GameState,
    index: usize,
    mv: &'a Move,
) -> Result<&'a Change, EvolvingError> {
    let expected = state.current_turn();
    let Some(placement) = mv.placement() else {
        return Err(EvolvingError::CorruptHistory {
            index,
            recorded: mv.turn,
            expected,
        });
    };
    if expected == Side::None || mv.turn != expected || placement.new != expected {
        return Err(EvolvingError::CorruptHistory {
            index,
            recorded: if mv.turn != expected { mv.turn } else { placement.new },
            expected,
        });
    }
    Ok(placement)
}

/// The placement followed by the flips of the line in `direction`.
fn line_changes(mv: &Move, px: i32, py: i32, direction: usize) -> Vec<Change> {
    mv.changes
        .iter()
        .enumerate()
        .filter(|&(i, c)| i == 0 || direction_toward(px, py, c.x, c.y) == Some(direction))
        .map(|(_, c)| *c)
        .collect()
}
