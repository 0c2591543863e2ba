//! Fixed-depth minimax with alpha-beta pruning.
//!
//! Every simulated move is applied to a clone of the position, so a search never
//! mutates the caller's `GameState`. Root moves are scanned x-major then y and the
//! first strictly best move wins; there is no randomness at this layer.

use crate::board::{Coordinate, Side};
use crate::evaluation::{evaluate_terminal, MAX_SCORE, MIN_SCORE};
use crate::game::GameState;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_DEPTH: u32 = 3;

/// Outcome of a root search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub best: Option<Coordinate>,
    /// Win ratio of the chosen line for the mover; `MIN_SCORE` when there is no move.
    pub score: f32,
    pub nodes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchAgent {
    depth: u32,
}

impl Default for SearchAgent {
    fn default() -> Self {
        Self::new(DEFAULT_DEPTH)
    }
}

impl SearchAgent {
    pub fn new(depth: u32) -> Self {
        SearchAgent { depth }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn set_depth(&mut self, depth: u32) {
        self.depth = depth;
    }

    pub fn decide(&self, state: &GameState) -> Option<Coordinate> {
        self.search(state).best
    }

    pub fn search(&self, state: &GameState) -> SearchResult {
        let mut result = SearchResult {
            best: None,
            score: MIN_SCORE,
            nodes: 0,
        };
        let mover = state.current_turn();
        if mover == Side::None || state.is_game_over() {
            return result;
        }

        for cell in state.legal_moves() {
            let mut child = state.clone();
            child.make_move(cell.x, cell.y);
            result.nodes += 1;
            let score = score(
                &child,
                mover,
                self.depth,
                result.score,
                MAX_SCORE,
                &mut result.nodes,
            );
            if score > result.score {
                result.score = score;
                result.best = Some(cell);
            }
        }

        debug!(
            depth = self.depth,
            nodes = result.nodes,
            score = result.score,
            best = ?result.best,
            "search finished"
        );
        result
    }
}

/// Minimax value of `state` for `side`, searched `depth` plies deep.
///
/// Nodes where `side` is to move maximise; all others minimise. A position with no
/// legal move for the side to move is scored by the heuristic directly.
pub fn score(
    state: &GameState,
    side: Side,
    depth: u32,
    mut alpha: f32,
    mut beta: f32,
    nodes: &mut u64,
) -> f32 {
    if depth == 0 {
        return evaluate_terminal(state, side);
    }

    let moves = state.legal_moves();
    if moves.is_empty() {
        return evaluate_terminal(state, side);
    }

    let maximize = state.current_turn() == side;
    let mut best = if maximize { MIN_SCORE } else { MAX_SCORE };
    for cell in moves {
        let mut child = state.clone();
        child.make_move(cell.x, cell.y);
        *nodes += 1;
        let local = score(&child, side, depth - 1, alpha, beta, nodes);
        if maximize {
            if local > best {
                best = local;
                if best >= beta {
                    return best;
                }
                if best > alpha {
                    alpha = best;
                }
            }
        } else if local < best {
            best = local;
            if best <= alpha {
                return best;
            }
            if best < beta {
                beta = best;
            }
        }
    }
    best
}

/// Convenience wrapper used by drivers that only want the move.
pub fn get_best_move(state: &GameState, depth: u32) -> Option<Coordinate> {
    SearchAgent::new(depth).decide(state)
}

/// Nodes visited by a root search of the given depth.
pub fn node_count_for_depth(state: &GameState, depth: u32) -> u64 {
    SearchAgent::new(depth).search(state).nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn greedy(state: &GameState) -> Option<Coordinate> {
        let mover = state.current_turn();
        let mut best = None;
        let mut best_score = MIN_SCORE;
        for cell in state.legal_moves() {
            let mut child = state.clone();
            child.make_move(cell.x, cell.y);
            let s = evaluate_terminal(&child, mover);
            if s > best_score {
                best_score = s;
                best = Some(cell);
            }
        }
        best
    }

    #[test]
    fn test_depth_one_opening_tie_break() {
        let game = GameState::new();
        assert_eq!(SearchAgent::new(1).decide(&game), Some(Coordinate::new(2, 4)));
    }

    #[test]
    fn test_depth_zero_matches_greedy() {
        let mut game = GameState::new();
        let agent = SearchAgent::new(0);
        for _ in 0..20 {
            if game.is_game_over() {
                break;
            }
            let chosen = agent.decide(&game);
            assert_eq!(chosen, greedy(&game));
            let cell = chosen.unwrap();
            game.make_move(cell.x, cell.y);
        }
    }

    #[test]
    fn test_search_does_not_touch_state() {
        let mut game = GameState::new();
        game.make_move(5, 3);
        let board = game.board().clone();
        let history = game.history().len();
        let _ = SearchAgent::new(3).decide(&game);
        assert_eq!(game.board(), &board);
        assert_eq!(game.history().len(), history);
        assert_eq!(game.current_turn(), Side::White);
    }

    #[test]
    fn test_no_move_when_game_over() {
        let mut game = GameState::new();
        game.board_mut().clear();
        game.board_mut().set(0, 0, Side::Black);
        game.board_mut().set(1, 0, Side::White);
        game.make_move(2, 0);
        assert!(game.is_game_over());
        let result = SearchAgent::new(2).search(&game);
        assert_eq!(result.best, None);
        assert_eq!(result.nodes, 0);
    }

    #[test]
    fn test_scores_stay_in_unit_range() {
        let game = GameState::new();
        let result = SearchAgent::new(3).search(&game);
        assert!(result.score >= 0.0 && result.score <= 1.0);
        assert!(result.nodes > 4);
    }

    #[test]
    fn test_depth_accessors() {
        let mut agent = SearchAgent::default();
        assert_eq!(agent.depth(), DEFAULT_DEPTH);
        agent.set_depth(5);
        assert_eq!(agent.depth(), 5);
    }
}
