// Static evaluation used at the search horizon.
//
// Scores are win ratios in [0, 1] from the point of view of one side, so the
// search sentinels (±100) can never be reached by a real position.

use crate::board::Side;
use crate::game::GameState;

/// Bounds for search scores; strictly outside every heuristic value.
pub const MIN_SCORE: f32 = -100.0;
pub const MAX_SCORE: f32 = 100.0;

/// Share of occupied cells held by `side`. Empty cells are ignored.
#[inline]
pub fn evaluate_terminal(game: &GameState, side: Side) -> f32 {
    let own = game.disk_count(side);
    let opponent = game.disk_count(side.opponent());
    if own + opponent == 0 {
        return 0.0;
    }
    own as f32 / (own + opponent) as f32
}
