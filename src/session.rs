//! Headless game driver: one board, one agent, and which seats the agent plays.
//!
//! Player 1 is the human-facing seat. Its colour alternates on every replay so a
//! learning agent gets to play both sides.

use crate::board::{Coordinate, Side};
use crate::error::AgentError;
use crate::game::GameState;
use crate::moves::Move;
use crate::{Agent, AnyAgent};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Player {
    One,
    Two,
}

pub struct Session {
    state: GameState,
    agent: AnyAgent,
    player1_side: Side,
    player1_ai: bool,
    player2_ai: bool,
}

impl Session {
    /// Player 1 starts as black. Both seats start human; hand them to `agent` with
    /// [`Session::set_ai`].
    pub fn new(agent: AnyAgent) -> Self {
        Session {
            state: GameState::new(),
            agent,
            player1_side: Side::Black,
            player1_ai: false,
            player2_ai: false,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn agent(&self) -> &AnyAgent {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut AnyAgent {
        &mut self.agent
    }

    pub fn player1_side(&self) -> Side {
        self.player1_side
    }

    pub fn side_of(&self, player: Player) -> Side {
        match player {
            Player::One => self.player1_side,
            Player::Two => self.player1_side.opponent(),
        }
    }

    pub fn is_ai(&self, player: Player) -> bool {
        match player {
            Player::One => self.player1_ai,
            Player::Two => self.player2_ai,
        }
    }

    pub fn set_ai(&mut self, player: Player, enabled: bool) {
        match player {
            Player::One => self.player1_ai = enabled,
            Player::Two => self.player2_ai = enabled,
        }
    }

    /// Whether the side to move is controlled by the agent.
    pub fn is_ai_turn(&self) -> bool {
        match self.state.current_turn() {
            Side::None => false,
            side if side == self.player1_side => self.player1_ai,
            _ => self.player2_ai,
        }
    }

    /// Plays (x, y) for the side to move. When that move ends the game the agent
    /// learns from it before this returns.
    pub fn make_move(&mut self, x: i32, y: i32) -> Result<Move, AgentError> {
        let mv = self.state.make_move(x, y);
        if !mv.is_none() && self.state.is_game_over() {
            info!(
                winner = %self.state.winner(),
                black = self.state.disk_count(Side::Black),
                white = self.state.disk_count(Side::White),
                "game over"
            );
            self.agent.learn(&self.state)?;
        }
        Ok(mv)
    }

    /// Lets the agent move if it is its turn. Returns the move played, if any.
    ///
    /// With the agent on both seats, a finished game is replaced by a new one with
    /// the colours swapped.
    pub fn update_ai(&mut self) -> Result<Option<Move>, AgentError> {
        if self.player1_ai && self.player2_ai && self.state.is_game_over() {
            info!(moves = self.state.history().len(), "agent plays both seats, starting next game");
            self.replay();
            return Ok(None);
        }
        if !self.is_ai_turn() {
            return Ok(None);
        }
        let Some(Coordinate { x, y }) = self.agent.decide(&self.state)? else {
            return Ok(None);
        };
        debug!(agent = self.agent.name(), x, y, turn = %self.state.current_turn(), "agent move");
        let mv = self.make_move(x, y)?;
        Ok((!mv.is_none()).then_some(mv))
    }

    /// Runs the agent until a human is to move or the game ends. Stops on the
    /// finished position; the next [`Session::update_ai`] starts a new game.
    pub fn run_ai(&mut self) -> Result<usize, AgentError> {
        let mut played = 0;
        while !self.state.is_game_over() {
            if self.update_ai()?.is_none() {
                break;
            }
            played += 1;
        }
        Ok(played)
    }

    pub fn undo(&mut self) -> Move {
        self.state.undo()
    }

    pub fn redo(&mut self) -> Move {
        self.state.redo()
    }

    /// Starts a new game with player 1 on the other colour.
    pub fn replay(&mut self) {
        self.state.reset();
        self.player1_side = self.player1_side.opponent();
    }
}

/// Plays one game from the opening between two agents and lets both learn from it.
pub fn play_game<B, W>(black: &mut B, white: &mut W) -> Result<GameState, AgentError>
where
    B: Agent + ?Sized,
    W: Agent + ?Sized,
{
    let mut state = GameState::new();
    while !state.is_game_over() {
        let choice = match state.current_turn() {
            Side::Black => black.decide(&state)?,
            Side::White => white.decide(&state)?,
            Side::None => None,
        };
        let Some(cell) = choice else {
            break;
        };
        if state.make_move(cell.x, cell.y).is_none() {
            break;
        }
    }
    if state.is_game_over() {
        black.learn(&state)?;
        white.learn(&state)?;
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchAgent;

    fn session() -> Session {
        Session::new(AnyAgent::Search(SearchAgent::new(1)))
    }

    #[test]
    fn test_default_seats() {
        let mut s = session();
        assert_eq!(s.player1_side(), Side::Black);
        assert_eq!(s.side_of(Player::Two), Side::White);
        assert!(!s.is_ai(Player::One));
        assert!(!s.is_ai(Player::Two));
        assert!(s.update_ai().unwrap().is_none());
        s.make_move(5, 3).unwrap();
        // White is still human.
        assert!(!s.is_ai_turn());
        assert!(s.update_ai().unwrap().is_none());
    }

    #[test]
    fn test_agent_answers_human_move() {
        let mut s = session();
        s.set_ai(Player::Two, true);
        assert!(s.update_ai().unwrap().is_none());
        let mv = s.make_move(5, 3).unwrap();
        assert!(!mv.is_none());
        assert!(s.is_ai_turn());
        let reply = s.update_ai().unwrap().unwrap();
        assert_eq!(reply.turn, Side::White);
        assert_eq!(s.state().current_turn(), Side::Black);
    }

    #[test]
    fn test_replay_swaps_seats() {
        let mut s = session();
        s.set_ai(Player::Two, true);
        s.make_move(5, 3).unwrap();
        s.replay();
        assert_eq!(s.player1_side(), Side::White);
        assert!(s.state().history().is_empty());
        // Player 2 is now black and moves first.
        assert!(s.is_ai_turn());
        s.replay();
        assert_eq!(s.player1_side(), Side::Black);
    }

    #[test]
    fn test_agent_plays_both_seats_to_the_end() {
        let mut s = session();
        s.set_ai(Player::One, true);
        s.set_ai(Player::Two, true);
        let played = s.run_ai().unwrap();
        assert!(s.state().is_game_over());
        assert_eq!(played, s.state().history().len());
        assert!(!s.is_ai_turn());
        // Calling run_ai again on the finished game plays nothing.
        assert_eq!(s.run_ai().unwrap(), 0);
        assert!(s.state().is_game_over());
    }

    #[test]
    fn test_both_seats_restart_finished_game() {
        let mut s = session();
        s.set_ai(Player::One, true);
        s.set_ai(Player::Two, true);
        s.run_ai().unwrap();
        assert!(s.state().is_game_over());

        assert!(s.update_ai().unwrap().is_none());
        assert!(!s.state().is_game_over());
        assert!(s.state().history().is_empty());
        assert_eq!(s.player1_side(), Side::White);
        // Player 2 now holds black and moves first.
        let opening = s.update_ai().unwrap().unwrap();
        assert_eq!(opening.turn, Side::Black);
    }

    #[test]
    fn test_one_agent_seat_keeps_finished_game() {
        let mut s = session();
        s.set_ai(Player::One, true);
        s.set_ai(Player::Two, true);
        s.run_ai().unwrap();
        s.set_ai(Player::One, false);
        assert!(s.update_ai().unwrap().is_none());
        assert!(s.state().is_game_over());
        assert_eq!(s.player1_side(), Side::Black);
    }

    #[test]
    fn test_play_game_between_agents() {
        let mut black = SearchAgent::new(2);
        let mut white = SearchAgent::new(0);
        let finished = play_game(&mut black, &mut white).unwrap();
        assert!(finished.is_game_over());
        assert_eq!(finished.cell_total(), 64);
    }
}
