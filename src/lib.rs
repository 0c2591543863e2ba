//! Reversi rules engine with two computer players: a fixed-depth alpha-beta searcher
//! and an evolving evaluator that learns from every finished game.

pub mod board;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod evolving;
pub mod features;
pub mod game;
pub mod moves;
pub mod search;
pub mod session;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use board::{Board, Coordinate, Side};
pub use config::EngineConfig;
pub use error::{AgentError, ConfigError, EvolvingError, StoreError};
pub use evolving::{EvolvingAgent, LearnedEvaluator};
pub use game::GameState;
pub use moves::{Change, Move};
pub use search::SearchAgent;
pub use session::Session;

/// A computer player.
pub trait Agent {
    /// The cell to play for the side to move, or `None` when there is nothing to play.
    fn decide(&mut self, state: &GameState) -> Result<Option<Coordinate>, AgentError>;

    /// Called once with the final position of every game the agent took part in.
    fn learn(&mut self, _finished: &GameState) -> Result<(), AgentError> {
        Ok(())
    }
}

impl Agent for SearchAgent {
    fn decide(&mut self, state: &GameState) -> Result<Option<Coordinate>, AgentError> {
        Ok(SearchAgent::decide(self, state))
    }
}

impl Agent for EvolvingAgent {
    fn decide(&mut self, state: &GameState) -> Result<Option<Coordinate>, AgentError> {
        Ok(EvolvingAgent::decide(self, state)?)
    }

    fn learn(&mut self, finished: &GameState) -> Result<(), AgentError> {
        Ok(EvolvingAgent::learn(self, finished)?)
    }
}

/// The agent kinds a session can be configured with.
pub enum AnyAgent {
    Search(SearchAgent),
    Evolving(Box<EvolvingAgent>),
}

impl AnyAgent {
    /// Builds the agent selected by `evolving`, using the matching config section.
    pub fn from_config(config: &EngineConfig, evolving: bool) -> Result<Self, StoreError> {
        if !evolving {
            return Ok(AnyAgent::Search(SearchAgent::new(config.search.depth)));
        }
        let c = &config.evolving;
        let agent = EvolvingAgent::open(&c.data_file, c.learning_rate, c.generalization, c.seed)?;
        Ok(AnyAgent::Evolving(Box::new(agent)))
    }

    pub fn name(&self) -> &'static str {
        match self {
            AnyAgent::Search(_) => "search",
            AnyAgent::Evolving(_) => "evolving",
        }
    }
}

impl Agent for AnyAgent {
    fn decide(&mut self, state: &GameState) -> Result<Option<Coordinate>, AgentError> {
        match self {
            AnyAgent::Search(agent) => Agent::decide(agent, state),
            AnyAgent::Evolving(agent) => Agent::decide(agent.as_mut(), state),
        }
    }

    fn learn(&mut self, finished: &GameState) -> Result<(), AgentError> {
        match self {
            AnyAgent::Search(agent) => Agent::learn(agent, finished),
            AnyAgent::Evolving(agent) => Agent::learn(agent.as_mut(), finished),
        }
    }
}

impl From<SearchAgent> for AnyAgent {
    fn from(agent: SearchAgent) -> Self {
        AnyAgent::Search(agent)
    }
}

impl From<EvolvingAgent> for AnyAgent {
    fn from(agent: EvolvingAgent) -> Self {
        AnyAgent::Evolving(Box::new(agent))
    }
}
