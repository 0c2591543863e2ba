//! Browser bindings. The evolving table lives in memory here; the page persists it
//! through `export_table` / `import_table`.

use crate::board::Side;
use crate::evolving::{
    seed_from_unit_draws, EvaluationTable, EvolvingAgent, LearnedEvaluator,
    DEFAULT_GENERALIZATION, DEFAULT_LEARNING_RATE,
};
use crate::search::SearchAgent;
use crate::session::{Player, Session};
use crate::AnyAgent;
use wasm_bindgen::prelude::*;

fn log(message: &str) {
    web_sys::console::log_1(&message.into());
}

/// Tie-break seed drawn from the page; wasm32-unknown-unknown has no OS entropy.
fn browser_seed() -> u64 {
    seed_from_unit_draws(js_sys::Math::random(), js_sys::Math::random())
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub struct ReversiEngine {
    session: Session,
}

#[wasm_bindgen]
impl ReversiEngine {
    /// `depth` selects the searcher; a negative depth selects the evolving agent.
    /// Both seats start human; the page hands them to the agent with `set_ai`.
    #[wasm_bindgen(constructor)]
    pub fn new(depth: i32, seed: Option<u64>) -> ReversiEngine {
        #[cfg(feature = "debug")]
        console_error_panic_hook::set_once();

        let agent = if depth < 0 {
            let table = EvaluationTable::new();
            let evaluator = LearnedEvaluator::with_seed(
                table,
                DEFAULT_LEARNING_RATE,
                DEFAULT_GENERALIZATION,
                seed.unwrap_or_else(browser_seed),
            );
            AnyAgent::from(EvolvingAgent::in_memory(evaluator))
        } else {
            AnyAgent::from(SearchAgent::new(depth as u32))
        };
        ReversiEngine {
            session: Session::new(agent),
        }
    }

    /// 64 cells, `y * 8 + x`, 0 = empty, 1 = black, 2 = white.
    pub fn board(&self) -> Vec<u8> {
        self.session
            .state()
            .board()
            .cells()
            .iter()
            .map(|&c| c as u8)
            .collect()
    }

    pub fn current_turn(&self) -> u8 {
        self.session.state().current_turn() as u8
    }

    pub fn is_game_over(&self) -> bool {
        self.session.state().is_game_over()
    }

    pub fn winner(&self) -> u8 {
        self.session.state().winner() as u8
    }

    pub fn legal_moves(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.state().legal_moves().to_vec())
    }

    /// The applied move as `{ turn, changes, ends }`; `turn` is "None" if illegal.
    pub fn make_move(&mut self, x: i32, y: i32) -> Result<JsValue, JsValue> {
        let mv = self
            .session
            .make_move(x, y)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        to_js(&mv)
    }

    /// Plays the agent's move if it is its turn; `null` otherwise.
    pub fn update_ai(&mut self) -> Result<JsValue, JsValue> {
        match self.session.update_ai() {
            Ok(Some(mv)) => to_js(&mv),
            Ok(None) => Ok(JsValue::NULL),
            Err(e) => {
                log(&format!("agent failed: {e}"));
                Err(JsValue::from_str(&e.to_string()))
            }
        }
    }

    pub fn is_ai_turn(&self) -> bool {
        self.session.is_ai_turn()
    }

    pub fn set_ai(&mut self, player: u8, enabled: bool) {
        let player = if player == 1 { Player::One } else { Player::Two };
        self.session.set_ai(player, enabled);
    }

    pub fn player1_side(&self) -> u8 {
        self.session.player1_side() as u8
    }

    pub fn undo(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.session.undo())
    }

    pub fn redo(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.session.redo())
    }

    pub fn replay(&mut self) {
        self.session.replay();
    }

    /// Table bytes of the evolving agent, or an empty array for the searcher.
    pub fn export_table(&self) -> js_sys::Uint8Array {
        match self.session.agent() {
            AnyAgent::Evolving(agent) => {
                js_sys::Uint8Array::from(agent.evaluator().table().as_bytes())
            }
            AnyAgent::Search(_) => js_sys::Uint8Array::new_with_length(0),
        }
    }

    /// Replaces the evolving table. Wrong-sized input is rejected and logged.
    pub fn import_table(&mut self, bytes: Vec<u8>) -> bool {
        let AnyAgent::Evolving(agent) = self.session.agent_mut() else {
            return false;
        };
        match EvaluationTable::from_bytes(bytes) {
            Ok(table) => {
                *agent.evaluator_mut().table_mut() = table;
                true
            }
            Err(e) => {
                log(&format!("table rejected: {e}"));
                false
            }
        }
    }

    /// Number of disks of `side` (1 = black, 2 = white).
    pub fn disk_count(&self, side: u8) -> usize {
        self.session.state().disk_count(Side::from_u8(side))
    }
}
