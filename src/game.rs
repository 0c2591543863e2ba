use crate::board::{Board, Side, BOARD_SIZE};
use crate::moves::{build_move, can_place, get_legal_moves, has_legal_move, Move, MoveList};
use serde::{Deserialize, Serialize};

/// Authoritative game state: board, turn, history and redo stack.
///
/// Illegal requests never fail; they return `Move::none()` and leave the state untouched.
#[derive(Clone, Serialize, Deserialize)]
pub struct GameState {
    board: Board,
    turn: Side,
    game_over: bool,
    history: Vec<Move>,
    /// Undone moves, most recently undone last.
    future: Vec<Move>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        let mut state = GameState {
            board: Board::new(),
            turn: Side::Black,
            game_over: false,
            history: Vec::with_capacity(64),
            future: Vec::new(),
        };
        state.reset();
        state
    }

    pub fn reset(&mut self) {
        self.board.clear();
        self.board.set(3, 3, Side::Black);
        self.board.set(4, 4, Side::Black);
        self.board.set(4, 3, Side::White);
        self.board.set(3, 4, Side::White);
        self.turn = Side::Black;
        self.game_over = false;
        self.history.clear();
        self.future.clear();
    }

    #[inline]
    pub fn current_turn(&self) -> Side {
        self.turn
    }

    #[inline]
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Side {
        self.board.get(x, y)
    }

    /// Read-only; the board only changes through moves so that History replays to it.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Free-form position setup for unit tests. Leaves History untouched.
    #[cfg(test)]
    pub(crate) fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn history(&self) -> &[Move] {
        &self.history
    }

    pub fn future(&self) -> &[Move] {
        &self.future
    }

    pub fn can_make_move(&self, x: i32, y: i32) -> bool {
        self.can_make_move_for(x, y, self.turn)
    }

    pub fn can_make_move_for(&self, x: i32, y: i32, side: Side) -> bool {
        !self.game_over && can_place(&self.board, x, y, side)
    }

    /// Legal cells for the side to move, x-major.
    pub fn legal_moves(&self) -> MoveList {
        if self.game_over {
            return MoveList::new();
        }
        get_legal_moves(&self.board, self.turn)
    }

    pub fn make_move(&mut self, x: i32, y: i32) -> Move {
        if self.game_over {
            return Move::none();
        }
        let mv = build_move(&self.board, x, y, self.turn);
        if mv.is_none() {
            return mv;
        }

        for change in &mv.changes {
            self.board.set(change.x, change.y, change.new);
        }
        self.history.push(mv.clone());
        self.future.clear();
        self.apply_next_turn();

        mv
    }

    pub fn can_undo(&self) -> bool {
        !self.game_over && !self.history.is_empty()
    }

    pub fn undo(&mut self) -> Move {
        if !self.can_undo() {
            return Move::none();
        }
        let Some(mv) = self.history.pop() else {
            return Move::none();
        };

        for change in &mv.changes {
            self.board.set(change.x, change.y, change.old);
        }
        self.turn = mv.turn;
        self.future.push(mv.clone());

        mv
    }

    pub fn can_redo(&self) -> bool {
        !self.game_over && !self.future.is_empty()
    }

    pub fn redo(&mut self) -> Move {
        if !self.can_redo() {
            return Move::none();
        }
        let Some(mv) = self.future.pop() else {
            return Move::none();
        };

        for change in &mv.changes {
            self.board.set(change.x, change.y, change.new);
        }
        self.turn = mv.turn;
        self.apply_next_turn();
        self.history.push(mv.clone());

        mv
    }

    pub fn disk_count(&self, side: Side) -> usize {
        self.board.count(side)
    }

    /// Leader by disk count; valid before the game ends. `Side::None` is a draw.
    pub fn winner(&self) -> Side {
        let black = self.board.count(Side::Black) as i32;
        let white = self.board.count(Side::White) as i32;
        match black - white {
            d if d > 0 => Side::Black,
            d if d < 0 => Side::White,
            _ => Side::None,
        }
    }

    /// Opponent moves next if it can; otherwise the mover goes again; otherwise the game ends.
    fn apply_next_turn(&mut self) {
        if self.turn == Side::None {
            return;
        }
        let other = self.turn.opponent();
        if has_legal_move(&self.board, other) {
            self.turn = other;
        } else if !has_legal_move(&self.board, self.turn) {
            self.turn = Side::None;
            self.game_over = true;
        }
    }

    /// Leaf count of the move tree to `depth`, for move generator verification.
    /// Finished games count as leaves.
    pub fn perft(&self, depth: usize) -> u64 {
        if depth == 0 || self.game_over {
            return 1;
        }

        let mut nodes = 0;
        for cell in self.legal_moves() {
            let mut child = self.clone();
            child.make_move(cell.x, cell.y);
            nodes += child.perft(depth - 1);
        }
        nodes
    }

    /// Occupied + empty cell count; always 64.
    pub fn cell_total(&self) -> usize {
        self.board.count(Side::Black) + self.board.count(Side::White) + self.board.count(Side::None)
    }

    pub fn rows(&self) -> impl Iterator<Item = [Side; BOARD_SIZE as usize]> + '_ {
        (0..BOARD_SIZE).map(move |y| {
            let mut row = [Side::None; BOARD_SIZE as usize];
            for (x, cell) in row.iter_mut().enumerate() {
                *cell = self.board.get(x as i32, y);
            }
            row
        })
    }
}
