//! Self-trained evaluator.
//!
//! Every distinct feature vector owns one byte of a flat table (0 = always led to a
//! loss, 255 = always led to a win, 128 = unknown). A move is scored by summing the
//! scores of its 8 directional feature vectors. After each finished game the table is
//! nudged by [`credit::run`] and written back through [`store`].

pub mod credit;
pub mod store;

use crate::board::{Coordinate, Side};
use crate::error::{EvolvingError, StoreError};
use crate::evaluation::MIN_SCORE;
use crate::features::{
    self, Features, AFFECTED_DISKS_RANGE, COLOR_CHANGE_RANGE, DIRECTION_COUNT, ISLANDS_RANGE,
    NEIGHBOR_COUNT_RANGE, PLACE_COUNT,
};
use crate::game::GameState;
use arrayvec::ArrayVec;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub use credit::{LearningPlan, MoveFeedback};

pub const TABLE_SIZE: usize = PLACE_COUNT
    * DIRECTION_COUNT
    * NEIGHBOR_COUNT_RANGE
    * AFFECTED_DISKS_RANGE
    * COLOR_CHANGE_RANGE
    * ISLANDS_RANGE;

pub const DEFAULT_VALUE: u8 = 128;
pub const DEFAULT_LEARNING_RATE: f32 = 0.1;
pub const DEFAULT_GENERALIZATION: f32 = 0.1;

/// Learned byte per feature vector.
#[derive(Clone, PartialEq, Eq)]
pub struct EvaluationTable {
    data: Vec<u8>,
}

impl Default for EvaluationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EvaluationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let trained = self.data.iter().filter(|&&b| b != DEFAULT_VALUE).count();
        f.debug_struct("EvaluationTable")
            .field("len", &self.data.len())
            .field("trained", &trained)
            .finish()
    }
}

impl EvaluationTable {
    /// A table with every entry at the neutral value.
    pub fn new() -> Self {
        EvaluationTable {
            data: vec![DEFAULT_VALUE; TABLE_SIZE],
        }
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, StoreError> {
        if data.len() != TABLE_SIZE {
            return Err(StoreError::TableSize(data.len()));
        }
        Ok(EvaluationTable { data })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn get(&self, index: usize) -> u8 {
        self.data[index]
    }

    #[inline]
    pub fn set(&mut self, index: usize, value: u8) {
        self.data[index] = value;
    }

    pub fn reset(&mut self) {
        self.data.fill(DEFAULT_VALUE);
    }
}

fn check(name: &'static str, value: u8, limit: usize) -> Result<usize, EvolvingError> {
    if (value as usize) < limit {
        Ok(value as usize)
    } else {
        Err(EvolvingError::FeatureOutOfRange { name, value, limit })
    }
}

/// Mixed-radix position of a feature vector, radices (10, 8, 8, 7, 7, 5).
pub fn data_index(f: &Features) -> Result<usize, EvolvingError> {
    let place = check("generalized_place", f.generalized_place, PLACE_COUNT)?;
    let direction = check("direction", f.direction, DIRECTION_COUNT)?;
    let neighbors = check("neighbor_count", f.neighbor_count, NEIGHBOR_COUNT_RANGE)?;
    let affected = check("affected_disks_count", f.affected_disks_count, AFFECTED_DISKS_RANGE)?;
    let changes = check(
        "neighbor_color_change_count",
        f.neighbor_color_change_count,
        COLOR_CHANGE_RANGE,
    )?;
    let islands = check("islands_count", f.islands_count, ISLANDS_RANGE)?;

    let mut index = place;
    index = index * DIRECTION_COUNT + direction;
    index = index * NEIGHBOR_COUNT_RANGE + neighbors;
    index = index * AFFECTED_DISKS_RANGE + affected;
    index = index * COLOR_CHANGE_RANGE + changes;
    index = index * ISLANDS_RANGE + islands;
    Ok(index)
}

/// Packs two uniform draws from [0, 1) into a 64-bit seed, 32 bits each.
/// For targets where `StdRng::from_os_rng` has no entropy source.
pub fn seed_from_unit_draws(high: f64, low: f64) -> u64 {
    let word = |draw: f64| (draw.clamp(0.0, 1.0) * f64::from(u32::MAX)) as u64;
    (word(high) << 32) | word(low)
}

pub struct LearnedEvaluator {
    table: EvaluationTable,
    learning_rate: f32,
    generalization: f32,
    rng: StdRng,
}

impl LearnedEvaluator {
    /// Rates are clamped to [0, 1]. Tie-breaking draws from an OS-seeded generator.
    pub fn new(table: EvaluationTable, learning_rate: f32, generalization: f32) -> Self {
        Self::with_rng(table, learning_rate, generalization, StdRng::from_os_rng())
    }

    pub fn with_seed(
        table: EvaluationTable,
        learning_rate: f32,
        generalization: f32,
        seed: u64,
    ) -> Self {
        Self::with_rng(table, learning_rate, generalization, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(
        table: EvaluationTable,
        learning_rate: f32,
        generalization: f32,
        rng: StdRng,
    ) -> Self {
        LearnedEvaluator {
            table,
            learning_rate: clamp_unit(learning_rate),
            generalization: clamp_unit(generalization),
            rng,
        }
    }

    pub fn table(&self) -> &EvaluationTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut EvaluationTable {
        &mut self.table
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn generalization(&self) -> f32 {
        self.generalization
    }

    /// Score in [0, 1]. With generalization g the entry is blended with the mean of
    /// its 34 siblings that differ only in the two weak features:
    /// `(1 - g) * base + g * mean`.
    pub fn score(&self, features: &Features) -> Result<f32, EvolvingError> {
        let base = self.table.get(data_index(features)?) as f32 / 255.0;
        if self.generalization == 0.0 {
            return Ok(base);
        }

        let mut sum = 0.0;
        let mut count = 0;
        for changes in 0..COLOR_CHANGE_RANGE as u8 {
            for islands in 0..ISLANDS_RANGE as u8 {
                if changes == features.neighbor_color_change_count
                    && islands == features.islands_count
                {
                    continue;
                }
                let sibling = Features {
                    neighbor_color_change_count: changes,
                    islands_count: islands,
                    ..*features
                };
                sum += self.table.get(data_index(&sibling)?) as f32 / 255.0;
                count += 1;
            }
        }
        let mean = sum / count as f32;
        Ok((1.0 - self.generalization) * base + self.generalization * mean)
    }

    /// Sum of the directional scores of placing at (x, y) for the side to move.
    pub fn move_score(&self, state: &GameState, x: i32, y: i32) -> Result<f32, EvolvingError> {
        features::extract(state, x, y)
            .iter()
            .try_fold(0.0, |acc, f| Ok(acc + self.score(f)?))
    }

    /// Best scoring legal cell; equally scored cells are chosen uniformly at random.
    pub fn decide(&mut self, state: &GameState) -> Result<Option<Coordinate>, EvolvingError> {
        if state.current_turn() == Side::None || state.is_game_over() {
            return Ok(None);
        }

        let mut best_score = MIN_SCORE;
        let mut best: ArrayVec<Coordinate, 64> = ArrayVec::new();
        for cell in state.legal_moves() {
            let score = self.move_score(state, cell.x, cell.y)?;
            if score > best_score {
                best_score = score;
                best.clear();
                best.push(cell);
            } else if score == best_score {
                best.push(cell);
            }
        }

        match best.len() {
            0 => Ok(None),
            1 => Ok(Some(best[0])),
            n => {
                let choice = best[self.rng.random_range(0..n)];
                debug!(candidates = ?best.as_slice(), ?choice, "multiple best choices");
                Ok(Some(choice))
            }
        }
    }

    /// Moves one entry toward win (positive feedback) or loss (negative), by at
    /// most `255 * learning_rate`. Rounds away from the current value.
    pub fn learn_features(&mut self, features: &Features, feedback: f32) -> Result<(), EvolvingError> {
        let index = data_index(features)?;
        let current = self.table.get(index) as f32;
        let value = (current + feedback * 255.0 * self.learning_rate).clamp(0.0, 255.0);
        let value = if feedback < 0.0 { value.floor() } else { value.ceil() };
        self.table.set(index, value as u8);
        Ok(())
    }

    /// Applies a learning pass. All indices are validated before the first write.
    pub fn apply(&mut self, plan: &LearningPlan) -> Result<(), EvolvingError> {
        for entry in &plan.moves {
            for f in &entry.features {
                data_index(f)?;
            }
        }
        for entry in &plan.moves {
            for (f, &feedback) in entry.features.iter().zip(entry.feedback.iter()) {
                self.learn_features(f, feedback)?;
            }
        }
        Ok(())
    }
}

#[inline]
fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Evaluator plus its backing file. Without a file the table lives only in memory.
pub struct EvolvingAgent {
    evaluator: LearnedEvaluator,
    data_file: Option<PathBuf>,
}

impl EvolvingAgent {
    /// Loads (or creates) the table at `path`.
    pub fn open(
        path: impl AsRef<Path>,
        learning_rate: f32,
        generalization: f32,
        seed: Option<u64>,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let table = store::load(path)?;
        let evaluator = match seed {
            Some(seed) => LearnedEvaluator::with_seed(table, learning_rate, generalization, seed),
            None => LearnedEvaluator::new(table, learning_rate, generalization),
        };
        Ok(EvolvingAgent {
            evaluator,
            data_file: Some(path.to_path_buf()),
        })
    }

    pub fn in_memory(evaluator: LearnedEvaluator) -> Self {
        EvolvingAgent {
            evaluator,
            data_file: None,
        }
    }

    pub fn evaluator(&self) -> &LearnedEvaluator {
        &self.evaluator
    }

    pub fn evaluator_mut(&mut self) -> &mut LearnedEvaluator {
        &mut self.evaluator
    }

    pub fn data_file(&self) -> Option<&Path> {
        self.data_file.as_deref()
    }

    pub fn decide(&mut self, state: &GameState) -> Result<Option<Coordinate>, EvolvingError> {
        self.evaluator.decide(state)
    }

    /// Post-game update. A no-op until the game is over, or when the learning rate is 0.
    /// The table is persisted only after the whole pass succeeded.
    pub fn learn(&mut self, finished: &GameState) -> Result<(), EvolvingError> {
        if !finished.is_game_over() || self.evaluator.learning_rate() == 0.0 {
            return Ok(());
        }

        let plan = credit::run(finished)?;
        self.evaluator.apply(&plan)?;
        info!(
            moves = plan.moves.len(),
            black_feedback = plan.black_feedback,
            white_feedback = plan.white_feedback,
            winner = %plan.winner,
            "learned from finished game"
        );

        if let Some(path) = &self.data_file {
            store::save(path, self.evaluator.table())?;
        }
        Ok(())
    }

    /// Backs up the current file as `<path>.<n>.backup` and starts from a neutral table.
    pub fn reset_table(&mut self) -> Result<(), StoreError> {
        match &self.data_file {
            Some(path) => *self.evaluator.table_mut() = store::reset(path)?,
            None => self.evaluator.table_mut().reset(),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator(generalization: f32) -> LearnedEvaluator {
        LearnedEvaluator::with_seed(EvaluationTable::new(), 0.1, generalization, 7)
    }

    #[test]
    fn test_seed_from_unit_draws() {
        assert_eq!(seed_from_unit_draws(0.0, 0.0), 0);
        assert_eq!(seed_from_unit_draws(0.0, 1.0), u64::from(u32::MAX));
        assert_eq!(seed_from_unit_draws(1.0, 0.0), u64::from(u32::MAX) << 32);
        assert_eq!(seed_from_unit_draws(0.5, 0.25) >> 32, u64::from(u32::MAX / 2));
        assert_ne!(seed_from_unit_draws(0.3, 0.1), seed_from_unit_draws(0.3, 0.2));
        // Out-of-range draws saturate instead of wrapping.
        assert_eq!(seed_from_unit_draws(-1.0, 2.0), u64::from(u32::MAX));
    }

    fn sample() -> Features {
        Features {
            generalized_place: 4,
            direction: 3,
            neighbor_count: 2,
            affected_disks_count: 1,
            neighbor_color_change_count: 1,
            islands_count: 1,
        }
    }

    #[test]
    fn test_table_size() {
        assert_eq!(TABLE_SIZE, 156_800);
        assert_eq!(EvaluationTable::new().as_bytes().len(), TABLE_SIZE);
    }

    #[test]
    fn test_index_bounds() {
        let zero = Features::default();
        assert_eq!(data_index(&zero).unwrap(), 0);
        let max = Features {
            generalized_place: 9,
            direction: 7,
            neighbor_count: 7,
            affected_disks_count: 6,
            neighbor_color_change_count: 6,
            islands_count: 4,
        };
        assert_eq!(data_index(&max).unwrap(), TABLE_SIZE - 1);
        let islands = Features { islands_count: 1, ..zero };
        assert_eq!(data_index(&islands).unwrap(), 1);
        let changes = Features { neighbor_color_change_count: 1, ..zero };
        assert_eq!(data_index(&changes).unwrap(), 5);
    }

    #[test]
    fn test_index_rejects_out_of_range() {
        let bad = Features { islands_count: 5, ..Features::default() };
        assert!(matches!(
            data_index(&bad),
            Err(EvolvingError::FeatureOutOfRange { name: "islands_count", .. })
        ));
        let bad = Features { generalized_place: 10, ..Features::default() };
        assert!(data_index(&bad).is_err());
    }

    #[test]
    fn test_fresh_score() {
        let ev = evaluator(0.0);
        assert_eq!(ev.score(&sample()).unwrap(), 128.0 / 255.0);
        // A uniform table blends to the same value.
        let ev = evaluator(0.5);
        assert!((ev.score(&sample()).unwrap() - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_generalization_blend() {
        let mut ev = evaluator(0.5);
        let f = sample();
        ev.table_mut().set(data_index(&f).unwrap(), 255);
        // Base is 1.0, siblings are all 128/255.
        let expected = 0.5 * 1.0 + 0.5 * (128.0 / 255.0);
        assert!((ev.score(&f).unwrap() - expected).abs() < 1e-6);

        // Raising one sibling moves the mean by 1/34 of its delta.
        let sibling = Features { islands_count: 0, ..f };
        ev.table_mut().set(data_index(&sibling).unwrap(), 162);
        let mean = (33.0 * 128.0 + 162.0) / 34.0 / 255.0;
        let expected = 0.5 * 1.0 + 0.5 * mean;
        assert!((ev.score(&f).unwrap() - expected).abs() < 1e-5);
    }

    #[test]
    fn test_rates_are_clamped() {
        let ev = LearnedEvaluator::with_seed(EvaluationTable::new(), 3.0, -1.0, 1);
        assert_eq!(ev.learning_rate(), 1.0);
        assert_eq!(ev.generalization(), 0.0);
    }

    #[test]
    fn test_learn_rounds_away_from_current() {
        let mut ev = evaluator(0.0);
        let f = sample();
        let index = data_index(&f).unwrap();

        ev.learn_features(&f, 0.01).unwrap();
        // 128 + 0.255 rounds up.
        assert_eq!(ev.table().get(index), 129);

        ev.learn_features(&f, -0.01).unwrap();
        // 129 - 0.255 rounds down.
        assert_eq!(ev.table().get(index), 128);

        ev.learn_features(&f, 0.0).unwrap();
        assert_eq!(ev.table().get(index), 128);
    }

    #[test]
    fn test_learn_saturates() {
        let mut ev = LearnedEvaluator::with_seed(EvaluationTable::new(), 1.0, 0.0, 1);
        let f = sample();
        let index = data_index(&f).unwrap();
        ev.learn_features(&f, 1.0).unwrap();
        assert_eq!(ev.table().get(index), 255);
        ev.learn_features(&f, -1.0).unwrap();
        assert_eq!(ev.table().get(index), 0);
        ev.learn_features(&f, -1.0).unwrap();
        assert_eq!(ev.table().get(index), 0);
    }

    #[test]
    fn test_decide_picks_among_opening_ties() {
        let game = GameState::new();
        let legal: Vec<Coordinate> = game.legal_moves().to_vec();
        let mut ev = evaluator(0.0);
        let mut picked = std::collections::HashSet::new();
        for _ in 0..64 {
            let cell = ev.decide(&game).unwrap().unwrap();
            assert!(legal.contains(&cell));
            picked.insert(cell);
        }
        // Four symmetric openings score the same, so the choice varies.
        assert!(picked.len() > 1);
    }

    #[test]
    fn test_decide_is_reproducible_with_seed() {
        let game = GameState::new();
        let mut a = evaluator(0.1);
        let mut b = evaluator(0.1);
        for _ in 0..10 {
            assert_eq!(a.decide(&game).unwrap(), b.decide(&game).unwrap());
        }
    }

    #[test]
    fn test_trained_entries_raise_move_score() {
        let game = GameState::new();
        let mut ev = evaluator(0.0);
        let target = Coordinate::new(2, 4);
        for f in features::extract(&game, target.x, target.y) {
            let index = data_index(&f).unwrap();
            ev.table_mut().set(index, 255);
        }
        assert_eq!(ev.move_score(&game, target.x, target.y).unwrap(), 8.0);
        // The four openings are symmetric images of each other, so all of them now score 8.
        let choice = ev.decide(&game).unwrap().unwrap();
        assert_eq!(ev.move_score(&game, choice.x, choice.y).unwrap(), 8.0);
    }

    #[test]
    fn test_in_memory_learn_without_file() {
        let mut agent = EvolvingAgent::in_memory(evaluator(0.0));
        let game = GameState::new();
        // Not over yet: nothing changes.
        agent.learn(&game).unwrap();
        assert_eq!(agent.evaluator().table(), &EvaluationTable::new());
        assert!(agent.data_file().is_none());
    }
}
