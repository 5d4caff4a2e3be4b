use serde::{Deserialize, Serialize};

/// Running totals for one play. Only the judgment engine mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreState {
    pub score: u64,
    /// Consecutive non-miss resolutions, weighted per judgment.
    pub combo: u32,
    pub max_combo: u32,
    pub perfect_count: u32,
    pub good_count: u32,
    pub miss_count: u32,
}

impl ScoreState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Multiplier applied to base points: one extra band per 10 combo.
    pub fn combo_multiplier(&self) -> u64 {
        1 + u64::from(self.combo / 10)
    }

    /// Adds `points` scaled by the current combo band and returns the amount
    /// actually awarded.
    pub fn add_score(&mut self, points: u64) -> u64 {
        let awarded = points * self.combo_multiplier();
        self.score += awarded;
        awarded
    }

    pub fn add_combo(&mut self, value: u32) {
        self.combo += value;
        self.max_combo = self.max_combo.max(self.combo);
    }

    pub fn break_combo(&mut self) {
        self.combo = 0;
    }

    pub fn total_judged(&self) -> u32 {
        self.perfect_count + self.good_count + self.miss_count
    }

    /// Percentage of judged notes that were not misses.
    pub fn accuracy(&self) -> f64 {
        let total = self.total_judged();
        if total == 0 {
            return 100.0;
        }
        f64::from(self.perfect_count + self.good_count) / f64::from(total) * 100.0
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
