use serde::{Deserialize, Serialize};

use crate::{Result, RhythmError};

/// Top-level configuration for a play session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub windows: JudgmentWindows,
    /// Seconds before its target time at which a note becomes eligible.
    pub spawn_lookahead: f64,
    pub tick_interval_ms: u64,
    pub lane_count: u32,
    /// Initial clock offset applied when the session starts.
    pub offset_ms: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            windows: JudgmentWindows::default(),
            spawn_lookahead: 0.3,
            tick_interval_ms: 16,
            lane_count: 9,
            offset_ms: 0,
        }
    }
}

impl SessionConfig {
    /// Parses a JSON document and validates the result. Missing fields fall
    /// back to their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.windows.validate()?;
        if !self.spawn_lookahead.is_finite() || self.spawn_lookahead < 0.0 {
            return Err(RhythmError::InvalidConfig(format!(
                "spawn_lookahead must be a non-negative number of seconds, got {}",
                self.spawn_lookahead
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(RhythmError::InvalidConfig(
                "tick_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.lane_count == 0 {
            return Err(RhythmError::InvalidConfig(
                "lane_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval_seconds(&self) -> f64 {
        self.tick_interval_ms as f64 / 1000.0
    }
}

/// Judgment tolerances in seconds, all compared against absolute timing
/// differences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgmentWindows {
    pub perfect: f64,
    pub good: f64,
    /// Unanswered notes later than this are expired by the tick.
    pub miss: f64,
}

impl Default for JudgmentWindows {
    fn default() -> Self {
        Self {
            perfect: 0.25,
            good: 0.6,
            miss: 0.6,
        }
    }
}

impl JudgmentWindows {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("perfect", self.perfect),
            ("good", self.good),
            ("miss", self.miss),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(RhythmError::InvalidConfig(format!(
                    "{name} window must be a positive number of seconds, got {value}"
                )));
            }
        }
        if self.perfect > self.good {
            return Err(RhythmError::InvalidConfig(format!(
                "perfect window ({}) is wider than good window ({})",
                self.perfect, self.good
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_values() {
        let config = SessionConfig::default();
        assert_eq!(config.windows.perfect, 0.25);
        assert_eq!(config.windows.good, 0.6);
        assert_eq!(config.windows.miss, 0.6);
        assert_eq!(config.spawn_lookahead, 0.3);
        assert_eq!(config.tick_interval_ms, 16);
        assert_eq!(config.lane_count, 9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            SessionConfig::from_json_str(r#"{ "windows": { "perfect": 0.1 }, "offset_ms": -40 }"#)
                .unwrap();
        assert_eq!(config.windows.perfect, 0.1);
        assert_eq!(config.windows.good, 0.6);
        assert_eq!(config.offset_ms, -40);
        assert_eq!(config.spawn_lookahead, 0.3);
    }

    #[test]
    fn rejects_inverted_windows() {
        let err = SessionConfig::from_json_str(r#"{ "windows": { "perfect": 0.7 } }"#)
            .unwrap_err();
        assert!(matches!(err, RhythmError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_zero_tick_interval() {
        let config = SessionConfig {
            tick_interval_ms: 0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
