use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ChartError;

/// Tunables honoured by the core. Every field has a default so a partial
/// JSON file is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Minimum tempo strength for a candidate stem to be accepted.
    pub accept_threshold: f64,
    pub beats_per_bar: u32,
    pub subdivisions_per_bar: u32,
    pub bars_per_line: u32,
    pub chord_weight: f64,
    pub lyric_weight: f64,
    /// Fold the tempo by octaves into `[min, max]`. `None` keeps the raw value.
    pub bpm_fold_range: Option<(f64, f64)>,
    pub confidence_decimals: usize,
}

impl ChartConfig {
    pub const DEFAULT_ACCEPT_THRESHOLD: f64 = 0.5;
    pub const DEFAULT_BEATS_PER_BAR: u32 = 4;
    pub const DEFAULT_BPM_FOLD_RANGE: (f64, f64) = (60.0, 160.0);

    pub fn load(path: &Path) -> Result<Self, ChartError> {
        let data =
            std::fs::read_to_string(path).map_err(|e| ChartError::io("read chart config", e))?;
        let config: Self =
            serde_json::from_str(&data).map_err(|e| ChartError::json("parse chart config", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ChartError> {
        if !(0.0..=1.0).contains(&self.accept_threshold) {
            return Err(ChartError::invalid_input(format!(
                "accept_threshold must be within [0, 1], got {}",
                self.accept_threshold
            )));
        }
        if self.beats_per_bar == 0 {
            return Err(ChartError::invalid_input("beats_per_bar must be >= 1"));
        }
        if self.subdivisions_per_bar == 0 {
            return Err(ChartError::invalid_input("subdivisions_per_bar must be >= 1"));
        }
        if self.bars_per_line == 0 {
            return Err(ChartError::invalid_input("bars_per_line must be >= 1"));
        }
        let weights_ok = [self.chord_weight, self.lyric_weight]
            .iter()
            .all(|w| w.is_finite() && *w >= 0.0);
        if !weights_ok || self.chord_weight + self.lyric_weight <= 0.0 {
            return Err(ChartError::invalid_input(format!(
                "chord_weight/lyric_weight must be non-negative and not both zero, got {}/{}",
                self.chord_weight, self.lyric_weight
            )));
        }
        if let Some((min, max)) = self.bpm_fold_range {
            // Halving above max then doubling below min only lands inside the
            // range when it spans at least one octave.
            if !(min.is_finite() && max.is_finite() && min > 0.0 && max >= 2.0 * min) {
                return Err(ChartError::invalid_input(format!(
                    "bpm_fold_range must satisfy 0 < min and max >= 2 * min, got [{min}, {max}]"
                )));
            }
        }
        Ok(())
    }

    /// Display form of the meter, e.g. `4/4`.
    pub fn time_signature(&self) -> String {
        format!("{}/4", self.beats_per_bar)
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            accept_threshold: Self::DEFAULT_ACCEPT_THRESHOLD,
            beats_per_bar: Self::DEFAULT_BEATS_PER_BAR,
            subdivisions_per_bar: 1,
            bars_per_line: 1,
            chord_weight: 1.0,
            lyric_weight: 1.0,
            bpm_fold_range: Some(Self::DEFAULT_BPM_FOLD_RANGE),
            confidence_decimals: 1,
        }
    }
}
