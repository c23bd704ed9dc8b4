//! Score types used along the pipeline.
//!
//! Upstream models report reliability on different scales: onset-vote
//! strength from the tempo extractor, similarity scores from the chord model,
//! natural-log probabilities from transcription, and overlap ratios computed
//! here. Each scale has its own type so they can only be combined at the
//! fusion points in the aligners and the merger.

use serde::{Deserialize, Serialize};

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Tempo-extractor strength in [0, 1]. Describes the tempo estimate only,
/// never the chart.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct TempoStrength(f64);

impl TempoStrength {
    pub fn new(value: f64) -> Self {
        Self(clamp_unit(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// The tempo strength surfaced as the chart's `bpm_confidence`.
    pub fn as_confidence(self) -> Confidence {
        Confidence::new(self.0)
    }
}

impl From<f64> for TempoStrength {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<TempoStrength> for f64 {
    fn from(value: TempoStrength) -> Self {
        value.0
    }
}

/// Natural-log token probability, always <= 0. NaN maps to negative infinity
/// (probability zero).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct LogProb(f64);

impl LogProb {
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            Self(f64::NEG_INFINITY)
        } else {
            Self(value.min(0.0))
        }
    }

    pub fn from_probability(probability: f64) -> Self {
        Self::new(clamp_unit(probability).ln())
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn probability(self) -> f64 {
        self.0.exp()
    }
}

impl From<f64> for LogProb {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<LogProb> for f64 {
    fn from(value: LogProb) -> Self {
        value.0
    }
}

/// Fraction of a span covered by some interval set, in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct OverlapRatio(f64);

impl OverlapRatio {
    pub fn new(covered: f64, span: f64) -> Self {
        if span <= 0.0 || !span.is_finite() {
            return Self(0.0);
        }
        Self(clamp_unit(covered / span))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// Chart-facing confidence in [0, 1]. Rendered as a percentage.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0.0);
    pub const FULL: Confidence = Confidence(1.0);

    pub fn new(value: f64) -> Self {
        Self(clamp_unit(value))
    }

    pub fn from_percent(percent: f64) -> Self {
        Self::new(percent / 100.0)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn percent(self) -> f64 {
        self.0 * 100.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }

    /// Chord fusion: coverage of the slot times the mean upstream confidence
    /// of the events that produced it.
    pub fn from_coverage(ratio: OverlapRatio, mean_upstream: Confidence) -> Self {
        Self::new(ratio.value() * mean_upstream.value())
    }

    /// Lyric fusion: `exp(mean(log_prob))`, the geometric mean of the token
    /// probabilities. Empty input yields zero.
    pub fn geometric_mean(log_probs: &[LogProb]) -> Self {
        if log_probs.is_empty() {
            return Self::ZERO;
        }
        let mean = log_probs.iter().map(|lp| lp.value()).sum::<f64>() / log_probs.len() as f64;
        Self::new(mean.exp())
    }

    /// Weighted average; parts with non-positive weight are ignored. Returns
    /// zero when no weight remains.
    pub fn weighted(parts: &[(Confidence, f64)]) -> Self {
        let (sum, total_weight) = parts
            .iter()
            .filter(|(_, weight)| *weight > 0.0 && weight.is_finite())
            .fold((0.0, 0.0), |(sum, total), (conf, weight)| {
                (sum + conf.value() * weight, total + weight)
            });
        if total_weight <= 0.0 {
            Self::ZERO
        } else {
            Self::new(sum / total_weight)
        }
    }

    /// Arithmetic mean, `None` for an empty input.
    pub fn mean<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = Confidence>,
    {
        let (sum, count) = values
            .into_iter()
            .fold((0.0, 0usize), |(sum, count), c| (sum + c.value(), count + 1));
        (count > 0).then(|| Self::new(sum / count as f64))
    }
}

impl From<f64> for Confidence {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}
