use crate::config::ChartConfig;
use crate::confidence::TempoStrength;
use crate::pipeline::traits::TempoExtractor;
use crate::tempo::fold::fold_bpm;
use crate::types::{SeparatedStems, Stem, StemRole, TempoEstimate, TempoMeasurement, TempoSource};

/// One link of the fallback chain. `stem` is `None` when separation did not
/// produce that role; such links are skipped without penalty.
#[derive(Debug, Clone, Copy)]
pub struct TempoCandidate<'a> {
    pub role: StemRole,
    pub stem: Option<&'a Stem>,
}

impl<'a> TempoCandidate<'a> {
    /// Percussive onsets first, then the vocal-free mix, then the full mix.
    pub const PRIORITY: [StemRole; 3] = [StemRole::Drum, StemRole::NoVocal, StemRole::FullMix];

    pub fn from_stems(stems: &'a SeparatedStems) -> Vec<Self> {
        Self::PRIORITY
            .iter()
            .map(|&role| TempoCandidate {
                role,
                stem: stems.get(role),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CandidateOutcome {
    Absent,
    Failed(String),
    Rejected(TempoMeasurement),
    Accepted(TempoMeasurement),
}

pub struct BpmEstimator<'a> {
    extractor: &'a dyn TempoExtractor,
    accept_threshold: f64,
    fold_range: Option<(f64, f64)>,
}

impl<'a> BpmEstimator<'a> {
    pub fn new(extractor: &'a dyn TempoExtractor, config: &ChartConfig) -> Self {
        Self {
            extractor,
            accept_threshold: config.accept_threshold,
            fold_range: config.bpm_fold_range,
        }
    }

    /// Runs a single link of the chain in isolation.
    pub fn evaluate(&self, candidate: &TempoCandidate<'_>) -> CandidateOutcome {
        let Some(stem) = candidate.stem else {
            return CandidateOutcome::Absent;
        };
        match self.extractor.estimate_tempo(stem) {
            Ok(measurement) if !measurement.has_valid_bpm() => {
                CandidateOutcome::Failed(format!("invalid bpm {}", measurement.bpm))
            }
            Ok(measurement) if measurement.strength.value() >= self.accept_threshold => {
                CandidateOutcome::Accepted(measurement)
            }
            Ok(measurement) => CandidateOutcome::Rejected(measurement),
            Err(err) => CandidateOutcome::Failed(err.to_string()),
        }
    }

    /// Walks `candidates` in order and stops at the first accepted
    /// measurement. When none is accepted the strongest valid attempt is
    /// returned tagged [`TempoSource::Fallback`] (earlier candidates win
    /// ties). With no valid attempt at all the estimate has bpm 0, which the
    /// bar grid rejects.
    pub fn estimate(&self, candidates: &[TempoCandidate<'_>]) -> TempoEstimate {
        let mut best: Option<(StemRole, TempoMeasurement)> = None;

        for candidate in candidates {
            match self.evaluate(candidate) {
                CandidateOutcome::Accepted(measurement) => {
                    tracing::debug!(
                        role = candidate.role.as_str(),
                        bpm = format!("{:.2}", measurement.bpm),
                        strength = format!("{:.3}", measurement.strength.value()),
                        "tempo: candidate accepted"
                    );
                    return self.finish(
                        measurement,
                        TempoSource::for_role(candidate.role),
                        Some(candidate.role),
                    );
                }
                CandidateOutcome::Rejected(measurement) => {
                    tracing::debug!(
                        role = candidate.role.as_str(),
                        strength = format!("{:.3}", measurement.strength.value()),
                        threshold = self.accept_threshold,
                        "tempo: candidate below threshold"
                    );
                    let stronger = best
                        .as_ref()
                        .map(|(_, b)| measurement.strength > b.strength)
                        .unwrap_or(true);
                    if stronger {
                        best = Some((candidate.role, measurement));
                    }
                }
                CandidateOutcome::Absent => {
                    tracing::debug!(role = candidate.role.as_str(), "tempo: stem absent, skipped");
                }
                CandidateOutcome::Failed(reason) => {
                    tracing::warn!(
                        role = candidate.role.as_str(),
                        reason = reason.as_str(),
                        "tempo: extractor failed on candidate"
                    );
                }
            }
        }

        match best {
            Some((role, measurement)) => {
                tracing::info!(
                    role = role.as_str(),
                    strength = format!("{:.3}", measurement.strength.value()),
                    "tempo: no candidate accepted, using strongest attempt"
                );
                self.finish(measurement, TempoSource::Fallback, Some(role))
            }
            None => {
                tracing::warn!("tempo: no usable candidate");
                TempoEstimate {
                    bpm: 0.0,
                    strength: TempoStrength::default(),
                    source: TempoSource::Fallback,
                    measured_on: None,
                    downbeat: None,
                }
            }
        }
    }

    fn finish(
        &self,
        measurement: TempoMeasurement,
        source: TempoSource,
        measured_on: Option<StemRole>,
    ) -> TempoEstimate {
        let bpm = match self.fold_range {
            Some((min, max)) => fold_bpm(measurement.bpm, min, max),
            None => measurement.bpm,
        };
        TempoEstimate {
            bpm,
            strength: measurement.strength,
            source,
            measured_on,
            downbeat: measurement.downbeat,
        }
    }
}
