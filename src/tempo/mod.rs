//! Song tempo: beat-time measurement, octave folding and the stem fallback
//! chain that picks one estimate per song.

pub mod beats;
pub mod estimator;
pub mod fold;

pub use estimator::{BpmEstimator, CandidateOutcome, TempoCandidate};
