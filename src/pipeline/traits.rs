use std::path::Path;

use crate::error::ChartError;
use crate::pipeline::scratch::ScratchDir;
use crate::tempo::beats::measure_from_beats;
use crate::types::{ChordEvent, LyricToken, SeparatedStems, Stem, TempoMeasurement};

/// Splits a recording into role-labelled stems. Any file it writes must live
/// under `scratch`, which is wiped when the song finishes.
pub trait StemSeparator: Send + Sync {
    fn separate(&self, song: &Path, scratch: &ScratchDir) -> Result<SeparatedStems, ChartError>;
}

pub trait TempoExtractor: Send + Sync {
    fn estimate_tempo(&self, stem: &Stem) -> Result<TempoMeasurement, ChartError>;
}

pub trait ChordRecognizer: Send + Sync {
    /// Finite, time-ordered chord events.
    fn recognize(&self, stem: &Stem) -> Result<Vec<ChordEvent>, ChartError>;

    /// Song key such as `G` or `F#m`, read from the same stem. Recognizers
    /// without key detection report `None`.
    fn estimate_key(&self, _stem: &Stem) -> Result<Option<String>, ChartError> {
        Ok(None)
    }
}

pub trait LyricTranscriber: Send + Sync {
    /// Finite, time-ordered lyric tokens.
    fn transcribe(&self, stem: &Stem) -> Result<Vec<LyricToken>, ChartError>;
}

pub trait BeatTracker: Send + Sync {
    fn track_beats(&self, stem: &Stem) -> Result<Vec<f64>, ChartError>;
}

/// Turns a beat tracker into a tempo extractor via [`measure_from_beats`].
pub struct BeatTrackingTempoExtractor<B> {
    tracker: B,
}

impl<B: BeatTracker> BeatTrackingTempoExtractor<B> {
    pub fn new(tracker: B) -> Self {
        Self { tracker }
    }
}

impl<B: BeatTracker> TempoExtractor for BeatTrackingTempoExtractor<B> {
    fn estimate_tempo(&self, stem: &Stem) -> Result<TempoMeasurement, ChartError> {
        let beats = self.tracker.track_beats(stem)?;
        measure_from_beats(&beats).ok_or_else(|| {
            ChartError::collaborator(
                "beat tracking",
                format!("insufficient beats detected on {} stem ({})", stem.role, beats.len()),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::types::{StemHandle, StemRole};

    struct FixedBeats(Vec<f64>);

    impl BeatTracker for FixedBeats {
        fn track_beats(&self, _stem: &Stem) -> Result<Vec<f64>, ChartError> {
            Ok(self.0.clone())
        }
    }

    fn drum_stem() -> Stem {
        Stem {
            role: StemRole::Drum,
            handle: StemHandle::File(PathBuf::from("drums.wav")),
            sample_rate_hz: 44_100,
        }
    }

    #[test]
    fn beat_tracker_adapter_measures_tempo() {
        let extractor = BeatTrackingTempoExtractor::new(FixedBeats(vec![0.0, 0.6, 1.2, 1.8]));
        let m = extractor.estimate_tempo(&drum_stem()).unwrap();
        assert!((m.bpm - 100.0).abs() < 1e-9);
        assert_eq!(m.downbeat, Some(0.0));
    }

    #[test]
    fn beat_tracker_adapter_fails_on_single_beat() {
        let extractor = BeatTrackingTempoExtractor::new(FixedBeats(vec![0.4]));
        let err = extractor.estimate_tempo(&drum_stem()).unwrap_err();
        assert!(err.to_string().contains("insufficient beats"));
    }
}
