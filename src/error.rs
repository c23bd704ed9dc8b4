use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid tempo: {bpm} bpm (must be finite and > 0)")]
    InvalidTempo { bpm: f64 },
    #[error(
        "alignment length mismatch: {bars} bars, {chords} chord rows, {lyrics} lyric fragments"
    )]
    AlignmentMismatch {
        bars: usize,
        chords: usize,
        lyrics: usize,
    },
    #[error("bar {bar} received chords for bar {chord_bar} and lyrics for bar {lyric_bar}")]
    BarIndexMismatch {
        bar: usize,
        chord_bar: usize,
        lyric_bar: usize,
    },
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON parse error while {context}: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{context}: {message}")]
    Collaborator {
        context: &'static str,
        message: String,
    },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl ChartError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }

    /// Wraps a failure reported by an external collaborator (separation,
    /// tempo extraction, chord recognition, transcription).
    pub fn collaborator(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Collaborator {
            context,
            message: err.to_string(),
        }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Errors that indicate a defect upstream of the merge rather than bad data.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::AlignmentMismatch { .. } | Self::BarIndexMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_tempo_message_names_bpm() {
        let err = ChartError::InvalidTempo { bpm: -3.0 };
        assert!(err.to_string().contains("-3"));
        assert!(!err.is_invariant_violation());
    }

    #[test]
    fn mismatch_is_invariant_violation() {
        let err = ChartError::AlignmentMismatch {
            bars: 4,
            chords: 4,
            lyrics: 3,
        };
        assert!(err.is_invariant_violation());
        assert!(err.to_string().contains("3 lyric fragments"));
    }

    #[test]
    fn bar_index_mismatch_is_invariant_violation() {
        let err = ChartError::BarIndexMismatch {
            bar: 2,
            chord_bar: 2,
            lyric_bar: 3,
        };
        assert!(err.is_invariant_violation());
        assert!(err.to_string().contains("lyrics for bar 3"));
    }

    #[test]
    fn collaborator_carries_context() {
        let err = ChartError::collaborator("chord recognition", "model exploded");
        assert_eq!(err.to_string(), "chord recognition: model exploded");
    }
}
