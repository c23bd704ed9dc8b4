use std::path::PathBuf;

use crate::config::ChartConfig;
use crate::error::ChartError;
use crate::pipeline::recorded::RecordedBackend;
use crate::pipeline::runtime::{ChartPipeline, ChartPipelineParts};
use crate::pipeline::traits::{ChordRecognizer, LyricTranscriber, StemSeparator, TempoExtractor};

/// Collaborators left unset fall back to [`RecordedBackend`].
pub struct ChartPipelineBuilder {
    config: ChartConfig,
    scratch_root: Option<PathBuf>,
    separator: Option<Box<dyn StemSeparator>>,
    tempo_extractor: Option<Box<dyn TempoExtractor>>,
    chord_recognizer: Option<Box<dyn ChordRecognizer>>,
    lyric_transcriber: Option<Box<dyn LyricTranscriber>>,
}

impl ChartPipelineBuilder {
    pub fn new(config: ChartConfig) -> Self {
        Self {
            config,
            scratch_root: None,
            separator: None,
            tempo_extractor: None,
            chord_recognizer: None,
            lyric_transcriber: None,
        }
    }

    /// Parent directory for per-song scratch directories. Defaults to the
    /// system temp dir.
    pub fn with_scratch_root(mut self, scratch_root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(scratch_root.into());
        self
    }

    pub fn with_separator(mut self, separator: Box<dyn StemSeparator>) -> Self {
        self.separator = Some(separator);
        self
    }

    pub fn with_tempo_extractor(mut self, tempo_extractor: Box<dyn TempoExtractor>) -> Self {
        self.tempo_extractor = Some(tempo_extractor);
        self
    }

    pub fn with_chord_recognizer(mut self, chord_recognizer: Box<dyn ChordRecognizer>) -> Self {
        self.chord_recognizer = Some(chord_recognizer);
        self
    }

    pub fn with_lyric_transcriber(mut self, lyric_transcriber: Box<dyn LyricTranscriber>) -> Self {
        self.lyric_transcriber = Some(lyric_transcriber);
        self
    }

    pub fn build(self) -> Result<ChartPipeline, ChartError> {
        self.config.validate()?;
        if let Some(root) = &self.scratch_root {
            if !root.is_dir() {
                return Err(ChartError::invalid_input(format!(
                    "scratch root '{}' is not a directory",
                    root.display()
                )));
            }
        }

        Ok(ChartPipeline::from_parts(ChartPipelineParts {
            config: self.config,
            scratch_root: self.scratch_root,
            separator: self
                .separator
                .unwrap_or_else(|| Box::new(RecordedBackend::new())),
            tempo_extractor: self
                .tempo_extractor
                .unwrap_or_else(|| Box::new(RecordedBackend::new())),
            chord_recognizer: self
                .chord_recognizer
                .unwrap_or_else(|| Box::new(RecordedBackend::new())),
            lyric_transcriber: self
                .lyric_transcriber
                .unwrap_or_else(|| Box::new(RecordedBackend::new())),
        }))
    }
}
