use std::path::{Path, PathBuf};

use crate::alignment::{align_chords, align_lyrics, BarGridBuilder, ChartMerger};
use crate::config::ChartConfig;
use crate::error::ChartError;
use crate::pipeline::recorded::bundle_song_name;
use crate::pipeline::scratch::ScratchDir;
use crate::pipeline::traits::{ChordRecognizer, LyricTranscriber, StemSeparator, TempoExtractor};
use crate::tempo::{BpmEstimator, TempoCandidate};
use crate::types::{Bar, BarChords, Chart, LyricFragment, SeparatedStems, StemRole};

/// Chord recognition prefers the accompaniment without drums or vocals.
pub const CHORD_STEM_ORDER: [StemRole; 3] = [StemRole::Music, StemRole::NoVocal, StemRole::FullMix];
pub const LYRIC_STEM_ORDER: [StemRole; 2] = [StemRole::Vocal, StemRole::FullMix];

pub struct ChartPipeline {
    config: ChartConfig,
    scratch_root: Option<PathBuf>,
    separator: Box<dyn StemSeparator>,
    tempo_extractor: Box<dyn TempoExtractor>,
    chord_recognizer: Box<dyn ChordRecognizer>,
    lyric_transcriber: Box<dyn LyricTranscriber>,
}

pub(crate) struct ChartPipelineParts {
    pub config: ChartConfig,
    pub scratch_root: Option<PathBuf>,
    pub separator: Box<dyn StemSeparator>,
    pub tempo_extractor: Box<dyn TempoExtractor>,
    pub chord_recognizer: Box<dyn ChordRecognizer>,
    pub lyric_transcriber: Box<dyn LyricTranscriber>,
}

impl ChartPipeline {
    pub(crate) fn from_parts(parts: ChartPipelineParts) -> Self {
        Self {
            config: parts.config,
            scratch_root: parts.scratch_root,
            separator: parts.separator,
            tempo_extractor: parts.tempo_extractor,
            chord_recognizer: parts.chord_recognizer,
            lyric_transcriber: parts.lyric_transcriber,
        }
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    /// Runs one song end to end, titled after its file name.
    pub fn process(&self, song: &Path) -> Result<Chart, ChartError> {
        self.process_titled(song, &song_title(song))
    }

    /// Separation writes into a fresh scratch directory that is wiped when
    /// this returns, whether the song succeeded or not.
    pub fn process_titled(&self, song: &Path, title: &str) -> Result<Chart, ChartError> {
        tracing::info!(song = %song.display(), title, "processing song");
        let scratch = ScratchDir::create(self.scratch_root.as_deref())?;
        let stems = self.separator.separate(song, &scratch)?;
        let chart = self.chart_from_stems(title, &stems)?;
        scratch.close()?;
        Ok(chart)
    }

    /// Everything after separation: tempo, bar grid, both alignments and the
    /// merge.
    pub fn chart_from_stems(&self, title: &str, stems: &SeparatedStems) -> Result<Chart, ChartError> {
        let candidates = TempoCandidate::from_stems(stems);
        let tempo = BpmEstimator::new(self.tempo_extractor.as_ref(), &self.config).estimate(&candidates);
        tracing::info!(
            title,
            bpm = format!("{:.2}", tempo.bpm),
            source = tempo.source.as_str(),
            strength = format!("{:.3}", tempo.strength.value()),
            "tempo estimated"
        );

        let origin = tempo.downbeat.unwrap_or(0.0);
        let bars = BarGridBuilder::new(self.config.beats_per_bar).build(
            tempo.bpm,
            stems.duration_secs,
            origin,
        )?;

        // The two tracks share only the immutable grid.
        let (chords, lyrics) = rayon::join(
            || self.chord_track(stems, &bars),
            || self.lyric_track(stems, &bars),
        );
        let (chords, key) = chords?;
        let lyrics = lyrics?;

        ChartMerger::new(&self.config).merge(title, key.as_deref(), &tempo, chords, lyrics, bars)
    }

    /// Aligned chords plus the key reported on the same stem.
    fn chord_track(
        &self,
        stems: &SeparatedStems,
        bars: &[Bar],
    ) -> Result<(Vec<BarChords>, Option<String>), ChartError> {
        let Some(stem) = stems.first_of(&CHORD_STEM_ORDER) else {
            tracing::warn!("chords: no usable stem, chart will have no chords");
            return Ok((align_chords(Vec::new(), bars, self.config.subdivisions_per_bar), None));
        };
        tracing::debug!(role = stem.role.as_str(), "chords: recognizing");
        let events = self.chord_recognizer.recognize(stem)?;
        // a missing key only costs the header line
        let key = match self.chord_recognizer.estimate_key(stem) {
            Ok(key) => key,
            Err(err) => {
                tracing::warn!(role = stem.role.as_str(), error = %err, "chords: key estimation failed");
                None
            }
        };
        Ok((align_chords(events, bars, self.config.subdivisions_per_bar), key))
    }

    fn lyric_track(&self, stems: &SeparatedStems, bars: &[Bar]) -> Result<Vec<LyricFragment>, ChartError> {
        let tokens = match stems.first_of(&LYRIC_STEM_ORDER) {
            Some(stem) => {
                tracing::debug!(role = stem.role.as_str(), "lyrics: transcribing");
                self.lyric_transcriber.transcribe(stem)?
            }
            None => {
                tracing::warn!("lyrics: no usable stem, chart will have no lyrics");
                Vec::new()
            }
        };
        Ok(align_lyrics(tokens, bars))
    }
}

/// `ballad` for `songs/ballad.wav` or `songs/ballad.analysis.json`.
pub fn song_title(song: &Path) -> String {
    bundle_song_name(song)
        .or_else(|| {
            song.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "untitled".to_string())
}
