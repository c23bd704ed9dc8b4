//! Collaborators backed by recorded analysis bundles.
//!
//! A bundle `<song>.analysis.json` holds what the separation, tempo, chord and
//! transcription models reported for one song. Separation writes one stem
//! file per role into the song's scratch directory; the other collaborators
//! read those stem files back, so the full pipeline runs without audio
//! models.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ChartError;
use crate::pipeline::scratch::ScratchDir;
use crate::pipeline::traits::{ChordRecognizer, LyricTranscriber, StemSeparator, TempoExtractor};
use crate::types::{
    ChordEvent, LyricToken, SeparatedStems, Stem, StemHandle, StemRole, TempoMeasurement,
};

pub const BUNDLE_EXTENSION: &str = "analysis.json";
const RECORDED_SAMPLE_RATE_HZ: u32 = 44_100;

fn all_roles() -> Vec<StemRole> {
    StemRole::ALL.to_vec()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisBundle {
    pub duration_secs: f64,
    /// Roles separation produced; missing roles behave like failed separation.
    #[serde(default = "all_roles")]
    pub stems: Vec<StemRole>,
    /// Tempo extractor output per stem role.
    #[serde(default)]
    pub tempo: BTreeMap<StemRole, TempoMeasurement>,
    /// Roles on which the tempo extractor errors out.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tempo_failures: Vec<StemRole>,
    /// Key reported by the chord model, e.g. `G#m`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub chords: Vec<ChordEvent>,
    #[serde(default)]
    pub lyrics: Vec<LyricToken>,
}

impl AnalysisBundle {
    pub fn load(path: &Path) -> Result<Self, ChartError> {
        let data =
            fs::read_to_string(path).map_err(|e| ChartError::io("read analysis bundle", e))?;
        serde_json::from_str(&data).map_err(|e| ChartError::json("parse analysis bundle", e))
    }

    /// `song.wav` and `song` both map to `song.analysis.json`; a bundle path
    /// maps to itself.
    pub fn path_for(song: &Path) -> PathBuf {
        if is_bundle_path(song) {
            song.to_path_buf()
        } else {
            song.with_extension(BUNDLE_EXTENSION)
        }
    }
}

pub fn is_bundle_path(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with(&format!(".{BUNDLE_EXTENSION}")))
        .unwrap_or(false)
}

/// Song name of a bundle file, e.g. `ballad` for `ballad.analysis.json`.
pub fn bundle_song_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    name.strip_suffix(&format!(".{BUNDLE_EXTENSION}"))
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}

/// What one recorded stem file carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecordedStem {
    role: StemRole,
    #[serde(default)]
    tempo: Option<TempoMeasurement>,
    #[serde(default)]
    tempo_fails: bool,
    #[serde(default)]
    key: Option<String>,
    chords: Vec<ChordEvent>,
    lyrics: Vec<LyricToken>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordedBackend;

impl RecordedBackend {
    pub fn new() -> Self {
        Self
    }

    fn read_stem(&self, stem: &Stem) -> Result<RecordedStem, ChartError> {
        let StemHandle::File(path) = &stem.handle else {
            return Err(ChartError::collaborator(
                "recorded backend",
                format!("{} stem is not file backed", stem.role),
            ));
        };
        let data = fs::read_to_string(path).map_err(|e| ChartError::io("read recorded stem", e))?;
        let recorded: RecordedStem =
            serde_json::from_str(&data).map_err(|e| ChartError::json("parse recorded stem", e))?;
        if recorded.role != stem.role {
            return Err(ChartError::collaborator(
                "recorded backend",
                format!("stem file holds {} data, expected {}", recorded.role, stem.role),
            ));
        }
        Ok(recorded)
    }
}

impl StemSeparator for RecordedBackend {
    fn separate(&self, song: &Path, scratch: &ScratchDir) -> Result<SeparatedStems, ChartError> {
        let bundle_path = AnalysisBundle::path_for(song);
        let bundle = AnalysisBundle::load(&bundle_path)?;
        if !bundle.duration_secs.is_finite() || bundle.duration_secs < 0.0 {
            return Err(ChartError::invalid_input(format!(
                "{}: duration_secs must be finite and >= 0",
                bundle_path.display()
            )));
        }

        let mut stems = Vec::with_capacity(bundle.stems.len());
        for &role in &bundle.stems {
            let recorded = RecordedStem {
                role,
                tempo: bundle.tempo.get(&role).copied(),
                tempo_fails: bundle.tempo_failures.contains(&role),
                key: bundle.key.clone(),
                chords: bundle.chords.clone(),
                lyrics: bundle.lyrics.clone(),
            };
            let path = scratch.file(&format!("{role}.stem.json"));
            let json = serde_json::to_vec(&recorded)
                .map_err(|e| ChartError::json("serialize recorded stem", e))?;
            fs::write(&path, json).map_err(|e| ChartError::io("write recorded stem", e))?;
            stems.push(Stem {
                role,
                handle: StemHandle::File(path),
                sample_rate_hz: RECORDED_SAMPLE_RATE_HZ,
            });
        }

        tracing::debug!(
            bundle = %bundle_path.display(),
            stems = stems.len(),
            duration = format!("{:.2}", bundle.duration_secs),
            "recorded: stems separated"
        );
        Ok(SeparatedStems {
            stems,
            duration_secs: bundle.duration_secs,
        })
    }
}

impl TempoExtractor for RecordedBackend {
    fn estimate_tempo(&self, stem: &Stem) -> Result<TempoMeasurement, ChartError> {
        let recorded = self.read_stem(stem)?;
        if recorded.tempo_fails {
            return Err(ChartError::collaborator(
                "tempo extraction",
                format!("recorded failure on {} stem", stem.role),
            ));
        }
        recorded.tempo.ok_or_else(|| {
            ChartError::collaborator(
                "tempo extraction",
                format!("no tempo recorded for {} stem", stem.role),
            )
        })
    }
}

impl ChordRecognizer for RecordedBackend {
    fn recognize(&self, stem: &Stem) -> Result<Vec<ChordEvent>, ChartError> {
        Ok(self.read_stem(stem)?.chords)
    }

    fn estimate_key(&self, stem: &Stem) -> Result<Option<String>, ChartError> {
        Ok(self.read_stem(stem)?.key)
    }
}

impl LyricTranscriber for RecordedBackend {
    fn transcribe(&self, stem: &Stem) -> Result<Vec<LyricToken>, ChartError> {
        Ok(self.read_stem(stem)?.lyrics)
    }
}
