use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::confidence::{Confidence, LogProb, TempoStrength};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StemRole {
    Drum,
    NoVocal,
    FullMix,
    Music,
    Vocal,
}

impl StemRole {
    pub const ALL: [StemRole; 5] = [
        StemRole::Drum,
        StemRole::NoVocal,
        StemRole::FullMix,
        StemRole::Music,
        StemRole::Vocal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Drum => "drum",
            Self::NoVocal => "no_vocal",
            Self::FullMix => "full_mix",
            Self::Music => "music",
            Self::Vocal => "vocal",
        }
    }
}

impl fmt::Display for StemRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a stem's audio lives. The core never reads the samples; only
/// collaborators do.
#[derive(Debug, Clone)]
pub enum StemHandle {
    File(PathBuf),
    Buffer(Arc<[f32]>),
}

#[derive(Debug, Clone)]
pub struct Stem {
    pub role: StemRole,
    pub handle: StemHandle,
    pub sample_rate_hz: u32,
}

#[derive(Debug, Clone, Default)]
pub struct SeparatedStems {
    pub stems: Vec<Stem>,
    pub duration_secs: f64,
}

impl SeparatedStems {
    pub fn get(&self, role: StemRole) -> Option<&Stem> {
        self.stems.iter().find(|stem| stem.role == role)
    }

    /// First present stem in `roles` order.
    pub fn first_of(&self, roles: &[StemRole]) -> Option<&Stem> {
        roles.iter().find_map(|&role| self.get(role))
    }
}

/// Raw output of the external tempo extractor for one stem.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoMeasurement {
    pub bpm: f64,
    pub strength: TempoStrength,
    /// First downbeat in seconds, when the extractor tracks beats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downbeat: Option<f64>,
}

impl TempoMeasurement {
    pub fn has_valid_bpm(&self) -> bool {
        self.bpm.is_finite() && self.bpm > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TempoSource {
    Drum,
    NoVocal,
    FullMix,
    /// No candidate reached the acceptance threshold.
    Fallback,
}

impl TempoSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Drum => "drum",
            Self::NoVocal => "no_vocal",
            Self::FullMix => "full_mix",
            Self::Fallback => "fallback",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "drum" => Some(Self::Drum),
            "no_vocal" => Some(Self::NoVocal),
            "full_mix" => Some(Self::FullMix),
            "fallback" => Some(Self::Fallback),
            _ => None,
        }
    }

    pub(crate) fn for_role(role: StemRole) -> Self {
        match role {
            StemRole::Drum => Self::Drum,
            StemRole::NoVocal => Self::NoVocal,
            _ => Self::FullMix,
        }
    }
}

impl fmt::Display for TempoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoEstimate {
    pub bpm: f64,
    pub strength: TempoStrength,
    pub source: TempoSource,
    /// Stem the bpm was measured on, also set for fallback estimates.
    pub measured_on: Option<StemRole>,
    pub downbeat: Option<f64>,
}

/// Half-open interval `[start_time, end_time)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub index: usize,
    pub start_time: f64,
    pub end_time: f64,
    /// Length of a full bar at the song tempo.
    pub nominal_duration: f64,
}

impl Bar {
    const PARTIAL_EPS: f64 = 1e-6;

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn is_partial(&self) -> bool {
        self.duration() < self.nominal_duration - Self::PARTIAL_EPS
    }

    /// Share of a full bar this bar spans, in [0, 1].
    pub fn fill_ratio(&self) -> f64 {
        if self.nominal_duration <= 0.0 {
            return 0.0;
        }
        (self.duration() / self.nominal_duration).clamp(0.0, 1.0)
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start_time && time < self.end_time
    }

    pub fn overlap(&self, start: f64, end: f64) -> f64 {
        overlap(self.start_time, self.end_time, start, end)
    }
}

pub(crate) fn overlap(a_start: f64, a_end: f64, b_start: f64, b_end: f64) -> f64 {
    (a_end.min(b_end) - a_start.max(b_start)).max(0.0)
}

/// One event from the chord recognizer, half-open `[start_time, end_time)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordEvent {
    pub start_time: f64,
    pub end_time: f64,
    pub label: String,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChordLabel {
    Chord(String),
    NoChord,
}

impl ChordLabel {
    pub const NO_CHORD_MARKER: &'static str = "N.C.";

    /// Recognizer output and chart text share this parser. `N`, `N.C.` and
    /// blank labels mean no chord; whitespace inside a label becomes `_`
    /// and `|` becomes `/`, so a label is always one chart token.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "N" || trimmed == Self::NO_CHORD_MARKER {
            return Self::NoChord;
        }
        Self::Chord(
            trimmed
                .split_whitespace()
                .collect::<Vec<_>>()
                .join("_")
                .replace('|', "/"),
        )
    }

    pub fn is_chord(&self) -> bool {
        matches!(self, Self::Chord(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Chord(name) => name,
            Self::NoChord => Self::NO_CHORD_MARKER,
        }
    }
}

impl fmt::Display for ChordLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ChordLabel {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ChordLabel> for String {
    fn from(value: ChordLabel) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordSlot {
    pub bar_index: usize,
    pub subdivision: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub label: ChordLabel,
    pub confidence: Confidence,
}

/// Chord slots of one bar, ordered by subdivision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarChords {
    pub bar_index: usize,
    pub slots: Vec<ChordSlot>,
}

impl BarChords {
    /// Mean slot confidence; slots within a bar have equal length.
    pub fn confidence(&self) -> Confidence {
        Confidence::mean(self.slots.iter().map(|slot| slot.confidence)).unwrap_or(Confidence::ZERO)
    }

    pub fn has_chord(&self) -> bool {
        self.slots.iter().any(|slot| slot.label.is_chord())
    }
}

/// One transcription token, half-open `[start_time, end_time)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricToken {
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
    pub log_prob: LogProb,
}

impl LyricToken {
    pub fn midpoint(&self) -> f64 {
        (self.start_time + self.end_time) * 0.5
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricFragment {
    pub bar_index: usize,
    pub text: String,
    pub confidence: Confidence,
}

impl LyricFragment {
    pub fn empty(bar_index: usize) -> Self {
        Self {
            bar_index,
            text: String::new(),
            confidence: Confidence::ZERO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRow {
    pub bar: Bar,
    pub chords: Vec<ChordSlot>,
    pub lyric: Option<LyricFragment>,
    pub chord_confidence: Confidence,
    pub row_confidence: Confidence,
}

impl ChartRow {
    pub fn lyric_confidence(&self) -> Confidence {
        self.lyric
            .as_ref()
            .map(|fragment| fragment.confidence)
            .unwrap_or(Confidence::ZERO)
    }

    pub fn lyric_text(&self) -> &str {
        self.lyric.as_ref().map(|f| f.text.as_str()).unwrap_or("")
    }

    /// Slot labels with consecutive repeats folded, so a chord held across
    /// subdivisions is listed once.
    pub fn chord_changes(&self) -> Vec<&ChordLabel> {
        let mut changes: Vec<&ChordLabel> = Vec::with_capacity(self.chords.len());
        for slot in &self.chords {
            if changes.last() != Some(&&slot.label) {
                changes.push(&slot.label);
            }
        }
        changes
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartMeta {
    pub title: String,
    /// `None` when the chord recognizer reported no key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub bpm: f64,
    pub bpm_source: TempoSource,
    pub bpm_confidence: Confidence,
    pub beats_per_bar: u32,
    /// Mean fragment confidence over bars with lyrics.
    pub lyric_confidence: Confidence,
    pub overall_confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub meta: ChartMeta,
    pub rows: Vec<ChartRow>,
}
