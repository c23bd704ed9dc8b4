//! Plain-text chart rendering, parsing and file output.
//!
//! A chart file starts with a header block of `Key: value` lines closed by a
//! blank line. Each body line holds `bars_per_line` bar cells joined by
//! [`BAR_SEPARATOR`]; a cell is `chords<TAB>lyric<TAB>[chord x% lyric y% row z%]`.
//! The chords of a cell list the chord changes within the bar. A lyric that
//! would read as [`NO_LYRIC_PLACEHOLDER`] or starts with [`LYRIC_ESCAPE`] is
//! written with a leading [`LYRIC_ESCAPE`].

pub mod formatter;
pub mod reader;
pub mod writer;

pub use formatter::ChartFormatter;
pub use reader::{parse_chart, ParsedBar, ParsedChart};
pub use writer::{chart_file_name, write_chart};

pub const DISCLAIMER: &str =
    "Generated from automatic audio analysis. Chords, tempo and lyrics may be inaccurate.";
pub const BAR_SEPARATOR: &str = " | ";
pub const NO_LYRIC_PLACEHOLDER: &str = "...";
pub const LYRIC_ESCAPE: char = '\\';
pub const UNKNOWN_KEY: &str = "unknown";

pub(crate) const KEY_TITLE: &str = "Title";
pub(crate) const KEY_BPM: &str = "BPM";
pub(crate) const KEY_BPM_SOURCE: &str = "BPM Source";
pub(crate) const KEY_BPM_CONFIDENCE: &str = "BPM Confidence";
pub(crate) const KEY_SONG_KEY: &str = "Key";
pub(crate) const KEY_TIME_SIGNATURE: &str = "Time Signature";
pub(crate) const KEY_LYRIC_CONFIDENCE: &str = "Lyric Transcription Confidence";
pub(crate) const KEY_OVERALL_CONFIDENCE: &str = "Overall Confidence";
