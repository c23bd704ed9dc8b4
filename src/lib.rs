pub mod alignment;
pub mod chart;
pub mod confidence;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod tempo;
pub mod types;

pub use alignment::{align_chords, align_lyrics, BarGridBuilder, ChartMerger};
pub use chart::{parse_chart, write_chart, ChartFormatter, ParsedChart};
pub use confidence::{Confidence, LogProb, OverlapRatio, TempoStrength};
pub use config::ChartConfig;
pub use error::ChartError;
pub use pipeline::batch::{process_batch, SongJob, SongOutcome};
pub use pipeline::builder::ChartPipelineBuilder;
pub use pipeline::runtime::ChartPipeline;
pub use pipeline::scratch::ScratchDir;
pub use pipeline::traits::{
    BeatTracker, ChordRecognizer, LyricTranscriber, StemSeparator, TempoExtractor,
};
pub use report::BatchReport;
pub use tempo::{BpmEstimator, TempoCandidate};
pub use types::{
    Bar, BarChords, Chart, ChartRow, ChordEvent, ChordLabel, ChordSlot, LyricFragment, LyricToken,
    SeparatedStems, Stem, StemHandle, StemRole, TempoEstimate, TempoMeasurement, TempoSource,
};
