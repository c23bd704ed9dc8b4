pub mod bar_grid;
pub mod chords;
pub mod lyrics;
pub mod merge;

pub use bar_grid::BarGridBuilder;
pub use chords::align_chords;
pub use lyrics::align_lyrics;
pub use merge::ChartMerger;
