use std::fs;
use std::path::{Path, PathBuf};

use crate::chart::ChartFormatter;
use crate::error::ChartError;
use crate::types::Chart;

/// `<title>_chart.txt`, with path separators and control characters in the
/// title replaced so the file always lands directly in the output directory.
pub fn chart_file_name(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = if stem.is_empty() || stem.chars().all(|c| c == '.') {
        "untitled".to_string()
    } else {
        stem
    };
    format!("{stem}_chart.txt")
}

/// Renders `chart` and writes it under `out_dir`, creating the directory on
/// demand. Returns the written path.
pub fn write_chart(
    out_dir: &Path,
    chart: &Chart,
    formatter: &ChartFormatter,
) -> Result<PathBuf, ChartError> {
    fs::create_dir_all(out_dir).map_err(|e| ChartError::io("create chart output directory", e))?;
    let out_path = out_dir.join(chart_file_name(&chart.meta.title));
    fs::write(&out_path, formatter.render(chart)).map_err(|e| ChartError::io("write chart", e))?;
    tracing::debug!(path = %out_path.display(), rows = chart.rows.len(), "chart written");
    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::parse_chart;
    use crate::config::ChartConfig;
    use crate::confidence::Confidence;
    use crate::types::{ChartMeta, TempoSource};

    fn empty_chart(title: &str) -> Chart {
        Chart {
            meta: ChartMeta {
                title: title.to_string(),
                key: None,
                bpm: 96.0,
                bpm_source: TempoSource::FullMix,
                bpm_confidence: Confidence::new(0.5),
                beats_per_bar: 3,
                lyric_confidence: Confidence::ZERO,
                overall_confidence: Confidence::ZERO,
            },
            rows: Vec::new(),
        }
    }

    #[test]
    fn file_name_is_sanitized() {
        assert_eq!(chart_file_name("My Song"), "My Song_chart.txt");
        assert_eq!(chart_file_name("AC/DC: Live"), "AC_DC_ Live_chart.txt");
        assert_eq!(chart_file_name("  "), "untitled_chart.txt");
        assert_eq!(chart_file_name(".."), "untitled_chart.txt");
    }

    #[test]
    fn write_creates_directory_and_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out_dir = dir.path().join("nested").join("charts");
        let formatter = ChartFormatter::new(&ChartConfig::default());
        let path = write_chart(&out_dir, &empty_chart("waltz"), &formatter).expect("write chart");

        assert_eq!(path, out_dir.join("waltz_chart.txt"));
        let text = std::fs::read_to_string(&path).expect("read back");
        let parsed = parse_chart(&text).expect("parse back");
        assert_eq!(parsed.title, "waltz");
        assert_eq!(parsed.time_signature, "3/4");
        assert!(parsed.bars.is_empty());
    }
}
