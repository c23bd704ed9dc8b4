use crate::alignment::lyrics::normalize_lyric;
use crate::chart::{
    BAR_SEPARATOR, DISCLAIMER, KEY_BPM, KEY_BPM_CONFIDENCE, KEY_BPM_SOURCE, KEY_LYRIC_CONFIDENCE,
    KEY_OVERALL_CONFIDENCE, KEY_SONG_KEY, KEY_TIME_SIGNATURE, KEY_TITLE, LYRIC_ESCAPE,
    NO_LYRIC_PLACEHOLDER, UNKNOWN_KEY,
};
use crate::config::ChartConfig;
use crate::confidence::Confidence;
use crate::types::{Chart, ChartRow};

#[derive(Debug, Clone, Copy)]
pub struct ChartFormatter {
    bars_per_line: usize,
    decimals: usize,
}

impl ChartFormatter {
    pub fn new(config: &ChartConfig) -> Self {
        Self {
            bars_per_line: config.bars_per_line.max(1) as usize,
            decimals: config.confidence_decimals,
        }
    }

    pub fn bars_per_line(&self) -> usize {
        self.bars_per_line
    }

    /// Header block, a blank line, then one line per `bars_per_line` bars.
    pub fn format(&self, chart: &Chart) -> Vec<String> {
        let meta = &chart.meta;
        let mut lines = vec![
            DISCLAIMER.to_string(),
            format!("{KEY_TITLE}: {}", single_line(&meta.title)),
            format!("{KEY_BPM}: {:.2}", meta.bpm),
            format!("{KEY_BPM_SOURCE}: {}", meta.bpm_source),
            format!("{KEY_BPM_CONFIDENCE}: {}", self.percent(meta.bpm_confidence)),
            format!(
                "{KEY_SONG_KEY}: {}",
                meta.key.as_deref().map(single_line).unwrap_or_else(|| UNKNOWN_KEY.to_string())
            ),
            format!("{KEY_TIME_SIGNATURE}: {}/4", meta.beats_per_bar),
            format!(
                "{KEY_LYRIC_CONFIDENCE}: {}",
                self.percent(meta.lyric_confidence)
            ),
            format!(
                "{KEY_OVERALL_CONFIDENCE}: {}",
                self.percent(meta.overall_confidence)
            ),
            String::new(),
        ];

        lines.extend(chart.rows.chunks(self.bars_per_line).map(|group| {
            group
                .iter()
                .map(|row| self.format_cell(row))
                .collect::<Vec<_>>()
                .join(BAR_SEPARATOR)
        }));
        lines
    }

    /// Whole chart as file contents, newline terminated.
    pub fn render(&self, chart: &Chart) -> String {
        let mut text = self.format(chart).join("\n");
        text.push('\n');
        text
    }

    fn format_cell(&self, row: &ChartRow) -> String {
        let chords = row
            .chord_changes()
            .iter()
            .map(|label| label.as_str().replace('|', "/"))
            .collect::<Vec<_>>()
            .join(" ");
        let lyric = match &row.lyric {
            Some(fragment) if !fragment.is_empty() => escape_lyric(normalize_lyric(&fragment.text)),
            _ => NO_LYRIC_PLACEHOLDER.to_string(),
        };
        format!(
            "{chords}\t{lyric}\t[chord {} lyric {} row {}]",
            self.percent(row.chord_confidence),
            self.percent(row.lyric_confidence()),
            self.percent(row.row_confidence)
        )
    }

    fn percent(&self, confidence: Confidence) -> String {
        format!("{:.*}%", self.decimals, confidence.percent())
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keeps a sung `...` apart from the no-lyric placeholder.
fn escape_lyric(text: String) -> String {
    if text == NO_LYRIC_PLACEHOLDER || text.starts_with(LYRIC_ESCAPE) {
        format!("{LYRIC_ESCAPE}{text}")
    } else {
        text
    }
}
