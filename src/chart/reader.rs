use serde::{Deserialize, Serialize};

use crate::chart::{
    BAR_SEPARATOR, KEY_BPM, KEY_BPM_CONFIDENCE, KEY_BPM_SOURCE, KEY_LYRIC_CONFIDENCE,
    KEY_OVERALL_CONFIDENCE, KEY_SONG_KEY, KEY_TIME_SIGNATURE, KEY_TITLE, LYRIC_ESCAPE,
    NO_LYRIC_PLACEHOLDER, UNKNOWN_KEY,
};
use crate::confidence::Confidence;
use crate::error::ChartError;
use crate::types::{ChordLabel, TempoSource};

/// A chart recovered from its text form. Confidences carry the display
/// precision the chart was written with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedChart {
    pub title: String,
    pub bpm: f64,
    pub bpm_source: TempoSource,
    pub bpm_confidence: Confidence,
    /// `None` for charts written without a key.
    pub key: Option<String>,
    pub time_signature: String,
    pub lyric_confidence: Confidence,
    pub overall_confidence: Confidence,
    pub bars: Vec<ParsedBar>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedBar {
    /// Chord changes within the bar.
    pub chords: Vec<ChordLabel>,
    /// Empty for instrumental bars.
    pub lyric: String,
    pub chord_confidence: Confidence,
    pub lyric_confidence: Confidence,
    pub row_confidence: Confidence,
}

#[derive(Default)]
struct Header {
    title: Option<String>,
    bpm: Option<f64>,
    bpm_source: Option<TempoSource>,
    bpm_confidence: Option<Confidence>,
    key: Option<String>,
    time_signature: Option<String>,
    lyric_confidence: Option<Confidence>,
    overall_confidence: Option<Confidence>,
}

pub fn parse_chart(text: &str) -> Result<ParsedChart, ChartError> {
    let mut lines = text.lines().enumerate();
    let mut header = Header::default();

    for (_, line) in lines.by_ref() {
        if line.trim().is_empty() {
            break;
        }
        // the disclaimer and any unknown line are not key/value pairs we need
        let Some((key, value)) = line.split_once(": ") else {
            continue;
        };
        let value = value.trim();
        match key {
            KEY_TITLE => header.title = Some(value.to_string()),
            KEY_BPM => header.bpm = Some(parse_number(KEY_BPM, value)?),
            KEY_BPM_SOURCE => {
                header.bpm_source = Some(TempoSource::parse(value).ok_or_else(|| {
                    ChartError::invalid_input(format!("unknown bpm source '{value}'"))
                })?)
            }
            KEY_BPM_CONFIDENCE => header.bpm_confidence = Some(parse_percent(value)?),
            KEY_SONG_KEY if value != UNKNOWN_KEY => header.key = Some(value.to_string()),
            KEY_TIME_SIGNATURE => header.time_signature = Some(value.to_string()),
            KEY_LYRIC_CONFIDENCE => header.lyric_confidence = Some(parse_percent(value)?),
            KEY_OVERALL_CONFIDENCE => header.overall_confidence = Some(parse_percent(value)?),
            _ => {}
        }
    }

    let mut bars = Vec::new();
    for (line_no, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        for cell in line.split(BAR_SEPARATOR) {
            bars.push(parse_cell(cell).map_err(|err| {
                ChartError::invalid_input(format!("line {}: {err}", line_no + 1))
            })?);
        }
    }

    Ok(ParsedChart {
        title: required(header.title, KEY_TITLE)?,
        bpm: required(header.bpm, KEY_BPM)?,
        bpm_source: required(header.bpm_source, KEY_BPM_SOURCE)?,
        bpm_confidence: required(header.bpm_confidence, KEY_BPM_CONFIDENCE)?,
        key: header.key,
        time_signature: required(header.time_signature, KEY_TIME_SIGNATURE)?,
        lyric_confidence: required(header.lyric_confidence, KEY_LYRIC_CONFIDENCE)?,
        overall_confidence: required(header.overall_confidence, KEY_OVERALL_CONFIDENCE)?,
        bars,
    })
}

fn parse_cell(cell: &str) -> Result<ParsedBar, String> {
    let mut fields = cell.splitn(3, '\t');
    let (Some(chords), Some(lyric), Some(annotation)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(format!("malformed bar cell '{cell}'"));
    };

    let inner = annotation
        .trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| format!("malformed confidence annotation '{annotation}'"))?;
    let tokens: Vec<&str> = inner.split_whitespace().collect();
    let ["chord", chord_confidence, "lyric", lyric_confidence, "row", row_confidence] =
        tokens.as_slice()
    else {
        return Err(format!("malformed confidence annotation '{annotation}'"));
    };

    let lyric = lyric.trim();
    let lyric = if lyric == NO_LYRIC_PLACEHOLDER {
        String::new()
    } else {
        lyric.strip_prefix(LYRIC_ESCAPE).unwrap_or(lyric).to_string()
    };
    Ok(ParsedBar {
        chords: chords.split_whitespace().map(ChordLabel::parse).collect(),
        lyric,
        chord_confidence: parse_percent(chord_confidence).map_err(|err| err.to_string())?,
        lyric_confidence: parse_percent(lyric_confidence).map_err(|err| err.to_string())?,
        row_confidence: parse_percent(row_confidence).map_err(|err| err.to_string())?,
    })
}

fn parse_percent(value: &str) -> Result<Confidence, ChartError> {
    let number = value
        .strip_suffix('%')
        .ok_or_else(|| ChartError::invalid_input(format!("expected a percentage, got '{value}'")))?;
    Ok(Confidence::from_percent(parse_number("percentage", number)?))
}

fn parse_number(what: &str, value: &str) -> Result<f64, ChartError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| ChartError::invalid_input(format!("{what}: '{value}' is not a number")))
}

fn required<T>(value: Option<T>, key: &str) -> Result<T, ChartError> {
    value.ok_or_else(|| ChartError::invalid_input(format!("chart header is missing '{key}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::{align_chords, align_lyrics, BarGridBuilder, ChartMerger};
    use crate::chart::ChartFormatter;
    use crate::config::ChartConfig;
    use crate::confidence::{LogProb, TempoStrength};
    use crate::types::{ChordEvent, LyricToken, StemRole, TempoEstimate};

    fn sample_chart(config: &ChartConfig) -> crate::types::Chart {
        let bars = BarGridBuilder::new(config.beats_per_bar)
            .build(120.0, 9.0, 0.0)
            .unwrap();
        let events = vec![
            ChordEvent {
                start_time: 0.0,
                end_time: 4.0,
                label: "C".to_string(),
                confidence: Confidence::new(0.9),
            },
            ChordEvent {
                start_time: 4.0,
                end_time: 9.0,
                label: "G7".to_string(),
                confidence: Confidence::new(0.7),
            },
        ];
        let tokens = vec![
            LyricToken {
                start_time: 0.2,
                end_time: 0.6,
                text: "twinkle".to_string(),
                log_prob: LogProb::from_probability(0.9),
            },
            LyricToken {
                start_time: 0.8,
                end_time: 1.2,
                text: "twinkle".to_string(),
                log_prob: LogProb::from_probability(0.8),
            },
            LyricToken {
                start_time: 4.5,
                end_time: 5.0,
                text: "star".to_string(),
                log_prob: LogProb::from_probability(0.6),
            },
        ];
        let chords = align_chords(events, &bars, config.subdivisions_per_bar);
        let lyrics = align_lyrics(tokens, &bars);
        let tempo = TempoEstimate {
            bpm: 120.0,
            strength: TempoStrength::new(0.42),
            source: TempoSource::Fallback,
            measured_on: Some(StemRole::FullMix),
            downbeat: None,
        };
        ChartMerger::new(config)
            .merge("Twinkle", Some("C"), &tempo, chords, lyrics, bars)
            .unwrap()
    }

    fn assert_round_trip(config: &ChartConfig) {
        let chart = sample_chart(config);
        let text = ChartFormatter::new(config).render(&chart);
        let parsed = parse_chart(&text).unwrap();

        let tolerance = 0.5 * 10f64.powi(-(config.confidence_decimals as i32)) / 100.0 + 1e-12;
        assert_eq!(parsed.title, "Twinkle");
        assert!((parsed.bpm - 120.0).abs() < 1e-9);
        assert_eq!(parsed.bpm_source, TempoSource::Fallback);
        assert!((parsed.bpm_confidence.value() - 0.42).abs() <= tolerance);
        assert!((parsed.overall_confidence.value() - chart.meta.overall_confidence.value()).abs() <= tolerance);
        assert_eq!(parsed.key.as_deref(), Some("C"));
        assert_eq!(parsed.time_signature, config.time_signature());
        assert_eq!(parsed.bars.len(), chart.rows.len());
        for (parsed_bar, row) in parsed.bars.iter().zip(&chart.rows) {
            let labels: Vec<ChordLabel> = row.chord_changes().into_iter().cloned().collect();
            assert_eq!(parsed_bar.chords, labels);
            assert_eq!(parsed_bar.lyric, row.lyric_text());
            assert!((parsed_bar.chord_confidence.value() - row.chord_confidence.value()).abs() <= tolerance);
            assert!((parsed_bar.lyric_confidence.value() - row.lyric_confidence().value()).abs() <= tolerance);
            assert!((parsed_bar.row_confidence.value() - row.row_confidence.value()).abs() <= tolerance);
        }
    }

    #[test]
    fn round_trip_one_bar_per_line() {
        assert_round_trip(&ChartConfig::default());
    }

    #[test]
    fn round_trip_grouped_bars_and_subdivisions() {
        assert_round_trip(&ChartConfig {
            bars_per_line: 2,
            subdivisions_per_bar: 2,
            confidence_decimals: 2,
            ..ChartConfig::default()
        });
    }

    #[test]
    fn missing_header_key_is_an_error() {
        let err = parse_chart("Title: x\n\n").unwrap_err();
        assert!(err.to_string().contains("BPM"));
    }

    #[test]
    fn malformed_cell_reports_line() {
        let config = ChartConfig::default();
        let mut text = ChartFormatter::new(&config).render(&sample_chart(&config));
        text.push_str("C\tno annotation\n");
        let err = parse_chart(&text).unwrap_err();
        assert!(err.to_string().contains("line 16"), "{err}");
    }

    fn one_bar_chart(tokens: Vec<LyricToken>) -> crate::types::Chart {
        let config = ChartConfig::default();
        let bars = BarGridBuilder::new(4).build(120.0, 2.0, 0.0).unwrap();
        let chords = align_chords(Vec::new(), &bars, 1);
        let lyrics = align_lyrics(tokens, &bars);
        let tempo = TempoEstimate {
            bpm: 120.0,
            strength: TempoStrength::new(0.9),
            source: TempoSource::Drum,
            measured_on: Some(StemRole::Drum),
            downbeat: None,
        };
        ChartMerger::new(&config)
            .merge("One", None, &tempo, chords, lyrics, bars)
            .unwrap()
    }

    fn token(text: &str, start: f64) -> LyricToken {
        LyricToken {
            start_time: start,
            end_time: start + 0.2,
            text: text.to_string(),
            log_prob: LogProb::from_probability(0.7),
        }
    }

    #[test]
    fn awkward_lyrics_read_back_exactly() {
        let config = ChartConfig::default();
        for tokens in [
            vec![token("...", 0.1)],
            vec![token("oh  yeah", 0.1)],
            vec![token("this | that", 0.1)],
            vec![token("\\o/", 0.1), token("hey", 0.5)],
        ] {
            let chart = one_bar_chart(tokens);
            let text = ChartFormatter::new(&config).render(&chart);
            let parsed = parse_chart(&text).unwrap();
            assert_eq!(parsed.bars.len(), 1);
            assert_eq!(parsed.bars[0].lyric, chart.rows[0].lyric_text(), "{text}");
            assert!(!parsed.bars[0].lyric.is_empty());
        }
    }

    #[test]
    fn unknown_key_reads_as_none() {
        let config = ChartConfig::default();
        let chart = one_bar_chart(Vec::new());
        let text = ChartFormatter::new(&config).render(&chart);
        assert!(text.contains("Key: unknown"));
        let parsed = parse_chart(&text).unwrap();
        assert_eq!(parsed.key, None);
        assert_eq!(parsed.bars[0].lyric, "");
    }
}
