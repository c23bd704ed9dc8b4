use crate::config::ChartConfig;
use crate::confidence::Confidence;
use crate::error::ChartError;
use crate::types::{Bar, BarChords, Chart, ChartMeta, ChartRow, LyricFragment, TempoEstimate};

/// Zips the aligned chord and lyric tracks onto the bar grid.
#[derive(Debug, Clone, Copy)]
pub struct ChartMerger {
    chord_weight: f64,
    lyric_weight: f64,
    beats_per_bar: u32,
}

impl ChartMerger {
    pub fn new(config: &ChartConfig) -> Self {
        Self {
            chord_weight: config.chord_weight,
            lyric_weight: config.lyric_weight,
            beats_per_bar: config.beats_per_bar,
        }
    }

    pub fn with_weights(mut self, chord_weight: f64, lyric_weight: f64) -> Self {
        self.chord_weight = chord_weight;
        self.lyric_weight = lyric_weight;
        self
    }

    /// Builds one row per bar. The three sequences must have the same length
    /// and share bar indices; anything else is an upstream defect and is
    /// reported rather than truncated or padded.
    pub fn merge(
        &self,
        title: &str,
        key: Option<&str>,
        tempo: &TempoEstimate,
        chords: Vec<BarChords>,
        lyrics: Vec<LyricFragment>,
        bars: Vec<Bar>,
    ) -> Result<Chart, ChartError> {
        if chords.len() != bars.len() || lyrics.len() != bars.len() {
            return Err(ChartError::AlignmentMismatch {
                bars: bars.len(),
                chords: chords.len(),
                lyrics: lyrics.len(),
            });
        }

        let mut rows = Vec::with_capacity(bars.len());
        for ((bar, bar_chords), fragment) in bars.into_iter().zip(chords).zip(lyrics) {
            if bar_chords.bar_index != bar.index || fragment.bar_index != bar.index {
                return Err(ChartError::BarIndexMismatch {
                    bar: bar.index,
                    chord_bar: bar_chords.bar_index,
                    lyric_bar: fragment.bar_index,
                });
            }
            rows.push(self.build_row(bar, bar_chords, fragment));
        }

        let lyric_confidence = Confidence::mean(
            rows.iter()
                .filter(|row| row.lyric.is_some())
                .map(|row| row.lyric_confidence()),
        )
        .unwrap_or(Confidence::ZERO);
        let overall_confidence = overall_confidence(&rows);

        tracing::info!(
            title,
            bars = rows.len(),
            lyric_bars = rows.iter().filter(|row| row.lyric.is_some()).count(),
            overall = format!("{:.3}", overall_confidence.value()),
            "merge: chart assembled"
        );

        Ok(Chart {
            meta: ChartMeta {
                title: title.to_string(),
                key: key
                    .map(|key| key.split_whitespace().collect::<Vec<_>>().join(" "))
                    .filter(|key| !key.is_empty()),
                bpm: tempo.bpm,
                bpm_source: tempo.source,
                bpm_confidence: tempo.strength.as_confidence(),
                beats_per_bar: self.beats_per_bar,
                lyric_confidence,
                overall_confidence,
            },
            rows,
        })
    }

    fn build_row(&self, bar: Bar, bar_chords: BarChords, fragment: LyricFragment) -> ChartRow {
        let chord_confidence = bar_chords.confidence();
        let lyric = (!fragment.is_empty()).then_some(fragment);

        let blended = match &lyric {
            Some(fragment) => Confidence::weighted(&[
                (chord_confidence, self.chord_weight),
                (fragment.confidence, self.lyric_weight),
            ]),
            None => chord_confidence,
        };
        // partial bars are not full-confidence units
        let row_confidence = if bar.is_partial() {
            Confidence::new(blended.value() * bar.fill_ratio())
        } else {
            blended
        };

        ChartRow {
            bar,
            chords: bar_chords.slots,
            lyric,
            chord_confidence,
            row_confidence,
        }
    }
}

/// Mean row confidence over bars carrying lyrics; instrumental bars are left
/// out of the denominator. A song without any lyric falls back to its bars
/// with a chord, and a chart with neither scores zero.
fn overall_confidence(rows: &[ChartRow]) -> Confidence {
    Confidence::mean(
        rows.iter()
            .filter(|row| row.lyric.is_some())
            .map(|row| row.row_confidence),
    )
    .or_else(|| {
        Confidence::mean(
            rows.iter()
                .filter(|row| row.chords.iter().any(|slot| slot.label.is_chord()))
                .map(|row| row.row_confidence),
        )
    })
    .unwrap_or(Confidence::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confidence::TempoStrength;
    use crate::types::{ChordLabel, ChordSlot, StemRole, TempoSource};

    fn bars(count: usize) -> Vec<Bar> {
        (0..count)
            .map(|i| Bar {
                index: i,
                start_time: i as f64 * 2.0,
                end_time: (i + 1) as f64 * 2.0,
                nominal_duration: 2.0,
            })
            .collect()
    }

    fn chords_for(bars: &[Bar], confidence: f64) -> Vec<BarChords> {
        bars.iter()
            .map(|bar| BarChords {
                bar_index: bar.index,
                slots: vec![ChordSlot {
                    bar_index: bar.index,
                    subdivision: 0,
                    start_time: bar.start_time,
                    end_time: bar.end_time,
                    label: ChordLabel::Chord("C".to_string()),
                    confidence: Confidence::new(confidence),
                }],
            })
            .collect()
    }

    fn lyric(index: usize, text: &str, confidence: f64) -> LyricFragment {
        LyricFragment {
            bar_index: index,
            text: text.to_string(),
            confidence: Confidence::new(confidence),
        }
    }

    fn tempo() -> TempoEstimate {
        TempoEstimate {
            bpm: 120.0,
            strength: TempoStrength::new(0.8),
            source: TempoSource::Drum,
            measured_on: Some(StemRole::Drum),
            downbeat: None,
        }
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let grid = bars(3);
        let chords = chords_for(&grid, 0.5);
        let lyrics = vec![lyric(0, "a", 0.5), lyric(1, "b", 0.5)];
        let err = ChartMerger::new(&ChartConfig::default())
            .merge("song", None, &tempo(), chords, lyrics, grid)
            .unwrap_err();
        assert!(matches!(
            err,
            ChartError::AlignmentMismatch {
                bars: 3,
                chords: 3,
                lyrics: 2
            }
        ));
    }

    #[test]
    fn mismatched_bar_indices_are_rejected() {
        let grid = bars(2);
        let chords = chords_for(&grid, 0.5);
        let lyrics = vec![lyric(1, "a", 0.5), lyric(0, "b", 0.5)];
        let err = ChartMerger::new(&ChartConfig::default())
            .merge("song", None, &tempo(), chords, lyrics, grid)
            .unwrap_err();
        assert!(matches!(
            err,
            ChartError::BarIndexMismatch {
                bar: 0,
                chord_bar: 0,
                lyric_bar: 1
            }
        ));
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn instrumental_bars_do_not_dilute_overall_confidence() {
        let grid = bars(40);
        let chords = chords_for(&grid, 0.6);
        let lyrics: Vec<LyricFragment> = (0..40)
            .map(|i| {
                if i % 4 == 3 {
                    LyricFragment::empty(i)
                } else {
                    lyric(i, "la", 0.8)
                }
            })
            .collect();
        let chart = ChartMerger::new(&ChartConfig::default())
            .merge("song", None, &tempo(), chords, lyrics, grid)
            .unwrap();

        assert_eq!(chart.rows.len(), 40);
        assert_eq!(chart.rows.iter().filter(|r| r.lyric.is_none()).count(), 10);
        // 30 lyric bars at (0.6 + 0.8) / 2
        assert!((chart.meta.overall_confidence.value() - 0.7).abs() < 1e-12);
        assert!((chart.meta.lyric_confidence.value() - 0.8).abs() < 1e-12);
        // instrumental rows keep the chord confidence alone
        assert!((chart.rows[3].row_confidence.value() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn weights_shift_row_confidence() {
        let grid = bars(1);
        let chords = chords_for(&grid, 0.2);
        let lyrics = vec![lyric(0, "word", 1.0)];
        let mut config = ChartConfig::default();
        config.chord_weight = 1.0;
        config.lyric_weight = 3.0;
        let chart = ChartMerger::new(&config)
            .merge("song", None, &tempo(), chords, lyrics, grid)
            .unwrap();
        assert!((chart.rows[0].row_confidence.value() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn song_without_lyrics_uses_chord_bars() {
        let grid = bars(2);
        let chords = chords_for(&grid, 0.5);
        let lyrics = vec![LyricFragment::empty(0), LyricFragment::empty(1)];
        let chart = ChartMerger::new(&ChartConfig::default())
            .merge("song", None, &tempo(), chords, lyrics, grid)
            .unwrap();
        assert!((chart.meta.overall_confidence.value() - 0.5).abs() < 1e-12);
        assert_eq!(chart.meta.lyric_confidence, Confidence::ZERO);
    }

    #[test]
    fn partial_bar_row_is_scaled_by_fill() {
        let mut grid = bars(2);
        grid[1].end_time = 3.0;
        let chords = chords_for(&grid, 1.0);
        let lyrics = vec![lyric(0, "one", 1.0), lyric(1, "two", 1.0)];
        let chart = ChartMerger::new(&ChartConfig::default())
            .merge("song", None, &tempo(), chords, lyrics, grid)
            .unwrap();
        assert_eq!(chart.rows[0].row_confidence, Confidence::FULL);
        assert!((chart.rows[1].row_confidence.value() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn meta_carries_tempo_through() {
        let grid = bars(1);
        let chords = chords_for(&grid, 0.5);
        let chart = ChartMerger::new(&ChartConfig::default())
            .with_weights(2.0, 1.0)
            .merge("My Song", None, &tempo(), chords, vec![LyricFragment::empty(0)], grid)
            .unwrap();
        assert_eq!(chart.meta.title, "My Song");
        assert_eq!(chart.meta.bpm, 120.0);
        assert_eq!(chart.meta.bpm_source, TempoSource::Drum);
        assert!((chart.meta.bpm_confidence.value() - 0.8).abs() < 1e-12);
        assert_eq!(chart.meta.beats_per_bar, 4);
        assert_eq!(chart.meta.key, None);
    }

    #[test]
    fn reported_key_is_kept_on_one_line() {
        let merge_with_key = |key: &str| {
            let grid = bars(1);
            ChartMerger::new(&ChartConfig::default())
                .merge(
                    "song",
                    Some(key),
                    &tempo(),
                    chords_for(&grid, 0.5),
                    vec![LyricFragment::empty(0)],
                    grid,
                )
                .unwrap()
        };
        assert_eq!(merge_with_key(" F#\tm ").meta.key.as_deref(), Some("F# m"));
        assert_eq!(merge_with_key("  ").meta.key, None);
    }

    #[test]
    fn empty_chart_scores_zero() {
        let chart = ChartMerger::new(&ChartConfig::default())
            .merge("silence", None, &tempo(), Vec::new(), Vec::new(), Vec::new())
            .unwrap();
        assert!(chart.rows.is_empty());
        assert_eq!(chart.meta.overall_confidence, Confidence::ZERO);
    }
}
