use crate::confidence::{Confidence, LogProb};
use crate::types::{Bar, LyricFragment, LyricToken};

/// Groups transcription tokens into one fragment per bar.
///
/// A token belongs to the bar holding its midpoint; midpoints before the
/// first bar or past the last one go to the nearest edge bar, so no token is
/// lost. Fragment text is the token text joined by single spaces in time
/// order and put through [`normalize_lyric`], so it is exactly what a chart
/// line shows. Its confidence is the geometric mean of the token
/// probabilities. Bars without tokens get an empty fragment.
pub fn align_lyrics<I>(tokens: I, bars: &[Bar]) -> Vec<LyricFragment>
where
    I: IntoIterator<Item = LyricToken>,
{
    if bars.is_empty() {
        return Vec::new();
    }
    let mut buckets: Vec<Vec<LyricToken>> = vec![Vec::new(); bars.len()];

    let mut dropped = 0usize;
    for token in tokens {
        let midpoint = token.midpoint();
        if token.text.trim().is_empty() || !midpoint.is_finite() {
            dropped += 1;
            continue;
        }
        buckets[bar_for_time(bars, midpoint)].push(token);
    }
    if dropped > 0 {
        tracing::debug!(dropped, "lyrics: skipped blank or untimed tokens");
    }

    bars.iter()
        .zip(buckets)
        .map(|(bar, mut tokens)| {
            if tokens.is_empty() {
                return LyricFragment::empty(bar.index);
            }
            tokens.sort_by(|a, b| a.midpoint().total_cmp(&b.midpoint()));
            let text = normalize_lyric(
                &tokens
                    .iter()
                    .map(|token| token.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
            );
            let log_probs: Vec<LogProb> = tokens.iter().map(|token| token.log_prob).collect();
            let confidence = Confidence::geometric_mean(&log_probs);
            tracing::debug!(
                bar = bar.index,
                tokens = tokens.len(),
                confidence = format!("{:.3}", confidence.value()),
                "lyrics: fragment"
            );
            LyricFragment {
                bar_index: bar.index,
                text,
                confidence,
            }
        })
        .collect()
}

/// Collapses whitespace runs (tabs and newlines included) to single spaces
/// and turns `|` into `/`, which chart lines reserve for bar separators.
pub fn normalize_lyric(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "/")
}

/// Index of the bar containing `time`, clamped to the grid. `bars` must be
/// contiguous and non-empty.
fn bar_for_time(bars: &[Bar], time: f64) -> usize {
    let after = bars.partition_point(|bar| bar.start_time <= time);
    after.saturating_sub(1).min(bars.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(count: usize, len: f64) -> Vec<Bar> {
        (0..count)
            .map(|i| Bar {
                index: i,
                start_time: i as f64 * len,
                end_time: (i + 1) as f64 * len,
                nominal_duration: len,
            })
            .collect()
    }

    fn token(text: &str, start: f64, end: f64, probability: f64) -> LyricToken {
        LyricToken {
            start_time: start,
            end_time: end,
            text: text.to_string(),
            log_prob: LogProb::from_probability(probability),
        }
    }

    #[test]
    fn two_tokens_in_one_bar() {
        let bars = grid(1, 4.0);
        let fragments = align_lyrics(
            vec![token("hello", 0.5, 1.0, 0.8), token("world", 1.5, 2.0, 0.5)],
            &bars,
        );
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "hello world");
        assert!((fragments[0].confidence.value() - 0.632).abs() < 1e-3);
    }

    #[test]
    fn token_goes_to_bar_of_its_midpoint() {
        let bars = grid(2, 2.0);
        // starts in bar 0, midpoint 2.25 lands in bar 1
        let fragments = align_lyrics(vec![token("across", 1.5, 3.0, 0.9)], &bars);
        assert!(fragments[0].is_empty());
        assert_eq!(fragments[1].text, "across");
    }

    #[test]
    fn boundary_midpoint_belongs_to_later_bar() {
        let bars = grid(2, 2.0);
        let fragments = align_lyrics(vec![token("edge", 1.5, 2.5, 0.9)], &bars);
        assert!(fragments[0].is_empty());
        assert_eq!(fragments[1].text, "edge");
    }

    #[test]
    fn bars_without_tokens_are_empty_with_zero_confidence() {
        let bars = grid(3, 2.0);
        let fragments = align_lyrics(vec![token("la", 0.2, 0.4, 0.9)], &bars);
        assert_eq!(fragments.len(), 3);
        assert!(fragments[1].is_empty());
        assert_eq!(fragments[2].confidence, Confidence::ZERO);
        assert_eq!(fragments[2].bar_index, 2);
    }

    #[test]
    fn out_of_grid_tokens_are_clamped() {
        let bars = grid(2, 2.0);
        let fragments = align_lyrics(
            vec![token("early", -1.0, -0.5, 0.9), token("late", 9.0, 10.0, 0.9)],
            &bars,
        );
        assert_eq!(fragments[0].text, "early");
        assert_eq!(fragments[1].text, "late");
    }

    #[test]
    fn text_is_trimmed_and_ordered_by_time() {
        let bars = grid(1, 4.0);
        let fragments = align_lyrics(
            vec![
                token(" second ", 2.0, 2.5, 0.9),
                token("   ", 1.0, 1.5, 0.9),
                token("first", 0.0, 0.5, 0.9),
            ],
            &bars,
        );
        assert_eq!(fragments[0].text, "first second");
        assert!((fragments[0].confidence.value() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn fragment_text_is_normalized_for_chart_lines() {
        let bars = grid(1, 4.0);
        let fragments = align_lyrics(
            vec![
                token("oh  yeah", 0.0, 0.5, 0.9),
                token("this | that", 1.0, 1.5, 0.9),
                token("...", 2.0, 2.5, 0.9),
            ],
            &bars,
        );
        assert_eq!(fragments[0].text, "oh yeah this / that ...");
        assert_eq!(normalize_lyric(&fragments[0].text), fragments[0].text);
    }

    #[test]
    fn zero_probability_token_zeroes_fragment() {
        let bars = grid(1, 4.0);
        let fragments = align_lyrics(
            vec![token("sure", 0.0, 1.0, 1.0), token("mumble", 1.0, 2.0, 0.0)],
            &bars,
        );
        assert_eq!(fragments[0].confidence, Confidence::ZERO);
    }

    #[test]
    fn no_bars_means_no_fragments() {
        assert!(align_lyrics(vec![token("x", 0.0, 1.0, 0.5)], &[]).is_empty());
    }
}
