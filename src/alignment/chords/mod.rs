use std::cmp::Ordering;

use crate::confidence::{Confidence, OverlapRatio};
use crate::types::{Bar, BarChords, ChordEvent, ChordLabel, ChordSlot};


/// Overlaps and mean confidences closer than this are ties.
const TIE_EPS: f64 = 1e-9;

/// Per-label accumulation over one slot.
#[derive(Debug, Clone)]
pub(crate) struct LabelTally {
    label: ChordLabel,
    overlap: f64,
    confidence_sum: f64,
    contributors: usize,
    first_start: f64,
}

impl LabelTally {
    fn mean_confidence(&self) -> Confidence {
        if self.contributors == 0 {
            return Confidence::ZERO;
        }
        Confidence::new(self.confidence_sum / self.contributors as f64)
    }
}

/// Quantizes chord events onto the bar grid, `subdivisions` equal slots per
/// bar (at least one). Each slot takes its time-weighted dominant label.
/// Events with an empty or non-finite interval are dropped.
pub fn align_chords<I>(events: I, bars: &[Bar], subdivisions: u32) -> Vec<BarChords>
where
    I: IntoIterator<Item = ChordEvent>,
{
    let mut events: Vec<ChordEvent> = events
        .into_iter()
        .filter(|event| {
            let valid = event.start_time.is_finite()
                && event.end_time.is_finite()
                && event.end_time > event.start_time;
            if !valid {
                tracing::debug!(
                    label = event.label.as_str(),
                    start = event.start_time,
                    end = event.end_time,
                    "chords: dropping event with empty interval"
                );
            }
            valid
        })
        .collect();
    events.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    let subdivisions = subdivisions.max(1) as usize;
    let mut first = 0usize;
    bars.iter()
        .map(|bar| {
            // Events are sorted by start; the skipped prefix has all ended.
            while first < events.len() && events[first].end_time <= bar.start_time {
                first += 1;
            }
            let window = &events[first..];
            let slot_len = bar.duration() / subdivisions as f64;
            let slots = (0..subdivisions)
                .map(|subdivision| {
                    let start_time = bar.start_time + subdivision as f64 * slot_len;
                    let end_time = if subdivision + 1 == subdivisions {
                        bar.end_time
                    } else {
                        bar.start_time + (subdivision + 1) as f64 * slot_len
                    };
                    let (label, confidence) = dominant_label(window, start_time, end_time);
                    ChordSlot {
                        bar_index: bar.index,
                        subdivision,
                        start_time,
                        end_time,
                        label,
                        confidence,
                    }
                })
                .collect();
            BarChords {
                bar_index: bar.index,
                slots,
            }
        })
        .collect()
}

/// Label with the largest accumulated overlap of `[start, end)`; ties go to
/// the higher mean reported confidence, then to the earlier-starting label.
/// Confidence is `overlap / span * mean reported confidence`.
pub(crate) fn dominant_label(events: &[ChordEvent], start: f64, end: f64) -> (ChordLabel, Confidence) {
    let tallies = tally_labels(events, start, end);
    let Some(winner) = select_winner(&tallies) else {
        return (ChordLabel::NoChord, Confidence::ZERO);
    };

    let confidence = Confidence::from_coverage(
        OverlapRatio::new(winner.overlap, end - start),
        winner.mean_confidence(),
    );
    if tallies.len() > 1 {
        tracing::debug!(
            label = winner.label.as_str(),
            overlap = format!("{:.3}", winner.overlap),
            candidates = tallies.len(),
            confidence = format!("{:.3}", confidence.value()),
            "chords: selected dominant label"
        );
    }
    (winner.label.clone(), confidence)
}

pub(crate) fn tally_labels(events: &[ChordEvent], start: f64, end: f64) -> Vec<LabelTally> {
    let mut tallies: Vec<LabelTally> = Vec::new();
    for event in events {
        if event.start_time >= end {
            break;
        }
        let covered = crate::types::overlap(start, end, event.start_time, event.end_time);
        if covered <= 0.0 {
            continue;
        }
        let label = ChordLabel::parse(&event.label);
        match tallies.iter_mut().find(|t| t.label == label) {
            Some(tally) => {
                tally.overlap += covered;
                tally.confidence_sum += event.confidence.value();
                tally.contributors += 1;
                tally.first_start = tally.first_start.min(event.start_time);
            }
            None => tallies.push(LabelTally {
                label,
                overlap: covered,
                confidence_sum: event.confidence.value(),
                contributors: 1,
                first_start: event.start_time,
            }),
        }
    }
    tallies
}

fn select_winner(tallies: &[LabelTally]) -> Option<&LabelTally> {
    tallies.iter().reduce(|best, candidate| {
        if compare_tallies(candidate, best) == Ordering::Greater {
            candidate
        } else {
            best
        }
    })
}

/// `Greater` means `a` beats `b`.
fn compare_tallies(a: &LabelTally, b: &LabelTally) -> Ordering {
    let by_overlap = approx_cmp(a.overlap, b.overlap);
    if by_overlap != Ordering::Equal {
        return by_overlap;
    }
    let by_confidence = approx_cmp(a.mean_confidence().value(), b.mean_confidence().value());
    if by_confidence != Ordering::Equal {
        return by_confidence;
    }
    // earlier start wins
    b.first_start.total_cmp(&a.first_start)
}

fn approx_cmp(a: f64, b: f64) -> Ordering {
    if (a - b).abs() <= TIE_EPS {
        Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}
