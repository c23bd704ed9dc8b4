use crate::confidence::TempoStrength;
use crate::types::TempoMeasurement;

/// Inter-beat intervals within this relative distance of the median count
/// as agreeing votes.
const AGREEMENT_TOLERANCE: f64 = 0.10;

/// Tempo from tracked beat times: 60 / median inter-beat interval, with the
/// share of agreeing intervals as strength and the first beat as downbeat.
/// Needs at least two increasing beat times.
pub fn measure_from_beats(beat_times: &[f64]) -> Option<TempoMeasurement> {
    let intervals: Vec<f64> = beat_times
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .filter(|ibi| ibi.is_finite() && *ibi > 0.0)
        .collect();
    if intervals.is_empty() {
        return None;
    }

    let median = median(&intervals)?;
    if median <= 0.0 {
        return None;
    }
    let agreeing = intervals
        .iter()
        .filter(|ibi| ((*ibi - median) / median).abs() <= AGREEMENT_TOLERANCE)
        .count();

    Some(TempoMeasurement {
        bpm: 60.0 / median,
        strength: TempoStrength::new(agreeing as f64 / intervals.len() as f64),
        downbeat: beat_times.first().copied().filter(|t| t.is_finite()),
    })
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) * 0.5
    } else {
        sorted[mid]
    })
}
