use crate::error::ChartError;
use crate::types::Bar;

/// Boundaries closer than this to the track end snap to it, so float error
/// never leaves a sliver bar or an uncovered tail.
const EDGE_EPS_SECS: f64 = 1e-6;
const MAX_BARS: usize = 100_000;

#[derive(Debug, Clone, Copy)]
pub struct BarGridBuilder {
    beats_per_bar: u32,
}

impl BarGridBuilder {
    pub fn new(beats_per_bar: u32) -> Self {
        Self { beats_per_bar }
    }

    pub fn bar_duration(&self, bpm: f64) -> f64 {
        60.0 / bpm * self.beats_per_bar as f64
    }

    /// Fixed-length bars from `origin` until `track_duration` is covered.
    ///
    /// `origin` is taken modulo the bar length. A positive origin produces a
    /// leading pickup bar `[0, origin)`; the last bar may also be partial.
    /// Bar `k` after the origin starts at `origin + k * bar_len`, computed
    /// directly rather than accumulated, so neighbours share exact
    /// boundaries.
    pub fn build(&self, bpm: f64, track_duration: f64, origin: f64) -> Result<Vec<Bar>, ChartError> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(ChartError::InvalidTempo { bpm });
        }
        if self.beats_per_bar == 0 {
            return Err(ChartError::invalid_input("beats_per_bar must be >= 1"));
        }
        if !track_duration.is_finite() || track_duration < 0.0 {
            return Err(ChartError::invalid_input(format!(
                "track duration must be finite and >= 0, got {track_duration}"
            )));
        }
        if !origin.is_finite() {
            return Err(ChartError::invalid_input(format!(
                "bar origin must be finite, got {origin}"
            )));
        }

        let bar_len = self.bar_duration(bpm);
        if track_duration / bar_len > MAX_BARS as f64 {
            return Err(ChartError::invalid_input(format!(
                "{track_duration:.1}s at {bpm:.1} bpm exceeds {MAX_BARS} bars"
            )));
        }

        let mut origin = origin.rem_euclid(bar_len);
        if bar_len - origin < EDGE_EPS_SECS {
            origin = 0.0;
        }

        let mut bars = Vec::new();
        if track_duration <= EDGE_EPS_SECS {
            return Ok(bars);
        }

        if origin > EDGE_EPS_SECS {
            bars.push(Bar {
                index: 0,
                start_time: 0.0,
                end_time: origin.min(track_duration),
                nominal_duration: bar_len,
            });
        }

        let mut k = 0usize;
        loop {
            let start_time = origin + k as f64 * bar_len;
            if start_time >= track_duration - EDGE_EPS_SECS {
                break;
            }
            let next = origin + (k + 1) as f64 * bar_len;
            let end_time = if next >= track_duration - EDGE_EPS_SECS {
                track_duration
            } else {
                next
            };
            bars.push(Bar {
                index: bars.len(),
                start_time,
                end_time,
                nominal_duration: bar_len,
            });
            k += 1;
        }

        tracing::debug!(
            bpm = format!("{bpm:.2}"),
            bar_len = format!("{bar_len:.3}"),
            origin = format!("{origin:.3}"),
            bars = bars.len(),
            "bar grid built"
        );
        Ok(bars)
    }
}
