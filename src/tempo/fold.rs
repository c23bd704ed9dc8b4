/// Halve while above `max`, then double while below `min`. Non-finite or
/// non-positive input is returned unchanged so the bar grid can reject it.
pub fn fold_bpm(bpm: f64, min: f64, max: f64) -> f64 {
    if !bpm.is_finite() || bpm <= 0.0 || min <= 0.0 || max < min {
        return bpm;
    }
    let mut folded = bpm;
    while folded > max {
        folded /= 2.0;
    }
    while folded < min {
        folded *= 2.0;
    }
    folded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_halves_fast_tempo() {
        assert_eq!(fold_bpm(240.0, 60.0, 160.0), 120.0);
        assert_eq!(fold_bpm(400.0, 60.0, 160.0), 100.0);
    }

    #[test]
    fn fold_doubles_slow_tempo() {
        assert_eq!(fold_bpm(45.0, 60.0, 160.0), 90.0);
        assert_eq!(fold_bpm(20.0, 60.0, 160.0), 80.0);
    }

    #[test]
    fn fold_keeps_in_range_and_invalid_values() {
        assert_eq!(fold_bpm(128.0, 60.0, 160.0), 128.0);
        assert_eq!(fold_bpm(160.0, 60.0, 160.0), 160.0);
        assert_eq!(fold_bpm(0.0, 60.0, 160.0), 0.0);
        assert!(fold_bpm(f64::NAN, 60.0, 160.0).is_nan());
    }
}
