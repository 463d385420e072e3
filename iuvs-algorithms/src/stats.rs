//! Small numeric helpers shared by the kernels.

/// First differences of a sequence.
pub fn diff(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Median of a sequence, or `None` if it is empty.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Arithmetic mean; NaN for an empty slice.
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Piecewise linear interpolation of `x` over increasing sample points.
///
/// Below the first sample point `left` is returned (the first sample
/// value when `None`); above the last, the last sample value.
/// Returns NaN when there are no samples.
pub fn interp(x: f64, xp: &[f64], fp: &[f64], left: Option<f64>) -> f64 {
    let n = xp.len().min(fp.len());
    if n == 0 {
        return f64::NAN;
    }
    if x < xp[0] {
        return left.unwrap_or(fp[0]);
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }
    // First sample point strictly greater than x.
    let upper = xp[..n].partition_point(|&p| p <= x);
    let lower = upper - 1;
    let span = xp[upper] - xp[lower];
    if span == 0.0 {
        return fp[lower];
    }
    fp[lower] + (x - xp[lower]) * (fp[upper] - fp[lower]) / span
}

/// Relative/absolute closeness test with the tolerances of `numpy.isclose`.
pub fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_relative_eq!(median(&[3.0, 1.0, 2.0]).unwrap(), 2.0);
        assert_relative_eq!(median(&[4.0, 1.0, 2.0, 3.0]).unwrap(), 2.5);
    }

    #[test]
    fn test_interp() {
        let xp = [1.0, 2.0, 4.0];
        let fp = [10.0, 20.0, 40.0];
        assert_relative_eq!(interp(0.0, &xp, &fp, Some(0.0)), 0.0);
        assert_relative_eq!(interp(0.0, &xp, &fp, None), 10.0);
        assert_relative_eq!(interp(1.5, &xp, &fp, None), 15.0);
        assert_relative_eq!(interp(2.0, &xp, &fp, None), 20.0);
        assert_relative_eq!(interp(3.0, &xp, &fp, None), 30.0);
        assert_relative_eq!(interp(9.0, &xp, &fp, None), 40.0);
        assert!(interp(1.0, &[], &[], None).is_nan());
    }

    #[test]
    fn test_is_close() {
        assert!(is_close(497.638_03, 497.638_03));
        assert!(is_close(497.638, 497.638_03));
        assert!(!is_close(497.0, 497.638_03));
    }

    #[test]
    fn test_diff_and_mean() {
        assert_eq!(diff(&[1.0, 4.0, 9.0]), vec![3.0, 5.0]);
        assert!(diff(&[1.0]).is_empty());
        assert_relative_eq!(mean(&[1.0, 2.0, 6.0]), 3.0);
        assert!(mean(&[]).is_nan());
    }
}
