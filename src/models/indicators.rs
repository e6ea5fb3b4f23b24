//! Descriptive statistics used by the analysis layer
//!
//! Windowed results are aligned with their input: position `i` of the output
//! describes position `i` of the input, and `None` marks positions where the
//! value is undefined (window not yet full, no previous value, zero base).

/// Simple moving average over a trailing window
///
/// # Arguments
/// * `values` - Input series, oldest first
/// * `window` - Number of trailing values averaged (e.g. 5, 20)
///
/// # Returns
/// * One entry per input; the first `window - 1` entries are `None`
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }

    let mut sum: f64 = values[..window].iter().sum();
    out[window - 1] = Some(sum / window as f64);
    for i in window..values.len() {
        sum += values[i] - values[i - window];
        out[i] = Some(sum / window as f64);
    }
    out
}

/// Fractional change from the previous value: `(v[i] - v[i-1]) / v[i-1]`
///
/// The first entry, and any entry whose previous value is zero, is `None`.
pub fn pct_change(values: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    out.push(None);
    for pair in values.windows(2) {
        let (prev, curr) = (pair[0], pair[1]);
        out.push(if prev == 0.0 { None } else { Some((curr - prev) / prev) });
    }
    out.truncate(values.len());
    out
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (n - 1 denominator), `None` below two values
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Pearson correlation of two equally long series
///
/// `None` when lengths differ, fewer than two points, or either side is constant.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx).powi(2);
        vy += (y - my).powi(2);
    }
    if vx == 0.0 || vy == 0.0 {
        return None;
    }
    Some(cov / (vx.sqrt() * vy.sqrt()))
}

/// Percentage distance of close from a moving average: `((close - ma) / ma) * 100`
pub fn calculate_ma_score(close: f64, ma: f64) -> f64 {
    if ma == 0.0 {
        0.0
    } else {
        ((close - ma) / ma) * 100.0
    }
}

/// Defined values of an aligned series
pub fn defined(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().filter_map(|v| *v).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_mean() {
        let closes = vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0];
        let ma3 = rolling_mean(&closes, 3);

        assert_eq!(ma3[0], None); // Not enough data
        assert_eq!(ma3[1], None); // Not enough data
        assert_eq!(ma3[2], Some(11.0)); // (10+11+12)/3
        assert_eq!(ma3[3], Some(12.0)); // (11+12+13)/3
        assert_eq!(ma3[4], Some(13.0)); // (12+13+14)/3
        assert_eq!(ma3[5], Some(14.0)); // (13+14+15)/3
    }

    #[test]
    fn test_rolling_mean_matches_naive_reference() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + ((i * 37) % 11) as f64 * 1.7).collect();
        let fast = rolling_mean(&closes, 7);
        for i in 6..closes.len() {
            let naive = closes[i - 6..=i].iter().sum::<f64>() / 7.0;
            assert!((fast[i].unwrap() - naive).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rolling_mean_short_input() {
        assert!(rolling_mean(&[1.0, 2.0], 3).iter().all(|v| v.is_none()));
        assert!(rolling_mean(&[1.0, 2.0], 0).iter().all(|v| v.is_none()));
    }

    #[test]
    fn test_pct_change() {
        let changes = pct_change(&[100.0, 110.0, 0.0, 5.0]);
        assert_eq!(changes.len(), 4);
        assert_eq!(changes[0], None);
        assert!((changes[1].unwrap() - 0.1).abs() < 1e-12);
        assert!((changes[2].unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(changes[3], None); // zero base
        assert!(pct_change(&[]).is_empty());
    }

    #[test]
    fn test_sample_std() {
        // 2, 4, 4, 4, 5, 5, 7, 9: mean 5, sum of squares 32, sample var 32/7
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((sample_std(&values).unwrap() - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(sample_std(&[1.0]), None);
    }

    #[test]
    fn test_pearson() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson(&xs, &[2.0, 4.0, 6.0, 8.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&xs, &[8.0, 6.0, 4.0, 2.0]).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&xs, &[1.0, 1.0, 1.0, 1.0]), None);
        assert_eq!(pearson(&xs, &[1.0]), None);
    }

    #[test]
    fn test_calculate_ma_score() {
        let score = calculate_ma_score(110.0, 100.0);
        assert!((score - 10.0).abs() < 0.01);

        let score = calculate_ma_score(90.0, 100.0);
        assert!((score - (-10.0)).abs() < 0.01);
    }
}
