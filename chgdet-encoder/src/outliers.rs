/// Clamps the value at each wrap into the range spanned by non-wrap neighbours within
/// `window_s` seconds. Points without usable neighbours are left alone.
pub fn suppress_wrap_outliers(values: &[f64], time: &[f64], ids: &[i8], window_s: f64) -> Vec<f64> {
    let mut out = values.to_vec();
    for i in (0..values.len()).filter(|&i| ids[i] != 0) {
        let v = values[i];
        if !v.is_finite() {
            continue;
        }
        let lo = time.partition_point(|&t| t < time[i] - window_s);
        let hi = time.partition_point(|&t| t <= time[i] + window_s);
        let (min, max) = (lo..hi)
            .filter(|&j| j != i && ids[j] == 0 && values[j].is_finite())
            .map(|j| values[j])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(mn, mx), x| {
                (mn.min(x), mx.max(x))
            });
        if min <= max {
            out[i] = v.clamp(min, max);
        }
    }
    out
}

/// Sets values whose z-score reaches `threshold` to NaN. Missing values take the mean when
/// computing the standard deviation.
pub fn zscore_filter(values: &[f64], threshold: f64) -> Vec<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return values.to_vec();
    }
    let mean = finite.iter().sum::<f64>() / finite.len() as f64;
    // filled NaNs sit on the mean and add nothing to the sum of squares
    let var = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let std = var.sqrt();
    if !(std > 0.0) {
        return values.to_vec();
    }
    values
        .iter()
        .map(|&v| {
            if ((v - mean) / std).abs() >= threshold {
                f64::NAN
            } else {
                v
            }
        })
        .collect()
}
