use crate::error::EncoderError;

/// Derivative of `x` with respect to `t`: mean of the backward and forward difference quotients.
/// The first and last samples, and any sample next to a gap, are NaN.
pub fn deriv(x: &[f64], t: &[f64]) -> Result<Vec<f64>, EncoderError> {
    if x.len() != t.len() {
        return Err(EncoderError::LengthMismatch {
            what: "derivative samples",
            expected: t.len(),
            got: x.len(),
        });
    }
    let n = x.len();
    let quotient = |a: usize, b: usize| (x[b] - x[a]) / (t[b] - t[a]);
    Ok((0..n)
        .map(|i| {
            if i == 0 || i + 1 == n {
                return f64::NAN;
            }
            let mean = (quotient(i - 1, i) + quotient(i, i + 1)) / 2.0;
            if mean.is_finite() { mean } else { f64::NAN }
        })
        .collect())
}
