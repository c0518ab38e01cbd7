//! Least-squares cubic B-spline on uniformly spaced breakpoints.
//!
//! With `k` breakpoints spanning the data there are `k - 1` intervals and `k + 2` basis
//! functions. Each sample touches four consecutive basis functions, so the normal equations are
//! banded with three sub-diagonals and are solved by a banded Cholesky factorization.

use crate::error::EncoderError;

const BAND: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct BSpline {
    start: f64,
    step: f64,
    intervals: usize,
    coefficients: Vec<f64>,
}

/// Segment index and the four basis values of the uniform cubic B-spline at `u` (in knot units).
fn basis(u: f64, intervals: usize) -> (usize, [f64; 4]) {
    let seg = (u.floor().max(0.0) as usize).min(intervals - 1);
    let s = (u - seg as f64).clamp(0.0, 1.0);
    let s2 = s * s;
    let s3 = s2 * s;
    let b = [
        (1.0 - s).powi(3) / 6.0,
        (3.0 * s3 - 6.0 * s2 + 4.0) / 6.0,
        (-3.0 * s3 + 3.0 * s2 + 3.0 * s + 1.0) / 6.0,
        s3 / 6.0,
    ];
    (seg, b)
}

/// Lower band storage: `band[i][d]` is entry `(i, i - d)`.
struct BandedSpd {
    band: Vec<[f64; BAND + 1]>,
}

impl BandedSpd {
    fn zeros(n: usize) -> Self {
        Self {
            band: vec![[0.0; BAND + 1]; n],
        }
    }

    fn add(&mut self, i: usize, j: usize, v: f64) {
        debug_assert!(i >= j && i - j <= BAND);
        self.band[i][i - j] += v;
    }

    fn get(&self, i: usize, j: usize) -> f64 {
        self.band[i][i - j]
    }

    /// In-place Cholesky; afterwards `band` holds L.
    fn factor(&mut self) -> Result<(), EncoderError> {
        let n = self.band.len();
        for i in 0..n {
            let first = i.saturating_sub(BAND);
            for j in first..=i {
                let mut sum = self.get(i, j);
                for k in first.max(j.saturating_sub(BAND))..j {
                    sum -= self.get(i, k) * self.get(j, k);
                }
                if i == j {
                    if !(sum > 0.0) {
                        return Err(EncoderError::SingularSystem { row: i });
                    }
                    self.band[i][0] = sum.sqrt();
                } else {
                    self.band[i][i - j] = sum / self.get(j, j);
                }
            }
        }
        Ok(())
    }

    fn solve(&self, rhs: &mut [f64]) {
        let n = rhs.len();
        for i in 0..n {
            let mut sum = rhs[i];
            for k in i.saturating_sub(BAND)..i {
                sum -= self.get(i, k) * rhs[k];
            }
            rhs[i] = sum / self.get(i, i);
        }
        for i in (0..n).rev() {
            let mut sum = rhs[i];
            for k in i + 1..(i + BAND + 1).min(n) {
                sum -= self.get(k, i) * rhs[k];
            }
            rhs[i] = sum / self.get(i, i);
        }
    }
}

impl BSpline {
    /// Fits `y(t)` with `breakpoints` uniformly spaced breakpoints (at least two). Non-finite
    /// samples are skipped. `ridge` is added to the diagonal, scaled by its largest entry.
    pub fn fit(t: &[f64], y: &[f64], breakpoints: usize, ridge: f64) -> Result<Self, EncoderError> {
        if t.len() != y.len() {
            return Err(EncoderError::LengthMismatch {
                what: "spline samples",
                expected: t.len(),
                got: y.len(),
            });
        }
        let points: Vec<(f64, f64)> = t
            .iter()
            .zip(y)
            .filter(|(a, b)| a.is_finite() && b.is_finite())
            .map(|(a, b)| (*a, *b))
            .collect();
        if points.len() < 4 {
            return Err(EncoderError::TooFewSamples {
                got: points.len(),
                need: 4,
            });
        }
        let start = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let end = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        let intervals = breakpoints.max(2) - 1;
        let step = (end - start) / intervals as f64;
        if !(step > 0.0) {
            return Err(EncoderError::InvalidParameter {
                name: "spline time span",
                value: end - start,
            });
        }

        let n_basis = intervals + 3;
        let mut normal = BandedSpd::zeros(n_basis);
        let mut rhs = vec![0.0; n_basis];
        for &(x, v) in &points {
            let (seg, b) = basis((x - start) / step, intervals);
            for a in 0..4 {
                rhs[seg + a] += b[a] * v;
                for c in 0..=a {
                    normal.add(seg + a, seg + c, b[a] * b[c]);
                }
            }
        }
        let scale = normal.band.iter().map(|row| row[0]).fold(0.0, f64::max);
        for i in 0..n_basis {
            normal.add(i, i, ridge * scale.max(f64::MIN_POSITIVE));
        }
        normal.factor()?;
        normal.solve(&mut rhs);

        Ok(Self {
            start,
            step,
            intervals,
            coefficients: rhs,
        })
    }

    pub fn n_basis(&self) -> usize {
        self.coefficients.len()
    }

    pub fn eval(&self, x: f64) -> f64 {
        if !x.is_finite() {
            return f64::NAN;
        }
        let (seg, b) = basis((x - self.start) / self.step, self.intervals);
        (0..4).map(|a| b[a] * self.coefficients[seg + a]).sum()
    }

    pub fn eval_many(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.eval(x)).collect()
    }
}
