use chgdet_timing::nearest_index;

use crate::error::ExtractError;

/// Samples of one channel trace around one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub event_time: f64,
    /// index of the first sample in the source trace
    pub first_index: usize,
    pub trace: Vec<f64>,
    /// absolute timestamps of `trace`
    pub timestamps: Vec<f64>,
}

impl Extracted {
    pub fn relative_timestamps(&self) -> Vec<f64> {
        self.timestamps.iter().map(|t| t - self.event_time).collect()
    }

    pub fn len(&self) -> usize {
        self.trace.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trace.is_empty()
    }
}

/// Slices `trace` from `round(start * frame_rate)` to `round(end * frame_rate)` samples around
/// the sample nearest `event_time`, both ends included.
///
/// A window that does not fit inside the trace is an error; nothing is padded or truncated.
pub fn extract(
    trace: &[f64],
    timestamps: &[f64],
    event_time: f64,
    window: (f64, f64),
    frame_rate: f64,
) -> Result<Extracted, ExtractError> {
    if !event_time.is_finite() {
        return Err(ExtractError::NonFiniteEvent { event_time });
    }
    if !(frame_rate.is_finite() && frame_rate > 0.0) {
        return Err(ExtractError::InvalidFrameRate { frame_rate });
    }
    let len = trace.len().min(timestamps.len());
    let out_of_range = |start: i64, end: i64| ExtractError::OutOfRangeWindow {
        event_time,
        start,
        end,
        len,
    };
    let center = nearest_index(&timestamps[..len], event_time).ok_or(out_of_range(0, 0))? as i64;
    let start = center + (window.0 * frame_rate).round() as i64;
    let end = center + (window.1 * frame_rate).round() as i64;
    if start < 0 || end < start || end >= len as i64 {
        return Err(out_of_range(start, end));
    }
    let (lo, hi) = (start as usize, end as usize);
    Ok(Extracted {
        event_time,
        first_index: lo,
        trace: trace[lo..=hi].to_vec(),
        timestamps: timestamps[lo..=hi].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ramp(n: usize, rate: f64) -> (Vec<f64>, Vec<f64>) {
        let t: Vec<f64> = (0..n).map(|i| i as f64 / rate).collect();
        let v: Vec<f64> = (0..n).map(|i| i as f64).collect();
        (t, v)
    }

    #[test]
    fn slices_inclusive_bounds() {
        let (t, v) = ramp(100, 10.0);
        let e = extract(&v, &t, 5.0, (-0.5, 0.5), 10.0).unwrap();
        assert_eq!(e.trace, (45..=55).map(|i| i as f64).collect::<Vec<_>>());
        assert_eq!(e.first_index, 45);
        let rel = e.relative_timestamps();
        assert!((rel[0] + 0.5).abs() < 1e-9 && (rel[10] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn window_past_the_end_is_rejected() {
        let (t, v) = ramp(100, 10.0);
        let err = extract(&v, &t, 9.8, (-0.5, 0.5), 10.0).unwrap_err();
        assert!(matches!(err, ExtractError::OutOfRangeWindow { start: 93, end: 103, len: 100, .. }));
        assert!(extract(&v, &t, 0.2, (-0.5, 0.5), 10.0).is_err());
    }

    #[test]
    fn bad_inputs() {
        let (t, v) = ramp(10, 10.0);
        assert!(matches!(
            extract(&v, &t, f64::NAN, (-0.1, 0.1), 10.0),
            Err(ExtractError::NonFiniteEvent { .. })
        ));
        assert!(matches!(
            extract(&v, &t, 0.5, (-0.1, 0.1), 0.0),
            Err(ExtractError::InvalidFrameRate { .. })
        ));
        assert!(extract(&[], &[], 0.5, (-0.1, 0.1), 10.0).is_err());
    }

    #[test]
    fn repeated_calls_are_identical() {
        let (t, v) = ramp(100, 30.0);
        let a = extract(&v, &t, 1.234, (-0.5, 0.5), 30.0).unwrap();
        let b = extract(&v, &t, 1.234, (-0.5, 0.5), 30.0).unwrap();
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn extracted_length_follows_window(
            event in 0.0f64..20.0,
            before in 0.0f64..3.0,
            after in 0.0f64..3.0,
        ) {
            let (t, v) = ramp(600, 30.0);
            let expected = (after * 30.0).round() as i64 - (-before * 30.0).round() as i64 + 1;
            match extract(&v, &t, event, (-before, after), 30.0) {
                Ok(e) => {
                    prop_assert_eq!(e.len() as i64, expected);
                    prop_assert_eq!(&e.trace[..], &v[e.first_index..e.first_index + e.len()]);
                }
                Err(err) => prop_assert!(
                    matches!(err, ExtractError::OutOfRangeWindow { .. }),
                    "unexpected error"
                ),
            }
        }
    }
}
