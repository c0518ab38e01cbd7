//! Per-flash annotation: identity changes, omissions, licks and rewards, and running rates.

use chgdet_cache::ImageNames;
use chgdet_core::{
    ClassifiedTrial, FlashRecord, IdentityKind, SessionError, StimulusFlash, StimulusIdentity,
    TaskParameters, TrialType,
};
use chgdet_timing::FrameClock;
use tracing::{debug, warn};

use crate::config::FlashConfig;

pub struct FlashInput<'a> {
    pub records: &'a [FlashRecord],
    /// explicit omission log, if the session recorded one
    pub omitted_frames: Option<&'a [usize]>,
    pub params: &'a TaskParameters,
    /// sorted
    pub lick_times: &'a [f64],
    /// sorted
    pub reward_times: &'a [f64],
    pub trials: &'a [ClassifiedTrial],
}

struct Presentation {
    frame: usize,
    time: f64,
    duration: f64,
    identity: Option<StimulusIdentity>,
    image_category: Option<String>,
}

/// Picks the attribute that identifies a flash: image names when every flash has one,
/// orientation otherwise.
pub fn resolve_identity_kind(records: &[FlashRecord]) -> Result<IdentityKind, SessionError> {
    if records.iter().all(|r| r.image_name.is_some()) {
        return Ok(IdentityKind::Image);
    }
    if records.iter().all(|r| r.orientation.is_some()) {
        warn!(
            missing = records.iter().filter(|r| r.image_name.is_none()).count(),
            "image names missing, classifying flashes by orientation"
        );
        return Ok(IdentityKind::Orientation);
    }
    Err(SessionError::MissingField {
        field: "image_name",
    })
}

fn frame_time<C: FrameClock>(clock: &C, frame: usize) -> Result<f64, SessionError> {
    clock.time_of(frame).ok_or(SessionError::FrameOutOfRange {
        frame,
        n_frames: clock.n_frames(),
    })
}

fn shown_flashes<C: FrameClock>(
    records: &[FlashRecord],
    kind: IdentityKind,
    clock: &C,
    names: &mut ImageNames,
) -> Result<Vec<Presentation>, SessionError> {
    records
        .iter()
        .map(|r| {
            let time = frame_time(clock, r.frame)?;
            let end = frame_time(clock, r.end_frame)?;
            let identity = match kind {
                IdentityKind::Image => r
                    .image_name
                    .as_deref()
                    .map(|name| StimulusIdentity::Image(names.atom(name))),
                IdentityKind::Orientation => r.orientation.map(StimulusIdentity::Orientation),
            };
            Ok(Presentation {
                frame: r.frame,
                time,
                duration: end - time,
                identity,
                image_category: r.image_category.clone(),
            })
        })
        .collect()
}

/// Omitted presentations placed back from each flash that follows an over-long blank.
fn infer_omissions<C: FrameClock>(
    shown: &[Presentation],
    params: &TaskParameters,
    clock: &C,
) -> Result<Vec<Presentation>, SessionError> {
    let period = params.stimulus_duration + params.blank_duration;
    let mut omitted = Vec::new();
    for pair in shown.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        let blank = next.time - prev.time - prev.duration;
        if blank <= 2.0 * params.blank_duration {
            continue;
        }
        // one omission per frame at most
        let n = (((blank - params.blank_duration) / period).floor() as usize)
            .min(next.frame.saturating_sub(prev.frame));
        for k in 0..n {
            let time = next.time - (1 + k) as f64 * period;
            let frame = clock.nearest_frame(time).ok_or(SessionError::EmptyTimeBase)?;
            omitted.push(Presentation {
                frame,
                time,
                duration: params.stimulus_duration,
                identity: None,
                image_category: None,
            });
        }
    }
    Ok(omitted)
}

fn any_in(sorted: &[f64], start: f64, len: f64) -> bool {
    let i = sorted.partition_point(|&t| t < start);
    sorted.get(i).is_some_and(|&t| t < start + len)
}

/// Symmetric triangular window of length `m`, never touching zero.
fn triangular_weights(m: usize) -> Vec<f64> {
    let half = m.div_ceil(2);
    let mut w: Vec<f64> = if m % 2 == 0 {
        (1..=half).map(|n| (2 * n - 1) as f64 / m as f64).collect()
    } else {
        (1..=half).map(|n| 2.0 * n as f64 / (m + 1) as f64).collect()
    };
    let mirror: Vec<f64> = if m % 2 == 0 {
        w.iter().rev().copied().collect()
    } else {
        w.iter().rev().skip(1).copied().collect()
    };
    w.extend(mirror);
    w
}

/// Trailing weighted mean; partial windows at the start use the trailing end of the weights.
fn rolling_triangular_mean(values: &[f64], window: usize) -> Vec<f64> {
    let weights = triangular_weights(window);
    (0..values.len())
        .map(|i| {
            let mut num = 0.0;
            let mut den = 0.0;
            for (k, w) in weights.iter().enumerate() {
                let Some(pos) = (i + 1 + k).checked_sub(window) else {
                    continue;
                };
                let v = values[pos];
                if v.is_finite() {
                    num += w * v;
                    den += w;
                }
            }
            if den > 0.0 { num / den } else { f64::NAN }
        })
        .collect()
}

/// Annotated flash table, shown and omitted presentations interleaved in time order.
pub fn classify_flashes<C: FrameClock>(
    input: &FlashInput<'_>,
    clock: &C,
    config: &FlashConfig,
    names: &mut ImageNames,
) -> Result<Vec<StimulusFlash>, SessionError> {
    if input.records.is_empty() {
        return Ok(Vec::new());
    }
    let kind = resolve_identity_kind(input.records)?;
    let shown = shown_flashes(input.records, kind, clock, names)?;

    let omitted = match input.omitted_frames {
        Some(frames) => frames
            .iter()
            .map(|&frame| {
                Ok(Presentation {
                    frame,
                    time: frame_time(clock, frame)?,
                    duration: input.params.stimulus_duration,
                    identity: None,
                    image_category: None,
                })
            })
            .collect::<Result<Vec<_>, SessionError>>()?,
        None if input.params.periodic_flash => infer_omissions(&shown, input.params, clock)?,
        None => Vec::new(),
    };
    debug!(shown = shown.len(), omitted = omitted.len(), "flash presentations");

    let mut all: Vec<Presentation> = shown.into_iter().chain(omitted).collect();
    all.sort_by(|a, b| a.time.total_cmp(&b.time));

    let window = config.response_window_s;
    let licked: Vec<bool> = all
        .iter()
        .map(|p| any_in(input.lick_times, p.time, window))
        .collect();
    let rewarded: Vec<bool> = all
        .iter()
        .map(|p| any_in(input.reward_times, p.time, window))
        .collect();
    let as_f64 = |v: &[bool]| v.iter().map(|&b| f64::from(u8::from(b))).collect::<Vec<_>>();
    let lick_rate = rolling_triangular_mean(&as_f64(&licked), config.rate_window);
    let reward_rate = rolling_triangular_mean(&as_f64(&rewarded), config.rate_window);

    let upcoming: Vec<(f64, f64)> = input
        .trials
        .iter()
        .filter(|t| t.trial_type != TrialType::Aborted)
        .filter_map(|t| {
            t.change_time()
                .filter(|c| c.is_finite())
                .map(|c| (c, t.metrics.reward_rate))
        })
        .collect();

    let mut previous: Option<&StimulusIdentity> = None;
    let mut repeat = 0u32;
    let mut block: Option<usize> = None;
    let mut flashes = Vec::with_capacity(all.len());

    for (i, p) in all.iter().enumerate() {
        let change = match (&p.identity, previous) {
            (Some(id), Some(prev)) => id != prev,
            _ => false,
        };
        let repeat_here = if p.identity.is_some() {
            if block.is_none() || change {
                repeat = 1;
                block = Some(block.map_or(0, |b| b + 1));
            } else {
                repeat += 1;
            }
            previous = p.identity.as_ref();
            Some(repeat)
        } else {
            None
        };

        let next_trial = upcoming.partition_point(|(c, _)| *c < p.time);
        let trial_reward_rate = upcoming.get(next_trial).map_or(f64::NAN, |(_, r)| *r);

        flashes.push(StimulusFlash {
            flash_index: i,
            frame: p.frame,
            time: p.time,
            duration: p.duration,
            identity: p.identity.clone(),
            image_category: p.image_category.clone(),
            omitted: p.identity.is_none(),
            change,
            licked: licked[i],
            rewarded: rewarded[i],
            lick_rate: lick_rate[i] / window,
            reward_rate: reward_rate[i] / window,
            repeat: repeat_here,
            image_block: block,
            trial_reward_rate,
        });
    }
    Ok(flashes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chgdet_timing::VsyncClock;

    fn clock() -> VsyncClock {
        // 60 s at 100 Hz
        VsyncClock::from_intervals_ms(&vec![10.0; 6000])
    }

    fn flash(frame: usize, name: Option<&str>, orientation: Option<f64>) -> FlashRecord {
        FlashRecord {
            frame,
            end_frame: frame + 25,
            image_name: name.map(str::to_string),
            image_category: None,
            orientation,
        }
    }

    fn input<'a>(records: &'a [FlashRecord], params: &'a TaskParameters) -> FlashInput<'a> {
        FlashInput {
            records,
            omitted_frames: None,
            params,
            lick_times: &[],
            reward_times: &[],
            trials: &[],
        }
    }

    #[test]
    fn changes_repeats_and_blocks() {
        let records: Vec<_> = ["a", "a", "a", "b", "b"]
            .iter()
            .enumerate()
            .map(|(i, n)| flash(i * 75, Some(n), None))
            .collect();
        let params = TaskParameters::default();
        let mut names = ImageNames::new();
        let out = classify_flashes(&input(&records, &params), &clock(), &FlashConfig::default(), &mut names)
            .unwrap();
        let changes: Vec<bool> = out.iter().map(|f| f.change).collect();
        assert_eq!(changes, vec![false, false, false, true, false]);
        let repeats: Vec<_> = out.iter().map(|f| f.repeat).collect();
        assert_eq!(repeats, vec![Some(1), Some(2), Some(3), Some(1), Some(2)]);
        assert_eq!(out[4].image_block, Some(1));
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn missing_flash_is_inferred_from_long_blank() {
        let records = vec![flash(0, Some("a"), None), flash(150, Some("a"), None)];
        let params = TaskParameters::default();
        let mut names = ImageNames::new();
        let out = classify_flashes(&input(&records, &params), &clock(), &FlashConfig::default(), &mut names)
            .unwrap();
        assert_eq!(out.len(), 3);
        assert!(out[1].omitted);
        assert!((out[1].time - 0.75).abs() < 1e-9);
        assert_eq!(out[1].frame, 75);
        assert_eq!(out[1].repeat, None);
        assert_eq!(out[2].repeat, Some(2));
    }

    #[test]
    fn no_omissions_without_periodic_schedule() {
        let records = vec![flash(0, Some("a"), None), flash(150, Some("a"), None)];
        let params = TaskParameters {
            periodic_flash: false,
            ..Default::default()
        };
        let mut names = ImageNames::new();
        let out = classify_flashes(&input(&records, &params), &clock(), &FlashConfig::default(), &mut names)
            .unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn inferred_omissions_never_outnumber_frames() {
        let records = vec![flash(0, Some("a"), None), flash(150, Some("a"), None)];
        let params = TaskParameters {
            blank_duration: 1e-4,
            stimulus_duration: 1e-6,
            ..Default::default()
        };
        let mut names = ImageNames::new();
        let out = classify_flashes(&input(&records, &params), &clock(), &FlashConfig::default(), &mut names)
            .unwrap();
        assert_eq!(out.iter().filter(|f| f.omitted).count(), 150);
    }

    #[test]
    fn falls_back_to_orientation() {
        let records = vec![flash(0, None, Some(0.0)), flash(75, Some("a"), Some(90.0))];
        assert_eq!(resolve_identity_kind(&records), Ok(IdentityKind::Orientation));
        let params = TaskParameters::default();
        let mut names = ImageNames::new();
        let out = classify_flashes(&input(&records, &params), &clock(), &FlashConfig::default(), &mut names)
            .unwrap();
        assert!(out[1].change);
        assert_eq!(out[1].label().as_deref(), Some("90"));
    }

    #[test]
    fn no_identity_attribute_is_an_error() {
        let records = vec![flash(0, None, None)];
        assert_eq!(
            resolve_identity_kind(&records),
            Err(SessionError::MissingField { field: "image_name" })
        );
    }

    #[test]
    fn licks_and_rates() {
        let records: Vec<_> = (0..4).map(|i| flash(i * 75, Some("a"), None)).collect();
        let params = TaskParameters::default();
        let licks = [0.8];
        let mut inp = input(&records, &params);
        inp.lick_times = &licks;
        let mut names = ImageNames::new();
        let out = classify_flashes(&inp, &clock(), &FlashConfig::default(), &mut names).unwrap();
        let licked: Vec<bool> = out.iter().map(|f| f.licked).collect();
        assert_eq!(licked, vec![false, true, false, false]);
        assert_eq!(out[0].lick_rate, 0.0);
        // only flash 1 licked; weights are the last two of the window
        let w = triangular_weights(320);
        let expected = w[319] / (w[318] + w[319]) / 0.75;
        assert!((out[1].lick_rate - expected).abs() < 1e-12);
    }

    #[test]
    fn triangular_weights_shape() {
        let even = triangular_weights(4);
        assert_eq!(even, vec![0.25, 0.75, 0.75, 0.25]);
        let odd = triangular_weights(3);
        assert_eq!(odd, vec![0.5, 1.0, 0.5]);
    }
}
