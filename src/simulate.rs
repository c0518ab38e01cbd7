//! Synthetic change-detection sessions for demos and end-to-end tests.

use anyhow::{ensure, Result};
use chgdet_core::{
    EncoderSample, FlashRecord, RewardRecord, SessionRecord, SignalChannel, TaskParameters,
    TrialLog, TrialRecord,
};
use chgdet_timing::VsyncClock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

const FRAME_MS: f64 = 1000.0 / 60.0;
/// frames from one flash onset to the next (0.25 s shown, 0.5 s blank)
const FLASH_PERIOD: usize = 45;
const FLASH_FRAMES: usize = 15;
const IMAGING_RATE: f64 = 31.0;

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub seed: u64,
    pub trials: usize,
    pub cells: usize,
    pub images: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            trials: 60,
            cells: 4,
            images: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Planned {
    Go,
    Catch,
    Aborted,
}

/// One trial laid out on the flash grid (slot k starts at frame `k * FLASH_PERIOD`).
struct TrialPlan {
    start_slot: usize,
    change_slot: Option<usize>,
    kind: Planned,
    auto_rewarded: bool,
    lick_frame: Option<usize>,
    reward_frame: Option<usize>,
}

fn plan_trials(rng: &mut StdRng, n: usize) -> (Vec<TrialPlan>, usize) {
    let mut plans = Vec::with_capacity(n);
    let mut cursor = 2;
    for i in 0..n {
        let start_slot = cursor;
        let change_slot = start_slot + rng.random_range(4..12);
        let draw: f64 = rng.random();
        let kind = if draw < 0.1 {
            Planned::Aborted
        } else if draw < 0.3 {
            Planned::Catch
        } else {
            Planned::Go
        };
        let auto_rewarded = i < 3 && kind == Planned::Go;
        let change_frame = change_slot * FLASH_PERIOD;

        let plan = match kind {
            Planned::Aborted => {
                let lick_slot = rng.random_range(start_slot + 1..change_slot);
                cursor = lick_slot + 4;
                TrialPlan {
                    start_slot,
                    change_slot: None,
                    kind,
                    auto_rewarded: false,
                    lick_frame: Some(lick_slot * FLASH_PERIOD + 10),
                    reward_frame: None,
                }
            }
            Planned::Go | Planned::Catch => {
                let p_lick = if kind == Planned::Go { 0.75 } else { 0.2 };
                let lick_frame = rng
                    .random_bool(p_lick)
                    .then(|| change_frame + rng.random_range(18..42));
                let reward_frame = match (kind, auto_rewarded) {
                    (Planned::Go, true) => Some(change_frame),
                    (Planned::Go, false) => lick_frame,
                    _ => None,
                };
                cursor = change_slot + 5;
                TrialPlan {
                    start_slot,
                    change_slot: Some(change_slot),
                    kind,
                    auto_rewarded,
                    lick_frame,
                    reward_frame,
                }
            }
        };
        plans.push(plan);
    }
    (plans, cursor)
}

/// A current-format session with a flashed image sequence, encoder data and one imaging channel
/// whose cells respond to image changes.
pub fn simulate(config: &SimulationConfig) -> Result<SessionRecord> {
    ensure!(config.trials > 0, "at least one trial is needed");
    ensure!(config.images >= 2, "image changes need at least two images");
    let mut rng = StdRng::seed_from_u64(config.seed);

    let (plans, end_slot) = plan_trials(&mut rng, config.trials);
    let n_frames = end_slot * FLASH_PERIOD + 120;
    let intervals: Vec<f64> = (0..n_frames)
        .map(|_| FRAME_MS + rng.random_range(-0.3..0.3))
        .collect();
    let clock = VsyncClock::from_intervals_ms(&intervals);
    let times = clock.times();

    // image shown in every flash slot
    let mut image_of_slot = vec![0usize; end_slot];
    let mut image = 0;
    let mut go_slots = plans
        .iter()
        .filter(|p| p.kind == Planned::Go)
        .filter_map(|p| p.change_slot)
        .peekable();
    for (slot, shown) in image_of_slot.iter_mut().enumerate() {
        if go_slots.next_if_eq(&slot).is_some() {
            image = (image + rng.random_range(1..config.images)) % config.images;
        }
        *shown = image;
    }

    let change_slots: Vec<usize> = plans.iter().filter_map(|p| p.change_slot).collect();
    let mut stimulus_log = Vec::new();
    let mut omitted = Vec::new();
    for (slot, &img) in image_of_slot.iter().enumerate() {
        let frame = slot * FLASH_PERIOD;
        let near_change = change_slots.iter().any(|c| c.abs_diff(slot) <= 1);
        if slot > 2 && !near_change && rng.random_bool(0.03) {
            omitted.push(frame);
            continue;
        }
        stimulus_log.push(FlashRecord {
            frame,
            end_frame: frame + FLASH_FRAMES,
            image_name: Some(format!("im{:03}", img * 7)),
            image_category: None,
            orientation: None,
        });
    }

    let mut lick_frames = Vec::new();
    let mut rewards = Vec::new();
    let mut records = Vec::with_capacity(plans.len());
    for plan in &plans {
        if let Some(lick) = plan.lick_frame {
            // the sensor stays in contact for a few frames
            lick_frames.extend(lick..lick + rng.random_range(1..4));
        }
        if let Some(frame) = plan.reward_frame {
            rewards.push(RewardRecord {
                frame,
                volume: 0.007,
            });
        }
        records.push(TrialRecord {
            start_time: times[plan.start_slot * FLASH_PERIOD],
            end_time: None,
            change_time: plan.change_slot.map(|s| times[s * FLASH_PERIOD]),
            lick_times: plan.lick_frame.map(|f| times[f]).into_iter().collect(),
            reward_times: plan.reward_frame.map(|f| times[f]).into_iter().collect(),
            auto_rewarded: Some(plan.auto_rewarded),
            rewarded: match plan.kind {
                Planned::Go => Some(true),
                Planned::Catch => Some(false),
                Planned::Aborted => None,
            },
            response_window: None,
        });
    }

    let encoder = simulate_encoder(&mut rng, times);
    let go_changes: Vec<f64> = plans
        .iter()
        .filter(|p| p.kind == Planned::Go)
        .filter_map(|p| p.change_slot.map(|s| times[s * FLASH_PERIOD]))
        .collect();
    let duration = times.last().copied().unwrap_or(0.0);
    let channel = simulate_imaging(&mut rng, duration, &go_changes, config.cells)?;

    info!(
        seed = config.seed,
        trials = records.len(),
        flashes = stimulus_log.len(),
        omitted = omitted.len(),
        "simulated session"
    );

    Ok(SessionRecord {
        session_id: format!("simulated-{}", config.seed),
        vsync_intervals_ms: intervals,
        trial_log: TrialLog::Current(records),
        lick_frames,
        rewards,
        stimulus_log,
        omitted_flash_frames: Some(omitted),
        params: TaskParameters::default(),
        encoder,
        channels: vec![channel],
    })
}

/// Wheel turning at a slowly varying rate, read out as a 0..5 V wrapped signal once per frame.
fn simulate_encoder(rng: &mut StdRng, times: &[f64]) -> Vec<EncoderSample> {
    let mut v = 2.5;
    let mut out = Vec::with_capacity(times.len());
    for (i, &t) in times.iter().enumerate() {
        if i > 0 {
            let dt = t - times[i - 1];
            let rate = 2.0 + 1.5 * (t / 30.0 * std::f64::consts::TAU).sin();
            v = (v + rate * dt + rng.random_range(-0.002..0.002)).rem_euclid(5.0);
        }
        out.push(EncoderSample::new(t, v, 5.0));
    }
    out
}

fn simulate_imaging(
    rng: &mut StdRng,
    duration: f64,
    changes: &[f64],
    cells: usize,
) -> Result<SignalChannel> {
    let n = (duration * IMAGING_RATE) as usize;
    let timestamps: Vec<f64> = (0..n).map(|i| i as f64 / IMAGING_RATE + 0.005).collect();
    let traces = (0..cells)
        .map(|cell| {
            let gain = 0.2 + 0.3 * cell as f64;
            timestamps
                .iter()
                .map(|&t| {
                    let start = changes.partition_point(|&c| c <= t - 0.1);
                    let evoked: f64 = changes[..start]
                        .iter()
                        .rev()
                        .take(3)
                        .map(|&c| (-(t - c - 0.1) / 0.8).exp())
                        .sum();
                    gain * evoked + rng.random_range(-0.05..0.05)
                })
                .collect()
        })
        .collect();
    Ok(SignalChannel::new("dff", timestamps, traces)?.with_frame_rate(IMAGING_RATE))
}
