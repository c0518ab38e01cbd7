use chgdet_cache::ImageNames;
use chgdet_core::{
    ClassifiedTrial, ResponseWindow, SessionError, SessionRecord, StimulusFlash, Trial, TrialLog,
};
use chgdet_timing::{FrameClock, VsyncClock};
use tracing::info;

use crate::config::BehaviorConfig;
use crate::error::MetricsError;
use crate::flashes::{classify_flashes, FlashInput};
use crate::state::annotate_performance;
use crate::trial::classify_trials;

/// Keeps the first frame of each lick; a lick held across consecutive frames is logged once per
/// frame.
pub fn dedup_lick_frames(frames: &[usize]) -> Vec<usize> {
    let mut sorted = frames.to_vec();
    sorted.sort_unstable();
    let mut kept: Vec<usize> = Vec::with_capacity(sorted.len());
    let mut last: Option<usize> = None;
    for frame in sorted {
        if last.is_none_or(|prev| frame > prev + 1) {
            kept.push(frame);
        }
        last = Some(frame);
    }
    kept
}

fn frame_time(clock: &VsyncClock, frame: usize) -> Result<f64, SessionError> {
    clock.time_of(frame).ok_or(SessionError::FrameOutOfRange {
        frame,
        n_frames: clock.n_frames(),
    })
}

fn frame_times(clock: &VsyncClock, frames: &[usize]) -> Result<Vec<f64>, SessionError> {
    frames.iter().map(|&f| frame_time(clock, f)).collect()
}

/// Resolves the trial log into trials on the stimulus clock.
pub fn materialize_trials(
    record: &SessionRecord,
    clock: &VsyncClock,
) -> Result<Vec<Trial>, SessionError> {
    let session_end = clock.times().last().copied().ok_or(SessionError::EmptyTimeBase)?;
    let default_window = record.params.response_window;
    let window = |w: Option<ResponseWindow>| w.unwrap_or(default_window);

    let mut trials = match &record.trial_log {
        TrialLog::Legacy(rows) => rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                Ok(Trial {
                    trial_index: i,
                    change_time: r.change_frame.map(|f| frame_time(clock, f)).transpose()?,
                    lick_times: frame_times(clock, &r.lick_frames)?,
                    reward_times: frame_times(clock, &r.reward_frames)?,
                    auto_rewarded: r.auto_rewarded.unwrap_or(false),
                    rewarded: r.rewarded,
                    response_window: window(r.response_window),
                    start_time: frame_time(clock, r.start_frame)?,
                    end_time: f64::NAN,
                })
            })
            .collect::<Result<Vec<_>, SessionError>>()?,
        TrialLog::Current(rows) => rows
            .iter()
            .enumerate()
            .map(|(i, r)| Trial {
                trial_index: i,
                change_time: r.change_time.filter(|t| t.is_finite()),
                lick_times: r.lick_times.clone(),
                reward_times: r.reward_times.clone(),
                auto_rewarded: r.auto_rewarded.unwrap_or(false),
                rewarded: r.rewarded,
                response_window: window(r.response_window),
                start_time: r.start_time,
                end_time: r.end_time.unwrap_or(f64::NAN),
            })
            .collect(),
    };

    let next_starts: Vec<f64> = trials
        .iter()
        .skip(1)
        .map(|t| t.start_time)
        .chain(std::iter::once(session_end))
        .collect();
    for (trial, next) in trials.iter_mut().zip(next_starts) {
        if trial.end_time.is_nan() {
            trial.end_time = next;
        }
    }
    Ok(trials)
}

/// A session after the behavior stage: every trial classified and annotated, every flash
/// labeled.
#[derive(Debug, Clone)]
pub struct BehaviorSession {
    pub session_id: String,
    pub clock: VsyncClock,
    pub trials: Vec<ClassifiedTrial>,
    /// indices of trials labeled `other`
    pub ambiguous: Vec<usize>,
    pub flashes: Vec<StimulusFlash>,
    pub lick_times: Vec<f64>,
    pub reward_times: Vec<f64>,
    pub image_names: ImageNames,
}

impl BehaviorSession {
    pub fn from_record(record: &SessionRecord, config: &BehaviorConfig) -> Result<Self, MetricsError> {
        config.validate()?;
        record.params.validate()?;
        if record.vsync_intervals_ms.is_empty() {
            return Err(SessionError::EmptyTimeBase.into());
        }
        let clock = VsyncClock::from_intervals_ms(&record.vsync_intervals_ms);

        let lick_times = frame_times(&clock, &dedup_lick_frames(&record.lick_frames))?;
        let mut reward_frames: Vec<usize> = record.rewards.iter().map(|r| r.frame).collect();
        reward_frames.sort_unstable();
        let reward_times = frame_times(&clock, &reward_frames)?;

        let trials = materialize_trials(record, &clock)?;
        let classification = classify_trials(&trials, &config.classifier);
        let trials = annotate_performance(&classification.trials, &config.performance)?;

        let mut image_names = ImageNames::new();
        let flashes = classify_flashes(
            &FlashInput {
                records: &record.stimulus_log,
                omitted_frames: record.omitted_flash_frames.as_deref(),
                params: &record.params,
                lick_times: &lick_times,
                reward_times: &reward_times,
                trials: &trials,
            },
            &clock,
            &config.flashes,
            &mut image_names,
        )?;

        info!(
            session = %record.session_id,
            format = ?record.format(),
            trials = trials.len(),
            other = classification.ambiguous.len(),
            flashes = flashes.len(),
            images = image_names.len(),
            "behavior classified"
        );

        Ok(Self {
            session_id: record.session_id.clone(),
            clock,
            trials,
            ambiguous: classification.ambiguous,
            flashes,
            lick_times,
            reward_times,
            image_names,
        })
    }
}
