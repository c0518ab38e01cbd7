use std::collections::{BTreeMap, HashMap};

use chgdet_behavior::BehaviorSession;
use chgdet_cache::{CacheKey, MemoCache};
use chgdet_core::{ClassifiedTrial, SignalChannel, StimulusFlash, TrialType};
use chgdet_timing::{interval_stats, FrameClock};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::ResponseConfig;
use crate::error::ExtractError;
use crate::stats::{response_stats, ResponseStats};
use crate::table::{FlashResponse, ResponseTables, TrialResponse};
use crate::window::{extract, Extracted};

/// One cell's slice around one event.
struct CellSlice {
    cell: usize,
    extracted: Extracted,
    stats: ResponseStats,
}

/// Builds trial, flash and omission response tables for one behavior session.
///
/// Events whose window leaves a channel are dropped from that channel's rows.
pub struct ResponseTableBuilder<'a> {
    session: &'a BehaviorSession,
    channels: &'a [SignalChannel],
    running: Option<&'a SignalChannel>,
    config: ResponseConfig,
}

/// Everything a response table depends on.
#[derive(Serialize)]
struct Fingerprint<'a> {
    config: &'a ResponseConfig,
    frame_times: &'a [f64],
    trials: &'a [ClassifiedTrial],
    flashes: &'a [StimulusFlash],
    channels: &'a [SignalChannel],
    running: Option<&'a SignalChannel>,
}

impl<'a> ResponseTableBuilder<'a> {
    pub fn new(
        session: &'a BehaviorSession,
        channels: &'a [SignalChannel],
        config: ResponseConfig,
    ) -> Result<Self, ExtractError> {
        config.validate()?;
        for channel in channels {
            channel.validate()?;
        }
        Ok(Self {
            session,
            channels,
            running: None,
            config,
        })
    }

    /// Running speed channel averaged into every row as `mean_running_speed`.
    pub fn with_running(mut self, running: &'a SignalChannel) -> Result<Self, ExtractError> {
        running.validate()?;
        self.running = Some(running);
        Ok(self)
    }

    fn frame_rate(&self, channel: &SignalChannel) -> Result<f64, ExtractError> {
        let frame_rate = self
            .config
            .frame_rate
            .or(channel.frame_rate)
            .unwrap_or_else(|| interval_stats(&channel.timestamps).effective_rate_hz);
        if frame_rate.is_finite() && frame_rate > 0.0 {
            Ok(frame_rate)
        } else {
            Err(ExtractError::InvalidFrameRate { frame_rate })
        }
    }

    /// Slices every cell of `channel` around `event_time`. `None` when the window leaves the
    /// channel.
    fn slice_cells(
        &self,
        channel: &SignalChannel,
        frame_rate: f64,
        event_time: f64,
        window: (f64, f64),
    ) -> Result<Option<Vec<CellSlice>>, ExtractError> {
        let mut slices = Vec::with_capacity(channel.n_cells());
        for (cell, trace) in channel.traces.iter().enumerate() {
            let extracted = match extract(trace, &channel.timestamps, event_time, window, frame_rate) {
                Ok(extracted) => extracted,
                Err(err @ ExtractError::OutOfRangeWindow { .. }) => {
                    debug!(channel = %channel.name, event_time, %err, "dropping event");
                    return Ok(None);
                }
                Err(err) => return Err(err),
            };
            let stats = response_stats(
                &extracted.trace,
                window.0,
                self.config.response_duration_s,
                frame_rate,
                channel.kind,
            );
            slices.push(CellSlice {
                cell,
                extracted,
                stats,
            });
        }
        Ok(Some(slices))
    }

    fn mean_running_speed(&self, event_time: f64, window: (f64, f64)) -> Result<f64, ExtractError> {
        let Some(running) = self.running else {
            return Ok(f64::NAN);
        };
        let Some(trace) = running.trace(0) else {
            return Ok(f64::NAN);
        };
        let frame_rate = self.frame_rate(running)?;
        match extract(trace, &running.timestamps, event_time, window, frame_rate) {
            Ok(e) => Ok(response_stats(
                &e.trace,
                window.0,
                self.config.response_duration_s,
                frame_rate,
                running.kind,
            )
            .mean_response),
            Err(ExtractError::OutOfRangeWindow { .. }) => Ok(f64::NAN),
            Err(err) => Err(err),
        }
    }

    fn trial_rows(&self) -> Result<Vec<TrialResponse>, ExtractError> {
        let window = self.config.trial_window;
        let mut rows = Vec::new();
        for channel in self.channels {
            let frame_rate = self.frame_rate(channel)?;
            for trial in &self.session.trials {
                let Some(change_time) = trial.change_time() else {
                    continue;
                };
                let Some(slices) = self.slice_cells(channel, frame_rate, change_time, window)? else {
                    continue;
                };
                let running_speed = self.mean_running_speed(change_time, window)?;
                rows.extend(slices.into_iter().map(|s| TrialResponse {
                    trial_index: trial.index(),
                    channel: channel.name.clone(),
                    cell: s.cell,
                    trace_timestamps: s.extracted.relative_timestamps(),
                    trace: s.extracted.trace,
                    stats: s.stats,
                    mean_running_speed: running_speed,
                    engaged: trial.metrics.reward_rate > self.config.engaged_threshold,
                    behavior: trial.clone(),
                }));
            }
        }
        Ok(rows)
    }

    /// Trial type of every change, keyed by the stimulus frame it landed on.
    fn change_frames(&self) -> HashMap<usize, TrialType> {
        self.session
            .trials
            .iter()
            .filter_map(|t| {
                let frame = self.session.clock.nearest_frame(t.change_time()?)?;
                Some((frame, t.trial_type))
            })
            .collect()
    }

    fn flash_rows<'f>(
        &self,
        flashes: impl Iterator<Item = &'f StimulusFlash>,
        window: (f64, f64),
        change_frames: &HashMap<usize, TrialType>,
    ) -> Result<Vec<FlashResponse>, ExtractError> {
        let flashes: Vec<&StimulusFlash> = flashes.collect();
        let mut rows = Vec::new();
        for channel in self.channels {
            let frame_rate = self.frame_rate(channel)?;
            for flash in &flashes {
                let Some(slices) = self.slice_cells(channel, frame_rate, flash.time, window)? else {
                    continue;
                };
                let running_speed = self.mean_running_speed(flash.time, window)?;
                let trial_type = change_frames.get(&flash.frame).copied();
                rows.extend(slices.into_iter().map(|s| FlashResponse {
                    flash_index: flash.flash_index,
                    channel: channel.name.clone(),
                    cell: s.cell,
                    start_time: flash.time,
                    image_name: flash.label(),
                    repeat: flash.repeat,
                    image_block: flash.image_block,
                    trial_reward_rate: flash.trial_reward_rate,
                    engaged: flash.trial_reward_rate > self.config.engaged_threshold,
                    change: flash.change,
                    omitted: flash.omitted,
                    trial_type,
                    pref_stim: false,
                    trace_timestamps: s.extracted.relative_timestamps(),
                    trace: s.extracted.trace,
                    stats: s.stats,
                    mean_running_speed: running_speed,
                }));
            }
        }
        Ok(rows)
    }

    pub fn build(&self) -> Result<ResponseTables, ExtractError> {
        let change_frames = self.change_frames();
        let cfg = &self.config;

        let shown = self.session.flashes.iter().filter(|f| {
            !f.omitted
                && f.flash_index > cfg.min_flash_index
                && !(cfg.exclude_autorewarded
                    && change_frames.get(&f.frame) == Some(&TrialType::Autorewarded))
        });
        let omitted = self.session.flashes.iter().filter(|f| f.omitted);

        let mut flashes = self.flash_rows(shown, cfg.flash_window, &change_frames)?;
        mark_preferred_images(&mut flashes);
        let tables = ResponseTables {
            trials: self.trial_rows()?,
            flashes,
            omissions: self.flash_rows(omitted, cfg.omission_window, &change_frames)?,
        };
        info!(
            session = %self.session.session_id,
            channels = self.channels.len(),
            trial_rows = tables.trials.len(),
            flash_rows = tables.flashes.len(),
            omission_rows = tables.omissions.len(),
            "response tables built"
        );
        Ok(tables)
    }

    pub fn cache_key(&self) -> CacheKey {
        let fingerprint = Fingerprint {
            config: &self.config,
            frame_times: self.session.clock.times(),
            trials: &self.session.trials,
            flashes: &self.session.flashes,
            channels: self.channels,
            running: self.running,
        };
        CacheKey::new(&self.session.session_id, &fingerprint)
    }

    /// [`ResponseTableBuilder::build`] through `cache`.
    pub fn build_cached(
        &self,
        cache: &mut MemoCache<ResponseTables>,
    ) -> Result<ResponseTables, ExtractError> {
        cache
            .try_get_or_insert_with(self.cache_key(), || self.build())
            .cloned()
    }
}

/// Flags the rows of each (channel, cell) whose image has the largest mean response.
/// Ties go to the image that sorts first.
fn mark_preferred_images(rows: &mut [FlashResponse]) {
    let mut sums: BTreeMap<(&str, usize), BTreeMap<&str, (f64, usize)>> = BTreeMap::new();
    for row in rows.iter() {
        let Some(image) = row.image_name.as_deref() else {
            continue;
        };
        if !row.stats.mean_response.is_finite() {
            continue;
        }
        let entry = sums
            .entry((row.channel.as_str(), row.cell))
            .or_default()
            .entry(image)
            .or_insert((0.0, 0));
        entry.0 += row.stats.mean_response;
        entry.1 += 1;
    }
    let preferred: HashMap<(String, usize), String> = sums
        .into_iter()
        .filter_map(|((channel, cell), images)| {
            let (image, _) = images
                .into_iter()
                .map(|(image, (sum, n))| (image, sum / n as f64))
                .fold(None::<(&str, f64)>, |best, (image, mean)| match best {
                    Some((_, m)) if m >= mean => best,
                    _ => Some((image, mean)),
                })?;
            Some(((channel.to_string(), cell), image.to_string()))
        })
        .collect();
    for row in rows.iter_mut() {
        row.pref_stim = row.image_name.as_ref().is_some_and(|image| {
            preferred.get(&(row.channel.clone(), row.cell)) == Some(image)
        });
    }
}
