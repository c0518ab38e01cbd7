use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chgdet_behavior::BehaviorSession;
use chgdet_cache::MemoCache;
use chgdet_core::{ClassifiedTrial, SessionFormat, SessionRecord, StimulusFlash};
use chgdet_encoder::{process_encoder, speed_channel, RunningSample};
use chgdet_response::{ResponseTableBuilder, ResponseTables};
use chgdet_timing::{FrameClock, IntervalStats};
use serde::Serialize;
use tracing::{error, info};

use crate::config::PipelineConfig;

/// Every table derived from one session.
#[derive(Debug, Serialize)]
pub struct SessionOutput {
    pub session_id: String,
    pub format: SessionFormat,
    pub frame_intervals: IntervalStats,
    pub trials: Vec<ClassifiedTrial>,
    /// trials labeled `other`
    pub ambiguous_trials: Vec<usize>,
    pub flashes: Vec<StimulusFlash>,
    pub running: Vec<RunningSample>,
    pub responses: ResponseTables,
}

pub fn load_session(path: &Path) -> Result<SessionRecord> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading session {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing session {}", path.display()))
}

pub fn process_session(
    record: &SessionRecord,
    config: &PipelineConfig,
    cache: Option<&mut MemoCache<ResponseTables>>,
) -> Result<SessionOutput> {
    let behavior =
        BehaviorSession::from_record(record, &config.behavior).context("behavior stage")?;

    let running = if record.encoder.is_empty() {
        Vec::new()
    } else {
        process_encoder(&record.encoder, &config.encoder).context("encoder stage")?
    };
    let speed = if running.is_empty() {
        None
    } else {
        Some(speed_channel(&running)?)
    };

    let mut builder = ResponseTableBuilder::new(&behavior, &record.channels, config.response.clone())
        .context("response stage")?;
    if let Some(speed) = &speed {
        builder = builder.with_running(speed)?;
    }
    let responses = match cache {
        Some(cache) => builder.build_cached(cache),
        None => builder.build(),
    }
    .context("response stage")?;

    Ok(SessionOutput {
        session_id: behavior.session_id.clone(),
        format: record.format(),
        frame_intervals: behavior.clock.interval_stats(),
        ambiguous_trials: behavior.ambiguous.clone(),
        trials: behavior.trials,
        flashes: behavior.flashes,
        running,
        responses,
    })
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub written: Vec<PathBuf>,
    pub failed: Vec<String>,
}

fn session_label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn run_one(
    path: &Path,
    config: &PipelineConfig,
    out_dir: &Path,
    cache: Option<&mut MemoCache<ResponseTables>>,
) -> Result<PathBuf> {
    let record = load_session(path)?;
    let output = process_session(&record, config, cache)
        .with_context(|| format!("session {}", record.session_id))?;
    let target = out_dir.join(format!("{}.json", output.session_id));
    let file = fs::File::create(&target)
        .with_context(|| format!("creating {}", target.display()))?;
    serde_json::to_writer(std::io::BufWriter::new(file), &output)
        .with_context(|| format!("writing {}", target.display()))?;
    info!(
        session = %output.session_id,
        trials = output.trials.len(),
        flashes = output.flashes.len(),
        response_rows = output.responses.len(),
        path = %target.display(),
        "session written"
    );
    Ok(target)
}

/// Processes every session independently. A failing session is logged and skipped.
pub fn run_batch(
    paths: &[PathBuf],
    config: &PipelineConfig,
    out_dir: &Path,
    use_cache: bool,
) -> Result<BatchSummary> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;
    let mut cache = use_cache.then(MemoCache::new);
    let mut summary = BatchSummary::default();

    for path in paths {
        match run_one(path, config, out_dir, cache.as_mut()) {
            Ok(target) => summary.written.push(target),
            Err(err) => {
                let session = session_label(path);
                error!(%session, error = %format!("{err:#}"), "session failed");
                summary.failed.push(session);
            }
        }
    }
    if let Some(cache) = &cache {
        let (hits, misses) = cache.stats();
        info!(hits, misses, entries = cache.len(), "response cache");
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulate::{simulate, SimulationConfig};

    fn small_session(seed: u64) -> SessionRecord {
        simulate(&SimulationConfig {
            seed,
            trials: 30,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn simulated_session_runs_end_to_end() {
        let record = small_session(7);
        let out = process_session(&record, &PipelineConfig::default(), None).unwrap();
        assert_eq!(out.trials.len(), 30);
        assert_eq!(out.running.len(), record.encoder.len());
        assert!(!out.responses.trials.is_empty());
        assert!(!out.responses.flashes.is_empty());
        assert!(out.responses.trials.iter().all(|r| r.mean_running_speed.is_finite()));
        assert!((out.frame_intervals.effective_rate_hz - 60.0).abs() < 0.5);
    }

    #[test]
    fn cached_and_uncached_runs_match() {
        let record = small_session(3);
        let config = PipelineConfig::default();
        let plain = process_session(&record, &config, None).unwrap();
        let mut cache = MemoCache::new();
        let cached = process_session(&record, &config, Some(&mut cache)).unwrap();
        let again = process_session(&record, &config, Some(&mut cache)).unwrap();
        let json = |o: &SessionOutput| serde_json::to_string(&o.responses).unwrap();
        assert_eq!(json(&plain), json(&cached));
        assert_eq!(json(&cached), json(&again));
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn failing_session_does_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        fs::write(&good, serde_json::to_string(&small_session(1)).unwrap()).unwrap();

        let mut broken = small_session(2);
        broken.vsync_intervals_ms.clear();
        let bad = dir.path().join("bad.json");
        fs::write(&bad, serde_json::to_string(&broken).unwrap()).unwrap();
        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, "{").unwrap();

        let out_dir = dir.path().join("out");
        let summary = run_batch(
            &[bad, good, garbage],
            &PipelineConfig::default(),
            &out_dir,
            true,
        )
        .unwrap();
        assert_eq!(summary.written, vec![out_dir.join("simulated-1.json")]);
        assert_eq!(summary.failed, vec!["bad".to_string(), "garbage".to_string()]);
        assert!(summary.written[0].exists());
    }
}
