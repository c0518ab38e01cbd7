use chgdet_behavior::{classify_trial, BehaviorConfig, BehaviorSession, ClassifierConfig};
use chgdet_core::{
    ResponseType, ResponseWindow, SessionRecord, Trial, TrialLog, TrialRecord, TrialType,
};
use proptest::prelude::*;

fn session_json() -> String {
    let mut trials = Vec::new();
    for i in 0..30 {
        let start = i as f64 * 6.0;
        let go = i % 3 != 0;
        trials.push(serde_json::json!({
            "start_time": start,
            "change_time": start + 2.0,
            "lick_times": if i % 2 == 0 { vec![start + 2.4] } else { vec![] },
            "reward_times": if go && i % 2 == 0 { vec![start + 2.4] } else { vec![] },
            "rewarded": if go { serde_json::json!(true) } else { serde_json::json!(0) },
        }));
    }
    trials.push(serde_json::json!({"start_time": 180.0, "lick_times": [180.5]}));
    let flashes: Vec<_> = (0..240)
        .map(|i| {
            let name = if (i / 8) % 2 == 0 { "im000" } else { "im031" };
            serde_json::json!({"frame": i * 45, "end_frame": i * 45 + 15, "image_name": name})
        })
        .collect();
    serde_json::json!({
        "session_id": "synthetic",
        "vsync_intervals_ms": vec![1000.0 / 60.0; 60 * 200],
        "trial_log": {"format": "current", "records": trials},
        "lick_frames": [144, 145, 146, 300],
        "rewards": [{"frame": 144, "volume": 0.005}],
        "stimulus_log": flashes,
    })
    .to_string()
}

#[test]
fn session_from_json_is_classified() {
    let record: SessionRecord = serde_json::from_str(&session_json()).unwrap();
    let session = BehaviorSession::from_record(&record, &BehaviorConfig::default()).unwrap();

    assert_eq!(session.trials.len(), 31);
    assert_eq!(session.trials[0].trial_type, TrialType::Catch);
    assert_eq!(session.trials[1].trial_type, TrialType::Go);
    assert_eq!(session.trials[2].response_type, ResponseType::Hit);
    assert_eq!(session.trials[30].trial_type, TrialType::Aborted);
    assert!(session.ambiguous.is_empty());
    assert_eq!(session.lick_times.len(), 2);

    for t in &session.trials[..10] {
        assert_eq!(t.metrics.reward_rate, f64::INFINITY);
    }
    for t in &session.trials[10..] {
        assert!(t.metrics.reward_rate.is_finite() && t.metrics.reward_rate >= 0.0);
    }
    for t in &session.trials {
        assert!(t.metrics.d_prime.is_nan() || t.metrics.d_prime.is_finite());
    }

    assert_eq!(session.flashes.len(), 240);
    assert_eq!(session.flashes.iter().filter(|f| f.change).count(), 29);
    assert_eq!(session.image_names.len(), 2);
}

#[test]
fn legacy_and_current_logs_agree() {
    let current: SessionRecord = serde_json::from_str(&session_json()).unwrap();
    let TrialLog::Current(rows) = &current.trial_log else {
        panic!("expected current log");
    };
    let frame = |t: f64| (t * 60.0).round() as usize;
    let legacy_rows: Vec<_> = rows
        .iter()
        .map(|r: &TrialRecord| {
            serde_json::json!({
                "start_frame": frame(r.start_time),
                "change_frame": r.change_time.map(frame),
                "lick_frames": r.lick_times.iter().map(|t| frame(*t)).collect::<Vec<_>>(),
                "reward_frames": r.reward_times.iter().map(|t| frame(*t)).collect::<Vec<_>>(),
                "rewarded": r.rewarded,
            })
        })
        .collect();
    let mut legacy = current.clone();
    legacy.trial_log =
        serde_json::from_value(serde_json::json!({"format": "legacy", "records": legacy_rows}))
            .unwrap();

    let cfg = BehaviorConfig::default();
    let a = BehaviorSession::from_record(&current, &cfg).unwrap();
    let b = BehaviorSession::from_record(&legacy, &cfg).unwrap();
    let types_a: Vec<_> = a.trials.iter().map(|t| t.trial_type).collect();
    let types_b: Vec<_> = b.trials.iter().map(|t| t.trial_type).collect();
    assert_eq!(types_a, types_b);
    let resp_a: Vec<_> = a.trials.iter().map(|t| t.response).collect();
    let resp_b: Vec<_> = b.trials.iter().map(|t| t.response).collect();
    assert_eq!(resp_a, resp_b);
}

#[test]
fn empty_time_base_fails_the_session() {
    let mut record: SessionRecord = serde_json::from_str(&session_json()).unwrap();
    record.vsync_intervals_ms.clear();
    assert!(BehaviorSession::from_record(&record, &BehaviorConfig::default()).is_err());
}

#[test]
fn zero_flash_period_fails_the_session() {
    let mut record: SessionRecord = serde_json::from_str(&session_json()).unwrap();
    record.params.blank_duration = 0.0;
    record.params.stimulus_duration = 0.0;
    assert!(BehaviorSession::from_record(&record, &BehaviorConfig::default()).is_err());
}

fn arb_trial() -> impl Strategy<Value = Trial> {
    (
        prop::option::of(0.0f64..10.0),
        prop::collection::vec(0.0f64..12.0, 0..6),
        prop::option::of(any::<bool>()),
        any::<bool>(),
    )
        .prop_map(|(change_time, mut licks, rewarded, auto_rewarded)| {
            licks.sort_by(f64::total_cmp);
            Trial {
                trial_index: 0,
                change_time,
                lick_times: licks,
                reward_times: Vec::new(),
                auto_rewarded,
                rewarded,
                response_window: ResponseWindow::default(),
                start_time: 0.0,
                end_time: 12.0,
            }
        })
}

proptest! {
    #[test]
    fn aborted_implies_no_change_time(trial in arb_trial()) {
        let row = classify_trial(&trial, None, &ClassifierConfig::default());
        if row.trial_type == TrialType::Aborted {
            prop_assert!(trial.change_time.is_none());
        }
    }

    #[test]
    fn response_implies_latency_in_window(trial in arb_trial()) {
        let row = classify_trial(&trial, None, &ClassifierConfig::default());
        if row.response {
            let latency = row.response_latency.unwrap();
            prop_assert!(trial.response_window.contains(latency));
        } else {
            prop_assert!(
                trial.change_time.is_none()
                    || row.response_latency.is_none_or(|l| !trial.response_window.contains(l))
            );
        }
    }

    #[test]
    fn response_type_follows_reward_and_response(trial in arb_trial()) {
        let row = classify_trial(&trial, None, &ClassifierConfig::default());
        let expected = match (trial.rewarded, row.response) {
            (Some(true), true) => ResponseType::Hit,
            (Some(true), false) => ResponseType::Miss,
            (Some(false), true) => ResponseType::FalseAlarm,
            (Some(false), false) => ResponseType::CorrectRejection,
            (None, _) => ResponseType::Other,
        };
        prop_assert_eq!(row.response_type, expected);
    }
}
