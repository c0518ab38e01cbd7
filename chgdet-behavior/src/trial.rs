use chgdet_core::{ClassifiedTrial, ResponseType, Trial, TrialMetrics, TrialType};
use tracing::warn;

use crate::config::ClassifierConfig;

/// Trial type. The checks run in a fixed order and the first match wins.
pub fn classify(trial: &Trial) -> TrialType {
    if trial.change_time.is_none_or(f64::is_nan) {
        return if trial.lick_times.is_empty() {
            TrialType::Other
        } else {
            TrialType::Aborted
        };
    }
    match trial.rewarded {
        Some(true) => TrialType::Go,
        Some(false) => TrialType::Catch,
        None if trial.auto_rewarded => TrialType::Autorewarded,
        None => TrialType::Other,
    }
}

/// Time from the change to the first lick strictly later than `response_window.lower`.
pub fn response_latency(trial: &Trial) -> Option<f64> {
    let change = trial.change_time.filter(|t| t.is_finite())?;
    trial
        .lick_times
        .iter()
        .map(|lick| lick - change)
        .filter(|dt| *dt > trial.response_window.lower)
        .min_by(f64::total_cmp)
}

pub fn check_response(trial: &Trial, latency: Option<f64>) -> bool {
    trial.change_time.is_some_and(f64::is_finite)
        && latency.is_some_and(|l| trial.response_window.contains(l))
}

pub fn response_type(rewarded: Option<bool>, response: bool) -> ResponseType {
    match (rewarded, response) {
        (Some(true), true) => ResponseType::Hit,
        (Some(true), false) => ResponseType::Miss,
        (Some(false), true) => ResponseType::FalseAlarm,
        (Some(false), false) => ResponseType::CorrectRejection,
        (None, _) => ResponseType::Other,
    }
}

/// Classifies one trial. `next_start` is the start of the following trial, if any.
pub fn classify_trial(
    trial: &Trial,
    next_start: Option<f64>,
    config: &ClassifierConfig,
) -> ClassifiedTrial {
    let trial_type = classify(trial);
    let response_latency = response_latency(trial);
    let response = check_response(trial, response_latency);

    let trial_length = next_start
        .map(|next| next - trial.start_time)
        .filter(|len| *len >= 0.0 && *len <= config.max_trial_length_s)
        .unwrap_or(f64::NAN);

    let (reward_lick_count, reward_lick_latency) = match trial.reward_times.first() {
        Some(&reward) => {
            let licks: Vec<f64> = trial
                .lick_times
                .iter()
                .copied()
                .filter(|l| *l >= reward && *l < reward + config.reward_lick_window_s)
                .collect();
            let latency = licks.iter().copied().min_by(f64::total_cmp).map(|l| l - reward);
            (Some(licks.len()), latency)
        }
        None => (None, None),
    };

    ClassifiedTrial {
        trial: trial.clone(),
        trial_type,
        response,
        response_latency,
        response_type: response_type(trial.rewarded, response),
        change: trial_type == TrialType::Go,
        detect: response,
        trial_length,
        reward_lick_count,
        reward_lick_latency,
        metrics: TrialMetrics::default(),
    }
}

/// Classified trials plus the indices of trials that fit no category.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub trials: Vec<ClassifiedTrial>,
    pub ambiguous: Vec<usize>,
}

pub fn classify_trials(trials: &[Trial], config: &ClassifierConfig) -> Classification {
    let mut classified = Vec::with_capacity(trials.len());
    let mut ambiguous = Vec::new();
    for (i, trial) in trials.iter().enumerate() {
        let next_start = trials.get(i + 1).map(|t| t.start_time);
        let row = classify_trial(trial, next_start, config);
        if row.trial_type == TrialType::Other {
            warn!(
                trial = trial.trial_index,
                change_time = ?trial.change_time,
                rewarded = ?trial.rewarded,
                auto_rewarded = trial.auto_rewarded,
                "trial matches no trial type, labeled other"
            );
            ambiguous.push(trial.trial_index);
        }
        classified.push(row);
    }
    Classification {
        trials: classified,
        ambiguous,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chgdet_core::ResponseWindow;

    fn trial(change_time: Option<f64>, licks: &[f64], rewarded: Option<bool>) -> Trial {
        Trial {
            trial_index: 0,
            change_time,
            lick_times: licks.to_vec(),
            reward_times: Vec::new(),
            auto_rewarded: false,
            rewarded,
            response_window: ResponseWindow::default(),
            start_time: 0.0,
            end_time: 5.0,
        }
    }

    #[test]
    fn go_trial_with_early_and_valid_lick() {
        let t = trial(Some(2.0), &[2.05, 2.3], Some(true));
        let row = classify_trial(&t, Some(6.0), &ClassifierConfig::default());
        assert_eq!(row.trial_type, TrialType::Go);
        assert!((row.response_latency.unwrap() - 0.3).abs() < 1e-12);
        assert!(row.response);
        assert_eq!(row.response_type, ResponseType::Hit);
        assert!(row.change && row.detect);
        assert_eq!(row.trial_length, 6.0);
    }

    #[test]
    fn aborted_trial_has_no_response() {
        let t = trial(None, &[0.5], None);
        let row = classify_trial(&t, None, &ClassifierConfig::default());
        assert_eq!(row.trial_type, TrialType::Aborted);
        assert!(!row.response);
        assert_eq!(row.response_latency, None);
        assert_eq!(row.response_type, ResponseType::Other);
        assert!(row.trial_length.is_nan());
    }

    #[test]
    fn lick_exactly_at_lower_bound_is_excluded() {
        let t = trial(Some(1.0), &[1.0 + 0.15], Some(true));
        assert_eq!(response_latency(&t), None);
    }

    #[test]
    fn latency_past_upper_bound_is_a_miss() {
        let t = trial(Some(1.0), &[2.5], Some(true));
        let row = classify_trial(&t, None, &ClassifierConfig::default());
        assert!(row.response_latency.is_some());
        assert!(!row.response);
        assert_eq!(row.response_type, ResponseType::Miss);
    }

    #[test]
    fn catch_autorewarded_and_other() {
        assert_eq!(classify(&trial(Some(1.0), &[], Some(false))), TrialType::Catch);
        let mut auto = trial(Some(1.0), &[], None);
        auto.auto_rewarded = true;
        assert_eq!(classify(&auto), TrialType::Autorewarded);
        assert_eq!(classify(&trial(Some(1.0), &[], None)), TrialType::Other);
        assert_eq!(classify(&trial(Some(f64::NAN), &[], None)), TrialType::Other);
    }

    #[test]
    fn response_type_table() {
        assert_eq!(response_type(Some(true), true), ResponseType::Hit);
        assert_eq!(response_type(Some(true), false), ResponseType::Miss);
        assert_eq!(response_type(Some(false), true), ResponseType::FalseAlarm);
        assert_eq!(response_type(Some(false), false), ResponseType::CorrectRejection);
        assert_eq!(response_type(None, true), ResponseType::Other);
    }

    #[test]
    fn reward_licks_are_counted_from_first_reward() {
        let mut t = trial(Some(1.0), &[1.4, 1.6, 2.0, 6.0], Some(true));
        t.reward_times = vec![1.5];
        let row = classify_trial(&t, None, &ClassifierConfig::default());
        assert_eq!(row.reward_lick_count, Some(2));
        assert!((row.reward_lick_latency.unwrap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn other_trials_are_reported() {
        let mut trials = vec![trial(Some(1.0), &[], None), trial(Some(1.0), &[], Some(true))];
        trials[1].trial_index = 1;
        let out = classify_trials(&trials, &ClassifierConfig::default());
        assert_eq!(out.ambiguous, vec![0]);
        assert_eq!(out.trials.len(), 2);
    }

    #[test]
    fn overlong_trial_length_is_missing() {
        let t = trial(Some(1.0), &[], Some(true));
        let row = classify_trial(&t, Some(2000.0), &ClassifierConfig::default());
        assert!(row.trial_length.is_nan());
    }
}
