use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{Access, TaskError, TaskRunner};
use crate::config::Config;
use crate::metrics::SCHEDULED_TASK_DECISIONS;
use crate::store::OptionStore;

/// Option holding the unix time of the last scheduled-task run.
pub const LAST_RUN_OPTION: &str = "lastTrackerCronRun";

/// Option toggling browser-triggered maintenance (`"1"` / `"0"`).
pub const BROWSER_TRIGGER_OPTION: &str = "enableBrowserTriggerArchiving";

/// Outcome of one gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    /// Interval is zero or triggering is switched off.
    Disabled,
    /// Interval not elapsed yet; `next_run` is unix seconds.
    NotDue { next_run: i64 },
    /// Tasks were executed; the next run is due at `next_run`.
    Ran { next_run: i64 },
}

impl GateDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateDecision::Disabled => "disabled",
            GateDecision::NotDue { .. } => "not_due",
            GateDecision::Ran { .. } => "ran",
        }
    }
}

/// Debounced trigger for periodic maintenance.
///
/// The lock lives in the shared option store and is read then written
/// without any atomic compare, so concurrent hits that both read a stale
/// `lastRun` may both run the tasks. Writing `lastRun` before running keeps
/// that window short.
pub struct ScheduledTaskGate {
    options: Arc<dyn OptionStore>,
    runner: Arc<dyn TaskRunner>,
    min_interval: i64,
    trigger_default: bool,
    force: bool,
}

impl ScheduledTaskGate {
    pub fn new(
        options: Arc<dyn OptionStore>,
        runner: Arc<dyn TaskRunner>,
        min_interval: i64,
        trigger_default: bool,
    ) -> Self {
        Self {
            options,
            runner,
            min_interval,
            trigger_default,
            force: false,
        }
    }

    pub fn from_config(
        config: &Config,
        options: Arc<dyn OptionStore>,
        runner: Arc<dyn TaskRunner>,
    ) -> Self {
        Self::new(
            options,
            runner,
            config.tracker.scheduled_tasks_min_interval,
            config.general.enable_browser_archiving_triggering,
        )
        .with_force(config.tracker.debug_force_scheduled_tasks)
    }

    /// Run on every evaluation regardless of the interval.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Decide whether maintenance is due at `now` and run it if so.
    pub fn evaluate(&self, now: DateTime<Utc>, access: &Access) -> Result<GateDecision, TaskError> {
        let result = self.evaluate_inner(now, access);
        let label = match &result {
            Ok(decision) => decision.as_str(),
            Err(_) => "failed",
        };
        SCHEDULED_TASK_DECISIONS.with_label_values(&[label]).inc();
        result
    }

    fn evaluate_inner(&self, now: DateTime<Utc>, access: &Access) -> Result<GateDecision, TaskError> {
        if self.min_interval <= 0 || !self.trigger_enabled()? {
            debug!("Scheduled tasks are not triggered by tracker requests");
            return Ok(GateDecision::Disabled);
        }

        let now = now.timestamp();
        let last_run = self.last_run()?;
        let next_run = last_run.map_or(now, |last| last.saturating_add(self.min_interval));

        if last_run.is_some() && now < next_run && !self.force {
            debug!(next_run, "Scheduled tasks not due yet");
            return Ok(GateDecision::NotDue { next_run });
        }

        self.options.set_option(LAST_RUN_OPTION, &now.to_string())?;

        info!(last_run = ?last_run, forced = self.force, "Running scheduled tasks");
        {
            let _guard = access.elevate();
            self.runner.run_scheduled_tasks(access)?;
        }

        Ok(GateDecision::Ran {
            next_run: now.saturating_add(self.min_interval),
        })
    }

    fn trigger_enabled(&self) -> Result<bool, TaskError> {
        Ok(match self.options.get_option(BROWSER_TRIGGER_OPTION)? {
            Some(value) => matches!(value.trim(), "1" | "true"),
            None => self.trigger_default,
        })
    }

    fn last_run(&self) -> Result<Option<i64>, TaskError> {
        let Some(raw) = self.options.get_option(LAST_RUN_OPTION)? else {
            return Ok(None);
        };
        match raw.trim().parse::<i64>() {
            Ok(ts) => Ok(Some(ts)),
            Err(_) => {
                warn!(value = %raw, "Ignoring unreadable {}", LAST_RUN_OPTION);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteOptionStore;
    use crate::testing::{MemoryOptionStore, MockTaskRunner};
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn gate(options: Arc<dyn OptionStore>, runner: Arc<MockTaskRunner>, interval: i64) -> ScheduledTaskGate {
        ScheduledTaskGate::new(options, runner, interval, true)
    }

    #[test]
    fn test_first_evaluation_runs() {
        let options = Arc::new(SqliteOptionStore::in_memory().unwrap());
        let runner = Arc::new(MockTaskRunner::new());
        let gate = gate(options.clone(), runner.clone(), 3600);

        let decision = gate.evaluate(at(1_000), &Access::new()).unwrap();
        assert_eq!(decision, GateDecision::Ran { next_run: 4_600 });
        assert_eq!(runner.run_count(), 1);
        assert_eq!(options.get_option(LAST_RUN_OPTION).unwrap().as_deref(), Some("1000"));
    }

    #[test]
    fn test_debounced_within_interval() {
        let options = Arc::new(SqliteOptionStore::in_memory().unwrap());
        let runner = Arc::new(MockTaskRunner::new());
        let gate = gate(options, runner.clone(), 3600);
        let access = Access::new();

        gate.evaluate(at(1_000), &access).unwrap();
        let decision = gate.evaluate(at(2_000), &access).unwrap();
        assert_eq!(decision, GateDecision::NotDue { next_run: 4_600 });

        let decision = gate.evaluate(at(4_600), &access).unwrap();
        assert_eq!(decision, GateDecision::Ran { next_run: 8_200 });
        assert_eq!(runner.run_count(), 2);
    }

    #[test]
    fn test_disabled_by_interval_or_option() {
        let options = Arc::new(SqliteOptionStore::in_memory().unwrap());
        let runner = Arc::new(MockTaskRunner::new());

        let zero = gate(options.clone(), runner.clone(), 0);
        assert_eq!(zero.evaluate(at(1), &Access::new()).unwrap(), GateDecision::Disabled);

        options.set_option(BROWSER_TRIGGER_OPTION, "0").unwrap();
        let off = gate(options.clone(), runner.clone(), 60);
        assert_eq!(off.evaluate(at(1), &Access::new()).unwrap(), GateDecision::Disabled);
        assert_eq!(runner.run_count(), 0);
        assert!(options.get_option(LAST_RUN_OPTION).unwrap().is_none());
    }

    #[test]
    fn test_config_default_for_trigger_flag() {
        let options = Arc::new(SqliteOptionStore::in_memory().unwrap());
        let runner = Arc::new(MockTaskRunner::new());
        let gate = ScheduledTaskGate::new(options.clone(), runner.clone(), 60, false);
        assert_eq!(gate.evaluate(at(1), &Access::new()).unwrap(), GateDecision::Disabled);

        options.set_option(BROWSER_TRIGGER_OPTION, "1").unwrap();
        assert!(matches!(gate.evaluate(at(1), &Access::new()).unwrap(), GateDecision::Ran { .. }));
    }

    #[test]
    fn test_force_ignores_interval() {
        let options = Arc::new(SqliteOptionStore::in_memory().unwrap());
        let runner = Arc::new(MockTaskRunner::new());
        let gate = gate(options, runner.clone(), 3600).with_force(true);
        let access = Access::new();

        gate.evaluate(at(1_000), &access).unwrap();
        gate.evaluate(at(1_001), &access).unwrap();
        assert_eq!(runner.run_count(), 2);
    }

    #[test]
    fn test_unreadable_last_run_counts_as_never() {
        let options = Arc::new(SqliteOptionStore::in_memory().unwrap());
        options.set_option(LAST_RUN_OPTION, "garbage").unwrap();
        let runner = Arc::new(MockTaskRunner::new());
        let gate = gate(options, runner.clone(), 3600);

        assert!(matches!(gate.evaluate(at(5), &Access::new()).unwrap(), GateDecision::Ran { .. }));
    }

    #[test]
    fn test_lock_written_before_tasks_run_and_privilege_restored() {
        let options = Arc::new(SqliteOptionStore::in_memory().unwrap());
        let runner = Arc::new(MockTaskRunner::new());
        runner.observe_option(options.clone(), LAST_RUN_OPTION);
        runner.fail_with("disk full");
        let gate = gate(options, runner.clone(), 3600);
        let access = Access::new();

        let result = gate.evaluate(at(7_000), &access);
        assert!(result.is_err());
        assert_eq!(runner.observed_values(), vec![Some("7000".to_string())]);
        assert_eq!(runner.superuser_during_runs(), vec![true]);
        assert!(!access.is_superuser());
    }

    #[test]
    fn test_stale_reads_run_a_bounded_number_of_times() {
        // Both evaluations read before either write lands.
        let options = Arc::new(MemoryOptionStore::new());
        options.drop_writes(true);
        let runner = Arc::new(MockTaskRunner::new());
        let gate = gate(options, runner.clone(), 3600);

        gate.evaluate(at(1_000), &Access::new()).unwrap();
        gate.evaluate(at(1_001), &Access::new()).unwrap();

        let runs = runner.run_count();
        assert!((1..=2).contains(&runs));
    }
}
