//! # Homecare Scheduler
//!
//! Fires the reminder pass once per wall-clock minute.
//!
//! The loop sleeps until the next minute boundary in local time, runs one pass, and awaits it
//! before sleeping again. A pass that overruns its minute therefore drops the boundaries it
//! missed instead of overlapping with the next pass. The scheduler also remembers the last
//! minute it fired, so two triggers within the same minute dispatch once.

use chrono::{Local, NaiveDateTime, TimeDelta, Timelike};
use homecare_core::{PassSummary, ReminderEvaluator};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Source of the current local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// The host's local time zone.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The pass ran. Individual dispatch failures are counted in the summary.
    Completed(PassSummary),
    /// This minute already fired; nothing was evaluated.
    DuplicateMinute,
    /// The pass could not run at all (e.g. the store was unavailable).
    Failed(String),
}

pub struct ReminderScheduler<C = LocalClock> {
    evaluator: Arc<ReminderEvaluator>,
    clock: C,
    last_fired_minute: Option<NaiveDateTime>,
}

impl ReminderScheduler<LocalClock> {
    pub fn new(evaluator: Arc<ReminderEvaluator>) -> Self {
        Self::with_clock(evaluator, LocalClock)
    }
}

impl<C: Clock> ReminderScheduler<C> {
    pub fn with_clock(evaluator: Arc<ReminderEvaluator>, clock: C) -> Self {
        Self {
            evaluator,
            clock,
            last_fired_minute: None,
        }
    }

    pub fn last_fired_minute(&self) -> Option<NaiveDateTime> {
        self.last_fired_minute
    }

    /// Runs one pass for `now` unless this minute has already fired.
    ///
    /// The minute is recorded before evaluating, so a pass that fails is not repeated within
    /// the same minute; the next minute's pass is the retry.
    pub async fn run_tick(&mut self, now: NaiveDateTime) -> TickOutcome {
        let minute = minute_of(now);
        if self.last_fired_minute == Some(minute) {
            tracing::debug!(%minute, "reminder pass already ran this minute");
            return TickOutcome::DuplicateMinute;
        }
        self.last_fired_minute = Some(minute);

        match self.evaluator.evaluate_due(now.time()).await {
            Ok(results) => {
                let summary = PassSummary::from_results(&results);
                tracing::info!(
                    at = %now.time().format("%H:%M:%S"),
                    due = summary.due,
                    sent = summary.sent,
                    failed = summary.failed,
                    skipped = summary.skipped,
                    "reminder pass complete"
                );
                TickOutcome::Completed(summary)
            }
            Err(e) => {
                tracing::error!(at = %now.time().format("%H:%M:%S"), "reminder pass failed: {}", e);
                TickOutcome::Failed(e.to_string())
            }
        }
    }

    /// Runs until `shutdown` resolves, firing at each minute boundary.
    ///
    /// A shutdown that arrives mid-pass takes effect once that pass has finished.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!("reminder scheduler started");

        loop {
            let wait = until_next_minute(self.clock.now());
            tokio::select! {
                () = &mut shutdown => break,
                () = tokio::time::sleep(wait) => {}
            }

            let now = self.clock.now();
            self.run_tick(now).await;
        }

        tracing::info!("reminder scheduler stopped");
    }
}

/// `now` truncated to the start of its minute.
pub fn minute_of(now: NaiveDateTime) -> NaiveDateTime {
    now - TimeDelta::seconds(i64::from(now.second()))
        - TimeDelta::nanoseconds(i64::from(now.nanosecond()))
}

/// Time left until the next minute boundary after `now`.
pub fn until_next_minute(now: NaiveDateTime) -> Duration {
    let next = minute_of(now) + TimeDelta::minutes(1);
    (next - now).to_std().unwrap_or(Duration::ZERO)
}
