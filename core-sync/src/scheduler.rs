//! # Sync Scheduler
//!
//! Owns the triggering policy for sync runs: one named periodic slot with
//! declarative execution constraints, unordered ad-hoc triggers, and
//! exponential backoff on failure.
//!
//! ## Semantics
//!
//! - The periodic slot follows a **keep-existing** policy: scheduling while
//!   a schedule is already active is a no-op. Changing the interval requires
//!   an explicit `cancel()` first.
//! - Immediate runs carry no constraints, are never deduplicated, and are
//!   not mutually exclusive with a concurrently executing periodic run.
//! - On a `Retry` outcome the next attempt is delayed with exponential
//!   backoff. The backoff ceiling is bounded: after
//!   [`BackoffPolicy::max_attempts`] consecutive failures the scheduler
//!   stops retrying the streak and waits for the next trigger instead of
//!   retrying forever.
//! - The periodic slot never overlaps itself (runs execute sequentially
//!   inside one loop); ad-hoc runs may overlap anything.

use crate::task::{SyncRunner, TaskOutcome};
use bridge_traits::background::{HostConditions, TaskConstraints};
use bridge_traits::time::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Backoff policy applied after a `Retry` outcome.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay before the first retry (host-defined minimum)
    pub initial_delay: Duration,
    /// Upper bound on any single backoff delay
    pub max_delay: Duration,
    /// Consecutive attempts per failure streak before giving up until the
    /// next trigger
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(3600),
            max_attempts: 5,
        }
    }
}

/// The stored periodic schedule, inspectable while active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodicSchedule {
    /// Repeat interval
    pub interval: Duration,
    /// Flex window, advisory: the host may run the task anywhere inside the
    /// tail of the period. This in-process scheduler runs at the boundary.
    pub flex: Duration,
    /// Declarative constraints evaluated before each periodic run
    pub constraints: TaskConstraints,
}

/// Scheduler observability snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerStatus {
    /// Whether a periodic schedule is currently active
    pub periodic_active: bool,
    /// Unix millis of the most recent run, if any
    pub last_run_at: Option<i64>,
    /// Outcome of the most recent run, if any
    pub last_outcome: Option<TaskOutcome>,
}

#[derive(Debug, Default)]
struct RunState {
    last_run_at: Option<i64>,
    last_outcome: Option<TaskOutcome>,
}

struct PeriodicSlot {
    schedule: PeriodicSchedule,
    cancel: CancellationToken,
    _handle: JoinHandle<()>,
}

/// Scheduler driving a single injected [`SyncRunner`].
pub struct SyncScheduler {
    runner: Arc<dyn SyncRunner>,
    conditions: Option<Arc<dyn HostConditions>>,
    backoff: BackoffPolicy,
    clock: Arc<dyn Clock>,
    periodic: Mutex<Option<PeriodicSlot>>,
    adhoc_root: Mutex<CancellationToken>,
    state: Arc<RwLock<RunState>>,
}

impl SyncScheduler {
    /// Create a scheduler for the given runner.
    ///
    /// `conditions` is the optional host probe for constraint evaluation;
    /// when absent, constraints are assumed satisfied.
    pub fn new(
        runner: Arc<dyn SyncRunner>,
        conditions: Option<Arc<dyn HostConditions>>,
        backoff: BackoffPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            runner,
            conditions,
            backoff,
            clock,
            periodic: Mutex::new(None),
            adhoc_root: Mutex::new(CancellationToken::new()),
            state: Arc::new(RwLock::new(RunState::default())),
        }
    }

    /// Schedule the recurring sync.
    ///
    /// Keep-existing policy: if a periodic schedule is already active this
    /// call does nothing and the stored interval and constraints remain in
    /// effect. Call [`cancel`](Self::cancel) first to replace them.
    pub async fn schedule_periodic(
        &self,
        interval: Duration,
        flex: Duration,
        constraints: TaskConstraints,
    ) {
        let mut slot = self.periodic.lock().await;
        if slot.is_some() {
            debug!("Periodic sync already scheduled; keeping existing schedule");
            return;
        }

        info!(
            interval_secs = interval.as_secs(),
            flex_secs = flex.as_secs(),
            "Scheduling periodic sync"
        );

        let schedule = PeriodicSchedule {
            interval,
            flex,
            constraints,
        };
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(Self::run_periodic_loop(
            Arc::clone(&self.runner),
            self.conditions.clone(),
            self.backoff.clone(),
            Arc::clone(&self.clock),
            Arc::clone(&self.state),
            schedule.clone(),
            cancel.clone(),
        ));

        *slot = Some(PeriodicSlot {
            schedule,
            cancel,
            _handle: handle,
        });
    }

    /// Inspect the currently stored periodic schedule, if any.
    pub async fn periodic_schedule(&self) -> Option<PeriodicSchedule> {
        let slot = self.periodic.lock().await;
        slot.as_ref().map(|s| s.schedule.clone())
    }

    /// Enqueue one ad-hoc run, starting immediately.
    ///
    /// Carries no constraints, is not deduplicated, and does not interact
    /// with the periodic schedule: back-to-back or overlapping runs are the
    /// caller's choice to make.
    pub async fn schedule_immediate(&self) {
        let cancel = {
            let root = self.adhoc_root.lock().await;
            root.child_token()
        };

        debug!("Scheduling immediate sync");

        let runner = Arc::clone(&self.runner);
        let backoff = self.backoff.clone();
        let clock = Arc::clone(&self.clock);
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            Self::run_with_backoff(&runner, &backoff, &clock, &state, &cancel).await;
        });
    }

    /// Remove the periodic schedule and cancel queued or in-flight ad-hoc
    /// runs.
    ///
    /// Cancellation is cooperative: an executing run stops at its next I/O
    /// checkpoint and may leave the index partially reconciled.
    pub async fn cancel(&self) {
        info!("Cancelling scheduled syncs");

        let mut slot = self.periodic.lock().await;
        if let Some(slot) = slot.take() {
            slot.cancel.cancel();
        }

        let mut root = self.adhoc_root.lock().await;
        root.cancel();
        *root = CancellationToken::new();
    }

    /// Current scheduler status.
    pub async fn status(&self) -> SchedulerStatus {
        let periodic_active = self.periodic.lock().await.is_some();
        let state = self.state.read().await;

        SchedulerStatus {
            periodic_active,
            last_run_at: state.last_run_at,
            last_outcome: state.last_outcome,
        }
    }

    async fn run_periodic_loop(
        runner: Arc<dyn SyncRunner>,
        conditions: Option<Arc<dyn HostConditions>>,
        backoff: BackoffPolicy,
        clock: Arc<dyn Clock>,
        state: Arc<RwLock<RunState>>,
        schedule: PeriodicSchedule,
        cancel: CancellationToken,
    ) {
        let mut ticker = interval(schedule.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the periodic slot should
        // first run one full interval after scheduling.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Periodic sync loop stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if !Self::constraints_satisfied(&conditions, &schedule.constraints).await {
                        debug!("Constraints not satisfied; skipping periodic run");
                        continue;
                    }
                    Self::run_with_backoff(&runner, &backoff, &clock, &state, &cancel).await;
                }
            }
        }
    }

    async fn run_with_backoff(
        runner: &Arc<dyn SyncRunner>,
        backoff: &BackoffPolicy,
        clock: &Arc<dyn Clock>,
        state: &Arc<RwLock<RunState>>,
        cancel: &CancellationToken,
    ) {
        let mut attempts = 0u32;
        let mut delay = backoff.initial_delay;

        loop {
            let outcome = runner.run(cancel).await;
            attempts += 1;

            {
                let mut run_state = state.write().await;
                run_state.last_run_at = Some(clock.unix_timestamp_millis());
                run_state.last_outcome = Some(outcome);
            }

            match outcome {
                TaskOutcome::Success => break,
                TaskOutcome::Retry => {
                    if cancel.is_cancelled() {
                        break;
                    }
                    if attempts >= backoff.max_attempts {
                        warn!(attempts, "Retry ceiling reached; waiting for next trigger");
                        break;
                    }

                    debug!(
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Sync failed; backing off"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = sleep(delay) => {}
                    }
                    delay = (delay * 2).min(backoff.max_delay);
                }
            }
        }
    }

    async fn constraints_satisfied(
        conditions: &Option<Arc<dyn HostConditions>>,
        constraints: &TaskConstraints,
    ) -> bool {
        let Some(probe) = conditions else {
            if *constraints != TaskConstraints::none() {
                warn!("Constraints declared but no host probe wired; assuming satisfied");
            }
            return true;
        };

        match probe.satisfied(constraints).await {
            Ok(satisfied) => satisfied,
            Err(err) => {
                warn!(error = %err, "Host conditions probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::time::SystemClock;
    use bridge_traits::error::Result as BridgeResult;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Runner that fails its first `fail_first` runs, then succeeds.
    struct StubRunner {
        calls: AtomicUsize,
        fail_first: usize,
    }

    impl StubRunner {
        fn new(fail_first: usize) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail_first,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SyncRunner for StubRunner {
        async fn run(&self, _cancel: &CancellationToken) -> TaskOutcome {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                TaskOutcome::Retry
            } else {
                TaskOutcome::Success
            }
        }
    }

    struct FlagConditions {
        eligible: Arc<AtomicBool>,
    }

    #[async_trait]
    impl HostConditions for FlagConditions {
        async fn satisfied(&self, _constraints: &TaskConstraints) -> BridgeResult<bool> {
            Ok(self.eligible.load(Ordering::SeqCst))
        }
    }

    fn fast_backoff() -> BackoffPolicy {
        BackoffPolicy {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(40),
            max_attempts: 5,
        }
    }

    fn scheduler(
        runner: Arc<StubRunner>,
        conditions: Option<Arc<dyn HostConditions>>,
        backoff: BackoffPolicy,
    ) -> SyncScheduler {
        SyncScheduler::new(runner, conditions, backoff, Arc::new(SystemClock))
    }

    #[tokio::test]
    async fn test_periodic_runs_repeatedly() {
        let runner = StubRunner::new(0);
        let sched = scheduler(Arc::clone(&runner), None, fast_backoff());

        sched
            .schedule_periodic(
                Duration::from_millis(30),
                Duration::ZERO,
                TaskConstraints::none(),
            )
            .await;

        sleep(Duration::from_millis(120)).await;
        assert!(runner.calls() >= 2);

        sched.cancel().await;
    }

    #[tokio::test]
    async fn test_keep_existing_policy() {
        let runner = StubRunner::new(0);
        let sched = scheduler(runner, None, fast_backoff());

        sched
            .schedule_periodic(
                Duration::from_secs(60),
                Duration::from_secs(5),
                TaskConstraints::none(),
            )
            .await;
        sched
            .schedule_periodic(
                Duration::from_secs(300),
                Duration::from_secs(30),
                TaskConstraints::default(),
            )
            .await;

        let schedule = sched.periodic_schedule().await.unwrap();
        assert_eq!(schedule.interval, Duration::from_secs(60));
        assert_eq!(schedule.flex, Duration::from_secs(5));
        assert_eq!(schedule.constraints, TaskConstraints::none());

        sched.cancel().await;
    }

    #[tokio::test]
    async fn test_immediate_runs_without_waiting() {
        let runner = StubRunner::new(0);
        let sched = scheduler(Arc::clone(&runner), None, fast_backoff());

        sched.schedule_immediate().await;
        sleep(Duration::from_millis(50)).await;

        assert_eq!(runner.calls(), 1);

        let status = sched.status().await;
        assert!(!status.periodic_active);
        assert_eq!(status.last_outcome, Some(TaskOutcome::Success));
        assert!(status.last_run_at.is_some());
    }

    #[tokio::test]
    async fn test_immediate_triggers_are_not_deduplicated() {
        let runner = StubRunner::new(0);
        let sched = scheduler(Arc::clone(&runner), None, fast_backoff());

        sched.schedule_immediate().await;
        sched.schedule_immediate().await;
        sched.schedule_immediate().await;
        sleep(Duration::from_millis(80)).await;

        assert_eq!(runner.calls(), 3);
    }

    #[tokio::test]
    async fn test_backoff_retries_until_success() {
        let runner = StubRunner::new(2);
        let sched = scheduler(Arc::clone(&runner), None, fast_backoff());

        sched.schedule_immediate().await;
        sleep(Duration::from_millis(200)).await;

        assert_eq!(runner.calls(), 3);
        assert_eq!(
            sched.status().await.last_outcome,
            Some(TaskOutcome::Success)
        );
    }

    #[tokio::test]
    async fn test_backoff_ceiling_stops_retrying() {
        let runner = StubRunner::new(usize::MAX);
        let backoff = BackoffPolicy {
            max_attempts: 2,
            ..fast_backoff()
        };
        let sched = scheduler(Arc::clone(&runner), None, backoff);

        sched.schedule_immediate().await;
        sleep(Duration::from_millis(200)).await;

        assert_eq!(runner.calls(), 2);
        assert_eq!(sched.status().await.last_outcome, Some(TaskOutcome::Retry));
    }

    #[tokio::test]
    async fn test_cancel_stops_periodic() {
        let runner = StubRunner::new(0);
        let sched = scheduler(Arc::clone(&runner), None, fast_backoff());

        sched
            .schedule_periodic(
                Duration::from_millis(20),
                Duration::ZERO,
                TaskConstraints::none(),
            )
            .await;
        sleep(Duration::from_millis(70)).await;
        sched.cancel().await;
        sleep(Duration::from_millis(30)).await;

        let calls_after_cancel = runner.calls();
        sleep(Duration::from_millis(100)).await;
        assert_eq!(runner.calls(), calls_after_cancel);
        assert!(!sched.status().await.periodic_active);
    }

    #[tokio::test]
    async fn test_constraints_gate_periodic_runs() {
        let eligible = Arc::new(AtomicBool::new(false));
        let conditions: Arc<dyn HostConditions> = Arc::new(FlagConditions {
            eligible: Arc::clone(&eligible),
        });
        let runner = StubRunner::new(0);
        let sched = scheduler(Arc::clone(&runner), Some(conditions), fast_backoff());

        sched
            .schedule_periodic(
                Duration::from_millis(25),
                Duration::ZERO,
                TaskConstraints::default(),
            )
            .await;

        sleep(Duration::from_millis(100)).await;
        assert_eq!(runner.calls(), 0);

        eligible.store(true, Ordering::SeqCst);
        sleep(Duration::from_millis(100)).await;
        assert!(runner.calls() >= 1);

        sched.cancel().await;
    }

    #[tokio::test]
    async fn test_immediate_ignores_constraints() {
        let eligible = Arc::new(AtomicBool::new(false));
        let conditions: Arc<dyn HostConditions> = Arc::new(FlagConditions {
            eligible: Arc::clone(&eligible),
        });
        let runner = StubRunner::new(0);
        let sched = scheduler(Arc::clone(&runner), Some(conditions), fast_backoff());

        sched.schedule_immediate().await;
        sleep(Duration::from_millis(50)).await;

        assert_eq!(runner.calls(), 1);
    }
}
