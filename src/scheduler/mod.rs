//! Periodic reconciliation per roster group.
//!
//! Each started group gets one background task driven by a fixed interval.
//! Every pass, automatic or manual, holds one scheduler-wide exclusion token,
//! so no two passes ever run at the same time.
//!
//! ```text
//! Idle ──start──▶ Scheduled ──tick──▶ Running ──done──▶ Scheduled
//!  ▲                 │                   │
//!  │               stop                stop (pass finishes first)
//!  │                 ▼                   ▼
//!  └── (cache) ◀── Cancelled ◀───────────┘   start re-arms
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Interval used when none is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Boxed future returned by a [`PassHandler`].
pub type PassFuture<'a, O> = Pin<Box<dyn Future<Output = O> + Send + 'a>>;

/// Runs one reconciliation pass for a group with its cached context.
///
/// The scheduler only sequences calls; what a pass does and how its errors
/// are reported is up to the handler.
pub trait PassHandler<C, O>: Send + Sync {
    /// Executes a pass for `group`.
    fn run_pass<'a>(&'a self, group: &'a str, context: &'a C) -> PassFuture<'a, O>;
}

/// Lifecycle of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupState {
    /// Known or unknown, with no timer armed.
    Idle,
    /// Timer armed; waiting for the next tick.
    Scheduled,
    /// A pass for this group holds the exclusion token.
    Running,
    /// Stopped. Only `start` re-arms it.
    Cancelled,
}

impl fmt::Display for GroupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Scheduled => "scheduled",
            Self::Running => "running",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// What a control call did. Repeated calls are no-ops, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A timer was armed for the group.
    Armed,
    /// The group was already scheduled; its context was replaced.
    AlreadyScheduled,
    /// The group was cancelled.
    Stopped,
    /// The group had no armed timer.
    AlreadyStopped,
    /// The replay context was stored without touching the timer.
    Cached,
}

/// Misuse of the scheduler that cannot be treated as a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// Group keys must contain something besides whitespace.
    #[error("group key must not be empty")]
    EmptyGroupKey,
    /// A zero interval would spin.
    #[error("interval must be greater than zero")]
    InvalidInterval,
}

struct GroupSlot<C> {
    state: GroupState,
    context: C,
    generation: u64,
    stop: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

struct Shared<C, O> {
    groups: Mutex<HashMap<String, GroupSlot<C>>>,
    token: tokio::sync::Mutex<()>,
    handler: Arc<dyn PassHandler<C, O>>,
}

impl<C: Clone, O> Shared<C, O> {
    fn groups(&self) -> MutexGuard<'_, HashMap<String, GroupSlot<C>>> {
        self.groups.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves a scheduled group to `Running` and hands out its context.
    fn begin_tick(&self, group: &str, generation: u64) -> Option<C> {
        let mut groups = self.groups();
        let slot = groups.get_mut(group)?;
        if slot.generation != generation || slot.state != GroupState::Scheduled {
            return None;
        }
        slot.state = GroupState::Running;
        Some(slot.context.clone())
    }

    /// Returns `true` when the group should keep ticking.
    fn finish_tick(&self, group: &str, generation: u64) -> bool {
        let mut groups = self.groups();
        match groups.get_mut(group) {
            Some(slot) if slot.generation == generation && slot.state == GroupState::Running => {
                slot.state = GroupState::Scheduled;
                true
            }
            _ => false,
        }
    }
}

/// Schedules reconciliation passes per group under one exclusion token.
///
/// `C` is the replay context handed to every pass (for example which role to
/// grant); `O` is whatever the handler returns. Must be used from within a
/// tokio runtime.
pub struct ReconciliationScheduler<C, O = ()> {
    shared: Arc<Shared<C, O>>,
    period: Duration,
    next_generation: Mutex<u64>,
}

impl<C, O> ReconciliationScheduler<C, O>
where
    C: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    /// Creates a scheduler with the default 15 minute interval.
    #[must_use]
    pub fn new(handler: Arc<dyn PassHandler<C, O>>) -> Self {
        Self::build(handler, DEFAULT_INTERVAL)
    }

    /// Creates a scheduler with a custom interval.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidInterval`] for a zero interval.
    pub fn with_interval(
        handler: Arc<dyn PassHandler<C, O>>,
        period: Duration,
    ) -> Result<Self, SchedulerError> {
        if period.is_zero() {
            return Err(SchedulerError::InvalidInterval);
        }
        Ok(Self::build(handler, period))
    }

    fn build(handler: Arc<dyn PassHandler<C, O>>, period: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                groups: Mutex::new(HashMap::new()),
                token: tokio::sync::Mutex::new(()),
                handler,
            }),
            period,
            next_generation: Mutex::new(0),
        }
    }

    /// The tick interval.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Arms the periodic timer for `group` and stores `context` for replay.
    ///
    /// The first pass is queued immediately. Starting a group whose timer is
    /// already armed only replaces its context.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::EmptyGroupKey`] for a blank key.
    pub fn start(&self, group: &str, context: C) -> Result<Transition, SchedulerError> {
        let group = group_key(group)?;
        let mut groups = self.shared.groups();

        // A manual pass marks an unarmed group `Running` too; only a live
        // stop sender means a timer exists.
        let mut manual_pass = false;
        if let Some(slot) = groups.get_mut(group) {
            if slot.stop.is_some() {
                slot.context = context;
                debug!(group, "already scheduled; context replaced");
                return Ok(Transition::AlreadyScheduled);
            }
            manual_pass = slot.state == GroupState::Running;
        }

        let generation = self.bump_generation();
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(drive(
            Arc::clone(&self.shared),
            group.to_string(),
            generation,
            self.period,
            stop_rx,
        ));

        // A cancelled slot may still own a task finishing its last pass; it
        // exits on its own once it sees the generation change.
        groups.insert(
            group.to_string(),
            GroupSlot {
                state: if manual_pass { GroupState::Running } else { GroupState::Scheduled },
                context,
                generation,
                stop: Some(stop_tx),
                task: Some(task),
            },
        );
        info!(group, period_secs = self.period.as_secs(), "reconciliation scheduled");
        Ok(Transition::Armed)
    }

    /// Cancels future ticks for `group`. A pass already running finishes.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::EmptyGroupKey`] for a blank key.
    pub fn stop(&self, group: &str) -> Result<Transition, SchedulerError> {
        let group = group_key(group)?;
        let mut groups = self.shared.groups();
        let Some(slot) = groups.get_mut(group) else {
            return Ok(Transition::AlreadyStopped);
        };
        if slot.stop.is_none() {
            return Ok(Transition::AlreadyStopped);
        }
        cancel(slot);
        info!(group, "reconciliation stopped");
        Ok(Transition::Stopped)
    }

    /// Replaces the replay context for `group` without touching its timer.
    ///
    /// An unknown group is registered as [`GroupState::Idle`].
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::EmptyGroupKey`] for a blank key.
    pub fn cache(&self, group: &str, context: C) -> Result<Transition, SchedulerError> {
        let group = group_key(group)?;
        let mut groups = self.shared.groups();
        match groups.get_mut(group) {
            Some(slot) => slot.context = context,
            None => {
                groups.insert(
                    group.to_string(),
                    GroupSlot {
                        state: GroupState::Idle,
                        context,
                        generation: 0,
                        stop: None,
                        task: None,
                    },
                );
            }
        }
        debug!(group, "context cached");
        Ok(Transition::Cached)
    }

    /// Runs a manual pass for `group` right away, under the exclusion token.
    ///
    /// Waits for any pass already in flight. The context is cached first, so
    /// later scheduled ticks replay it.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::EmptyGroupKey`] for a blank key.
    pub async fn run_now(&self, group: &str, context: C) -> Result<O, SchedulerError> {
        let group = group_key(group)?;
        self.cache(group, context.clone())?;

        let guard = self.shared.token.lock().await;
        let previous = {
            let mut groups = self.shared.groups();
            groups
                .get_mut(group)
                .map(|slot| std::mem::replace(&mut slot.state, GroupState::Running))
        };
        debug!(group, "manual pass");
        let output = self.shared.handler.run_pass(group, &context).await;
        {
            // `start` or `stop` may have run meanwhile; the timer decides.
            let mut groups = self.shared.groups();
            if let Some(slot) = groups.get_mut(group) {
                if slot.state == GroupState::Running {
                    slot.state = if slot.stop.is_some() {
                        GroupState::Scheduled
                    } else {
                        previous.unwrap_or(GroupState::Idle)
                    };
                }
            }
        }
        drop(guard);
        Ok(output)
    }

    /// Current state of `group`; unknown groups are [`GroupState::Idle`].
    #[must_use]
    pub fn state(&self, group: &str) -> GroupState {
        self.shared.groups().get(group).map_or(GroupState::Idle, |slot| slot.state)
    }

    /// Groups currently scheduled or running, sorted.
    #[must_use]
    pub fn active_groups(&self) -> Vec<String> {
        let mut active: Vec<String> = self
            .shared
            .groups()
            .iter()
            .filter(|(_, slot)| matches!(slot.state, GroupState::Scheduled | GroupState::Running))
            .map(|(group, _)| group.clone())
            .collect();
        active.sort();
        active
    }

    /// Stops every group and waits for their tasks to exit.
    pub async fn shutdown(&self) {
        let tasks: Vec<(String, JoinHandle<()>)> = {
            let mut groups = self.shared.groups();
            groups
                .iter_mut()
                .filter_map(|(group, slot)| {
                    if slot.stop.is_some() {
                        cancel(slot);
                    }
                    slot.task.take().map(|task| (group.clone(), task))
                })
                .collect()
        };

        for (group, task) in tasks {
            if let Err(err) = task.await {
                warn!(group = %group, error = %err, "scheduler task ended abnormally");
            }
        }
        info!("scheduler shut down");
    }

    fn bump_generation(&self) -> u64 {
        let mut next = self.next_generation.lock().unwrap_or_else(PoisonError::into_inner);
        *next += 1;
        *next
    }
}

fn group_key(group: &str) -> Result<&str, SchedulerError> {
    let trimmed = group.trim();
    if trimmed.is_empty() {
        Err(SchedulerError::EmptyGroupKey)
    } else {
        Ok(trimmed)
    }
}

fn cancel<C>(slot: &mut GroupSlot<C>) {
    slot.state = GroupState::Cancelled;
    if let Some(stop) = slot.stop.take() {
        // The task may already be gone.
        let _ = stop.send(true);
    }
}

async fn drive<C, O>(
    shared: Arc<Shared<C, O>>,
    group: String,
    generation: u64,
    period: Duration,
    mut stop: watch::Receiver<bool>,
) where
    C: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => break,
            _ = ticker.tick() => {}
        }

        // Waits behind any other pass; ticks are delayed, never dropped.
        let guard = shared.token.lock().await;
        let Some(context) = shared.begin_tick(&group, generation) else {
            break;
        };
        debug!(group = %group, "scheduled pass");
        let _ = shared.handler.run_pass(&group, &context).await;
        drop(guard);

        if !shared.finish_tick(&group, generation) {
            break;
        }
    }
    debug!(group = %group, generation, "scheduler task exiting");
}
