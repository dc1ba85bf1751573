// src/services/task_orchestrator.rs
//
// Task Orchestrator - the single background task slot
//
// CRITICAL RULES:
// - At most one task at a time; a second start is rejected, never queued
// - is_running flips back to false only when the task finishes (or its worker dies)
// - Per-record failures are counted and recorded, they never stop the task
// - Status is observed by polling; the lock is never held across an await
// - Scan and reindex hold an ExclusiveGuard for their whole run; no task starts meanwhile
// - Lock order is status, then exclusive

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::domain::{PostId, RecentRecord, TaskKind, TaskPhase, TaskStatus, TransitionOrigin};
use crate::error::{AppError, AppResult};
use crate::events::{EventBus, TaskFinished, TaskStarted};
use crate::services::lifecycle_service::{LifecycleService, RecordOutcome};

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub worker_count: usize,
    /// Pause a worker takes after each target
    pub request_delay: Duration,
    pub recent_capacity: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            worker_count: 2,
            request_delay: Duration::from_millis(500),
            recent_capacity: 10,
        }
    }
}

pub struct TaskOrchestrator {
    lifecycle: Arc<LifecycleService>,
    event_bus: Arc<EventBus>,
    status: Arc<Mutex<TaskStatus>>,
    /// Name of the synchronous operation holding the slot, if any
    exclusive: Arc<Mutex<Option<&'static str>>>,
    settings: OrchestratorSettings,
}

/// Keeps background tasks out while a synchronous store-wide operation runs.
/// The slot is released when the guard is dropped.
#[must_use = "the slot is released as soon as the guard is dropped"]
pub struct ExclusiveGuard {
    slot: Arc<Mutex<Option<&'static str>>>,
}

impl Drop for ExclusiveGuard {
    fn drop(&mut self) {
        *lock(&self.slot) = None;
    }
}

impl TaskOrchestrator {
    pub fn new(
        lifecycle: Arc<LifecycleService>,
        event_bus: Arc<EventBus>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            lifecycle,
            event_bus,
            status: Arc::new(Mutex::new(TaskStatus::idle())),
            exclusive: Arc::new(Mutex::new(None)),
            settings,
        }
    }

    fn lock_status(&self) -> MutexGuard<'_, TaskStatus> {
        lock(&self.status)
    }

    /// Snapshot of the current task state
    pub fn poll(&self) -> TaskStatus {
        self.lock_status().clone()
    }

    /// Take the recent-completions buffer, leaving it empty
    pub fn take_recent(&self) -> Vec<RecentRecord> {
        self.lock_status().recent.drain(..).collect()
    }

    pub fn is_running(&self) -> bool {
        self.lock_status().is_running
    }

    /// Claim the slot for `operation` until the returned guard is dropped.
    ///
    /// Fails with `TaskAlreadyRunning` while a task runs, or with
    /// `OperationInProgress` while another guard is held.
    pub fn begin_exclusive(&self, operation: &'static str) -> AppResult<ExclusiveGuard> {
        let status = self.lock_status();
        if let (true, Some(running)) = (status.is_running, status.current_task) {
            return Err(AppError::TaskAlreadyRunning { running });
        }

        let mut slot = lock(&self.exclusive);
        if let Some(current) = *slot {
            return Err(AppError::OperationInProgress { operation: current });
        }
        *slot = Some(operation);
        drop(slot);
        drop(status);

        log::debug!("{} holds the task slot", operation);
        Ok(ExclusiveGuard {
            slot: Arc::clone(&self.exclusive),
        })
    }

    /// Start `kind` over `target_ids`, or over the default targets when none are given.
    ///
    /// Returns the number of accepted targets. Explicit ids count as a manual
    /// re-check, so terminal records are validated again.
    pub fn start(&self, kind: TaskKind, target_ids: Option<Vec<PostId>>) -> AppResult<usize> {
        let mut status = self.lock_status();
        if status.is_running {
            return Err(AppError::TaskAlreadyRunning {
                running: status.current_task.unwrap_or(kind),
            });
        }
        if let Some(operation) = *lock(&self.exclusive) {
            return Err(AppError::OperationInProgress { operation });
        }

        let (targets, origin) = match target_ids {
            Some(ids) => {
                let mut seen = HashSet::new();
                let ids: Vec<PostId> = ids.into_iter().filter(|id| seen.insert(id.clone())).collect();
                (ids, TransitionOrigin::ManualRevalidation)
            }
            None => (self.lifecycle.default_targets(kind)?, TransitionOrigin::Automated),
        };

        let total = targets.len();
        *status = TaskStatus::running(kind, total);
        drop(status);

        log::info!("Started {} task over {} posts", kind, total);
        self.event_bus.emit(TaskStarted::new(kind, total));

        let run = TaskRun {
            kind,
            origin,
            targets,
            lifecycle: Arc::clone(&self.lifecycle),
            status: Arc::clone(&self.status),
            settings: self.settings.clone(),
        };
        let status = Arc::clone(&self.status);
        let event_bus = Arc::clone(&self.event_bus);

        // Supervisor: a panicking worker must still release the slot.
        tokio::spawn(async move {
            let worker = tokio::spawn(run.execute());
            let failure = match worker.await {
                Ok(()) => None,
                Err(e) => Some(format!("{} task aborted: {}", kind, e)),
            };

            let finished = {
                let mut status = lock(&status);
                status.is_running = false;
                status.finished_at = Some(Utc::now());
                match &failure {
                    Some(error) => {
                        log::error!("{}", error);
                        status.phase = TaskPhase::Failed {
                            error: error.clone(),
                        };
                        status.message = error.clone();
                    }
                    None => {
                        let summary = status.summary();
                        log::info!("{}", summary);
                        status.phase = TaskPhase::Completed {
                            summary: summary.clone(),
                        };
                        status.message = summary;
                    }
                }
                TaskFinished::new(kind, status.succeeded, status.failed, status.skipped, failure)
            };

            event_bus.emit(finished);
        });

        Ok(total)
    }

    /// Poll every `interval` until the slot is free, returning the final status.
    pub async fn wait_until_idle(&self, interval: Duration) -> TaskStatus {
        loop {
            let status = self.poll();
            if !status.is_running {
                return status;
            }
            tokio::time::sleep(interval).await;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Everything one task execution needs, moved into the worker
struct TaskRun {
    kind: TaskKind,
    origin: TransitionOrigin,
    targets: Vec<PostId>,
    lifecycle: Arc<LifecycleService>,
    status: Arc<Mutex<TaskStatus>>,
    settings: OrchestratorSettings,
}

impl TaskRun {
    async fn execute(self) {
        let permits = Arc::new(Semaphore::new(self.settings.worker_count.max(1)));
        let mut workers = JoinSet::new();

        for id in self.targets {
            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                break;
            };

            let lifecycle = Arc::clone(&self.lifecycle);
            let status = Arc::clone(&self.status);
            let (kind, origin) = (self.kind, self.origin);
            let delay = self.settings.request_delay;
            let capacity = self.settings.recent_capacity;

            workers.spawn(async move {
                let outcome = lifecycle.process(kind, &id, origin).await;
                record_outcome(&status, outcome, capacity);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                drop(permit);
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                log::error!("{} worker panicked: {}", self.kind, e);
                let mut status = lock(&self.status);
                status.progress += 1;
                status.failed += 1;
                status.push_error(format!("worker panicked: {}", e));
            }
        }
    }
}

fn record_outcome(status: &Mutex<TaskStatus>, outcome: RecordOutcome, recent_capacity: usize) {
    let mut status = lock(status);
    status.progress += 1;

    match outcome {
        RecordOutcome::Succeeded(record) => {
            status.succeeded += 1;
            status.message = format!("{}/{}: {} is {}", status.progress, status.total, record.id, record.status);
            status.push_recent(RecentRecord::from(&record), recent_capacity);
        }
        RecordOutcome::Failed { id, error } => {
            status.failed += 1;
            status.message = format!("{}/{}: {} failed", status.progress, status.total, id);
            status.push_error(format!("{}: {}", id, error));
        }
        RecordOutcome::Skipped { id, reason } => {
            status.skipped += 1;
            log::debug!("Skipped {}: {}", id, reason);
            status.message = format!("{}/{}: {} skipped", status.progress, status.total, id);
        }
    }
}
