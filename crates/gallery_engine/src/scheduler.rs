//! Idle-time background scheduler.
//!
//! One worker task drains a [`TaskQueue`]: it waits for work, asks the
//! [`IdleHost`] for an idle slot (bounded by `idle_timeout`), then runs exactly
//! one task to completion before asking again. Outcomes are only logged and
//! counted; callers that need a result must arrange it inside the task body.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use gallery_logging::{gallery_debug, gallery_error, gallery_info};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::idle::{request_idle, IdleGrant, IdleHost};
use crate::queue::{BackgroundTask, TaskQueue};

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Longest wait for an idle slot before running anyway.
    pub idle_timeout: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerStatus {
    /// No task is running.
    pub idle: bool,
    /// Tasks waiting to start; the running task is not counted.
    pub queue_len: usize,
    pub current_task: Option<String>,
    pub completed: u64,
    pub failed: u64,
}

impl Default for SchedulerStatus {
    fn default() -> Self {
        Self {
            idle: true,
            queue_len: 0,
            current_task: None,
            completed: 0,
            failed: 0,
        }
    }
}

struct Shared {
    queue: Mutex<TaskQueue>,
    wake: Notify,
    status: watch::Sender<SchedulerStatus>,
}

impl Shared {
    fn queue(&self) -> MutexGuard<'_, TaskQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct IdleScheduler {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl IdleScheduler {
    /// Starts the worker on the current tokio runtime.
    pub fn spawn(host: Arc<dyn IdleHost>, settings: SchedulerSettings) -> Self {
        let (status, _) = watch::channel(SchedulerStatus::default());
        let shared = Arc::new(Shared {
            queue: Mutex::new(TaskQueue::new()),
            wake: Notify::new(),
            status,
        });
        let cancel = CancellationToken::new();
        let worker = tokio::spawn(drain_loop(
            shared.clone(),
            host,
            settings,
            cancel.clone(),
        ));
        Self {
            shared,
            cancel,
            worker: Some(worker),
        }
    }

    /// Queues `work` under `id`. Higher `priority` runs first.
    pub fn enqueue<F, Fut>(&self, id: impl Into<String>, priority: i32, work: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.enqueue_task(BackgroundTask::new(id, priority, work));
    }

    pub fn enqueue_task(&self, task: BackgroundTask) {
        gallery_info!(
            "Background task '{}' added with priority {}",
            task.id(),
            task.priority()
        );
        {
            // Published under the queue lock so a concurrent dequeue cannot
            // be overwritten with a stale length.
            let mut queue = self.shared.queue();
            queue.push(task);
            let queue_len = queue.len();
            self.shared.status.send_if_modified(|status| {
                let changed = status.queue_len != queue_len;
                status.queue_len = queue_len;
                changed
            });
        }
        self.shared.wake.notify_one();
    }

    pub fn status(&self) -> SchedulerStatus {
        self.shared.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerStatus> {
        self.shared.status.subscribe()
    }

    /// Withdraws any pending idle request and waits for the worker to stop.
    /// A task that is already running finishes first.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
    }
}

impl Drop for IdleScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn drain_loop(
    shared: Arc<Shared>,
    host: Arc<dyn IdleHost>,
    settings: SchedulerSettings,
    cancel: CancellationToken,
) {
    loop {
        loop {
            let empty = shared.queue().is_empty();
            if !empty {
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = shared.wake.notified() => {}
            }
        }

        let grant = tokio::select! {
            _ = cancel.cancelled() => {
                gallery_debug!("Scheduler stopping, idle request withdrawn");
                return;
            }
            grant = request_idle(host.as_ref(), settings.idle_timeout) => grant,
        };
        match grant {
            IdleGrant::Idle { time_remaining } => {
                gallery_debug!("Idle time available ({}ms)", time_remaining.as_millis());
            }
            IdleGrant::TimedOut => {
                gallery_debug!(
                    "No idle slot within {}ms, running anyway",
                    settings.idle_timeout.as_millis()
                );
            }
        }

        let task = {
            let mut queue = shared.queue();
            let task = queue.pop_front();
            if let Some(task) = &task {
                let queue_len = queue.len();
                shared.status.send_modify(|status| {
                    status.idle = false;
                    status.queue_len = queue_len;
                    status.current_task = Some(task.id().to_string());
                });
            }
            task
        };
        let Some(task) = task else {
            continue;
        };

        let id = task.id().to_string();
        gallery_info!("Processing background task '{}'", id);

        // Panics are treated like errors so one bad task cannot stop the loop.
        let outcome = AssertUnwindSafe(task.start()).catch_unwind().await;
        let succeeded = match outcome {
            Ok(Ok(())) => {
                gallery_info!("Completed background task '{}'", id);
                true
            }
            Ok(Err(err)) => {
                gallery_error!("Background task '{}' failed: {:#}", id, err);
                false
            }
            Err(_) => {
                gallery_error!("Background task '{}' panicked", id);
                false
            }
        };

        {
            let queue = shared.queue();
            let queue_len = queue.len();
            shared.status.send_modify(|status| {
                status.idle = true;
                status.queue_len = queue_len;
                status.current_task = None;
                if succeeded {
                    status.completed += 1;
                } else {
                    status.failed += 1;
                }
            });
        }

        tokio::task::yield_now().await;
    }
}
