use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

/// Budget handed out with a quiet-period grant, like a browser idle deadline.
pub const IDLE_BUDGET: Duration = Duration::from_millis(50);

/// Host capability that knows when the process has spare capacity.
#[async_trait::async_trait]
pub trait IdleHost: Send + Sync {
    /// Resolves once the host is idle and yields the time budget of the slot.
    /// Dropping the future withdraws the request.
    async fn idle_period(&self) -> Duration;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleGrant {
    Idle { time_remaining: Duration },
    /// No idle slot appeared in time; the caller runs anyway.
    TimedOut,
}

impl IdleGrant {
    pub fn did_timeout(self) -> bool {
        matches!(self, IdleGrant::TimedOut)
    }
}

/// Waits for idle time, but never longer than `timeout`.
pub async fn request_idle(host: &dyn IdleHost, timeout: Duration) -> IdleGrant {
    match tokio::time::timeout(timeout, host.idle_period()).await {
        Ok(time_remaining) => IdleGrant::Idle { time_remaining },
        Err(_) => IdleGrant::TimedOut,
    }
}

/// Idle once nothing has called [`QuietPeriodIdle::mark_busy`] for `quiet`.
#[derive(Debug)]
pub struct QuietPeriodIdle {
    quiet: Duration,
    last_activity: Mutex<Instant>,
    activity: Notify,
}

impl QuietPeriodIdle {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            last_activity: Mutex::new(Instant::now()),
            activity: Notify::new(),
        }
    }

    /// Records foreground activity, pushing back any pending grant.
    pub fn mark_busy(&self) {
        *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
        self.activity.notify_waiters();
    }

    fn quiet_for(&self) -> Duration {
        self.last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }
}

#[async_trait::async_trait]
impl IdleHost for QuietPeriodIdle {
    async fn idle_period(&self) -> Duration {
        loop {
            let notified = self.activity.notified();
            let quiet_for = self.quiet_for();
            if quiet_for >= self.quiet {
                return IDLE_BUDGET;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.quiet - quiet_for) => {}
                _ = notified => {}
            }
        }
    }
}

/// For hosts without idle detection: grants after a fixed delay.
#[derive(Debug, Clone)]
pub struct FallbackIdle {
    delay: Duration,
}

impl FallbackIdle {
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(100);

    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FallbackIdle {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY)
    }
}

#[async_trait::async_trait]
impl IdleHost for FallbackIdle {
    async fn idle_period(&self) -> Duration {
        tokio::time::sleep(self.delay).await;
        Duration::ZERO
    }
}
