use std::collections::VecDeque;
use std::fmt;
use std::future::Future;

use futures_util::future::BoxFuture;

/// Future produced by a background task when it is started.
pub type TaskFuture = BoxFuture<'static, anyhow::Result<()>>;

type TaskWork = Box<dyn FnOnce() -> TaskFuture + Send>;

/// A unit of deferred work. The body is not started until the scheduler
/// dequeues it.
pub struct BackgroundTask {
    id: String,
    priority: i32,
    work: TaskWork,
}

impl BackgroundTask {
    pub fn new<F, Fut>(id: impl Into<String>, priority: i32, work: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            id: id.into(),
            priority,
            // The closure itself runs on first poll, inside whatever guards
            // the scheduler wraps around the future.
            work: Box::new(move || Box::pin(async move { work().await })),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Consumes the task. Nothing of the body runs until the returned future
    /// is polled.
    pub fn start(self) -> TaskFuture {
        (self.work)()
    }
}

impl fmt::Debug for BackgroundTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundTask")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Pending tasks, highest priority first. Equal priorities keep insertion
/// order. Ids are not de-duplicated.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: VecDeque<BackgroundTask>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts behind every task of equal or higher priority, which is the
    /// same as appending and stable-sorting by descending priority.
    pub fn push(&mut self, task: BackgroundTask) {
        let at = self
            .tasks
            .partition_point(|queued| queued.priority >= task.priority);
        self.tasks.insert(at, task);
    }

    pub fn pop_front(&mut self) -> Option<BackgroundTask> {
        self.tasks.pop_front()
    }

    pub fn peek(&self) -> Option<&BackgroundTask> {
        self.tasks.front()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Ids in dequeue order.
    pub fn ids(&self) -> Vec<&str> {
        self.tasks.iter().map(BackgroundTask::id).collect()
    }

    /// Priorities in dequeue order.
    pub fn priorities(&self) -> Vec<i32> {
        self.tasks.iter().map(BackgroundTask::priority).collect()
    }
}
