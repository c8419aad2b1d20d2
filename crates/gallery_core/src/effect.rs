use std::time::Duration;

use crate::{FilterKind, ImageId};

/// Priority given to gallery background work unless stated otherwise.
pub const DEFAULT_TASK_PRIORITY: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Produce `count` new images starting at `start_id` after `delay`.
    FetchMore {
        start_id: ImageId,
        count: usize,
        delay: Duration,
    },
    LoadImage { image_id: ImageId, url: String },
    ApplyFilter { image_id: ImageId, filter: FilterKind },
    ScheduleTask(BackgroundJob),
    Export {
        image_id: ImageId,
        title: String,
        source_url: String,
        filter: FilterKind,
    },
}

/// A unit of idle-time work the engine should enqueue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundJob {
    pub id: String,
    pub priority: i32,
    pub kind: BackgroundJobKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundJobKind {
    ProcessImage { image_id: ImageId, filter: FilterKind },
    ProcessBatch { start_id: ImageId, count: usize },
}

impl BackgroundJob {
    pub fn process_image(image_id: ImageId, filter: FilterKind) -> Self {
        Self {
            id: format!("process-image-{image_id}"),
            priority: DEFAULT_TASK_PRIORITY,
            kind: BackgroundJobKind::ProcessImage { image_id, filter },
        }
    }

    pub fn process_batch(start_id: ImageId, count: usize) -> Self {
        Self {
            id: format!("process-batch-{start_id}"),
            priority: DEFAULT_TASK_PRIORITY,
            kind: BackgroundJobKind::ProcessBatch { start_id, count },
        }
    }
}
