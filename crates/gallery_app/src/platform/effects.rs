use gallery_core::{BackgroundJob, BackgroundJobKind, BackgroundStatus, Effect, Msg};
use gallery_engine::{EngineCommand, EngineEvent, EngineHandle};
use gallery_logging::{gallery_debug, gallery_info, gallery_warn};

/// Forwards core effects to the engine and engine events back as messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            gallery_debug!("Effect {:?}", effect);
            self.engine.send(command_for(effect));
        }
    }

    /// Everything the engine has reported since the last call.
    pub fn drain(&self) -> Vec<Msg> {
        let mut msgs = Vec::new();
        while let Some(event) = self.engine.try_recv() {
            if let Some(msg) = msg_for(event) {
                msgs.push(msg);
            }
        }
        msgs
    }

    pub fn shutdown(self) {
        self.engine.shutdown();
    }
}

pub(crate) fn command_for(effect: Effect) -> EngineCommand {
    match effect {
        Effect::FetchMore {
            start_id,
            count,
            delay,
        } => EngineCommand::FetchMore {
            start_id,
            count,
            delay,
        },
        Effect::LoadImage { image_id, url } => EngineCommand::LoadImage { image_id, url },
        Effect::ApplyFilter { image_id, filter } => EngineCommand::ApplyFilter { image_id, filter },
        Effect::ScheduleTask(BackgroundJob { id, priority, kind }) => match kind {
            BackgroundJobKind::ProcessImage { image_id, filter } => EngineCommand::ProcessImage {
                task_id: id,
                priority,
                image_id,
                filter,
            },
            BackgroundJobKind::ProcessBatch { start_id, count } => EngineCommand::ProcessBatch {
                task_id: id,
                priority,
                start_id,
                count,
            },
        },
        Effect::Export {
            image_id,
            title,
            source_url,
            filter,
        } => EngineCommand::Export {
            image_id,
            title,
            source_url,
            filter,
        },
    }
}

pub(crate) fn msg_for(event: EngineEvent) -> Option<Msg> {
    match event {
        EngineEvent::BatchReady { images } => Some(Msg::BatchLoaded { images }),
        EngineEvent::ImageLoaded {
            image_id,
            width,
            height,
        } => Some(Msg::ImageLoaded {
            image_id,
            width,
            height,
        }),
        EngineEvent::ImageFailed { image_id, failure } => Some(Msg::ImageFailed {
            image_id,
            reason: failure.to_string(),
        }),
        EngineEvent::ImageProcessed {
            image_id,
            preview_width,
            preview_height,
        } => {
            gallery_debug!(
                "Image {} processed, preview {}x{}",
                image_id,
                preview_width,
                preview_height
            );
            Some(Msg::ImageProcessed { image_id })
        }
        EngineEvent::FilterApplied {
            image_id, filter, ..
        } => {
            gallery_debug!("Filter {} ready for image {}", filter, image_id);
            None
        }
        EngineEvent::Exported { image_id, path } => {
            gallery_info!("Image {} exported to {}", image_id, path.display());
            None
        }
        EngineEvent::ExportFailed { image_id, message } => {
            gallery_warn!("Image {} export failed: {}", image_id, message);
            None
        }
        EngineEvent::ConnectionChanged(snapshot) => Some(Msg::ConnectionUpdated(snapshot)),
        EngineEvent::SchedulerChanged(status) => Some(Msg::BackgroundStatus(BackgroundStatus {
            idle: status.idle,
            queue_len: status.queue_len,
            current_task: status.current_task,
        })),
    }
}
