use std::time::Duration;

use gallery_logging::{gallery_debug, gallery_info, gallery_warn};

use crate::{BackgroundJob, Effect, FilterKind, GalleryState, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: GalleryState, msg: Msg) -> (GalleryState, Vec<Effect>) {
    let effects = match msg {
        Msg::Started => match state.begin_initial_load() {
            Some((start_id, count)) => vec![Effect::FetchMore {
                start_id,
                count,
                delay: Duration::ZERO,
            }],
            None => Vec::new(),
        },
        Msg::RestorePreferences(prefs) => {
            state.restore_preferences(prefs);
            Vec::new()
        }
        Msg::BatchLoaded { images } => {
            let count = images.len();
            let mut effects = Vec::new();
            if let Some(start_id) = state.append_batch(images) {
                gallery_info!("Batch of {} images landed at id {}", count, start_id);
                effects.push(Effect::ScheduleTask(BackgroundJob::process_batch(
                    start_id, count,
                )));
            }
            // The sentinel may still be in view once the batch lands.
            effects.extend(load_more(&mut state));
            effects
        }
        Msg::CardVisibility {
            image_id,
            intersecting,
        } => {
            if !intersecting {
                return (state, Vec::new());
            }
            match state.reveal(image_id) {
                Some(url) => {
                    gallery_debug!("Card {} revealed, requesting {}", image_id, url);
                    vec![Effect::LoadImage { image_id, url }]
                }
                None => Vec::new(),
            }
        }
        Msg::SentinelVisibility { intersecting } => {
            state.set_sentinel_intersecting(intersecting);
            load_more(&mut state)
        }
        Msg::ImageLoaded {
            image_id,
            width,
            height,
        } => {
            if !state.apply_loaded(image_id, width, height) {
                gallery_debug!("Ignoring load result for image {} not awaiting one", image_id);
                return (state, Vec::new());
            }
            let filter = state.filter();
            let mut effects = Vec::with_capacity(2);
            if filter != FilterKind::None {
                effects.push(Effect::ApplyFilter { image_id, filter });
            }
            effects.push(Effect::ScheduleTask(BackgroundJob::process_image(
                image_id, filter,
            )));
            effects
        }
        Msg::ImageFailed { image_id, reason } => {
            gallery_warn!("Image {} failed to load: {}", image_id, reason);
            if !state.apply_failed(image_id, reason) {
                gallery_debug!("Ignoring failure for image {} not awaiting a load", image_id);
            }
            Vec::new()
        }
        Msg::ImageProcessed { image_id } => {
            state.apply_processed(image_id);
            Vec::new()
        }
        Msg::FilterSelected(filter) => {
            let targets = state.select_filter(filter);
            if filter == FilterKind::None {
                Vec::new()
            } else {
                targets
                    .into_iter()
                    .map(|image_id| Effect::ApplyFilter { image_id, filter })
                    .collect()
            }
        }
        Msg::ViewModeSelected(mode) => {
            state.select_view_mode(mode);
            Vec::new()
        }
        Msg::LikeToggled { image_id } => {
            state.toggle_like(image_id);
            Vec::new()
        }
        Msg::ExportRequested { image_id } => match state.image(image_id) {
            Some(entry) if entry.is_loaded() => vec![Effect::Export {
                image_id,
                title: entry.descriptor.title.clone(),
                source_url: entry.descriptor.url.clone(),
                filter: state.filter(),
            }],
            _ => Vec::new(),
        },
        Msg::ConnectionUpdated(snapshot) => {
            state.set_connection(snapshot);
            Vec::new()
        }
        Msg::BackgroundStatus(status) => {
            state.set_background(status);
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn load_more(state: &mut GalleryState) -> Vec<Effect> {
    match state.try_begin_load_more() {
        Some((start_id, count, delay)) => vec![Effect::FetchMore {
            start_id,
            count,
            delay,
        }],
        None => Vec::new(),
    }
}
