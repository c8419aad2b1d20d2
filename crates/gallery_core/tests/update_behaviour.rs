use std::sync::Once;
use std::time::Duration;

use gallery_core::{
    update, BackgroundJob, BackgroundStatus, Category, ConnectionSnapshot, Effect, EffectiveType,
    FilterKind, GalleryState, ImageDescriptor, LoadState, Msg, Quality, CATALOG_LIMIT,
    INITIAL_PAGE, PAGE_SIZE,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(gallery_logging::initialize_for_tests);
}

fn batch(start: u64, count: usize) -> Vec<ImageDescriptor> {
    (start..start + count as u64)
        .map(|id| ImageDescriptor::new(id, Category::Nature, 500, 400))
        .collect()
}

fn connection(effective_type: EffectiveType) -> ConnectionSnapshot {
    ConnectionSnapshot {
        effective_type,
        ..ConnectionSnapshot::default()
    }
}

fn started_with_initial_page() -> GalleryState {
    let (state, _) = update(GalleryState::new(), Msg::Started);
    let (state, _) = update(
        state,
        Msg::BatchLoaded {
            images: batch(1, INITIAL_PAGE),
        },
    );
    state
}

#[test]
fn started_requests_initial_page_once() {
    init_logging();
    let (mut state, effects) = update(GalleryState::new(), Msg::Started);
    assert_eq!(
        effects,
        vec![Effect::FetchMore {
            start_id: 1,
            count: INITIAL_PAGE,
            delay: Duration::ZERO,
        }]
    );
    assert!(state.is_loading());
    assert!(state.consume_dirty());

    let (_state, effects) = update(state, Msg::Started);
    assert!(effects.is_empty());
}

#[test]
fn batch_arrival_schedules_batch_processing() {
    init_logging();
    let (state, _) = update(GalleryState::new(), Msg::Started);
    let (state, effects) = update(
        state,
        Msg::BatchLoaded {
            images: batch(1, INITIAL_PAGE),
        },
    );

    assert_eq!(
        effects,
        vec![Effect::ScheduleTask(BackgroundJob::process_batch(
            1,
            INITIAL_PAGE
        ))]
    );
    let view = state.view();
    assert_eq!(view.photo_count, INITIAL_PAGE);
    assert_eq!(view.revealed_count, 0);
    assert!(!view.loading);
    assert!(view.has_more);
}

#[test]
fn card_reveal_uses_quality_for_current_connection() {
    init_logging();
    let state = started_with_initial_page();
    let (state, _) = update(state, Msg::ConnectionUpdated(connection(EffectiveType::TwoG)));
    assert_eq!(state.quality(), Quality::Low);

    let (state, effects) = update(
        state,
        Msg::CardVisibility {
            image_id: 4,
            intersecting: true,
        },
    );
    assert_eq!(
        effects,
        vec![Effect::LoadImage {
            image_id: 4,
            url: "https://picsum.photos/100/150?random=4".to_string(),
        }]
    );

    let (state, _) = update(state, Msg::ConnectionUpdated(connection(EffectiveType::FourG)));
    let (_state, effects) = update(
        state,
        Msg::CardVisibility {
            image_id: 5,
            intersecting: true,
        },
    );
    assert_eq!(
        effects,
        vec![Effect::LoadImage {
            image_id: 5,
            url: "https://picsum.photos/500/400?random=5".to_string(),
        }]
    );
}

#[test]
fn card_reveals_only_once() {
    init_logging();
    let state = started_with_initial_page();
    let visible = Msg::CardVisibility {
        image_id: 2,
        intersecting: true,
    };
    let (state, first) = update(state, visible.clone());
    assert_eq!(first.len(), 1);

    let (state, _) = update(
        state,
        Msg::CardVisibility {
            image_id: 2,
            intersecting: false,
        },
    );
    let (state, second) = update(state, visible);
    assert!(second.is_empty());
    assert_eq!(state.view().revealed_count, 1);
}

#[test]
fn never_visible_card_triggers_no_load() {
    init_logging();
    let state = started_with_initial_page();
    let (state, effects) = update(
        state,
        Msg::CardVisibility {
            image_id: 9,
            intersecting: false,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.image(9).unwrap().load, LoadState::Hidden);
}

#[test]
fn sentinel_triggers_load_more_with_network_delay() {
    init_logging();
    let state = started_with_initial_page();
    let (state, _) = update(
        state,
        Msg::ConnectionUpdated(connection(EffectiveType::ThreeG)),
    );
    let (state, effects) = update(state, Msg::SentinelVisibility { intersecting: true });
    assert_eq!(
        effects,
        vec![Effect::FetchMore {
            start_id: INITIAL_PAGE as u64 + 1,
            count: PAGE_SIZE,
            delay: Duration::from_millis(1000),
        }]
    );

    // Already loading: a second crossing does nothing.
    let (state, _) = update(state, Msg::SentinelVisibility { intersecting: false });
    let (_state, effects) = update(state, Msg::SentinelVisibility { intersecting: true });
    assert!(effects.is_empty());
}

#[test]
fn sentinel_still_visible_after_batch_keeps_loading_until_limit() {
    init_logging();
    let state = started_with_initial_page();
    let (mut state, mut effects) = update(state, Msg::SentinelVisibility { intersecting: true });

    let mut fetches = 0;
    loop {
        let Some((start_id, count)) = effects.iter().find_map(|effect| match effect {
            Effect::FetchMore {
                start_id, count, ..
            } => Some((*start_id, *count)),
            _ => None,
        }) else {
            break;
        };
        fetches += 1;
        let (next, next_effects) = update(
            state,
            Msg::BatchLoaded {
                images: batch(start_id, count),
            },
        );
        state = next;
        effects = next_effects;
    }

    assert_eq!(fetches, (CATALOG_LIMIT - INITIAL_PAGE) / PAGE_SIZE);
    let view = state.view();
    assert_eq!(view.photo_count, CATALOG_LIMIT);
    assert!(!view.has_more);
}

#[test]
fn sentinel_out_of_view_does_not_load() {
    init_logging();
    let state = started_with_initial_page();
    let (_state, effects) = update(state, Msg::SentinelVisibility { intersecting: false });
    assert!(effects.is_empty());
}

#[test]
fn loaded_image_schedules_processing_and_filter() {
    init_logging();
    let state = started_with_initial_page();
    let (state, _) = update(state, Msg::FilterSelected(FilterKind::Blur));
    let (state, _) = update(
        state,
        Msg::CardVisibility {
            image_id: 1,
            intersecting: true,
        },
    );
    let (state, effects) = update(
        state,
        Msg::ImageLoaded {
            image_id: 1,
            width: 500,
            height: 400,
        },
    );
    assert_eq!(
        effects,
        vec![
            Effect::ApplyFilter {
                image_id: 1,
                filter: FilterKind::Blur,
            },
            Effect::ScheduleTask(BackgroundJob::process_image(1, FilterKind::Blur)),
        ]
    );
    assert_eq!(BackgroundJob::process_image(1, FilterKind::Blur).id, "process-image-1");

    let (state, _) = update(state, Msg::ImageProcessed { image_id: 1 });
    assert!(state.image(1).unwrap().processed);
}

#[test]
fn failed_image_is_isolated() {
    init_logging();
    let state = started_with_initial_page();
    let (state, _) = update(
        state,
        Msg::CardVisibility {
            image_id: 1,
            intersecting: true,
        },
    );
    let (state, _) = update(
        state,
        Msg::CardVisibility {
            image_id: 2,
            intersecting: true,
        },
    );
    let (state, effects) = update(
        state,
        Msg::ImageFailed {
            image_id: 1,
            reason: "http status 404".to_string(),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(
        state.image(1).unwrap().load,
        LoadState::Failed {
            reason: "http status 404".to_string()
        }
    );
    assert!(matches!(state.image(2).unwrap().load, LoadState::Loading { .. }));

    let (_state, effects) = update(state, Msg::SentinelVisibility { intersecting: true });
    assert_eq!(effects.len(), 1);
}

#[test]
fn stale_load_results_are_ignored() {
    init_logging();
    let mut state = started_with_initial_page();
    state.consume_dirty();

    // Card 5 was never revealed.
    let (mut state, effects) = update(
        state,
        Msg::ImageLoaded {
            image_id: 5,
            width: 500,
            height: 400,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.image(5).unwrap().load, LoadState::Hidden);
    assert!(!state.consume_dirty());

    let (state, _) = update(
        state,
        Msg::CardVisibility {
            image_id: 5,
            intersecting: true,
        },
    );
    let (state, _) = update(
        state,
        Msg::ImageFailed {
            image_id: 5,
            reason: "timed out".to_string(),
        },
    );
    // A late success for a card that already failed does not revive it.
    let (state, effects) = update(
        state,
        Msg::ImageLoaded {
            image_id: 5,
            width: 500,
            height: 400,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(
        state.image(5).unwrap().load,
        LoadState::Failed {
            reason: "timed out".to_string()
        }
    );

    let (state, _) = update(
        state,
        Msg::ImageFailed {
            image_id: 6,
            reason: "http status 500".to_string(),
        },
    );
    assert_eq!(state.image(6).unwrap().load, LoadState::Hidden);
}

#[test]
fn filter_change_reapplies_to_loaded_images_only() {
    init_logging();
    let state = started_with_initial_page();
    let (state, _) = update(
        state,
        Msg::CardVisibility {
            image_id: 1,
            intersecting: true,
        },
    );
    let (state, _) = update(
        state,
        Msg::CardVisibility {
            image_id: 2,
            intersecting: true,
        },
    );
    let (state, _) = update(
        state,
        Msg::ImageLoaded {
            image_id: 2,
            width: 10,
            height: 10,
        },
    );

    let (state, effects) = update(state, Msg::FilterSelected(FilterKind::Sepia));
    assert_eq!(
        effects,
        vec![Effect::ApplyFilter {
            image_id: 2,
            filter: FilterKind::Sepia,
        }]
    );

    let (_state, effects) = update(state, Msg::FilterSelected(FilterKind::None));
    assert!(effects.is_empty());
}

#[test]
fn export_requires_loaded_image() {
    init_logging();
    let state = started_with_initial_page();
    let (state, effects) = update(state, Msg::ExportRequested { image_id: 3 });
    assert!(effects.is_empty());

    let (state, _) = update(
        state,
        Msg::CardVisibility {
            image_id: 3,
            intersecting: true,
        },
    );
    let (state, _) = update(
        state,
        Msg::ImageLoaded {
            image_id: 3,
            width: 500,
            height: 400,
        },
    );
    let (_state, effects) = update(state, Msg::ExportRequested { image_id: 3 });
    assert_eq!(
        effects,
        vec![Effect::Export {
            image_id: 3,
            title: "Photo 3".to_string(),
            source_url: "https://picsum.photos/500/400?random=3".to_string(),
            filter: FilterKind::None,
        }]
    );
}

#[test]
fn background_status_drives_label() {
    init_logging();
    let (mut state, _) = update(
        GalleryState::new(),
        Msg::BackgroundStatus(BackgroundStatus {
            idle: false,
            queue_len: 2,
            current_task: Some("process-image-1".to_string()),
        }),
    );
    let view = state.view();
    assert_eq!(view.background_label(), "Processing");
    assert_eq!(view.background.queue_len, 2);
    assert!(state.consume_dirty());

    let (mut state, _) = update(state, Msg::BackgroundStatus(BackgroundStatus::default()));
    assert_eq!(state.view().background_label(), "Ready");
    assert!(state.consume_dirty());

    // Same status again is not a change.
    let (mut state, _) = update(state, Msg::BackgroundStatus(BackgroundStatus::default()));
    assert!(!state.consume_dirty());
}
