use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use gallery_core::{update, GalleryState, ImageId, LoadState, Msg};
use gallery_engine::{
    ConnectivityEvent, EngineHandle, IntersectionHost, ObserverOptions, ScrollViewport,
    SimulatedProbe, VisibilityNotifier,
};
use gallery_logging::{gallery_info, gallery_warn, set_frame};
use tokio::sync::{mpsc, watch};

use super::effects::EffectRunner;
use super::persistence;
use super::ui::constants::{CARD_MARGIN_PX, SENTINEL_MARGIN_PX};
use super::ui::layout::GalleryLayout;
use super::ui::render;
use crate::config::GalleryConfig;

/// Runs the gallery headlessly: scrolls a simulated viewport step by step and
/// prints the status whenever the state changes.
pub fn run_app(config: GalleryConfig) -> anyhow::Result<()> {
    let probe = Arc::new(SimulatedProbe::new(config.effective_type()));
    let (connectivity, connectivity_rx) = mpsc::unbounded_channel();
    let engine = EngineHandle::new(config.engine_config(), probe.clone(), Some(connectivity_rx))
        .context("failed to start the gallery engine")?;

    let mut app = GalleryApp::new(&config, EffectRunner::new(engine));
    app.dispatch(Msg::RestorePreferences(persistence::load_preferences(
        &config.output_dir,
    )));
    app.dispatch(Msg::Started);

    let tick = Duration::from_millis(config.tick_ms);
    let back_online_at = config
        .offline_at
        .map(|step| step + config.offline_steps.max(1));
    for step in 0..config.steps {
        set_frame(step as u64);
        app.pump();

        if config.offline_at == Some(step) {
            probe.set_online(false);
            send_connectivity(&connectivity, ConnectivityEvent::Offline);
        }
        if back_online_at == Some(step) {
            probe.set_online(true);
            send_connectivity(&connectivity, ConnectivityEvent::Online);
        }
        if step == config.steps / 2 {
            app.midpoint_actions(&config);
        }

        app.scroll_by(config.scroll_step);
        app.print_if_dirty();
        thread::sleep(tick);
    }

    let deadline = Instant::now() + Duration::from_millis(config.settle_ms);
    while Instant::now() < deadline {
        app.pump();
        app.print_if_dirty();
        thread::sleep(tick);
    }

    for line in render::render(&app.state.view()) {
        println!("{line}");
    }
    persistence::save_preferences(&config.output_dir, &app.state.preferences());
    app.runner.shutdown();
    gallery_info!("Gallery closed");
    Ok(())
}

fn send_connectivity(tx: &mpsc::UnboundedSender<ConnectivityEvent>, event: ConnectivityEvent) {
    if tx.send(event).is_err() {
        gallery_warn!("Connection monitor is gone, {:?} dropped", event);
    }
}

/// A notifier plus the receiver used to pick up its flips.
struct Watched {
    notifier: VisibilityNotifier,
    updates: watch::Receiver<bool>,
}

impl Watched {
    fn new(host: Arc<dyn IntersectionHost>, options: ObserverOptions) -> Self {
        let notifier = VisibilityNotifier::new(host, options);
        // Subscribe before targeting so the initial delivery counts as a change.
        let updates = notifier.subscribe();
        Self { notifier, updates }
    }

    fn take_change(&mut self) -> Option<bool> {
        match self.updates.has_changed() {
            Ok(true) => Some(*self.updates.borrow_and_update()),
            _ => None,
        }
    }
}

struct GalleryApp {
    state: GalleryState,
    runner: EffectRunner,
    layout: GalleryLayout,
    viewport_height: f64,
    viewport: Arc<ScrollViewport>,
    host: Arc<dyn IntersectionHost>,
    cards: BTreeMap<ImageId, Watched>,
    sentinel: Watched,
}

impl GalleryApp {
    fn new(config: &GalleryConfig, runner: EffectRunner) -> Self {
        let viewport = Arc::new(ScrollViewport::new(
            config.viewport_width,
            config.viewport_height,
        ));
        let host: Arc<dyn IntersectionHost> = viewport.clone();
        let sentinel = Watched::new(
            host.clone(),
            ObserverOptions::with_margin(SENTINEL_MARGIN_PX),
        );
        Self {
            state: GalleryState::new(),
            runner,
            layout: GalleryLayout::new(config.viewport_width, config.columns),
            viewport_height: config.viewport_height,
            viewport,
            host,
            cards: BTreeMap::new(),
            sentinel,
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.runner.run(effects);
    }

    /// Applies engine results, then feeds visibility changes back in until
    /// nothing new happens.
    fn pump(&mut self) {
        for msg in self.runner.drain() {
            self.dispatch(msg);
        }
        loop {
            self.sync_targets();
            let changes = self.collect_visibility();
            if changes.is_empty() {
                break;
            }
            for msg in changes {
                self.dispatch(msg);
            }
        }
    }

    /// Observes every card that has not been revealed yet and keeps the
    /// sentinel below the last card while more photos remain.
    fn sync_targets(&mut self) {
        let view = self.state.view();
        for (index, card) in view.cards.iter().enumerate() {
            if !matches!(card.load, LoadState::Hidden) {
                self.cards.remove(&card.image_id);
                continue;
            }
            let rect = self.layout.card_rect(index, view.view_mode);
            let host = self.host.clone();
            self.cards
                .entry(card.image_id)
                .or_insert_with(|| {
                    Watched::new(host, ObserverOptions::with_margin(CARD_MARGIN_PX))
                })
                .notifier
                .set_target(Some(rect));
        }

        let sentinel = view
            .has_more
            .then(|| self.layout.sentinel_rect(view.cards.len(), view.view_mode));
        self.sentinel.notifier.set_target(sentinel);
    }

    fn collect_visibility(&mut self) -> Vec<Msg> {
        let mut msgs: Vec<Msg> = self
            .cards
            .iter_mut()
            .filter_map(|(&image_id, watched)| {
                watched.take_change().map(|intersecting| Msg::CardVisibility {
                    image_id,
                    intersecting,
                })
            })
            .collect();
        if let Some(intersecting) = self.sentinel.take_change() {
            msgs.push(Msg::SentinelVisibility { intersecting });
        }
        msgs
    }

    fn scroll_by(&mut self, dy: f64) {
        let view = self.state.view();
        let content = self.layout.content_height(view.cards.len(), view.view_mode);
        let max_scroll = (content - self.viewport_height).max(0.0);
        let next = (self.viewport.scroll_y() + dy).min(max_scroll);
        self.viewport.scroll_to(next);
    }

    /// Filter change, a like and an optional export on the first loaded photo.
    fn midpoint_actions(&mut self, config: &GalleryConfig) {
        if let Some(filter) = config.filter {
            self.dispatch(Msg::FilterSelected(filter));
        }
        let first_loaded = self
            .state
            .view()
            .cards
            .iter()
            .find(|card| matches!(card.load, LoadState::Loaded { .. }))
            .map(|card| (card.image_id, card.liked));
        let Some((image_id, liked)) = first_loaded else {
            gallery_info!("No photo loaded yet at the midpoint");
            return;
        };
        if !liked {
            self.dispatch(Msg::LikeToggled { image_id });
        }
        if config.auto_export {
            self.dispatch(Msg::ExportRequested { image_id });
        }
    }

    fn print_if_dirty(&mut self) {
        if self.state.consume_dirty() {
            println!("{}", render::status_line(&self.state.view()));
        }
    }
}
