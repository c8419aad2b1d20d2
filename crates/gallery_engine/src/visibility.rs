//! Viewport intersection tracking.
//!
//! An [`IntersectionHost`] is the environment capability: it watches targets
//! and delivers an [`IntersectionEntry`] whenever a target crosses its
//! threshold. [`ScrollViewport`] is the in-process host used by the app.
//! [`VisibilityNotifier`] wraps one observation and exposes it as a live flag.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gallery_logging::{gallery_debug, gallery_trace};
use tokio::sync::watch;

use crate::viewport::{Margin, Rect};

pub type ObservationId = u64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverOptions {
    /// Grows the root so targets trigger before they are actually on screen.
    pub root_margin: Margin,
    /// Minimum visible fraction of the target, in `0.0..=1.0`.
    pub threshold: f64,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            root_margin: Margin::default(),
            threshold: 0.1,
        }
    }
}

impl ObserverOptions {
    pub fn with_margin(px: f64) -> Self {
        Self {
            root_margin: Margin::uniform(px),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub target: Rect,
    /// Root after applying the margin.
    pub root: Rect,
    pub intersection: Option<Rect>,
    pub ratio: f64,
    pub is_intersecting: bool,
}

impl IntersectionEntry {
    pub fn compute(target: Rect, viewport: Rect, options: &ObserverOptions) -> Self {
        let root = viewport.expand(options.root_margin);
        let intersection = target.intersection(&root);
        let ratio = match intersection {
            Some(_) if target.area() == 0.0 => 1.0,
            Some(overlap) => (overlap.area() / target.area()).clamp(0.0, 1.0),
            None => 0.0,
        };
        let is_intersecting = intersection.is_some() && ratio >= options.threshold;
        Self {
            target,
            root,
            intersection,
            ratio,
            is_intersecting,
        }
    }
}

pub trait IntersectionSink: Send + Sync {
    fn deliver(&self, entry: IntersectionEntry);
}

/// Environment capability that reports target/viewport intersections.
pub trait IntersectionHost: Send + Sync {
    /// Starts watching `target`. The host delivers an initial entry and then
    /// one entry per threshold crossing.
    fn observe(
        &self,
        target: Rect,
        options: ObserverOptions,
        sink: Arc<dyn IntersectionSink>,
    ) -> ObservationId;

    fn unobserve(&self, id: ObservationId);
}

struct Observation {
    target: Rect,
    options: ObserverOptions,
    sink: Arc<dyn IntersectionSink>,
    last: bool,
}

struct ViewportInner {
    width: f64,
    height: f64,
    scroll_y: f64,
    next_id: ObservationId,
    observations: BTreeMap<ObservationId, Observation>,
}

impl ViewportInner {
    fn root(&self) -> Rect {
        Rect::new(0.0, self.scroll_y, self.width, self.height)
    }
}

/// A vertically scrollable viewport over a document of targets.
pub struct ScrollViewport {
    inner: Mutex<ViewportInner>,
}

impl ScrollViewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            inner: Mutex::new(ViewportInner {
                width,
                height,
                scroll_y: 0.0,
                next_id: 1,
                observations: BTreeMap::new(),
            }),
        }
    }

    pub fn root(&self) -> Rect {
        self.lock().root()
    }

    pub fn scroll_y(&self) -> f64 {
        self.lock().scroll_y
    }

    pub fn observation_count(&self) -> usize {
        self.lock().observations.len()
    }

    pub fn scroll_to(&self, y: f64) {
        let pending = {
            let mut inner = self.lock();
            inner.scroll_y = y.max(0.0);
            let root = inner.root();
            gallery_trace!("Viewport scrolled to {:.0}", inner.scroll_y);
            inner
                .observations
                .values_mut()
                .filter_map(|observation| {
                    let entry =
                        IntersectionEntry::compute(observation.target, root, &observation.options);
                    if entry.is_intersecting == observation.last {
                        return None;
                    }
                    observation.last = entry.is_intersecting;
                    Some((observation.sink.clone(), entry))
                })
                .collect::<Vec<_>>()
        };
        // Delivered outside the lock so sinks may call back into the viewport.
        for (sink, entry) in pending {
            sink.deliver(entry);
        }
    }

    pub fn scroll_by(&self, dy: f64) {
        let current = self.scroll_y();
        self.scroll_to(current + dy);
    }

    fn lock(&self) -> MutexGuard<'_, ViewportInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl IntersectionHost for ScrollViewport {
    fn observe(
        &self,
        target: Rect,
        options: ObserverOptions,
        sink: Arc<dyn IntersectionSink>,
    ) -> ObservationId {
        let (id, entry) = {
            let mut inner = self.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            let entry = IntersectionEntry::compute(target, inner.root(), &options);
            inner.observations.insert(
                id,
                Observation {
                    target,
                    options,
                    sink: sink.clone(),
                    last: entry.is_intersecting,
                },
            );
            (id, entry)
        };
        sink.deliver(entry);
        id
    }

    fn unobserve(&self, id: ObservationId) {
        self.lock().observations.remove(&id);
    }
}

struct NotifierState {
    intersecting: watch::Sender<bool>,
    entry: Mutex<Option<IntersectionEntry>>,
}

impl NotifierState {
    fn entry(&self) -> MutexGuard<'_, Option<IntersectionEntry>> {
        self.entry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl IntersectionSink for NotifierState {
    fn deliver(&self, entry: IntersectionEntry) {
        *self.entry() = Some(entry);
        if entry.is_intersecting {
            gallery_debug!(
                "Element entered viewport at y={:.0} (ratio {:.2})",
                entry.target.y,
                entry.ratio
            );
        }
        self.intersecting.send_if_modified(|current| {
            let changed = *current != entry.is_intersecting;
            *current = entry.is_intersecting;
            changed
        });
    }
}

/// Live "is the target in view" flag for a single target.
///
/// Observation starts as soon as a target is set and is released when the
/// target changes or the notifier is dropped.
pub struct VisibilityNotifier {
    host: Arc<dyn IntersectionHost>,
    options: ObserverOptions,
    target: Option<Rect>,
    observation: Option<ObservationId>,
    state: Arc<NotifierState>,
}

impl VisibilityNotifier {
    pub fn new(host: Arc<dyn IntersectionHost>, options: ObserverOptions) -> Self {
        let (intersecting, _) = watch::channel(false);
        Self {
            host,
            options,
            target: None,
            observation: None,
            state: Arc::new(NotifierState {
                intersecting,
                entry: Mutex::new(None),
            }),
        }
    }

    pub fn with_target(
        host: Arc<dyn IntersectionHost>,
        options: ObserverOptions,
        target: Rect,
    ) -> Self {
        let mut notifier = Self::new(host, options);
        notifier.set_target(Some(target));
        notifier
    }

    /// Re-targets the notifier. Setting the same target again is a no-op;
    /// `None` stops observing and clears the flag.
    pub fn set_target(&mut self, target: Option<Rect>) {
        if self.target == target && (target.is_none() || self.observation.is_some()) {
            return;
        }
        self.release();
        self.target = target;
        match target {
            Some(rect) => {
                let sink: Arc<dyn IntersectionSink> = self.state.clone();
                self.observation = Some(self.host.observe(rect, self.options, sink));
            }
            None => {
                *self.state.entry() = None;
                self.state.intersecting.send_if_modified(|current| {
                    let changed = *current;
                    *current = false;
                    changed
                });
            }
        }
    }

    pub fn target(&self) -> Option<Rect> {
        self.target
    }

    pub fn is_observing(&self) -> bool {
        self.observation.is_some()
    }

    pub fn is_intersecting(&self) -> bool {
        *self.state.intersecting.borrow()
    }

    /// Most recent raw observation, if any has been delivered.
    pub fn entry(&self) -> Option<IntersectionEntry> {
        *self.state.entry()
    }

    /// Receiver that is notified on every flip of the flag.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.intersecting.subscribe()
    }

    fn release(&mut self) {
        if let Some(id) = self.observation.take() {
            self.host.unobserve(id);
        }
    }
}

impl Drop for VisibilityNotifier {
    fn drop(&mut self) {
        self.release();
    }
}
