//! Connection monitor: owns the single [`ConnectionSnapshot`] and publishes it
//! through a watch channel.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use gallery_core::{ConnectionSnapshot, EffectiveType};
use gallery_logging::{gallery_debug, gallery_info};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Best-effort connection details; any field may be missing on a given host.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConnectionDetails {
    pub effective_type: Option<EffectiveType>,
    pub downlink_mbps: Option<f64>,
    pub rtt_ms: Option<u32>,
    pub save_data: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionReading {
    pub online: bool,
    /// `None` when the host exposes no connection information at all.
    pub details: Option<ConnectionDetails>,
}

impl ConnectionReading {
    pub fn into_snapshot(self) -> ConnectionSnapshot {
        let details = self.details.unwrap_or_default();
        ConnectionSnapshot {
            online: self.online,
            effective_type: details.effective_type.unwrap_or(EffectiveType::Unknown),
            downlink_mbps: details.downlink_mbps.unwrap_or(0.0),
            rtt_ms: details.rtt_ms.unwrap_or(0),
            save_data: details.save_data.unwrap_or(false),
        }
    }
}

/// Host capability that reads the current network characteristics.
#[async_trait::async_trait]
pub trait ConnectionProbe: Send + Sync {
    async fn read(&self) -> ConnectionReading;
}

/// Events a host may push between periodic refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    Online,
    Offline,
    /// Connection characteristics changed; triggers a full refresh.
    Changed,
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Safety-net refresh for hosts that do not fire change events reliably.
    pub refresh_interval: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(5),
        }
    }
}

pub struct ConnectionMonitor {
    snapshot: watch::Receiver<ConnectionSnapshot>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl ConnectionMonitor {
    /// Reads the probe once, then keeps the snapshot fresh in the background.
    pub async fn start(
        probe: Arc<dyn ConnectionProbe>,
        events: Option<mpsc::UnboundedReceiver<ConnectivityEvent>>,
        settings: MonitorSettings,
    ) -> Self {
        let initial = probe.read().await.into_snapshot();
        log_snapshot(&initial);
        let (tx, rx) = watch::channel(initial);
        let cancel = CancellationToken::new();
        let worker = tokio::spawn(refresh_loop(probe, events, settings, tx, cancel.clone()));
        Self {
            snapshot: rx,
            cancel,
            worker: Some(worker),
        }
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.snapshot.clone()
    }

    /// Stops the timer and event listeners.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
    }
}

impl Drop for ConnectionMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

enum Step {
    Stop,
    Refresh,
    Event(Option<ConnectivityEvent>),
}

async fn refresh_loop(
    probe: Arc<dyn ConnectionProbe>,
    mut events: Option<mpsc::UnboundedReceiver<ConnectivityEvent>>,
    settings: MonitorSettings,
    tx: watch::Sender<ConnectionSnapshot>,
    cancel: CancellationToken,
) {
    let start = tokio::time::Instant::now() + settings.refresh_interval;
    let mut ticker = tokio::time::interval_at(start, settings.refresh_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        let step = tokio::select! {
            _ = cancel.cancelled() => Step::Stop,
            _ = ticker.tick() => Step::Refresh,
            event = next_event(&mut events) => Step::Event(event),
        };

        match step {
            Step::Stop => break,
            Step::Refresh => refresh(probe.as_ref(), &tx).await,
            Step::Event(Some(ConnectivityEvent::Changed)) => {
                gallery_debug!("Connection change event");
                refresh(probe.as_ref(), &tx).await;
            }
            Step::Event(Some(ConnectivityEvent::Online)) => set_online(&tx, true),
            Step::Event(Some(ConnectivityEvent::Offline)) => set_online(&tx, false),
            Step::Event(None) => {
                gallery_debug!("Connectivity event source closed");
                events = None;
            }
        }
    }
}

async fn next_event(
    events: &mut Option<mpsc::UnboundedReceiver<ConnectivityEvent>>,
) -> Option<ConnectivityEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn refresh(probe: &dyn ConnectionProbe, tx: &watch::Sender<ConnectionSnapshot>) {
    let next = probe.read().await.into_snapshot();
    log_snapshot(&next);
    tx.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}

/// Only the online flag changes; everything else waits for the next refresh.
fn set_online(tx: &watch::Sender<ConnectionSnapshot>, online: bool) {
    gallery_info!("Network: {}", if online { "online" } else { "offline" });
    tx.send_if_modified(|current| {
        let changed = current.online != online;
        current.online = online;
        changed
    });
}

fn log_snapshot(snapshot: &ConnectionSnapshot) {
    gallery_debug!(
        "Network info updated: online={} effective_type={} downlink={:.1}Mbps rtt={}ms save_data={}",
        snapshot.online,
        snapshot.effective_type,
        snapshot.downlink_mbps,
        snapshot.rtt_ms,
        snapshot.save_data
    );
}

/// Host that exposes no connection details; always reports online.
#[derive(Debug, Clone, Default)]
pub struct NullProbe;

#[async_trait::async_trait]
impl ConnectionProbe for NullProbe {
    async fn read(&self) -> ConnectionReading {
        ConnectionReading {
            online: true,
            details: None,
        }
    }
}

/// Settable probe for simulations and tests.
#[derive(Debug)]
pub struct SimulatedProbe {
    reading: Mutex<ConnectionReading>,
}

impl SimulatedProbe {
    pub fn new(effective_type: EffectiveType) -> Self {
        Self {
            reading: Mutex::new(ConnectionReading {
                online: true,
                details: Some(typical_details(effective_type)),
            }),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.lock().online = online;
    }

    pub fn set_effective_type(&self, effective_type: EffectiveType) {
        self.lock().details = Some(typical_details(effective_type));
    }

    pub fn set_reading(&self, reading: ConnectionReading) {
        *self.lock() = reading;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ConnectionReading> {
        self.reading.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl ConnectionProbe for SimulatedProbe {
    async fn read(&self) -> ConnectionReading {
        self.lock().clone()
    }
}

/// Representative downlink/rtt figures for each effective type.
fn typical_details(effective_type: EffectiveType) -> ConnectionDetails {
    let (downlink_mbps, rtt_ms) = match effective_type {
        EffectiveType::Slow2g => (0.05, 2000),
        EffectiveType::TwoG => (0.25, 1400),
        EffectiveType::ThreeG => (0.7, 270),
        EffectiveType::FourG => (10.0, 50),
        EffectiveType::Unknown => {
            return ConnectionDetails::default();
        }
    };
    ConnectionDetails {
        effective_type: Some(effective_type),
        downlink_mbps: Some(downlink_mbps),
        rtt_ms: Some(rtt_ms),
        save_data: Some(false),
    }
}
