//! Application configuration, read from a RON file.
//!
//! Every field has a default, so a partial file only overrides what it names.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use gallery_core::{EffectiveType, FilterKind, CATALOG_LIMIT};
use gallery_engine::{
    EngineConfig, FetchSettings, IdleStrategy, MonitorSettings, SchedulerSettings,
};
use gallery_logging::{gallery_info, gallery_warn};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "gallery.ron";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub redirect_limit: usize,
    pub max_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let defaults = FetchSettings::default();
        Self {
            connect_timeout_ms: defaults.connect_timeout.as_millis() as u64,
            request_timeout_ms: defaults.request_timeout.as_millis() as u64,
            redirect_limit: defaults.redirect_limit,
            max_bytes: defaults.max_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub columns: usize,
    /// Pixels scrolled per simulation step.
    pub scroll_step: f64,
    pub steps: usize,
    pub tick_ms: u64,
    /// Time allowed for in-flight work after the last step.
    pub settle_ms: u64,
    /// Label of the simulated connection (`slow-2g`, `2g`, `3g`, `4g`, `unknown`).
    pub effective_type: String,
    /// Step at which the simulated connection drops for a few steps.
    pub offline_at: Option<usize>,
    pub offline_steps: usize,
    /// Filter selected half-way through the run.
    pub filter: Option<FilterKind>,
    /// Export the first loaded image once the filter is applied.
    pub auto_export: bool,
    pub fetch: FetchConfig,
    pub idle_timeout_ms: u64,
    pub quiet_period_ms: u64,
    pub monitor_interval_ms: u64,
    pub batch_delay_ms: u64,
    pub output_dir: PathBuf,
    pub rng_seed: Option<u64>,
    /// Images whose decoded rasters the engine keeps in memory.
    pub cache_capacity: usize,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            viewport_width: 800.0,
            viewport_height: 600.0,
            columns: 3,
            scroll_step: 250.0,
            steps: 40,
            tick_ms: 100,
            settle_ms: 2000,
            effective_type: EffectiveType::FourG.label().to_string(),
            offline_at: None,
            offline_steps: 3,
            filter: None,
            auto_export: false,
            fetch: FetchConfig::default(),
            idle_timeout_ms: 5000,
            quiet_period_ms: 200,
            monitor_interval_ms: 5000,
            batch_delay_ms: 1500,
            output_dir: PathBuf::from("exports"),
            rng_seed: None,
            cache_capacity: CATALOG_LIMIT,
        }
    }
}

impl GalleryConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Missing file gives defaults; an unreadable or invalid one is logged and
    /// also gives defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            gallery_info!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::from_file(path) {
            Ok(config) => {
                gallery_info!("Loaded config from {}", path.display());
                config
            }
            Err(err) => {
                gallery_warn!("{}; using defaults", err);
                Self::default()
            }
        }
    }

    pub fn effective_type(&self) -> EffectiveType {
        self.effective_type
            .parse()
            .unwrap_or(EffectiveType::Unknown)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            fetch: FetchSettings {
                connect_timeout: Duration::from_millis(self.fetch.connect_timeout_ms),
                request_timeout: Duration::from_millis(self.fetch.request_timeout_ms),
                redirect_limit: self.fetch.redirect_limit,
                max_bytes: self.fetch.max_bytes,
                ..FetchSettings::default()
            },
            scheduler: SchedulerSettings {
                idle_timeout: Duration::from_millis(self.idle_timeout_ms),
            },
            monitor: MonitorSettings {
                refresh_interval: Duration::from_millis(self.monitor_interval_ms),
            },
            idle: IdleStrategy::QuietPeriod(Duration::from_millis(self.quiet_period_ms)),
            batch_delay: Duration::from_millis(self.batch_delay_ms),
            output_dir: self.output_dir.clone(),
            rng_seed: self.rng_seed,
            cache_capacity: self.cache_capacity,
            clock: Arc::new(|| Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }
}
