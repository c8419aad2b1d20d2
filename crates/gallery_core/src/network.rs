use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Coarse connection-speed classification reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EffectiveType {
    #[serde(rename = "slow-2g")]
    Slow2g,
    #[serde(rename = "2g")]
    TwoG,
    #[serde(rename = "3g")]
    ThreeG,
    #[serde(rename = "4g")]
    FourG,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl EffectiveType {
    pub fn label(self) -> &'static str {
        match self {
            EffectiveType::Slow2g => "slow-2g",
            EffectiveType::TwoG => "2g",
            EffectiveType::ThreeG => "3g",
            EffectiveType::FourG => "4g",
            EffectiveType::Unknown => "unknown",
        }
    }

    /// Classify measured round-trip time (ms) and downlink (Mbit/s) using the
    /// thresholds of the Network Information effective-type table.
    pub fn classify(rtt_ms: u32, downlink_mbps: f64) -> Self {
        if rtt_ms >= 2000 || downlink_mbps <= 0.05 {
            EffectiveType::Slow2g
        } else if rtt_ms >= 1400 || downlink_mbps <= 0.07 {
            EffectiveType::TwoG
        } else if rtt_ms >= 270 || downlink_mbps <= 0.7 {
            EffectiveType::ThreeG
        } else {
            EffectiveType::FourG
        }
    }
}

impl fmt::Display for EffectiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unrecognised labels degrade to `Unknown` rather than failing.
impl FromStr for EffectiveType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "slow-2g" => EffectiveType::Slow2g,
            "2g" => EffectiveType::TwoG,
            "3g" => EffectiveType::ThreeG,
            "4g" => EffectiveType::FourG,
            _ => EffectiveType::Unknown,
        })
    }
}

/// Point-in-time view of the network, replaced wholesale on every refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    pub online: bool,
    pub effective_type: EffectiveType,
    /// Downlink estimate in Mbit/s.
    pub downlink_mbps: f64,
    /// Round-trip estimate in milliseconds.
    pub rtt_ms: u32,
    pub save_data: bool,
}

impl Default for ConnectionSnapshot {
    fn default() -> Self {
        Self {
            online: true,
            effective_type: EffectiveType::Unknown,
            downlink_mbps: 0.0,
            rtt_ms: 0,
            save_data: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    Low,
    Medium,
    High,
}

impl Quality {
    pub fn label(self) -> &'static str {
        match self {
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Quality policy. `None` means the host never reported an effective type.
pub fn quality_for(effective_type: Option<EffectiveType>) -> Quality {
    match effective_type {
        Some(EffectiveType::Slow2g) | Some(EffectiveType::TwoG) => Quality::Low,
        Some(EffectiveType::ThreeG) => Quality::Medium,
        Some(EffectiveType::FourG) | Some(EffectiveType::Unknown) | None => Quality::High,
    }
}

/// Artificial delay before a load-more batch lands, scaled to the connection.
pub fn load_more_delay(effective_type: EffectiveType) -> Duration {
    let millis = match effective_type {
        EffectiveType::Slow2g => 2000,
        EffectiveType::TwoG => 1500,
        EffectiveType::ThreeG => 1000,
        EffectiveType::FourG | EffectiveType::Unknown => 500,
    };
    Duration::from_millis(millis)
}
