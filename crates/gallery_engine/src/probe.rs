use std::time::{Duration, Instant};

use gallery_core::EffectiveType;
use gallery_logging::gallery_debug;

use crate::connection::{ConnectionDetails, ConnectionProbe, ConnectionReading};

#[derive(Debug, Clone)]
pub struct HttpProbeSettings {
    pub url: String,
    pub timeout: Duration,
    /// Reported as the data-saver flag; the probe cannot measure it.
    pub save_data: bool,
}

/// Estimates connection quality by timing a small GET request.
///
/// Round-trip time is the wait for response headers; downlink is the body
/// size over the full transfer time. Any transport failure reads as offline.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    settings: HttpProbeSettings,
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(settings: HttpProbeSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { settings, client })
    }

    async fn measure(&self) -> Result<ConnectionDetails, reqwest::Error> {
        let started = Instant::now();
        let response = self.client.get(&self.settings.url).send().await?;
        let rtt = started.elapsed();
        let body = response.bytes().await?;
        let total = started.elapsed().max(Duration::from_millis(1));

        let rtt_ms = u32::try_from(rtt.as_millis()).unwrap_or(u32::MAX);
        let downlink_mbps = (body.len() as f64 * 8.0) / total.as_secs_f64() / 1_000_000.0;
        Ok(ConnectionDetails {
            effective_type: Some(EffectiveType::classify(rtt_ms, downlink_mbps)),
            downlink_mbps: Some(downlink_mbps),
            rtt_ms: Some(rtt_ms),
            save_data: Some(self.settings.save_data),
        })
    }
}

#[async_trait::async_trait]
impl ConnectionProbe for HttpProbe {
    async fn read(&self) -> ConnectionReading {
        match self.measure().await {
            Ok(details) => ConnectionReading {
                online: true,
                details: Some(details),
            },
            Err(err) => {
                gallery_debug!("Connection probe to {} failed: {}", self.settings.url, err);
                ConnectionReading {
                    online: false,
                    details: None,
                }
            }
        }
    }
}
