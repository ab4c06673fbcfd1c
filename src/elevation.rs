//! Best-effort altitude lookup. Every failure degrades to zero altitude (or a
//! missing sample) with a logged warning; nothing here fails an import.

use std::{collections::HashMap, sync::Arc, thread, time::Duration};

use log::{info, warn};
use serde::Deserialize;

use crate::{
    config::ImportConfig,
    data::geo::GeoPoint,
    errors::ElevationError,
    fetch::Transport,
};

const STATUS_OK: &str = "OK";
const STATUS_OVER_QUERY_LIMIT: &str = "OVER_QUERY_LIMIT";

/// Waits between rate-limited attempts.
pub trait Pause: Send + Sync {
    fn pause(&self, duration: Duration);
}

pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Deserialize, Debug)]
struct ElevationResponse {
    status: String,
    #[serde(default)]
    results: Vec<ElevationResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ElevationResult {
    elevation: f64,
    location: Location,
}

#[derive(Deserialize, Debug)]
struct Location {
    lat: f64,
    lng: f64,
}

/// Join key between requested points and returned samples. Coordinates equal
/// to 7 decimals share a sample.
pub fn elevation_key(latitude: f64, longitude: f64) -> String {
    format!("{:.7} {:.7}", latitude, longitude)
}

pub struct ElevationClient {
    transport: Arc<dyn Transport>,
    pause: Box<dyn Pause>,
    api_url: String,
    api_key: Option<String>,
    retry_delay: Duration,
    max_attempts: u32,
    batch_size: usize,
}

impl ElevationClient {
    pub fn new(
        config: &ImportConfig,
        transport: Arc<dyn Transport>,
        pause: Box<dyn Pause>,
    ) -> Self {
        ElevationClient {
            transport,
            pause,
            api_url: config.elevation_api_url.clone(),
            api_key: config.elevation_api_key.clone().filter(|key| !key.is_empty()),
            retry_delay: config.elevation_retry_delay(),
            max_attempts: config.elevation_max_attempts.max(1),
            batch_size: config.elevation_batch_size.max(1),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Issues one logical query, retrying while the service reports a rate
    /// limit. At most `max_attempts` requests, with a pause between two.
    fn query(&self, api_key: &str, locations: String) -> Result<ElevationResponse, ElevationError> {
        for attempt in 1..=self.max_attempts {
            let response = self
                .transport
                .get(
                    &self.api_url,
                    &[("locations", locations.clone()), ("key", api_key.to_string())],
                )
                .map_err(|err| ElevationError::Transport(err.to_string()))?;
            if !response.is_ok() {
                return Err(ElevationError::Transport(format!("HTTP status {}", response.status)));
            }

            let payload: ElevationResponse = serde_json::from_slice(&response.body)?;
            match payload.status.as_str() {
                STATUS_OK => return Ok(payload),
                STATUS_OVER_QUERY_LIMIT => {
                    if attempt < self.max_attempts {
                        warn!(
                            attempt = attempt,
                            delay_ms = self.retry_delay.as_millis() as u64;
                            "Elevation query over limit, retrying"
                        );
                        self.pause.pause(self.retry_delay);
                    }
                }
                _ => {
                    return Err(ElevationError::Status {
                        status: payload.status,
                        message: payload.error_message.unwrap_or_default(),
                    })
                }
            }
        }
        Err(ElevationError::Status {
            status: STATUS_OVER_QUERY_LIMIT.to_string(),
            message: format!("gave up after {} attempts", self.max_attempts),
        })
    }

    /// Altitude of one point in metres, 0 when unavailable.
    pub fn get_altitude(&self, point: GeoPoint) -> f64 {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("Altitude information not available, no elevation API key configured");
            return 0.0;
        };

        let locations = format!("{},{}", point.latitude, point.longitude);
        match self.query(api_key, locations) {
            Ok(payload) => payload.results.first().map(|r| r.elevation).unwrap_or(0.0),
            Err(err) => {
                warn!(err = err.to_string().as_str(); "Failed to download altitude data");
                0.0
            }
        }
    }

    /// Altitudes of many points keyed by [`elevation_key`], one request per
    /// batch. A failing batch stops the lookup; samples gathered so far are kept.
    pub fn get_altitudes(&self, points: &[GeoPoint]) -> HashMap<String, f64> {
        let mut heights = HashMap::new();
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("Altitude information not available, no elevation API key configured");
            return heights;
        };

        for chunk in points.chunks(self.batch_size) {
            let locations = chunk
                .iter()
                .map(|p| format!("{},{}", p.latitude, p.longitude))
                .collect::<Vec<_>>()
                .join("|");
            match self.query(api_key, locations) {
                Ok(payload) => {
                    for result in payload.results {
                        heights.insert(
                            elevation_key(result.location.lat, result.location.lng),
                            result.elevation,
                        );
                    }
                }
                Err(err) => {
                    warn!(err = err.to_string().as_str(); "Failed to download altitude data");
                    break;
                }
            }
        }
        info!(requested = points.len(), received = heights.len(); "Downloaded altitudes");
        heights
    }
}
