use std::{fs::File, path::{Path, PathBuf}, time::Duration};

use serde::Deserialize;

use crate::errors::{Error, Result};

pub const OSM_API_URL: &str = "https://www.openstreetmap.org/api/0.6/map";
pub const CONNECTIVITY_CHECK_URL: &str = "https://www.openstreetmap.org";
pub const ELEVATION_API_URL: &str = "https://maps.googleapis.com/maps/api/elevation/json";

/// Settings shared by every import. Passed explicitly to the components that
/// need them instead of living in process-wide state.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ImportConfig {
    pub cache_dir: PathBuf,
    pub osm_api_url: String,
    pub connectivity_check_url: String,
    pub elevation_api_url: String,
    pub elevation_api_key: Option<String>,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub elevation_retry_delay_ms: u64,
    pub elevation_max_attempts: u32,
    pub elevation_batch_size: usize,
    pub render_untagged_ways: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            cache_dir: PathBuf::from("cache").join("GeoData"),
            osm_api_url: OSM_API_URL.to_string(),
            connectivity_check_url: CONNECTIVITY_CHECK_URL.to_string(),
            elevation_api_url: ELEVATION_API_URL.to_string(),
            elevation_api_key: None,
            http_timeout_secs: 60,
            user_agent: concat!("geodata-import/", env!("CARGO_PKG_VERSION")).to_string(),
            elevation_retry_delay_ms: 5000,
            elevation_max_attempts: 4,
            elevation_batch_size: 100,
            render_untagged_ways: false,
        }
    }
}

impl ImportConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn elevation_retry_delay(&self) -> Duration {
        Duration::from_millis(self.elevation_retry_delay_ms)
    }

    /// Rejects settings no import could run with.
    pub fn validate(&self) -> Result<()> {
        if self.elevation_batch_size == 0 {
            return Err(Error::Config("elevation_batch_size must be positive".into()));
        }
        if self.elevation_max_attempts == 0 {
            return Err(Error::Config("elevation_max_attempts must be positive".into()));
        }
        Ok(())
    }
}

/// One import to run, as read from the binary's run file.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportJob {
    Osm {
        latitude: f64,
        longitude: f64,
        zoom: u32,
        #[serde(default)]
        download_altitude: bool,
    },
    OsmFile {
        latitude: f64,
        longitude: f64,
        path: PathBuf,
        #[serde(default)]
        download_altitude: bool,
    },
    Csv {
        latitude: f64,
        longitude: f64,
        path: PathBuf,
        #[serde(default)]
        has_header: bool,
    },
    Gpx {
        latitude: f64,
        longitude: f64,
        #[serde(default)]
        altitude_offset: f64,
        path: PathBuf,
    },
    Emir {
        path: PathBuf,
    },
}

impl ImportJob {
    pub fn needs_network(&self) -> bool {
        matches!(self, ImportJob::Osm { .. })
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct RunConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub import: ImportConfig,
    pub job: ImportJob,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

pub fn load_run_config(path: &Path) -> Result<RunConfig> {
    let file = File::open(path)?;
    let config: RunConfig = serde_json::from_reader(file)?;
    config.import.validate()?;
    Ok(config)
}
