//! Resolves an area of interest to an OSM payload, from the local cache when
//! possible and from the OSM API otherwise.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::PathBuf,
    sync::Arc,
};

use log::{info, warn};
use reqwest::blocking::Client;

use crate::{config::ImportConfig, data::geo::GeoPoint, errors::FetchError};

pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// A blocking HTTP GET. Any status is a successful response at this level;
/// only transport failures are errors.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse, FetchError>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &ImportConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.http_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|err| FetchError::Unavailable(err.to_string()))?;
        Ok(ReqwestTransport { client })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|err| FetchError::Unavailable(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|err| FetchError::Unavailable(err.to_string()))?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// Area fetched around a point. `zoom` follows the OSM zoom levels: the half
/// width in degrees is `360 / 2^zoom`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: GeoPoint,
    pub max: GeoPoint,
}

impl BoundingBox {
    pub fn around(center: GeoPoint, zoom: u32) -> Self {
        let delta = 360.0 / 2f64.powi(zoom as i32);
        BoundingBox {
            min: GeoPoint::new(center.latitude - delta, center.longitude - delta),
            max: GeoPoint::new(center.latitude + delta, center.longitude + delta),
        }
    }

    /// `lon1,lat1,lon2,lat2`, as the OSM map API expects it.
    pub fn to_query(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min.longitude, self.min.latitude, self.max.longitude, self.max.latitude
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheKey {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: u32,
}

impl CacheKey {
    pub fn file_name(&self) -> String {
        format!("{}_{}_{}", self.latitude, self.longitude, self.zoom)
    }
}

/// Storage for fetched payloads. Entries never expire; implementations wanting
/// expiry can decide in `read` whether an entry is still fresh.
pub trait PayloadCache {
    fn read(&self, key: &CacheKey) -> io::Result<Option<Vec<u8>>>;
    fn write(&self, key: &CacheKey, payload: &[u8]) -> io::Result<()>;
}

/// One file per key under a single directory. Append-only: an existing file is
/// never rewritten.
pub struct FsCache {
    dir: PathBuf,
}

impl FsCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FsCache { dir: dir.into() }
    }

    pub fn path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }
}

impl PayloadCache for FsCache {
    fn read(&self, key: &CacheKey) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn write(&self, key: &CacheKey, payload: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut file = match OpenOptions::new().write(true).create_new(true).open(self.path(key)) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(()),
            Err(err) => return Err(err),
        };
        file.write_all(payload)?;
        file.sync_all()
    }
}

pub struct OsmGateway {
    transport: Arc<dyn Transport>,
    cache: Box<dyn PayloadCache>,
    api_url: String,
}

impl OsmGateway {
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: Box<dyn PayloadCache>,
        api_url: impl Into<String>,
    ) -> Self {
        OsmGateway {
            transport,
            cache,
            api_url: api_url.into(),
        }
    }

    pub fn from_config(config: &ImportConfig, transport: Arc<dyn Transport>) -> Self {
        OsmGateway::new(
            transport,
            Box::new(FsCache::new(config.cache_dir.clone())),
            config.osm_api_url.clone(),
        )
    }

    /// Returns the payload for the area around `origin`. A cached payload is
    /// returned as is; otherwise one request is made and a 200 answer is cached
    /// verbatim. There is no retry here.
    pub fn fetch(&self, origin: GeoPoint, zoom: u32) -> Result<Vec<u8>, FetchError> {
        let key = CacheKey {
            latitude: origin.latitude,
            longitude: origin.longitude,
            zoom,
        };
        if let Some(payload) = self.cache.read(&key)? {
            info!(
                key = key.file_name().as_str(),
                bytes = payload.len();
                "Reading OSM data from cache"
            );
            return Ok(payload);
        }

        let bbox = BoundingBox::around(origin, zoom);
        let bbox_query = bbox.to_query();
        info!(url = self.api_url.as_str(), bbox = bbox_query.as_str(); "Downloading OSM data");
        let response = self.transport.get(&self.api_url, &[("bbox", bbox_query)])?;
        if !response.is_ok() {
            return Err(FetchError::Unavailable(format!("HTTP status {}", response.status)));
        }

        if let Err(err) = self.cache.write(&key, &response.body) {
            warn!(
                key = key.file_name().as_str(),
                err = err.to_string().as_str();
                "Could not write OSM data to cache"
            );
        }
        Ok(response.body)
    }
}
