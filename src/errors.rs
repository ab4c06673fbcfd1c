use std::{io, num::ParseFloatError, str::Utf8Error};

use quick_xml::events::attributes::AttrError;

/// Failure to obtain the OSM payload, either from the cache or upstream.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("map data unavailable: {0}")]
    Unavailable(String),

    #[error("cache error: {0}")]
    Cache(#[from] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("way {way} references unknown node {node}")]
    DanglingReference { way: String, node: String },
}

/// Never surfaced to callers of the elevation client, only logged.
#[derive(Debug, thiserror::Error)]
pub enum ElevationError {
    #[error("elevation request failed: {0}")]
    Transport(String),

    #[error("elevation service answered {status}: {message}")]
    Status { status: String, message: String },

    #[error("could not decode elevation response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("GPX error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid grid: {0}")]
    Grid(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Short message shown to the user through the progress callback.
    pub fn status_message(&self) -> String {
        match self {
            Error::Fetch(FetchError::Unavailable(_)) => {
                "Download failed. Increase the zoom or check the connection.".to_string()
            }
            Error::Parse(ParseError::Malformed(_)) => "Could not parse the map data.".to_string(),
            other => format!("Import failed: {}", other),
        }
    }
}

impl From<quick_xml::Error> for ParseError {
    fn from(value: quick_xml::Error) -> Self {
        ParseError::Malformed(value.to_string())
    }
}

impl From<AttrError> for ParseError {
    fn from(value: AttrError) -> Self {
        ParseError::Malformed(value.to_string())
    }
}

impl From<Utf8Error> for ParseError {
    fn from(value: Utf8Error) -> Self {
        ParseError::Malformed(value.to_string())
    }
}

impl From<ParseFloatError> for ParseError {
    fn from(value: ParseFloatError) -> Self {
        ParseError::Malformed(value.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Config(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
