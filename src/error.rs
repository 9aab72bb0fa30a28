use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no points to animate")]
    EmptyPath,

    #[error("path has {len} point(s), at least 2 are needed to animate")]
    InsufficientPath { len: usize },

    #[error("network error: {0}")]
    Network(String),

    #[error("map failed to initialize: {0}")]
    MapInit(String),

    #[error("invalid coordinate: latitude={latitude}, longitude={longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("failed to decode track data: {0}")]
    Decode(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
