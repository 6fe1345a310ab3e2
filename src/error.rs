//! Error types for earthcube

use std::fmt;
use std::io;

/// Result type for earthcube operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in earthcube operations
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(io::Error),

    /// Configuration loading or validation error
    Config(String),

    /// Spatial index database error
    Db(sqlx::Error),

    /// Scene store error (missing or malformed manifest)
    Store(String),

    /// Band raster decode error
    Decode(tiff::TiffError),

    /// Plot encode error
    Image(image::ImageError),

    /// Manifest parse error
    Json(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Db(e) => write!(f, "Database error: {}", e),
            Error::Store(msg) => write!(f, "Scene store error: {}", msg),
            Error::Decode(e) => write!(f, "Raster decode error: {}", e),
            Error::Image(e) => write!(f, "Image encode error: {}", e),
            Error::Json(e) => write!(f, "Manifest parse error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Db(e) => Some(e),
            Error::Decode(e) => Some(e),
            Error::Image(e) => Some(e),
            Error::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Io(error)
    }
}

impl From<sqlx::Error> for Error {
    fn from(error: sqlx::Error) -> Self {
        Error::Db(error)
    }
}

impl From<tiff::TiffError> for Error {
    fn from(error: tiff::TiffError) -> Self {
        Error::Decode(error)
    }
}

impl From<image::ImageError> for Error {
    fn from(error: image::ImageError) -> Self {
        Error::Image(error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json(error)
    }
}

impl From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Error::Config(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Store("no manifest".to_string());
        assert_eq!(err.to_string(), "Scene store error: no manifest");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_config_error_display() {
        let err = Error::Config("missing [path] section".to_string());
        assert!(err.to_string().contains("[path]"));
    }
}
