//! earthcube - satellite imagery coverage and data-cube products
//!
//! earthcube answers point coverage queries against Landsat/Sentinel
//! spatial indexes and renders visual products (NDVI time series and
//! transects, colour composites) from an ingested scene store, exposed
//! over a small HTTP API.
//!
//! # Examples
//!
//! ```
//! use earthcube::Params;
//!
//! let params = Params::from_pairs(vec![
//!     ("Selection".to_string(), "rectangle".to_string()),
//!     ("TYPE".to_string(), "ndvi_time_series".to_string()),
//! ]);
//! assert_eq!(params.get("selection"), Some("rectangle"));
//! assert!(earthcube::params::isdate("2018-1-1"));
//! ```

pub mod api;
pub mod config;
pub mod datacube;
pub mod db;
pub mod error;
pub mod params;
pub mod processing;
pub mod render;
pub mod types;

pub use config::Settings;
pub use datacube::{Cube, CubeQuery, Datacube, DatasetProfile, DATASET};
pub use db::{CoverageRecord, CoverageSource, SpatialDb};
pub use error::{Error, Result};
pub use params::Params;
pub use processing::{Outcome, PlotSummary, Processor};
pub use types::{BoundingBox, GeoTransform, LineGeometry};
