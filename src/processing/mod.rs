//! Data-cube product dispatch
//!
//! Maps a request parameter set onto one of the imagery products: the
//! `selection` decides the geometry (line or rectangle), the `type` the
//! renderer. Rejections are structured values handed back to the HTTP
//! layer, never faults.

pub mod products;

use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;

use crate::datacube::{Datacube, DatasetProfile, DATASET};
use crate::error::Result;
use crate::params::{isdate, Params};
use crate::types::{BoundingBox, LineGeometry};

/// Mimetype reported for every rendered plot
pub const MIMETYPE: &str = "image/jpg";

/// R,G,B measurement triples for the composite products
const TRUE_COLOUR: [&str; 3] = ["B04_10m", "B03_10m", "B02_10m"];
const COLOUR_INFRARED: [&str; 3] = ["B08_10m", "B04_10m", "B03_10m"];
const COLOUR_URBAN: [&str; 3] = ["B12_20m", "B11_20m", "B04_20m"];

/// Summary of a plot written to the caller's file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotSummary {
    pub mimetype: &'static str,
    /// Bytes written
    pub size: u64,
}

/// Result of a processing request
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A plot was rendered into the output
    Plot(PlotSummary),
    /// The request was rejected with a structured message
    Rejected(String),
}

impl Outcome {
    fn rejected(msg: impl Into<String>) -> Self {
        Outcome::Rejected(msg.into())
    }
}

/// Executes data-cube products against the configured dataset
#[derive(Debug, Clone)]
pub struct Processor {
    datacube: Datacube,
    profile: DatasetProfile,
}

impl Processor {
    /// Creates a processor over the scene store using the active profile
    pub fn new(data_dir: &Path) -> Self {
        Self::with_profile(data_dir, DATASET)
    }

    /// Creates a processor with an explicit profile
    pub fn with_profile(data_dir: &Path, profile: DatasetProfile) -> Self {
        Self {
            datacube: Datacube::open(data_dir),
            profile,
        }
    }

    pub(crate) fn datacube(&self) -> &Datacube {
        &self.datacube
    }

    pub(crate) fn profile(&self) -> &DatasetProfile {
        &self.profile
    }

    /// Handles request parameters and dispatches the right product
    pub fn execute<W: Write>(&self, params: &Params, out: &mut W) -> Result<Outcome> {
        if !params.has("selection") || !params.has("type") {
            return Ok(Outcome::rejected(
                "Both selection [line|rectangle] and type \
                 [ndvi_transect|ndvi_time_series|time_series|...] need to be defined.",
            ));
        }
        match params.get("selection") {
            Some("line") => self.line(params, out),
            Some("rectangle") => self.rectangle(params, out),
            _ => Ok(Outcome::rejected(
                "Both selection [line|rectangle] and type \
                 [ndvi_transect|ndvi_time_series|time_series|...] need to be defined.",
            )),
        }
    }

    /// Line-based products, currently only the NDVI transect
    ///
    /// A line can potentially be any multipoint LINESTRING but we start
    /// with xmin,xmax,ymin,ymax.
    fn line<W: Write>(&self, params: &Params, out: &mut W) -> Result<Outcome> {
        let bounds = match parse_bounds(params, "Line requires xmin,xmax,ymin,ymax") {
            Ok(bounds) => bounds,
            Err(msg) => return Ok(Outcome::rejected(msg)),
        };
        let time = match parse_time(params) {
            Ok(time) => time,
            Err(msg) => return Ok(Outcome::rejected(msg)),
        };
        let line = LineGeometry::from_bounds(bounds.xmin, bounds.ymin, bounds.xmax, bounds.ymax);
        match params.get("type") {
            Some("ndvi_transect") => Ok(self.ndvi_transect(line, time, out)),
            _ => Ok(Outcome::rejected(
                "Supported line-processing types: ndvi_transect",
            )),
        }
    }

    /// Rectangle-based products
    fn rectangle<W: Write>(&self, params: &Params, out: &mut W) -> Result<Outcome> {
        let bounds = match parse_bounds(params, "Rectangle requires xmin,xmax,ymin,ymax") {
            Ok(bounds) => bounds,
            Err(msg) => return Ok(Outcome::rejected(msg)),
        };
        let time = match parse_time(params) {
            Ok(time) => time,
            Err(msg) => return Ok(Outcome::rejected(msg)),
        };
        match params.get("type") {
            Some("ndvi_time_series") => Ok(self.ndvi_time_series(bounds, time, false, out)),
            Some("ndvi_std_dev") => Ok(self.ndvi_time_series(bounds, time, true, out)),
            Some("time_series") => Ok(self.composite(bounds, time, TRUE_COLOUR, out)),
            Some("colour_infrared") => Ok(self.composite(bounds, time, COLOUR_INFRARED, out)),
            Some("colour_urban") => Ok(self.composite(bounds, time, COLOUR_URBAN, out)),
            _ => Ok(Outcome::rejected(
                "Please use a supported rectangle-processing type \
                 e.g. ndvi_time_series, colour_infrared etc.",
            )),
        }
    }
}

/// Parses the four bounding values, rejecting missing or non-numeric
/// input with the selection's requires-message
fn parse_bounds(params: &Params, requires: &str) -> std::result::Result<BoundingBox, String> {
    let get = |key: &str| -> std::result::Result<f64, String> {
        match params.float(key) {
            Some(Ok(value)) => Ok(value),
            Some(Err(detail)) => Err(format!("{} ({})", requires, detail)),
            None => Err(requires.to_string()),
        }
    };
    Ok(BoundingBox::new(
        get("xmin")?,
        get("ymin")?,
        get("xmax")?,
        get("ymax")?,
    ))
}

/// Parses the optional time range; both ends must be YYYY-MM-DD
fn parse_time(
    params: &Params,
) -> std::result::Result<Option<(NaiveDate, NaiveDate)>, String> {
    match (params.get("time_begin"), params.get("time_end")) {
        (Some(begin), Some(end)) if isdate(begin) && isdate(end) => {
            let begin = NaiveDate::parse_from_str(begin, "%Y-%m-%d")
                .map_err(|_| "Invalid time specified".to_string())?;
            let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")
                .map_err(|_| "Invalid time specified".to_string())?;
            Ok(Some((begin, end)))
        }
        (Some(_), Some(_)) => Err("Invalid time specified".to_string()),
        _ => Ok(None),
    }
}
