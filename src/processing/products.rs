//! Imagery product renderers
//!
//! Each product issues one cube load, derives its quantity with plain
//! array math, masks unusable pixels and rasterizes the result. Load and
//! render failures are converted to structured rejections; the output
//! handle is owned by the caller.

use std::io::Write;

use chrono::NaiveDate;
use image::RgbImage;
use ndarray::{Array2, Array3};
use rayon::prelude::*;

use crate::datacube::{Cube, CubeQuery, GRANULE_RESOLUTION, TRANSECT_RESOLUTION};
use crate::error::{Error, Result};
use crate::processing::{Outcome, PlotSummary, Processor, MIMETYPE};
use crate::render;
use crate::types::{BoundingBox, LineGeometry};

/// Reflectance above this counts as saturated in colour composites
const FAKE_SATURATION: f32 = 4000.0;

/// Scene-classification classes masked out of NDVI products: cloud
/// shadow, cloud medium/high probability, cirrus, snow
const SCL_MASKED: [f32; 5] = [3.0, 8.0, 9.0, 10.0, 11.0];

/// NDVI time-series measurements
const NDVI_RED: &str = "B04_20m";
const NDVI_NIR: &str = "B8A_20m";
const NDVI_SCL: &str = "SCL_20m";

/// Transects read the 10m product directly
const TRANSECT_PRODUCT: &str = "safe_10m";
const TRANSECT_RED: &str = "B04_10m";
const TRANSECT_NIR: &str = "B08_10m";

type TimeRange = Option<(NaiveDate, NaiveDate)>;

impl Processor {
    /// Output grid resolution for the active profile
    fn resolution(&self) -> f64 {
        if self.profile().is_granule() {
            GRANULE_RESOLUTION
        } else {
            TRANSECT_RESOLUTION
        }
    }

    fn no_data(&self) -> Outcome {
        Outcome::Rejected(format!(
            "Didn't find any index/ingested data in selected area at {:?}",
            self.profile()
        ))
    }

    /// Multiple images with R,G,B mapped to the given measurements
    pub(crate) fn composite<W: Write>(
        &self,
        bounds: BoundingBox,
        time: TimeRange,
        rgb: [&'static str; 3],
        out: &mut W,
    ) -> Outcome {
        let query = CubeQuery {
            product: self.profile().product.to_string(),
            bounds,
            time,
            measurements: rgb.iter().map(|m| m.to_string()).collect(),
            resolution: self.resolution(),
        };
        match self.render_composite(&query, rgb, out) {
            Ok(Some(summary)) => Outcome::Plot(summary),
            Ok(None) => self.no_data(),
            Err(e) => Outcome::Rejected(format!("Plotting failed: {}", e)),
        }
    }

    fn render_composite<W: Write>(
        &self,
        query: &CubeQuery,
        rgb: [&'static str; 3],
        out: &mut W,
    ) -> Result<Option<PlotSummary>> {
        let cube = self.datacube().load(query)?;
        if cube.is_empty() {
            return Ok(None);
        }
        let mut channels = Vec::with_capacity(3);
        for name in rgb {
            channels.push(mask_nodata(required_band(&cube, name)?, cube.nodata));
        }
        mask_saturated(&mut channels, FAKE_SATURATION);
        for channel in &mut channels {
            channel.mapv_inplace(|v| v / FAKE_SATURATION);
        }

        let steps = cube.times.len();
        let panels: Vec<RgbImage> = (0..steps)
            .into_par_iter()
            .map(|t| {
                render::upscale(&render::rgb_panel(
                    channels[0].index_axis(ndarray::Axis(0), t),
                    channels[1].index_axis(ndarray::Axis(0), t),
                    channels[2].index_axis(ndarray::Axis(0), t),
                ))
            })
            .collect();
        let plot = render::facet_grid(&panels, 5);
        let size = render::write_jpeg(&plot, out)?;
        Ok(Some(PlotSummary {
            mimetype: MIMETYPE,
            size,
        }))
    }

    /// NDVI per solar day over the rectangle, either as a facet grid or
    /// collapsed to its standard deviation over the period
    pub(crate) fn ndvi_time_series<W: Write>(
        &self,
        bounds: BoundingBox,
        time: TimeRange,
        std_dev: bool,
        out: &mut W,
    ) -> Outcome {
        let query = CubeQuery {
            product: self.profile().product.to_string(),
            bounds,
            time,
            measurements: vec![
                NDVI_RED.to_string(),
                NDVI_NIR.to_string(),
                NDVI_SCL.to_string(),
            ],
            resolution: self.resolution(),
        };
        match self.render_ndvi(&query, std_dev, out) {
            Ok(Some(summary)) => Outcome::Plot(summary),
            Ok(None) => self.no_data(),
            Err(e) => Outcome::Rejected(format!("Plotting failed: {}", e)),
        }
    }

    fn render_ndvi<W: Write>(
        &self,
        query: &CubeQuery,
        std_dev: bool,
        out: &mut W,
    ) -> Result<Option<PlotSummary>> {
        let cube = self.datacube().load(query)?;
        if cube.is_empty() {
            return Ok(None);
        }
        let nir = mask_nodata(required_band(&cube, NDVI_NIR)?, cube.nodata);
        let red = mask_nodata(required_band(&cube, NDVI_RED)?, cube.nodata);
        let scl = required_band(&cube, NDVI_SCL)?;

        let mut index = ndvi(&nir, &red);
        for (value, class) in index.iter_mut().zip(scl.iter()) {
            if SCL_MASKED.contains(class) {
                *value = f32::NAN;
            }
        }
        // timesteps that are entirely masked carry no signal
        let keep: Vec<usize> = (0..cube.times.len())
            .filter(|&t| {
                index
                    .index_axis(ndarray::Axis(0), t)
                    .iter()
                    .any(|v| !v.is_nan())
            })
            .collect();
        if keep.is_empty() {
            return Err(Error::Store(
                "no cloud-free NDVI data in the selected period".to_string(),
            ));
        }

        let plot = if std_dev {
            let std = std_over_time(&index, &keep);
            let vmax = std.iter().cloned().filter(|v| v.is_finite()).fold(0.0, f32::max);
            render::upscale(&render::colorize(std.view(), 0.0, vmax, render::VIRIDIS))
        } else {
            let panels: Vec<RgbImage> = keep
                .par_iter()
                .map(|&t| {
                    render::upscale(&render::colorize(
                        index.index_axis(ndarray::Axis(0), t),
                        -1.0,
                        1.0,
                        render::RD_YL_GN,
                    ))
                })
                .collect();
            render::facet_grid(&panels, 3)
        };
        let size = render::write_jpeg(&plot, out)?;
        Ok(Some(PlotSummary {
            mimetype: MIMETYPE,
            size,
        }))
    }

    /// NDVI sampled along the line, rendered as a distance/time heatmap
    pub(crate) fn ndvi_transect<W: Write>(
        &self,
        line: LineGeometry,
        time: TimeRange,
        out: &mut W,
    ) -> Outcome {
        let query = CubeQuery {
            product: TRANSECT_PRODUCT.to_string(),
            bounds: line.bounds(),
            time,
            measurements: vec![TRANSECT_RED.to_string(), TRANSECT_NIR.to_string()],
            resolution: TRANSECT_RESOLUTION,
        };
        match self.render_transect(&query, &line, out) {
            Ok(Some(summary)) => Outcome::Plot(summary),
            Ok(None) => self.no_data(),
            Err(e) => Outcome::Rejected(format!("Plotting failed: {}", e)),
        }
    }

    fn render_transect<W: Write>(
        &self,
        query: &CubeQuery,
        line: &LineGeometry,
        out: &mut W,
    ) -> Result<Option<PlotSummary>> {
        let cube = self.datacube().load(query)?;
        if cube.is_empty() {
            return Ok(None);
        }
        // one sample per grid step along the line
        let resolution = cube.transform.x_res;
        let mut points = Vec::new();
        let mut d = 0.0;
        loop {
            points.push(line.interpolate(d));
            d += resolution;
            if d >= line.length() {
                break;
            }
        }

        let nir = sample_along(&cube, TRANSECT_NIR, &points)?;
        let red = sample_along(&cube, TRANSECT_RED, &points)?;
        let index = ndvi_2d(&nir, &red);

        // x is distance, y is time
        let plot = render::upscale(&render::colorize(
            index.view(),
            -1.0,
            1.0,
            render::RD_YL_GN,
        ));
        let size = render::write_jpeg(&plot, out)?;
        Ok(Some(PlotSummary {
            mimetype: MIMETYPE,
            size,
        }))
    }
}

fn required_band<'a>(cube: &'a Cube, name: &str) -> Result<&'a Array3<f32>> {
    cube.band(name)
        .ok_or_else(|| Error::Store(format!("measurement {} missing from loaded cube", name)))
}

/// Replaces nodata values with NaN
pub(crate) fn mask_nodata(band: &Array3<f32>, nodata: f32) -> Array3<f32> {
    band.mapv(|v| if v == nodata { f32::NAN } else { v })
}

/// Blanks pixels where any channel exceeds the saturation limit
pub(crate) fn mask_saturated(channels: &mut [Array3<f32>], limit: f32) {
    if channels.is_empty() {
        return;
    }
    let shape = channels[0].raw_dim();
    let mut saturated = ndarray::Array3::<bool>::from_elem(shape, false);
    for channel in channels.iter() {
        for (flag, &value) in saturated.iter_mut().zip(channel.iter()) {
            if value > limit {
                *flag = true;
            }
        }
    }
    for channel in channels.iter_mut() {
        for (&flag, value) in saturated.iter().zip(channel.iter_mut()) {
            if flag {
                *value = f32::NAN;
            }
        }
    }
}

/// Normalized difference vegetation index, NaN-propagating
pub(crate) fn ndvi(nir: &Array3<f32>, red: &Array3<f32>) -> Array3<f32> {
    let mut out = nir.clone();
    for (value, (&n, &r)) in out.iter_mut().zip(nir.iter().zip(red.iter())) {
        *value = (n - r) / (n + r);
    }
    out
}

fn ndvi_2d(nir: &Array2<f32>, red: &Array2<f32>) -> Array2<f32> {
    let mut out = nir.clone();
    for (value, (&n, &r)) in out.iter_mut().zip(nir.iter().zip(red.iter())) {
        *value = (n - r) / (n + r);
    }
    out
}

/// Per-pixel standard deviation over the kept timesteps, ignoring NaN
pub(crate) fn std_over_time(index: &Array3<f32>, keep: &[usize]) -> Array2<f32> {
    let (height, width) = (index.shape()[1], index.shape()[2]);
    let mut out = Array2::from_elem((height, width), f32::NAN);
    for row in 0..height {
        for col in 0..width {
            let values: Vec<f32> = keep
                .iter()
                .map(|&t| index[[t, row, col]])
                .filter(|v| !v.is_nan())
                .collect();
            if values.is_empty() {
                continue;
            }
            let mean = values.iter().sum::<f32>() / values.len() as f32;
            let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>()
                / values.len() as f32;
            out[[row, col]] = var.sqrt();
        }
    }
    out
}

/// Samples a band at the given points for every timestep; points outside
/// the grid and nodata samples become NaN
fn sample_along(cube: &Cube, band: &str, points: &[(f64, f64)]) -> Result<Array2<f32>> {
    let data = required_band(cube, band)?;
    let shape = cube.shape();
    let mut out = Array2::from_elem((cube.times.len(), points.len()), f32::NAN);
    for t in 0..cube.times.len() {
        for (i, &(lon, lat)) in points.iter().enumerate() {
            if let Some((row, col)) = cube.transform.pixel_at(lon, lat, shape) {
                let value = data[[t, row, col]];
                if value != cube.nodata {
                    out[[t, i]] = value;
                }
            }
        }
    }
    Ok(out)
}
