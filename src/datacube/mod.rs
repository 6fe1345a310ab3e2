//! Data-cube access
//!
//! The backend is a consumer of an ingested scene store, not an imagery
//! pipeline: scenes are indexed and written by an external process, and
//! this layer only answers band queries over space and time. Scenes for
//! a product live under `<data_dir>/<product>/<scene>/` as a JSON
//! manifest plus one single-band GeoTIFF per measurement, all in WGS84.

pub mod store;

pub use store::{Scene, SceneManifest};

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use ndarray::Array3;

use crate::error::Result;
use crate::types::{BoundingBox, GeoTransform};

/// Accelerated LS8 ingested from S3: R,G,B,NIR
pub const LS8: DatasetProfile = DatasetProfile {
    env: None,
    product: "ls8_rgb_ndvi",
};

/// Raw BOA S2 L2A from disk: all bands, 2 years, less coverage
pub const L2A: DatasetProfile = DatasetProfile {
    env: Some("l2a_safe"),
    product: "s2a_sen2cor_granule",
};

/// Raw TOA S2 L1C from disk: all bands, all years, full coverage
pub const L1C: DatasetProfile = DatasetProfile {
    env: Some("l1c_safe"),
    product: "s2a_level1c_granule",
};

/// Active profile. Make this configurable once users can dynamically
/// generate their own datasets.
pub const DATASET: DatasetProfile = L2A;

/// Granule products are resampled onto this grid
pub const GRANULE_RESOLUTION: f64 = 0.000135;

/// Transect sampling grid; coarser to bound memory
pub const TRANSECT_RESOLUTION: f64 = 0.00027;

/// Named dataset selection: data-cube environment plus product identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetProfile {
    pub env: Option<&'static str>,
    pub product: &'static str,
}

impl DatasetProfile {
    /// Whether the product is stored as raw granules needing an explicit
    /// output grid
    pub fn is_granule(&self) -> bool {
        self.product.contains("granule")
    }
}

/// Spatio-temporal band query against the store
#[derive(Debug, Clone)]
pub struct CubeQuery {
    pub product: String,
    pub bounds: BoundingBox,
    /// Inclusive solar-day range
    pub time: Option<(NaiveDate, NaiveDate)>,
    pub measurements: Vec<String>,
    /// Degrees per output pixel
    pub resolution: f64,
}

/// Band arrays resampled onto a common (time, y, x) grid
#[derive(Debug)]
pub struct Cube {
    /// One entry per solar day, ascending
    pub times: Vec<DateTime<Utc>>,
    bands: HashMap<String, Array3<f32>>,
    pub transform: GeoTransform,
    pub nodata: f32,
}

impl Cube {
    /// Whether the query matched no ingested data
    pub fn is_empty(&self) -> bool {
        self.times.is_empty() || self.bands.is_empty()
    }

    /// A loaded measurement by name
    pub fn band(&self, name: &str) -> Option<&Array3<f32>> {
        self.bands.get(name)
    }

    /// Grid size as (height, width)
    pub fn shape(&self) -> (usize, usize) {
        self.bands
            .values()
            .next()
            .map(|a| (a.shape()[1], a.shape()[2]))
            .unwrap_or((0, 0))
    }
}

/// Thin reader over the scene store
///
/// Construction is cheap; the store is scanned on every load so newly
/// ingested scenes are visible without a restart.
#[derive(Debug, Clone)]
pub struct Datacube {
    root: PathBuf,
}

impl Datacube {
    /// Opens the store rooted at the configured data directory
    pub fn open(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Loads the queried measurements, grouped by solar day and
    /// resampled (nearest neighbour) onto the query grid
    pub fn load(&self, query: &CubeQuery) -> Result<Cube> {
        let scenes = store::scan(&self.root.join(&query.product))?;
        let selected: Vec<&Scene> = scenes
            .iter()
            .filter(|s| s.manifest.bounds.intersects(&query.bounds))
            .filter(|s| match query.time {
                Some((begin, end)) => s.solar_day() >= begin && s.solar_day() <= end,
                None => true,
            })
            .collect();

        let width = ((query.bounds.width() / query.resolution).ceil() as usize).max(1);
        let height = ((query.bounds.height() / query.resolution).ceil() as usize).max(1);
        let transform = GeoTransform::new(
            query.bounds.xmin,
            query.bounds.ymax,
            query.resolution,
            query.resolution,
        );

        let nodata = selected
            .first()
            .map(|s| s.manifest.nodata)
            .unwrap_or(0.0);
        let mut cube = Cube {
            times: Vec::new(),
            bands: HashMap::new(),
            transform,
            nodata,
        };
        if selected.is_empty() {
            return Ok(cube);
        }

        // solar-day groups, scenes within a day kept in acquisition order
        let mut days: BTreeMap<NaiveDate, Vec<&Scene>> = BTreeMap::new();
        for &scene in &selected {
            days.entry(scene.solar_day()).or_default().push(scene);
        }
        cube.times = days
            .values()
            .map(|group| group[0].manifest.datetime)
            .collect();

        for measurement in &query.measurements {
            let mut stack = Array3::from_elem((days.len(), height, width), nodata);
            for (t, group) in days.values().enumerate() {
                for scene in group {
                    if !scene.has_band(measurement) {
                        continue;
                    }
                    let data = scene.read_band(measurement)?;
                    let shape = (data.shape()[0], data.shape()[1]);
                    let scene_transform = scene.transform(shape);
                    for row in 0..height {
                        for col in 0..width {
                            if stack[[t, row, col]] != nodata {
                                continue;
                            }
                            let (lon, lat) = transform.pixel_center(row, col);
                            if let Some((srow, scol)) = scene_transform.pixel_at(lon, lat, shape) {
                                stack[[t, row, col]] = data[[srow, scol]];
                            }
                        }
                    }
                }
            }
            cube.bands.insert(measurement.clone(), stack);
        }
        Ok(cube)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datacube::store::fixtures;

    fn query(bounds: BoundingBox, measurements: &[&str]) -> CubeQuery {
        CubeQuery {
            product: "s2a_sen2cor_granule".to_string(),
            bounds,
            time: None,
            measurements: measurements.iter().map(|m| m.to_string()).collect(),
            resolution: 0.1,
        }
    }

    #[test]
    fn test_profiles() {
        assert!(L2A.is_granule());
        assert!(L1C.is_granule());
        assert!(!LS8.is_granule());
        assert_eq!(DATASET, L2A);
    }

    #[test]
    fn test_load_empty_store() {
        let tmp = tempfile::tempdir().unwrap();
        let cube = Datacube::open(tmp.path())
            .load(&query(BoundingBox::new(0.0, 0.0, 1.0, 1.0), &["B04_20m"]))
            .unwrap();
        assert!(cube.is_empty());
    }

    #[test]
    fn test_load_resamples_to_grid() {
        let tmp = tempfile::tempdir().unwrap();
        let bounds = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        // a 4x4 scene covering the full box, all pixels 500
        fixtures::write_scene(
            tmp.path(),
            "s2a_sen2cor_granule",
            "scene-a",
            "2018-03-05T10:00:29Z",
            bounds,
            &[("B04_20m", vec![500u16; 16], (4, 4))],
        );

        let cube = Datacube::open(tmp.path())
            .load(&query(bounds, &["B04_20m"]))
            .unwrap();
        assert!(!cube.is_empty());
        assert_eq!(cube.times.len(), 1);
        assert_eq!(cube.shape(), (10, 10));
        let band = cube.band("B04_20m").unwrap();
        assert_eq!(band[[0, 0, 0]], 500.0);
        assert_eq!(band[[0, 9, 9]], 500.0);
    }

    #[test]
    fn test_load_groups_solar_day_and_orders_times() {
        let tmp = tempfile::tempdir().unwrap();
        let bounds = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        // two same-day halves mosaic into one timestep; a later scene
        // adds a second
        let west = BoundingBox::new(0.0, 0.0, 0.5, 1.0);
        let east = BoundingBox::new(0.5, 0.0, 1.0, 1.0);
        fixtures::write_scene(
            tmp.path(),
            "s2a_sen2cor_granule",
            "day1-west",
            "2018-03-05T10:00:00Z",
            west,
            &[("B04_20m", vec![100u16; 16], (4, 4))],
        );
        fixtures::write_scene(
            tmp.path(),
            "s2a_sen2cor_granule",
            "day1-east",
            "2018-03-05T10:03:00Z",
            east,
            &[("B04_20m", vec![200u16; 16], (4, 4))],
        );
        fixtures::write_scene(
            tmp.path(),
            "s2a_sen2cor_granule",
            "day2",
            "2018-03-15T10:00:00Z",
            bounds,
            &[("B04_20m", vec![300u16; 16], (4, 4))],
        );

        let cube = Datacube::open(tmp.path())
            .load(&query(bounds, &["B04_20m"]))
            .unwrap();
        assert_eq!(cube.times.len(), 2);
        assert!(cube.times[0] < cube.times[1]);

        let band = cube.band("B04_20m").unwrap();
        // west pixels from the first half, east pixels from the second
        assert_eq!(band[[0, 5, 0]], 100.0);
        assert_eq!(band[[0, 5, 9]], 200.0);
        assert_eq!(band[[1, 5, 0]], 300.0);
    }

    #[test]
    fn test_load_honours_time_range() {
        let tmp = tempfile::tempdir().unwrap();
        let bounds = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        fixtures::write_scene(
            tmp.path(),
            "s2a_sen2cor_granule",
            "february",
            "2018-02-10T10:00:00Z",
            bounds,
            &[("B04_20m", vec![100u16; 16], (4, 4))],
        );
        fixtures::write_scene(
            tmp.path(),
            "s2a_sen2cor_granule",
            "june",
            "2018-06-10T10:00:00Z",
            bounds,
            &[("B04_20m", vec![200u16; 16], (4, 4))],
        );

        let mut q = query(bounds, &["B04_20m"]);
        q.time = Some((
            NaiveDate::from_ymd_opt(2018, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2018, 3, 1).unwrap(),
        ));
        let cube = Datacube::open(tmp.path()).load(&q).unwrap();
        assert_eq!(cube.times.len(), 1);
        assert_eq!(cube.band("B04_20m").unwrap()[[0, 0, 0]], 100.0);
    }

    #[test]
    fn test_load_clips_to_bounds() {
        let tmp = tempfile::tempdir().unwrap();
        // scene covers a larger area than the query box
        let scene_bounds = BoundingBox::new(0.0, 0.0, 2.0, 2.0);
        fixtures::write_scene(
            tmp.path(),
            "s2a_sen2cor_granule",
            "big",
            "2018-03-05T10:00:00Z",
            scene_bounds,
            &[("B04_20m", vec![700u16; 64], (8, 8))],
        );

        let cube = Datacube::open(tmp.path())
            .load(&query(BoundingBox::new(0.5, 0.5, 1.5, 1.5), &["B04_20m"]))
            .unwrap();
        assert_eq!(cube.shape(), (10, 10));
        assert_eq!(cube.band("B04_20m").unwrap()[[0, 0, 0]], 700.0);
    }
}
