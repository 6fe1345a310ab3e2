//! Scene store reading
//!
//! Each scene directory carries a `scene.json` manifest next to its band
//! rasters. Directories without a readable manifest are skipped with a
//! warning so one broken ingest cannot take every query down.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use ndarray::Array2;
use serde::Deserialize;
use tiff::decoder::{Decoder, DecodingResult};
use tracing::warn;

use crate::error::{Error, Result};
use crate::types::{BoundingBox, GeoTransform};

/// Manifest file name inside a scene directory
pub const MANIFEST: &str = "scene.json";

/// JSON sidecar describing one ingested scene
#[derive(Debug, Clone, Deserialize)]
pub struct SceneManifest {
    pub id: String,
    /// Acquisition time, UTC
    pub datetime: DateTime<Utc>,
    /// Footprint in WGS84 degrees
    pub bounds: BoundingBox,
    #[serde(default)]
    pub nodata: f32,
    /// Measurement name to raster file name
    pub bands: HashMap<String, String>,
}

/// A scene on disk
#[derive(Debug, Clone)]
pub struct Scene {
    pub manifest: SceneManifest,
    dir: PathBuf,
}

impl Scene {
    /// Acquisition date used for solar-day grouping
    pub fn solar_day(&self) -> NaiveDate {
        self.manifest.datetime.date_naive()
    }

    /// Whether the scene carries a measurement
    pub fn has_band(&self, name: &str) -> bool {
        self.manifest.bands.contains_key(name)
    }

    /// Pixel grid mapping for this scene at the raster's native shape
    pub fn transform(&self, shape: (usize, usize)) -> GeoTransform {
        let b = &self.manifest.bounds;
        GeoTransform::new(
            b.xmin,
            b.ymax,
            b.width() / shape.1 as f64,
            b.height() / shape.0 as f64,
        )
    }

    /// Reads a whole band raster as f32
    pub fn read_band(&self, name: &str) -> Result<Array2<f32>> {
        let file = self.manifest.bands.get(name).ok_or_else(|| {
            Error::Store(format!("scene {} has no band {}", self.manifest.id, name))
        })?;
        let path = self.dir.join(file);
        read_raster(&path)
    }
}

/// Scans a product directory for scenes, sorted by acquisition time
///
/// A missing directory is an empty store, not an error; the caller turns
/// an empty result into the no-data response.
pub fn scan(product_dir: &Path) -> Result<Vec<Scene>> {
    let mut scenes = Vec::new();
    if !product_dir.is_dir() {
        return Ok(scenes);
    }
    for entry in std::fs::read_dir(product_dir)? {
        let dir = entry?.path();
        if !dir.is_dir() {
            continue;
        }
        match read_manifest(&dir.join(MANIFEST)) {
            Ok(manifest) => scenes.push(Scene { manifest, dir }),
            Err(e) => warn!(scene = %dir.display(), error = %e, "skipping unreadable scene"),
        }
    }
    scenes.sort_by_key(|s| s.manifest.datetime);
    Ok(scenes)
}

fn read_manifest(path: &Path) -> Result<SceneManifest> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Decodes a single-band raster into an f32 array
fn read_raster(path: &Path) -> Result<Array2<f32>> {
    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))?;
    let (width, height) = decoder.dimensions()?;
    let data: Vec<f32> = match decoder.read_image()? {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        _ => {
            return Err(Error::Store(format!(
                "unsupported sample format in {}",
                path.display()
            )))
        }
    };
    Array2::from_shape_vec((height as usize, width as usize), data)
        .map_err(|e| Error::Store(format!("bad raster shape in {}: {}", path.display(), e)))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use std::io::Write;
    use tiff::encoder::{colortype, TiffEncoder};

    /// Writes a scene directory with a manifest and Gray16 band rasters
    pub(crate) fn write_scene(
        root: &Path,
        product: &str,
        id: &str,
        datetime: &str,
        bounds: BoundingBox,
        bands: &[(&str, Vec<u16>, (u32, u32))],
    ) {
        let dir = root.join(product).join(id);
        std::fs::create_dir_all(&dir).unwrap();

        let mut band_map = serde_json::Map::new();
        for (name, data, (width, height)) in bands {
            let file_name = format!("{}.tif", name);
            let file = File::create(dir.join(&file_name)).unwrap();
            let mut encoder = TiffEncoder::new(file).unwrap();
            encoder
                .write_image::<colortype::Gray16>(*width, *height, data)
                .unwrap();
            band_map.insert(name.to_string(), serde_json::Value::String(file_name));
        }

        let manifest = serde_json::json!({
            "id": id,
            "datetime": datetime,
            "bounds": {
                "xmin": bounds.xmin,
                "ymin": bounds.ymin,
                "xmax": bounds.xmax,
                "ymax": bounds.ymax,
            },
            "nodata": 0.0,
            "bands": band_map,
        });
        let mut file = File::create(dir.join(MANIFEST)).unwrap();
        write!(file, "{}", manifest).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_missing_dir_is_empty() {
        assert!(scan(Path::new("/nonexistent/product")).unwrap().is_empty());
    }

    #[test]
    fn test_scan_reads_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        let bounds = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        fixtures::write_scene(
            tmp.path(),
            "p",
            "later",
            "2018-06-01T10:00:00Z",
            bounds,
            &[("B04_20m", vec![1u16; 4], (2, 2))],
        );
        fixtures::write_scene(
            tmp.path(),
            "p",
            "earlier",
            "2018-02-01T10:00:00Z",
            bounds,
            &[("B04_20m", vec![2u16; 4], (2, 2))],
        );

        let scenes = scan(&tmp.path().join("p")).unwrap();
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0].manifest.id, "earlier");
        assert_eq!(scenes[1].manifest.id, "later");
    }

    #[test]
    fn test_scan_skips_broken_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let bounds = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        fixtures::write_scene(
            tmp.path(),
            "p",
            "good",
            "2018-02-01T10:00:00Z",
            bounds,
            &[("B04_20m", vec![2u16; 4], (2, 2))],
        );
        let broken = tmp.path().join("p").join("broken");
        std::fs::create_dir_all(&broken).unwrap();
        std::fs::write(broken.join(MANIFEST), "{ not json").unwrap();

        let scenes = scan(&tmp.path().join("p")).unwrap();
        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].manifest.id, "good");
    }

    #[test]
    fn test_read_band_values() {
        let tmp = tempfile::tempdir().unwrap();
        let bounds = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        fixtures::write_scene(
            tmp.path(),
            "p",
            "s",
            "2018-02-01T10:00:00Z",
            bounds,
            &[("B08_10m", vec![1, 2, 3, 4], (2, 2))],
        );

        let scenes = scan(&tmp.path().join("p")).unwrap();
        let band = scenes[0].read_band("B08_10m").unwrap();
        assert_eq!(band.shape(), &[2, 2]);
        assert_eq!(band[[0, 0]], 1.0);
        assert_eq!(band[[1, 1]], 4.0);
    }

    #[test]
    fn test_read_missing_band_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let bounds = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        fixtures::write_scene(
            tmp.path(),
            "p",
            "s",
            "2018-02-01T10:00:00Z",
            bounds,
            &[("B08_10m", vec![1, 2, 3, 4], (2, 2))],
        );

        let scenes = scan(&tmp.path().join("p")).unwrap();
        assert!(scenes[0].read_band("SCL_20m").is_err());
    }

    #[test]
    fn test_solar_day() {
        let manifest: SceneManifest = serde_json::from_str(
            r#"{"id":"s","datetime":"2018-03-05T23:59:00Z",
                "bounds":{"xmin":0.0,"ymin":0.0,"xmax":1.0,"ymax":1.0},
                "bands":{}}"#,
        )
        .unwrap();
        let scene = Scene {
            manifest,
            dir: PathBuf::new(),
        };
        assert_eq!(
            scene.solar_day(),
            NaiveDate::from_ymd_opt(2018, 3, 5).unwrap()
        );
        assert_eq!(scene.manifest.nodata, 0.0);
    }
}
