//! Point-in-footprint coverage lookups
//!
//! One parameterized capability serves both indexed sources: each source
//! owns its SQL text and its row mapping, and `query_by_point` is the
//! only entry point. Rows with `cloudCover = -1` or bounding boxes
//! spanning 50 degrees or more are treated as erroneous index data and
//! filtered in SQL.

use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::db::SpatialDb;
use crate::error::Result;

const LANDSAT_SQL: &str = "
    SELECT productId, entityId, acquisitionDate, epoch, cloudCover,
           processingLevel, path, row, min_lat, min_lon, max_lat, max_lon,
           download_url
    FROM landsat_extent
    WHERE within(GeomFromText(?,4326),geom) AND
          (cloudCover != -1) AND (max_lat-min_lat)<50 AND (max_lon-min_lon)<50
    ORDER BY epoch DESC;
";

const SENTINEL_SQL: &str = "
    SELECT productName, timestamp, epoch, cloudCover,
           utmZone || latitudeBand || gridsquare as grid,
           min_lat, min_lon, max_lat, max_lon,
           'https://sentinel-s2-l1c.s3.amazonaws.com/' || path || '/preview.jpg' as download_url
    FROM s2_l1c_extent
    WHERE within(GeomFromText(?,4326),geometry) AND
          (cloudCover != -1) AND (max_lat-min_lat)<50 AND (max_lon-min_lon)<50
    ORDER BY epoch DESC;
";

/// One indexed scene whose footprint contains the queried point
#[derive(Debug, Clone, Serialize)]
pub struct CoverageRecord {
    #[serde(rename = "productId")]
    pub product_id: String,
    #[serde(rename = "entityId")]
    pub entity_id: String,
    #[serde(rename = "acquisitionDate")]
    pub acquisition_date: String,
    pub epoch: i64,
    #[serde(rename = "cloudCover")]
    pub cloud_cover: f64,
    #[serde(rename = "processingLevel")]
    pub processing_level: String,
    /// WRS path, Landsat only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<i64>,
    /// WRS row, Landsat only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<i64>,
    /// Composed MGRS cell, Sentinel only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<String>,
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
    pub download_url: String,
}

/// An indexed imagery source with its own table layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageSource {
    Landsat,
    Sentinel,
}

impl CoverageSource {
    /// Returns the source name
    pub fn name(&self) -> &'static str {
        match self {
            CoverageSource::Landsat => "landsat",
            CoverageSource::Sentinel => "sentinel",
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            CoverageSource::Landsat => LANDSAT_SQL,
            CoverageSource::Sentinel => SENTINEL_SQL,
        }
    }

    fn map_row(&self, row: &SqliteRow) -> std::result::Result<CoverageRecord, sqlx::Error> {
        match self {
            CoverageSource::Landsat => Ok(CoverageRecord {
                product_id: row.try_get("productId")?,
                entity_id: row.try_get("entityId")?,
                acquisition_date: row.try_get("acquisitionDate")?,
                epoch: row.try_get("epoch")?,
                cloud_cover: row.try_get("cloudCover")?,
                processing_level: row.try_get("processingLevel")?,
                path: Some(row.try_get("path")?),
                row: Some(row.try_get("row")?),
                grid: None,
                min_lat: row.try_get("min_lat")?,
                min_lon: row.try_get("min_lon")?,
                max_lat: row.try_get("max_lat")?,
                max_lon: row.try_get("max_lon")?,
                download_url: row.try_get("download_url")?,
            }),
            CoverageSource::Sentinel => Ok(CoverageRecord {
                // the index has no separate entity identifier
                product_id: row.try_get("productName")?,
                entity_id: row.try_get("productName")?,
                acquisition_date: row.try_get("timestamp")?,
                epoch: row.try_get("epoch")?,
                cloud_cover: row.try_get("cloudCover")?,
                processing_level: "L1C".to_string(),
                path: None,
                row: None,
                grid: Some(row.try_get("grid")?),
                min_lat: row.try_get("min_lat")?,
                min_lon: row.try_get("min_lon")?,
                max_lat: row.try_get("max_lat")?,
                max_lon: row.try_get("max_lon")?,
                download_url: row.try_get("download_url")?,
            }),
        }
    }

    /// Finds all indexed scenes whose footprint contains the point,
    /// newest first
    pub async fn query_by_point(
        &self,
        db: &SpatialDb,
        lon: f64,
        lat: f64,
    ) -> Result<Vec<CoverageRecord>> {
        let rows = sqlx::query(self.sql())
            .bind(point_wkt(lon, lat))
            .fetch_all(db.pool())
            .await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(self.map_row(row)?);
        }
        Ok(records)
    }
}

/// Well-known-text literal for a WGS84 point
pub fn point_wkt(lon: f64, lat: f64) -> String {
    format!("POINT({} {})", lon, lat)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn landsat_record() -> CoverageRecord {
        CoverageRecord {
            product_id: "LC08_L1TP_204021_20180515_20180604_01_T1".to_string(),
            entity_id: "LC82040212018135LGN00".to_string(),
            acquisition_date: "2018-05-15".to_string(),
            epoch: 1526342400,
            cloud_cover: 12.5,
            processing_level: "L1TP".to_string(),
            path: Some(204),
            row: Some(21),
            grid: None,
            min_lat: 55.1,
            min_lon: -4.9,
            max_lat: 57.3,
            max_lon: -1.2,
            download_url: "https://landsat-pds.s3.amazonaws.com/c1/L8/204/021/index.html"
                .to_string(),
        }
    }

    #[test]
    fn test_point_wkt() {
        assert_eq!(point_wkt(-3.35, 55.95), "POINT(-3.35 55.95)");
    }

    #[test]
    fn test_landsat_record_keys() {
        let json = serde_json::to_value(landsat_record()).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 13);
        for key in [
            "productId",
            "entityId",
            "acquisitionDate",
            "epoch",
            "cloudCover",
            "processingLevel",
            "path",
            "row",
            "min_lat",
            "min_lon",
            "max_lat",
            "max_lon",
            "download_url",
        ] {
            assert!(obj.contains_key(key), "missing {}", key);
        }
        assert!(!obj.contains_key("grid"));
    }

    #[test]
    fn test_sentinel_record_keys() {
        let mut record = landsat_record();
        record.path = None;
        record.row = None;
        record.grid = Some("30VVJ".to_string());
        record.processing_level = "L1C".to_string();

        let json = serde_json::to_value(record).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 12);
        assert!(obj.contains_key("grid"));
        assert!(!obj.contains_key("path"));
    }

    #[test]
    fn test_source_names() {
        assert_eq!(CoverageSource::Landsat.name(), "landsat");
        assert_eq!(CoverageSource::Sentinel.name(), "sentinel");
    }

    #[tokio::test]
    async fn test_no_hit_is_empty_not_error() {
        // a fabricated landsat_extent with a within() stand-in that never
        // matches; exercises the mapping path end to end without SpatiaLite
        let db = SpatialDb::connect_in_memory().await.unwrap();
        sqlx::query(
            "CREATE TABLE landsat_extent (
                 productId TEXT, entityId TEXT, acquisitionDate TEXT,
                 epoch INTEGER, cloudCover REAL, processingLevel TEXT,
                 path INTEGER, row INTEGER,
                 min_lat REAL, min_lon REAL, max_lat REAL, max_lon REAL,
                 download_url TEXT, geom TEXT
             )",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let sql = LANDSAT_SQL.replace("within(GeomFromText(?,4326),geom)", "? IS NULL");
        let rows = sqlx::query(&sql)
            .bind(point_wkt(0.0, 0.0))
            .fetch_all(db.pool())
            .await
            .unwrap();
        let records: Vec<CoverageRecord> = rows
            .iter()
            .map(|row| CoverageSource::Landsat.map_row(row).unwrap())
            .collect();
        assert!(records.is_empty());
    }
}
