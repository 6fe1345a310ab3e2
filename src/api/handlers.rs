//! REST request handlers
//!
//! Handlers validate parameters and delegate to the coverage sources or
//! the processor. Return values are direct JSON, except rendered plots
//! which stream back the temporary file's bytes.

use std::fmt::Display;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::debug;

use crate::api::models::{CoverageReply, Rejection};
use crate::config::Settings;
use crate::db::{CoverageSource, SpatialDb};
use crate::params::Params;
use crate::processing::{Outcome, Processor};

/// Shared request context: settings, index pool and processor
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub db: SpatialDb,
    pub processor: Arc<Processor>,
}

impl AppState {
    pub fn new(settings: Settings, db: SpatialDb) -> Self {
        let processor = Arc::new(Processor::new(&settings.path.data_dir));
        Self {
            settings: Arc::new(settings),
            db,
            processor,
        }
    }
}

type ApiError = (StatusCode, Json<Rejection>);

fn internal(e: impl Display) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(Rejection::new(e.to_string())),
    )
}

/// GET /ws/landsat?lat&lon
pub async fn landsat_coverage(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    coverage(CoverageSource::Landsat, state, pairs).await
}

/// GET /ws/sentinel?lat&lon
pub async fn sentinel_coverage(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    coverage(CoverageSource::Sentinel, state, pairs).await
}

async fn coverage(
    source: CoverageSource,
    state: AppState,
    pairs: Vec<(String, String)>,
) -> Result<Response, ApiError> {
    let params = Params::from_pairs(pairs);
    debug!(source = source.name(), "CALL: coverage lookup");
    let (Some(lat), Some(lon)) = (params.get("lat"), params.get("lon")) else {
        return Ok(Json(Rejection::new("Both lat and lon need to be defined")).into_response());
    };
    let (Ok(lat), Ok(lon)) = (lat.parse::<f64>(), lon.parse::<f64>()) else {
        return Ok(Json(Rejection::new("Both lat and lon need to be numbers")).into_response());
    };
    let records = source
        .query_by_point(&state.db, lon, lat)
        .await
        .map_err(internal)?;
    Ok(Json(CoverageReply::new(records)).into_response())
}

/// GET /ws/datacube?selection&type&xmin&xmax&ymin&ymax&time_begin&time_end
///
/// Successful products render into a temporary file which is read back
/// and streamed; the file is deleted when the handle drops.
pub async fn datacube_selection(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let params = Params::from_pairs(pairs);
    debug!("CALL: datacube selection");
    let processor = Arc::clone(&state.processor);
    let (outcome, file) = tokio::task::spawn_blocking(
        move || -> crate::error::Result<(Outcome, tempfile::NamedTempFile)> {
            let mut file = tempfile::Builder::new().prefix("tmp_plot_").tempfile()?;
            let outcome = processor.execute(&params, file.as_file_mut())?;
            Ok((outcome, file))
        },
    )
    .await
    .map_err(internal)?
    .map_err(internal)?;

    match outcome {
        Outcome::Rejected(msg) => Ok(Json(Rejection::new(msg)).into_response()),
        Outcome::Plot(summary) => {
            debug!(
                mimetype = summary.mimetype,
                size = summary.size,
                path = %file.path().display(),
                "rendered plot"
            );
            let bytes = tokio::fs::read(file.path()).await.map_err(internal)?;
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, summary.mimetype)
                .header(header::CONTENT_LENGTH, summary.size)
                .body(Body::from(bytes))
                .unwrap())
        }
    }
}

/// GET /ws/help
pub async fn help() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "landsat": ["GET", "lat(float): latitude", "lon(float):longitude"]
    }))
}

/// Plain-text 404 for anything outside the route table
pub async fn not_found(uri: Uri) -> (StatusCode, String) {
    (
        StatusCode::NOT_FOUND,
        format!("NO BACKEND endpoint at requested URL: {}\n", uri),
    )
}
