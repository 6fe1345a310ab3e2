//! HTTP route table
//!
//! Maps `/ws/*` endpoints to handler methods; they can all be tested
//! with wget/curl. CORS headers are added to every response.

use axum::handler::HandlerWithoutStateExt;
use axum::http::{header, HeaderName, Method};
use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use super::handlers::{self, AppState};

/// Builds the application router over the shared state
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/ws/landsat", get(handlers::landsat_coverage))
        .route("/ws/sentinel", get(handlers::sentinel_coverage))
        .route("/ws/datacube", get(handlers::datacube_selection))
        .route("/ws/help", get(handlers::help));

    // static files (html/css/js etc.), reserved for future deployments
    let router = if state.settings.path.documentroot.is_dir() {
        let serve = ServeDir::new(&state.settings.path.documentroot)
            .append_index_html_on_directories(true)
            .not_found_service(handlers::not_found.into_service());
        router.fallback_service(serve)
    } else {
        router.fallback(handlers::not_found)
    };

    router
        .layer(ServiceBuilder::new().layer(cors_layer()))
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::OPTIONS,
            Method::DELETE,
        ])
        .allow_headers([
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
            header::CONTENT_TYPE,
            header::ACCEPT,
        ])
}
