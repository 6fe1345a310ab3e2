use earthcube::api::{create_router, AppState};
use earthcube::{Settings, SpatialDb};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load().expect("Failed to load configuration");
    let db = SpatialDb::connect(&settings.path.geodb, &settings.path.libspatialite)
        .await
        .expect("Failed to open the spatial index");

    let bind = format!("{}:{}", settings.server.host, settings.server.port);
    let app = create_router(AppState::new(settings, db));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .expect("Failed to bind port");

    println!("🛰  earthcube backend");
    println!("📡 Listening on http://{}", bind);
    println!();
    println!("📍 Endpoints:");
    println!("  GET /ws/landsat?lat=<lat>&lon=<lon>");
    println!("  GET /ws/sentinel?lat=<lat>&lon=<lon>");
    println!("  GET /ws/datacube?selection=<line|rectangle>&type=<type>&xmin=..&xmax=..&ymin=..&ymax=..");
    println!();

    axum::serve(listener, app).await.expect("Server error");
}
