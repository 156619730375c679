//! Query server for address geocoding.
//!
//! Provides an HTTP API that resolves street addresses to interpolated
//! coordinates.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use addrpoint::config::{Config, StoreBackend};
use addrpoint::models::HouseNumber;
use addrpoint::{store, Candidate, GeocodeError, Geocoder};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "Address geocoding query server")]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (overrides config)
    #[arg(short, long)]
    listen: Option<String>,

    /// Directory of CSV reference tables (selects the csv backend)
    #[arg(long, conflicts_with = "scylla_url")]
    data_dir: Option<PathBuf>,

    /// ScyllaDB node (selects the scylla backend)
    #[arg(long)]
    scylla_url: Option<String>,
}

/// Application state shared across handlers
struct AppState {
    geocoder: Geocoder,
    timeout: Duration,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let Some(dir) = args.data_dir {
        config.store.backend = StoreBackend::Csv;
        config.store.data_dir = dir;
    }
    if let Some(url) = args.scylla_url {
        config.store.backend = StoreBackend::Scylla;
        config.store.scylla_url = url;
    }

    info!("Addrpoint Query Server");
    info!("Opening {:?} reference store", config.store.backend);
    let datastore = store::connect(&config.store, config.matching.phonetic_len).await?;

    let state = Arc::new(AppState {
        geocoder: Geocoder::new(datastore, config.matching.clone()),
        timeout: Duration::from_millis(config.server.timeout_ms),
    });

    // Build router
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/geocode", get(geocode_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", config.server.listen);

    let listener = tokio::net::TcpListener::bind(&config.server.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Health check endpoint
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Deserialize)]
struct GeocodeParams {
    zip: Option<String>,
    city: Option<String>,
    /// Street name
    name: Option<String>,
    /// House number
    number: Option<String>,
}

impl From<GeocodeParams> for addrpoint::Query {
    fn from(params: GeocodeParams) -> Self {
        Self {
            zip: params.zip,
            city: params.city,
            name: params.name,
            number: params.number.map(HouseNumber::Text),
        }
    }
}

#[derive(Serialize)]
struct GeocodeResponse {
    results: Vec<Candidate>,
    took_ms: u128,
}

/// HTTP status for a failed geocode
fn status_for(err: &GeocodeError) -> StatusCode {
    match err {
        GeocodeError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        GeocodeError::RetrievalFailure(_) => StatusCode::BAD_GATEWAY,
        GeocodeError::MalformedGeometry { .. } | GeocodeError::DegenerateGeometry { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Forward geocoding of one address
async fn geocode_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GeocodeParams>,
) -> Result<Json<GeocodeResponse>, (StatusCode, String)> {
    let started = Instant::now();
    let query = addrpoint::Query::from(params);

    let results = tokio::time::timeout(state.timeout, state.geocoder.geocode(&query))
        .await
        .map_err(|_| {
            error!("Geocode timed out after {:?}", state.timeout);
            (StatusCode::GATEWAY_TIMEOUT, "geocode timed out".to_string())
        })?
        .map_err(|e| {
            error!("Geocode failed: {}", e);
            (status_for(&e), e.to_string())
        })?;

    Ok(Json(GeocodeResponse {
        results,
        took_ms: started.elapsed().as_millis(),
    }))
}
