use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use isochrone_server::cache::{CacheConfig, TripCache};
use isochrone_server::compute::{Engine, EngineConfig};
use isochrone_server::datasets::Datasets;
use isochrone_server::persistence::{FileStore, Store};
use isochrone_server::routing::{
    Backend, DEFAULT_BASE_URL, MockRouter, OjpClient, OjpConfig, RetryPolicy, RoutingOrchestrator,
    WalkConfig, WalkGraph, WalkPricer,
};
use isochrone_server::spatial::{PoiIndex, SpatialConfig, StudyArea};
use isochrone_server::web::{AppState, create_router};

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_OUTPUT_DIR: &str = "output";
const DEFAULT_BIND: &str = "127.0.0.1:3000";
const DEFAULT_CACHE_FILE: &str = "trip_cache.json";

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("isochrone_server=info,tower_http=info")),
        )
        .init();

    let data_dir = env_or("ISOCHRONE_DATA_DIR", DEFAULT_DATA_DIR);
    let output_dir = env_or("ISOCHRONE_OUTPUT_DIR", DEFAULT_OUTPUT_DIR);
    let bind = env_or("ISOCHRONE_BIND", DEFAULT_BIND);
    let cache_file = std::env::var("ISOCHRONE_CACHE_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(&output_dir).join(DEFAULT_CACHE_FILE));

    // Static data (fail fast if unavailable)
    let datasets = Datasets::load(&data_dir).expect("Failed to load datasets");
    let projection = datasets.projection();
    let area = StudyArea::new(&datasets.boundary, &datasets.water, projection)
        .expect("Invalid study area");
    let graph = datasets
        .walk_graph
        .as_ref()
        .map(|data| WalkGraph::build(data, &projection));
    let walk = WalkPricer::new(graph, projection, WalkConfig::default());
    let index = PoiIndex::build(datasets.pois, projection, SpatialConfig::default());

    let api_key = env_or("OJP_API_KEY", "");
    let backend = if api_key.is_empty() {
        warn!("OJP_API_KEY not set; routing with the mock backend");
        Backend::Mock(MockRouter::new())
    } else {
        let config = OjpConfig::new(api_key).with_base_url(env_or("OJP_BASE_URL", DEFAULT_BASE_URL));
        Backend::Ojp(OjpClient::new(config).expect("Failed to create OJP client"))
    };

    let cache = TripCache::new(CacheConfig::default());
    match cache.load_snapshot(&cache_file).await {
        Ok(entries) => info!(path = %cache_file.display(), entries, "trip cache restored"),
        Err(e) => warn!(error = %e, "ignoring trip cache snapshot"),
    }

    let orchestrator = RoutingOrchestrator::new(backend, cache, walk, RetryPolicy::default());
    let engine = Engine::new(
        orchestrator,
        index,
        area,
        datasets.stations,
        Store::File(FileStore::new(&output_dir)),
        EngineConfig::default().with_cache_snapshot(&cache_file),
    );

    let app = create_router(AppState::new(engine));

    let addr: SocketAddr = bind.parse().expect("ISOCHRONE_BIND is not a socket address");
    info!(%addr, data_dir, output_dir, "isochrone server listening");
    info!("  GET  /health          - Health check");
    info!("  POST /compute         - Compute isochrones");
    info!("  POST /compute/cancel  - Cancel a running computation");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
