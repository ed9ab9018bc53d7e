use ledgerloop::engine::{MatchConfig, MatchPlanner};
use ledgerloop::orchestration::NoopHook;
use ledgerloop::{
    api, config::Config, db::init_db, CachedPriceFeed, HttpPriceSource, Ingestor, PriceSource,
    Repository,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    // Initialize database and dependencies
    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let repo = Arc::new(Repository::new(pool));

    let source: Arc<dyn PriceSource> = Arc::new(HttpPriceSource::new(
        config.price_api_url.clone(),
        Duration::from_millis(config.price_timeout_ms),
    ));
    let mut fallbacks = CachedPriceFeed::default_fallbacks();
    fallbacks.extend(config.static_native_prices.clone());
    let feed = Arc::new(CachedPriceFeed::new(
        source,
        Duration::from_secs(config.price_refresh_secs),
        fallbacks,
    ));

    let planner = MatchPlanner::new(MatchConfig {
        amount_tolerance: config.amount_tolerance,
    });
    let ingestor = Arc::new(Ingestor::new(
        repo.clone(),
        feed,
        planner,
        config.default_network,
        Arc::new(NoopHook),
    ));

    // Create router
    let app = api::create_router(api::AppState { repo, ingestor });

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
