use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use travel_planner_backend::auth::generate_api_key;
use travel_planner_backend::{
    http_client, logging, routes, spawn_limiter_pruning, AppState, Config,
};

fn cors_layer(config: &Config) -> CorsLayer {
    let origins = match config.cors_origins() {
        None => AllowOrigin::from(Any),
        Some(origins) => {
            let parsed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| match o.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin: {}", o);
                        None
                    }
                })
                .collect();
            AllowOrigin::list(parsed)
        }
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("travel-planner-backend {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    if args.iter().any(|a| a == "--generate-api-key") {
        let (key, digest) = generate_api_key();
        println!("API key (give to the client): {}", key);
        println!("SHA-256 (set facade.api_key_sha256): {}", digest);
        return Ok(());
    }

    // Load configuration
    let config = Config::load()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| config.logging.level.clone().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting travel planner backend v{}", env!("CARGO_PKG_VERSION"));

    let client = http_client(&config)?;
    let state = Arc::new(AppState::build(config.clone(), client).await?);
    spawn_limiter_pruning(state.clone());

    let app = Router::new()
        .merge(routes::router(state))
        .layer(middleware::from_fn(logging::request_logger))
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
