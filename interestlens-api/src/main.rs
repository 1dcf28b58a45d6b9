use anyhow::Result;
use axum::Router;
use interestlens_core::{InMemoryKeyValueStore, KeyValueStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod core;
mod middleware;
mod models;

use crate::core::{
    config::Settings,
    state::{AppState, Collaborators},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let settings = match std::env::var("INTERESTLENS_CONFIG") {
        Ok(path) => Settings::from_file(&path)?,
        Err(_) => Settings::new()?,
    };

    info!(
        "Starting InterestLens API on {}:{}",
        settings.server.host, settings.server.port
    );

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    let app = create_app(settings)?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

fn create_app(settings: Settings) -> Result<Router> {
    let store = InMemoryKeyValueStore::new();
    let cleanup = Duration::from_secs(settings.cache.cleanup_interval_seconds.max(1));
    store.start_cleanup(cleanup);
    info!("In-memory store cleanup every {:?}", cleanup);

    let collaborators = Collaborators::from_settings(&settings)?;
    let store: Arc<dyn KeyValueStore> = Arc::new(store);
    let state = AppState::new(settings, store, collaborators);

    Ok(api::build_router(state))
}
