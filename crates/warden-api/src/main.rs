mod config;
mod error;
mod routes;

use std::sync::Arc;

use config::AppConfig;
use routes::{app_router, AppState};
use tracing_subscriber::filter::Directive;
use warden_core::{
    FileCache, LibSqlBackend, MemoryCache, RegistryOptions, RegistryStore, SnapshotCache,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only load .env in development; production uses platform-native env injection.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("warden_api=info".parse::<Directive>()?)
                .add_directive("warden_core=info".parse::<Directive>()?),
        )
        .init();

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!("Starting warden-api with config: {:?}", config);

    let cache: Box<dyn SnapshotCache> = match &config.cache_path {
        Some(path) => Box::new(FileCache::new(path)),
        None => {
            tracing::warn!("WARDEN_CACHE_PATH is unset; local fallback will not survive restarts");
            Box::new(MemoryCache::new())
        }
    };
    let registry = RegistryStore::new(
        LibSqlBackend::new(config.backend.clone()),
        cache,
        RegistryOptions::default().with_connect_timeout(config.connect_timeout),
    )?;

    // Attach to the primary up front so bootstrap seeding happens before traffic.
    let source = registry.refresh().await;
    tracing::info!(?source, "Registry ready");

    let state = AppState::new(config, Arc::new(registry));
    let bind_addr = state.config.bind_addr.clone();
    let router = app_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("warden-api listening on {}", bind_addr);
    axum::serve(listener, router).await?;
    Ok(())
}
