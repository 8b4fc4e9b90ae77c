use std::path::Path;
use std::sync::Arc;

use curator_api::{
    api::{create_router, AppState},
    config::Config,
    db::SqliteStore,
    models::Catalog,
    services::{
        llm::OpenAiClient, recommender::ChatEngine, retrieval::RetrievalIndex,
        scoring::ScoringConfig,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "curator_api=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    let catalog = Arc::new(Catalog::load(Path::new(&config.catalog_path))?);
    tracing::info!(items = catalog.len(), "Catalog loaded");

    let global_index = Arc::new(RetrievalIndex::from_catalog(&catalog));
    let store = Arc::new(SqliteStore::connect(&config.database_url).await?);
    let llm = Arc::new(OpenAiClient::new(&config));

    let engine = Arc::new(ChatEngine::new(
        catalog,
        global_index,
        llm.clone(),
        llm,
        store.clone(),
        ScoringConfig::from(&config),
    ));

    let state = AppState::new(engine, store);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
