use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pleme_content_graph::{build_schema, router, Config, IdentityGate, InMemoryStore, SharedStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store: SharedStore = Arc::new(InMemoryStore::seeded());
    let gate = Arc::new(IdentityGate::from_config(&config.identities));
    info!(
        posts = store.posts().len(),
        api_keys = config.identities.api_keys.len(),
        "content store ready"
    );

    let app = router(build_schema(store.clone()), gate, store);

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    info!("Server is running on http://{}/graphql", config.listen);

    axum::serve(listener, app).await?;
    Ok(())
}
