use anyhow::Context;
use mirrorlens_server::config::ServerConfig;
use mirrorlens_server::routes::build_router;
use mirrorlens_server::state::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    if ServerConfig::log_json_from_env() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = ServerConfig::from_env();

    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!("failed to create data dir {}", config.data_dir.display())
    })?;

    info!(
        api_base = %config.upstream.api_base,
        episodes_base = %config.upstream.episodes_base,
        timeout_secs = config.upstream.timeout.as_secs(),
        poster_cache = %config.poster_cache_path().display(),
        "upstreams configured"
    );

    let state = AppState::new(&config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(addr = %config.bind, "server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
