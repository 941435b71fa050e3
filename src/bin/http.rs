#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::sync::Arc;

    use classroom_planner::{AppConfig, SqliteDraftStore, http_api, logging};

    logging::init_tracing("info,tower_http=info");
    let config = AppConfig::from_env()?;

    let drafts = SqliteDraftStore::new(&config.db_path)?;
    tracing::info!(db = %config.db_path.display(), "draft table opened");

    let state = http_api::AppState::new(Arc::new(drafts));
    http_api::serve(config.http_addr, state).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
