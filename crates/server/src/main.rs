use std::sync::Arc;

use anyhow::Context;
use db::DBService;
use server::{AppState, router};
use services::services::{clock::SystemClock, config::Config, scheduler::ResetScheduler};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    let db = DBService::new(&config.database_url)
        .await
        .context("failed to open database")?;
    let clock: Arc<SystemClock> = Arc::new(SystemClock);

    let scheduler = ResetScheduler::spawn(db.clone(), clock.clone());

    let state = AppState::new(db, clock);
    let app = router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("zenite listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    scheduler.shutdown().await;
    Ok(())
}
