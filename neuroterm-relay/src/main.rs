//! Relay entry point

use tracing::info;
use tracing_subscriber::EnvFilter;

use neuroterm_relay::{AppState, router};

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("neuroterm_relay=info,neuroterm=info")),
        )
        .init();

    let state = AppState::from_env();
    if state.credentials.is_empty() {
        info!("no provider keys in environment; clients must supply their own");
    }

    let addr =
        std::env::var("NEUROTERM_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("relay listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
