use miniapp_auth_backend::{build_router, config::Config, AppState};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    info!(
        auth_rps = config.auth_rps,
        init_data_max_age_secs = ?config.init_data_max_age_secs,
        session_ttl_secs = config.session_ttl_secs,
        "Configuration loaded"
    );

    let app_state = AppState::new(&config);
    let app = build_router(app_state, &config);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Could not install Ctrl+C handler: {:?}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
