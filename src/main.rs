use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tunelist_service::auth::providers::google::GoogleVerifier;
use tunelist_service::config::Config;
use tunelist_service::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env
    dotenvy::dotenv().ok();

    init_tracing();

    let config = Config::from_env().map_err(|e| format!("Failed to load configuration: {e}"))?;

    let db = tunelist_service::db::pool::connect(&config.database_url).await?;
    tracing::info!("Connected to database");

    tunelist_service::db::migration::run(&db).await?;
    tracing::info!("Migrations applied");

    // One client for all outbound verification calls, bounded by the timeout.
    let http_client = reqwest::Client::builder()
        .timeout(config.google_timeout())
        .build()?;
    let verifier = GoogleVerifier::new(
        http_client,
        config.google_tokeninfo_url.clone(),
        config.google_client_id.clone(),
    );

    let state = AppState::new(db, config.clone(), Arc::new(verifier))?;

    let cleanup_cancel = CancellationToken::new();
    let cleanup_handle = tokio::spawn(tunelist_service::background::token_cleanup::run(
        state.sessions.clone(),
        config.token_cleanup_interval(),
        cleanup_cancel.clone(),
    ));

    let app = tunelist_service::routes::create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;

    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    cleanup_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), cleanup_handle).await;
    tracing::info!("Graceful shutdown complete");

    Ok(())
}

/// `LOG_FORMAT=json` switches to structured output for log shippers.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tunelist_service=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
