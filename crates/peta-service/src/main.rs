use peta_service::{
    DefaultAppState, config::ServiceConfig, database::establish_connection,
    fetcher::HttpSiteClient, routes::create_router,
    shutdown::{GracefulShutdownLayer, ShutdownState},
};
use std::sync::{Arc, Mutex};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                "peta_service=debug"
                    .parse()
                    .expect("static directive is valid"),
            ),
        )
        .init();

    let config = ServiceConfig::from_env().unwrap_or_else(|err| {
        error!(error = %err, "Invalid configuration");
        std::process::exit(1);
    });

    let connection = establish_connection(&config.database_url).unwrap_or_else(|err| {
        error!(database_url = %config.database_url, error = %err, "Failed to open database");
        std::process::exit(1);
    });

    info!(database_url = %config.database_url, "Connected to database");

    if config.approval_token.is_none() {
        warn!("PETA_APPROVAL_TOKEN is not set; the approval endpoint accepts any caller");
    }

    let client = HttpSiteClient::new(
        config.fetch_timeout,
        config.allow_local_sites,
        config.approval_token.clone(),
    )
    .unwrap_or_else(|err| {
        error!(error = %err, "Failed to build HTTP client");
        std::process::exit(1);
    });

    let bind_address = config.bind_address;
    let request_timeout = config.request_timeout;
    info!(site_url = %config.site_url, "Serving as site");

    let app_state = DefaultAppState::new(Arc::new(Mutex::new(connection)), client, config);
    let shutdown_state = ShutdownState::new();

    let app = create_router()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(GracefulShutdownLayer::new(shutdown_state.clone()))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .unwrap_or_else(|err| {
            error!(bind_address = %bind_address, error = %err, "Failed to bind to address");
            std::process::exit(1);
        });

    info!(bind_address = %bind_address, "Server running");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(shutdown_state));

    if let Err(err) = server.await {
        error!(error = %err, "Server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal(shutdown_state: ShutdownState) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining in-flight requests");
    shutdown_state.start_shutdown();
    shutdown_state.drained().await;
    info!("Graceful shutdown completed");
}
