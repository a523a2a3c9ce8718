use clap::{Arg, Command};
use server::AppState;
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let matches = Command::new("piping-relay")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Ephemeral path-addressed HTTP relay")
        .arg(
            Arg::new("bind")
                .help("The socket address to listen on. Eg. 0.0.0.0:8080")
                .short('b')
                .long("bind")
                .default_value("0.0.0.0:8080"),
        )
        .get_matches();
    let bind_addr = matches
        .get_one::<String>("bind")
        .expect("bind has a default")
        .clone();

    let state = AppState::new();
    let router = server::build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind");
    info!(addr = %bind_addr, version = env!("CARGO_PKG_VERSION"), "relay listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
    info!("server shut down gracefully");
}

/// Waits for SIGTERM or Ctrl-C (SIGINT) and returns to trigger graceful shutdown.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("received Ctrl+C, shutting down"); },
        _ = terminate => { info!("received SIGTERM, shutting down"); },
    }
}
