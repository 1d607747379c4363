//! # Kioskview Server Binary
//!
//! Runs the shell standalone: loads configuration, starts the HTTP server
//! with the three channel endpoints, optionally launches the browser, and
//! pushes a built-in status view so the kiosk shows something useful out of
//! the box. Embedders use the [`kioskview::Webview`] facade instead.

use anyhow::Result;
use kioskview::config::AppConfig;
use kioskview::state::AppState;
use kioskview::{browser, server};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config)?;

    info!("Starting kioskview v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: {}:{}",
        config.server.host, config.server.port
    );

    let state = AppState::new(config.clone());

    let server = server::build(state.clone())?;
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    if config.browser.auto_launch {
        tokio::spawn(launch_browser_when_ready(config.clone()));
    }

    tokio::spawn(status_view_loop(state));

    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Set up tracing with RUST_LOG taking precedence over the configured level.
fn init_tracing(config: &AppConfig) -> Result<()> {
    let default_filter = format!("kioskview={},actix_web=info", config.logging.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Resolves when SIGINT (Ctrl+C) or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}

/// Launch the browser once the listener accepts connections.
async fn launch_browser_when_ready(config: AppConfig) {
    let ready = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || {
            server::wait_until_ready(
                &config.server.host,
                config.server.port,
                std::time::Duration::from_secs(5),
            )
        })
        .await
    };

    match ready {
        Ok(Ok(())) => match browser::launch(&config) {
            // Hold the child handle for the life of the task; the browser
            // outliving the server is acceptable, the reverse is not
            Ok(_child) => std::future::pending::<()>().await,
            Err(err) => warn!("browser launch failed: {:#}", err),
        },
        Ok(Err(err)) => warn!("server never became ready: {:#}", err),
        Err(err) => warn!("readiness probe panicked: {}", err),
    }
}

/// Push a simple status page once a second.
///
/// Gives the standalone binary a face: uptime, channel status, pending
/// playback clips. Embedders pushing their own views never run this loop.
async fn status_view_loop(state: AppState) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
    loop {
        interval.tick().await;

        let uptime = state.get_uptime_seconds();
        let html = format!(
            "<div style=\"font-family: sans-serif; padding: 2em;\">\
             <h1>{}</h1>\
             <p>Up {}m {}s</p>\
             <p>Playback: {} | pending clips: {}</p>\
             <p>Recording: {}</p>\
             </div>",
            state.get_config().page.title,
            uptime / 60,
            uptime % 60,
            if state.playback.is_connected() { "connected" } else { "disconnected" },
            state.playback.pending_count(),
            if state.recording.is_recording() { "active" } else { "idle" },
        );
        state.view.update(&html);
    }
}
