//! # HTTP Server Assembly
//!
//! Builds the actix-web server hosting the page, the three WebSocket channel
//! endpoints, and the API routes. The returned `Server` future is driven by
//! the caller — the binary awaits it under its own runtime with signal
//! handling, while the embedded `Webview` facade runs it on a dedicated
//! thread.

use crate::handlers;
use crate::health;
use crate::middleware;
use crate::page;
use crate::state::AppState;
use crate::websocket;

use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Result;
use std::time::{Duration, Instant};

/// Bind the configured address and construct the server.
///
/// Must be called from within an actix system context; the server starts
/// running once the returned future is awaited.
pub fn build(state: AppState) -> Result<Server> {
    let config = state.get_config();
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(middleware::RequestMetrics)
            .route("/", web::get().to(page::index))
            .route(
                &format!("/{}", page::VIEW_ENDPOINT),
                web::get().to(websocket::view_socket),
            )
            .route(
                &format!("/{}", page::PLAYBACK_ENDPOINT),
                web::get().to(websocket::playback_socket),
            )
            .route(
                &format!("/{}", page::RECORDING_ENDPOINT),
                web::get().to(websocket::recording_socket),
            )
            .service(
                web::scope("/api/v1")
                    .route("/health", web::get().to(health::health_check))
                    .route("/metrics", web::get().to(health::detailed_metrics))
                    .route("/config", web::get().to(handlers::get_config))
                    .route("/config", web::put().to(handlers::update_config)),
            )
            .route("/health", web::get().to(health::health_check))
    })
    .bind(&bind_addr)?
    .run();

    Ok(server)
}

/// Block until the server accepts TCP connections, or fail after `timeout`.
///
/// Used before launching the browser so the page request cannot race the
/// listener.
pub fn wait_until_ready(host: &str, port: u16, timeout: Duration) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    let deadline = Instant::now() + timeout;

    loop {
        if std::net::TcpStream::connect(&addr).is_ok() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(anyhow::anyhow!(
                "server did not become ready on {} within {:?}",
                addr,
                timeout
            ));
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}
