//! Configuration endpoints.
//!
//! `GET /api/v1/config` echoes the active configuration; `PUT /api/v1/config`
//! applies a partial update. Updates only affect what is read at request
//! time (page title, browser launch settings) — the channel components took
//! their debug flag at startup, and the bound address cannot change while the
//! server runs.

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

fn config_json(config: &crate::config::AppConfig) -> serde_json::Value {
    json!({
        "server": {
            "host": config.server.host,
            "port": config.server.port
        },
        "page": {
            "title": config.page.title
        },
        "browser": {
            "auto_launch": config.browser.auto_launch,
            "kiosk_mode": config.browser.kiosk_mode,
            "orientation": config.browser.orientation,
            "window_width": config.browser.window_width,
            "window_height": config.browser.window_height
        },
        "logging": {
            "debug": config.logging.debug,
            "log_level": config.logging.log_level
        }
    })
}

pub async fn get_config(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let config = state.get_config();

    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": config_json(&config)
    })))
}

pub async fn update_config(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> AppResult<HttpResponse> {
    let json_str = serde_json::to_string(&body.into_inner())?;

    let mut current_config = state.get_config();
    current_config
        .update_from_json(&json_str)
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    state
        .update_config(current_config.clone())
        .map_err(AppError::ValidationError)?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "updated_config": config_json(&current_config)
    })))
}
