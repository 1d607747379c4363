//! Health and metrics endpoints.
//!
//! `GET /health` reports service identity, uptime, request counters, and the
//! live status of the three browser channels; `GET /api/v1/metrics` adds the
//! per-endpoint breakdown.

use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let config = state.get_config();
    let uptime_seconds = state.get_uptime_seconds();

    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "service": {
            "name": "kioskview",
            "version": env!("CARGO_PKG_VERSION"),
            "host": config.server.host,
            "port": config.server.port
        },
        "channels": {
            "view": {
                "connected": state.view.is_connected(),
                "dirty": state.view.is_dirty()
            },
            "playback": {
                "connected": state.playback.is_connected(),
                "pending_clips": state.playback.pending_count()
            },
            "recording": {
                "connected": state.recording.is_connected(),
                "recording": state.recording.is_recording()
            }
        },
        "metrics": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": if metrics.request_count > 0 {
                metrics.error_count as f64 / metrics.request_count as f64
            } else {
                0.0
            }
        }
    }))
}

pub async fn detailed_metrics(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let uptime_seconds = state.get_uptime_seconds();

    let mut endpoint_stats = Vec::new();
    for (endpoint, metric) in metrics.endpoint_metrics.iter() {
        endpoint_stats.push(json!({
            "endpoint": endpoint,
            "request_count": metric.request_count,
            "error_count": metric.error_count,
            "error_rate": metric.error_rate(),
            "average_duration_ms": metric.average_duration_ms(),
            "total_duration_ms": metric.total_duration_ms
        }));
    }

    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "overall": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "requests_per_second": if uptime_seconds > 0 {
                metrics.request_count as f64 / uptime_seconds as f64
            } else {
                0.0
            }
        },
        "channels": {
            "view_connected": state.view.is_connected(),
            "playback_connected": state.playback.is_connected(),
            "playback_pending_clips": state.playback.pending_count(),
            "recording_connected": state.recording.is_connected(),
            "recording_active": state.recording.is_recording()
        },
        "endpoints": endpoint_stats
    }))
}
