//! Liveness and readiness probes

use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub database: DatabaseStatus,
}

#[derive(Serialize)]
pub struct DatabaseStatus {
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Process is up; says nothing about dependencies
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: siget_common::VERSION,
    })
}

/// Full readiness: the service can take traffic only if the database
/// answers. Reports 503 otherwise so orchestrators hold requests back.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let started = std::time::Instant::now();

    let database = match state.db.ping().await {
        Ok(()) => DatabaseStatus {
            reachable: true,
            latency_ms: Some(started.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => DatabaseStatus {
            reachable: false,
            latency_ms: None,
            error: Some(e.to_string()),
        },
    };

    if database.reachable {
        (
            StatusCode::OK,
            Json(ReadyResponse {
                status: "ready",
                database,
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                status: "not_ready",
                database,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_status_omits_empty_fields() {
        let status = DatabaseStatus {
            reachable: true,
            latency_ms: Some(3),
            error: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["latency_ms"], 3);
        assert!(json.get("error").is_none());
    }
}
