use std::sync::RwLock;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::json;

pub enum HealthStatus {
    Healthy,
    Unhealthy(Option<String>),
}

pub trait HealthCheckable {
    fn health_status(&self) -> HealthStatus;
}

impl IntoResponse for HealthStatus {
    fn into_response(self) -> Response {
        match self {
            HealthStatus::Healthy => StatusCode::OK.into_response(),
            HealthStatus::Unhealthy(message) => {
                let message =
                    message.unwrap_or_else(|| "balance history service unhealthy".to_string());
                let body = json!({ "message": message });
                (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
            }
        }
    }
}

#[derive(Debug)]
struct AggregationOutcome {
    at: DateTime<Utc>,
    error: Option<String>,
}

/// Tracks the outcome of the last aggregation the server ran.
#[derive(Debug, Default)]
pub struct ServeHealth {
    last_aggregation: RwLock<Option<AggregationOutcome>>,
}

impl ServeHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_aggregation_succeeded(&self) {
        *self.last_aggregation.write().unwrap() = Some(AggregationOutcome {
            at: Utc::now(),
            error: None,
        });
    }

    pub fn set_aggregation_failed(&self, error: &str) {
        *self.last_aggregation.write().unwrap() = Some(AggregationOutcome {
            at: Utc::now(),
            error: Some(error.to_string()),
        });
    }
}

impl HealthCheckable for ServeHealth {
    // Healthy until an aggregation fails, and again once one succeeds.
    fn health_status(&self) -> HealthStatus {
        match &*self.last_aggregation.read().unwrap() {
            Some(AggregationOutcome {
                at,
                error: Some(error),
            }) => HealthStatus::Unhealthy(Some(format!(
                "last aggregation at {} failed: {error}",
                at.to_rfc3339()
            ))),
            _ => HealthStatus::Healthy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_before_any_aggregation_test() {
        let health = ServeHealth::new();
        assert!(matches!(health.health_status(), HealthStatus::Healthy));
    }

    #[test]
    fn unhealthy_after_failure_test() {
        let health = ServeHealth::new();
        health.set_aggregation_failed("disk full");

        match health.health_status() {
            HealthStatus::Unhealthy(Some(message)) => assert!(message.contains("disk full")),
            _ => panic!("expected unhealthy status"),
        }
    }

    #[test]
    fn recovers_after_success_test() {
        let health = ServeHealth::new();
        health.set_aggregation_failed("disk full");
        health.set_aggregation_succeeded();
        assert!(matches!(health.health_status(), HealthStatus::Healthy));
    }

    #[test]
    fn unhealthy_is_503_test() {
        let response = HealthStatus::Unhealthy(None).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
