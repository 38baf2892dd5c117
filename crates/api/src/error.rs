use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use oilshock_core::engine::SimulationError;
use oilshock_core::llm::error::LlmDiagnosticsError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<&'static str>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub stage: Option<&'static str>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            stage: None,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.into(),
            stage: None,
        }
    }

    /// Any failure of the language model is an upstream failure.
    pub fn from_llm(err: anyhow::Error) -> Self {
        sentry_anyhow::capture_anyhow(&err);
        let diag = err.downcast_ref::<LlmDiagnosticsError>();
        let stage = diag.map(|d| d.stage);
        let transport = diag.is_some_and(LlmDiagnosticsError::is_transport);
        tracing::error!(error = %err, ?stage, transport, "intent parsing failed");
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: format!("{err:#}"),
            stage,
        }
    }
}

impl From<SimulationError> for ApiError {
    fn from(err: SimulationError) -> Self {
        let status = match &err {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            SimulationError::ModelUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = err.to_string();
        if status.is_server_error() {
            tracing::error!(error = %err, "simulation failed");
            sentry_anyhow::capture_anyhow(&anyhow::Error::new(err));
        } else {
            tracing::info!(error = %err, "simulation rejected");
        }
        Self {
            status,
            message,
            stage: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            stage: self.stage,
        };
        (self.status, Json(body)).into_response()
    }
}
