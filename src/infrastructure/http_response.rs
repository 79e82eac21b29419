// HTTP response utilities for the local supervisory API
use crate::application::dispatcher::{CommandError, Dispatched};
use crate::application::manual_gate::GateOutcome;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_response: Option<String>,
}

pub fn command_error_response(err: CommandError) -> Response {
    let message = err.to_string();
    let (status, error, field, backend_response) = match err {
        CommandError::Validation { field, .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_FAILED", Some(field), None)
        }
        CommandError::EmptyUpdate => (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_UPDATE", None, None),
        CommandError::ManualModeRequired => (StatusCode::CONFLICT, "MANUAL_MODE_REQUIRED", None, None),
        CommandError::ConfigUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "CONFIG_UNAVAILABLE", None, None),
        CommandError::Rejected { body, .. } => (StatusCode::BAD_GATEWAY, "COMMAND_REJECTED", None, Some(body)),
        CommandError::Unavailable(_) => (StatusCode::GATEWAY_TIMEOUT, "BACKEND_UNAVAILABLE", None, None),
    };

    let body = ErrorBody {
        error,
        message,
        field,
        backend_response,
    };
    (status, Json(body)).into_response()
}

#[derive(Debug, Serialize)]
pub struct CommandBody {
    pub sent: bool,
    pub reconciled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<crate::domain::tank::TankConfig>,
}

impl From<Dispatched> for CommandBody {
    fn from(dispatched: Dispatched) -> Self {
        Self {
            sent: true,
            reconciled: dispatched.reconciled,
            config: Some(dispatched.accepted),
        }
    }
}

impl From<GateOutcome> for CommandBody {
    fn from(outcome: GateOutcome) -> Self {
        match outcome {
            GateOutcome::Unchanged => Self {
                sent: false,
                reconciled: false,
                config: None,
            },
            GateOutcome::Sent(dispatched) => dispatched.into(),
        }
    }
}

pub fn command_response<T: Into<CommandBody>>(result: Result<T, CommandError>) -> Response {
    match result {
        Ok(outcome) => Json::<CommandBody>(outcome.into()).into_response(),
        Err(err) => {
            tracing::info!(error = %err, "command not applied");
            command_error_response(err)
        }
    }
}
