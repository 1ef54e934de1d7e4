use crate::config::ConfigError;
use crate::exchange::encoder::EncodeError;
use crate::exchange::sender::{SendEventError, TransportError};
use crate::exchange::sink::SinkError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Transport(TransportError),
    Encode(EncodeError),
    Delivery(SendEventError),
    Sink(SinkError),
    Render(serde_json::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Transport(err) => write!(f, "transport error: {}", err),
            AppError::Encode(err) => write!(f, "encode error: {}", err),
            AppError::Delivery(err) => write!(f, "delivery error: {}", err),
            AppError::Sink(err) => write!(f, "dispatch sink error: {}", err),
            AppError::Render(err) => write!(f, "render error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Transport(err) => Some(err),
            AppError::Encode(err) => Some(err),
            AppError::Delivery(err) => Some(err),
            AppError::Sink(err) => Some(err),
            AppError::Render(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Encode(_) => StatusCode::BAD_REQUEST,
            AppError::Transport(_) | AppError::Delivery(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Sink(_)
            | AppError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<TransportError> for AppError {
    fn from(value: TransportError) -> Self {
        Self::Transport(value)
    }
}

impl From<EncodeError> for AppError {
    fn from(value: EncodeError) -> Self {
        Self::Encode(value)
    }
}

impl From<SendEventError> for AppError {
    fn from(value: SendEventError) -> Self {
        Self::Delivery(value)
    }
}

impl From<SinkError> for AppError {
    fn from(value: SinkError) -> Self {
        Self::Sink(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Render(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::envelope::VariantKind;

    #[test]
    fn encode_errors_are_client_errors() {
        let err = AppError::from(EncodeError::PayloadMismatch {
            event_type: "order_placed".to_string(),
            expected: VariantKind::Order,
            supplied: VariantKind::User,
        });
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_failures_are_bad_gateway() {
        let err = AppError::from(TransportError::Timeout);
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn sink_failures_are_internal() {
        let err = AppError::from(SinkError::Unavailable("offline".to_string()));
        assert!(err.to_string().contains("offline"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
