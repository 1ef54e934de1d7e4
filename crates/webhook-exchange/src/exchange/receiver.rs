use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tracing::{error, info, warn, Span};

use super::ack::build_ack;
use super::decoder::{decode_request_body, DecodeError};
use super::dispatch::{DispatchInconsistency, DispatchResult, Dispatcher};
use super::schema::CONTENT_TYPE;
use super::sink::{DispatchSink, SinkError};

pub const ACK_MESSAGE: &str = "Webhook received and processed";

/// Receiver-side pipeline: decode, dispatch, hand off, acknowledge. Holds no
/// per-request state.
pub struct WebhookReceiver<S> {
    dispatcher: Dispatcher,
    sink: Arc<S>,
    span: Span,
}

/// Outcome of a successfully processed request body.
#[derive(Debug, Clone)]
pub struct ProcessedWebhook {
    pub result: DispatchResult,
    pub ack: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Inconsistent(#[from] DispatchInconsistency),
    #[error("internal fault: {0}")]
    Internal(#[from] SinkError),
}

impl ReceiverError {
    pub fn kind(&self) -> &'static str {
        match self {
            ReceiverError::Decode(DecodeError::EmptyBody) => "empty_body",
            ReceiverError::Decode(DecodeError::Malformed(_)) => "malformed",
            ReceiverError::Inconsistent(_) => "inconsistent_event",
            ReceiverError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ReceiverError::Decode(_) | ReceiverError::Inconsistent(_) => StatusCode::BAD_REQUEST,
            ReceiverError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ReceiverError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));
        (self.status(), body).into_response()
    }
}

impl<S> WebhookReceiver<S>
where
    S: DispatchSink + 'static,
{
    pub fn new(sink: Arc<S>, span: Span) -> Self {
        let dispatcher = Dispatcher::new(span.clone());
        Self {
            dispatcher,
            sink,
            span,
        }
    }

    pub fn process(&self, body: &[u8]) -> Result<ProcessedWebhook, ReceiverError> {
        let _entered = self.span.enter();
        info!(bytes = body.len(), "webhook received");

        let envelope = decode_request_body(body).inspect_err(|err| {
            warn!(error = %err, "rejecting webhook body");
        })?;
        let result = self.dispatcher.dispatch(&envelope)?;

        if let Err(err) = self.sink.record(&result) {
            error!(event_id = %result.event_id, error = %err, "dispatch sink failed");
            return Err(err.into());
        }

        info!(kind = result.kind.label(), summary = %result.summary, "webhook processed");
        Ok(ProcessedWebhook {
            result,
            ack: build_ack(true, ACK_MESSAGE),
        })
    }
}

/// Router exposing the webhook endpoint: POST carries envelopes, GET is a
/// readiness probe.
pub fn webhook_router<S>(receiver: Arc<WebhookReceiver<S>>, path: &str) -> Router
where
    S: DispatchSink + 'static,
{
    Router::new()
        .route(path, get(status_handler).post(receive_handler::<S>))
        .with_state(receiver)
}

pub(crate) async fn receive_handler<S>(
    State(receiver): State<Arc<WebhookReceiver<S>>>,
    body: Bytes,
) -> Response
where
    S: DispatchSink + 'static,
{
    match receiver.process(&body) {
        Ok(processed) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, CONTENT_TYPE)],
            processed.ack,
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn status_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ready",
        "message": "Protobuf webhook receiver is running; POST binary envelopes to this endpoint",
        "content_type": CONTENT_TYPE,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::ack::decode_ack;
    use crate::exchange::dispatch::DispatchKind;
    use crate::exchange::encoder::{encode_envelope, EnvelopeBuilder};
    use crate::exchange::sink::DiscardSink;

    fn receiver() -> WebhookReceiver<DiscardSink> {
        WebhookReceiver::new(Arc::new(DiscardSink), Span::none())
    }

    #[test]
    fn unknown_event_is_acknowledged_as_empty() {
        let body = encode_envelope(
            EnvelopeBuilder::new("invoice_paid")
                .event_id("evt_700001")
                .build(),
        );

        let processed = receiver().process(&body).expect("inert events succeed");
        assert_eq!(processed.result.kind, DispatchKind::Empty);
        let ack = decode_ack(&processed.ack).expect("ack decodes");
        assert!(ack.success);
        assert_eq!(ack.message, ACK_MESSAGE);
    }

    #[test]
    fn error_kinds_map_to_statuses() {
        let empty = receiver().process(&[]).expect_err("empty body rejected");
        assert_eq!(empty.kind(), "empty_body");
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

        let internal = ReceiverError::from(SinkError::Unavailable("disk full".to_string()));
        assert_eq!(internal.kind(), "internal");
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
