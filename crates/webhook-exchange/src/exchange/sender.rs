//! Outbound delivery: a one-shot `send` and a cancellable periodic loop.
//!
//! Delivery is at-most-once. A failed attempt is logged and the loop moves on
//! to the next interval; there is no retry or backoff.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, Instrument, Span};

use super::ack::decode_ack;
use super::encoder::{encode_envelope, EncodeError, EnvelopeEncoder, PayloadArgs};
use super::schema::{self, WebhookAck};
use crate::config::SenderConfig;

const EVENT_SOURCE_HEADER: &str = "x-event-source";

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("could not reach webhook receiver: {0}")]
    Connect(String),
    #[error("webhook receiver timed out")]
    Timeout,
    #[error("webhook receiver answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid transport setting: {0}")]
    Setup(String),
    #[error("unexpected transport failure: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_builder() {
            TransportError::Setup(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

/// Moves one serialized envelope to the receiver and returns the ack body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, envelope: Vec<u8>) -> Result<Vec<u8>, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, envelope: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        (**self).send(envelope).await
    }
}

/// Waits out the gap between two iterations of the periodic loop.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn wait(&self, interval: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn wait(&self, interval: Duration) {
        tokio::time::sleep(interval).await;
    }
}

/// HTTP transport with a fixed protobuf content type and a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(config: &SenderConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(schema::CONTENT_TYPE));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("webhook-exchange/", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(source) = &config.event_source {
            let value = HeaderValue::from_str(source)
                .map_err(|err| TransportError::Setup(format!("event source header: {err}")))?;
            headers.insert(HeaderName::from_static(EVENT_SOURCE_HEADER), value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            url: config.target_url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// GET on the webhook endpoint; returns the receiver's readiness descriptor.
    pub async fn probe(&self) -> Result<String, TransportError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, envelope: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        let response = self.client.post(&self.url).body(envelope).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Counters reported when the periodic loop stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SenderStats {
    pub attempted: u64,
    pub delivered: u64,
    pub failed: u64,
}

/// Builds envelopes and hands them to a transport.
pub struct WebhookSender<T, R> {
    transport: T,
    encoder: EnvelopeEncoder<R>,
    span: Span,
}

impl<T, R> WebhookSender<T, R>
where
    T: Transport,
    R: Rng + Send + Sync,
{
    pub fn new(transport: T, rng: R, span: Span) -> Self {
        Self {
            transport,
            encoder: EnvelopeEncoder::new(rng),
            span,
        }
    }

    /// Sends already-encoded envelope bytes and decodes the ack.
    pub async fn send(&self, envelope: Vec<u8>) -> Result<WebhookAck, TransportError> {
        let size = envelope.len();
        async {
            info!(bytes = size, "sending webhook");
            let body = self.transport.send(envelope).await?;
            decode_ack(&body)
                .map_err(|err| TransportError::Other(format!("unreadable acknowledgment: {err}")))
        }
        .instrument(self.span.clone())
        .await
    }

    /// Builds an envelope for `event_type` from `args` and sends it once.
    pub async fn send_event(
        &mut self,
        event_type: &str,
        args: PayloadArgs,
    ) -> Result<WebhookAck, SendEventError> {
        let envelope = self.encoder.envelope(event_type, args)?;
        {
            let _entered = self.span.enter();
            info!(
                event_type = %envelope.event_type,
                event_id = %envelope.event_id,
                "built webhook envelope"
            );
            if let Ok(json) = envelope.to_json() {
                debug!("envelope as json:\n{json}");
            }
        }
        let ack = self.send(encode_envelope(envelope)).await?;
        Ok(ack)
    }

    /// Repeats pick-build-send-wait until `cancel` fires. Cancellation is only
    /// observed between iterations, never in the middle of a send.
    pub async fn run_periodic<P>(
        &mut self,
        interval: Duration,
        pacer: &P,
        cancel: &CancellationToken,
    ) -> SenderStats
    where
        P: Pacer,
    {
        let mut stats = SenderStats::default();
        info!(
            parent: &self.span,
            interval_secs = interval.as_secs_f64(),
            "periodic sender started"
        );

        while !cancel.is_cancelled() {
            let kind = self.encoder.sample_kind();
            stats.attempted += 1;

            match self.send_event(kind.tag(), PayloadArgs::Sample).await {
                Ok(ack) => {
                    stats.delivered += 1;
                    info!(
                        parent: &self.span,
                        event_type = kind.tag(),
                        success = ack.success,
                        message = %ack.message,
                        "webhook acknowledged"
                    );
                }
                Err(err) => {
                    stats.failed += 1;
                    error!(
                        parent: &self.span,
                        event_type = kind.tag(),
                        error = %err,
                        "webhook delivery failed"
                    );
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = pacer.wait(interval) => {}
            }
        }

        info!(
            parent: &self.span,
            attempted = stats.attempted,
            delivered = stats.delivered,
            failed = stats.failed,
            "periodic sender stopped"
        );
        stats
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SendEventError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}
