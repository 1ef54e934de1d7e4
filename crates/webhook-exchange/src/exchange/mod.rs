//! Binary webhook exchange: wire schema, envelope encoding, decoding and
//! dispatch, acknowledgments, and the HTTP transport on both ends.

pub mod ack;
pub mod decoder;
pub mod dispatch;
pub mod encoder;
pub mod envelope;
pub mod receiver;
pub mod schema;
pub mod sender;
pub mod sink;

pub use ack::{build_ack, decode_ack};
pub use decoder::{decode, decode_request_body, DecodeError};
pub use dispatch::{DispatchInconsistency, DispatchKind, DispatchResult, Dispatcher};
pub use encoder::{encode_envelope, EncodeError, EnvelopeBuilder, EnvelopeEncoder, PayloadArgs};
pub use envelope::{EventKind, Payload, VariantKind, WebhookEnvelope};
pub use receiver::{webhook_router, ProcessedWebhook, ReceiverError, WebhookReceiver};
pub use schema::{
    OrderItem, OrderPayload, OrderStatus, ProductPayload, UserPayload, WebhookAck, CONTENT_TYPE,
};
pub use sender::{
    HttpTransport, Pacer, SendEventError, SenderStats, TokioPacer, Transport, TransportError,
    WebhookSender,
};
pub use sink::{DiscardSink, DispatchSink, SinkError};
