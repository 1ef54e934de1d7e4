use prost::Message;

use super::schema::{timestamp_now, WebhookAck};

/// Serializes an acknowledgment stamped with the current time. The message is
/// carried verbatim.
pub fn build_ack(success: bool, message: impl Into<String>) -> Vec<u8> {
    WebhookAck {
        success,
        message: message.into(),
        processed_at: Some(timestamp_now()),
    }
    .encode_to_vec()
}

pub fn decode_ack(bytes: &[u8]) -> Result<WebhookAck, prost::DecodeError> {
    WebhookAck::decode(bytes)
}
