use bytes::Buf;
use prost::encoding::{decode_key, skip_field, DecodeContext, WireType};
use prost::Message;

use super::envelope::{Payload, WebhookEnvelope};
use super::schema::{WireEnvelope, PAYLOAD_TAG_RANGE};

const KNOWN_PAYLOAD_TAGS: [u32; 3] = [
    super::schema::USER_DATA_TAG,
    super::schema::PRODUCT_DATA_TAG,
    super::schema::ORDER_DATA_TAG,
];

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("request body is empty")]
    EmptyBody,
    #[error("malformed webhook envelope: {0}")]
    Malformed(#[from] prost::DecodeError),
}

/// Parses an envelope. Empty input is a valid, all-default envelope.
pub fn decode(bytes: &[u8]) -> Result<WebhookEnvelope, DecodeError> {
    let wire = WireEnvelope::decode(bytes)?;
    let unrecognized = trailing_unrecognized_payload(bytes)?;

    let mut envelope = WebhookEnvelope::from_wire(wire);
    if let Some(tag) = unrecognized {
        envelope.payload = Some(Payload::Unrecognized { tag });
    }
    Ok(envelope)
}

/// Transport-facing entry point: a request without a body never reaches the
/// decoder.
pub fn decode_request_body(bytes: &[u8]) -> Result<WebhookEnvelope, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::EmptyBody);
    }
    decode(bytes)
}

/// Oneof semantics: the last payload field on the wire is the active one. Returns
/// its tag when that field is a reserved payload number this build cannot decode.
fn trailing_unrecognized_payload(mut buf: &[u8]) -> Result<Option<u32>, prost::DecodeError> {
    let mut last_payload_tag = None;

    while buf.has_remaining() {
        let (tag, wire_type) = decode_key(&mut buf)?;
        if PAYLOAD_TAG_RANGE.contains(&tag) && wire_type == WireType::LengthDelimited {
            last_payload_tag = Some(tag);
        }
        skip_field(wire_type, tag, &mut buf, DecodeContext::default())?;
    }

    Ok(last_payload_tag.filter(|tag| !KNOWN_PAYLOAD_TAGS.contains(tag)))
}
