//! Wire messages for the webhook exchange.
//!
//! Field numbers are the compatibility contract: new optional fields may be
//! appended, existing numbers are never reused with a different meaning.
//! Envelope tags [`PAYLOAD_TAG_RANGE`] are reserved for payload variants so a
//! receiver can tell a future variant apart from unrelated metadata.

use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use prost_types::Timestamp;
use serde::{Serialize, Serializer};

pub const CONTENT_TYPE: &str = "application/x-protobuf";

pub const USER_DATA_TAG: u32 = 4;
pub const PRODUCT_DATA_TAG: u32 = 5;
pub const ORDER_DATA_TAG: u32 = 6;
pub const PAYLOAD_TAG_RANGE: RangeInclusive<u32> = 4..=19;

/// Root message as it travels on the wire.
#[derive(Clone, PartialEq, prost::Message)]
pub struct WireEnvelope {
    #[prost(string, tag = "1")]
    pub event_type: String,
    #[prost(string, tag = "2")]
    pub event_id: String,
    #[prost(message, optional, tag = "3")]
    pub timestamp: Option<Timestamp>,
    #[prost(oneof = "WirePayload", tags = "4, 5, 6")]
    pub payload: Option<WirePayload>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum WirePayload {
    #[prost(message, tag = "4")]
    UserData(UserPayload),
    #[prost(message, tag = "5")]
    ProductData(ProductPayload),
    #[prost(message, tag = "6")]
    OrderData(OrderPayload),
}

#[derive(Clone, PartialEq, prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub email: String,
    #[prost(int32, tag = "4")]
    pub age: i32,
    #[prost(bool, tag = "5")]
    pub is_active: bool,
    #[prost(message, optional, tag = "6")]
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: Option<Timestamp>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub description: String,
    #[prost(double, tag = "4")]
    pub price: f64,
    #[prost(string, tag = "5")]
    pub category: String,
    #[prost(int32, tag = "6")]
    pub quantity: i32,
    #[prost(message, optional, tag = "7")]
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: Option<Timestamp>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(int64, tag = "2")]
    pub user_id: i64,
    #[prost(message, repeated, tag = "3")]
    pub items: Vec<OrderItem>,
    #[prost(double, tag = "4")]
    pub total_amount: f64,
    #[prost(enumeration = "OrderStatus", tag = "5")]
    #[serde(serialize_with = "serialize_order_status")]
    pub status: i32,
    #[prost(message, optional, tag = "6")]
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: Option<Timestamp>,
}

/// One order line. `total_price` is asserted by the sender and carried as-is.
#[derive(Clone, PartialEq, prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[prost(int64, tag = "1")]
    pub product_id: i64,
    #[prost(string, tag = "2")]
    pub product_name: String,
    #[prost(int32, tag = "3")]
    pub quantity: i32,
    #[prost(double, tag = "4")]
    pub unit_price: f64,
    #[prost(double, tag = "5")]
    pub total_price: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum OrderStatus {
    Pending = 0,
    Confirmed = 1,
    Shipped = 2,
    Delivered = 3,
    Cancelled = 4,
}

impl OrderStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Name used by the proto JSON mapping.
    pub fn wire_name(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "ORDER_STATUS_PENDING",
            OrderStatus::Confirmed => "ORDER_STATUS_CONFIRMED",
            OrderStatus::Shipped => "ORDER_STATUS_SHIPPED",
            OrderStatus::Delivered => "ORDER_STATUS_DELIVERED",
            OrderStatus::Cancelled => "ORDER_STATUS_CANCELLED",
        }
    }
}

/// Acknowledgment returned by the receiver.
#[derive(Clone, PartialEq, prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(message, optional, tag = "3")]
    #[serde(serialize_with = "serialize_timestamp")]
    pub processed_at: Option<Timestamp>,
}

pub fn timestamp_from(datetime: DateTime<Utc>) -> Timestamp {
    Timestamp {
        seconds: datetime.timestamp(),
        nanos: datetime.timestamp_subsec_nanos() as i32,
    }
}

pub fn timestamp_now() -> Timestamp {
    timestamp_from(Utc::now())
}

/// `None` when the timestamp is outside chrono's representable range or the
/// nanos are out of bounds.
pub fn timestamp_to_datetime(timestamp: &Timestamp) -> Option<DateTime<Utc>> {
    let nanos = u32::try_from(timestamp.nanos).ok()?;
    DateTime::from_timestamp(timestamp.seconds, nanos)
}

pub(crate) fn format_timestamp(timestamp: Option<&Timestamp>) -> String {
    timestamp
        .and_then(timestamp_to_datetime)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| "unset".to_string())
}

pub(crate) fn serialize_timestamp<S>(
    timestamp: &Option<Timestamp>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match timestamp.as_ref().and_then(timestamp_to_datetime) {
        Some(datetime) => serializer.serialize_str(&datetime.to_rfc3339()),
        None => serializer.serialize_none(),
    }
}

fn serialize_order_status<S>(status: &i32, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match OrderStatus::try_from(*status) {
        Ok(status) => serializer.serialize_str(status.wire_name()),
        Err(_) => serializer.serialize_i32(*status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use prost::Message;

    #[test]
    fn timestamp_keeps_nanosecond_precision() {
        let datetime = Utc
            .timestamp_opt(1_700_000_000, 123_456_789)
            .single()
            .expect("valid instant");
        let timestamp = timestamp_from(datetime);
        assert_eq!(timestamp.seconds, 1_700_000_000);
        assert_eq!(timestamp.nanos, 123_456_789);
        assert_eq!(timestamp_to_datetime(&timestamp), Some(datetime));
    }

    #[test]
    fn negative_nanos_are_not_a_datetime() {
        let timestamp = Timestamp {
            seconds: 10,
            nanos: -1,
        };
        assert!(timestamp_to_datetime(&timestamp).is_none());
    }

    #[test]
    fn order_status_numbering_is_stable() {
        assert_eq!(OrderStatus::Pending as i32, 0);
        assert_eq!(OrderStatus::Cancelled as i32, 4);
        assert!(matches!(OrderStatus::try_from(2), Ok(OrderStatus::Shipped)));
        assert!(OrderStatus::try_from(9).is_err());
    }

    #[test]
    fn user_payload_uses_documented_field_numbers() {
        let user = UserPayload {
            id: 1,
            ..Default::default()
        };
        // field 1, varint wire type, value 1
        assert_eq!(user.encode_to_vec(), vec![0x08, 0x01]);
    }

    #[test]
    fn order_json_uses_status_names() {
        let order = OrderPayload {
            id: 7,
            status: OrderStatus::Shipped as i32,
            ..Default::default()
        };
        let json = serde_json::to_value(&order).expect("serializes");
        assert_eq!(json["status"], "ORDER_STATUS_SHIPPED");
        assert_eq!(json["totalAmount"], 0.0);
        assert!(json["createdAt"].is_null());
    }
}
