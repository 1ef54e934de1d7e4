use std::fmt;

use prost_types::Timestamp;
use serde::Serialize;

use super::schema::{
    serialize_timestamp, OrderPayload, ProductPayload, UserPayload, WireEnvelope, WirePayload,
};

/// Event tags a sender is expected to use. Any other tag is carried verbatim
/// and treated as an inert, unknown event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    UserCreated,
    ProductUpdated,
    OrderPlaced,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::UserCreated,
        EventKind::ProductUpdated,
        EventKind::OrderPlaced,
    ];

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "user_created" => Some(Self::UserCreated),
            "product_updated" => Some(Self::ProductUpdated),
            "order_placed" => Some(Self::OrderPlaced),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::UserCreated => "user_created",
            EventKind::ProductUpdated => "product_updated",
            EventKind::OrderPlaced => "order_placed",
        }
    }

    /// Payload variant an envelope with this tag must carry.
    pub fn expected_variant(&self) -> VariantKind {
        match self {
            EventKind::UserCreated => VariantKind::User,
            EventKind::ProductUpdated => VariantKind::Product,
            EventKind::OrderPlaced => VariantKind::Order,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The active member of the payload alternative.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Payload {
    #[serde(rename = "userData")]
    User(UserPayload),
    #[serde(rename = "productData")]
    Product(ProductPayload),
    #[serde(rename = "orderData")]
    Order(OrderPayload),
    /// A payload field in the reserved range that this build has no schema for.
    Unrecognized { tag: u32 },
}

impl Payload {
    pub fn variant(&self) -> VariantKind {
        match self {
            Payload::User(_) => VariantKind::User,
            Payload::Product(_) => VariantKind::Product,
            Payload::Order(_) => VariantKind::Order,
            Payload::Unrecognized { tag } => VariantKind::Unrecognized(*tag),
        }
    }
}

/// Structural shape of an envelope's payload, including its absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    User,
    Product,
    Order,
    Unrecognized(u32),
    None,
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantKind::User => f.write_str("user_data"),
            VariantKind::Product => f.write_str("product_data"),
            VariantKind::Order => f.write_str("order_data"),
            VariantKind::Unrecognized(tag) => write!(f, "unrecognized field {tag}"),
            VariantKind::None => f.write_str("no payload"),
        }
    }
}

/// Decoded or to-be-encoded webhook event.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEnvelope {
    pub event_type: String,
    pub event_id: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: Option<Timestamp>,
    #[serde(flatten)]
    pub payload: Option<Payload>,
}

impl WebhookEnvelope {
    pub fn event_kind(&self) -> Option<EventKind> {
        EventKind::parse(&self.event_type)
    }

    pub fn variant(&self) -> VariantKind {
        self.payload
            .as_ref()
            .map(Payload::variant)
            .unwrap_or(VariantKind::None)
    }

    /// Pretty JSON with proto-style field names, for logs and demos.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub(crate) fn into_wire(self) -> WireEnvelope {
        let payload = match self.payload {
            Some(Payload::User(user)) => Some(WirePayload::UserData(user)),
            Some(Payload::Product(product)) => Some(WirePayload::ProductData(product)),
            Some(Payload::Order(order)) => Some(WirePayload::OrderData(order)),
            Some(Payload::Unrecognized { .. }) | None => None,
        };

        WireEnvelope {
            event_type: self.event_type,
            event_id: self.event_id,
            timestamp: self.timestamp,
            payload,
        }
    }

    pub(crate) fn from_wire(wire: WireEnvelope) -> Self {
        let payload = wire.payload.map(|payload| match payload {
            WirePayload::UserData(user) => Payload::User(user),
            WirePayload::ProductData(product) => Payload::Product(product),
            WirePayload::OrderData(order) => Payload::Order(order),
        });

        Self {
            event_type: wire.event_type,
            event_id: wire.event_id,
            timestamp: wire.timestamp,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_round_trips_tags() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::parse(kind.tag()), Some(kind));
        }
        assert_eq!(EventKind::parse("invoice_paid"), None);
        assert_eq!(EventKind::parse("USER_CREATED"), None);
    }

    #[test]
    fn empty_envelope_has_no_variant() {
        let envelope = WebhookEnvelope::default();
        assert_eq!(envelope.variant(), VariantKind::None);
        assert_eq!(envelope.event_kind(), None);
    }

    #[test]
    fn json_rendering_nests_payload_under_variant_name() {
        let envelope = WebhookEnvelope {
            event_type: "user_created".to_string(),
            event_id: "demo_001".to_string(),
            timestamp: None,
            payload: Some(Payload::User(UserPayload {
                id: 12345,
                name: "Alisher Navoiy".to_string(),
                ..Default::default()
            })),
        };

        let json: serde_json::Value =
            serde_json::from_str(&envelope.to_json().expect("renders")).expect("valid json");
        assert_eq!(json["eventType"], "user_created");
        assert_eq!(json["userData"]["id"], 12345);
        assert_eq!(json["userData"]["name"], "Alisher Navoiy");
    }
}
