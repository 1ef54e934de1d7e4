use prost::Message;
use prost_types::Timestamp;
use rand::seq::SliceRandom;
use rand::Rng;

use super::envelope::{EventKind, Payload, VariantKind, WebhookEnvelope};
use super::schema::{
    timestamp_now, OrderItem, OrderPayload, OrderStatus, ProductPayload, UserPayload,
};

const SAMPLE_NAMES: [&str; 6] = [
    "Alisher Navoi",
    "Mirza Ulug'bek",
    "Abu Ali ibn Sino",
    "Bobur Mirzo",
    "Amir Temur",
    "Al-Xorazmi",
];

const SAMPLE_PRODUCTS: [(&str, &str, f64, &str); 5] = [
    ("Moshina", "Tez va ishonchli transport", 50000.0, "Transport"),
    ("Telefon", "Zamonaviy smartphone", 1200.0, "Texnologiya"),
    ("Kitob", "Ilmiy adabiyot", 25.0, "Ta'lim"),
    ("Noutbuk", "Professional ish uchun", 1500.0, "Texnologiya"),
    ("Kiyim", "Sifatli kiyim", 80.0, "Moda"),
];

const SAMPLE_ORDER_STATUSES: [OrderStatus; 3] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Shipped,
];

/// Caller input for the payload half of an envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadArgs {
    User(UserPayload),
    Product(ProductPayload),
    Order(OrderPayload),
    /// Draw every payload field from the encoder's random source.
    Sample,
    Empty,
}

impl PayloadArgs {
    fn variant(&self) -> Option<VariantKind> {
        match self {
            PayloadArgs::User(_) => Some(VariantKind::User),
            PayloadArgs::Product(_) => Some(VariantKind::Product),
            PayloadArgs::Order(_) => Some(VariantKind::Order),
            PayloadArgs::Sample => None,
            PayloadArgs::Empty => Some(VariantKind::None),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("event type '{event_type}' requires {expected}, caller supplied {supplied}")]
    PayloadMismatch {
        event_type: String,
        expected: VariantKind,
        supplied: VariantKind,
    },
}

/// Assembles a single envelope. Pinning the id and timestamp makes the encoded
/// bytes a pure function of the supplied fields.
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder {
    event_type: String,
    event_id: Option<String>,
    timestamp: Option<Timestamp>,
    payload: Option<Payload>,
}

impl EnvelopeBuilder {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            event_id: None,
            timestamp: None,
            payload: None,
        }
    }

    pub fn event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn user(mut self, user: UserPayload) -> Self {
        self.payload = Some(Payload::User(user));
        self
    }

    pub fn product(mut self, product: ProductPayload) -> Self {
        self.payload = Some(Payload::Product(product));
        self
    }

    pub fn order(mut self, order: OrderPayload) -> Self {
        self.payload = Some(Payload::Order(order));
        self
    }

    pub fn build(self) -> WebhookEnvelope {
        WebhookEnvelope {
            event_type: self.event_type,
            event_id: self.event_id.unwrap_or_default(),
            timestamp: Some(self.timestamp.unwrap_or_else(timestamp_now)),
            payload: self.payload,
        }
    }
}

pub fn encode_envelope(envelope: WebhookEnvelope) -> Vec<u8> {
    envelope.into_wire().encode_to_vec()
}

/// Sender-side encoder owning the random source used for event ids and
/// sampled payloads.
pub struct EnvelopeEncoder<R> {
    rng: R,
}

impl<R: Rng> EnvelopeEncoder<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Builds and serializes one envelope. Unrecognized event types produce an
    /// envelope without a payload regardless of `args`.
    pub fn build_envelope(
        &mut self,
        event_type: &str,
        args: PayloadArgs,
    ) -> Result<Vec<u8>, EncodeError> {
        let envelope = self.envelope(event_type, args)?;
        Ok(encode_envelope(envelope))
    }

    pub fn envelope(
        &mut self,
        event_type: &str,
        args: PayloadArgs,
    ) -> Result<WebhookEnvelope, EncodeError> {
        let payload = match EventKind::parse(event_type) {
            Some(kind) => Some(self.payload_for(event_type, kind, args)?),
            None => None,
        };

        let mut builder = EnvelopeBuilder::new(event_type).event_id(self.sample_event_id());
        builder.payload = payload;
        Ok(builder.build())
    }

    fn payload_for(
        &mut self,
        event_type: &str,
        kind: EventKind,
        args: PayloadArgs,
    ) -> Result<Payload, EncodeError> {
        let expected = kind.expected_variant();
        match (kind, args) {
            (EventKind::UserCreated, PayloadArgs::User(user)) => Ok(Payload::User(user)),
            (EventKind::ProductUpdated, PayloadArgs::Product(product)) => {
                Ok(Payload::Product(product))
            }
            (EventKind::OrderPlaced, PayloadArgs::Order(order)) => Ok(Payload::Order(order)),
            (EventKind::UserCreated, PayloadArgs::Sample) => Ok(Payload::User(self.sample_user())),
            (EventKind::ProductUpdated, PayloadArgs::Sample) => {
                Ok(Payload::Product(self.sample_product()))
            }
            (EventKind::OrderPlaced, PayloadArgs::Sample) => {
                Ok(Payload::Order(self.sample_order()))
            }
            (_, other) => Err(EncodeError::PayloadMismatch {
                event_type: event_type.to_string(),
                expected,
                supplied: other.variant().unwrap_or(expected),
            }),
        }
    }

    pub fn sample_kind(&mut self) -> EventKind {
        EventKind::ALL[self.rng.gen_range(0..EventKind::ALL.len())]
    }

    pub fn sample_event_id(&mut self) -> String {
        format!("evt_{}", self.rng.gen_range(100_000..=999_999))
    }

    pub fn sample_user(&mut self) -> UserPayload {
        let id = self.rng.gen_range(1..=10_000);
        let name = SAMPLE_NAMES
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(SAMPLE_NAMES[0]);

        UserPayload {
            id,
            name: name.to_string(),
            email: format!("user{id}@example.uz"),
            age: self.rng.gen_range(18..=65),
            is_active: self.rng.gen_bool(0.5),
            created_at: Some(timestamp_now()),
        }
    }

    pub fn sample_product(&mut self) -> ProductPayload {
        let (name, description, price, category) = SAMPLE_PRODUCTS
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(SAMPLE_PRODUCTS[0]);

        ProductPayload {
            id: self.rng.gen_range(1..=1_000),
            name: name.to_string(),
            description: description.to_string(),
            price,
            category: category.to_string(),
            quantity: self.rng.gen_range(1..=100),
            created_at: Some(timestamp_now()),
        }
    }

    pub fn sample_order(&mut self) -> OrderPayload {
        let item_count = self.rng.gen_range(1..=5);
        let items: Vec<OrderItem> = (0..item_count)
            .map(|_| {
                let product_id = self.rng.gen_range(1..=1_000);
                let quantity = self.rng.gen_range(1..=10);
                let unit_price = round_cents(self.rng.gen_range(10.0..500.0));
                OrderItem {
                    product_id,
                    product_name: format!("Product_{product_id}"),
                    quantity,
                    unit_price,
                    total_price: round_cents(f64::from(quantity) * unit_price),
                }
            })
            .collect();
        let total_amount = round_cents(items.iter().map(|item| item.total_price).sum());
        let status = SAMPLE_ORDER_STATUSES
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(OrderStatus::Pending);

        OrderPayload {
            id: self.rng.gen_range(1..=50_000),
            user_id: self.rng.gen_range(1..=10_000),
            items,
            total_amount,
            status: status as i32,
            created_at: Some(timestamp_now()),
        }
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn encoder() -> EnvelopeEncoder<StdRng> {
        EnvelopeEncoder::new(StdRng::seed_from_u64(7))
    }

    #[test]
    fn pinned_envelopes_encode_deterministically() {
        let pinned = || {
            EnvelopeBuilder::new("user_created")
                .event_id("evt_100001")
                .timestamp(Timestamp {
                    seconds: 1_700_000_000,
                    nanos: 5,
                })
                .user(UserPayload {
                    id: 1,
                    name: "Bobur Mirzo".to_string(),
                    ..Default::default()
                })
                .build()
        };

        assert_eq!(encode_envelope(pinned()), encode_envelope(pinned()));
    }

    #[test]
    fn each_recognized_kind_samples_its_own_variant() {
        let mut encoder = encoder();
        for kind in EventKind::ALL {
            let envelope = encoder
                .envelope(kind.tag(), PayloadArgs::Sample)
                .expect("sample builds");
            assert_eq!(envelope.variant(), kind.expected_variant());
            assert!(envelope.event_id.starts_with("evt_"));
            assert!(envelope.timestamp.is_some());
        }
    }

    #[test]
    fn unrecognized_event_type_is_built_without_payload() {
        let mut encoder = encoder();
        let envelope = encoder
            .envelope("invoice_paid", PayloadArgs::User(UserPayload::default()))
            .expect("unknown events are permitted");
        assert_eq!(envelope.event_type, "invoice_paid");
        assert_eq!(envelope.variant(), VariantKind::None);
    }

    #[test]
    fn mismatched_args_are_rejected() {
        let mut encoder = encoder();
        let err = encoder
            .build_envelope("order_placed", PayloadArgs::User(UserPayload::default()))
            .expect_err("user args cannot back an order event");
        assert!(matches!(
            err,
            EncodeError::PayloadMismatch {
                expected: VariantKind::Order,
                supplied: VariantKind::User,
                ..
            }
        ));

        let err = encoder
            .build_envelope("user_created", PayloadArgs::Empty)
            .expect_err("recognized events need a payload");
        assert!(err.to_string().contains("no payload"));
    }

    #[test]
    fn sampled_fields_stay_in_documented_ranges() {
        let mut encoder = encoder();
        for _ in 0..50 {
            let user = encoder.sample_user();
            assert!((1..=10_000).contains(&user.id));
            assert!((18..=65).contains(&user.age));
            assert_eq!(user.email, format!("user{}@example.uz", user.id));

            let product = encoder.sample_product();
            assert!((1..=100).contains(&product.quantity));
            assert!(SAMPLE_PRODUCTS.iter().any(|entry| entry.0 == product.name));

            let order = encoder.sample_order();
            assert!((1..=5).contains(&order.items.len()));
            assert!(order.status <= OrderStatus::Shipped as i32);
            for item in &order.items {
                assert_eq!(item.product_name, format!("Product_{}", item.product_id));
                assert!((10.0..=500.0).contains(&item.unit_price));
            }
        }
    }
}
