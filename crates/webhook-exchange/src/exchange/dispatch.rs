use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn, Span};

use super::envelope::{Payload, VariantKind, WebhookEnvelope};
use super::schema::{format_timestamp, OrderPayload, OrderStatus, ProductPayload, UserPayload};

/// Which branch of the dispatch switch handled an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchKind {
    User,
    Product,
    Order,
    Empty,
    Unhandled,
}

impl DispatchKind {
    pub fn label(&self) -> &'static str {
        match self {
            DispatchKind::User => "user",
            DispatchKind::Product => "product",
            DispatchKind::Order => "order",
            DispatchKind::Empty => "empty",
            DispatchKind::Unhandled => "unhandled",
        }
    }
}

/// Normalized outcome handed to business-reaction collaborators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchResult {
    pub kind: DispatchKind,
    pub event_type: String,
    pub event_id: String,
    pub key_fields: BTreeMap<String, String>,
    pub summary: String,
}

/// A recognized `event_type` whose expected payload is not the one on the wire.
/// Neither side is treated as authoritative.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("event type '{event_type}' expects {expected} but envelope {event_id:?} carries {found}")]
pub struct DispatchInconsistency {
    pub event_type: String,
    pub event_id: String,
    pub expected: VariantKind,
    pub found: VariantKind,
}

/// Routes decoded envelopes to the per-variant handlers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    span: Span,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Span::none())
    }
}

impl Dispatcher {
    pub fn new(span: Span) -> Self {
        Self { span }
    }

    pub fn dispatch(
        &self,
        envelope: &WebhookEnvelope,
    ) -> Result<DispatchResult, DispatchInconsistency> {
        let _entered = self.span.enter();
        let found = envelope.variant();

        if let Some(kind) = envelope.event_kind() {
            let expected = kind.expected_variant();
            if expected != found && !matches!(found, VariantKind::Unrecognized(_)) {
                warn!(
                    event_type = %envelope.event_type,
                    event_id = %envelope.event_id,
                    %expected,
                    %found,
                    "event type disagrees with payload variant"
                );
                return Err(DispatchInconsistency {
                    event_type: envelope.event_type.clone(),
                    event_id: envelope.event_id.clone(),
                    expected,
                    found,
                });
            }
        }

        info!(
            event_type = %envelope.event_type,
            event_id = %envelope.event_id,
            sent_at = %format_timestamp(envelope.timestamp.as_ref()),
            "dispatching webhook envelope"
        );

        let result = match &envelope.payload {
            Some(Payload::User(user)) => handle_user(envelope, user),
            Some(Payload::Product(product)) => handle_product(envelope, product),
            Some(Payload::Order(order)) => handle_order(envelope, order),
            Some(Payload::Unrecognized { tag }) => handle_unrecognized(envelope, *tag),
            None => handle_empty(envelope),
        };
        Ok(result)
    }
}

fn result(
    envelope: &WebhookEnvelope,
    kind: DispatchKind,
    key_fields: BTreeMap<String, String>,
    summary: String,
) -> DispatchResult {
    DispatchResult {
        kind,
        event_type: envelope.event_type.clone(),
        event_id: envelope.event_id.clone(),
        key_fields,
        summary,
    }
}

fn fields<const N: usize>(pairs: [(&str, String); N]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

pub(crate) fn handle_user(envelope: &WebhookEnvelope, user: &UserPayload) -> DispatchResult {
    info!(
        id = user.id,
        name = %user.name,
        email = %user.email,
        age = user.age,
        active = user.is_active,
        created_at = %format_timestamp(user.created_at.as_ref()),
        "user payload"
    );

    let summary = format!(
        "user {} '{}' <{}>, age {}, {}",
        user.id,
        user.name,
        user.email,
        user.age,
        if user.is_active { "active" } else { "inactive" }
    );
    let key_fields = fields([
        ("id", user.id.to_string()),
        ("name", user.name.clone()),
        ("email", user.email.clone()),
        ("age", user.age.to_string()),
        ("is_active", user.is_active.to_string()),
    ]);
    result(envelope, DispatchKind::User, key_fields, summary)
}

pub(crate) fn handle_product(
    envelope: &WebhookEnvelope,
    product: &ProductPayload,
) -> DispatchResult {
    info!(
        id = product.id,
        name = %product.name,
        description = %product.description,
        price = product.price,
        category = %product.category,
        quantity = product.quantity,
        created_at = %format_timestamp(product.created_at.as_ref()),
        "product payload"
    );

    let summary = format!(
        "product {} '{}' in {}: {} in stock at ${:.2}",
        product.id, product.name, product.category, product.quantity, product.price
    );
    let key_fields = fields([
        ("id", product.id.to_string()),
        ("name", product.name.clone()),
        ("category", product.category.clone()),
        ("price", format!("{:.2}", product.price)),
        ("quantity", product.quantity.to_string()),
    ]);
    result(envelope, DispatchKind::Product, key_fields, summary)
}

/// Line totals and the order total are echoed as sent; they are not cross-checked.
pub(crate) fn handle_order(envelope: &WebhookEnvelope, order: &OrderPayload) -> DispatchResult {
    let status = OrderStatus::try_from(order.status)
        .map(|status| status.label().to_string())
        .unwrap_or_else(|_| format!("unknown({})", order.status));

    info!(
        id = order.id,
        user_id = order.user_id,
        total_amount = order.total_amount,
        status = %status,
        items = order.items.len(),
        created_at = %format_timestamp(order.created_at.as_ref()),
        "order payload"
    );
    for (position, item) in order.items.iter().enumerate() {
        info!(
            "  {}. {} - {} x ${:.2} = ${:.2}",
            position + 1,
            item.product_name,
            item.quantity,
            item.unit_price,
            item.total_price
        );
    }

    let summary = format!(
        "order {} for user {}: {} item(s), total ${:.2}, {}",
        order.id,
        order.user_id,
        order.items.len(),
        order.total_amount,
        status
    );
    let key_fields = fields([
        ("id", order.id.to_string()),
        ("user_id", order.user_id.to_string()),
        ("total_amount", format!("{:.2}", order.total_amount)),
        ("status", status),
        ("item_count", order.items.len().to_string()),
    ]);
    result(envelope, DispatchKind::Order, key_fields, summary)
}

fn handle_unrecognized(envelope: &WebhookEnvelope, tag: u32) -> DispatchResult {
    warn!(
        event_type = %envelope.event_type,
        event_id = %envelope.event_id,
        field = tag,
        "payload variant has no handler in this build"
    );
    result(
        envelope,
        DispatchKind::Unhandled,
        fields([("field", tag.to_string())]),
        format!("unhandled payload variant in field {tag}"),
    )
}

fn handle_empty(envelope: &WebhookEnvelope) -> DispatchResult {
    let label = if envelope.event_type.is_empty() {
        "untyped"
    } else {
        envelope.event_type.as_str()
    };
    result(
        envelope,
        DispatchKind::Empty,
        BTreeMap::new(),
        format!("{label} event without payload"),
    )
}
