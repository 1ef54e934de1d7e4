use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use webhook_exchange::error::AppError;
use webhook_exchange::exchange::{
    build_ack, decode, encode_envelope, EnvelopeBuilder, EnvelopeEncoder, EventKind, PayloadArgs,
    UserPayload, WebhookEnvelope,
};
use webhook_exchange::exchange::receiver::ACK_MESSAGE;
use webhook_exchange::exchange::schema::timestamp_now;

const HEX_PREVIEW_CHARS: usize = 100;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Event tag to render. user_created uses a fixed, well-known payload.
    #[arg(long, default_value = "user_created")]
    pub(crate) event_type: String,
    /// Seed for sample payload generation
    #[arg(long, default_value_t = 42)]
    pub(crate) seed: u64,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let envelope = demo_envelope(&args.event_type, args.seed)?;
    println!("{}", render_demo(&envelope)?);
    Ok(())
}

fn demo_envelope(event_type: &str, seed: u64) -> Result<WebhookEnvelope, AppError> {
    if event_type == EventKind::UserCreated.tag() {
        return Ok(EnvelopeBuilder::new(event_type)
            .event_id("demo_001")
            .user(UserPayload {
                id: 12345,
                name: "Alisher Navoiy".to_string(),
                email: "alisher@example.uz".to_string(),
                age: 35,
                is_active: true,
                created_at: Some(timestamp_now()),
            })
            .build());
    }

    let mut encoder = EnvelopeEncoder::new(StdRng::seed_from_u64(seed));
    Ok(encoder.envelope(event_type, PayloadArgs::Sample)?)
}

fn hex_preview(bytes: &[u8]) -> String {
    let encoded = hex::encode(bytes);
    if encoded.len() > HEX_PREVIEW_CHARS {
        format!("{}...", &encoded[..HEX_PREVIEW_CHARS])
    } else {
        encoded
    }
}

pub(crate) fn render_demo(envelope: &WebhookEnvelope) -> Result<String, AppError> {
    let bytes = encode_envelope(envelope.clone());
    let mut lines = vec![
        "Webhook envelope demo".to_string(),
        format!("Event: {} ({})", envelope.event_type, envelope.variant()),
        "\nJSON view:".to_string(),
        envelope.to_json()?,
        format!("\nBinary size: {} bytes", bytes.len()),
        format!("Hex: {}", hex_preview(&bytes)),
    ];

    match decode(&bytes) {
        Ok(decoded) if decoded == *envelope => {
            lines.push("Round trip: decoded envelope matches the original".to_string())
        }
        Ok(_) => lines.push("Round trip: decoded envelope differs from the original".to_string()),
        Err(err) => lines.push(format!("Round trip failed: {err}")),
    }

    let ack = build_ack(true, ACK_MESSAGE);
    lines.push(format!(
        "Acknowledgment: {} bytes, hex {}",
        ack.len(),
        hex_preview(&ack)
    ));

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use webhook_exchange::exchange::Payload;

    #[test]
    fn user_demo_renders_navoiy_envelope() {
        let envelope = demo_envelope("user_created", 42).expect("demo envelope");
        let output = render_demo(&envelope).expect("demo renders");

        assert!(output.contains("Alisher Navoiy"));
        assert!(output.contains("Event: user_created (user_data)"));
        assert!(output.contains("decoded envelope matches the original"));
    }

    #[test]
    fn sampled_demo_is_reproducible_for_a_seed() {
        let first = demo_envelope("order_placed", 7).expect("demo envelope");
        let second = demo_envelope("order_placed", 7).expect("demo envelope");
        assert_eq!(first.event_id, second.event_id);

        let (Some(Payload::Order(first)), Some(Payload::Order(second))) =
            (first.payload, second.payload)
        else {
            panic!("expected order payloads");
        };
        assert_eq!(first.items, second.items);
        assert_eq!(first.total_amount, second.total_amount);
    }

    #[test]
    fn long_hex_is_truncated() {
        let preview = hex_preview(&[0xab; 80]);
        assert_eq!(preview.len(), HEX_PREVIEW_CHARS + 3);
        assert!(preview.ends_with("..."));
    }
}
