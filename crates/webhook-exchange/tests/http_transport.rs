use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::HeaderMap;
use axum::routing::post;
use axum::Router;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::net::TcpListener;
use tracing::Span;
use webhook_exchange::config::SenderConfig;
use webhook_exchange::exchange::{
    build_ack, decode, webhook_router, DiscardSink, HttpTransport, PayloadArgs, Transport,
    TransportError, WebhookReceiver, WebhookSender, CONTENT_TYPE,
};
use webhook_exchange::exchange::receiver::ACK_MESSAGE;

const PATH: &str = "/api/protobuf-receiver/";

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener binds");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server runs");
    });
    addr
}

async fn serve_receiver() -> SocketAddr {
    let receiver = Arc::new(WebhookReceiver::new(Arc::new(DiscardSink), Span::none()));
    serve(webhook_router(receiver, PATH)).await
}

fn sender_config(addr: SocketAddr, event_source: Option<&str>) -> SenderConfig {
    SenderConfig {
        target_url: format!("http://{addr}{PATH}"),
        timeout: Duration::from_secs(5),
        interval: Duration::from_secs(30),
        event_source: event_source.map(str::to_string),
    }
}

#[tokio::test]
async fn sample_event_is_acknowledged_over_http() {
    let addr = serve_receiver().await;
    let transport = HttpTransport::new(&sender_config(addr, None)).expect("client builds");
    let mut sender = WebhookSender::new(transport, StdRng::seed_from_u64(5), Span::none());

    let ack = sender
        .send_event("order_placed", PayloadArgs::Sample)
        .await
        .expect("delivered");
    assert!(ack.success);
    assert_eq!(ack.message, ACK_MESSAGE);
    assert!(ack.processed_at.is_some());
}

#[tokio::test]
async fn requests_carry_protobuf_and_source_headers() {
    let captured: Arc<Mutex<Option<(HeaderMap, Vec<u8>)>>> = Arc::default();
    let sink = captured.clone();
    let router = Router::new().route(
        PATH,
        post(move |headers: HeaderMap, body: axum::body::Bytes| {
            let sink = sink.clone();
            async move {
                *sink.lock().expect("capture mutex poisoned") = Some((headers, body.to_vec()));
                build_ack(true, "captured")
            }
        }),
    );
    let addr = serve(router).await;

    let transport =
        HttpTransport::new(&sender_config(addr, Some("billing"))).expect("client builds");
    let mut sender = WebhookSender::new(transport, StdRng::seed_from_u64(9), Span::none());
    let ack = sender
        .send_event("user_created", PayloadArgs::Sample)
        .await
        .expect("delivered");
    assert_eq!(ack.message, "captured");

    let (headers, body) = captured
        .lock()
        .expect("capture mutex poisoned")
        .take()
        .expect("request captured");
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    assert_eq!(header("content-type").as_deref(), Some(CONTENT_TYPE));
    assert_eq!(header("x-event-source").as_deref(), Some("billing"));
    assert!(header("user-agent")
        .unwrap_or_default()
        .starts_with("webhook-exchange/"));

    let envelope = decode(&body).expect("body is an envelope");
    assert_eq!(envelope.event_type, "user_created");
}

#[tokio::test]
async fn rejected_body_maps_to_status_error() {
    let addr = serve_receiver().await;
    let transport = HttpTransport::new(&sender_config(addr, None)).expect("client builds");

    let err = transport
        .send(Vec::new())
        .await
        .expect_err("empty body rejected");
    match err {
        TransportError::Status { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("empty_body"), "body was {body}");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn closed_port_maps_to_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener binds");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let transport = HttpTransport::new(&sender_config(addr, None)).expect("client builds");
    let err = transport
        .send(vec![0x0a, 0x00])
        .await
        .expect_err("nothing listens");
    assert!(
        matches!(err, TransportError::Connect(_)),
        "expected connect error, got {err:?}"
    );
}

#[tokio::test]
async fn readiness_descriptor_is_returned_on_get() {
    let addr = serve_receiver().await;
    let transport = HttpTransport::new(&sender_config(addr, None)).expect("client builds");

    let descriptor = transport.probe().await.expect("descriptor served");
    let json: serde_json::Value = serde_json::from_str(&descriptor).expect("json descriptor");
    assert_eq!(json["status"], "ready");
    assert_eq!(json["content_type"], CONTENT_TYPE);
}
