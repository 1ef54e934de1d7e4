use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn};
use webhook_exchange::config::AppConfig;
use webhook_exchange::error::AppError;
use webhook_exchange::exchange::{
    EventKind, HttpTransport, PayloadArgs, TokioPacer, WebhookAck, WebhookSender,
};
use webhook_exchange::telemetry;

#[derive(Args, Debug, Default)]
pub(crate) struct TargetArgs {
    /// Receiver URL (defaults to WEBHOOK_TARGET_URL)
    #[arg(long)]
    pub(crate) url: Option<String>,
    /// Per-request timeout in seconds
    #[arg(long)]
    pub(crate) timeout_secs: Option<u64>,
    /// Value for the X-Event-Source request header
    #[arg(long)]
    pub(crate) event_source: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct SendArgs {
    #[command(flatten)]
    pub(crate) target: TargetArgs,
    /// Event tag to send; unrecognized tags are sent without a payload
    #[arg(long, default_value = "user_created")]
    pub(crate) event_type: String,
    /// Seed for sample payload generation
    #[arg(long)]
    pub(crate) seed: Option<u64>,
}

#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    #[command(flatten)]
    pub(crate) target: TargetArgs,
    /// Seconds between two sends (defaults to WEBHOOK_INTERVAL_SECS)
    #[arg(long)]
    pub(crate) interval_secs: Option<u64>,
    /// Do not send the initial user_created envelope
    #[arg(long)]
    pub(crate) skip_warmup: bool,
    /// Seed for sample payload generation
    #[arg(long)]
    pub(crate) seed: Option<u64>,
}

fn load_sender_config(target: TargetArgs) -> Result<AppConfig, AppError> {
    let mut config = AppConfig::load()?;

    if let Some(url) = target.url {
        config.sender.target_url = url;
    }
    if let Some(secs) = target.timeout_secs.filter(|secs| *secs > 0) {
        config.sender.timeout = Duration::from_secs(secs);
    }
    if let Some(source) = target.event_source {
        config.sender.event_source = Some(source);
    }

    telemetry::init(&config.telemetry)?;
    Ok(config)
}

fn sample_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn print_ack(ack: &WebhookAck) {
    println!(
        "acknowledged: success={} message={:?}",
        ack.success, ack.message
    );
}

pub(crate) async fn send_once(args: SendArgs) -> Result<(), AppError> {
    let SendArgs {
        target,
        event_type,
        seed,
    } = args;
    let config = load_sender_config(target)?;

    let transport = HttpTransport::new(&config.sender)?;
    let span = info_span!("webhook_sender", url = %transport.url());
    let mut sender = WebhookSender::new(transport, sample_rng(seed), span);

    let ack = sender.send_event(&event_type, PayloadArgs::Sample).await?;
    print_ack(&ack);
    Ok(())
}

pub(crate) async fn run_sender(args: RunArgs) -> Result<(), AppError> {
    let RunArgs {
        target,
        interval_secs,
        skip_warmup,
        seed,
    } = args;
    let mut config = load_sender_config(target)?;
    if let Some(secs) = interval_secs.filter(|secs| *secs > 0) {
        config.sender.interval = Duration::from_secs(secs);
    }

    let transport = HttpTransport::new(&config.sender)?;
    let span = info_span!("webhook_sender", url = %transport.url());
    let mut sender = WebhookSender::new(transport, sample_rng(seed), span);

    if !skip_warmup {
        match sender
            .send_event(EventKind::UserCreated.tag(), PayloadArgs::Sample)
            .await
        {
            Ok(ack) => info!(success = ack.success, "warm-up webhook acknowledged"),
            Err(err) => warn!(error = %err, "warm-up webhook failed; continuing"),
        }
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received; stopping after the current send");
            interrupt.cancel();
        }
    });

    let stats = sender
        .run_periodic(config.sender.interval, &TokioPacer, &cancel)
        .await;
    println!(
        "sender stopped: attempted={} delivered={} failed={}",
        stats.attempted, stats.delivered, stats.failed
    );
    Ok(())
}

pub(crate) async fn probe_receiver(args: TargetArgs) -> Result<(), AppError> {
    let config = load_sender_config(args)?;
    let transport = HttpTransport::new(&config.sender)?;
    let descriptor = transport.probe().await?;
    println!("{descriptor}");
    Ok(())
}
