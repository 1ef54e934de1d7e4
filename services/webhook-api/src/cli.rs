use crate::delivery::{probe_receiver, run_sender, send_once, RunArgs, SendArgs, TargetArgs};
use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use webhook_exchange::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Webhook Exchange",
    about = "Send and receive protobuf-encoded webhook envelopes over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the webhook receiver (default command)
    Serve(ServeArgs),
    /// Build and send a single webhook envelope
    Send(SendArgs),
    /// Send sample envelopes on a fixed interval until interrupted
    Run(RunArgs),
    /// Check that the receiver endpoint answers GET
    Probe(TargetArgs),
    /// Print a sample envelope as JSON and hex without touching the network
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the path the webhook endpoint is mounted on
    #[arg(long)]
    pub(crate) path: Option<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Send(args) => send_once(args).await,
        Command::Run(args) => run_sender(args).await,
        Command::Probe(args) => probe_receiver(args).await,
        Command::Demo(args) => run_demo(args),
    }
}
