mod cli;
mod delivery;
mod demo;
mod infra;
mod routes;
mod server;

use webhook_exchange::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
