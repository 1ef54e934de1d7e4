use super::dispatch::DispatchResult;

/// Downstream hook for dispatched events (logging, storage, alerting adapters).
pub trait DispatchSink: Send + Sync {
    fn record(&self, result: &DispatchResult) -> Result<(), SinkError>;
}

/// Sink failure. Surfaces to the HTTP caller as an internal fault.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("dispatch sink unavailable: {0}")]
    Unavailable(String),
}

/// Sink that drops every result; useful when only the ack matters.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl DispatchSink for DiscardSink {
    fn record(&self, _result: &DispatchResult) -> Result<(), SinkError> {
        Ok(())
    }
}
