use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;
use webhook_exchange::exchange::{DispatchResult, DispatchSink, SinkError};

const JOURNAL_CAPACITY: usize = 256;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) journal: DispatchJournal,
}

/// Logs every dispatched event as a JSON record and keeps the most recent
/// ones in memory.
#[derive(Clone)]
pub(crate) struct DispatchJournal {
    entries: Arc<Mutex<VecDeque<DispatchResult>>>,
    capacity: usize,
}

impl Default for DispatchJournal {
    fn default() -> Self {
        Self::with_capacity(JOURNAL_CAPACITY)
    }
}

impl DispatchJournal {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn recent(&self) -> Result<Vec<DispatchResult>, SinkError> {
        let guard = self
            .entries
            .lock()
            .map_err(|_| SinkError::Unavailable("journal lock poisoned".to_string()))?;
        Ok(guard.iter().cloned().collect())
    }

    #[cfg(test)]
    pub(crate) fn poison_for_test(&self) {
        let entries = Arc::clone(&self.entries);
        let _ = std::thread::spawn(move || {
            let _guard = entries.lock();
            panic!("poisoning journal lock");
        })
        .join();
    }
}

impl DispatchSink for DispatchJournal {
    fn record(&self, result: &DispatchResult) -> Result<(), SinkError> {
        let record = serde_json::to_string(result)
            .map_err(|err| SinkError::Unavailable(format!("journal encoding: {err}")))?;
        info!(kind = result.kind.label(), %record, "dispatch journal");

        let mut guard = self
            .entries
            .lock()
            .map_err(|_| SinkError::Unavailable("journal lock poisoned".to_string()))?;
        if guard.len() == self.capacity {
            guard.pop_front();
        }
        guard.push_back(result.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use webhook_exchange::exchange::DispatchKind;

    fn result(event_id: &str) -> DispatchResult {
        DispatchResult {
            kind: DispatchKind::Empty,
            event_type: "invoice_paid".to_string(),
            event_id: event_id.to_string(),
            key_fields: BTreeMap::new(),
            summary: "unknown event without payload".to_string(),
        }
    }

    #[test]
    fn journal_keeps_only_the_newest_entries() {
        let journal = DispatchJournal::with_capacity(2);
        for id in ["evt_1", "evt_2", "evt_3"] {
            journal.record(&result(id)).expect("record succeeds");
        }

        let ids: Vec<_> = journal
            .recent()
            .expect("journal readable")
            .into_iter()
            .map(|entry| entry.event_id)
            .collect();
        assert_eq!(ids, vec!["evt_2", "evt_3"]);
    }
}
