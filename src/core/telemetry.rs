use crate::core::hasher::ContentHash;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

/// Lifecycle states of a single invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessState {
    Created,
    Registered,
    CacheCheck,
    Hit,
    Running,
    Stored,
    Returned,
    Failed,
    Cancelled,
}

/// A single entry in the execution trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub timestamp: u64,
    pub process_id: Uuid,
    pub function: String,
    pub hash: Option<ContentHash>,
    pub state: ProcessState,
    pub metadata: HashMap<String, String>,
}

impl TraceEntry {
    pub fn new(process_id: Uuid, function: impl Into<String>, state: ProcessState) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self {
            timestamp,
            process_id,
            function: function.into(),
            hash: None,
            state,
            metadata: HashMap::new(),
        }
    }

    pub fn with_hash(mut self, hash: &ContentHash) -> Self {
        self.hash = Some(hash.clone());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Trait for recording execution traces.
pub trait Telemetry: Send + Sync {
    fn record(&self, entry: TraceEntry);
    fn flush(&self);
}

/// Simple in-memory collector for traces.
#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    traces: Mutex<Vec<TraceEntry>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_traces(&self) -> Vec<TraceEntry> {
        self.traces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The states recorded for one process, in order.
    pub fn states_of(&self, process_id: Uuid) -> Vec<ProcessState> {
        self.get_traces()
            .into_iter()
            .filter(|t| t.process_id == process_id)
            .map(|t| t.state)
            .collect()
    }
}

impl Telemetry for MemoryTelemetry {
    fn record(&self, entry: TraceEntry) {
        self.traces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    fn flush(&self) {
        // No-op for memory collector
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_telemetry_filters_by_process() {
        let telemetry = MemoryTelemetry::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        telemetry.record(TraceEntry::new(a, "f", ProcessState::Created));
        telemetry.record(TraceEntry::new(b, "f", ProcessState::Created));
        telemetry.record(
            TraceEntry::new(a, "f", ProcessState::Failed).with_metadata("error", "boom"),
        );
        telemetry.flush();

        assert_eq!(
            telemetry.states_of(a),
            vec![ProcessState::Created, ProcessState::Failed]
        );
        assert_eq!(telemetry.get_traces().len(), 3);
        assert_eq!(telemetry.get_traces()[2].metadata["error"], "boom");
    }
}
