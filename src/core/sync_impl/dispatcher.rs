use crate::core::cache::{CacheLookup, CacheResolver};
use crate::core::config::CachingConfig;
use crate::core::error::ProcessError;
use crate::core::hasher::{ContentHash, hash_invocation};
use crate::core::monitor::ProcessMonitor;
use crate::core::stack::ProcessStack;
use crate::core::store::{HASH_EXTRA, MemoryNodeStore, NodeStore, ProcessNode};
use crate::core::telemetry::{ProcessState, Telemetry, TraceEntry};
use crate::core::value::{CallArgs, Inputs, Outputs};
use crate::core::workfunction::WorkFunction;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use uuid::Uuid;

/// Per-call options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Allow satisfying the call from a stored result. `None` defers to the
    /// runtime's [`CachingConfig`].
    pub fast_forward: Option<bool>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fast_forward(mut self, enabled: bool) -> Self {
        self.fast_forward = Some(enabled);
        self
    }
}

/// Executes workfunctions with stack, monitor and cache bookkeeping.
///
/// The store, monitor and telemetry are shared between clones; every thread that
/// runs an invocation uses its own [`ProcessStack`].
#[derive(Clone)]
pub struct Runtime {
    store: Arc<dyn NodeStore>,
    monitor: Arc<ProcessMonitor>,
    caching: CachingConfig,
    telemetry: Option<Arc<dyn Telemetry>>,
}

impl Runtime {
    /// Creates a runtime backed by `store`, with a fresh monitor and caching
    /// disabled by default.
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self {
            store,
            monitor: Arc::new(ProcessMonitor::new()),
            caching: CachingConfig::default(),
            telemetry: None,
        }
    }

    /// Creates a runtime backed by a fresh [`MemoryNodeStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryNodeStore::new()))
    }

    pub fn with_monitor(mut self, monitor: Arc<ProcessMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn with_caching(mut self, caching: CachingConfig) -> Self {
        self.caching = caching;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn store(&self) -> &dyn NodeStore {
        self.store.as_ref()
    }

    pub fn monitor(&self) -> &ProcessMonitor {
        &self.monitor
    }

    pub fn caching(&self) -> &CachingConfig {
        &self.caching
    }

    /// Loads the record of a completed process.
    pub fn load_node(&self, process_id: Uuid) -> Result<ProcessNode, ProcessError> {
        Ok(self.store.load(process_id)?)
    }

    /// Runs `function` on the calling thread and returns its outputs.
    pub fn run(
        &self,
        function: &WorkFunction,
        args: CallArgs,
        options: RunOptions,
    ) -> Result<Outputs, ProcessError> {
        ProcessStack::with_current(|stack| self.run_on(stack, function, args, options))
            .map(|(outputs, _)| outputs)
            .map_err(ProcessError::into_root)
    }

    /// Like [`run`](Runtime::run), also returning the id of the process that
    /// produced the outputs. On a fast-forward this is the id of the cached process.
    ///
    /// Failures of a registered invocation carry its process id
    /// ([`ProcessError::InProcess`]).
    pub fn run_returning_id(
        &self,
        function: &WorkFunction,
        args: CallArgs,
        options: RunOptions,
    ) -> Result<(Outputs, Uuid), ProcessError> {
        ProcessStack::with_current(|stack| self.run_on(stack, function, args, options))
    }

    /// Runs `function` using an explicitly provided stack.
    pub fn run_on(
        &self,
        stack: &ProcessStack,
        function: &WorkFunction,
        args: CallArgs,
        options: RunOptions,
    ) -> Result<(Outputs, Uuid), ProcessError> {
        // Nothing is registered until the invocation is known to be hashable.
        let inputs = function.bind(args)?;
        let hash = hash_invocation(function.identity(), &inputs)?;
        let fast_forward = options
            .fast_forward
            .unwrap_or_else(|| self.caching.is_enabled(function.identity()));

        let process_id = Uuid::new_v4();
        self.trace(process_id, function, &hash, ProcessState::Created);

        let slot = self.monitor.acquire(process_id);
        let parent = stack.push(process_id);
        self.trace(process_id, function, &hash, ProcessState::Registered);
        log::debug!(
            "Process {} ({}) started, parent {:?}, depth {}",
            process_id,
            function.identity(),
            parent,
            stack.depth()
        );

        // Nested invocations from the body go onto the same stack.
        let outcome = {
            let _scope = stack.enter();
            panic::catch_unwind(AssertUnwindSafe(|| {
                self.execute(process_id, function, inputs, &hash, fast_forward)
            }))
            .unwrap_or_else(|payload| {
                Err(ProcessError::ExecutionFailure(
                    format!("workfunction panicked: {}", panic_message(payload.as_ref())).into(),
                ))
            })
        };
        slot.mark_finishing();

        let popped = stack.pop(process_id);
        drop(slot);

        let result = popped.and(outcome);
        match &result {
            Ok((_, source)) => {
                log::debug!("Process {} returned (result of {})", process_id, source);
                self.trace(process_id, function, &hash, ProcessState::Returned);
            }
            Err(e) => {
                log::warn!("Process {} ({}) failed: {}", process_id, function.identity(), e);
                self.record(
                    TraceEntry::new(process_id, function.identity().to_string(), ProcessState::Failed)
                        .with_hash(&hash)
                        .with_metadata("error", e.to_string()),
                );
            }
        }
        result.map_err(|e| e.in_process(process_id))
    }

    fn execute(
        &self,
        process_id: Uuid,
        function: &WorkFunction,
        inputs: Inputs,
        hash: &ContentHash,
        fast_forward: bool,
    ) -> Result<(Outputs, Uuid), ProcessError> {
        if fast_forward {
            self.trace(process_id, function, hash, ProcessState::CacheCheck);
            match CacheResolver::new(self.store()).resolve(hash, true) {
                Ok(CacheLookup::Hit(cached)) => {
                    self.trace(process_id, function, hash, ProcessState::Hit);
                    return Ok((cached.outputs, cached.process_id));
                }
                Ok(CacheLookup::Miss) => {}
                Err(ProcessError::LookupFailed(e)) => {
                    log::warn!(
                        "Cache lookup for {} failed, executing {} instead: {}",
                        hash,
                        function.identity(),
                        e
                    );
                }
                Err(e) => return Err(e),
            }
        }

        self.trace(process_id, function, hash, ProcessState::Running);
        let outputs = function
            .behaviour
            .exec(&inputs)
            .map_err(ProcessError::ExecutionFailure)?;

        let mut node = ProcessNode::new(
            process_id,
            function.identity().clone(),
            inputs,
            outputs.clone(),
        );
        node.set_extra(HASH_EXTRA, hash);
        let id = self.store.store(node)?;
        self.trace(process_id, function, hash, ProcessState::Stored);
        Ok((outputs, id))
    }

    fn trace(&self, process_id: Uuid, function: &WorkFunction, hash: &ContentHash, state: ProcessState) {
        self.record(
            TraceEntry::new(process_id, function.identity().to_string(), state).with_hash(hash),
        );
    }

    pub(crate) fn record(&self, entry: TraceEntry) {
        if let Some(telemetry) = &self.telemetry {
            telemetry.record(entry);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
