use thiserror::Error;
use uuid::Uuid;

/// Boxed error returned by a workfunction body.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Input '{name}' cannot be hashed: {reason}")]
    UnhashableInput { name: String, reason: String },

    #[error("Invalid arguments for {function}: {reason}")]
    InvalidArguments { function: String, reason: String },

    #[error("Process stack corrupted: expected {expected:?} on top, got {found}")]
    StackCorruption { expected: Option<Uuid>, found: Uuid },

    #[error("Cache lookup failed: {0}")]
    LookupFailed(#[source] StoreError),

    #[error("Cached record {process_id} has hash {recorded}, expected {expected}")]
    HashMismatch {
        process_id: Uuid,
        expected: String,
        recorded: String,
    },

    #[error("Execution failed: {0}")]
    ExecutionFailure(#[source] BoxError),

    #[error("Node store error: {0}")]
    Store(#[from] StoreError),

    #[error("Process was cancelled before it started")]
    Cancelled,

    #[error("Asynchronous dispatch requires a running tokio runtime")]
    NoAsyncRuntime,

    #[error("Process {process_id}: {source}")]
    InProcess {
        process_id: Uuid,
        #[source]
        source: Box<ProcessError>,
    },
}

impl ProcessError {
    /// Strips any process-id context, returning the original failure.
    pub fn root(&self) -> &ProcessError {
        match self {
            ProcessError::InProcess { source, .. } => source.root(),
            other => other,
        }
    }

    /// Owned counterpart of [`root`](ProcessError::root).
    pub fn into_root(self) -> ProcessError {
        match self {
            ProcessError::InProcess { source, .. } => source.into_root(),
            other => other,
        }
    }

    /// The process id attached to this error, if any.
    pub fn process_id(&self) -> Option<Uuid> {
        match self {
            ProcessError::InProcess { process_id, .. } => Some(*process_id),
            _ => None,
        }
    }

    pub fn is_execution_failure(&self) -> bool {
        matches!(self.root(), ProcessError::ExecutionFailure(_))
    }

    pub(crate) fn in_process(self, process_id: Uuid) -> Self {
        match self {
            ProcessError::InProcess { .. } => self,
            other => ProcessError::InProcess {
                process_id,
                source: Box::new(other),
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No node with id {0}")]
    NotFound(Uuid),

    #[error("Node {0} already stored")]
    Duplicate(Uuid),

    #[error("Backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read caching configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid caching configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
