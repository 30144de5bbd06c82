//! # Orichalcum Workfunction
//!
//! Tracked, content-hashed execution of workfunctions, with fast-forwarding to
//! previously stored results.
//!
//! ## Features
//!
//! - **Leak Detection**: Every running process sits on a per-thread stack and in a
//!   shared monitor; both are empty again once a run returns, whatever happened
//! - **Content Hashing**: Invocations are hashed (SHA-256) over the function identity
//!   and canonicalized inputs, so keyword order and call style never matter
//! - **Fast-Forward**: With caching enabled, an invocation whose hash was already
//!   recorded returns the stored result and process id without running again
//! - **Sync & Async**: Run on the calling thread, or dispatch onto tokio and await
//!   a handle
//!
//! ## Quick Start
//!
//! ```rust
//! use orichalcum_workfunction::prelude::*;
//! use serde_json::json;
//!
//! let return_input = wrap("return_input", &["inp"], |inputs| {
//!     let mut out = Outputs::new();
//!     out.insert("result".into(), inputs.get("inp").cloned().unwrap_or_default());
//!     Ok(out)
//! });
//!
//! let runtime = Runtime::in_memory();
//! let (first, pid) = runtime
//!     .run_returning_id(&return_input, CallArgs::new().kwarg("inp", 2), RunOptions::default())
//!     .unwrap();
//! let (second, cached_pid) = runtime
//!     .run_returning_id(
//!         &return_input,
//!         CallArgs::new().kwarg("inp", 2),
//!         RunOptions::new().fast_forward(true),
//!     )
//!     .unwrap();
//!
//! assert_eq!(first["result"], json!(2));
//! assert_eq!(first, second);
//! assert_eq!(pid, cached_pid);
//! ```
//!
//! ## Module Organization
//!
//! - [`sync`]: Blocking dispatcher ([`Runtime`], [`RunOptions`])
//! - [`async_impl`]: Asynchronous dispatch ([`ProcessHandle`])
//! - [`prelude`]: Commonly used types (import with `use orichalcum_workfunction::prelude::*`)

// ============================================================================
// Core Module
// ============================================================================

mod core;

// ============================================================================
// Public Re-exports - Granular Imports
// ============================================================================

// Values and errors
pub use crate::core::error::{BoxError, ConfigError, ProcessError, StoreError};
pub use crate::core::value::{CallArgs, InputValue, Inputs, NodeValue, Outputs};

// Workfunctions
pub use crate::core::workfunction::{FnLogic, FunctionId, ProcessLogic, WorkFunction, wrap};

// Bookkeeping
pub use crate::core::hasher::{ContentHash, hash_invocation};
pub use crate::core::monitor::{Liveness, MonitorSlot, ProcessMonitor};
pub use crate::core::stack::{ProcessStack, StackEntry, StackScope};

// Persistence and caching
pub use crate::core::cache::{CacheLookup, CacheResolver, CachedResult};
pub use crate::core::config::CachingConfig;
pub use crate::core::store::{HASH_EXTRA, MemoryNodeStore, NodeStore, ProcessNode};

// Telemetry
pub use crate::core::telemetry::{MemoryTelemetry, ProcessState, Telemetry, TraceEntry};

// Dispatch
pub use crate::core::async_impl::handle::ProcessHandle;
pub use crate::core::sync_impl::dispatcher::{RunOptions, Runtime};

/// Blocking dispatch.
pub mod sync {
    pub use crate::core::sync_impl::dispatcher::{RunOptions, Runtime};
}

/// Asynchronous dispatch.
pub mod async_impl {
    pub use crate::core::async_impl::handle::ProcessHandle;
}

// ============================================================================
// Prelude Modules - Convenient Bulk Imports
// ============================================================================

/// The main prelude: imports everything needed to define and run workfunctions.
///
/// # Example
/// ```rust
/// use orichalcum_workfunction::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        CachingConfig,
        CallArgs,
        Inputs,
        NodeValue,
        Outputs,
        ProcessError,
        ProcessHandle,
        ProcessLogic,
        RunOptions,
        Runtime,
        WorkFunction,
        wrap,
    };
}

// ============================================================================
// Re-export commonly used external types for convenience
// ============================================================================

pub use serde_json::Value as JsonValue;
pub use uuid::Uuid as ProcessId;

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
