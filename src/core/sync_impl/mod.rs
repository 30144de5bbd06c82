//! Blocking execution of workfunctions.
//!
//! - [`Runtime`](dispatcher::Runtime) owns the shared node store, process monitor,
//!   caching policy and telemetry sink
//! - [`RunOptions`](dispatcher::RunOptions) carries per-call settings such as
//!   fast-forwarding
//!
//! A blocking run executes the body on the calling thread, using that thread's
//! [`ProcessStack`](crate::core::stack::ProcessStack).

pub mod dispatcher;
