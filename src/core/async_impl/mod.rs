//! Non-blocking dispatch of workfunctions.
//!
//! [`Runtime::dispatch_async`](crate::Runtime::dispatch_async) hands the invocation to
//! tokio's blocking pool and returns a [`ProcessHandle`](handle::ProcessHandle) that can
//! be awaited, polled, cancelled before it starts, or waited on synchronously.

pub mod handle;
