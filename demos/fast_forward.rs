//! A complete example showing tracked execution and fast-forwarding.
//!
//! This example demonstrates:
//! - Defining a workfunction with custom logic
//! - Running it through a `Runtime` and getting its process id back
//! - Fast-forwarding a repeated call to the stored result
//! - Recording every state transition with `MemoryTelemetry`
//! - Dispatching asynchronously and awaiting the handle

use orichalcum_workfunction::prelude::*;
use orichalcum_workfunction::{BoxError, MemoryTelemetry};
use serde_json::json;
use std::sync::Arc;

// ============================================================================
// The workfunction
// ============================================================================

/// Squares `x`, pretending to be expensive.
#[derive(Clone)]
struct SquareLogic;

impl ProcessLogic for SquareLogic {
    fn exec(&self, inputs: &Inputs) -> Result<Outputs, BoxError> {
        let x = inputs
            .get("x")
            .and_then(NodeValue::as_f64)
            .ok_or("x must be a number")?;
        std::thread::sleep(std::time::Duration::from_millis(200));
        Ok(Outputs::from([("square".to_string(), json!(x * x))]))
    }

    fn clone_box(&self) -> Box<dyn ProcessLogic> {
        Box::new(self.clone())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ProcessError> {
    let telemetry = Arc::new(MemoryTelemetry::new());
    let runtime = Runtime::in_memory().with_telemetry(telemetry.clone());
    let square = WorkFunction::new("square", SquareLogic).with_params(&["x"]);

    // --- Example 1: First run executes the body ---
    println!("\n--- Example 1: Fresh run ---");
    let (out, pid) = runtime.run_returning_id(&square, CallArgs::new().arg(12), RunOptions::default())?;
    println!("  {:?} from process {}", out, pid);

    // --- Example 2: Same inputs, fast-forwarded ---
    println!("\n--- Example 2: Fast-forward ---");
    let (out, cached) = runtime.run_returning_id(
        &square,
        CallArgs::new().kwarg("x", 12),
        RunOptions::new().fast_forward(true),
    )?;
    println!("  {:?} from process {} (cached: {})", out, cached, cached == pid);

    // --- Example 3: Async dispatch ---
    println!("\n--- Example 3: Async dispatch ---");
    let handle = runtime.dispatch_async(&square, CallArgs::new().arg(3), RunOptions::default())?;
    println!("  {:?}", handle.await?);

    println!("\nTrace:");
    for entry in telemetry.get_traces() {
        println!("  {} {} {:?}", entry.process_id, entry.function, entry.state);
    }

    println!("\n=== Monitor empty: {} ===", runtime.monitor().is_empty());
    Ok(())
}
