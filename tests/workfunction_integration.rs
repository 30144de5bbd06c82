//! End-to-end behaviour of tracked workfunctions: blocking and async dispatch,
//! content hashes, and fast-forwarding to cached results.
//!
//! Every test checks that no process is left on the stack or in the monitor
//! before it starts and after it finishes.

use orichalcum_workfunction::prelude::*;
use orichalcum_workfunction::{BoxError, MemoryNodeStore, NodeStore, ProcessNode, ProcessStack, StoreError};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

struct TestEnv {
    runtime: Runtime,
}

impl TestEnv {
    fn new() -> Self {
        Self::with_runtime(Runtime::in_memory())
    }

    fn with_runtime(runtime: Runtime) -> Self {
        let env = TestEnv { runtime };
        env.assert_idle();
        env
    }

    fn assert_idle(&self) {
        assert_eq!(ProcessStack::with_current(|s| s.depth()), 0);
        assert_eq!(self.runtime.monitor().get_ids().len(), 0);
    }

    fn finish(self) {
        self.assert_idle();
    }

    fn check_hash_consistent(&self, pid: Uuid) {
        let node = self.runtime.load_node(pid).unwrap();
        assert_eq!(
            Some(node.get_hash().unwrap().as_str()),
            node.get_extra("hash").and_then(|v| v.as_str())
        );
    }
}

#[derive(Clone)]
struct SimpleLogic;

impl ProcessLogic for SimpleLogic {
    fn exec(&self, _inputs: &Inputs) -> Result<Outputs, BoxError> {
        Ok(Outputs::from([("result".to_string(), json!(true))]))
    }

    fn clone_box(&self) -> Box<dyn ProcessLogic> {
        Box::new(self.clone())
    }
}

fn simple_wf() -> WorkFunction {
    WorkFunction::new("simple_wf", SimpleLogic)
}

fn return_input(name: &str) -> WorkFunction {
    wrap(name, &["inp"], |inputs| {
        let inp = inputs.get("inp").cloned().ok_or("missing inp")?;
        Ok(Outputs::from([("result".to_string(), inp)]))
    })
}

#[test]
fn test_blocking() {
    let env = TestEnv::new();

    let out = simple_wf().call(&env.runtime, CallArgs::new()).unwrap();
    assert_eq!(out["result"], json!(true));

    let out = return_input("return_input")
        .call(&env.runtime, CallArgs::new().arg(true))
        .unwrap();
    assert_eq!(out["result"], json!(true));

    env.finish();
}

#[test]
fn test_run() {
    let env = TestEnv::new();
    let runtime = &env.runtime;

    let out = runtime
        .run(&simple_wf(), CallArgs::new(), RunOptions::default())
        .unwrap();
    assert_eq!(out["result"], json!(true));

    let out = runtime
        .run(&return_input("return_input"), CallArgs::new().arg(true), RunOptions::default())
        .unwrap();
    assert_eq!(out["result"], json!(true));

    env.finish();
}

#[tokio::test]
async fn test_async() {
    let env = TestEnv::new();
    let runtime = &env.runtime;

    let out = runtime
        .dispatch_async(&simple_wf(), CallArgs::new(), RunOptions::default())
        .unwrap()
        .await
        .unwrap();
    assert_eq!(out["result"], json!(true));

    let out = runtime
        .dispatch_async(&return_input("return_input"), CallArgs::new().arg(true), RunOptions::default())
        .unwrap()
        .await
        .unwrap();
    assert_eq!(out["result"], json!(true));

    env.finish();
}

#[test]
fn test_hashes() {
    let env = TestEnv::new();
    let f = return_input("return_input");

    let (_, pid1) = env
        .runtime
        .run_returning_id(&f, CallArgs::new().kwarg("inp", 2), RunOptions::default())
        .unwrap();
    let (_, pid2) = env
        .runtime
        .run_returning_id(&f, CallArgs::new().kwarg("inp", 2), RunOptions::default())
        .unwrap();

    let w1 = env.runtime.load_node(pid1).unwrap();
    let w2 = env.runtime.load_node(pid2).unwrap();
    assert_eq!(w1.get_hash().unwrap(), w2.get_hash().unwrap());
    env.finish();
}

#[test]
fn test_hashes_different() {
    let env = TestEnv::new();
    let f = return_input("return_input");

    let (_, pid1) = env
        .runtime
        .run_returning_id(&f, CallArgs::new().kwarg("inp", 2), RunOptions::default())
        .unwrap();
    let (_, pid2) = env
        .runtime
        .run_returning_id(&f, CallArgs::new().kwarg("inp", 3), RunOptions::default())
        .unwrap();

    let w1 = env.runtime.load_node(pid1).unwrap();
    let w2 = env.runtime.load_node(pid2).unwrap();
    assert_ne!(w1.get_hash().unwrap(), w2.get_hash().unwrap());
    env.finish();
}

#[test]
fn test_caching() {
    let env = TestEnv::new();
    let simple_cached_wf = return_input("simple_cached_wf");

    let (r, pid) = env
        .runtime
        .run_returning_id(&simple_cached_wf, CallArgs::new().kwarg("inp", 2), RunOptions::default())
        .unwrap();
    let (r2, pid2) = env
        .runtime
        .run_returning_id(
            &simple_cached_wf,
            CallArgs::new().kwarg("inp", 2),
            RunOptions::new().fast_forward(true),
        )
        .unwrap();

    assert_eq!(r, r2);
    assert_eq!(r["result"], json!(2));
    assert_eq!(pid, pid2);
    env.check_hash_consistent(pid);
    env.check_hash_consistent(pid2);
    env.finish();
}

#[test]
fn test_caching_different() {
    let env = TestEnv::new();
    let simple_cached_wf = return_input("simple_cached_wf");

    let (r, pid) = env
        .runtime
        .run_returning_id(&simple_cached_wf, CallArgs::new().kwarg("inp", 2), RunOptions::default())
        .unwrap();
    let (r2, pid2) = env
        .runtime
        .run_returning_id(
            &simple_cached_wf,
            CallArgs::new().kwarg("inp", 3),
            RunOptions::new().fast_forward(true),
        )
        .unwrap();

    assert_ne!(r, r2);
    assert_eq!(r2["result"], json!(3));
    assert_ne!(pid, pid2);
    env.check_hash_consistent(pid);
    env.check_hash_consistent(pid2);
    env.finish();
}

#[test]
fn test_caching_is_scoped_to_function_identity() {
    let env = TestEnv::new();

    let (_, pid) = env
        .runtime
        .run_returning_id(&return_input("first_wf"), CallArgs::new().arg(2), RunOptions::default())
        .unwrap();
    let (_, pid2) = env
        .runtime
        .run_returning_id(
            &return_input("second_wf"),
            CallArgs::new().arg(2),
            RunOptions::new().fast_forward(true),
        )
        .unwrap();

    assert_ne!(pid, pid2);
    env.finish();
}

/// A store whose lookups always fail, as if the backend were unreachable.
struct UnreachableLookups(MemoryNodeStore);

impl NodeStore for UnreachableLookups {
    fn store(&self, node: ProcessNode) -> Result<Uuid, StoreError> {
        self.0.store(node)
    }

    fn load(&self, id: Uuid) -> Result<ProcessNode, StoreError> {
        self.0.load(id)
    }

    fn find_by_extra(&self, _key: &str, _value: &NodeValue) -> Result<Option<ProcessNode>, StoreError> {
        Err(StoreError::Backend("I/O error".to_string()))
    }
}

#[test]
fn test_lookup_failure_still_runs() {
    let env = TestEnv::with_runtime(Runtime::new(Arc::new(UnreachableLookups(
        MemoryNodeStore::new(),
    ))));
    let f = return_input("return_input");

    let (_, pid) = env
        .runtime
        .run_returning_id(&f, CallArgs::new().arg(2), RunOptions::default())
        .unwrap();
    let (out, pid2) = env
        .runtime
        .run_returning_id(&f, CallArgs::new().arg(2), RunOptions::new().fast_forward(true))
        .unwrap();

    assert_eq!(out["result"], json!(2));
    assert_ne!(pid, pid2);
    env.check_hash_consistent(pid2);
    env.finish();
}

#[test]
fn test_failure_leaves_no_process_behind() {
    let env = TestEnv::new();
    let f = return_input("return_input");

    // missing argument: rejected before anything is registered
    let err = env
        .runtime
        .run(&f, CallArgs::new(), RunOptions::default())
        .unwrap_err();
    assert!(matches!(err, ProcessError::InvalidArguments { .. }));

    let failing = wrap("failing", &["inp"], |_| Err("exploded".into()));
    let err = env
        .runtime
        .run_returning_id(&failing, CallArgs::new().arg(1), RunOptions::default())
        .unwrap_err();
    assert!(err.is_execution_failure());
    assert!(err.process_id().is_some());

    env.finish();
}
