//! Persistence of completed processes.
//!
//! The runtime only relies on the small [`NodeStore`] contract; [`MemoryNodeStore`]
//! is the in-process implementation used by default and in tests.

use crate::core::error::{ProcessError, StoreError};
use crate::core::hasher::{ContentHash, hash_invocation};
use crate::core::value::{Inputs, NodeValue, Outputs};
use crate::core::workfunction::FunctionId;
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

/// Extra under which the content hash of a process is recorded.
pub const HASH_EXTRA: &str = "hash";

/// The persisted record of a completed invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessNode {
    pub id: Uuid,
    pub function: FunctionId,
    pub inputs: Inputs,
    pub outputs: Outputs,
    extras: BTreeMap<String, NodeValue>,
}

impl ProcessNode {
    pub fn new(id: Uuid, function: FunctionId, inputs: Inputs, outputs: Outputs) -> Self {
        Self {
            id,
            function,
            inputs,
            outputs,
            extras: BTreeMap::new(),
        }
    }

    /// Recomputes the content hash from the recorded function and inputs.
    pub fn get_hash(&self) -> Result<ContentHash, ProcessError> {
        hash_invocation(&self.function, &self.inputs)
    }

    pub fn get_extra(&self, key: &str) -> Option<&NodeValue> {
        self.extras.get(key)
    }

    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<NodeValue>) {
        self.extras.insert(key.into(), value.into());
    }

    pub fn extras(&self) -> &BTreeMap<String, NodeValue> {
        &self.extras
    }

    /// The hash recorded in the `hash` extra, if any.
    pub fn recorded_hash(&self) -> Option<&str> {
        self.get_extra(HASH_EXTRA).and_then(NodeValue::as_str)
    }

    /// True when the recorded hash matches the recomputed one.
    pub fn is_hash_consistent(&self) -> bool {
        match (self.get_hash(), self.recorded_hash()) {
            (Ok(hash), Some(recorded)) => hash.as_str() == recorded,
            _ => false,
        }
    }
}

/// Storage for [`ProcessNode`]s.
pub trait NodeStore: Send + Sync {
    /// Stores a record and returns its id. Records are immutable once stored.
    fn store(&self, node: ProcessNode) -> Result<Uuid, StoreError>;

    fn load(&self, id: Uuid) -> Result<ProcessNode, StoreError>;

    /// The most recently stored record whose extra `key` equals `value`.
    fn find_by_extra(&self, key: &str, value: &NodeValue)
    -> Result<Option<ProcessNode>, StoreError>;
}

#[derive(Debug, Default)]
struct StoreInner {
    nodes: HashMap<Uuid, ProcessNode>,
    order: Vec<Uuid>,
}

/// Thread-safe in-memory [`NodeStore`].
///
/// Writes are serialized behind a single lock, so the first record stored for a
/// given hash is never replaced by a later one.
#[derive(Debug, Default)]
pub struct MemoryNodeStore {
    inner: RwLock<StoreInner>,
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All records carrying extra `key == value`, oldest first.
    pub fn all_by_extra(&self, key: &str, value: &NodeValue) -> Vec<ProcessNode> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .order
            .iter()
            .filter_map(|id| inner.nodes.get(id))
            .filter(|node| node.get_extra(key) == Some(value))
            .cloned()
            .collect()
    }
}

impl NodeStore for MemoryNodeStore {
    fn store(&self, node: ProcessNode) -> Result<Uuid, StoreError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let id = node.id;
        if inner.nodes.contains_key(&id) {
            return Err(StoreError::Duplicate(id));
        }
        inner.nodes.insert(id, node);
        inner.order.push(id);
        log::debug!("Stored process node {}", id);
        Ok(id)
    }

    fn load(&self, id: Uuid) -> Result<ProcessNode, StoreError> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .nodes
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn find_by_extra(
        &self,
        key: &str,
        value: &NodeValue,
    ) -> Result<Option<ProcessNode>, StoreError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.nodes.get(id))
            .find(|node| node.get_extra(key) == Some(value))
            .cloned())
    }
}
