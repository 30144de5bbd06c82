use crate::core::error::ProcessError;
use crate::core::hasher::ContentHash;
use crate::core::store::{HASH_EXTRA, NodeStore};
use crate::core::value::{NodeValue, Outputs};
use uuid::Uuid;

/// A previously stored result that an invocation can fast-forward to.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResult {
    pub process_id: Uuid,
    pub outputs: Outputs,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(CachedResult),
    Miss,
}

/// Looks up stored results by content hash.
pub struct CacheResolver<'a> {
    store: &'a dyn NodeStore,
}

impl<'a> CacheResolver<'a> {
    pub fn new(store: &'a dyn NodeStore) -> Self {
        Self { store }
    }

    /// Resolves `hash` against the store.
    ///
    /// With `fast_forward_enabled` unset this is always a [`CacheLookup::Miss`] and
    /// the store is not touched. A backend failure is reported as
    /// [`ProcessError::LookupFailed`]; a record whose hashes disagree with `hash`
    /// is reported as [`ProcessError::HashMismatch`].
    pub fn resolve(
        &self,
        hash: &ContentHash,
        fast_forward_enabled: bool,
    ) -> Result<CacheLookup, ProcessError> {
        if !fast_forward_enabled {
            return Ok(CacheLookup::Miss);
        }

        let node = self
            .store
            .find_by_extra(HASH_EXTRA, &NodeValue::from(hash))
            .map_err(ProcessError::LookupFailed)?;
        let Some(node) = node else {
            log::debug!("Cache miss for {}", hash);
            return Ok(CacheLookup::Miss);
        };

        let recomputed = node.get_hash()?;
        if recomputed != *hash || node.recorded_hash() != Some(hash.as_str()) {
            return Err(ProcessError::HashMismatch {
                process_id: node.id,
                expected: hash.to_string(),
                recorded: recomputed.to_string(),
            });
        }

        log::debug!("Cache hit for {}: process {}", hash, node.id);
        Ok(CacheLookup::Hit(CachedResult {
            process_id: node.id,
            outputs: node.outputs,
        }))
    }
}
