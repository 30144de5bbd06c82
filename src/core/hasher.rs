//! Content hashing of invocations.
//!
//! The hash covers the function identity and every bound input. Each value is
//! written as a type tag followed by a length-prefixed payload, so two different
//! structures can never produce the same byte stream. The digest is SHA-256.

use crate::core::error::ProcessError;
use crate::core::value::{InputValue, Inputs, NodeValue};
use crate::core::workfunction::FunctionId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex-encoded SHA-256 digest of an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&ContentHash> for NodeValue {
    fn from(hash: &ContentHash) -> Self {
        NodeValue::String(hash.0.clone())
    }
}

/// Computes the content hash of `function` applied to `inputs`.
///
/// Fails with [`ProcessError::UnhashableInput`] on the first input that has no
/// stable representation.
pub fn hash_invocation(function: &FunctionId, inputs: &Inputs) -> Result<ContentHash, ProcessError> {
    let mut hasher = Sha256::new();
    write_str(&mut hasher, b'F', &function.name);
    match &function.version {
        Some(version) => write_str(&mut hasher, b'V', version),
        None => hasher.update([b'-']),
    }

    write_len(&mut hasher, b'I', inputs.len());
    for (name, input) in inputs.iter() {
        write_str(&mut hasher, b'k', name);
        match input {
            InputValue::Data(value) => write_value(&mut hasher, value),
            InputValue::Unhashable { reason } => {
                return Err(ProcessError::UnhashableInput {
                    name: name.clone(),
                    reason: reason.clone(),
                });
            }
        }
    }

    Ok(ContentHash(format!("{:x}", hasher.finalize())))
}

fn write_len(hasher: &mut Sha256, tag: u8, len: usize) {
    hasher.update([tag]);
    hasher.update((len as u64).to_le_bytes());
}

fn write_str(hasher: &mut Sha256, tag: u8, s: &str) {
    write_len(hasher, tag, s.len());
    hasher.update(s.as_bytes());
}

fn write_value(hasher: &mut Sha256, value: &NodeValue) {
    match value {
        NodeValue::Null => hasher.update([b'n']),
        NodeValue::Bool(b) => hasher.update([b'b', u8::from(*b)]),
        NodeValue::Number(n) => {
            if let Some(u) = n.as_u64() {
                hasher.update([b'u']);
                hasher.update(u.to_le_bytes());
            } else if let Some(i) = n.as_i64() {
                hasher.update([b'i']);
                hasher.update(i.to_le_bytes());
            } else {
                // JSON numbers are finite; NaN and infinities never get this far.
                let f = n.as_f64().unwrap_or_default();
                let f = if f == 0.0 { 0.0 } else { f };
                hasher.update([b'f']);
                hasher.update(f.to_bits().to_le_bytes());
            }
        }
        NodeValue::String(s) => write_str(hasher, b's', s),
        NodeValue::Array(items) => {
            write_len(hasher, b'a', items.len());
            for item in items {
                write_value(hasher, item);
            }
        }
        NodeValue::Object(map) => {
            write_len(hasher, b'o', map.len());
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            for (key, item) in entries {
                write_str(hasher, b'k', key);
                write_value(hasher, item);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inputs(pairs: Vec<(&str, NodeValue)>) -> Inputs {
        pairs.into_iter().collect()
    }

    fn hash(name: &str, pairs: Vec<(&str, NodeValue)>) -> ContentHash {
        hash_invocation(&FunctionId::new(name), &inputs(pairs)).unwrap()
    }

    #[test]
    fn test_hash_is_deterministic() {
        let a = hash("return_input", vec![("inp", json!(2))]);
        let b = hash("return_input", vec![("inp", json!(2))]);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_hash_differs_on_value() {
        assert_ne!(
            hash("return_input", vec![("inp", json!(2))]),
            hash("return_input", vec![("inp", json!(3))])
        );
    }

    #[test]
    fn test_hash_differs_on_function_identity() {
        let pairs = || vec![("inp", json!(2))];
        assert_ne!(hash("f", pairs()), hash("g", pairs()));

        let versioned = hash_invocation(
            &FunctionId::new("f").with_version("1"),
            &inputs(pairs()),
        )
        .unwrap();
        assert_ne!(hash("f", pairs()), versioned);
    }

    #[test]
    fn test_hash_ignores_insertion_and_key_order() {
        assert_eq!(
            hash("f", vec![("a", json!(1)), ("b", json!({"x": 1, "y": [1, 2]}))]),
            hash("f", vec![("b", json!({"y": [1, 2], "x": 1})), ("a", json!(1))])
        );
    }

    #[test]
    fn test_hash_distinguishes_types_and_structure() {
        let variants = vec![
            json!(1),
            json!(-1),
            json!(1.0),
            json!("1"),
            json!(true),
            json!(null),
            json!([1]),
            json!([[1]]),
            json!({"1": 1}),
            json!(["a", "b"]),
            json!(["ab"]),
        ];
        let hashes: Vec<ContentHash> = variants
            .into_iter()
            .map(|v| hash("f", vec![("x", v)]))
            .collect();
        for (i, a) in hashes.iter().enumerate() {
            for b in &hashes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_input_name_is_part_of_hash() {
        assert_ne!(
            hash("f", vec![("a", json!(1))]),
            hash("f", vec![("b", json!(1))])
        );
    }

    #[test]
    fn test_negative_zero_hashes_like_zero() {
        assert_eq!(
            hash("f", vec![("x", json!(-0.0))]),
            hash("f", vec![("x", json!(0.0))])
        );
    }

    #[test]
    fn test_unhashable_input_fails() {
        let mut inputs = Inputs::new();
        inputs.insert("ok", InputValue::Data(json!(1)));
        inputs.insert("handle", InputValue::unhashable("file handle"));

        let err = hash_invocation(&FunctionId::new("f"), &inputs).unwrap_err();
        match err {
            ProcessError::UnhashableInput { name, reason } => {
                assert_eq!(name, "handle");
                assert_eq!(reason, "file handle");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
