//! Values exchanged with workfunctions.
//!
//! Inputs are carried as [`NodeValue`]s (JSON values) so that they have a stable,
//! canonical representation for hashing. Anything implementing [`Serialize`] can be
//! passed as an argument. Values that fail to serialize, or that contain NaN or
//! infinite floats (which JSON would silently turn into `null`), are kept as
//! [`InputValue::Unhashable`] and rejected when the invocation is hashed.

use serde::Serialize;
use serde::ser::{self, Error as _};
use std::collections::BTreeMap;

/// The Alias for serde_json::Value, used for every input and output value
pub type NodeValue = serde_json::Value;

/// The result payload of a workfunction: output name to value, kept sorted.
pub type Outputs = BTreeMap<String, NodeValue>;

/// A single argument value as seen by the hasher.
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    /// A value with a stable JSON representation.
    Data(NodeValue),
    /// A value that could not be reduced to a stable representation.
    Unhashable { reason: String },
}

impl InputValue {
    /// Converts any serializable value, recording a failure instead of returning it.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Self {
        if let Err(e) = value.serialize(FiniteFloats) {
            return InputValue::Unhashable {
                reason: e.to_string(),
            };
        }
        match serde_json::to_value(value) {
            Ok(value) => InputValue::Data(value),
            Err(e) => InputValue::Unhashable {
                reason: e.to_string(),
            },
        }
    }

    pub fn unhashable(reason: impl Into<String>) -> Self {
        InputValue::Unhashable {
            reason: reason.into(),
        }
    }

    pub fn as_data(&self) -> Option<&NodeValue> {
        match self {
            InputValue::Data(value) => Some(value),
            InputValue::Unhashable { .. } => None,
        }
    }
}

impl From<NodeValue> for InputValue {
    fn from(value: NodeValue) -> Self {
        InputValue::Data(value)
    }
}

/// Inputs of an invocation after binding, keyed by parameter name.
///
/// The map is ordered by name, which is what makes keyword order irrelevant to
/// the content hash.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inputs {
    values: BTreeMap<String, InputValue>,
}

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning the previous one bound to `name`.
    pub fn insert(&mut self, name: impl Into<String>, value: InputValue) -> Option<InputValue> {
        self.values.insert(name.into(), value)
    }

    /// Returns the value bound to `name`, if it is hashable data.
    pub fn get(&self, name: &str) -> Option<&NodeValue> {
        self.values.get(name).and_then(InputValue::as_data)
    }

    pub fn get_input(&self, name: &str) -> Option<&InputValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &InputValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, NodeValue)> for Inputs {
    fn from_iter<I: IntoIterator<Item = (K, NodeValue)>>(iter: I) -> Self {
        let mut inputs = Inputs::new();
        for (name, value) in iter {
            inputs.insert(name, InputValue::Data(value));
        }
        inputs
    }
}

/// Arguments of a call before they are bound to parameter names.
///
/// ```rust
/// use orichalcum_workfunction::CallArgs;
///
/// let args = CallArgs::new().arg(2).kwarg("scale", 0.5);
/// assert_eq!(args.positional().len(), 1);
/// assert_eq!(args.named().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    positional: Vec<InputValue>,
    named: Vec<(String, InputValue)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    pub fn arg<T: Serialize>(mut self, value: T) -> Self {
        self.positional.push(InputValue::from_serialize(&value));
        self
    }

    /// Adds a keyword argument.
    pub fn kwarg<T: Serialize>(mut self, name: impl Into<String>, value: T) -> Self {
        self.named
            .push((name.into(), InputValue::from_serialize(&value)));
        self
    }

    pub fn arg_value(mut self, value: InputValue) -> Self {
        self.positional.push(value);
        self
    }

    pub fn kwarg_value(mut self, name: impl Into<String>, value: InputValue) -> Self {
        self.named.push((name.into(), value));
        self
    }

    pub fn positional(&self) -> &[InputValue] {
        &self.positional
    }

    pub fn named(&self) -> &[(String, InputValue)] {
        &self.named
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Vec<InputValue>, Vec<(String, InputValue)>) {
        (self.positional, self.named)
    }
}

/// Walks a value without building anything, failing on the first float that has
/// no JSON representation.
#[derive(Clone, Copy)]
struct FiniteFloats;

fn check_float(v: f64) -> Result<(), serde_json::Error> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(serde_json::Error::custom(format!(
            "float {} has no stable representation",
            v
        )))
    }
}

impl ser::Serializer for FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, _: bool) -> Result<(), serde_json::Error> {
        Ok(())
    }
    fn serialize_i8(self, _: i8) -> Result<(), serde_json::Error> {
        Ok(())
    }
    fn serialize_i16(self, _: i16) -> Result<(), serde_json::Error> {
        Ok(())
    }
    fn serialize_i32(self, _: i32) -> Result<(), serde_json::Error> {
        Ok(())
    }
    fn serialize_i64(self, _: i64) -> Result<(), serde_json::Error> {
        Ok(())
    }
    fn serialize_i128(self, _: i128) -> Result<(), serde_json::Error> {
        Ok(())
    }
    fn serialize_u8(self, _: u8) -> Result<(), serde_json::Error> {
        Ok(())
    }
    fn serialize_u16(self, _: u16) -> Result<(), serde_json::Error> {
        Ok(())
    }
    fn serialize_u32(self, _: u32) -> Result<(), serde_json::Error> {
        Ok(())
    }
    fn serialize_u64(self, _: u64) -> Result<(), serde_json::Error> {
        Ok(())
    }
    fn serialize_u128(self, _: u128) -> Result<(), serde_json::Error> {
        Ok(())
    }
    fn serialize_f32(self, v: f32) -> Result<(), serde_json::Error> {
        check_float(f64::from(v))
    }
    fn serialize_f64(self, v: f64) -> Result<(), serde_json::Error> {
        check_float(v)
    }
    fn serialize_char(self, _: char) -> Result<(), serde_json::Error> {
        Ok(())
    }
    fn serialize_str(self, _: &str) -> Result<(), serde_json::Error> {
        Ok(())
    }
    fn serialize_bytes(self, _: &[u8]) -> Result<(), serde_json::Error> {
        Ok(())
    }
    fn serialize_none(self) -> Result<(), serde_json::Error> {
        Ok(())
    }
    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), serde_json::Error> {
        value.serialize(self)
    }
    fn serialize_unit(self) -> Result<(), serde_json::Error> {
        Ok(())
    }
    fn serialize_unit_struct(self, _: &'static str) -> Result<(), serde_json::Error> {
        Ok(())
    }
    fn serialize_unit_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
    ) -> Result<(), serde_json::Error> {
        Ok(())
    }
    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        value.serialize(self)
    }
    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        value.serialize(self)
    }
    fn serialize_seq(self, _: Option<usize>) -> Result<Self, serde_json::Error> {
        Ok(self)
    }
    fn serialize_tuple(self, _: usize) -> Result<Self, serde_json::Error> {
        Ok(self)
    }
    fn serialize_tuple_struct(self, _: &'static str, _: usize) -> Result<Self, serde_json::Error> {
        Ok(self)
    }
    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self, serde_json::Error> {
        Ok(self)
    }
    fn serialize_map(self, _: Option<usize>) -> Result<Self, serde_json::Error> {
        Ok(self)
    }
    fn serialize_struct(self, _: &'static str, _: usize) -> Result<Self, serde_json::Error> {
        Ok(self)
    }
    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self, serde_json::Error> {
        Ok(self)
    }
}

impl ser::SerializeSeq for FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), serde_json::Error> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), serde_json::Error> {
        Ok(())
    }
}

impl ser::SerializeTuple for FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), serde_json::Error> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), serde_json::Error> {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), serde_json::Error> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), serde_json::Error> {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), serde_json::Error> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), serde_json::Error> {
        Ok(())
    }
}

impl ser::SerializeMap for FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), serde_json::Error> {
        key.serialize(*self)
    }
    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), serde_json::Error> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), serde_json::Error> {
        Ok(())
    }
}

impl ser::SerializeStruct for FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _: &'static str,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), serde_json::Error> {
        Ok(())
    }
}

impl ser::SerializeStructVariant for FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _: &'static str,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), serde_json::Error> {
        Ok(())
    }
}
