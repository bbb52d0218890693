//! `serde_json::Value` as a set element, and building a set from a dynamic
//! initial value.
//!
//! Objects compare and hash without regard to key order, numbers compare by
//! numeric value (`1` and `1.0` are the same number), and a deep copy is a
//! plain `clone` since a `Value` owns all of its substructure.

use crate::deep_set::{DeepSet, Member, Options};
use crate::error::DeepSetError;
use crate::structural::{hash_unordered, DeepClone, DeepEq, DeepHash};
use core::hash::{BuildHasher, Hasher};
use serde_json::{Number, Value};

// Numeric identity of a JSON number. A float holding a whole value inside
// the integer range is the same number as that integer, so `1` and `1.0`
// compare and hash alike.
#[derive(Clone, Copy)]
enum NumberKey {
    Int(i128),
    Float(f64),
}

const I64_MIN_F: f64 = -9_223_372_036_854_775_808.0;
const U64_END_F: f64 = 18_446_744_073_709_551_616.0;

fn number_key(n: &Number) -> NumberKey {
    if let Some(u) = n.as_u64() {
        return NumberKey::Int(u as i128);
    }
    if let Some(i) = n.as_i64() {
        return NumberKey::Int(i as i128);
    }
    let f = n.as_f64().unwrap_or(f64::NAN);
    if f.fract() == 0.0 && (I64_MIN_F..U64_END_F).contains(&f) {
        NumberKey::Int(f as i128)
    } else {
        NumberKey::Float(f)
    }
}

fn hash_number<H: Hasher>(n: &Number, state: &mut H) {
    match number_key(n) {
        NumberKey::Int(i) => {
            state.write_u8(0);
            state.write_i128(i);
        }
        NumberKey::Float(f) => {
            state.write_u8(1);
            f.deep_hash(state);
        }
    }
}

fn number_eq(a: &Number, b: &Number) -> bool {
    if !a.is_f64() && !b.is_f64() {
        return a == b;
    }
    match (number_key(a), number_key(b)) {
        (NumberKey::Int(x), NumberKey::Int(y)) => x == y,
        (NumberKey::Float(x), NumberKey::Float(y)) => x.deep_eq(&y),
        _ => false,
    }
}

impl DeepHash for Value {
    fn deep_hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => state.write_u8(0),
            Value::Bool(b) => {
                state.write_u8(1);
                b.deep_hash(state);
            }
            Value::Number(n) => {
                state.write_u8(2);
                hash_number(n, state);
            }
            Value::String(s) => {
                state.write_u8(3);
                s.deep_hash(state);
            }
            Value::Array(items) => {
                state.write_u8(4);
                items.deep_hash(state);
            }
            Value::Object(map) => {
                state.write_u8(5);
                hash_unordered(
                    map.len(),
                    map.iter(),
                    |(k, v), h| {
                        k.deep_hash(h);
                        v.deep_hash(h);
                    },
                    state,
                );
            }
        }
    }
}

impl DeepEq for Value {
    fn deep_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => number_eq(a, b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.deep_eq(b),
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .all(|(k, v)| b.get(k).is_some_and(|ov| v.deep_eq(ov)))
            }
            _ => false,
        }
    }
}

impl DeepClone for Value {
    fn deep_clone(&self) -> Self {
        self.clone()
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Elements produced by an iterable JSON value: array items, or one string
/// per character of a string. `null` produces nothing.
fn iterable_items(initial: Value) -> Result<Vec<Value>, DeepSetError> {
    match initial {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
        other => {
            let found = kind(&other);
            tracing::debug!(found, "rejecting non-iterable initial value");
            Err(DeepSetError::InvalidArgument { found })
        }
    }
}

impl DeepSet<Value> {
    /// Build a set from a dynamic initial value.
    ///
    /// ```
    /// use deep_set::{DeepSet, Options};
    /// use serde_json::json;
    ///
    /// let set = DeepSet::from_json(json!([{"a": "a"}, {"b": "b"}, {"a": "a"}]), Options::default())?;
    /// assert_eq!(set.len(), 2);
    /// assert!(DeepSet::from_json(json!({}), Options::default()).is_err());
    /// # Ok::<(), deep_set::DeepSetError>(())
    /// ```
    pub fn from_json(initial: Value, options: Options) -> Result<Self, DeepSetError> {
        Self::from_json_with_hasher(initial, options, Default::default())
    }
}

impl<S> DeepSet<Value, S>
where
    S: BuildHasher,
{
    pub fn from_json_with_hasher(
        initial: Value,
        options: Options,
        hasher: S,
    ) -> Result<Self, DeepSetError> {
        let items = iterable_items(initial)?;
        let mut set = Self::with_options_and_hasher(options, hasher);
        set.add_all(items);
        Ok(set)
    }

    /// Contents as a JSON array, in enumeration order.
    pub fn to_json(&self) -> Value {
        Value::Array(self.iter().map(Member::into_owned).collect())
    }
}
