//! Strategy parameter keys and typed parameter values.
//!
//! Every strategy declares a closed key enum implementing [`ParameterKey`];
//! the value kind of each key is fixed by the enum, so lookups are checked
//! against it instead of inspecting values at runtime.

use std::collections::BTreeMap;
use std::fmt;

use crate::domain::error::QuantframeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int,
    Float,
    Text,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Int => write!(f, "int"),
            ValueKind::Float => write!(f, "float"),
            ValueKind::Text => write!(f, "text"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParameterValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            ParameterValue::Int(_) => ValueKind::Int,
            ParameterValue::Float(_) => ValueKind::Float,
            ParameterValue::Text(_) => ValueKind::Text,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Int(v) => write!(f, "{}", v),
            ParameterValue::Float(v) => write!(f, "{}", v),
            ParameterValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Int(v)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Float(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::Text(v.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        ParameterValue::Text(v)
    }
}

/// Closed set of parameter keys belonging to one strategy.
pub trait ParameterKey: Copy + Ord + fmt::Debug + 'static {
    /// Stable name, used in config files and result listings.
    fn name(&self) -> &'static str;

    fn kind(&self) -> ValueKind;

    fn all() -> &'static [Self];

    /// Case-insensitive lookup by [`ParameterKey::name`].
    fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::all()
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }
}

pub(crate) fn mistyped<K: ParameterKey>(key: K, reason: impl Into<String>) -> QuantframeError {
    QuantframeError::MissingOrMistypedParameter {
        key: key.name().to_string(),
        reason: reason.into(),
    }
}

pub(crate) fn check_kind<K: ParameterKey>(
    key: K,
    value: &ParameterValue,
) -> Result<(), QuantframeError> {
    if value.kind() != key.kind() {
        return Err(mistyped(
            key,
            format!("expected {} value, got {} '{}'", key.kind(), value.kind(), value),
        ));
    }
    Ok(())
}

/// One assignment of values to keys.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterValues<K: ParameterKey> {
    values: BTreeMap<K, ParameterValue>,
}

impl<K: ParameterKey> Default for ParameterValues<K> {
    fn default() -> Self {
        ParameterValues {
            values: BTreeMap::new(),
        }
    }
}

impl<K: ParameterKey> ParameterValues<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(
        &mut self,
        key: K,
        value: impl Into<ParameterValue>,
    ) -> Result<(), QuantframeError> {
        let value = value.into();
        check_kind(key, &value)?;
        self.values.insert(key, value);
        Ok(())
    }

    /// Chaining form of [`ParameterValues::set`].
    pub fn with(mut self, key: K, value: impl Into<ParameterValue>) -> Result<Self, QuantframeError> {
        self.set(key, value)?;
        Ok(self)
    }

    /// Insert a value already checked against the key's kind.
    pub(crate) fn insert_checked(&mut self, key: K, value: ParameterValue) {
        debug_assert_eq!(key.kind(), value.kind());
        self.values.insert(key, value);
    }

    pub fn get(&self, key: K) -> Option<&ParameterValue> {
        self.values.get(&key)
    }

    fn require(&self, key: K) -> Result<&ParameterValue, QuantframeError> {
        self.values
            .get(&key)
            .ok_or_else(|| mistyped(key, "not set"))
    }

    pub fn get_int(&self, key: K) -> Result<i64, QuantframeError> {
        match self.require(key)? {
            ParameterValue::Int(v) => Ok(*v),
            other => Err(mistyped(key, format!("expected int, got {}", other.kind()))),
        }
    }

    pub fn get_float(&self, key: K) -> Result<f64, QuantframeError> {
        match self.require(key)? {
            ParameterValue::Float(v) => Ok(*v),
            other => Err(mistyped(key, format!("expected float, got {}", other.kind()))),
        }
    }

    pub fn get_str(&self, key: K) -> Result<&str, QuantframeError> {
        match self.require(key)? {
            ParameterValue::Text(v) => Ok(v.as_str()),
            other => Err(mistyped(key, format!("expected text, got {}", other.kind()))),
        }
    }

    /// Every declared key present with a value of its kind.
    pub fn validate(&self) -> Result<(), QuantframeError> {
        for key in K::all() {
            check_kind(*key, self.require(*key)?)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &ParameterValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }
}

impl<K: ParameterKey> fmt::Display for ParameterValues<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", key.name(), value)?;
        }
        Ok(())
    }
}
