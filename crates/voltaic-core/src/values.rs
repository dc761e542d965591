//! Named scalar parameters attached to an element.

use indexmap::IndexMap;

/// Insertion-ordered map of parameter name → value.
///
/// Ordering matters for netlist export, which emits values positionally in
/// schema order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMap {
    inner: IndexMap<String, f64>,
}

impl ValueMap {
    /// An empty value map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a value by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.inner.get(name).copied()
    }

    /// Look up a value, falling back to a default.
    pub fn get_or(&self, name: &str, default: f64) -> f64 {
        self.get(name).unwrap_or(default)
    }

    /// Set a value, inserting or overwriting.
    pub fn set(&mut self, name: &str, value: f64) {
        if let Some(slot) = self.inner.get_mut(name) {
            *slot = value;
        } else {
            self.inner.insert(name.to_string(), value);
        }
    }

    /// Whether a value with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Iterate values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
