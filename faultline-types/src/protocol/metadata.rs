use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The entries of a single metadata tab.
pub type Tab = BTreeMap<String, Value>;

/// Named tabs of key/value diagnostic data.
///
/// ```
/// use faultline_types::protocol::Metadata;
///
/// let mut metadata = Metadata::new();
/// metadata.add("request", "route", "/users/:id");
/// metadata.add("request", "attempt", 3);
/// assert_eq!(metadata.get("request", "attempt"), Some(&3.into()));
/// ```
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, Tab>);

impl Metadata {
    /// Creates empty metadata.
    pub fn new() -> Metadata {
        Metadata::default()
    }

    /// Adds a value to a tab, creating the tab if needed.
    pub fn add<T, K, V>(&mut self, tab: T, key: K, value: V)
    where
        T: Into<String>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.0
            .entry(tab.into())
            .or_default()
            .insert(key.into(), value.into());
    }

    /// Returns a tab by name.
    pub fn tab(&self, name: &str) -> Option<&Tab> {
        self.0.get(name)
    }

    /// Returns a single value.
    pub fn get(&self, tab: &str, key: &str) -> Option<&Value> {
        self.0.get(tab)?.get(key)
    }

    /// Removes a whole tab.
    pub fn remove_tab(&mut self, name: &str) -> Option<Tab> {
        self.0.remove(name)
    }

    /// Removes a single value.
    pub fn remove(&mut self, tab: &str, key: &str) -> Option<Value> {
        self.0.get_mut(tab)?.remove(key)
    }

    /// Merges another set of tabs into this one.
    ///
    /// Values in `other` replace values with the same tab and key.
    pub fn merge(&mut self, other: &Metadata) {
        for (name, tab) in &other.0 {
            let target = self.0.entry(name.clone()).or_default();
            for (key, value) in tab {
                target.insert(key.clone(), value.clone());
            }
        }
    }

    /// Iterates the tabs.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Tab> {
        self.0.iter()
    }

    /// Iterates the tabs mutably.
    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, String, Tab> {
        self.0.iter_mut()
    }

    /// Whether there are no tabs.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Metadata {
    type Item = (&'a String, &'a Tab);
    type IntoIter = btree_map::Iter<'a, String, Tab>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_other() {
        let mut base = Metadata::new();
        base.add("custom", "foo", "base");
        base.add("custom", "bar", "kept");

        let mut other = Metadata::new();
        other.add("custom", "foo", "other");
        other.add("extra", "baz", true);

        base.merge(&other);
        assert_eq!(base.get("custom", "foo"), Some(&"other".into()));
        assert_eq!(base.get("custom", "bar"), Some(&"kept".into()));
        assert_eq!(base.get("extra", "baz"), Some(&true.into()));
    }

    #[test]
    fn test_remove() {
        let mut metadata = Metadata::new();
        metadata.add("custom", "foo", 1);
        assert_eq!(metadata.remove("custom", "foo"), Some(1.into()));
        assert_eq!(metadata.remove("custom", "foo"), None);
        assert!(metadata.remove_tab("custom").unwrap().is_empty());
        assert!(metadata.is_empty());
    }

    #[test]
    fn test_serializes_as_nested_object() {
        let mut metadata = Metadata::new();
        metadata.add("myTab", "key", "value");
        assert_eq!(
            serde_json::to_string(&metadata).unwrap(),
            r#"{"myTab":{"key":"value"}}"#
        );
    }
}
