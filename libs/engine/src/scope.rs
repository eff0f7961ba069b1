//! Scoped key/value storage and the protected evaluation context.
//!
//! A [`ScopedMap`] layers an ordered local store over a shared, read-only
//! defaults chain; engines derive child scopes when a transform configuration
//! shadows outer definitions. [`Context`] specializes it for evaluation
//! parameters, where `$`-prefixed keys are immutable once installed.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::rc::Rc;

use crate::error::ConfigError;

/// An ordered map with an optional defaults chain.
///
/// Lookups try local storage first and then the chain; writes always go to
/// local storage, so shadowing never leaks into the parent scope.
#[derive(Debug, Default)]
pub struct ScopedMap<V> {
    local: RefCell<IndexMap<String, V>>,
    defaults: Option<Rc<ScopedMap<V>>>,
}

impl<V: Clone> ScopedMap<V> {
    pub fn new() -> Self {
        Self {
            local: RefCell::new(IndexMap::new()),
            defaults: None,
        }
    }

    pub fn with_defaults(defaults: Rc<ScopedMap<V>>) -> Self {
        Self {
            local: RefCell::new(IndexMap::new()),
            defaults: Some(defaults),
        }
    }

    /// Look up a key locally, falling back to the defaults chain.
    pub fn get(&self, key: &str) -> Option<V> {
        if let Some(v) = self.local.borrow().get(key) {
            return Some(v.clone());
        }
        self.defaults.as_ref().and_then(|d| d.get(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.local.borrow().contains_key(key)
            || self.defaults.as_ref().is_some_and(|d| d.contains(key))
    }

    pub fn contains_local(&self, key: &str) -> bool {
        self.local.borrow().contains_key(key)
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.local.borrow_mut().insert(key.into(), value);
    }

    /// Remove a local entry. A defaulted value shadowed by the removed entry
    /// becomes visible again; entries in the chain itself are untouched.
    pub fn remove(&self, key: &str) -> Option<V> {
        self.local.borrow_mut().shift_remove(key)
    }

    /// The union of local and defaulted keys, local keys first.
    pub fn keys(&self) -> Vec<String> {
        let mut out: Vec<String> = self.local.borrow().keys().cloned().collect();
        if let Some(defaults) = &self.defaults {
            for key in defaults.keys() {
                if !out.iter().any(|k| k == &key) {
                    out.push(key);
                }
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.local.borrow().is_empty()
            && self.defaults.as_ref().map_or(true, |d| d.is_empty())
    }

    pub fn defaults(&self) -> Option<&Rc<ScopedMap<V>>> {
        self.defaults.as_ref()
    }
}

/// Evaluation context: a scoped map of `String → Value` where `$`-prefixed
/// keys are protected.
///
/// Protected keys can only be installed through [`Context::install`] (used
/// when a module seeds its defaults); `set` and `delete` refuse them, and
/// [`Context::update`] skips them silently so that merging data from an
/// untrusted stylesheet or command line cannot clobber them.
#[derive(Debug, Clone, Default)]
pub struct Context {
    vars: Rc<ScopedMap<Value>>,
}

fn is_protected(key: &str) -> bool {
    key.starts_with('$')
}

impl Context {
    pub fn new() -> Self {
        Self {
            vars: Rc::new(ScopedMap::new()),
        }
    }

    /// A child context whose defaults are this one.
    pub fn derive(&self) -> Self {
        Self {
            vars: Rc::new(ScopedMap::with_defaults(Rc::clone(&self.vars))),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.vars.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains(key)
    }

    pub fn set(&self, key: &str, value: Value) -> Result<(), ConfigError> {
        if is_protected(key) {
            return Err(ConfigError::ProtectedKey(key.to_string()));
        }
        self.vars.insert(key, value);
        Ok(())
    }

    pub fn delete(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        if is_protected(key) {
            return Err(ConfigError::ProtectedKey(key.to_string()));
        }
        Ok(self.vars.remove(key))
    }

    /// Merge a map of values, silently skipping protected keys.
    pub fn update(&self, values: &Map<String, Value>) {
        for (key, value) in values {
            if !is_protected(key) {
                self.vars.insert(key, value.clone());
            }
        }
    }

    /// Install a value regardless of protection. Reserved for module setup.
    pub(crate) fn install(&self, key: &str, value: Value) {
        self.vars.insert(key, value);
    }

    pub fn keys(&self) -> Vec<String> {
        self.vars.keys()
    }

    /// Materialize the visible union of the context as a JSON object.
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        for key in self.keys() {
            if let Some(v) = self.get(&key) {
                out.insert(key, v);
            }
        }
        Value::Object(out)
    }

    /// Evaluate an RFC 6901 pointer against the context. The first token
    /// selects a context key; the rest descends into the found value.
    pub fn extract(&self, path: &str) -> Option<Value> {
        if path.is_empty() {
            return Some(self.to_value());
        }
        let rest = path.strip_prefix('/')?;
        let (first, tail) = match rest.find('/') {
            Some(pos) => (&rest[..pos], &rest[pos..]),
            None => (rest, ""),
        };
        let first = first.replace("~1", "/").replace("~0", "~");
        let value = self.get(&first)?;
        if tail.is_empty() {
            Some(value)
        } else {
            value.pointer(tail).cloned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Rc<ScopedMap<Value>> {
        let map = ScopedMap::new();
        map.insert("foo", json!("bar"));
        map.insert("$count", json!(4));
        Rc::new(map)
    }

    #[test]
    fn test_scoped_lookup_and_shadowing() {
        let child = ScopedMap::with_defaults(base());
        assert_eq!(child.get("foo"), Some(json!("bar")));
        assert_eq!(child.get("hank"), None);

        child.insert("hank", json!(3));
        child.insert("foo", json!("blah"));
        assert_eq!(child.get("hank"), Some(json!(3)));
        assert_eq!(child.get("foo"), Some(json!("blah")));

        child.remove("hank");
        child.remove("foo");
        assert_eq!(child.get("foo"), Some(json!("bar")));
        assert_eq!(child.get("hank"), None);
    }

    #[test]
    fn test_scoped_keys_are_a_union() {
        let child = ScopedMap::with_defaults(base());
        assert_eq!(child.len(), 2);
        assert!(child.keys().contains(&"foo".to_string()));

        child.insert("hank", json!(3));
        child.insert("foo", json!("blah"));
        let keys = child.keys();
        assert_eq!(keys.len(), 3);
        assert!(keys.contains(&"hank".to_string()));
        assert!(keys.contains(&"$count".to_string()));
    }

    #[test]
    fn test_scoped_without_defaults() {
        let map: ScopedMap<Value> = ScopedMap::new();
        assert!(map.is_empty());
        assert_eq!(map.get("foo"), None);
        map.insert("foo", json!("blah"));
        assert_eq!(map.get("foo"), Some(json!("blah")));
        assert_eq!(map.len(), 1);
    }

    fn context_with_defaults() -> Context {
        let parent = Context::new();
        parent.install("foo", json!("bar"));
        parent.install("$count", json!(4));
        parent.derive()
    }

    #[test]
    fn test_context_protected_set_and_delete() {
        let ctx = context_with_defaults();
        assert!(ctx.set("$count", json!(5)).is_err());
        assert!(ctx.set("$secure", json!(false)).is_err());
        assert!(ctx.delete("$count").is_err());
        assert_eq!(ctx.get("$count"), Some(json!(4)));
    }

    #[test]
    fn test_context_update_skips_protected() {
        let ctx = context_with_defaults();
        let mut incoming = Map::new();
        incoming.insert("dr".into(), json!("eamon"));
        incoming.insert("$count".into(), json!(5));
        incoming.insert("$secure".into(), json!(false));
        ctx.update(&incoming);

        assert_eq!(ctx.get("dr"), Some(json!("eamon")));
        assert_eq!(ctx.get("$count"), Some(json!(4)));
        assert!(!ctx.contains("$secure"));
    }

    #[test]
    fn test_context_pointer_extraction() {
        let ctx = Context::new();
        ctx.set("answers", json!(["c0", "c1", "c2"])).unwrap();
        ctx.set("xml.indent", json!(4)).unwrap();
        assert_eq!(ctx.extract("/answers/1"), Some(json!("c1")));
        assert_eq!(ctx.extract("/xml.indent"), Some(json!(4)));
        assert_eq!(ctx.extract("/answers/9"), None);
        assert_eq!(ctx.extract("/missing"), None);

        let whole = ctx.extract("").unwrap();
        assert_eq!(whole["answers"][0], json!("c0"));
    }
}
