//! Externally registered custom converters.
//!
//! Two converter shapes are supported, mirroring the platform contract:
//!
//! - [`ValueConverter`]: a generic two-way converter working on plain
//!   values;
//! - [`BagConverter`]: a language-aware converter that receives the value
//!   still wrapped in its property bag and a destination-type parameter, so
//!   one converter instance can serve a family of related types.
//!
//! Converters attach to type *names*. Lookups consult the engine's
//! runspace-scoped table first, then an optional caller-supplied backup
//! table. A small "possibly has a converter" cache keeps the common
//! no-converter case off the lookup path.

use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use crate::type_id::TypeId;
use crate::value::{Culture, Value};

/// Result of a converter invocation: the converted value or an inner
/// failure message for the dispatcher to wrap.
pub type ConverterResult = std::result::Result<Value, String>;

/// A generic two-way converter attached to a type name.
pub trait ValueConverter: Send + Sync {
    /// Can this converter produce `to` from `value`? (`value` has the type
    /// the converter is attached to.)
    fn can_convert_to(&self, value: &Value, to: TypeId) -> bool;

    /// Convert `value` (of the attached type) into `to`.
    fn convert_to(
        &self,
        value: &Value,
        to: TypeId,
        culture: &Culture,
        ignore_case: bool,
    ) -> ConverterResult;

    /// Can this converter build a value of the attached type from `value`?
    fn can_convert_from(&self, value: &Value, to: TypeId) -> bool;

    /// Build a value of the attached type (`to`) from `value`.
    fn convert_from(
        &self,
        value: &Value,
        to: TypeId,
        culture: &Culture,
        ignore_case: bool,
    ) -> ConverterResult;
}

/// A language-aware converter: the same shape as [`ValueConverter`], but the
/// value arrives still wrapped in its property bag (when one exists), so the
/// converter can read attached properties and original text.
pub trait BagConverter: Send + Sync {
    /// Can this converter produce `to` from the wrapped `value`?
    fn can_convert_to(&self, value: &Value, to: TypeId) -> bool;

    /// Convert the wrapped `value` into `to`.
    fn convert_to(
        &self,
        value: &Value,
        to: TypeId,
        culture: &Culture,
        ignore_case: bool,
    ) -> ConverterResult;

    /// Can this converter build a `to` from the wrapped `value`?
    fn can_convert_from(&self, value: &Value, to: TypeId) -> bool;

    /// Build a `to` from the wrapped `value`.
    fn convert_from(
        &self,
        value: &Value,
        to: TypeId,
        culture: &Culture,
        ignore_case: bool,
    ) -> ConverterResult;
}

/// A registered converter of either shape.
#[derive(Clone)]
pub enum ConverterHandle {
    /// Generic two-way converter.
    Value(Arc<dyn ValueConverter>),
    /// Language-aware, bag-preserving converter.
    Bag(Arc<dyn BagConverter>),
}

/// The type-metadata provider contract: resolve a converter for a type name.
pub trait ConverterTable: Send + Sync {
    /// The converter registered for `type_name`, if any.
    fn converter_for(&self, type_name: &str) -> Option<ConverterHandle>;
}

/// The engine-owned, runspace-scoped converter table.
#[derive(Clone, Default)]
pub struct ConverterMap {
    map: FxHashMap<String, ConverterHandle>,
}

impl ConverterMap {
    /// An empty table.
    pub fn new() -> ConverterMap {
        ConverterMap::default()
    }

    /// Attach a converter to a type name, replacing any previous one.
    pub fn insert(&mut self, type_name: impl Into<String>, handle: ConverterHandle) {
        self.map.insert(type_name.into(), handle);
    }

    /// Remove the converter attached to a type name.
    pub fn remove(&mut self, type_name: &str) -> Option<ConverterHandle> {
        self.map.remove(type_name)
    }

    /// True when a converter is attached to the name.
    pub fn contains(&self, type_name: &str) -> bool {
        self.map.contains_key(type_name)
    }
}

impl ConverterTable for ConverterMap {
    fn converter_for(&self, type_name: &str) -> Option<ConverterHandle> {
        self.map.get(type_name).cloned()
    }
}

const MAX_POSSIBLE_CACHE: usize = 256;

/// Memo of "might this type name have a converter at all" answers.
///
/// Entries are invalidated by name when external type metadata changes, and
/// the whole map is cleared when it grows past its cap.
#[derive(Debug, Default)]
pub struct PossibleConverterCache {
    table: Mutex<FxHashMap<String, bool>>,
}

impl PossibleConverterCache {
    /// An empty cache.
    pub fn new() -> PossibleConverterCache {
        PossibleConverterCache::default()
    }

    /// Look up a memoized answer, computing and storing it on a miss.
    pub fn get_or_compute(&self, type_name: &str, compute: impl FnOnce() -> bool) -> bool {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(answer) = table.get(type_name) {
            return *answer;
        }
        let answer = compute();
        if table.len() >= MAX_POSSIBLE_CACHE {
            table.clear();
        }
        table.insert(type_name.to_string(), answer);
        answer
    }

    /// Drop the memoized answer for one name.
    pub fn invalidate(&self, type_name: &str) {
        self.table
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(type_name);
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.table.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_id::well_known;

    struct UppercaseConverter;

    impl ValueConverter for UppercaseConverter {
        fn can_convert_to(&self, value: &Value, to: TypeId) -> bool {
            matches!(value, Value::Str(_)) && to == well_known::STRING
        }

        fn convert_to(
            &self,
            value: &Value,
            _to: TypeId,
            _culture: &Culture,
            _ignore_case: bool,
        ) -> ConverterResult {
            match value {
                Value::Str(s) => Ok(Value::Str(s.to_uppercase())),
                _ => Err("expected a string".to_string()),
            }
        }

        fn can_convert_from(&self, _value: &Value, _to: TypeId) -> bool {
            false
        }

        fn convert_from(
            &self,
            _value: &Value,
            _to: TypeId,
            _culture: &Culture,
            _ignore_case: bool,
        ) -> ConverterResult {
            Err("not supported".to_string())
        }
    }

    #[test]
    fn converter_map_round_trip() {
        let mut map = ConverterMap::new();
        assert!(map.converter_for("Widget").is_none());

        map.insert(
            "Widget",
            ConverterHandle::Value(Arc::new(UppercaseConverter)),
        );
        assert!(map.contains("Widget"));
        assert!(map.converter_for("Widget").is_some());

        map.remove("Widget");
        assert!(!map.contains("Widget"));
    }

    #[test]
    fn possible_cache_memoizes() {
        let cache = PossibleConverterCache::new();
        let mut calls = 0;
        assert!(!cache.get_or_compute("A", || {
            calls += 1;
            false
        }));
        assert!(!cache.get_or_compute("A", || {
            calls += 1;
            true // would flip the answer, but must not be called
        }));
        assert_eq!(calls, 1);

        cache.invalidate("A");
        assert!(cache.get_or_compute("A", || true));
    }
}
