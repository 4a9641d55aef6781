//! The conversion engine: the public dispatcher surface.
//!
//! [`ConversionEngine`] owns the process-scoped state — the type registry,
//! the conversion cache, the enum-descriptor cache, the converter table and
//! its "possibly has a converter" memo — and exposes the operations the
//! rest of the system consumes: `convert_to`, `try_convert_to`,
//! `loosely_equals`, `compare`/`try_compare`, `is_true`, enumeration, and
//! the cache invalidation hooks.
//!
//! All operations are synchronous and reentrant: strategies recursively
//! invoke the dispatcher (array elements, enum joining, property copying).
//! The two caches are guarded by independent locks that are never nested,
//! so recursion cannot deadlock.

use std::cmp::Ordering;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::trace;

use crate::array;
use crate::cache::{ConversionCache, ConversionEntry};
use crate::custom::{ConverterHandle, ConverterMap, ConverterTable, PossibleConverterCache};
use crate::enum_match::{self, EnumCache};
use crate::error::{CastError, Result};
use crate::numeric::{self, NumericKind};
use crate::rank::ConversionRank;
use crate::registry::TypeRegistry;
use crate::strategy::{self, Strategy};
use crate::type_id::{TypeId, well_known};
use crate::types::TypeCaps;
use crate::value::{
    BagProperty, BoundDelegate, Culture, DelegateTarget, DictValue, PropertyBag, ScriptObject,
    Value,
};

/// The language mode consulted by the security gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LanguageMode {
    /// No destination-type restrictions.
    #[default]
    Unrestricted,
    /// Conversions may only target core types.
    Constrained,
}

/// The external number-literal scanner: parses literals with unit suffixes
/// and multipliers. Consulted before native parsing; coercion is never
/// requested.
pub trait NumberScanner: Send + Sync {
    /// Parse `text` as a literal of the target domain, or decline.
    fn scan_number(&self, text: &str, target: NumericKind) -> Option<Value>;
}

/// Handler for member errors raised while applying a property bag onto a
/// freshly constructed object. Returning `true` suppresses the error.
pub type MemberErrorHandler = Arc<dyn Fn(&CastError) -> bool + Send + Sync>;

/// The value-conversion engine.
pub struct ConversionEngine {
    registry: RwLock<TypeRegistry>,
    cache: ConversionCache,
    enums: EnumCache,
    converters: RwLock<ConverterMap>,
    possible: PossibleConverterCache,
    scanner: RwLock<Option<Arc<dyn NumberScanner>>>,
    mode: Mutex<LanguageMode>,
    member_errors: RwLock<Option<MemberErrorHandler>>,
}

impl Default for ConversionEngine {
    fn default() -> Self {
        ConversionEngine::new()
    }
}

impl ConversionEngine {
    /// An engine over the built-in types, with the precomputed conversion
    /// pairs seeded.
    pub fn new() -> ConversionEngine {
        ConversionEngine::with_registry(TypeRegistry::with_builtins())
    }

    /// An engine over a caller-supplied registry.
    pub fn with_registry(registry: TypeRegistry) -> ConversionEngine {
        let engine = ConversionEngine {
            registry: RwLock::new(registry),
            cache: ConversionCache::new(),
            enums: EnumCache::new(),
            converters: RwLock::new(ConverterMap::new()),
            possible: PossibleConverterCache::new(),
            scanner: RwLock::new(None),
            mode: Mutex::new(LanguageMode::default()),
            member_errors: RwLock::new(None),
        };
        engine.cache.rebuild();
        engine
    }

    // ==========================================================================
    // Configuration
    // ==========================================================================

    /// Read access to the type registry.
    pub fn registry(&self) -> RwLockReadGuard<'_, TypeRegistry> {
        self.registry.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Write access to the type registry, for host registration. Callers
    /// that replace metadata of an existing type should follow up with
    /// [`ConversionEngine::invalidate_conversions_involving`].
    pub fn registry_mut(&self) -> RwLockWriteGuard<'_, TypeRegistry> {
        self.registry.write().unwrap_or_else(|e| e.into_inner())
    }

    /// The current language mode.
    pub fn language_mode(&self) -> LanguageMode {
        *self.mode.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Switch the language mode. Existing cache entries are dropped so the
    /// gate re-evaluates.
    pub fn set_language_mode(&self, mode: LanguageMode) {
        *self.mode.lock().unwrap_or_else(|e| e.into_inner()) = mode;
        self.cache.rebuild();
    }

    /// Install the number-literal scanner.
    pub fn set_number_scanner(&self, scanner: Arc<dyn NumberScanner>) {
        *self.scanner.write().unwrap_or_else(|e| e.into_inner()) = Some(scanner);
    }

    /// Attach a custom converter to a type name and invalidate every cached
    /// conversion involving that name.
    pub fn register_converter(&self, type_name: &str, handle: ConverterHandle) {
        self.converters
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(type_name, handle);
        self.possible.invalidate(type_name);
        self.invalidate_conversions_involving(type_name);
    }

    /// Remove the converter attached to a type name.
    pub fn remove_converter(&self, type_name: &str) {
        self.converters
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(type_name);
        self.possible.invalidate(type_name);
        self.invalidate_conversions_involving(type_name);
    }

    /// Install the handler consulted when property-bag application hits a
    /// missing or unassignable member.
    pub fn set_member_error_handler(&self, handler: MemberErrorHandler) {
        *self
            .member_errors
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(handler);
    }

    // ==========================================================================
    // Cache maintenance
    // ==========================================================================

    /// Remove every cached conversion whose source or destination carries
    /// the given type name, and forget the converter memo for it. Called
    /// when external type metadata changes.
    pub fn invalidate_conversions_involving(&self, type_name: &str) {
        let registry = self.registry();
        self.cache.invalidate_involving(type_name, &registry);
        self.possible.invalidate(type_name);
    }

    /// Clear the conversion cache wholesale and reseed the precomputed
    /// pairs. Used at startup and after bulk type-metadata reloads.
    pub fn rebuild_conversion_cache(&self) {
        self.possible.clear();
        self.cache.rebuild();
    }

    /// The strength of the conversion between two types, for diagnostics
    /// and overload resolution.
    pub fn conversion_rank(&self, from: TypeId, to: TypeId) -> ConversionRank {
        let registry = self.registry();
        self.figure_for_types(&registry, from, to).rank
    }

    // ==========================================================================
    // Public conversion surface
    // ==========================================================================

    /// Convert a value to the destination type with the invariant culture.
    pub fn convert_to(&self, value: &Value, to: TypeId) -> Result<Value> {
        self.convert_to_with(value, to, &Culture::Invariant, None)
    }

    /// Convert with an explicit culture.
    pub fn convert_to_with_culture(
        &self,
        value: &Value,
        to: TypeId,
        culture: &Culture,
    ) -> Result<Value> {
        self.convert_to_with(value, to, culture, None)
    }

    /// Convert with an explicit culture and an optional backup converter
    /// table (consulted after the engine's own table).
    pub fn convert_to_with(
        &self,
        value: &Value,
        to: TypeId,
        culture: &Culture,
        backup: Option<&dyn ConverterTable>,
    ) -> Result<Value> {
        let registry = self.registry();
        self.convert_in(&registry, value, to, true, culture, backup)
    }

    /// Conversion that reports failure instead of raising. Only the
    /// conversion-shaped error kinds are absorbed (`Ok(None)`); member
    /// errors and other failures still propagate.
    pub fn try_convert_to(&self, value: &Value, to: TypeId) -> Result<Option<Value>> {
        match self.convert_to(value, to) {
            Ok(converted) => Ok(Some(converted)),
            Err(err) if err.is_conversion_failure() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Typed variant: convert to `bool`.
    pub fn convert_to_bool(&self, value: &Value) -> Result<bool> {
        match self.convert_to(value, well_known::BOOL)? {
            Value::Bool(b) => Ok(b),
            other => Ok(self.is_true(&other)),
        }
    }

    /// Typed variant: convert to `string`.
    pub fn convert_to_string(&self, value: &Value) -> Result<String> {
        match self.convert_to(value, well_known::STRING)? {
            Value::Str(s) => Ok(s),
            other => Ok(other.render(&self.registry())),
        }
    }

    /// Typed variant: convert to `int`.
    pub fn convert_to_i32(&self, value: &Value) -> Result<i32> {
        match self.convert_to(value, well_known::INT32)? {
            Value::I32(v) => Ok(v),
            other => Err(self.invalid_cast_for(
                &self.registry(),
                &other,
                well_known::INT32,
                "the conversion produced an unexpected shape",
            )),
        }
    }

    /// Typed variant: convert to `int64`.
    pub fn convert_to_i64(&self, value: &Value) -> Result<i64> {
        match self.convert_to(value, well_known::INT64)? {
            Value::I64(v) => Ok(v),
            other => Err(self.invalid_cast_for(
                &self.registry(),
                &other,
                well_known::INT64,
                "the conversion produced an unexpected shape",
            )),
        }
    }

    /// Typed variant: convert to `double`.
    pub fn convert_to_f64(&self, value: &Value) -> Result<f64> {
        match self.convert_to(value, well_known::DOUBLE)? {
            Value::F64(v) => Ok(v),
            other => Err(self.invalid_cast_for(
                &self.registry(),
                &other,
                well_known::DOUBLE,
                "the conversion produced an unexpected shape",
            )),
        }
    }

    // ==========================================================================
    // Equality / comparison / truth
    // ==========================================================================

    /// Loose equality: null-aware, string-aware (culture and case
    /// options), numeric-aware (promotion through the common domain),
    /// otherwise converts `second` to the type of `first` and compares
    /// natively. A failed conversion means "not equal" rather than an
    /// error.
    pub fn loosely_equals(
        &self,
        first: &Value,
        second: &Value,
        ignore_case: bool,
        culture: &Culture,
    ) -> bool {
        let registry = self.registry();
        let a = first.unwrap_bag();
        let b = second.unwrap_bag();

        if a.is_null_like() {
            return b.is_null_like();
        }
        if b.is_null_like() {
            return false;
        }

        if let Value::Str(s) = a {
            let other = match b {
                Value::Str(t) => t.clone(),
                _ => match self.convert_in(&registry, b, well_known::STRING, true, culture, None) {
                    Ok(Value::Str(t)) => t,
                    _ => return false,
                },
            };
            return culture.strings_equal(s, &other, ignore_case);
        }

        if a == b {
            return true;
        }

        if let Some(ordering) = numeric::compare_numeric(a, b) {
            return ordering == Ordering::Equal;
        }

        if ignore_case {
            if let Value::Char(ca) = a {
                let other = match b {
                    Value::Char(cb) => Some(*cb),
                    Value::Str(s) if s.chars().count() == 1 => s.chars().next(),
                    _ => None,
                };
                if let Some(cb) = other {
                    return ca.to_uppercase().eq(cb.to_uppercase());
                }
            }
        }

        match self.convert_in(&registry, b, a.type_id(), true, culture, None) {
            Ok(converted) => *a == converted,
            Err(_) => false,
        }
    }

    /// Ordering against null: a numeric value sorts by its own sign
    /// (negative before null, zero and positive after); every non-numeric
    /// value sorts after null.
    fn ordering_against_null(value: &Value) -> Ordering {
        match numeric::sign_of(value) {
            Some(sign) if sign < 0 => Ordering::Less,
            _ => Ordering::Greater,
        }
    }

    /// Compare two values, converting `second` to the type of `first` when
    /// necessary.
    pub fn compare(
        &self,
        first: &Value,
        second: &Value,
        ignore_case: bool,
        culture: &Culture,
    ) -> Result<Ordering> {
        let registry = self.registry();
        let a = first.unwrap_bag();
        let b = second.unwrap_bag();

        if a.is_null_like() {
            return Ok(if b.is_null_like() {
                Ordering::Equal
            } else {
                Self::ordering_against_null(b).reverse()
            });
        }
        if b.is_null_like() {
            return Ok(Self::ordering_against_null(a));
        }

        let comparison_failure = |inner: &CastError| CastError::Comparison {
            first: a.render(&registry),
            second: b.render(&registry),
            reason: inner.reason(),
        };

        if let Value::Str(s) = a {
            let other = match b {
                Value::Str(t) => t.clone(),
                _ => match self.convert_in(&registry, b, well_known::STRING, true, culture, None) {
                    Ok(Value::Str(t)) => t,
                    Ok(other) => other.render(&registry),
                    Err(err) => return Err(comparison_failure(&err)),
                },
            };
            return Ok(culture.compare_strings(s, &other, ignore_case));
        }

        if let Some(ordering) = numeric::compare_numeric(a, b) {
            return Ok(ordering);
        }

        let converted = self
            .convert_in(&registry, b, a.type_id(), true, culture, None)
            .map_err(|err| comparison_failure(&err))?;

        if let Some(ordering) = a.natural_cmp(&converted) {
            return Ok(ordering);
        }
        if *a == converted {
            return Ok(Ordering::Equal);
        }
        Err(CastError::NotOrdered {
            value_text: a.render(&registry),
            type_name: registry.name_of(a.type_id()),
        })
    }

    /// Comparison that reports failure instead of raising: `None` when the
    /// required conversion fails or the first value defines no ordering.
    pub fn try_compare(
        &self,
        first: &Value,
        second: &Value,
        ignore_case: bool,
        culture: &Culture,
    ) -> Option<Ordering> {
        self.compare(first, second, ignore_case, culture).ok()
    }

    /// The language's truth rules.
    pub fn is_true(&self, value: &Value) -> bool {
        let v = value.unwrap_bag();
        if v.is_null_like() {
            return false;
        }
        match v {
            Value::Bool(b) | Value::Switch(b) => *b,
            Value::Str(s) => !s.is_empty(),
            Value::Char(_) => true,
            Value::List(list) => self.is_true_items(&list.items),
            Value::StringList(items) => match items.len() {
                0 => false,
                1 => !items[0].is_empty(),
                _ => true,
            },
            other => match numeric::is_zero(other) {
                Some(zero) => !zero,
                None => true,
            },
        }
    }

    /// Truth of an ordered sequence: empty is false, two or more is true,
    /// and a single element unwraps — unless that element is itself a list,
    /// which is decided by emptiness alone to avoid unbounded recursion.
    fn is_true_items(&self, items: &[Value]) -> bool {
        match items.len() {
            0 => false,
            1 => {
                let first = items[0].unwrap_bag();
                match first {
                    Value::List(inner) => !inner.items.is_empty(),
                    Value::StringList(inner) => !inner.is_empty(),
                    other => self.is_true(other),
                }
            }
            _ => true,
        }
    }

    // ==========================================================================
    // Enumeration
    // ==========================================================================

    /// The items of an enumerable value, or None when the value is not
    /// enumerable by the language's rules. Dictionaries and documents are
    /// deliberately not enumerable even though they contain items.
    pub fn get_enumerable(&self, value: &Value) -> Option<Vec<Value>> {
        self.enumerable_items(value)
    }

    /// An iterator over an enumerable value, or None (never an error).
    pub fn get_enumerator(&self, value: &Value) -> Option<std::vec::IntoIter<Value>> {
        self.enumerable_items(value).map(Vec::into_iter)
    }

    pub(crate) fn enumerable_items(&self, value: &Value) -> Option<Vec<Value>> {
        match value.unwrap_bag() {
            Value::List(list) => Some(list.items.clone()),
            Value::StringList(items) => {
                Some(items.iter().map(|s| Value::Str(s.clone())).collect())
            }
            _ => None,
        }
    }

    // ==========================================================================
    // Conversion internals
    // ==========================================================================

    /// Resolve (and cache) the strategy for a type pair.
    pub(crate) fn figure_for_types(
        &self,
        registry: &TypeRegistry,
        from: TypeId,
        to: TypeId,
    ) -> Arc<ConversionEntry> {
        if let Some(hit) = self.cache.get(from, to) {
            return hit;
        }
        let (synthesized, rank) = strategy::synthesize(self, registry, from, to);
        self.cache.insert(from, to, synthesized, rank)
    }

    /// True when the type might have a custom converter attached, memoized
    /// by name.
    pub(crate) fn possibly_has_converter(&self, registry: &TypeRegistry, id: TypeId) -> bool {
        let name = registry.name_of(id);
        self.possible.get_or_compute(&name, || {
            registry.caps(id).contains(TypeCaps::HAS_CONVERTER)
                || self
                    .converters
                    .read()
                    .unwrap_or_else(|e| e.into_inner())
                    .contains(&name)
        })
    }

    /// The dispatcher: resolve the strategy for the value's type, run it,
    /// and retry once against the debased type when a property-bag wrapper
    /// itself has no conversion.
    pub(crate) fn convert_in(
        &self,
        registry: &TypeRegistry,
        value: &Value,
        to: TypeId,
        recurse: bool,
        culture: &Culture,
        backup: Option<&dyn ConverterTable>,
    ) -> Result<Value> {
        trace!(to = %registry.name_of(to), "converting value");
        let from = value.type_id();
        let entry = self.figure_for_types(registry, from, to);
        if !entry.rank.is_none() {
            return self.run_strategy(
                registry,
                &entry.strategy,
                value,
                to,
                recurse,
                None,
                culture,
                backup,
            );
        }

        // The pair has no conversion. If the value is a bag, retry exactly
        // once against the unwrapped base object's type — the bag type
        // itself rarely converts, but its contents usually do.
        if let Value::Bag(bag) = value {
            let (effective, debased_from): (&Value, TypeId) = match &bag.base {
                None => (value, well_known::PURE_BAG),
                Some(base) if base.is_null_like() => (base, well_known::NULL),
                Some(base @ Value::Bag(_)) => (base, well_known::PURE_BAG),
                Some(base) => (base, base.type_id()),
            };
            let retry = self.figure_for_types(registry, debased_from, to);
            return self.run_strategy(
                registry,
                &retry.strategy,
                effective,
                to,
                recurse,
                Some(bag.as_ref()),
                culture,
                backup,
            );
        }

        self.run_strategy(
            registry,
            &entry.strategy,
            value,
            to,
            recurse,
            None,
            culture,
            backup,
        )
    }

    fn invalid_cast_for(
        &self,
        registry: &TypeRegistry,
        value: &Value,
        to: TypeId,
        reason: impl Into<String>,
    ) -> CastError {
        CastError::invalid_cast(
            value.render(registry),
            registry.name_of(value.type_id()),
            registry.name_of(to),
            reason,
        )
    }

    fn no_conversion_error(
        &self,
        registry: &TypeRegistry,
        value: &Value,
        to: TypeId,
    ) -> CastError {
        if registry.caps(to).contains(TypeCaps::STACK_ONLY) {
            return self.invalid_cast_for(
                registry,
                value,
                to,
                "the destination type lives on the stack only and cannot be a conversion target",
            );
        }
        if value.is_null_like() {
            if let Some(spec) = registry.enum_spec(to) {
                let names: Vec<&str> = spec.members.iter().map(|(n, _)| n.as_str()).collect();
                return self.invalid_cast_for(
                    registry,
                    value,
                    to,
                    format!("null cannot convert to an enum; valid values: {}", names.join(", ")),
                );
            }
            return self.invalid_cast_for(
                registry,
                value,
                to,
                "null cannot be converted to a value type",
            );
        }
        self.invalid_cast_for(registry, value, to, "no conversion exists between the types")
    }

    /// Report a member error through the caller-supplied handler; the
    /// handler returning true suppresses it.
    fn member_error(&self, error: CastError) -> Result<()> {
        let handler = self
            .member_errors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        match handler {
            Some(handler) if handler(&error) => Ok(()),
            _ => Err(error),
        }
    }

    fn converter_lookup(
        &self,
        type_name: &str,
        backup: Option<&dyn ConverterTable>,
    ) -> Option<ConverterHandle> {
        let own = self
            .converters
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .converter_for(type_name);
        own.or_else(|| backup.and_then(|table| table.converter_for(type_name)))
    }

    /// Ask the custom converters attached to the source type (convert-to
    /// direction) and then the destination type (convert-from direction).
    /// `Ok(None)` means every converter declined.
    fn try_custom_conversion(
        &self,
        registry: &TypeRegistry,
        value: &Value,
        original: Option<&PropertyBag>,
        to: TypeId,
        culture: &Culture,
        backup: Option<&dyn ConverterTable>,
    ) -> Result<Option<Value>> {
        let wrapped;
        let bag_view: &Value = match original {
            Some(bag) => {
                wrapped = Value::Bag(Box::new(bag.clone()));
                &wrapped
            }
            None => value,
        };

        let wrap_failure = |message: String| {
            CastError::invalid_cast(
                value.render(registry),
                registry.name_of(value.type_id()),
                registry.name_of(to),
                message,
            )
        };

        let invoke = |handle: &ConverterHandle, from_direction: bool| -> Result<Option<Value>> {
            match handle {
                ConverterHandle::Value(converter) => {
                    if from_direction {
                        if converter.can_convert_from(value, to) {
                            return converter
                                .convert_from(value, to, culture, true)
                                .map(Some)
                                .map_err(|m| wrap_failure(m));
                        }
                    } else if converter.can_convert_to(value, to) {
                        return converter
                            .convert_to(value, to, culture, true)
                            .map(Some)
                            .map_err(|m| wrap_failure(m));
                    }
                    Ok(None)
                }
                ConverterHandle::Bag(converter) => {
                    if from_direction {
                        if converter.can_convert_from(bag_view, to) {
                            return converter
                                .convert_from(bag_view, to, culture, true)
                                .map(Some)
                                .map_err(|m| wrap_failure(m));
                        }
                    } else if converter.can_convert_to(bag_view, to) {
                        return converter
                            .convert_to(bag_view, to, culture, true)
                            .map(Some)
                            .map_err(|m| wrap_failure(m));
                    }
                    Ok(None)
                }
            }
        };

        // Source type's converter converts *to* the destination.
        let source_name = registry.name_of(value.type_id());
        if let Some(handle) = self.converter_lookup(&source_name, backup) {
            if let Some(found) = invoke(&handle, false)? {
                return Ok(Some(found));
            }
        }

        // Destination type's converter converts *from* the value.
        let dest_name = registry.name_of(to);
        if let Some(handle) = self.converter_lookup(&dest_name, backup) {
            if let Some(found) = invoke(&handle, true)? {
                return Ok(Some(found));
            }
        }

        Ok(None)
    }

    // ==========================================================================
    // Strategy execution
    // ==========================================================================

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn run_strategy(
        &self,
        registry: &TypeRegistry,
        strategy: &Strategy,
        value: &Value,
        to: TypeId,
        recurse: bool,
        original: Option<&PropertyBag>,
        culture: &Culture,
        backup: Option<&dyn ConverterTable>,
    ) -> Result<Value> {
        match strategy {
            Strategy::NoConversion => Err(self.no_conversion_error(registry, value, to)),
            Strategy::NotSupported => Err(CastError::NotSupported {
                to_type: registry.name_of(to),
            }),
            Strategy::Identity | Strategy::Assignable => Ok(value.clone()),
            Strategy::WrapBag => Ok(match value {
                Value::Bag(_) => value.clone(),
                other => Value::Bag(Box::new(PropertyBag::wrapping(other.clone()))),
            }),
            Strategy::ToVoid => Ok(Value::Void),
            Strategy::ToNullable { underlying } => {
                self.convert_in(registry, value, *underlying, recurse, culture, backup)
            }
            Strategy::NullToNullable => Ok(Value::Null),
            Strategy::NullToRef => Ok(match original {
                Some(bag) => Value::Bag(Box::new(bag.clone())),
                None => value.clone(),
            }),
            Strategy::NullToNumeric(kind) => numeric::integer_to_value(0, *kind)
                .map_err(|inner| self.invalid_cast_for(registry, value, to, inner)),
            Strategy::NullToChar => Ok(Value::Char('\0')),
            Strategy::NullToString => Ok(Value::Str(String::new())),
            Strategy::NullToBool => Ok(Value::Bool(false)),
            Strategy::NullToSwitch => Ok(Value::Switch(false)),
            Strategy::NullToVoid => Ok(Value::Void),
            Strategy::NullToRefCell => Ok(Value::Ref(Box::new(Value::Null))),
            Strategy::NumericConvert { to: kind } => numeric::convert_numeric(value, *kind)
                .map_err(|inner| self.invalid_cast_for(registry, value, to, inner)),
            Strategy::NumericToString => {
                if let Some(text) = original.and_then(|bag| bag.original_text.clone()) {
                    return Ok(Value::Str(text));
                }
                numeric::render_numeric(value).map(Value::Str).ok_or_else(|| {
                    self.invalid_cast_for(registry, value, to, "the value is not numeric")
                })
            }
            Strategy::NumericToChar => {
                let as_u32 = numeric::convert_numeric(value, NumericKind::U32)
                    .map_err(|inner| self.invalid_cast_for(registry, value, to, inner))?;
                match as_u32 {
                    Value::U32(code) => char::from_u32(code).map(Value::Char).ok_or_else(|| {
                        self.invalid_cast_for(
                            registry,
                            value,
                            to,
                            "the value is not a valid character code point",
                        )
                    }),
                    _ => Err(self.invalid_cast_for(registry, value, to, "the value is not numeric")),
                }
            }
            Strategy::CharToNumeric { to: kind } => numeric::convert_numeric(value, *kind)
                .map_err(|inner| self.invalid_cast_for(registry, value, to, inner)),
            Strategy::RenderToString => Ok(Value::Str(match original {
                Some(bag) if bag.original_text.is_some() => {
                    bag.original_text.clone().unwrap_or_default()
                }
                _ => value.render(registry),
            })),
            Strategy::StringToInteger { to: kind } => {
                self.string_to_integer(registry, value, to, *kind)
            }
            Strategy::StringToReal { to: kind } => self.string_to_real(registry, value, to, *kind),
            Strategy::StringToDecimal => self.string_to_decimal(registry, value, to),
            Strategy::StringToChar => match value {
                Value::Str(s) => {
                    let mut chars = s.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => Ok(Value::Char(c)),
                        _ => Err(self.invalid_cast_for(
                            registry,
                            value,
                            to,
                            "only a single-character string converts to char",
                        )),
                    }
                }
                _ => Err(self.invalid_cast_for(registry, value, to, "the value is not a string")),
            },
            Strategy::BoolFromList => match value {
                Value::List(list) => Ok(Value::Bool(self.is_true_items(&list.items))),
                Value::StringList(items) => Ok(Value::Bool(match items.len() {
                    0 => false,
                    1 => !items[0].is_empty(),
                    _ => true,
                })),
                _ => Err(self.invalid_cast_for(registry, value, to, "the value is not a list")),
            },
            Strategy::BoolFromEnum => match value {
                Value::Enum(e) => Ok(Value::Bool(e.bits != 0)),
                _ => Err(self.invalid_cast_for(registry, value, to, "the value is not an enum")),
            },
            Strategy::BoolFromNumeric => match numeric::is_zero(value) {
                Some(zero) => Ok(Value::Bool(!zero)),
                None => Err(self.invalid_cast_for(registry, value, to, "the value is not numeric")),
            },
            Strategy::BoolFromString => match value {
                Value::Str(s) => Ok(Value::Bool(!s.is_empty())),
                _ => Err(self.invalid_cast_for(registry, value, to, "the value is not a string")),
            },
            Strategy::BoolFromChar => match value {
                Value::Char(c) => Ok(Value::Bool(*c != '\0')),
                _ => Err(self.invalid_cast_for(registry, value, to, "the value is not a char")),
            },
            Strategy::BoolFromSwitch => match value {
                Value::Switch(b) => Ok(Value::Bool(*b)),
                _ => Err(self.invalid_cast_for(registry, value, to, "the value is not a switch")),
            },
            Strategy::BoolFromValueType => Ok(Value::Bool(true)),
            Strategy::BoolFromReference => Ok(Value::Bool(true)),
            Strategy::BoolToSwitch => match value {
                Value::Bool(b) => Ok(Value::Switch(*b)),
                _ => Err(self.invalid_cast_for(registry, value, to, "the value is not a bool")),
            },
            Strategy::StringToCharList => match value {
                Value::Str(s) => Ok(array::string_to_char_list(s)),
                _ => Err(self.invalid_cast_for(registry, value, to, "the value is not a string")),
            },
            Strategy::RelatedArrays { element } => match value {
                Value::List(list) => Ok(array::convert_related(list, *element)),
                _ => Err(self.invalid_cast_for(registry, value, to, "the value is not an array")),
            },
            Strategy::UnrelatedArrays { element } => match value {
                Value::List(list) => {
                    array::convert_unrelated(self, registry, value, list, to, *element, culture)
                }
                _ => Err(self.invalid_cast_for(registry, value, to, "the value is not an array")),
            },
            Strategy::EnumerableToArray { element } => {
                array::enumerable_to_array(self, registry, value, to, *element, culture)
            }
            Strategy::ScalarToArray { element } => {
                array::scalar_to_array(self, registry, value, original, to, *element, culture)
            }
            Strategy::ToDict => match value {
                Value::Dict(_) => Ok(value.clone()),
                Value::Object(obj) => Ok(Value::Dict(DictValue::from_entries(
                    obj.fields
                        .iter()
                        .map(|(name, v)| (Value::Str(name.clone()), v.clone()))
                        .collect(),
                ))),
                Value::Bag(bag) if bag.is_pure() => Ok(Value::Dict(DictValue::from_entries(
                    bag.properties
                        .iter()
                        .map(|p| (Value::Str(p.name.clone()), p.value.clone()))
                        .collect(),
                ))),
                _ => Err(self.invalid_cast_for(
                    registry,
                    value,
                    to,
                    "the value is not dictionary-shaped",
                )),
            },
            Strategy::WrapRef => Ok(Value::Ref(Box::new(value.clone()))),
            Strategy::ToDocument => {
                let text = value.render(registry);
                serde_json::from_str::<serde_json::Value>(text.trim())
                    .map(Value::Document)
                    .map_err(|err| {
                        self.invalid_cast_for(
                            registry,
                            value,
                            to,
                            format!("the rendered text is not a valid document: {err}"),
                        )
                    })
            }
            Strategy::ToStringList => array::to_string_list(self, registry, value, culture),
            Strategy::BlockToDelegate => match value {
                Value::Block(block) => Ok(Value::Delegate(BoundDelegate {
                    delegate: to,
                    target: DelegateTarget::Block(block.clone()),
                })),
                _ => Err(self.invalid_cast_for(
                    registry,
                    value,
                    to,
                    "the value is not a script block",
                )),
            },
            Strategy::MethodToDelegate { overload } => match value {
                Value::Methods(group) => Ok(Value::Delegate(BoundDelegate {
                    delegate: to,
                    target: DelegateTarget::Overload {
                        group: group.type_id,
                        name: group.name.clone(),
                        index: *overload,
                    },
                })),
                _ => Err(self.invalid_cast_for(
                    registry,
                    value,
                    to,
                    "the value is not a method group",
                )),
            },
            Strategy::IntegerToEnum => {
                enum_match::integer_to_enum(registry, &self.enums, value, to)
            }
            Strategy::EnumToNumeric { to: kind } => {
                self.enum_to_numeric(registry, value, to, *kind)
            }
            Strategy::StringToEnum { multi } => match value {
                Value::Str(s) => {
                    enum_match::string_to_enum(registry, &self.enums, s, to, true, *multi)
                }
                _ => Err(self.invalid_cast_for(registry, value, to, "the value is not a string")),
            },
            Strategy::EnumerableToEnum => {
                self.enumerable_to_enum(registry, value, to, recurse, culture, backup)
            }
            Strategy::DictToCustomObject => match value {
                Value::Dict(dict) => self.dict_to_custom_object(registry, dict),
                _ => Err(self.invalid_cast_for(
                    registry,
                    value,
                    to,
                    "only a dictionary constructs a custom object",
                )),
            },
            Strategy::StaticCreate => self.invoke_static_create(registry, value, to, culture),
            Strategy::ParseMethod { with_culture } => {
                self.invoke_parse(registry, value, to, *with_culture, culture)
            }
            Strategy::Constructor { index } => {
                self.invoke_constructor(registry, value, to, *index, culture, backup)
            }
            Strategy::ElementCtor { element } => {
                self.invoke_element_ctor(registry, value, to, *element, culture)
            }
            Strategy::Cast { owner, index } => {
                let cast = registry
                    .class_entry(*owner)
                    .and_then(|class| class.casts.get(*index))
                    .ok_or_else(|| {
                        self.invalid_cast_for(registry, value, to, "the cast operator is gone")
                    })?;
                (cast.invoke)(value)
                    .map_err(|inner| self.invalid_cast_for(registry, value, to, inner))
            }
            Strategy::ConvertibleNumeric => {
                let text = numeric::render_numeric(value).ok_or_else(|| {
                    self.invalid_cast_for(registry, value, to, "the value is not numeric")
                })?;
                self.convert_in(registry, &Value::Str(text), to, recurse, culture, backup)
            }
            Strategy::Convertible => {
                let hook = registry
                    .class_entry(value.type_id())
                    .and_then(|class| class.convertible.clone())
                    .ok_or_else(|| {
                        self.invalid_cast_for(
                            registry,
                            value,
                            to,
                            "the value does not support generic conversion",
                        )
                    })?;
                hook(value, to).map_err(|inner| self.invalid_cast_for(registry, value, to, inner))
            }
            Strategy::DictToObject => match value {
                Value::Dict(dict) => {
                    let entries: Vec<(String, Value)> = dict
                        .entries
                        .iter()
                        .map(|(k, v)| (k.render(registry), v.clone()))
                        .collect();
                    let mut target = self.construct_empty(registry, value, to)?;
                    // Dictionary application assigns raw values; no deep
                    // conversion and never a method call.
                    self.apply_members(registry, &mut target, &entries, to, false, culture)?;
                    Ok(target)
                }
                _ => Err(self.invalid_cast_for(registry, value, to, "the value is not a dictionary")),
            },
            Strategy::PropertyCopy => {
                let bag_props: Vec<(String, Value)> = match (original, value) {
                    (Some(bag), _) => bag
                        .properties
                        .iter()
                        .map(|p| (p.name.clone(), p.value.clone()))
                        .collect(),
                    (None, Value::Bag(bag)) => bag
                        .properties
                        .iter()
                        .map(|p| (p.name.clone(), p.value.clone()))
                        .collect(),
                    _ => {
                        return Err(self.invalid_cast_for(
                            registry,
                            value,
                            to,
                            "the value carries no properties",
                        ));
                    }
                };
                let mut target = self.construct_empty(registry, value, to)?;
                self.apply_members(registry, &mut target, &bag_props, to, true, culture)?;
                Ok(target)
            }
            Strategy::Bridge(bridge) => {
                if let Some(first) = &bridge.try_first {
                    match self.run_strategy(
                        registry, first, value, to, recurse, original, culture, backup,
                    ) {
                        Ok(found) => return Ok(found),
                        Err(err) if err.is_conversion_failure() => {}
                        Err(err) => return Err(err),
                    }
                }
                if let Some(found) =
                    self.try_custom_conversion(registry, value, original, to, culture, backup)?
                {
                    trace!("custom type conversion succeeded");
                    return Ok(found);
                }
                if let Some(fallback) = &bridge.fallback {
                    return self.run_strategy(
                        registry, fallback, value, to, recurse, original, culture, backup,
                    );
                }
                Err(self.no_conversion_error(registry, value, to))
            }
        }
    }

    // ==========================================================================
    // Strategy helpers
    // ==========================================================================

    fn scan_number(&self, text: &str, target: NumericKind) -> Option<Value> {
        let scanner = self
            .scanner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        scanner.and_then(|s| s.scan_number(text, target))
    }

    /// String to an integer domain: empty is zero; then the external
    /// scanner; then a native parse; then — on a format failure only — one
    /// attempt through a double intermediate.
    fn string_to_integer(
        &self,
        registry: &TypeRegistry,
        value: &Value,
        to: TypeId,
        kind: NumericKind,
    ) -> Result<Value> {
        let Value::Str(text) = value else {
            return Err(self.invalid_cast_for(registry, value, to, "the value is not a string"));
        };
        if text.is_empty() {
            return numeric::integer_to_value(0, kind)
                .map_err(|inner| self.invalid_cast_for(registry, value, to, inner));
        }
        if let Some(scanned) = self.scan_number(text, kind) {
            return Ok(scanned);
        }
        let trimmed = text.trim();
        match trimmed.parse::<i128>() {
            Ok(parsed) => numeric::integer_to_value(parsed, kind)
                .map_err(|inner| self.invalid_cast_for(registry, value, to, inner)),
            Err(_) => {
                // Format failure: one more attempt through a double.
                if let Ok(through) = trimmed.parse::<f64>() {
                    if let Ok(converted) = numeric::convert_numeric(&Value::F64(through), kind) {
                        return Ok(converted);
                    }
                }
                Err(self.invalid_cast_for(
                    registry,
                    value,
                    to,
                    format!("\"{trimmed}\" is not a valid {} value", kind.name()),
                ))
            }
        }
    }

    /// String to a binary float domain: empty is zero; scanner; native
    /// culture-independent parse.
    fn string_to_real(
        &self,
        registry: &TypeRegistry,
        value: &Value,
        to: TypeId,
        kind: NumericKind,
    ) -> Result<Value> {
        let Value::Str(text) = value else {
            return Err(self.invalid_cast_for(registry, value, to, "the value is not a string"));
        };
        if text.is_empty() {
            return numeric::integer_to_value(0, kind)
                .map_err(|inner| self.invalid_cast_for(registry, value, to, inner));
        }
        if let Some(scanned) = self.scan_number(text, kind) {
            return Ok(scanned);
        }
        match text.trim().parse::<f64>() {
            Ok(parsed) => numeric::convert_numeric(&Value::F64(parsed), kind)
                .map_err(|inner| self.invalid_cast_for(registry, value, to, inner)),
            Err(_) => Err(self.invalid_cast_for(
                registry,
                value,
                to,
                format!("\"{}\" is not a valid {} value", text.trim(), kind.name()),
            )),
        }
    }

    /// String to decimal: empty is zero; scanner; decimal parse; then the
    /// double-based fallback before giving up.
    fn string_to_decimal(
        &self,
        registry: &TypeRegistry,
        value: &Value,
        to: TypeId,
    ) -> Result<Value> {
        let Value::Str(text) = value else {
            return Err(self.invalid_cast_for(registry, value, to, "the value is not a string"));
        };
        if text.is_empty() {
            return Ok(Value::Decimal(crate::numeric::Decimal::ZERO));
        }
        if let Some(scanned) = self.scan_number(text, NumericKind::Decimal) {
            return Ok(scanned);
        }
        let trimmed = text.trim();
        if let Some(parsed) = crate::numeric::Decimal::parse(trimmed) {
            return Ok(Value::Decimal(parsed));
        }
        if let Ok(through) = trimmed.parse::<f64>() {
            if let Ok(converted) = numeric::convert_numeric(&Value::F64(through), NumericKind::Decimal)
            {
                return Ok(converted);
            }
        }
        Err(self.invalid_cast_for(
            registry,
            value,
            to,
            format!("\"{trimmed}\" is not a valid decimal value"),
        ))
    }

    fn enum_to_numeric(
        &self,
        registry: &TypeRegistry,
        value: &Value,
        to: TypeId,
        kind: NumericKind,
    ) -> Result<Value> {
        let Value::Enum(e) = value else {
            return Err(self.invalid_cast_for(registry, value, to, "the value is not an enum"));
        };
        let spec = registry.enum_spec(e.type_id).ok_or_else(|| {
            self.invalid_cast_for(registry, value, to, "the enum type is not registered")
        })?;
        let width = spec.underlying.bit_width().unwrap_or(64);
        let mask = if width == 64 {
            u64::MAX
        } else {
            (1u64 << width) - 1
        };
        let bits = e.bits & mask;
        let extended: i128 = if spec.underlying.is_signed_integer() {
            if width == 64 {
                (bits as i64) as i128
            } else if (bits >> (width - 1)) & 1 == 1 {
                ((bits | !mask) as i64) as i128
            } else {
                bits as i128
            }
        } else {
            bits as i128
        };
        numeric::integer_to_value(extended, kind)
            .map_err(|inner| self.invalid_cast_for(registry, value, to, inner))
    }

    /// Join an enumerable's elements into a comma list — converting
    /// non-string elements to the enum first to normalize them to names —
    /// then match the joined text.
    fn enumerable_to_enum(
        &self,
        registry: &TypeRegistry,
        value: &Value,
        to: TypeId,
        recurse: bool,
        culture: &Culture,
        backup: Option<&dyn ConverterTable>,
    ) -> Result<Value> {
        let items = self.enumerable_items(value).ok_or_else(|| {
            self.invalid_cast_for(registry, value, to, "the value is not enumerable")
        })?;
        let mut joined = String::new();
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                joined.push(',');
            }
            match item.unwrap_bag() {
                Value::Str(s) => joined.push_str(s),
                other => {
                    let converted =
                        self.convert_in(registry, other, to, recurse, culture, backup)?;
                    joined.push_str(&converted.render(registry));
                }
            }
        }
        enum_match::string_to_enum(registry, &self.enums, &joined, to, true, true)
    }

    fn dict_to_custom_object(
        &self,
        registry: &TypeRegistry,
        dict: &DictValue,
    ) -> Result<Value> {
        let mut bag = PropertyBag::default();
        for (key, item) in &dict.entries {
            let name = key.render(registry);
            if name.eq_ignore_ascii_case("typename") {
                if let Value::Str(type_name) = item.unwrap_bag() {
                    bag.type_names.insert(0, type_name.clone());
                    continue;
                }
            }
            bag.properties.push(BagProperty {
                name,
                type_name: registry.name_of(item.type_id()),
                value: item.clone(),
            });
        }
        Ok(Value::Bag(Box::new(bag)))
    }

    fn invoke_static_create(
        &self,
        registry: &TypeRegistry,
        value: &Value,
        to: TypeId,
        culture: &Culture,
    ) -> Result<Value> {
        let Value::Str(text) = value else {
            return Err(self.invalid_cast_for(registry, value, to, "the value is not a string"));
        };
        let factory = registry
            .class_entry(to)
            .and_then(|class| class.create_from_string.clone())
            .ok_or_else(|| {
                self.invalid_cast_for(registry, value, to, "the type declares no string factory")
            })?;
        factory(text, culture).map_err(|inner| self.invalid_cast_for(registry, value, to, inner))
    }

    fn invoke_parse(
        &self,
        registry: &TypeRegistry,
        value: &Value,
        to: TypeId,
        with_culture: bool,
        culture: &Culture,
    ) -> Result<Value> {
        let Value::Str(text) = value else {
            return Err(self.invalid_cast_for(registry, value, to, "the value is not a string"));
        };
        let class = registry.class_entry(to).ok_or_else(|| {
            self.invalid_cast_for(registry, value, to, "the destination type is not registered")
        })?;
        let parse = if with_culture {
            class.parse_with_culture.clone()
        } else {
            class.parse_plain.clone()
        };
        let parse = parse.ok_or_else(|| {
            self.invalid_cast_for(registry, value, to, "the parse method is gone")
        })?;
        parse(text, culture).map_err(|inner| self.invalid_cast_for(registry, value, to, inner))
    }

    fn invoke_constructor(
        &self,
        registry: &TypeRegistry,
        value: &Value,
        to: TypeId,
        index: usize,
        culture: &Culture,
        backup: Option<&dyn ConverterTable>,
    ) -> Result<Value> {
        let (param, invoke) = {
            let ctor = registry
                .class_entry(to)
                .and_then(|class| class.constructors.get(index))
                .filter(|ctor| ctor.params.len() == 1)
                .ok_or_else(|| {
                    self.invalid_cast_for(registry, value, to, "the constructor is gone")
                })?;
            (ctor.params[0], ctor.invoke.clone())
        };
        let argument = if param == value.type_id() || registry.is_assignable(param, value.type_id())
        {
            value.clone()
        } else {
            self.convert_in(registry, value, param, false, culture, backup)?
        };
        invoke(&[argument]).map_err(|inner| self.invalid_cast_for(registry, value, to, inner))
    }

    /// The enumerable-constructor path: materialize a list of converted
    /// elements (the whole operation fails if any element fails), then
    /// invoke the collection constructor with it.
    fn invoke_element_ctor(
        &self,
        registry: &TypeRegistry,
        value: &Value,
        to: TypeId,
        element: TypeId,
        culture: &Culture,
    ) -> Result<Value> {
        let invoke = registry
            .class_entry(to)
            .and_then(|class| class.element_ctor.as_ref())
            .map(|ec| ec.invoke.clone())
            .ok_or_else(|| {
                self.invalid_cast_for(registry, value, to, "the collection constructor is gone")
            })?;
        let elements = match self.enumerable_items(value) {
            Some(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    let converted = self
                        .convert_in(registry, &item, element, false, culture, None)
                        .map_err(|inner| {
                            self.invalid_cast_for(registry, value, to, inner.reason())
                        })?;
                    out.push(converted);
                }
                out
            }
            None => vec![self.convert_in(registry, value, element, false, culture, None)?],
        };
        invoke(elements).map_err(|inner| self.invalid_cast_for(registry, value, to, inner))
    }

    /// Construct an empty instance of `to`: its no-argument constructor, or
    /// a bare object for constructor-less value types.
    fn construct_empty(
        &self,
        registry: &TypeRegistry,
        value: &Value,
        to: TypeId,
    ) -> Result<Value> {
        let class = registry.class_entry(to).ok_or_else(|| {
            self.invalid_cast_for(registry, value, to, "the destination type is not registered")
        })?;
        match class.no_arg_constructor() {
            Some(ctor) => (ctor.invoke)(&[])
                .map_err(|inner| self.invalid_cast_for(registry, value, to, inner)),
            None if registry.is_value_type(to) => Ok(Value::Object(ScriptObject {
                type_id: to,
                fields: Vec::new(),
            })),
            None => Err(self.invalid_cast_for(
                registry,
                value,
                to,
                "the type has no parameterless constructor",
            )),
        }
    }

    /// Apply named members onto a freshly constructed target. Unknown names
    /// and failed assignments are routed through the member-error handler.
    /// With `recursive` set, property values convert to their declared
    /// types first (falling back to the raw value if that conversion
    /// fails); otherwise raw values are assigned as-is.
    fn apply_members(
        &self,
        registry: &TypeRegistry,
        target: &mut Value,
        members: &[(String, Value)],
        to: TypeId,
        recursive: bool,
        culture: &Culture,
    ) -> Result<()> {
        let type_name = registry.name_of(to);
        let specs: Vec<(String, TypeId, bool)> = registry
            .class_entry(to)
            .map(|class| {
                class
                    .properties
                    .iter()
                    .map(|p| (p.name.clone(), p.type_id, p.settable))
                    .collect()
            })
            .unwrap_or_default();
        let available = registry
            .class_entry(to)
            .map(|class| class.settable_property_names())
            .unwrap_or_else(|| "<none>".to_string());

        for (name, raw) in members {
            let spec = specs
                .iter()
                .find(|(spec_name, _, _)| spec_name.eq_ignore_ascii_case(name));
            match spec {
                Some((spec_name, declared, settable)) => {
                    if !*settable {
                        self.member_error(CastError::MemberSetFailure {
                            name: spec_name.clone(),
                            type_name: type_name.clone(),
                            reason: "the property is read-only".to_string(),
                        })?;
                        continue;
                    }
                    let assigned = if recursive {
                        match self.convert_in(registry, raw, *declared, true, culture, None) {
                            Ok(converted) => converted,
                            // The raw value is assigned as-is when the
                            // declared-type conversion fails.
                            Err(_) => raw.clone(),
                        }
                    } else {
                        raw.clone()
                    };
                    match target {
                        Value::Object(obj) => obj.set(spec_name, assigned),
                        Value::Bag(bag) => bag.properties.push(BagProperty {
                            name: spec_name.clone(),
                            type_name: registry.name_of(*declared),
                            value: assigned,
                        }),
                        _ => {
                            self.member_error(CastError::MemberSetFailure {
                                name: spec_name.clone(),
                                type_name: type_name.clone(),
                                reason: "the constructed value does not accept properties"
                                    .to_string(),
                            })?;
                        }
                    }
                }
                None => {
                    self.member_error(CastError::MemberNotFound {
                        name: name.clone(),
                        type_name: type_name.clone(),
                        available: available.clone(),
                    })?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ListValue;

    fn engine() -> ConversionEngine {
        ConversionEngine::new()
    }

    #[test]
    fn basic_identity() {
        let engine = engine();
        let v = Value::I32(42);
        assert_eq!(engine.convert_to(&v, well_known::INT32).unwrap(), v);
    }

    #[test]
    fn debase_retry_converts_wrapped_value() {
        let engine = engine();
        let bag = Value::Bag(Box::new(PropertyBag::wrapping(Value::Str(
            "42".to_string(),
        ))));
        assert_eq!(
            engine.convert_to(&bag, well_known::INT32).unwrap(),
            Value::I32(42)
        );
    }

    #[test]
    fn original_text_survives_rendering() {
        let engine = engine();
        let bag = Value::Bag(Box::new(
            PropertyBag::wrapping(Value::I32(16)).with_original_text("0x10"),
        ));
        assert_eq!(
            engine.convert_to(&bag, well_known::STRING).unwrap(),
            Value::Str("0x10".to_string())
        );
    }

    #[test]
    fn constrained_mode_rejects_non_core_destinations() {
        let engine = engine();
        let widget = engine.registry_mut().register_class(
            "Widget",
            TypeCaps::empty(),
            crate::types::ClassEntry {
                parse_plain: Some(Arc::new(|text, _| Ok(Value::Str(text.to_string())))),
                ..Default::default()
            },
        );

        engine.set_language_mode(LanguageMode::Constrained);
        let err = engine
            .convert_to(&Value::Str("x".to_string()), widget)
            .unwrap_err();
        assert!(matches!(err, CastError::NotSupported { .. }));

        // Core destinations still work.
        assert!(
            engine
                .convert_to(&Value::Str("5".to_string()), well_known::INT32)
                .is_ok()
        );

        engine.set_language_mode(LanguageMode::Unrestricted);
        assert!(engine.convert_to(&Value::Str("x".to_string()), widget).is_ok());
    }

    #[test]
    fn try_convert_absorbs_conversion_failures() {
        let engine = engine();
        assert_eq!(
            engine
                .try_convert_to(&Value::Str("abc".to_string()), well_known::INT32)
                .unwrap(),
            None
        );
        assert_eq!(
            engine
                .try_convert_to(&Value::Str("42".to_string()), well_known::INT32)
                .unwrap(),
            Some(Value::I32(42))
        );
    }

    #[test]
    fn scalar_to_array_is_value_dependent() {
        let engine = engine();
        let out = engine
            .convert_to(
                &Value::I32(7),
                TypeId::array_of(well_known::STRING),
            )
            .unwrap();
        assert_eq!(
            out,
            Value::List(ListValue::of(
                well_known::STRING,
                vec![Value::Str("7".to_string())]
            ))
        );
    }

    #[test]
    fn session_factory_creates_session() {
        let engine = engine();
        let out = engine
            .convert_to(&Value::Str("server01".to_string()), well_known::SESSION)
            .unwrap();
        assert!(matches!(out, Value::Session(_)));
    }

    #[test]
    fn document_parses_rendered_text() {
        let engine = engine();
        let out = engine
            .convert_to(
                &Value::Str("{\"a\": 1}".to_string()),
                well_known::DOCUMENT,
            )
            .unwrap();
        assert!(matches!(out, Value::Document(_)));

        let err = engine
            .convert_to(&Value::Str("not json".to_string()), well_known::DOCUMENT)
            .unwrap_err();
        assert!(matches!(err, CastError::InvalidCast { .. }));
    }

    #[test]
    fn reference_cell_wraps_any_value() {
        let engine = engine();
        let out = engine
            .convert_to(&Value::I32(3), well_known::REFERENCE)
            .unwrap();
        assert_eq!(out, Value::Ref(Box::new(Value::I32(3))));

        let nulled = engine
            .convert_to(&Value::Null, well_known::REFERENCE)
            .unwrap();
        assert_eq!(nulled, Value::Ref(Box::new(Value::Null)));
    }
}
