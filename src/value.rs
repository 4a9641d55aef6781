//! The dynamic runtime value model.
//!
//! [`Value`] is the slot type every conversion operates on. It carries the
//! language's scalars, the eleven numeric domains, collections, callables,
//! and the opaque property-bag wrapper. The engine never mutates a value it
//! converts; strategies produce fresh values.
//!
//! The property bag ([`PropertyBag`]) is consumed, never constructed from
//! scratch by the engine: it may wrap a distinguishable base object, carry
//! ad hoc named properties with no backing object (a "pure bag"), and
//! preserve the original source text of a literal across conversions.

use std::cmp::Ordering;
use std::fmt;

use crate::numeric::{self, Decimal};
use crate::registry::TypeRegistry;
use crate::type_id::{TypeId, well_known};

// ============================================================================
// Culture
// ============================================================================

/// Format/comparison culture carried through conversions.
///
/// Number rendering is always invariant regardless of culture; the culture
/// only affects string comparison folding and is passed through to custom
/// converters and parse methods.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Culture {
    /// The invariant culture; the default everywhere.
    #[default]
    Invariant,
    /// A named host culture, forwarded to pluggable converters.
    Named(String),
}

impl Culture {
    /// Compare two strings, optionally folding case.
    pub fn compare_strings(&self, a: &str, b: &str, ignore_case: bool) -> Ordering {
        if ignore_case {
            a.to_lowercase().cmp(&b.to_lowercase())
        } else {
            a.cmp(b)
        }
    }

    /// Equality via [`Culture::compare_strings`].
    pub fn strings_equal(&self, a: &str, b: &str, ignore_case: bool) -> bool {
        self.compare_strings(a, b, ignore_case) == Ordering::Equal
    }
}

// ============================================================================
// Composite value payloads
// ============================================================================

/// An array value with a fixed element type (`any` for untyped arrays).
#[derive(Debug, Clone, PartialEq)]
pub struct ListValue {
    /// Element type identity; `well_known::ANY` for untyped arrays.
    pub element: TypeId,
    /// The items.
    pub items: Vec<Value>,
}

impl ListValue {
    /// An untyped array.
    pub fn untyped(items: Vec<Value>) -> ListValue {
        ListValue {
            element: well_known::ANY,
            items,
        }
    }

    /// A typed array.
    pub fn of(element: TypeId, items: Vec<Value>) -> ListValue {
        ListValue { element, items }
    }
}

/// An ordered key/value store. Iteration order is insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DictValue {
    /// The entries, in insertion order.
    pub entries: Vec<(Value, Value)>,
}

impl DictValue {
    /// Build from entries.
    pub fn from_entries(entries: Vec<(Value, Value)>) -> DictValue {
        DictValue { entries }
    }
}

/// A script block: deferred code bindable as a callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBlock {
    /// The block's source text.
    pub body: String,
}

/// A method group: a named set of overloads on some object, described by a
/// registered method-group type (see `TypeKind::MethodGroup`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodGroup {
    /// The registered method-group type carrying the overload signatures.
    pub type_id: TypeId,
    /// The method name, for display.
    pub name: String,
}

/// The target a delegate was bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelegateTarget {
    /// A script block bound as the delegate body.
    Block(ScriptBlock),
    /// A specific overload of a method group.
    Overload {
        /// The method-group type the overload came from.
        group: TypeId,
        /// The method name.
        name: String,
        /// Index of the chosen overload in declaration order.
        index: usize,
    },
}

/// A callable bound to a specific delegate type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundDelegate {
    /// The delegate type this callable satisfies.
    pub delegate: TypeId,
    /// What it invokes.
    pub target: DelegateTarget,
}

/// A value of a registered enum type, stored as the underlying bit pattern
/// zero-extended to 64 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumValue {
    /// The enum type.
    pub type_id: TypeId,
    /// The underlying value's bit pattern, masked to the underlying width.
    pub bits: u64,
}

/// An instance of a registered class type: a named, ordered field set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScriptObject {
    /// The class type.
    pub type_id: TypeId,
    /// Field values in declaration order.
    pub fields: Vec<(String, Value)>,
}

impl ScriptObject {
    /// Look up a field case-insensitively.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Set a field, replacing an existing one case-insensitively.
    pub fn set(&mut self, name: &str, value: Value) {
        if let Some(slot) = self
            .fields
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            slot.1 = value;
        } else {
            self.fields.push((name.to_string(), value));
        }
    }
}

/// A handle to an external session resource, produced by the session type's
/// static factory from a connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    /// The connection target the session was created from.
    pub target: String,
}

// ============================================================================
// Property bag
// ============================================================================

/// One named, typed property carried by a bag.
#[derive(Debug, Clone, PartialEq)]
pub struct BagProperty {
    /// Property name.
    pub name: String,
    /// Property value.
    pub value: Value,
    /// Declared type name of the value.
    pub type_name: String,
}

/// The opaque property-bag wrapper.
///
/// The engine only unwraps one level (`base`), iterates `properties`, and
/// reads `original_text`; it never reaches into anything else.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyBag {
    /// The wrapped base object, if any. A bag without one is a "pure bag".
    pub base: Option<Value>,
    /// Ad hoc named properties, in attachment order.
    pub properties: Vec<BagProperty>,
    /// Exact source text of the literal this value came from, if preserved.
    pub original_text: Option<String>,
    /// Most-derived-first type names attached to the bag.
    pub type_names: Vec<String>,
}

impl PropertyBag {
    /// Wrap a value with no extra properties.
    pub fn wrapping(base: Value) -> PropertyBag {
        PropertyBag {
            base: Some(base),
            ..PropertyBag::default()
        }
    }

    /// A pure bag carrying only named properties.
    pub fn pure(properties: Vec<BagProperty>) -> PropertyBag {
        PropertyBag {
            properties,
            ..PropertyBag::default()
        }
    }

    /// Attach original source text.
    pub fn with_original_text(mut self, text: impl Into<String>) -> PropertyBag {
        self.original_text = Some(text.into());
        self
    }

    /// True when there is no backing object.
    pub fn is_pure(&self) -> bool {
        self.base.is_none()
    }
}

// ============================================================================
// Value
// ============================================================================

/// A dynamic runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Language null.
    Null,
    /// The empty-result sentinel, distinct from null in origin but
    /// null-like for conversion purposes.
    Void,
    /// Boolean.
    Bool(bool),
    /// Signed 8-bit integer.
    I8(i8),
    /// Signed 16-bit integer.
    I16(i16),
    /// Signed 32-bit integer.
    I32(i32),
    /// Signed 64-bit integer.
    I64(i64),
    /// Unsigned 8-bit integer.
    U8(u8),
    /// Unsigned 16-bit integer.
    U16(u16),
    /// Unsigned 32-bit integer.
    U32(u32),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// 32-bit float.
    F32(f32),
    /// 64-bit float.
    F64(f64),
    /// Scaled decimal.
    Decimal(Decimal),
    /// Character.
    Char(char),
    /// String.
    Str(String),
    /// Array (typed or untyped).
    List(ListValue),
    /// Ordered key/value store.
    Dict(DictValue),
    /// Bulk string collection.
    StringList(Vec<String>),
    /// Command switch flag with its own truth state.
    Switch(bool),
    /// Reference cell.
    Ref(Box<Value>),
    /// Structured document.
    Document(serde_json::Value),
    /// Script block.
    Block(ScriptBlock),
    /// Method group.
    Methods(MethodGroup),
    /// Bound delegate.
    Delegate(BoundDelegate),
    /// Value of a registered enum type.
    Enum(EnumValue),
    /// Instance of a registered class type.
    Object(ScriptObject),
    /// External session resource.
    Session(SessionHandle),
    /// Property-bag wrapper.
    Bag(Box<PropertyBag>),
}

impl Value {
    /// True for language null and the empty-result sentinel.
    pub fn is_null_like(&self) -> bool {
        matches!(self, Value::Null | Value::Void)
    }

    /// The dynamic type identity of this value.
    ///
    /// Null-like values map to the null sentinel type so they are cacheable
    /// like any other source type.
    pub fn type_id(&self) -> TypeId {
        match self {
            Value::Null | Value::Void => well_known::NULL,
            Value::Bool(_) => well_known::BOOL,
            Value::I8(_) => well_known::INT8,
            Value::I16(_) => well_known::INT16,
            Value::I32(_) => well_known::INT32,
            Value::I64(_) => well_known::INT64,
            Value::U8(_) => well_known::UINT8,
            Value::U16(_) => well_known::UINT16,
            Value::U32(_) => well_known::UINT32,
            Value::U64(_) => well_known::UINT64,
            Value::F32(_) => well_known::FLOAT,
            Value::F64(_) => well_known::DOUBLE,
            Value::Decimal(_) => well_known::DECIMAL,
            Value::Char(_) => well_known::CHAR,
            Value::Str(_) => well_known::STRING,
            Value::List(list) => TypeId::array_of(list.element),
            Value::Dict(_) => well_known::DICT,
            Value::StringList(_) => well_known::STRING_LIST,
            Value::Switch(_) => well_known::SWITCH,
            Value::Ref(_) => well_known::REFERENCE,
            Value::Document(_) => well_known::DOCUMENT,
            Value::Block(_) => well_known::BLOCK,
            Value::Methods(group) => group.type_id,
            Value::Delegate(bound) => bound.delegate,
            Value::Enum(e) => e.type_id,
            Value::Object(obj) => obj.type_id,
            Value::Session(_) => well_known::SESSION,
            Value::Bag(_) => well_known::BAG,
        }
    }

    /// Unwrap a property bag by exactly one level. Non-bags return
    /// themselves; a pure bag returns itself too (there is nothing inside).
    pub fn unwrap_bag(&self) -> &Value {
        match self {
            Value::Bag(bag) => bag.base.as_ref().unwrap_or(self),
            other => other,
        }
    }

    /// Render this value as display text.
    ///
    /// This is the generic "render to string" path: numeric values render
    /// culture-invariantly, arrays join their rendered items with spaces,
    /// enums render their member names, and a bag with preserved original
    /// text renders exactly that text.
    pub fn render(&self, registry: &TypeRegistry) -> String {
        match self {
            Value::Null | Value::Void => String::new(),
            Value::Bool(b) | Value::Switch(b) => {
                if *b {
                    "True".to_string()
                } else {
                    "False".to_string()
                }
            }
            Value::Char(c) => c.to_string(),
            Value::Str(s) => s.clone(),
            Value::List(list) => list
                .items
                .iter()
                .map(|item| item.render(registry))
                .collect::<Vec<_>>()
                .join(" "),
            Value::StringList(items) => items.join(" "),
            Value::Dict(dict) => {
                let body = dict
                    .entries
                    .iter()
                    .map(|(k, v)| format!("{} = {}", k.render(registry), v.render(registry)))
                    .collect::<Vec<_>>()
                    .join("; ");
                format!("{{{body}}}")
            }
            Value::Ref(inner) => inner.render(registry),
            Value::Document(doc) => doc.to_string(),
            Value::Block(block) => block.body.clone(),
            Value::Methods(group) => group.name.clone(),
            Value::Delegate(bound) => registry.name_of(bound.delegate),
            Value::Enum(e) => registry.render_enum(e),
            Value::Object(obj) => registry.name_of(obj.type_id),
            Value::Session(session) => session.target.clone(),
            Value::Bag(bag) => {
                if let Some(text) = &bag.original_text {
                    return text.clone();
                }
                if let Some(base) = &bag.base {
                    return base.render(registry);
                }
                let body = bag
                    .properties
                    .iter()
                    .map(|p| format!("{} = {}", p.name, p.value.render(registry)))
                    .collect::<Vec<_>>()
                    .join("; ");
                format!("{{{body}}}")
            }
            other => numeric::render_numeric(other).unwrap_or_default(),
        }
    }

    /// Natural ordering between two values of the same shape, for the
    /// compare path when both sides are neither strings nor numeric.
    pub fn natural_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Switch(a), Value::Switch(b)) => Some(a.cmp(b)),
            (Value::Char(a), Value::Char(b)) => Some(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => numeric::compare_numeric(self, other),
        }
    }
}

impl fmt::Display for Value {
    /// Registry-free rendering, for diagnostics only. Enum and object values
    /// fall back to their raw payloads; prefer [`Value::render`] when a
    /// registry is available.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Enum(e) => write!(f, "{}", e.bits),
            Value::Object(_) => write!(f, "<object>"),
            other => {
                let registry = TypeRegistry::new();
                write!(f, "{}", other.render(&registry))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_like_values() {
        assert!(Value::Null.is_null_like());
        assert!(Value::Void.is_null_like());
        assert!(!Value::Bool(false).is_null_like());
        assert_eq!(Value::Null.type_id(), well_known::NULL);
        assert_eq!(Value::Void.type_id(), well_known::NULL);
    }

    #[test]
    fn typed_array_identity() {
        let ints = Value::List(ListValue::of(well_known::INT32, vec![Value::I32(1)]));
        assert_eq!(ints.type_id(), TypeId::array_of(well_known::INT32));

        let untyped = Value::List(ListValue::untyped(vec![]));
        assert_eq!(untyped.type_id(), TypeId::array_of(well_known::ANY));
    }

    #[test]
    fn bag_unwraps_one_level() {
        let inner = Value::I32(42);
        let bag = Value::Bag(Box::new(PropertyBag::wrapping(inner.clone())));
        assert_eq!(bag.unwrap_bag(), &inner);

        let pure = Value::Bag(Box::new(PropertyBag::pure(vec![])));
        assert_eq!(pure.unwrap_bag(), &pure);

        // Only one level: a bag wrapping a bag exposes the inner bag.
        let nested = Value::Bag(Box::new(PropertyBag::wrapping(bag.clone())));
        assert_eq!(nested.unwrap_bag(), &bag);
    }

    #[test]
    fn render_basics() {
        let registry = TypeRegistry::with_builtins();
        assert_eq!(Value::Null.render(&registry), "");
        assert_eq!(Value::Bool(true).render(&registry), "True");
        assert_eq!(Value::I32(42).render(&registry), "42");
        assert_eq!(Value::F64(3.14).render(&registry), "3.14");
        assert_eq!(Value::Str("hi".to_string()).render(&registry), "hi");

        let list = Value::List(ListValue::untyped(vec![
            Value::I32(1),
            Value::I32(2),
            Value::I32(3),
        ]));
        assert_eq!(list.render(&registry), "1 2 3");
    }

    #[test]
    fn render_prefers_original_text() {
        let registry = TypeRegistry::with_builtins();
        let bag = Value::Bag(Box::new(
            PropertyBag::wrapping(Value::I32(16)).with_original_text("0x10"),
        ));
        assert_eq!(bag.render(&registry), "0x10");
    }

    #[test]
    fn object_field_access_is_case_insensitive() {
        let mut obj = ScriptObject {
            type_id: TypeId::from_name("Point"),
            fields: vec![("X".to_string(), Value::I32(1))],
        };
        assert_eq!(obj.get("x"), Some(&Value::I32(1)));
        obj.set("x", Value::I32(2));
        assert_eq!(obj.get("X"), Some(&Value::I32(2)));
        assert_eq!(obj.fields.len(), 1);
    }

    #[test]
    fn culture_string_comparison() {
        let culture = Culture::Invariant;
        assert!(culture.strings_equal("Apple", "apple", true));
        assert!(!culture.strings_equal("Apple", "apple", false));
        assert_eq!(
            culture.compare_strings("a", "b", false),
            Ordering::Less
        );
    }
}
