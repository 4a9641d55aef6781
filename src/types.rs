//! Script-type descriptions.
//!
//! Rust has no runtime reflection, so the conversion engine queries a
//! hand-rolled description of every script-level type: what shape it has,
//! which constructors/parse methods/cast operators it exposes, which
//! properties it carries, and a handful of capability bits. The
//! [`TypeRegistry`](crate::registry::TypeRegistry) stores one [`TypeEntry`]
//! per type identity.
//!
//! Invokable members are ordinary closures resolved once at registration
//! time, so executing a cached strategy never searches for anything.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use crate::numeric::NumericKind;
use crate::type_id::TypeId;
use crate::value::{Culture, Value};

/// Result type for native member invocations. The error side is the inner
/// failure message; the dispatcher wraps it with full cast context.
pub type NativeResult = std::result::Result<Value, String>;

/// A constructor body.
pub type CtorFn = Arc<dyn Fn(&[Value]) -> NativeResult + Send + Sync>;

/// A parse-method body (text plus culture).
pub type ParseFn = Arc<dyn Fn(&str, &Culture) -> NativeResult + Send + Sync>;

/// A cast-operator body.
pub type CastFn = Arc<dyn Fn(&Value) -> NativeResult + Send + Sync>;

/// A constructor body taking a materialized element sequence.
pub type SeqCtorFn = Arc<dyn Fn(Vec<Value>) -> NativeResult + Send + Sync>;

/// The generic convertible-capability hook: convert a value of this type to
/// an arbitrary destination.
pub type ConvertibleFn = Arc<dyn Fn(&Value, TypeId) -> NativeResult + Send + Sync>;

bitflags! {
    /// Capability bits a type entry carries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TypeCaps: u16 {
        /// Value-shaped: conversions from null cannot produce it.
        const VALUE_TYPE = 1 << 0;
        /// Stack-only: never participates in conversion at all.
        const STACK_ONLY = 1 << 1;
        /// Hidden from the engine: construction/member access forbidden.
        const HIDDEN = 1 << 2;
        /// Abstract: cannot be constructed.
        const ABSTRACT = 1 << 3;
        /// Core type: allowed as a destination in constrained mode.
        const CORE = 1 << 4;
        /// Declares a custom converter (the converter-attribute analog).
        const HAS_CONVERTER = 1 << 5;
        /// Primitive machine-word type; decimal is a value type but not
        /// primitive.
        const PRIMITIVE = 1 << 6;
        /// Behaves as an ordered key/value store.
        const DICT_LIKE = 1 << 7;
    }
}

/// Scalar shapes of the built-in primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// `void`.
    Void,
    /// `bool`.
    Bool,
    /// `char`.
    Char,
    /// `string`.
    Str,
    /// One of the numeric domains.
    Numeric(NumericKind),
}

/// Description of an enum type.
#[derive(Debug, Clone)]
pub struct EnumSpec {
    /// Underlying integer domain.
    pub underlying: NumericKind,
    /// Members as `(name, value)`, in declaration order.
    pub members: Vec<(String, i64)>,
    /// Whether the type is declared as a flags enum.
    pub is_flags: bool,
}

/// A single-signature constructor.
#[derive(Clone)]
pub struct Constructor {
    /// Parameter types.
    pub params: Vec<TypeId>,
    /// Body.
    pub invoke: CtorFn,
}

/// A cast operator declared on a class.
#[derive(Clone)]
pub struct CastOperator {
    /// Operand type.
    pub source: TypeId,
    /// Result type.
    pub result: TypeId,
    /// True for implicit operators, false for explicit.
    pub implicit: bool,
    /// Body.
    pub invoke: CastFn,
}

/// A public property or field exposed for property-bag application.
#[derive(Debug, Clone)]
pub struct PropertySpec {
    /// Property name.
    pub name: String,
    /// Declared value type.
    pub type_id: TypeId,
    /// Whether the engine may assign it.
    pub settable: bool,
}

/// A constructor accepting an enumerable of a fixed element type — the
/// closed-generic-collection construction seam.
#[derive(Clone)]
pub struct ElementCtor {
    /// Element type of the collection.
    pub element: TypeId,
    /// Body, invoked with the materialized converted elements.
    pub invoke: SeqCtorFn,
}

/// A delegate or method signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSig {
    /// Parameter types.
    pub params: Vec<TypeId>,
    /// Return type.
    pub ret: TypeId,
    /// Per-parameter by-ref markers. By-ref parameters require exact type
    /// matches during delegate binding.
    pub by_ref: Vec<bool>,
}

impl MethodSig {
    /// A by-value signature.
    pub fn new(params: Vec<TypeId>, ret: TypeId) -> MethodSig {
        let by_ref = vec![false; params.len()];
        MethodSig {
            params,
            ret,
            by_ref,
        }
    }
}

/// Everything a class-shaped type can expose to the synthesizer.
#[derive(Clone, Default)]
pub struct ClassEntry {
    /// Base type for assignability, if any.
    pub base: Option<TypeId>,
    /// Declared constructors, in declaration order.
    pub constructors: Vec<Constructor>,
    /// A parse method taking `(text, culture)`. Preferred over the plain
    /// form when both exist.
    pub parse_with_culture: Option<ParseFn>,
    /// A parse method taking only the text.
    pub parse_plain: Option<ParseFn>,
    /// A static factory from a string. Deliberately narrow: only consulted
    /// for the session type; there is no general static-factory discovery.
    pub create_from_string: Option<ParseFn>,
    /// Cast operators declared on this type, in declaration order.
    pub casts: Vec<CastOperator>,
    /// Public properties/fields.
    pub properties: Vec<PropertySpec>,
    /// Enumerable-taking constructor, if this is a collection type.
    pub element_ctor: Option<ElementCtor>,
    /// Generic convertible capability, if implemented.
    pub convertible: Option<ConvertibleFn>,
}

impl ClassEntry {
    /// The no-argument constructor, if declared.
    pub fn no_arg_constructor(&self) -> Option<&Constructor> {
        self.constructors.iter().find(|c| c.params.is_empty())
    }

    /// Names of the settable properties, for error messages.
    pub fn settable_property_names(&self) -> String {
        let names: Vec<&str> = self
            .properties
            .iter()
            .filter(|p| p.settable)
            .map(|p| p.name.as_str())
            .collect();
        if names.is_empty() {
            "<none>".to_string()
        } else {
            names.join(", ")
        }
    }
}

/// The shape of a registered type.
#[derive(Clone)]
pub enum TypeKind {
    /// A built-in scalar.
    Scalar(ScalarKind),
    /// An enum.
    Enum(EnumSpec),
    /// A class with members.
    Class(ClassEntry),
    /// A delegate type with a fixed signature.
    Delegate(MethodSig),
    /// A method group carrying overload signatures in declaration order.
    MethodGroup(Vec<MethodSig>),
    /// A typed array.
    Array {
        /// Element type.
        element: TypeId,
    },
    /// A nullable wrapper around another type.
    Nullable {
        /// The wrapped type.
        underlying: TypeId,
    },
    /// A built-in shape the synthesizer special-cases by identity
    /// (dict, ref, document, bag, ...).
    Marker,
}

/// One registered type: identity, display name, capabilities, shape.
#[derive(Clone)]
pub struct TypeEntry {
    /// The identity.
    pub id: TypeId,
    /// Qualified display name.
    pub name: String,
    /// Capability bits.
    pub caps: TypeCaps,
    /// Shape and members.
    pub kind: TypeKind,
}

impl TypeEntry {
    /// Build an entry whose identity derives from its name.
    pub fn new(name: impl Into<String>, caps: TypeCaps, kind: TypeKind) -> TypeEntry {
        let name = name.into();
        TypeEntry {
            id: TypeId::from_name(&name),
            name,
            caps,
            kind,
        }
    }
}

impl fmt::Debug for TypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            TypeKind::Scalar(_) => "scalar",
            TypeKind::Enum(_) => "enum",
            TypeKind::Class(_) => "class",
            TypeKind::Delegate(_) => "delegate",
            TypeKind::MethodGroup(_) => "method-group",
            TypeKind::Array { .. } => "array",
            TypeKind::Nullable { .. } => "nullable",
            TypeKind::Marker => "marker",
        };
        f.debug_struct("TypeEntry")
            .field("name", &self.name)
            .field("kind", &kind)
            .field("caps", &self.caps)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_id::well_known;

    #[test]
    fn class_entry_finds_no_arg_constructor() {
        let mut entry = ClassEntry::default();
        assert!(entry.no_arg_constructor().is_none());

        entry.constructors.push(Constructor {
            params: vec![well_known::STRING],
            invoke: Arc::new(|_| Ok(Value::Null)),
        });
        entry.constructors.push(Constructor {
            params: vec![],
            invoke: Arc::new(|_| Ok(Value::Null)),
        });
        let found = entry.no_arg_constructor().unwrap();
        assert!(found.params.is_empty());
    }

    #[test]
    fn settable_property_listing() {
        let entry = ClassEntry {
            properties: vec![
                PropertySpec {
                    name: "X".to_string(),
                    type_id: well_known::INT32,
                    settable: true,
                },
                PropertySpec {
                    name: "Tag".to_string(),
                    type_id: well_known::STRING,
                    settable: false,
                },
            ],
            ..ClassEntry::default()
        };
        assert_eq!(entry.settable_property_names(), "X");
    }

    #[test]
    fn method_sig_defaults_by_value() {
        let sig = MethodSig::new(vec![well_known::INT32], well_known::VOID);
        assert_eq!(sig.by_ref, vec![false]);
    }

    #[test]
    fn entry_identity_matches_name() {
        let entry = TypeEntry::new("Widget", TypeCaps::empty(), TypeKind::Marker);
        assert_eq!(entry.id, TypeId::from_name("Widget"));
    }
}
