//! TypeRegistry — central storage for script-type descriptions.
//!
//! Provides O(1) lookup by [`TypeId`] and the capability queries the
//! strategy synthesizer dispatches on. Built-in types are registered by
//! [`TypeRegistry::with_builtins`]; hosts add their own enums, classes,
//! delegates and collections on top.
//!
//! # Thread Safety
//!
//! The registry itself is not thread-safe. Registration happens
//! single-threaded during engine setup; afterwards the engine wraps it in a
//! read/write lock and treats it as effectively read-only.

use rustc_hash::FxHashMap;

use crate::numeric::{ALL_KINDS, NumericKind};
use crate::type_id::{TypeId, well_known};
use crate::types::{
    ClassEntry, EnumSpec, MethodSig, ParseFn, ScalarKind, TypeCaps, TypeEntry, TypeKind,
};
use crate::value::{EnumValue, SessionHandle, Value};

/// Central storage for all script-type descriptions.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: FxHashMap<TypeId, TypeEntry>,
}

impl TypeRegistry {
    /// An empty registry.
    pub fn new() -> TypeRegistry {
        TypeRegistry::default()
    }

    /// A registry with every built-in type pre-registered.
    pub fn with_builtins() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register_builtins();
        registry
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Register an entry, replacing any previous registration of the same
    /// identity. Returns the entry's identity.
    pub fn register(&mut self, entry: TypeEntry) -> TypeId {
        let id = entry.id;
        self.types.insert(id, entry);
        id
    }

    /// Register a class-shaped type.
    pub fn register_class(
        &mut self,
        name: impl Into<String>,
        caps: TypeCaps,
        entry: ClassEntry,
    ) -> TypeId {
        self.register(TypeEntry::new(name, caps, TypeKind::Class(entry)))
    }

    /// Register an enum type.
    pub fn register_enum(
        &mut self,
        name: impl Into<String>,
        underlying: NumericKind,
        members: &[(&str, i64)],
        is_flags: bool,
    ) -> TypeId {
        let spec = EnumSpec {
            underlying,
            members: members
                .iter()
                .map(|(n, v)| (n.to_string(), *v))
                .collect(),
            is_flags,
        };
        self.register(TypeEntry::new(
            name,
            TypeCaps::VALUE_TYPE,
            TypeKind::Enum(spec),
        ))
    }

    /// Register a delegate type with a fixed signature.
    pub fn register_delegate(&mut self, name: impl Into<String>, sig: MethodSig) -> TypeId {
        self.register(TypeEntry::new(
            name,
            TypeCaps::empty(),
            TypeKind::Delegate(sig),
        ))
    }

    /// Register a method-group type carrying overload signatures in
    /// declaration order.
    pub fn register_method_group(
        &mut self,
        name: impl Into<String>,
        overloads: Vec<MethodSig>,
    ) -> TypeId {
        self.register(TypeEntry::new(
            name,
            TypeCaps::empty(),
            TypeKind::MethodGroup(overloads),
        ))
    }

    /// Register a nullable wrapper type around `underlying`.
    pub fn register_nullable(&mut self, underlying: TypeId) -> TypeId {
        let name = format!("{}?", self.name_of(underlying));
        self.register(TypeEntry::new(
            name,
            TypeCaps::empty(),
            TypeKind::Nullable { underlying },
        ))
    }

    /// Register the array type of `element`. The identity is derived with
    /// [`TypeId::array_of`], not hashed from the display name.
    pub fn register_array_of(&mut self, element: TypeId) -> TypeId {
        let id = TypeId::array_of(element);
        // An array is core exactly when its element type is.
        let caps = self.caps(element) & TypeCaps::CORE;
        let entry = TypeEntry {
            id,
            name: format!("{}[]", self.name_of(element)),
            caps,
            kind: TypeKind::Array { element },
        };
        self.register(entry)
    }

    fn register_builtins(&mut self) {
        use TypeCaps as C;

        let core_value = C::VALUE_TYPE | C::CORE;
        self.register(TypeEntry::new(
            "void",
            core_value,
            TypeKind::Scalar(ScalarKind::Void),
        ));
        self.register(TypeEntry::new(
            "bool",
            core_value | C::PRIMITIVE,
            TypeKind::Scalar(ScalarKind::Bool),
        ));
        self.register(TypeEntry::new(
            "char",
            core_value | C::PRIMITIVE,
            TypeKind::Scalar(ScalarKind::Char),
        ));
        self.register(TypeEntry::new(
            "string",
            C::CORE,
            TypeKind::Scalar(ScalarKind::Str),
        ));

        for kind in ALL_KINDS {
            // Decimal is a value type but not a primitive, which matters to
            // the dictionary-to-value-type construction rule.
            let caps = if kind == NumericKind::Decimal {
                core_value
            } else {
                core_value | C::PRIMITIVE
            };
            self.register(TypeEntry::new(
                kind.name(),
                caps,
                TypeKind::Scalar(ScalarKind::Numeric(kind)),
            ));
        }

        self.register(TypeEntry::new("null", C::CORE, TypeKind::Marker));
        self.register(TypeEntry::new("any", C::CORE, TypeKind::Marker));
        self.register(TypeEntry::new(
            "list",
            C::CORE | C::ABSTRACT,
            TypeKind::Marker,
        ));
        self.register(TypeEntry::new(
            "dict",
            C::CORE | C::DICT_LIKE,
            TypeKind::Marker,
        ));
        self.register(TypeEntry::new("ref", C::CORE, TypeKind::Marker));
        self.register(TypeEntry::new(
            "switch",
            C::CORE | C::VALUE_TYPE,
            TypeKind::Marker,
        ));
        self.register(TypeEntry::new("block", C::CORE, TypeKind::Marker));
        self.register(TypeEntry::new("document", C::CORE, TypeKind::Marker));
        self.register(TypeEntry::new("stringlist", C::CORE, TypeKind::Marker));
        self.register(TypeEntry::new("bag", C::CORE, TypeKind::Marker));
        self.register(TypeEntry::new("__purebag", C::CORE, TypeKind::Marker));
        self.register(TypeEntry::new("__customobject", C::CORE, TypeKind::Marker));

        // The one built-in type constructed through a static string factory.
        let session_factory: ParseFn = std::sync::Arc::new(|text, _culture| {
            if text.trim().is_empty() {
                return Err("session target must not be empty".to_string());
            }
            Ok(Value::Session(SessionHandle {
                target: text.trim().to_string(),
            }))
        });
        self.register_class(
            "session",
            C::CORE,
            ClassEntry {
                create_from_string: Some(session_factory),
                ..ClassEntry::default()
            },
        );

        let scalar_ids: Vec<TypeId> = [
            well_known::ANY,
            well_known::BOOL,
            well_known::CHAR,
            well_known::STRING,
        ]
        .into_iter()
        .chain(ALL_KINDS.into_iter().map(|k| k.type_id()))
        .collect();
        for id in scalar_ids {
            self.register_array_of(id);
        }
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    /// Get a type entry by identity.
    pub fn get(&self, id: TypeId) -> Option<&TypeEntry> {
        self.types.get(&id)
    }

    /// Check whether an identity is registered.
    pub fn contains(&self, id: TypeId) -> bool {
        self.types.contains_key(&id)
    }

    /// Display name for an identity; unregistered identities render as a
    /// placeholder rather than failing.
    pub fn name_of(&self, id: TypeId) -> String {
        match self.types.get(&id) {
            Some(entry) => entry.name.clone(),
            None if id == well_known::NULL => "null".to_string(),
            None => "<unknown>".to_string(),
        }
    }

    /// Capability bits for an identity (empty when unregistered).
    pub fn caps(&self, id: TypeId) -> TypeCaps {
        self.types
            .get(&id)
            .map(|e| e.caps)
            .unwrap_or_else(TypeCaps::empty)
    }

    /// True for value-shaped types.
    pub fn is_value_type(&self, id: TypeId) -> bool {
        self.caps(id).contains(TypeCaps::VALUE_TYPE)
    }

    /// Element type of a typed array.
    pub fn element_type(&self, id: TypeId) -> Option<TypeId> {
        match self.types.get(&id)?.kind {
            TypeKind::Array { element } => Some(element),
            _ => None,
        }
    }

    /// Underlying type of a nullable wrapper.
    pub fn nullable_underlying(&self, id: TypeId) -> Option<TypeId> {
        match self.types.get(&id)?.kind {
            TypeKind::Nullable { underlying } => Some(underlying),
            _ => None,
        }
    }

    /// Enum description, if the identity is an enum type.
    pub fn enum_spec(&self, id: TypeId) -> Option<&EnumSpec> {
        match &self.types.get(&id)?.kind {
            TypeKind::Enum(spec) => Some(spec),
            _ => None,
        }
    }

    /// Class description, if the identity is class-shaped.
    pub fn class_entry(&self, id: TypeId) -> Option<&ClassEntry> {
        match &self.types.get(&id)?.kind {
            TypeKind::Class(entry) => Some(entry),
            _ => None,
        }
    }

    /// Delegate signature, if the identity is a delegate type.
    pub fn delegate_sig(&self, id: TypeId) -> Option<&MethodSig> {
        match &self.types.get(&id)?.kind {
            TypeKind::Delegate(sig) => Some(sig),
            _ => None,
        }
    }

    /// Method-group overload signatures, in declaration order.
    pub fn method_sigs(&self, id: TypeId) -> Option<&[MethodSig]> {
        match &self.types.get(&id)?.kind {
            TypeKind::MethodGroup(sigs) => Some(sigs),
            _ => None,
        }
    }

    /// True when `id` is a typed array.
    pub fn is_array_type(&self, id: TypeId) -> bool {
        matches!(
            self.types.get(&id).map(|e| &e.kind),
            Some(TypeKind::Array { .. })
        )
    }

    /// True for types the language enumerates: arrays, the abstract list
    /// type, and string collections. Dictionaries and documents implement
    /// iteration but are deliberately excluded from enumeration.
    pub fn is_enumerable_type(&self, id: TypeId) -> bool {
        id == well_known::LIST || id == well_known::STRING_LIST || self.is_array_type(id)
    }

    /// Assignability: `to` is the same type, the universal base, the
    /// abstract list type over an array, or an ancestor in a class chain.
    pub fn is_assignable(&self, to: TypeId, from: TypeId) -> bool {
        if to == from || to == well_known::ANY {
            return true;
        }
        if to == well_known::LIST && (from == well_known::LIST || self.is_array_type(from)) {
            return true;
        }
        // Walk the class base chain of `from`.
        let mut cursor = from;
        let mut depth = 0;
        while let Some(entry) = self.class_entry(cursor) {
            match entry.base {
                Some(base) => {
                    if base == to {
                        return true;
                    }
                    cursor = base;
                }
                None => break,
            }
            depth += 1;
            if depth > 64 {
                break;
            }
        }
        false
    }

    // ==========================================================================
    // Enum rendering
    // ==========================================================================

    /// Render an enum value as its member name, a flags combination of
    /// names, or the raw number when undeclared.
    pub fn render_enum(&self, value: &EnumValue) -> String {
        let Some(spec) = self.enum_spec(value.type_id) else {
            return value.bits.to_string();
        };
        let width = spec.underlying.bit_width().unwrap_or(64);
        let mask = if width == 64 {
            u64::MAX
        } else {
            (1u64 << width) - 1
        };
        let bits = value.bits & mask;

        for (name, member) in &spec.members {
            if (*member as u64) & mask == bits {
                return name.clone();
            }
        }

        if spec.is_flags && bits != 0 {
            let mut covered = 0u64;
            let mut names = Vec::new();
            for (name, member) in &spec.members {
                let member_bits = (*member as u64) & mask;
                if member_bits != 0 && bits & member_bits == member_bits {
                    if covered & member_bits != member_bits {
                        names.push(name.as_str());
                        covered |= member_bits;
                    }
                }
            }
            if covered == bits {
                return names.join(", ");
            }
        }

        // Undeclared value: render as the underlying number, sign-extending
        // signed domains.
        if spec.underlying.is_signed_integer() && width < 64 && bits >> (width - 1) & 1 == 1 {
            let extended = (bits | !mask) as i64;
            extended.to_string()
        } else if spec.underlying.is_signed_integer() {
            (bits as i64).to_string()
        } else {
            bits.to_string()
        }
    }
}
