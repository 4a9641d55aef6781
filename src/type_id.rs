//! Deterministic hash-based identity for script types.
//!
//! This module provides [`TypeId`], a 64-bit hash that uniquely identifies a
//! script-level type. Hashes are computed deterministically from qualified
//! type names, enabling:
//!
//! - Forward references (hash computed before registration)
//! - No registration order dependencies
//! - Single map lookups (no secondary name→id maps)
//!
//! Array types derive their identity from their element type, so
//! `TypeId::array_of(INT32)` is stable without a registry round trip.
//!
//! # Examples
//!
//! ```
//! use brinecast::TypeId;
//!
//! let int_id = TypeId::from_name("int");
//! let same_id = TypeId::from_name("int");
//! assert_eq!(int_id, same_id);  // Deterministic
//!
//! let ints = TypeId::array_of(int_id);
//! assert_ne!(ints, int_id);
//! ```

use std::fmt;
use xxhash_rust::const_xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
///
/// These constants keep the hash domains of plain types and derived array
/// types disjoint, so a type named `"int[]"` can never collide with the
/// derived identity of `array_of(int)`.
pub mod hash_constants {
    /// Separator constant used when mixing derived identities.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for derived array-type hashes.
    pub const ARRAY: u64 = 0x9a7f3d5e2b8c4601;
}

/// A deterministic 64-bit hash identifying a script type.
///
/// Computed from the qualified type name. The same input always produces the
/// same hash, so identities can be computed anywhere without consulting the
/// registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct TypeId(pub u64);

impl TypeId {
    /// Empty/invalid identity constant.
    pub const EMPTY: TypeId = TypeId(0);

    /// Create a type identity from a qualified type name.
    ///
    /// The same name always produces the same identity.
    #[inline]
    pub const fn from_name(name: &str) -> Self {
        TypeId(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Derive the identity of the array type whose element type is `element`.
    ///
    /// Derivation is deterministic, so callers never need the registry to
    /// name an array type.
    #[inline]
    pub const fn array_of(element: TypeId) -> Self {
        TypeId(hash_constants::ARRAY ^ element.0.wrapping_mul(hash_constants::SEP))
    }

    /// Check if this is an empty/invalid identity.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({:#018x})", self.0)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Well-known identities for the built-in types of the language.
///
/// All constants are computed through [`TypeId::from_name`] at compile time,
/// so they always agree with runtime lookups by name.
pub mod well_known {
    use super::TypeId;

    /// The null sentinel type. Stands in for "language null" in the
    /// conversion cache so null-valued conversions are cacheable like any
    /// other type pair.
    pub const NULL: TypeId = TypeId::from_name("null");

    /// `void` — conversions to it produce the empty-result sentinel.
    pub const VOID: TypeId = TypeId::from_name("void");

    /// `bool`.
    pub const BOOL: TypeId = TypeId::from_name("bool");

    /// `int8` (signed 8-bit).
    pub const INT8: TypeId = TypeId::from_name("int8");

    /// `int16` (signed 16-bit).
    pub const INT16: TypeId = TypeId::from_name("int16");

    /// `int` (signed 32-bit).
    pub const INT32: TypeId = TypeId::from_name("int");

    /// `int64` (signed 64-bit).
    pub const INT64: TypeId = TypeId::from_name("int64");

    /// `uint8`.
    pub const UINT8: TypeId = TypeId::from_name("uint8");

    /// `uint16`.
    pub const UINT16: TypeId = TypeId::from_name("uint16");

    /// `uint` (unsigned 32-bit).
    pub const UINT32: TypeId = TypeId::from_name("uint");

    /// `uint64`.
    pub const UINT64: TypeId = TypeId::from_name("uint64");

    /// `float` (32-bit).
    pub const FLOAT: TypeId = TypeId::from_name("float");

    /// `double` (64-bit).
    pub const DOUBLE: TypeId = TypeId::from_name("double");

    /// `decimal` (scaled 96-bit-mantissa value).
    pub const DECIMAL: TypeId = TypeId::from_name("decimal");

    /// `char`.
    pub const CHAR: TypeId = TypeId::from_name("char");

    /// `string`.
    pub const STRING: TypeId = TypeId::from_name("string");

    /// `any` — the universal base type; everything is assignable to it.
    pub const ANY: TypeId = TypeId::from_name("any");

    /// `list` — the abstract untyped-array destination. Values never carry
    /// this type directly; typed arrays are derived with
    /// [`TypeId::array_of`].
    pub const LIST: TypeId = TypeId::from_name("list");

    /// `dict` — the ordered key/value store.
    pub const DICT: TypeId = TypeId::from_name("dict");

    /// `ref` — the reference-cell wrapper.
    pub const REFERENCE: TypeId = TypeId::from_name("ref");

    /// `switch` — the command-flag type with its own truth state.
    pub const SWITCH: TypeId = TypeId::from_name("switch");

    /// `block` — a script block (deferred code, bindable as a callable).
    pub const BLOCK: TypeId = TypeId::from_name("block");

    /// `document` — a structured document parsed from rendered text.
    pub const DOCUMENT: TypeId = TypeId::from_name("document");

    /// `stringlist` — the bulk string-collection destination.
    pub const STRING_LIST: TypeId = TypeId::from_name("stringlist");

    /// The property-bag wrapper type.
    pub const BAG: TypeId = TypeId::from_name("bag");

    /// Internal marker: a debased property bag with no backing object.
    /// Never used as the type of a registered host type.
    pub const PURE_BAG: TypeId = TypeId::from_name("__purebag");

    /// Internal marker: the custom-object construction destination
    /// (a dictionary converted into a pure property bag).
    pub const CUSTOM_OBJECT: TypeId = TypeId::from_name("__customobject");

    /// `session` — the external-resource handle constructed from a
    /// connection string via its static factory.
    pub const SESSION: TypeId = TypeId::from_name("session");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_id_determinism() {
        let a = TypeId::from_name("int");
        let b = TypeId::from_name("int");
        assert_eq!(a, b);

        let c = TypeId::from_name("Game::Player");
        let d = TypeId::from_name("Game::Player");
        assert_eq!(c, d);
    }

    #[test]
    fn distinct_names_distinct_ids() {
        assert_ne!(TypeId::from_name("int"), TypeId::from_name("uint"));
        assert_ne!(TypeId::from_name("int"), TypeId::from_name("int64"));
    }

    #[test]
    fn array_identity_is_derived() {
        let ints = TypeId::array_of(well_known::INT32);
        assert_eq!(ints, TypeId::array_of(well_known::INT32));
        assert_ne!(ints, well_known::INT32);
        assert_ne!(ints, TypeId::array_of(well_known::INT64));

        // Nesting produces yet another identity.
        let nested = TypeId::array_of(ints);
        assert_ne!(nested, ints);
    }

    #[test]
    fn well_known_agree_with_from_name() {
        assert_eq!(well_known::BOOL, TypeId::from_name("bool"));
        assert_eq!(well_known::STRING, TypeId::from_name("string"));
        assert_eq!(well_known::NULL, TypeId::from_name("null"));
    }

    #[test]
    fn empty_id() {
        assert!(TypeId::EMPTY.is_empty());
        assert!(!well_known::BOOL.is_empty());
    }

    #[test]
    fn display_is_hex() {
        let id = TypeId(0x1234);
        assert_eq!(format!("{id}"), "0x0000000000001234");
    }
}
