//! Strategy synthesis: deciding how to convert between two types.
//!
//! A [`Strategy`] is a tagged description of a conversion, carrying the
//! minimal data needed to execute it; the dispatcher interprets it against
//! a concrete value. Synthesis ([`synthesize`]) is a pure function of the
//! two type identities (given fixed registry metadata): it tries a strict
//! priority ladder and the first applicable rule wins. The order is a
//! load-bearing design decision — several rules can superficially apply to
//! the same pair and the chosen one determines observable behavior.
//!
//! Synthesis never mutates the conversion cache; the caller caches the
//! result.

use tracing::trace;

use crate::engine::{ConversionEngine, LanguageMode};
use crate::numeric::NumericKind;
use crate::rank::ConversionRank;
use crate::registry::TypeRegistry;
use crate::type_id::{TypeId, well_known};
use crate::types::TypeCaps;

/// A resolved conversion strategy. Variants carry only what execution needs
/// beyond the `(value, destination)` pair the dispatcher supplies.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// No conversion exists; executing raises `InvalidCast`.
    NoConversion,
    /// Destination rejected by the constrained-mode gate.
    NotSupported,
    /// Same type; the value is returned untouched.
    Identity,
    /// Upcast; the value is returned untouched.
    Assignable,
    /// Wrap the value in a property bag.
    WrapBag,
    /// Produce the empty-result sentinel.
    ToVoid,
    /// Convert to the underlying type of a nullable destination.
    ToNullable {
        /// The wrapped type.
        underlying: TypeId,
    },
    /// Null into a nullable destination: stays null.
    NullToNullable,
    /// Null into a reference destination: the original value unchanged.
    NullToRef,
    /// Null into a numeric destination: zero.
    NullToNumeric(NumericKind),
    /// Null into char: NUL.
    NullToChar,
    /// Null into string: empty.
    NullToString,
    /// Null into bool: false.
    NullToBool,
    /// Null into a switch flag: absent.
    NullToSwitch,
    /// Null into void: the empty-result sentinel.
    NullToVoid,
    /// Null into a reference cell: a cell holding null.
    NullToRefCell,
    /// Checked numeric conversion into a domain.
    NumericConvert {
        /// Destination domain.
        to: NumericKind,
    },
    /// Invariant numeric rendering (original literal text wins).
    NumericToString,
    /// Numeric into char through its code point.
    NumericToChar,
    /// Char into a numeric domain through its code point.
    CharToNumeric {
        /// Destination domain.
        to: NumericKind,
    },
    /// The generic render-to-string path.
    RenderToString,
    /// String into an integer domain (scanner, native parse, double
    /// fallback).
    StringToInteger {
        /// Destination domain.
        to: NumericKind,
    },
    /// String into a binary float domain.
    StringToReal {
        /// Destination domain.
        to: NumericKind,
    },
    /// String into decimal (with the double-based fallback).
    StringToDecimal,
    /// Single-character string into char.
    StringToChar,
    /// List truthiness (empty/single/multiple rules).
    BoolFromList,
    /// Enum truthiness: any bit set.
    BoolFromEnum,
    /// Numeric truthiness: nonzero.
    BoolFromNumeric,
    /// String truthiness: non-empty.
    BoolFromString,
    /// Char truthiness: not NUL.
    BoolFromChar,
    /// Switch truthiness: its own state.
    BoolFromSwitch,
    /// Any other value type: always true.
    BoolFromValueType,
    /// Any reference value: always true (null never reaches here).
    BoolFromReference,
    /// Bool into a switch flag.
    BoolToSwitch,
    /// String exploded into a char array.
    StringToCharList,
    /// Array into array with assignable element types: cheap re-type.
    RelatedArrays {
        /// Destination element type.
        element: TypeId,
    },
    /// Array into array with unrelated element types: per-element recursion.
    UnrelatedArrays {
        /// Destination element type.
        element: TypeId,
    },
    /// Any enumerable into an array via enumeration.
    EnumerableToArray {
        /// Destination element type.
        element: TypeId,
    },
    /// Scalar wrapped into a one-element array. Value-dependent: kept out
    /// of the unconditional cache and retried per value through the bridge.
    ScalarToArray {
        /// Destination element type.
        element: TypeId,
    },
    /// Dictionary-like value into the ordered key/value store.
    ToDict,
    /// Wrap in a reference cell.
    WrapRef,
    /// Render to text, parse as an untrusted structured document.
    ToDocument,
    /// Render into a string array, then bulk-fill the string collection.
    ToStringList,
    /// Bind a script block as a delegate.
    BlockToDelegate,
    /// Bind a method-group overload as a delegate.
    MethodToDelegate {
        /// Index of the chosen overload, in declaration order.
        overload: usize,
    },
    /// Integer bit pattern into an enum, then definedness check.
    IntegerToEnum,
    /// Enum into a numeric domain through its underlying value.
    EnumToNumeric {
        /// Destination domain.
        to: NumericKind,
    },
    /// String matched against enum names.
    StringToEnum {
        /// Whether comma-separated multi-value combination is allowed.
        multi: bool,
    },
    /// Enumerable joined into a comma list, then matched against enum names.
    EnumerableToEnum,
    /// Dictionary into the custom-object marker: a fresh pure property bag.
    DictToCustomObject,
    /// The destination's static string factory.
    StaticCreate,
    /// The destination's parse method.
    ParseMethod {
        /// Prefer the culture-taking overload.
        with_culture: bool,
    },
    /// A single-argument constructor on the destination.
    Constructor {
        /// Constructor index in declaration order.
        index: usize,
    },
    /// The destination's enumerable-taking constructor: materialize a list
    /// of converted elements and invoke it.
    ElementCtor {
        /// Collection element type.
        element: TypeId,
    },
    /// A cast operator declared on `owner`.
    Cast {
        /// The type declaring the operator.
        owner: TypeId,
        /// Operator index in declaration order.
        index: usize,
    },
    /// Numeric source routed through a string round trip.
    ConvertibleNumeric,
    /// The source type's generic convertible hook.
    Convertible,
    /// Dictionary applied onto a no-arg-constructed destination as a
    /// property bag (no method invocation permitted).
    DictToObject,
    /// Bag-derived source: no-arg-construct the destination and copy
    /// matching named properties recursively.
    PropertyCopy,
    /// Custom-converter bridge: try the value-dependent strategy, then a
    /// registered custom converter, then the synthesized fallback.
    Bridge(Box<BridgeStrategy>),
}

/// Payload of [`Strategy::Bridge`].
#[derive(Debug, Clone)]
pub struct BridgeStrategy {
    /// Tried first and allowed to fail (the value-dependent slot).
    pub try_first: Option<Strategy>,
    /// The synthesized strategy used when the custom converter declines.
    pub fallback: Option<Strategy>,
}

impl Strategy {
    /// Shape equality, used to assert that two racing syntheses of the same
    /// key agreed functionally.
    pub fn same_shape(&self, other: &Strategy) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

// ============================================================================
// Synthesis
// ============================================================================

/// Resolve the conversion strategy for a `(from, to)` pair.
///
/// The priority ladder, first applicable wins:
/// null-source rules; assignability; stack-only exclusion; bag source
/// (forces the caller's debase retry); bag destination; the constrained
/// security gate; hidden destinations; built-in language rules; enum
/// matching; the static string factory; parse methods; the enumerable
/// constructor; single-argument constructors; cast operators; the
/// convertible fallback; dictionary application; property copying; the
/// custom-converter bridge; and finally a permanent no-conversion entry.
pub(crate) fn synthesize(
    engine: &ConversionEngine,
    registry: &TypeRegistry,
    from: TypeId,
    to: TypeId,
) -> (Strategy, ConversionRank) {
    trace!(from = %registry.name_of(from), to = %registry.name_of(to), "synthesizing conversion");

    if from == well_known::NULL {
        return synthesize_from_null(registry, to);
    }

    if registry.is_assignable(to, from) {
        return if to == from {
            (Strategy::Identity, ConversionRank::Identity)
        } else {
            (Strategy::Assignable, ConversionRank::Assignable)
        };
    }

    if registry.caps(from).contains(TypeCaps::STACK_ONLY)
        || registry.caps(to).contains(TypeCaps::STACK_ONLY)
    {
        return (Strategy::NoConversion, ConversionRank::None);
    }

    // A bag source never converts directly; the dispatcher retries with the
    // debased type instead.
    if from == well_known::BAG {
        return (Strategy::NoConversion, ConversionRank::None);
    }

    if to == well_known::BAG {
        return (Strategy::WrapBag, ConversionRank::Bag);
    }

    if engine.language_mode() == LanguageMode::Constrained
        && to != well_known::ANY
        && to != TypeId::array_of(well_known::ANY)
        && !registry.caps(to).contains(TypeCaps::CORE)
    {
        return (Strategy::NotSupported, ConversionRank::None);
    }

    if registry.caps(to).contains(TypeCaps::HIDDEN) {
        return (Strategy::NoConversion, ConversionRank::None);
    }

    let mut value_dependent: Option<(Strategy, ConversionRank)> = None;
    let winner = figure_language(engine, registry, from, to, &mut value_dependent)
        .or_else(|| figure_enum_parse(registry, from, to))
        .or_else(|| figure_static_create(registry, from, to))
        .or_else(|| figure_parse(registry, from, to))
        .or_else(|| figure_element_ctor(registry, from, to))
        .or_else(|| figure_constructor(registry, from, to))
        .or_else(|| figure_cast(registry, from, to))
        .or_else(|| figure_convertible(engine, registry, from, to))
        .or_else(|| figure_dict_construction(registry, from, to))
        .or_else(|| figure_property_copy(registry, from, to));

    let possibly = engine.possibly_has_converter(registry, from)
        || engine.possibly_has_converter(registry, to);

    if possibly || (winner.is_some() && value_dependent.is_some()) {
        let winner_rank = winner.as_ref().map(|(_, r)| *r);
        let dependent_rank = value_dependent.as_ref().map(|(_, r)| *r);
        let strategy = Strategy::Bridge(Box::new(BridgeStrategy {
            try_first: value_dependent.map(|(s, _)| s),
            fallback: winner.map(|(s, _)| s),
        }));
        let mut rank = winner_rank.unwrap_or(ConversionRank::None);
        if let Some(dependent) = dependent_rank {
            if dependent > rank {
                rank = dependent;
            }
        }
        if rank.is_none() {
            rank = ConversionRank::Custom;
        }
        return (strategy, rank);
    }

    if let Some(found) = value_dependent {
        return found;
    }

    winner.unwrap_or((Strategy::NoConversion, ConversionRank::None))
}

fn synthesize_from_null(registry: &TypeRegistry, to: TypeId) -> (Strategy, ConversionRank) {
    if registry.nullable_underlying(to).is_some() {
        return (Strategy::NullToNullable, ConversionRank::NullToValue);
    }
    if !registry.is_value_type(to) {
        // The original null-carrying wrapper is handed back unchanged, so
        // any attached annotation survives.
        return (Strategy::NullToRef, ConversionRank::NullToRef);
    }
    (Strategy::NoConversion, ConversionRank::None)
}

/// Built-in language rules, dispatched on the destination shape. May also
/// produce a value-dependent scalar-to-array strategy in `value_dependent`
/// without claiming the pair.
fn figure_language(
    engine: &ConversionEngine,
    registry: &TypeRegistry,
    from: TypeId,
    to: TypeId,
    value_dependent: &mut Option<(Strategy, ConversionRank)>,
) -> Option<(Strategy, ConversionRank)> {
    if let Some(underlying) = registry.nullable_underlying(to) {
        let inner = engine.figure_for_types(registry, from, underlying);
        if !inner.rank.is_none() {
            return Some((Strategy::ToNullable { underlying }, inner.rank));
        }
    }

    if to == well_known::VOID {
        return Some((Strategy::ToVoid, ConversionRank::Language));
    }

    if to == well_known::BOOL {
        let strategy = if registry.is_enumerable_type(from) {
            Strategy::BoolFromList
        } else if registry.enum_spec(from).is_some() {
            Strategy::BoolFromEnum
        } else if registry.is_value_type(from) {
            Strategy::BoolFromValueType
        } else {
            Strategy::BoolFromReference
        };
        return Some((strategy, ConversionRank::Language));
    }

    if to == well_known::STRING {
        // Numeric-to-string pairs are precomputed when the cache is rebuilt,
        // so reaching here always means the generic render path.
        return Some((Strategy::RenderToString, ConversionRank::ToString));
    }

    if let Some(element) = registry.element_type(to) {
        if let Some(from_element) = registry.element_type(from) {
            return if registry.is_assignable(element, from_element) {
                Some((
                    Strategy::RelatedArrays { element },
                    ConversionRank::Language,
                ))
            } else {
                Some((
                    Strategy::UnrelatedArrays { element },
                    ConversionRank::UnrelatedArrays,
                ))
            };
        }
        if registry.is_enumerable_type(from) {
            return Some((
                Strategy::EnumerableToArray { element },
                ConversionRank::Language,
            ));
        }
        let inner = engine.figure_for_types(registry, from, element);
        if !inner.rank.is_none() {
            *value_dependent = Some((
                Strategy::ScalarToArray { element },
                inner.rank.scalar_to_array(),
            ));
        }
        return None;
    }

    if to == well_known::LIST {
        // Arrays were already claimed by assignability.
        if registry.is_enumerable_type(from) {
            return Some((
                Strategy::EnumerableToArray {
                    element: well_known::ANY,
                },
                ConversionRank::Language,
            ));
        }
        *value_dependent = Some((
            Strategy::ScalarToArray {
                element: well_known::ANY,
            },
            ConversionRank::AssignableS2A,
        ));
        return None;
    }

    if to == well_known::DICT {
        if registry.caps(from).contains(TypeCaps::DICT_LIKE) {
            return Some((Strategy::ToDict, ConversionRank::Language));
        }
        return None;
    }

    if to == well_known::REFERENCE {
        return Some((Strategy::WrapRef, ConversionRank::Language));
    }

    if to == well_known::DOCUMENT {
        return Some((Strategy::ToDocument, ConversionRank::Language));
    }

    if to == well_known::STRING_LIST {
        let rank = if registry.is_enumerable_type(from) {
            ConversionRank::Language
        } else {
            ConversionRank::LanguageS2A
        };
        return Some((Strategy::ToStringList, rank));
    }

    if registry.delegate_sig(to).is_some() && from == well_known::BLOCK {
        return Some((Strategy::BlockToDelegate, ConversionRank::Language));
    }

    if to == well_known::CUSTOM_OBJECT {
        return Some((Strategy::DictToCustomObject, ConversionRank::Language));
    }

    if NumericKind::of(from).is_some_and(|k| k.is_integer())
        && registry.enum_spec(to).is_some()
    {
        return Some((Strategy::IntegerToEnum, ConversionRank::Language));
    }

    if let (Some(overloads), Some(target)) = (registry.method_sigs(from), registry.delegate_sig(to))
    {
        if !registry.caps(to).contains(TypeCaps::ABSTRACT) {
            if let Some(overload) = pick_overload(registry, overloads, target) {
                return Some((
                    Strategy::MethodToDelegate { overload },
                    ConversionRank::Language,
                ));
            }
        }
    }

    None
}

/// Overload selection for method-group-to-delegate binding.
///
/// Candidates iterate in declaration order; an exact signature match wins
/// immediately, otherwise the first assignment-compatible candidate
/// (covariant return, contravariant parameters) is kept as the fallback.
fn pick_overload(
    registry: &TypeRegistry,
    overloads: &[crate::types::MethodSig],
    target: &crate::types::MethodSig,
) -> Option<usize> {
    let mut fallback: Option<usize> = None;
    for (index, candidate) in overloads.iter().enumerate() {
        if candidate.params.len() != target.params.len() {
            continue;
        }
        let mut exact = candidate.ret == target.ret;
        let ret_compatible = exact || registry.is_assignable(target.ret, candidate.ret);
        if !ret_compatible {
            continue;
        }
        let mut compatible = true;
        for (i, candidate_param) in candidate.params.iter().enumerate() {
            let target_param = target.params[i];
            let by_ref = candidate.by_ref.get(i).copied().unwrap_or(false)
                || target.by_ref.get(i).copied().unwrap_or(false);
            if *candidate_param == target_param
                && candidate.by_ref.get(i) == target.by_ref.get(i)
            {
                continue;
            }
            exact = false;
            // By-ref parameters require an exact element-type match.
            if by_ref || !registry.is_assignable(*candidate_param, target_param) {
                compatible = false;
                break;
            }
        }
        if !compatible {
            continue;
        }
        if exact {
            return Some(index);
        }
        if fallback.is_none() {
            fallback = Some(index);
        }
    }
    fallback
}

fn figure_enum_parse(
    registry: &TypeRegistry,
    from: TypeId,
    to: TypeId,
) -> Option<(Strategy, ConversionRank)> {
    let spec = registry.enum_spec(to)?;
    if from == well_known::STRING {
        // Comma-separated combination is only meaningful for flags enums;
        // a comma against a plain enum must fail as such.
        return Some((
            Strategy::StringToEnum {
                multi: spec.is_flags,
            },
            ConversionRank::Parse,
        ));
    }
    if registry.is_enumerable_type(from) {
        return Some((Strategy::EnumerableToEnum, ConversionRank::Parse));
    }
    None
}

fn figure_static_create(
    registry: &TypeRegistry,
    from: TypeId,
    to: TypeId,
) -> Option<(Strategy, ConversionRank)> {
    // Deliberately narrow: a static string factory participates only when
    // the destination declares one (the session type, in the built-ins);
    // there is no general static-factory discovery.
    if from != well_known::STRING {
        return None;
    }
    registry
        .class_entry(to)?
        .create_from_string
        .as_ref()
        .map(|_| (Strategy::StaticCreate, ConversionRank::Create))
}

fn figure_parse(
    registry: &TypeRegistry,
    from: TypeId,
    to: TypeId,
) -> Option<(Strategy, ConversionRank)> {
    if from != well_known::STRING {
        return None;
    }
    // The numeric domains parse from text; these pairs are normally seeded
    // at rebuild but must also be rediscoverable after a selective
    // invalidation.
    if let Some(kind) = NumericKind::of(to) {
        let strategy = match kind {
            NumericKind::F32 | NumericKind::F64 => Strategy::StringToReal { to: kind },
            NumericKind::Decimal => Strategy::StringToDecimal,
            _ => Strategy::StringToInteger { to: kind },
        };
        return Some((strategy, ConversionRank::NumericString));
    }
    if to == well_known::CHAR {
        return Some((Strategy::StringToChar, ConversionRank::Parse));
    }
    let class = registry.class_entry(to)?;
    if class.parse_with_culture.is_some() {
        return Some((
            Strategy::ParseMethod { with_culture: true },
            ConversionRank::Parse,
        ));
    }
    if class.parse_plain.is_some() {
        return Some((
            Strategy::ParseMethod {
                with_culture: false,
            },
            ConversionRank::Parse,
        ));
    }
    None
}

fn figure_element_ctor(
    registry: &TypeRegistry,
    from: TypeId,
    to: TypeId,
) -> Option<(Strategy, ConversionRank)> {
    if registry.caps(to).contains(TypeCaps::ABSTRACT) {
        return None;
    }
    let class = registry.class_entry(to)?;
    let element = class.element_ctor.as_ref()?.element;
    // A scalar source that is already element-shaped gets the
    // value-dependent rank variant; the reachability of deeper per-element
    // conversions is decided at execution time, per value.
    let is_scalar = registry.is_assignable(element, from);
    let rank = if is_scalar {
        ConversionRank::ConstructorS2A
    } else {
        ConversionRank::Constructor
    };
    Some((Strategy::ElementCtor { element }, rank))
}

fn figure_constructor(
    registry: &TypeRegistry,
    from: TypeId,
    to: TypeId,
) -> Option<(Strategy, ConversionRank)> {
    // An integer-taking collection constructor is a capacity hint, not a
    // semantic conversion.
    if NumericKind::of(from).is_some_and(|k| k.is_integer()) {
        let collection_like = to == well_known::LIST
            || registry.is_array_type(to)
            || registry
                .class_entry(to)
                .is_some_and(|c| c.element_ctor.is_some());
        if collection_like {
            return None;
        }
    }
    let class = registry.class_entry(to)?;
    let index = class.constructors.iter().position(|ctor| {
        ctor.params.len() == 1
            && (ctor.params[0] == from || registry.is_assignable(ctor.params[0], from))
    })?;
    Some((Strategy::Constructor { index }, ConversionRank::Constructor))
}

fn figure_cast(
    registry: &TypeRegistry,
    from: TypeId,
    to: TypeId,
) -> Option<(Strategy, ConversionRank)> {
    let find = |owner: TypeId, implicit: bool| -> Option<usize> {
        registry.class_entry(owner)?.casts.iter().position(|cast| {
            cast.implicit == implicit && cast.source == from && cast.result == to
        })
    };
    // Implicit on the destination, explicit on the destination, implicit on
    // the source, explicit on the source.
    for (owner, implicit) in [(to, true), (to, false), (from, true), (from, false)] {
        if let Some(index) = find(owner, implicit) {
            let rank = if implicit {
                ConversionRank::ImplicitCast
            } else {
                ConversionRank::ExplicitCast
            };
            return Some((Strategy::Cast { owner, index }, rank));
        }
    }
    None
}

fn figure_convertible(
    engine: &ConversionEngine,
    registry: &TypeRegistry,
    from: TypeId,
    to: TypeId,
) -> Option<(Strategy, ConversionRank)> {
    if NumericKind::of(from).is_some() {
        // A numeric source reaches any destination a string can reach, via
        // a render-then-reparse round trip.
        if !registry.is_array_type(to) && to != well_known::LIST {
            let through_string = engine.figure_for_types(registry, well_known::STRING, to);
            if !through_string.rank.is_none() {
                return Some((Strategy::ConvertibleNumeric, ConversionRank::Convertible));
            }
        }
        return None;
    }

    if registry.enum_spec(from).is_some() {
        if registry.enum_spec(to).is_some() {
            return Some((Strategy::IntegerToEnum, ConversionRank::Convertible));
        }
        if let Some(kind) = NumericKind::of(to) {
            return Some((Strategy::EnumToNumeric { to: kind }, ConversionRank::Convertible));
        }
        return None;
    }

    if from != well_known::STRING
        && registry
            .class_entry(from)
            .is_some_and(|c| c.convertible.is_some())
    {
        return Some((Strategy::Convertible, ConversionRank::Convertible));
    }
    None
}

fn figure_dict_construction(
    registry: &TypeRegistry,
    from: TypeId,
    to: TypeId,
) -> Option<(Strategy, ConversionRank)> {
    if !registry.caps(from).contains(TypeCaps::DICT_LIKE) {
        return None;
    }
    if registry.caps(to).contains(TypeCaps::ABSTRACT) {
        return None;
    }
    let class = registry.class_entry(to)?;
    let constructible = class.no_arg_constructor().is_some()
        || (registry.is_value_type(to) && !registry.caps(to).contains(TypeCaps::PRIMITIVE));
    constructible.then_some((Strategy::DictToObject, ConversionRank::Constructor))
}

fn figure_property_copy(
    registry: &TypeRegistry,
    from: TypeId,
    to: TypeId,
) -> Option<(Strategy, ConversionRank)> {
    // Only a debased pure bag reaches here; a live bag source was already
    // rejected to force the debase retry.
    if from != well_known::PURE_BAG {
        return None;
    }
    if registry.caps(to).contains(TypeCaps::ABSTRACT) {
        return None;
    }
    let class = registry.class_entry(to)?;
    let constructible = class.no_arg_constructor().is_some() || registry.is_value_type(to);
    if !constructible || class.properties.is_empty() {
        return None;
    }
    Some((Strategy::PropertyCopy, ConversionRank::Constructor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MethodSig;

    #[test]
    fn strategy_shape_equality() {
        assert!(Strategy::Identity.same_shape(&Strategy::Identity));
        assert!(
            Strategy::StringToInteger {
                to: NumericKind::I32
            }
            .same_shape(&Strategy::StringToInteger {
                to: NumericKind::I64
            })
        );
        assert!(!Strategy::Identity.same_shape(&Strategy::Assignable));
    }

    #[test]
    fn overload_picks_exact_over_compatible() {
        let mut registry = TypeRegistry::with_builtins();
        let base = registry.register_class(
            "Base",
            TypeCaps::empty(),
            crate::types::ClassEntry::default(),
        );
        let derived = registry.register_class(
            "Derived",
            TypeCaps::empty(),
            crate::types::ClassEntry {
                base: Some(base),
                ..Default::default()
            },
        );

        let target = MethodSig::new(vec![base], well_known::VOID);
        // Declaration order: a compatible candidate first, the exact one
        // second; the exact one must still win.
        let overloads = vec![
            MethodSig::new(vec![well_known::ANY], well_known::VOID),
            MethodSig::new(vec![base], well_known::VOID),
            MethodSig::new(vec![derived], well_known::VOID),
        ];
        assert_eq!(pick_overload(&registry, &overloads, &target), Some(1));
    }

    #[test]
    fn overload_falls_back_to_first_compatible() {
        let registry = TypeRegistry::with_builtins();
        let target = MethodSig::new(vec![well_known::INT32], well_known::VOID);
        let overloads = vec![
            MethodSig::new(vec![well_known::STRING, well_known::STRING], well_known::VOID),
            MethodSig::new(vec![well_known::ANY], well_known::VOID),
            MethodSig::new(vec![well_known::ANY], well_known::ANY),
        ];
        assert_eq!(pick_overload(&registry, &overloads, &target), Some(1));
    }

    #[test]
    fn overload_by_ref_requires_exact_match() {
        let registry = TypeRegistry::with_builtins();
        let mut target = MethodSig::new(vec![well_known::INT32], well_known::VOID);
        target.by_ref = vec![true];
        // Compatible-but-not-exact parameter types are rejected for by-ref
        // parameters.
        let overloads = vec![MethodSig {
            params: vec![well_known::ANY],
            ret: well_known::VOID,
            by_ref: vec![true],
        }];
        assert_eq!(pick_overload(&registry, &overloads, &target), None);

        let exact = vec![MethodSig {
            params: vec![well_known::INT32],
            ret: well_known::VOID,
            by_ref: vec![true],
        }];
        assert_eq!(pick_overload(&registry, &exact, &target), Some(0));
    }
}
