//! Enum matching: resolving strings and ordinals against enum types.
//!
//! Supports exact name matching (optionally case-insensitive), wildcard
//! patterns, unique-prefix abbreviation, flag-enum OR-combination of comma
//! separated segments, and validation that a resulting bit pattern is
//! actually declared.
//!
//! Per-enum metadata is summarized once into an [`EnumDescriptor`] and held
//! in a capped cache: when the cache reaches capacity it is cleared whole
//! rather than evicted piecemeal.

use std::sync::Mutex;

use regex::RegexBuilder;
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::error::{CastError, Result};
use crate::numeric::NumericKind;
use crate::registry::TypeRegistry;
use crate::type_id::TypeId;
use crate::value::{EnumValue, Value};

/// Summary of an enum type used during matching.
#[derive(Debug, Clone)]
pub struct EnumDescriptor {
    /// Member names in declaration order.
    pub names: Vec<String>,
    /// Member values as underlying bit patterns, aligned with `names`.
    pub values: Vec<u64>,
    /// OR-combination of all non-negative member values.
    pub all_values: u64,
    /// Whether any member has a negative underlying value. Such enums are
    /// never checked for flag completeness — a compatibility carve-out.
    pub has_negative: bool,
    /// Whether the enum is declared as a flags type.
    pub is_flags: bool,
    /// The underlying integer domain.
    pub underlying: NumericKind,
}

impl EnumDescriptor {
    /// Bit mask of the underlying width.
    pub fn mask(&self) -> u64 {
        match self.underlying.bit_width() {
            Some(64) | None => u64::MAX,
            Some(w) => (1u64 << w) - 1,
        }
    }

    /// Comma-separated member names, for error messages.
    pub fn available_names(&self) -> String {
        self.names.join(", ")
    }
}

const MAX_ENUM_TABLE_SIZE: usize = 100;

/// Capped cache of enum descriptors. Created once per engine; guarded by
/// its own lock, never taken while holding the conversion-cache lock.
#[derive(Debug, Default)]
pub struct EnumCache {
    table: Mutex<FxHashMap<TypeId, Arc<EnumDescriptor>>>,
}

impl EnumCache {
    /// An empty cache.
    pub fn new() -> EnumCache {
        EnumCache::default()
    }

    /// Fetch or build the descriptor for an enum type. Returns None when the
    /// identity is not a registered enum.
    pub fn descriptor(
        &self,
        registry: &TypeRegistry,
        enum_type: TypeId,
    ) -> Option<Arc<EnumDescriptor>> {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(found) = table.get(&enum_type) {
            return Some(Arc::clone(found));
        }

        let spec = registry.enum_spec(enum_type)?;
        let width = spec.underlying.bit_width().unwrap_or(64);
        let mask = if width == 64 {
            u64::MAX
        } else {
            (1u64 << width) - 1
        };

        let mut all_values = 0u64;
        let mut has_negative = false;
        let mut names = Vec::with_capacity(spec.members.len());
        let mut values = Vec::with_capacity(spec.members.len());
        for (name, raw) in &spec.members {
            names.push(name.clone());
            values.push((*raw as u64) & mask);
        }
        for (_, raw) in &spec.members {
            // A negative member means the type cannot be treated as flags;
            // stop accumulating.
            if spec.underlying.is_signed_integer() && *raw < 0 {
                has_negative = true;
                break;
            }
            all_values |= (*raw as u64) & mask;
        }

        if table.len() == MAX_ENUM_TABLE_SIZE {
            table.clear();
        }
        let descriptor = Arc::new(EnumDescriptor {
            names,
            values,
            all_values,
            has_negative,
            is_flags: spec.is_flags,
            underlying: spec.underlying,
        });
        table.insert(enum_type, Arc::clone(&descriptor));
        Some(descriptor)
    }

    /// Number of cached descriptors.
    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// True when no descriptors are cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Whether a bit pattern is declared by the enum.
///
/// Enums with a negative member are always treated as defined. For flags
/// enums, every set bit must be covered by the OR of all members; plain
/// enums require an exact member match.
pub fn is_defined(descriptor: &EnumDescriptor, bits: u64) -> bool {
    if descriptor.has_negative {
        return true;
    }
    let width = descriptor.underlying.bit_width().unwrap_or(64);
    if descriptor.underlying.is_signed_integer() && (bits >> (width - 1)) & 1 == 1 {
        // Negative values cannot be flags.
        return false;
    }
    if descriptor.is_flags {
        (bits | descriptor.all_values) ^ descriptor.all_values == 0
    } else {
        descriptor.values.contains(&bits)
    }
}

/// True when the text contains wildcard metacharacters.
fn has_wildcard(text: &str) -> bool {
    text.contains(['*', '?', '['])
}

/// Translate a wildcard pattern (`*`, `?`, `[...]` ranges) into an anchored
/// regular expression.
fn wildcard_regex(pattern: &str, ignore_case: bool) -> Option<regex::Regex> {
    let mut body = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '*' => body.push_str(".*"),
            '?' => body.push('.'),
            '[' => {
                // Pass a character class through verbatim.
                body.push('[');
                for inner in chars.by_ref() {
                    body.push(inner);
                    if inner == ']' {
                        break;
                    }
                }
            }
            other => body.push_str(&regex::escape(&other.to_string())),
        }
    }
    RegexBuilder::new(&format!("^(?:{body})$"))
        .case_insensitive(ignore_case)
        .build()
        .ok()
}

fn names_equal(a: &str, b: &str, ignore_case: bool) -> bool {
    if ignore_case {
        a.to_lowercase() == b.to_lowercase()
    } else {
        a == b
    }
}

fn name_starts_with(name: &str, prefix: &str, ignore_case: bool) -> bool {
    if ignore_case {
        name.to_lowercase().starts_with(&prefix.to_lowercase())
    } else {
        name.starts_with(prefix)
    }
}

fn cast_error(
    registry: &TypeRegistry,
    text: &str,
    enum_type: TypeId,
    reason: impl Into<String>,
) -> CastError {
    CastError::invalid_cast(text, "string", registry.name_of(enum_type), reason)
}

/// Resolve a string against an enum type.
///
/// When `allow_multiple` is set the text is split on commas and matched
/// values are OR-combined; otherwise a comma in the input is an immediate
/// error, as is more than one name matching a single segment.
pub fn string_to_enum(
    registry: &TypeRegistry,
    cache: &EnumCache,
    text: &str,
    enum_type: TypeId,
    ignore_case: bool,
    allow_multiple: bool,
) -> Result<Value> {
    let descriptor = cache
        .descriptor(registry, enum_type)
        .ok_or_else(|| cast_error(registry, text, enum_type, "destination is not an enum type"))?;

    if text.is_empty() {
        return Err(cast_error(registry, text, enum_type, "the string is empty"));
    }
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(cast_error(
            registry,
            text,
            enum_type,
            "the string is empty after trimming",
        ));
    }

    // A numeric-looking prefix gets one attempt as the underlying ordinal;
    // any parse or definedness failure falls through to textual matching.
    let first = trimmed.chars().next().unwrap_or(' ');
    if first.is_ascii_digit() || first == '+' || first == '-' {
        if let Some(bits) = parse_ordinal(trimmed, &descriptor) {
            if is_defined(&descriptor, bits) {
                return Ok(Value::Enum(EnumValue {
                    type_id: enum_type,
                    bits,
                }));
            }
        }
    }

    let segments: Vec<&str> = if allow_multiple {
        trimmed.split(',').collect()
    } else {
        if trimmed.contains(',') {
            return Err(cast_error(
                registry,
                text,
                enum_type,
                "the value contains a comma but the destination does not combine flags",
            ));
        }
        vec![trimmed]
    };

    let mut accumulated = 0u64;
    for segment in segments {
        let segment = segment.trim();
        let pattern = if has_wildcard(segment) {
            wildcard_regex(segment, ignore_case)
        } else {
            None
        };

        let mut matched: Option<u64> = None;
        for (index, name) in descriptor.names.iter().enumerate() {
            let hit = match &pattern {
                Some(re) => re.is_match(name),
                None => names_equal(segment, name, ignore_case),
            };
            if !hit {
                continue;
            }
            if !allow_multiple && matched.is_some() {
                return Err(cast_error(
                    registry,
                    text,
                    enum_type,
                    format!(
                        "'{segment}' matches more than one value; multiple values are not allowed"
                    ),
                ));
            }
            matched = Some(matched.unwrap_or(0) | descriptor.values[index]);
        }

        // Abbreviation: a unique declared-name prefix also matches.
        if matched.is_none() && !has_wildcard(segment) && !segment.is_empty() {
            let candidates: Vec<usize> = descriptor
                .names
                .iter()
                .enumerate()
                .filter(|(_, name)| name_starts_with(name, segment, ignore_case))
                .map(|(i, _)| i)
                .collect();
            match candidates.as_slice() {
                [single] => matched = Some(descriptor.values[*single]),
                [] => {}
                many => {
                    let names: Vec<&str> =
                        many.iter().map(|i| descriptor.names[*i].as_str()).collect();
                    return Err(cast_error(
                        registry,
                        text,
                        enum_type,
                        format!("'{segment}' is ambiguous between: {}", names.join(", ")),
                    ));
                }
            }
        }

        match matched {
            Some(bits) => accumulated |= bits,
            None => {
                return Err(cast_error(
                    registry,
                    text,
                    enum_type,
                    format!(
                        "unable to match '{segment}'; valid values: {}",
                        descriptor.available_names()
                    ),
                ));
            }
        }
    }

    if !is_defined(&descriptor, accumulated) {
        return Err(cast_error(
            registry,
            text,
            enum_type,
            format!(
                "the combined value {accumulated} is not defined; valid values: {}",
                descriptor.available_names()
            ),
        ));
    }
    Ok(Value::Enum(EnumValue {
        type_id: enum_type,
        bits: accumulated,
    }))
}

fn parse_ordinal(text: &str, descriptor: &EnumDescriptor) -> Option<u64> {
    let mask = descriptor.mask();
    if descriptor.underlying.is_signed_integer() {
        let parsed: i64 = text.parse().ok()?;
        in_width_signed(parsed, descriptor.underlying)?;
        Some((parsed as u64) & mask)
    } else {
        let parsed: u64 = text.parse().ok()?;
        if parsed & !mask != 0 {
            return None;
        }
        Some(parsed)
    }
}

fn in_width_signed(value: i64, kind: NumericKind) -> Option<()> {
    let width = kind.bit_width()?;
    if width == 64 {
        return Some(());
    }
    let min = -(1i64 << (width - 1));
    let max = (1i64 << (width - 1)) - 1;
    (min..=max).contains(&value).then_some(())
}

/// Reinterpret an integer (or another enum value) as an enum, then validate
/// definedness.
pub fn integer_to_enum(
    registry: &TypeRegistry,
    cache: &EnumCache,
    value: &Value,
    enum_type: TypeId,
) -> Result<Value> {
    let descriptor = cache.descriptor(registry, enum_type).ok_or_else(|| {
        CastError::invalid_cast(
            format!("{value}"),
            registry.name_of(value.type_id()),
            registry.name_of(enum_type),
            "destination is not an enum type",
        )
    })?;
    let raw: u64 = match value {
        Value::I8(v) => *v as i64 as u64,
        Value::I16(v) => *v as i64 as u64,
        Value::I32(v) => *v as i64 as u64,
        Value::I64(v) => *v as u64,
        Value::U8(v) => *v as u64,
        Value::U16(v) => *v as u64,
        Value::U32(v) => *v as u64,
        Value::U64(v) => *v,
        Value::Enum(e) => e.bits,
        other => {
            return Err(CastError::invalid_cast(
                format!("{other}"),
                registry.name_of(other.type_id()),
                registry.name_of(enum_type),
                "only integer values reinterpret as enum values",
            ));
        }
    };
    let bits = raw & descriptor.mask();
    if !is_defined(&descriptor, bits) {
        return Err(CastError::invalid_cast(
            format!("{value}"),
            registry.name_of(value.type_id()),
            registry.name_of(enum_type),
            format!(
                "the value is not defined; valid values: {}",
                descriptor.available_names()
            ),
        ));
    }
    Ok(Value::Enum(EnumValue {
        type_id: enum_type,
        bits,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags_registry() -> (TypeRegistry, TypeId) {
        let mut registry = TypeRegistry::with_builtins();
        let id = registry.register_enum(
            "Color",
            NumericKind::I32,
            &[("Red", 1), ("Green", 2), ("Blue", 4)],
            true,
        );
        (registry, id)
    }

    fn plain_registry() -> (TypeRegistry, TypeId) {
        let mut registry = TypeRegistry::with_builtins();
        let id = registry.register_enum(
            "Day",
            NumericKind::I32,
            &[("Monday", 0), ("Tuesday", 1), ("Wednesday", 2)],
            false,
        );
        (registry, id)
    }

    fn bits(v: &Value) -> u64 {
        match v {
            Value::Enum(e) => e.bits,
            other => panic!("expected enum value, got {other:?}"),
        }
    }

    #[test]
    fn exact_match() {
        let (registry, colors) = flags_registry();
        let cache = EnumCache::new();
        let v = string_to_enum(&registry, &cache, "Red", colors, false, false).unwrap();
        assert_eq!(bits(&v), 1);
    }

    #[test]
    fn case_insensitive_match() {
        let (registry, colors) = flags_registry();
        let cache = EnumCache::new();
        assert!(string_to_enum(&registry, &cache, "red", colors, false, false).is_err());
        let v = string_to_enum(&registry, &cache, "red", colors, true, false).unwrap();
        assert_eq!(bits(&v), 1);
    }

    #[test]
    fn flag_combination() {
        let (registry, colors) = flags_registry();
        let cache = EnumCache::new();
        let v = string_to_enum(&registry, &cache, "Red, Blue", colors, true, true).unwrap();
        assert_eq!(bits(&v), 5);
    }

    #[test]
    fn comma_rejected_without_multiple() {
        let (registry, colors) = flags_registry();
        let cache = EnumCache::new();
        let err = string_to_enum(&registry, &cache, "Red,Blue", colors, true, false).unwrap_err();
        assert!(matches!(err, CastError::InvalidCast { .. }));
    }

    #[test]
    fn empty_and_whitespace_rejected() {
        let (registry, colors) = flags_registry();
        let cache = EnumCache::new();
        assert!(string_to_enum(&registry, &cache, "", colors, true, true).is_err());
        assert!(string_to_enum(&registry, &cache, "   ", colors, true, true).is_err());
    }

    #[test]
    fn numeric_text_validates_definedness() {
        let (registry, colors) = flags_registry();
        let cache = EnumCache::new();
        let v = string_to_enum(&registry, &cache, "5", colors, true, true).unwrap();
        assert_eq!(bits(&v), 5);

        // 8 is not covered by declared flags and matches no name.
        assert!(string_to_enum(&registry, &cache, "8", colors, true, true).is_err());
    }

    #[test]
    fn wildcard_single_match() {
        let (registry, days) = plain_registry();
        let cache = EnumCache::new();
        let v = string_to_enum(&registry, &cache, "Mon*", days, true, false).unwrap();
        assert_eq!(bits(&v), 0);
    }

    #[test]
    fn ambiguous_wildcard_rejected_in_single_mode() {
        let (registry, days) = plain_registry();
        let cache = EnumCache::new();
        // Matches Tuesday and Wednesday.
        let err = string_to_enum(&registry, &cache, "*day", days, true, false).unwrap_err();
        assert!(matches!(err, CastError::InvalidCast { .. }));
    }

    #[test]
    fn unique_prefix_abbreviates() {
        let (registry, days) = plain_registry();
        let cache = EnumCache::new();
        let v = string_to_enum(&registry, &cache, "Wed", days, true, false).unwrap();
        assert_eq!(bits(&v), 2);

        // "Tu" is unique, "T" is not ambiguous either (only Tuesday starts
        // with T among declared names)... but "M" vs "Mo" both resolve.
        let v = string_to_enum(&registry, &cache, "Tu", days, true, false).unwrap();
        assert_eq!(bits(&v), 1);
    }

    #[test]
    fn unmatched_segment_lists_valid_values() {
        let (registry, colors) = flags_registry();
        let cache = EnumCache::new();
        let err = string_to_enum(&registry, &cache, "Purple", colors, true, false).unwrap_err();
        let text = format!("{err}");
        assert!(text.contains("Red, Green, Blue"), "got: {text}");
    }

    #[test]
    fn flags_definedness() {
        let (registry, colors) = flags_registry();
        let cache = EnumCache::new();
        let descriptor = cache.descriptor(&registry, colors).unwrap();
        assert!(is_defined(&descriptor, 7));
        assert!(!is_defined(&descriptor, 8));
    }

    #[test]
    fn plain_enum_requires_exact_member() {
        let (registry, days) = plain_registry();
        let cache = EnumCache::new();
        let descriptor = cache.descriptor(&registry, days).unwrap();
        assert!(is_defined(&descriptor, 1));
        assert!(!is_defined(&descriptor, 3));
    }

    #[test]
    fn negative_member_suppresses_checks() {
        let mut registry = TypeRegistry::with_builtins();
        let id = registry.register_enum(
            "Weird",
            NumericKind::I32,
            &[("Neg", -1), ("Pos", 1)],
            false,
        );
        let cache = EnumCache::new();
        let descriptor = cache.descriptor(&registry, id).unwrap();
        assert!(descriptor.has_negative);
        assert!(is_defined(&descriptor, 123));
    }

    #[test]
    fn integer_reinterpretation() {
        let (registry, colors) = flags_registry();
        let cache = EnumCache::new();
        let v = integer_to_enum(&registry, &cache, &Value::I32(3), colors).unwrap();
        assert_eq!(bits(&v), 3);
        assert!(integer_to_enum(&registry, &cache, &Value::I32(8), colors).is_err());
    }

    #[test]
    fn descriptor_cache_clears_at_capacity() {
        let mut registry = TypeRegistry::with_builtins();
        let cache = EnumCache::new();
        let mut last = TypeId::EMPTY;
        for i in 0..MAX_ENUM_TABLE_SIZE {
            last = registry.register_enum(
                format!("E{i}"),
                NumericKind::I32,
                &[("A", 0)],
                false,
            );
            cache.descriptor(&registry, last).unwrap();
        }
        assert_eq!(cache.len(), MAX_ENUM_TABLE_SIZE);

        let overflow = registry.register_enum("Overflow", NumericKind::I32, &[("A", 0)], false);
        cache.descriptor(&registry, overflow).unwrap();
        // The table was cleared wholesale before the new insert.
        assert_eq!(cache.len(), 1);
        let _ = last;
    }
}
