//! The conversion cache: `(source type, destination type)` → resolved
//! strategy.
//!
//! Entries are created once and reused for the process lifetime. The cache
//! is guarded by a single mutex; insertion is idempotent — a losing racer's
//! freshly synthesized entry is discarded in favor of the existing one,
//! under the invariant that two syntheses of the same key always agree
//! functionally (checked with a debug assertion, not by blocking).
//!
//! [`ConversionCache::rebuild`] clears everything and reseeds the
//! precomputed pairs: the whole directed numeric lattice with its ranks,
//! the null conversions, the boolean family, and the char/string special
//! cases. The engine runs it once at startup and again after bulk type
//! metadata reloads.

use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use crate::numeric::{INTEGER_KINDS, NumericKind, REAL_KINDS, SIGNED_KINDS, UNSIGNED_KINDS};
use crate::rank::ConversionRank;
use crate::registry::TypeRegistry;
use crate::strategy::Strategy;
use crate::type_id::{TypeId, well_known};

/// Cache key: an ordered pair of type identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversionKey {
    /// Source type.
    pub from: TypeId,
    /// Destination type.
    pub to: TypeId,
}

/// A resolved conversion: the strategy and its strength. Immutable once
/// inserted.
#[derive(Debug, Clone)]
pub struct ConversionEntry {
    /// How to convert.
    pub strategy: Strategy,
    /// How good the conversion is (diagnostic; the hit path ignores it).
    pub rank: ConversionRank,
}

/// Process-wide mapping from type pairs to resolved strategies.
#[derive(Debug, Default)]
pub struct ConversionCache {
    entries: Mutex<FxHashMap<ConversionKey, Arc<ConversionEntry>>>,
}

impl ConversionCache {
    /// An empty cache.
    pub fn new() -> ConversionCache {
        ConversionCache::default()
    }

    /// Look up the entry for a pair.
    pub fn get(&self, from: TypeId, to: TypeId) -> Option<Arc<ConversionEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&ConversionKey { from, to })
            .cloned()
    }

    /// Insert an entry, keeping any existing one. Two inserts for the same
    /// key must agree functionally.
    pub fn insert(
        &self,
        from: TypeId,
        to: TypeId,
        strategy: Strategy,
        rank: ConversionRank,
    ) -> Arc<ConversionEntry> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let key = ConversionKey { from, to };
        if let Some(existing) = entries.get(&key) {
            debug_assert!(
                existing.strategy.same_shape(&strategy),
                "conflicting strategies cached for the same type pair"
            );
            return Arc::clone(existing);
        }
        let entry = Arc::new(ConversionEntry { strategy, rank });
        entries.insert(key, Arc::clone(&entry));
        entry
    }

    /// Number of cached pairs.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry whose source or destination type carries the
    /// given name. Safe to run concurrently with lookups of unrelated keys;
    /// the whole scan happens under the cache lock.
    pub fn invalidate_involving(&self, type_name: &str, registry: &TypeRegistry) {
        let direct = TypeId::from_name(type_name);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|key, _| {
            let matches = key.from == direct
                || key.to == direct
                || registry.name_of(key.from) == type_name
                || registry.name_of(key.to) == type_name;
            !matches
        });
    }

    /// Clear everything and reseed the precomputed conversions.
    pub fn rebuild(&self) {
        {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.clear();
        }
        self.seed();
    }

    /// Seed the precomputed pairs: the numeric lattice, null conversions,
    /// the boolean family, and the char/string special cases.
    fn seed(&self) {
        use ConversionRank as R;
        use Strategy as S;

        let string = well_known::STRING;
        let null = well_known::NULL;
        let boolean = well_known::BOOL;
        let ch = well_known::CHAR;

        for kind in crate::numeric::ALL_KINDS {
            let id = kind.type_id();
            self.insert(id, string, S::NumericToString, R::NumericString);
            self.insert(id, ch, S::NumericToChar, R::NumericString);
            self.insert(null, id, S::NullToNumeric(kind), R::NullToValue);
            self.insert(id, boolean, S::BoolFromNumeric, R::Language);
            self.insert(id, id, S::Identity, R::Identity);
        }

        for i in 0..UNSIGNED_KINDS.len() {
            let u_i = UNSIGNED_KINDS[i].type_id();
            let s_i = SIGNED_KINDS[i].type_id();

            // Same-size sign changes are explicit both ways, but the
            // signed-to-unsigned direction is the more specific variant.
            self.insert(
                u_i,
                s_i,
                S::NumericConvert { to: SIGNED_KINDS[i] },
                R::NumericExplicit,
            );
            self.insert(
                s_i,
                u_i,
                S::NumericConvert {
                    to: UNSIGNED_KINDS[i],
                },
                R::NumericExplicitPreferred,
            );

            for j in (i + 1)..UNSIGNED_KINDS.len() {
                let u_j = UNSIGNED_KINDS[j].type_id();
                let s_j = SIGNED_KINDS[j].type_id();

                // Widening without a sign change is implicit, as is
                // widening from unsigned into a larger signed domain.
                self.insert(
                    u_i,
                    u_j,
                    S::NumericConvert {
                        to: UNSIGNED_KINDS[j],
                    },
                    R::NumericImplicit,
                );
                self.insert(
                    s_i,
                    s_j,
                    S::NumericConvert { to: SIGNED_KINDS[j] },
                    R::NumericImplicit,
                );
                self.insert(
                    u_i,
                    s_j,
                    S::NumericConvert { to: SIGNED_KINDS[j] },
                    R::NumericImplicit,
                );
                self.insert(
                    s_i,
                    u_j,
                    S::NumericConvert {
                        to: UNSIGNED_KINDS[j],
                    },
                    R::NumericExplicitPreferred,
                );

                // Narrowing is explicit regardless of sign.
                self.insert(
                    u_j,
                    u_i,
                    S::NumericConvert {
                        to: UNSIGNED_KINDS[i],
                    },
                    R::NumericExplicit,
                );
                self.insert(
                    s_j,
                    s_i,
                    S::NumericConvert { to: SIGNED_KINDS[i] },
                    R::NumericExplicit,
                );
                self.insert(
                    u_j,
                    s_i,
                    S::NumericConvert { to: SIGNED_KINDS[i] },
                    R::NumericExplicit,
                );
                self.insert(
                    s_j,
                    u_i,
                    S::NumericConvert {
                        to: UNSIGNED_KINDS[i],
                    },
                    R::NumericExplicit,
                );
            }
        }

        for integer in INTEGER_KINDS {
            self.insert(
                string,
                integer.type_id(),
                S::StringToInteger { to: integer },
                R::NumericString,
            );
            for real in REAL_KINDS {
                self.insert(
                    integer.type_id(),
                    real.type_id(),
                    S::NumericConvert { to: real },
                    R::NumericImplicit,
                );
                self.insert(
                    real.type_id(),
                    integer.type_id(),
                    S::NumericConvert { to: integer },
                    R::NumericExplicit,
                );
            }
        }

        let float = NumericKind::F32.type_id();
        let double = NumericKind::F64.type_id();
        let decimal = NumericKind::Decimal.type_id();
        self.insert(
            float,
            double,
            S::NumericConvert { to: NumericKind::F64 },
            R::NumericImplicit,
        );
        self.insert(
            double,
            float,
            S::NumericConvert { to: NumericKind::F32 },
            R::NumericExplicit,
        );
        self.insert(
            float,
            decimal,
            S::NumericConvert {
                to: NumericKind::Decimal,
            },
            R::NumericExplicit,
        );
        self.insert(
            double,
            decimal,
            S::NumericConvert {
                to: NumericKind::Decimal,
            },
            R::NumericExplicit,
        );
        self.insert(
            decimal,
            float,
            S::NumericConvert { to: NumericKind::F32 },
            R::NumericExplicitPreferred,
        );
        self.insert(
            decimal,
            double,
            S::NumericConvert { to: NumericKind::F64 },
            R::NumericExplicitPreferred,
        );

        self.insert(string, decimal, S::StringToDecimal, R::NumericString);
        self.insert(
            string,
            float,
            S::StringToReal { to: NumericKind::F32 },
            R::NumericString,
        );
        self.insert(
            string,
            double,
            S::StringToReal { to: NumericKind::F64 },
            R::NumericString,
        );

        self.insert(
            ch,
            float,
            S::CharToNumeric { to: NumericKind::F32 },
            R::Language,
        );
        self.insert(
            ch,
            double,
            S::CharToNumeric { to: NumericKind::F64 },
            R::Language,
        );
        self.insert(ch, boolean, S::BoolFromChar, R::Language);

        // Conversions from null.
        self.insert(null, ch, S::NullToChar, R::NullToValue);
        self.insert(null, string, S::NullToString, R::ToString);
        self.insert(null, boolean, S::NullToBool, R::NullToValue);
        self.insert(null, well_known::REFERENCE, S::NullToRefCell, R::NullToRef);
        self.insert(null, well_known::SWITCH, S::NullToSwitch, R::NullToValue);
        self.insert(null, well_known::VOID, S::NullToVoid, R::NullToValue);

        // The boolean family.
        self.insert(boolean, boolean, S::Identity, R::Identity);
        self.insert(string, boolean, S::BoolFromString, R::Language);
        self.insert(well_known::SWITCH, boolean, S::BoolFromSwitch, R::Language);
        self.insert(boolean, well_known::SWITCH, S::BoolToSwitch, R::Language);

        // A string explodes into a char array.
        self.insert(
            string,
            TypeId::array_of(ch),
            S::StringToCharList,
            R::StringToCharList,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_pairs_present_after_rebuild() {
        let cache = ConversionCache::new();
        cache.rebuild();

        let entry = cache
            .get(well_known::STRING, well_known::INT32)
            .expect("string to int seeded");
        assert_eq!(entry.rank, ConversionRank::NumericString);

        let entry = cache
            .get(well_known::INT32, well_known::INT64)
            .expect("widening seeded");
        assert_eq!(entry.rank, ConversionRank::NumericImplicit);

        let entry = cache
            .get(well_known::INT64, well_known::INT32)
            .expect("narrowing seeded");
        assert_eq!(entry.rank, ConversionRank::NumericExplicit);

        let entry = cache
            .get(well_known::INT32, well_known::UINT32)
            .expect("sign change seeded");
        assert_eq!(entry.rank, ConversionRank::NumericExplicitPreferred);

        let entry = cache
            .get(well_known::UINT32, well_known::INT32)
            .expect("reverse sign change seeded");
        assert_eq!(entry.rank, ConversionRank::NumericExplicit);

        let entry = cache
            .get(well_known::FLOAT, well_known::DOUBLE)
            .expect("float to double seeded");
        assert_eq!(entry.rank, ConversionRank::NumericImplicit);

        assert!(cache.get(well_known::NULL, well_known::STRING).is_some());
        assert!(cache.get(well_known::NULL, well_known::INT32).is_some());
    }

    #[test]
    fn insert_is_idempotent() {
        let cache = ConversionCache::new();
        let first = cache.insert(
            well_known::STRING,
            well_known::BOOL,
            Strategy::BoolFromString,
            ConversionRank::Language,
        );
        let second = cache.insert(
            well_known::STRING,
            well_known::BOOL,
            Strategy::BoolFromString,
            ConversionRank::Language,
        );
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn keys_are_directional() {
        let cache = ConversionCache::new();
        cache.insert(
            well_known::INT32,
            well_known::STRING,
            Strategy::NumericToString,
            ConversionRank::NumericString,
        );
        assert!(cache.get(well_known::INT32, well_known::STRING).is_some());
        assert!(cache.get(well_known::STRING, well_known::INT32).is_none());
    }

    #[test]
    fn invalidation_removes_matching_pairs_only() {
        let registry = TypeRegistry::with_builtins();
        let cache = ConversionCache::new();
        cache.rebuild();
        let before = cache.len();

        cache.invalidate_involving("int", &registry);
        assert!(cache.len() < before);
        assert!(cache.get(well_known::STRING, well_known::INT32).is_none());
        assert!(cache.get(well_known::INT32, well_known::STRING).is_none());
        // Unrelated pairs survive.
        assert!(cache.get(well_known::STRING, well_known::DOUBLE).is_some());
    }
}
