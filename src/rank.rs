//! Conversion strength ranking.
//!
//! [`ConversionRank`] is a totally ordered strength metric for competing
//! conversion strategies. The engine's cache-hit path never consults it;
//! it informs diagnostics and overload resolution. Each base rank has a
//! "scalar to array" sibling three units below it, marking strategies whose
//! applicability depends on the runtime value (a scalar promoted into a
//! one-element array), not just on the type pair.

/// Strength of a conversion strategy. Higher is better/more specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum ConversionRank {
    /// No conversion exists.
    None = 0x0000,
    /// Element-wise array conversion, scalar-promoted.
    UnrelatedArraysS2A = 0x0007,
    /// Element-wise array conversion between unrelated element types.
    UnrelatedArrays = 0x000F,
    /// Render-to-string, scalar-promoted.
    ToStringS2A = 0x0017,
    /// Render-to-string.
    ToString = 0x001F,
    /// Custom converter, scalar-promoted.
    CustomS2A = 0x0027,
    /// Custom converter.
    Custom = 0x002F,
    /// Generic convertible fallback, scalar-promoted.
    ConvertibleS2A = 0x0037,
    /// Generic convertible fallback.
    Convertible = 0x003F,
    /// Implicit cast operator, scalar-promoted.
    ImplicitCastS2A = 0x0047,
    /// Implicit cast operator.
    ImplicitCast = 0x004F,
    /// Explicit cast operator, scalar-promoted.
    ExplicitCastS2A = 0x0057,
    /// Explicit cast operator.
    ExplicitCast = 0x005F,
    /// Constructor invocation, scalar-promoted.
    ConstructorS2A = 0x0067,
    /// Constructor invocation.
    Constructor = 0x006F,
    /// Static factory method.
    Create = 0x0073,
    /// Parse method, scalar-promoted.
    ParseS2A = 0x0077,
    /// Parse method.
    Parse = 0x007F,
    /// Wrap into a property bag, scalar-promoted.
    BagS2A = 0x0087,
    /// Wrap into a property bag.
    Bag = 0x008F,
    /// Built-in language rule, scalar-promoted.
    LanguageS2A = 0x0097,
    /// Built-in language rule.
    Language = 0x009F,
    /// Null to a value-shaped destination.
    NullToValue = 0x00AF,
    /// Null to a reference destination.
    NullToRef = 0x00BF,
    /// Numeric narrowing, scalar-promoted.
    NumericExplicitS2A = 0x00C7,
    /// Numeric narrowing or sign change.
    NumericExplicit = 0x00CF,
    /// The preferred direction of a same-size sign change, scalar-promoted.
    NumericExplicitPreferredS2A = 0x00D7,
    /// The preferred direction of a same-size sign change (more specific
    /// than the reverse; observable only in overload resolution).
    NumericExplicitPreferred = 0x00DF,
    /// String to number / number to string, scalar-promoted.
    NumericStringS2A = 0x00E7,
    /// String to number / number to string.
    NumericString = 0x00EF,
    /// Numeric widening, scalar-promoted.
    NumericImplicitS2A = 0x00F7,
    /// Numeric widening.
    NumericImplicit = 0x00FF,
    /// Upcast, scalar-promoted.
    AssignableS2A = 0x0107,
    /// Upcast with no transformation.
    Assignable = 0x010F,
    /// Identity, scalar-promoted.
    IdentityS2A = 0x0117,
    /// String exploded into a char array.
    StringToCharList = 0x011A,
    /// Identity: same type, value returned untouched.
    Identity = 0x011F,
}

impl ConversionRank {
    /// True when no conversion exists.
    pub fn is_none(self) -> bool {
        self == ConversionRank::None
    }

    /// The raw ordering value.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// The scalar-to-array sibling of this rank, used when the strategy is
    /// re-evaluated per value rather than cached unconditionally. Ranks
    /// without a sibling map to themselves.
    pub fn scalar_to_array(self) -> ConversionRank {
        use ConversionRank::*;
        match self {
            UnrelatedArrays => UnrelatedArraysS2A,
            ToString => ToStringS2A,
            Custom => CustomS2A,
            Convertible => ConvertibleS2A,
            ImplicitCast => ImplicitCastS2A,
            ExplicitCast => ExplicitCastS2A,
            Constructor => ConstructorS2A,
            Parse => ParseS2A,
            Bag => BagS2A,
            Language => LanguageS2A,
            NumericExplicit => NumericExplicitS2A,
            NumericExplicitPreferred => NumericExplicitPreferredS2A,
            NumericString => NumericStringS2A,
            NumericImplicit => NumericImplicitS2A,
            Assignable => AssignableS2A,
            Identity => IdentityS2A,
            other => other,
        }
    }

    /// True for the scalar-to-array variants: same (from, to) pair may or
    /// may not apply depending on the runtime value.
    pub fn is_value_dependent(self) -> bool {
        use ConversionRank::*;
        matches!(
            self,
            UnrelatedArraysS2A
                | ToStringS2A
                | CustomS2A
                | ConvertibleS2A
                | ImplicitCastS2A
                | ExplicitCastS2A
                | ConstructorS2A
                | ParseS2A
                | BagS2A
                | LanguageS2A
                | NumericExplicitS2A
                | NumericExplicitPreferredS2A
                | NumericStringS2A
                | NumericImplicitS2A
                | AssignableS2A
                | IdentityS2A
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_total() {
        assert!(ConversionRank::Identity > ConversionRank::Assignable);
        assert!(ConversionRank::Assignable > ConversionRank::NumericImplicit);
        assert!(ConversionRank::NumericImplicit > ConversionRank::NumericString);
        assert!(ConversionRank::NumericExplicitPreferred > ConversionRank::NumericExplicit);
        assert!(ConversionRank::Language > ConversionRank::Parse);
        assert!(ConversionRank::Parse > ConversionRank::Constructor);
        assert!(ConversionRank::ExplicitCast > ConversionRank::ImplicitCast);
        assert!(ConversionRank::None < ConversionRank::UnrelatedArraysS2A);
    }

    #[test]
    fn scalar_siblings_sit_below_their_base() {
        let pairs = [
            (ConversionRank::Language, ConversionRank::LanguageS2A),
            (ConversionRank::Identity, ConversionRank::IdentityS2A),
            (ConversionRank::Constructor, ConversionRank::ConstructorS2A),
        ];
        for (base, sibling) in pairs {
            assert_eq!(base.scalar_to_array(), sibling);
            assert!(sibling < base);
            assert!(sibling.is_value_dependent());
            assert!(!base.is_value_dependent());
        }
    }

    #[test]
    fn unsiblinged_ranks_map_to_themselves() {
        assert_eq!(
            ConversionRank::Create.scalar_to_array(),
            ConversionRank::Create
        );
        assert_eq!(
            ConversionRank::None.scalar_to_array(),
            ConversionRank::None
        );
    }
}
