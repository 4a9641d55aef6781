//! Numeric domains, cross-domain conversion, and numeric comparison.
//!
//! The language recognizes eleven numeric domains: signed and unsigned
//! integers of 8/16/32/64 bits, two binary floating sizes, and a scaled
//! decimal. This module provides:
//!
//! - [`NumericKind`]: the domain enumeration with signedness/size queries
//! - the largest-common-type table used to pick a safe comparison domain
//! - [`convert_numeric`]: checked conversion between any two domains
//! - [`compare_numeric`]: comparison via the common domain, with the
//!   decimal/float overflow fallback through `f64`
//! - [`Decimal`]: a self-contained mantissa/scale decimal value
//!
//! Conversions report failure as a plain message string; the dispatcher
//! wraps them into its own error type with full value/type context.

use std::cmp::Ordering;
use std::fmt;

use crate::type_id::{TypeId, well_known};
use crate::value::Value;

// ============================================================================
// NumericKind
// ============================================================================

/// The numeric domains of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Decimal,
}

/// Signed integer kinds ordered by size. Index parity with
/// [`UNSIGNED_KINDS`] matters: the rank lattice pairs them positionally.
pub(crate) const SIGNED_KINDS: [NumericKind; 4] = [
    NumericKind::I8,
    NumericKind::I16,
    NumericKind::I32,
    NumericKind::I64,
];

/// Unsigned integer kinds ordered by size.
pub(crate) const UNSIGNED_KINDS: [NumericKind; 4] = [
    NumericKind::U8,
    NumericKind::U16,
    NumericKind::U32,
    NumericKind::U64,
];

/// The real (non-integer) kinds.
pub(crate) const REAL_KINDS: [NumericKind; 3] =
    [NumericKind::F32, NumericKind::F64, NumericKind::Decimal];

/// All integer kinds.
pub(crate) const INTEGER_KINDS: [NumericKind; 8] = [
    NumericKind::I8,
    NumericKind::I16,
    NumericKind::I32,
    NumericKind::I64,
    NumericKind::U8,
    NumericKind::U16,
    NumericKind::U32,
    NumericKind::U64,
];

/// All numeric kinds.
pub(crate) const ALL_KINDS: [NumericKind; 11] = [
    NumericKind::I8,
    NumericKind::I16,
    NumericKind::I32,
    NumericKind::I64,
    NumericKind::U8,
    NumericKind::U16,
    NumericKind::U32,
    NumericKind::U64,
    NumericKind::F32,
    NumericKind::F64,
    NumericKind::Decimal,
];

impl NumericKind {
    /// Resolve the numeric domain of a type identity, if it has one.
    pub fn of(type_id: TypeId) -> Option<NumericKind> {
        match type_id {
            well_known::INT8 => Some(NumericKind::I8),
            well_known::INT16 => Some(NumericKind::I16),
            well_known::INT32 => Some(NumericKind::I32),
            well_known::INT64 => Some(NumericKind::I64),
            well_known::UINT8 => Some(NumericKind::U8),
            well_known::UINT16 => Some(NumericKind::U16),
            well_known::UINT32 => Some(NumericKind::U32),
            well_known::UINT64 => Some(NumericKind::U64),
            well_known::FLOAT => Some(NumericKind::F32),
            well_known::DOUBLE => Some(NumericKind::F64),
            well_known::DECIMAL => Some(NumericKind::Decimal),
            _ => None,
        }
    }

    /// The type identity of this domain.
    pub fn type_id(self) -> TypeId {
        match self {
            NumericKind::I8 => well_known::INT8,
            NumericKind::I16 => well_known::INT16,
            NumericKind::I32 => well_known::INT32,
            NumericKind::I64 => well_known::INT64,
            NumericKind::U8 => well_known::UINT8,
            NumericKind::U16 => well_known::UINT16,
            NumericKind::U32 => well_known::UINT32,
            NumericKind::U64 => well_known::UINT64,
            NumericKind::F32 => well_known::FLOAT,
            NumericKind::F64 => well_known::DOUBLE,
            NumericKind::Decimal => well_known::DECIMAL,
        }
    }

    /// The language-level name of this domain.
    pub fn name(self) -> &'static str {
        match self {
            NumericKind::I8 => "int8",
            NumericKind::I16 => "int16",
            NumericKind::I32 => "int",
            NumericKind::I64 => "int64",
            NumericKind::U8 => "uint8",
            NumericKind::U16 => "uint16",
            NumericKind::U32 => "uint",
            NumericKind::U64 => "uint64",
            NumericKind::F32 => "float",
            NumericKind::F64 => "double",
            NumericKind::Decimal => "decimal",
        }
    }

    /// True for the signed integer domains.
    pub fn is_signed_integer(self) -> bool {
        matches!(
            self,
            NumericKind::I8 | NumericKind::I16 | NumericKind::I32 | NumericKind::I64
        )
    }

    /// True for the unsigned integer domains.
    pub fn is_unsigned_integer(self) -> bool {
        matches!(
            self,
            NumericKind::U8 | NumericKind::U16 | NumericKind::U32 | NumericKind::U64
        )
    }

    /// True for any integer domain.
    pub fn is_integer(self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    /// True for the binary floating domains.
    pub fn is_floating(self) -> bool {
        matches!(self, NumericKind::F32 | NumericKind::F64)
    }

    /// Bit width of an integer domain, if this is one.
    pub fn bit_width(self) -> Option<u32> {
        match self {
            NumericKind::I8 | NumericKind::U8 => Some(8),
            NumericKind::I16 | NumericKind::U16 => Some(16),
            NumericKind::I32 | NumericKind::U32 => Some(32),
            NumericKind::I64 | NumericKind::U64 => Some(64),
            _ => None,
        }
    }

    /// Index into the common-type table. The row/column order is fixed and
    /// must not change independently of [`LARGEST`].
    fn table_index(self) -> usize {
        match self {
            NumericKind::I16 => 0,
            NumericKind::I32 => 1,
            NumericKind::I64 => 2,
            NumericKind::U16 => 3,
            NumericKind::U32 => 4,
            NumericKind::U64 => 5,
            NumericKind::I8 => 6,
            NumericKind::U8 => 7,
            NumericKind::F32 => 8,
            NumericKind::F64 => 9,
            NumericKind::Decimal => 10,
        }
    }

    /// The largest domain both `self` and `other` convert to without loss of
    /// ordering, used for comparisons.
    pub fn common_with(self, other: NumericKind) -> NumericKind {
        LARGEST[self.table_index()][other.table_index()]
    }
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Largest safe comparison domain for each pair of numeric domains.
///
/// The decimal row/column crossings with the binary float domains are
/// special-cased in [`compare_numeric`] before this table is consulted,
/// because that direction can overflow; those cells fall back to `F64`.
const LARGEST: [[NumericKind; 11]; 11] = {
    use NumericKind::*;
    [
        //          I16  I32  I64  U16  U32  U64      I8   U8   F32  F64  Decimal
        /* I16 */ [I16, I32, I64, I32, I64, F64, I16, I16, F32, F64, Decimal],
        /* I32 */ [I32, I32, I64, I32, I64, F64, I32, I32, F64, F64, Decimal],
        /* I64 */ [I64, I64, I64, I64, I64, Decimal, I64, I64, F64, F64, Decimal],
        /* U16 */ [I32, I32, I64, U16, U32, U64, I32, U16, F32, F64, Decimal],
        /* U32 */ [I64, I64, I64, U32, U32, U64, I64, U32, F64, F64, Decimal],
        /* U64 */ [F64, F64, Decimal, U64, U64, U64, F64, U64, F64, F64, Decimal],
        /* I8  */ [I16, I32, I64, I32, I64, F64, I8, I16, F32, F64, Decimal],
        /* U8  */ [I16, I32, I64, U16, U32, U64, I16, U8, F32, F64, Decimal],
        /* F32 */ [F32, F64, F64, F32, F64, F64, F32, F32, F32, F64, F64],
        /* F64 */ [F64, F64, F64, F64, F64, F64, F64, F64, F64, F64, F64],
        /* Dec */ [
            Decimal, Decimal, Decimal, Decimal, Decimal, Decimal, Decimal, Decimal, F64, F64,
            Decimal,
        ],
    ]
};

// ============================================================================
// Decimal
// ============================================================================

/// Scaled decimal value: `mantissa / 10^scale`.
///
/// The mantissa is bounded to 96 bits and the scale to 28 digits, matching
/// the envelope of the classic decimal floating type this domain models.
#[derive(Clone, Copy, Debug)]
pub struct Decimal {
    mantissa: i128,
    scale: u32,
}

/// Maximum number of fractional digits a decimal carries.
pub const DECIMAL_MAX_SCALE: u32 = 28;

const MANTISSA_LIMIT: i128 = 1i128 << 96;

impl Decimal {
    /// Zero.
    pub const ZERO: Decimal = Decimal {
        mantissa: 0,
        scale: 0,
    };

    /// Build from a raw mantissa and scale, rejecting out-of-envelope input.
    pub fn new(mantissa: i128, scale: u32) -> Option<Decimal> {
        if scale > DECIMAL_MAX_SCALE || mantissa.abs() >= MANTISSA_LIMIT {
            return None;
        }
        Some(Decimal { mantissa, scale })
    }

    /// Build from an integer. Always succeeds for 64-bit inputs.
    pub fn from_i128(value: i128) -> Option<Decimal> {
        Decimal::new(value, 0)
    }

    /// Build from a binary float. Fails on non-finite input and values
    /// outside the decimal envelope.
    pub fn try_from_f64(value: f64) -> Option<Decimal> {
        if !value.is_finite() {
            return None;
        }
        // Rust renders floats as the shortest decimal string that round
        // trips, which is exactly the digit sequence wanted here.
        Decimal::parse(&value.to_string())
    }

    /// Parse a plain decimal literal: optional sign, digits, optional
    /// fractional part. Exponent forms are not accepted; callers fall back
    /// to the double-based route for those.
    pub fn parse(text: &str) -> Option<Decimal> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        let mut mantissa: i128 = 0;
        for ch in int_part.chars() {
            let d = ch.to_digit(10)? as i128;
            mantissa = mantissa.checked_mul(10)?.checked_add(d)?;
            if mantissa >= MANTISSA_LIMIT {
                return None;
            }
        }
        let mut scale = 0u32;
        for ch in frac_part.chars() {
            let d = ch.to_digit(10)? as i128;
            if scale == DECIMAL_MAX_SCALE || mantissa.checked_mul(10)? >= MANTISSA_LIMIT {
                // Out of precision; round on the first dropped digit and
                // ignore the rest.
                if d >= 5 {
                    mantissa += 1;
                }
                break;
            }
            mantissa = mantissa * 10 + d;
            scale += 1;
        }
        if negative {
            mantissa = -mantissa;
        }
        Decimal::new(mantissa, scale)
    }

    /// The value as a binary double. Lossy for mantissas beyond 53 bits.
    pub fn to_f64(self) -> f64 {
        self.mantissa as f64 / 10f64.powi(self.scale as i32)
    }

    /// Round to an integer with banker's rounding (half to even).
    pub fn to_i128_rounded(self) -> i128 {
        if self.scale == 0 {
            return self.mantissa;
        }
        let divisor = 10i128.pow(self.scale);
        let quotient = self.mantissa / divisor;
        let remainder = (self.mantissa % divisor).abs();
        let half = divisor / 2;
        let bump = match remainder.cmp(&half) {
            Ordering::Less => 0,
            Ordering::Greater => 1,
            // Exactly half: round toward the even neighbor.
            Ordering::Equal => {
                if quotient % 2 == 0 {
                    0
                } else {
                    1
                }
            }
        };
        if self.mantissa < 0 {
            quotient - bump
        } else {
            quotient + bump
        }
    }

    /// True if the value is exactly zero.
    pub fn is_zero(self) -> bool {
        self.mantissa == 0
    }

    /// Sign of the value: -1, 0, or 1.
    pub fn signum(self) -> i32 {
        self.mantissa.signum() as i32
    }

    /// Strip trailing fractional zeros.
    fn normalized(self) -> Decimal {
        let mut m = self.mantissa;
        let mut s = self.scale;
        while s > 0 && m % 10 == 0 {
            m /= 10;
            s -= 1;
        }
        Decimal {
            mantissa: m,
            scale: s,
        }
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Decimal) -> bool {
        let a = self.normalized();
        let b = other.normalized();
        a.mantissa == b.mantissa && a.scale == b.scale
    }
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Decimal) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Decimal) -> Ordering {
        // Align scales by widening the coarser mantissa; fall back to a
        // double comparison if widening would overflow i128.
        let (a, b) = (self.normalized(), other.normalized());
        let max_scale = a.scale.max(b.scale);
        let widen = |d: Decimal| -> Option<i128> {
            d.mantissa
                .checked_mul(10i128.checked_pow(max_scale - d.scale)?)
        };
        match (widen(a), widen(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => float_cmp(a.to_f64(), b.to_f64()),
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.normalized();
        if d.scale == 0 {
            return write!(f, "{}", d.mantissa);
        }
        let sign = if d.mantissa < 0 { "-" } else { "" };
        let digits = d.mantissa.unsigned_abs().to_string();
        if digits.len() as u32 > d.scale {
            let split = digits.len() - d.scale as usize;
            write!(f, "{sign}{}.{}", &digits[..split], &digits[split..])
        } else {
            let zeros = d.scale as usize - digits.len();
            write!(f, "{sign}0.{}{}", "0".repeat(zeros), digits)
        }
    }
}

// ============================================================================
// Numeric payload extraction
// ============================================================================

enum Num {
    Int(i128),
    Float(f64),
    Dec(Decimal),
}

fn payload(value: &Value) -> Option<Num> {
    match value {
        Value::I8(v) => Some(Num::Int(*v as i128)),
        Value::I16(v) => Some(Num::Int(*v as i128)),
        Value::I32(v) => Some(Num::Int(*v as i128)),
        Value::I64(v) => Some(Num::Int(*v as i128)),
        Value::U8(v) => Some(Num::Int(*v as i128)),
        Value::U16(v) => Some(Num::Int(*v as i128)),
        Value::U32(v) => Some(Num::Int(*v as i128)),
        Value::U64(v) => Some(Num::Int(*v as i128)),
        Value::F32(v) => Some(Num::Float(*v as f64)),
        Value::F64(v) => Some(Num::Float(*v)),
        Value::Decimal(d) => Some(Num::Dec(*d)),
        // Chars convert numerically through their code point.
        Value::Char(c) => Some(Num::Int(*c as u32 as i128)),
        _ => None,
    }
}

/// The numeric domain of a value, or None for non-numeric values.
///
/// Chars are deliberately excluded: they convert numerically but do not
/// participate in numeric comparison or equality promotion.
pub fn numeric_kind_of(value: &Value) -> Option<NumericKind> {
    match value {
        Value::I8(_) => Some(NumericKind::I8),
        Value::I16(_) => Some(NumericKind::I16),
        Value::I32(_) => Some(NumericKind::I32),
        Value::I64(_) => Some(NumericKind::I64),
        Value::U8(_) => Some(NumericKind::U8),
        Value::U16(_) => Some(NumericKind::U16),
        Value::U32(_) => Some(NumericKind::U32),
        Value::U64(_) => Some(NumericKind::U64),
        Value::F32(_) => Some(NumericKind::F32),
        Value::F64(_) => Some(NumericKind::F64),
        Value::Decimal(_) => Some(NumericKind::Decimal),
        _ => None,
    }
}

// ============================================================================
// Conversion
// ============================================================================

fn overflow(value: impl fmt::Display, target: NumericKind) -> String {
    format!("value {value} was too large or too small for {}", target.name())
}

/// Build an integer-domain value from a checked i128.
pub fn integer_to_value(value: i128, to: NumericKind) -> Result<Value, String> {
    macro_rules! bounded {
        ($ty:ty, $ctor:path) => {
            <$ty>::try_from(value)
                .map($ctor)
                .map_err(|_| overflow(value, to))
        };
    }
    match to {
        NumericKind::I8 => bounded!(i8, Value::I8),
        NumericKind::I16 => bounded!(i16, Value::I16),
        NumericKind::I32 => bounded!(i32, Value::I32),
        NumericKind::I64 => bounded!(i64, Value::I64),
        NumericKind::U8 => bounded!(u8, Value::U8),
        NumericKind::U16 => bounded!(u16, Value::U16),
        NumericKind::U32 => bounded!(u32, Value::U32),
        NumericKind::U64 => bounded!(u64, Value::U64),
        NumericKind::F32 => Ok(Value::F32(value as f32)),
        NumericKind::F64 => Ok(Value::F64(value as f64)),
        NumericKind::Decimal => Decimal::from_i128(value)
            .map(Value::Decimal)
            .ok_or_else(|| overflow(value, to)),
    }
}

/// Convert a numeric (or char) value to the given domain, checking range.
///
/// Binary floats round to integers with banker's rounding. Conversions into
/// decimal from values outside its envelope fail with an overflow message
/// rather than panicking, so callers can apply the double-based fallback.
pub fn convert_numeric(value: &Value, to: NumericKind) -> Result<Value, String> {
    let num = payload(value).ok_or_else(|| "value is not numeric".to_string())?;
    match num {
        Num::Int(v) => integer_to_value(v, to),
        Num::Float(f) => match to {
            NumericKind::F32 => {
                let narrowed = f as f32;
                if f.is_finite() && !narrowed.is_finite() {
                    Err(overflow(f, to))
                } else {
                    Ok(Value::F32(narrowed))
                }
            }
            NumericKind::F64 => Ok(Value::F64(f)),
            NumericKind::Decimal => Decimal::try_from_f64(f)
                .map(Value::Decimal)
                .ok_or_else(|| overflow(f, to)),
            _ => {
                if !f.is_finite() {
                    return Err(overflow(f, to));
                }
                let rounded = f.round_ties_even();
                if rounded < -1.8e19 || rounded > 1.9e19 {
                    return Err(overflow(f, to));
                }
                integer_to_value(rounded as i128, to)
            }
        },
        Num::Dec(d) => match to {
            NumericKind::Decimal => Ok(Value::Decimal(d)),
            NumericKind::F32 => Ok(Value::F32(d.to_f64() as f32)),
            NumericKind::F64 => Ok(Value::F64(d.to_f64())),
            _ => integer_to_value(d.to_i128_rounded(), to),
        },
    }
}

// ============================================================================
// Comparison
// ============================================================================

/// C#-style float ordering: NaN sorts below every number and equals itself.
fn float_cmp(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Compare a decimal with another numeric by converting the other side into
/// decimal; on overflow, both sides degrade to doubles.
fn compare_via_decimal(d: Decimal, other: &Value) -> Ordering {
    let other_dec = match payload(other) {
        Some(Num::Int(v)) => Decimal::from_i128(v),
        Some(Num::Float(f)) => Decimal::try_from_f64(f),
        Some(Num::Dec(o)) => Some(o),
        None => None,
    };
    match other_dec {
        Some(o) => d.cmp(&o),
        None => {
            let other_f = match payload(other) {
                Some(Num::Float(f)) => f,
                Some(Num::Int(v)) => v as f64,
                _ => return Ordering::Less,
            };
            float_cmp(d.to_f64(), other_f)
        }
    }
}

/// Compare two numeric values through their largest common domain.
///
/// Returns None when either value is not numeric.
pub fn compare_numeric(a: &Value, b: &Value) -> Option<Ordering> {
    let ka = numeric_kind_of(a)?;
    let kb = numeric_kind_of(b)?;

    // Decimal against a binary float can overflow during promotion, so it
    // routes through the checked decimal comparison.
    if ka == NumericKind::Decimal && kb.is_floating() {
        if let Value::Decimal(d) = a {
            return Some(compare_via_decimal(*d, b));
        }
    }
    if kb == NumericKind::Decimal && ka.is_floating() {
        if let Value::Decimal(d) = b {
            return Some(compare_via_decimal(*d, a).reverse());
        }
    }

    let common = ka.common_with(kb);
    match (convert_numeric(a, common), convert_numeric(b, common)) {
        (Ok(ca), Ok(cb)) => Some(cmp_same_kind(&ca, &cb)),
        _ => {
            let fa = match payload(a)? {
                Num::Int(v) => v as f64,
                Num::Float(f) => f,
                Num::Dec(d) => d.to_f64(),
            };
            let fb = match payload(b)? {
                Num::Int(v) => v as f64,
                Num::Float(f) => f,
                Num::Dec(d) => d.to_f64(),
            };
            Some(float_cmp(fa, fb))
        }
    }
}

fn cmp_same_kind(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::F32(x), Value::F32(y)) => float_cmp(*x as f64, *y as f64),
        (Value::F64(x), Value::F64(y)) => float_cmp(*x, *y),
        (Value::Decimal(x), Value::Decimal(y)) => x.cmp(y),
        _ => match (payload(a), payload(b)) {
            (Some(Num::Int(x)), Some(Num::Int(y))) => x.cmp(&y),
            _ => Ordering::Equal,
        },
    }
}

/// Sign of a numeric value (-1, 0, 1), used for ordering against null.
pub fn sign_of(value: &Value) -> Option<i32> {
    match payload(value)? {
        Num::Int(v) => Some(v.signum() as i32),
        Num::Float(f) => {
            if f.is_nan() {
                Some(-1)
            } else if f > 0.0 {
                Some(1)
            } else if f < 0.0 {
                Some(-1)
            } else {
                Some(0)
            }
        }
        Num::Dec(d) => Some(d.signum()),
    }
}

/// Zero test for numerics, used by the boolean conversions. NaN is nonzero.
pub fn is_zero(value: &Value) -> Option<bool> {
    match numeric_kind_of(value)? {
        NumericKind::F32 | NumericKind::F64 => match payload(value)? {
            Num::Float(f) => Some(f == 0.0),
            _ => None,
        },
        NumericKind::Decimal => match value {
            Value::Decimal(d) => Some(d.is_zero()),
            _ => None,
        },
        _ => match payload(value)? {
            Num::Int(v) => Some(v == 0),
            _ => None,
        },
    }
}

/// Render a numeric value as culture-invariant text.
///
/// Integer domains print their digits; the binary float domains use Rust's
/// shortest-round-trip rendering, which preserves value fidelity across a
/// string round trip.
pub fn render_numeric(value: &Value) -> Option<String> {
    match value {
        Value::I8(v) => Some(v.to_string()),
        Value::I16(v) => Some(v.to_string()),
        Value::I32(v) => Some(v.to_string()),
        Value::I64(v) => Some(v.to_string()),
        Value::U8(v) => Some(v.to_string()),
        Value::U16(v) => Some(v.to_string()),
        Value::U32(v) => Some(v.to_string()),
        Value::U64(v) => Some(v.to_string()),
        Value::F32(v) => Some(v.to_string()),
        Value::F64(v) => Some(v.to_string()),
        Value::Decimal(d) => Some(d.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_of_type_ids_round_trip() {
        for kind in ALL_KINDS {
            assert_eq!(NumericKind::of(kind.type_id()), Some(kind));
        }
        assert_eq!(NumericKind::of(well_known::STRING), None);
    }

    #[test]
    fn common_type_symmetric_cases() {
        assert_eq!(
            NumericKind::I32.common_with(NumericKind::U32),
            NumericKind::I64
        );
        assert_eq!(
            NumericKind::U32.common_with(NumericKind::I32),
            NumericKind::I64
        );
        assert_eq!(
            NumericKind::I64.common_with(NumericKind::U64),
            NumericKind::Decimal
        );
        assert_eq!(
            NumericKind::U64.common_with(NumericKind::I16),
            NumericKind::F64
        );
    }

    #[test]
    fn integer_narrowing_bounds() {
        assert_eq!(
            convert_numeric(&Value::I32(127), NumericKind::I8).unwrap(),
            Value::I8(127)
        );
        assert!(convert_numeric(&Value::I32(128), NumericKind::I8).is_err());
        assert!(convert_numeric(&Value::I32(-1), NumericKind::U32).is_err());
    }

    #[test]
    fn float_rounds_half_even() {
        assert_eq!(
            convert_numeric(&Value::F64(2.5), NumericKind::I32).unwrap(),
            Value::I32(2)
        );
        assert_eq!(
            convert_numeric(&Value::F64(3.5), NumericKind::I32).unwrap(),
            Value::I32(4)
        );
        assert_eq!(
            convert_numeric(&Value::F64(-2.5), NumericKind::I32).unwrap(),
            Value::I32(-2)
        );
    }

    #[test]
    fn char_converts_through_code_point() {
        assert_eq!(
            convert_numeric(&Value::Char('A'), NumericKind::I32).unwrap(),
            Value::I32(65)
        );
        assert_eq!(
            convert_numeric(&Value::Char('A'), NumericKind::F64).unwrap(),
            Value::F64(65.0)
        );
    }

    #[test]
    fn double_max_to_decimal_fails_cleanly() {
        let err = convert_numeric(&Value::F64(f64::MAX), NumericKind::Decimal);
        assert!(err.is_err());
    }

    #[test]
    fn decimal_parse_and_display() {
        let d = Decimal::parse("3.14").unwrap();
        assert_eq!(d.to_string(), "3.14");
        assert_eq!(Decimal::parse("-0.5").unwrap().to_string(), "-0.5");
        assert_eq!(Decimal::parse("42").unwrap().to_string(), "42");
        assert_eq!(Decimal::parse("1.500").unwrap().to_string(), "1.5");
        assert!(Decimal::parse("").is_none());
        assert!(Decimal::parse("abc").is_none());
    }

    #[test]
    fn decimal_equality_ignores_scale() {
        assert_eq!(Decimal::parse("1.50").unwrap(), Decimal::parse("1.5").unwrap());
        assert_ne!(Decimal::parse("1.51").unwrap(), Decimal::parse("1.5").unwrap());
    }

    #[test]
    fn decimal_ordering() {
        let a = Decimal::parse("1.5").unwrap();
        let b = Decimal::parse("2.25").unwrap();
        assert!(a < b);
        assert!(Decimal::parse("-3").unwrap() < Decimal::ZERO);
    }

    #[test]
    fn decimal_rounding_half_even() {
        assert_eq!(Decimal::parse("2.5").unwrap().to_i128_rounded(), 2);
        assert_eq!(Decimal::parse("3.5").unwrap().to_i128_rounded(), 4);
        assert_eq!(Decimal::parse("-2.5").unwrap().to_i128_rounded(), -2);
    }

    #[test]
    fn compare_across_domains() {
        use std::cmp::Ordering::*;
        assert_eq!(compare_numeric(&Value::I32(5), &Value::U64(5)), Some(Equal));
        assert_eq!(compare_numeric(&Value::I32(-1), &Value::U64(0)), Some(Less));
        assert_eq!(
            compare_numeric(&Value::F64(2.5), &Value::I32(2)),
            Some(Greater)
        );
        assert_eq!(
            compare_numeric(&Value::Str("x".to_string()), &Value::I32(2)),
            None
        );
    }

    #[test]
    fn compare_decimal_against_huge_double_falls_back() {
        let d = Value::Decimal(Decimal::parse("1").unwrap());
        assert_eq!(
            compare_numeric(&d, &Value::F64(f64::MAX)),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_numeric(&Value::F64(f64::MAX), &d),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn nan_sorts_below_numbers() {
        assert_eq!(
            compare_numeric(&Value::F64(f64::NAN), &Value::I32(0)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn sign_queries() {
        assert_eq!(sign_of(&Value::I32(5)), Some(1));
        assert_eq!(sign_of(&Value::I32(0)), Some(0));
        assert_eq!(sign_of(&Value::F64(-0.5)), Some(-1));
        assert_eq!(sign_of(&Value::Str("s".to_string())), None);
    }

    #[test]
    fn renders_round_trip_floats() {
        assert_eq!(render_numeric(&Value::F64(3.14)).unwrap(), "3.14");
        assert_eq!(render_numeric(&Value::F32(0.5)).unwrap(), "0.5");
        assert_eq!(render_numeric(&Value::U64(u64::MAX)).unwrap(), u64::MAX.to_string());
    }
}
