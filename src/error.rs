//! Error types for value conversion.
//!
//! All conversion failures surface as [`CastError`]. The taxonomy matters to
//! callers:
//!
//! ```text
//! CastError
//! ├── InvalidCast       - no applicable strategy, or a strategy failed
//! ├── NotSupported      - destination rejected by the constrained-mode gate
//! ├── MemberNotFound    - property-bag application hit an unknown member
//! ├── MemberSetFailure  - property-bag application could not set a member
//! ├── Comparison        - comparing two values required a conversion that failed
//! └── NotOrdered        - a compared value defines no natural ordering
//! ```
//!
//! `InvalidCast` and `NotSupported` are the "conversion-shaped" kinds: they
//! are the only ones the `try_` variants of the engine surface absorb. The
//! member errors are routed through a caller-replaceable handler (see
//! `ConversionEngine::set_member_error_handler`) because the interpreter
//! layer decides their severity, not this crate.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CastError>;

/// Errors raised by the conversion engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CastError {
    /// No applicable conversion strategy, or the chosen strategy's underlying
    /// operation failed. Always carries the rendered source value, its type
    /// name, the destination type name, and the innermost failure's message.
    #[error("cannot convert \"{value_text}\" of type '{from_type}' to type '{to_type}': {reason}")]
    InvalidCast {
        /// The source value rendered as text.
        value_text: String,
        /// The source value's type name.
        from_type: String,
        /// The destination type name.
        to_type: String,
        /// The innermost failure message, or a generic explanation.
        reason: String,
    },

    /// The destination type was rejected by the security gate while the
    /// constrained language mode is active. Distinct from [`InvalidCast`]
    /// so callers can report a policy violation rather than a type mismatch;
    /// cached and propagated the same way otherwise.
    ///
    /// [`InvalidCast`]: CastError::InvalidCast
    #[error("type '{to_type}' is not allowed in constrained language mode")]
    NotSupported {
        /// The rejected destination type name.
        to_type: String,
    },

    /// A property carried by a bag or dictionary has no counterpart on the
    /// destination type.
    #[error("property '{name}' does not exist on type '{type_name}'; settable properties: {available}")]
    MemberNotFound {
        /// The missing property name.
        name: String,
        /// The destination type name.
        type_name: String,
        /// Comma-separated list of settable property names.
        available: String,
    },

    /// A property exists on the destination type but could not be assigned.
    #[error("cannot set property '{name}' on type '{type_name}': {reason}")]
    MemberSetFailure {
        /// The property name.
        name: String,
        /// The destination type name.
        type_name: String,
        /// Why the assignment failed.
        reason: String,
    },

    /// Comparing two values required converting the second to the type of the
    /// first, and that conversion failed.
    #[error("cannot compare \"{first}\" with \"{second}\": {reason}")]
    Comparison {
        /// The first value rendered as text.
        first: String,
        /// The second value rendered as text.
        second: String,
        /// The underlying conversion failure message.
        reason: String,
    },

    /// The first value of a comparison defines no natural ordering and the
    /// two values are not equal.
    #[error("value \"{value_text}\" of type '{type_name}' does not define an ordering")]
    NotOrdered {
        /// The unordered value rendered as text.
        value_text: String,
        /// The unordered value's type name.
        type_name: String,
    },
}

impl CastError {
    /// Build an [`InvalidCast`] error from the rendered pieces.
    ///
    /// [`InvalidCast`]: CastError::InvalidCast
    pub fn invalid_cast(
        value_text: impl Into<String>,
        from_type: impl Into<String>,
        to_type: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CastError::InvalidCast {
            value_text: value_text.into(),
            from_type: from_type.into(),
            to_type: to_type.into(),
            reason: reason.into(),
        }
    }

    /// True for the conversion-shaped failure kinds — the ones
    /// `try_convert_to`/`try_compare` absorb rather than propagate.
    pub fn is_conversion_failure(&self) -> bool {
        matches!(
            self,
            CastError::InvalidCast { .. } | CastError::NotSupported { .. }
        )
    }

    /// The innermost failure message, for wrapping into an outer error.
    pub fn reason(&self) -> String {
        match self {
            CastError::InvalidCast { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_cast_display() {
        let err = CastError::invalid_cast("abc", "string", "int", "not a number");
        assert_eq!(
            format!("{err}"),
            "cannot convert \"abc\" of type 'string' to type 'int': not a number"
        );
    }

    #[test]
    fn not_supported_display() {
        let err = CastError::NotSupported {
            to_type: "session".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "type 'session' is not allowed in constrained language mode"
        );
    }

    #[test]
    fn conversion_failure_predicate() {
        assert!(CastError::invalid_cast("x", "a", "b", "r").is_conversion_failure());
        assert!(
            CastError::NotSupported {
                to_type: "t".to_string()
            }
            .is_conversion_failure()
        );
        assert!(
            !CastError::MemberNotFound {
                name: "Name".to_string(),
                type_name: "Point".to_string(),
                available: "X, Y".to_string(),
            }
            .is_conversion_failure()
        );
    }

    #[test]
    fn member_not_found_display() {
        let err = CastError::MemberNotFound {
            name: "Z".to_string(),
            type_name: "Point".to_string(),
            available: "X, Y".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "property 'Z' does not exist on type 'Point'; settable properties: X, Y"
        );
    }
}
