//! brinecast — the dynamic value-conversion engine of the Brine shell.
//!
//! Given an arbitrary runtime [`Value`] and a desired destination type, the
//! engine decides whether and how to convert, and performs the conversion
//! according to a fixed precedence of strategies: identity/assignability,
//! built-in language rules, enum matching, parse methods, constructors,
//! cast operators, the convertible fallback, dictionary and property-bag
//! application, and pluggable custom converters. Discovered strategies are
//! cached per `(source type, destination type)` pair for the process
//! lifetime.
//!
//! ## Example
//!
//! ```
//! use brinecast::{ConversionEngine, Value, well_known};
//!
//! let engine = ConversionEngine::new();
//!
//! let n = engine
//!     .convert_to(&Value::Str("42".to_string()), well_known::INT32)
//!     .unwrap();
//! assert_eq!(n, Value::I32(42));
//!
//! assert!(engine.is_true(&Value::Str("x".to_string())));
//! assert!(!engine.is_true(&Value::I32(0)));
//! ```
//!
//! Because Rust has no runtime reflection, script-level types are described
//! in a [`TypeRegistry`]: hosts register enums, classes (with constructors,
//! parse methods, cast operators, and properties), delegates, and
//! collections, and the engine discovers conversions against those
//! descriptions.

pub mod array;
pub mod cache;
pub mod custom;
pub mod engine;
pub mod enum_match;
pub mod error;
pub mod numeric;
pub mod rank;
pub mod registry;
pub mod strategy;
pub mod type_id;
pub mod types;
pub mod value;

pub use crate::custom::{
    BagConverter, ConverterHandle, ConverterMap, ConverterTable, ValueConverter,
};
pub use crate::engine::{ConversionEngine, LanguageMode, MemberErrorHandler, NumberScanner};
pub use crate::enum_match::{EnumCache, EnumDescriptor};
pub use crate::error::{CastError, Result};
pub use crate::numeric::{Decimal, NumericKind};
pub use crate::rank::ConversionRank;
pub use crate::registry::TypeRegistry;
pub use crate::strategy::Strategy;
pub use crate::type_id::{TypeId, well_known};
pub use crate::types::{
    CastOperator, ClassEntry, Constructor, ElementCtor, EnumSpec, MethodSig, PropertySpec,
    ScalarKind, TypeCaps, TypeEntry, TypeKind,
};
pub use crate::value::{
    BagProperty, BoundDelegate, Culture, DelegateTarget, DictValue, EnumValue, ListValue,
    MethodGroup, PropertyBag, ScriptBlock, ScriptObject, SessionHandle, Value,
};
