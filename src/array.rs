//! Array and collection coercion.
//!
//! Covers the array-destination rules: a cheap re-type when element types
//! are assignable, element-wise recursion between unrelated element types,
//! enumeration of enumerable sources, promotion of a scalar into a
//! one-element array, and bulk-filling the string collection. Element
//! conversions recurse into the dispatcher with recursion disabled so a
//! nested element cannot promote itself into yet another array.

use crate::engine::ConversionEngine;
use crate::error::{CastError, Result};
use crate::registry::TypeRegistry;
use crate::type_id::{TypeId, well_known};
use crate::value::{Culture, ListValue, PropertyBag, Value};

fn element_failure(
    registry: &TypeRegistry,
    value: &Value,
    to: TypeId,
    inner: &CastError,
) -> CastError {
    CastError::invalid_cast(
        value.render(registry),
        registry.name_of(value.type_id()),
        registry.name_of(to),
        inner.reason(),
    )
}

/// Array to array with an assignable element type: copy, re-typed.
pub(crate) fn convert_related(list: &ListValue, element: TypeId) -> Value {
    Value::List(ListValue::of(element, list.items.clone()))
}

/// Array to array between unrelated element types: convert each element,
/// failing the whole operation if any element fails.
pub(crate) fn convert_unrelated(
    engine: &ConversionEngine,
    registry: &TypeRegistry,
    value: &Value,
    list: &ListValue,
    to: TypeId,
    element: TypeId,
    culture: &Culture,
) -> Result<Value> {
    let mut items = Vec::with_capacity(list.items.len());
    for item in &list.items {
        let converted = engine
            .convert_in(registry, item, element, false, culture, None)
            .map_err(|inner| element_failure(registry, value, to, &inner))?;
        items.push(converted);
    }
    Ok(Value::List(ListValue::of(element, items)))
}

/// Any enumerable source into an array via enumeration.
pub(crate) fn enumerable_to_array(
    engine: &ConversionEngine,
    registry: &TypeRegistry,
    value: &Value,
    to: TypeId,
    element: TypeId,
    culture: &Culture,
) -> Result<Value> {
    let Some(items) = engine.enumerable_items(value) else {
        return Err(CastError::invalid_cast(
            value.render(registry),
            registry.name_of(value.type_id()),
            registry.name_of(to),
            "the value is not enumerable",
        ));
    };
    let mut converted = Vec::with_capacity(items.len());
    for item in items {
        let item = engine
            .convert_in(registry, &item, element, false, culture, None)
            .map_err(|inner| element_failure(registry, value, to, &inner))?;
        converted.push(item);
    }
    Ok(Value::List(ListValue::of(element, converted)))
}

/// A scalar wrapped into a one-element array. When the scalar arrived in a
/// bag carrying original literal text, the bag itself is converted so that
/// text survives into the element conversion.
pub(crate) fn scalar_to_array(
    engine: &ConversionEngine,
    registry: &TypeRegistry,
    value: &Value,
    original: Option<&PropertyBag>,
    to: TypeId,
    element: TypeId,
    culture: &Culture,
) -> Result<Value> {
    let rewrapped;
    let source: &Value = match original {
        Some(bag) if bag.original_text.is_some() => {
            rewrapped = Value::Bag(Box::new(bag.clone()));
            &rewrapped
        }
        _ => value,
    };
    let converted = engine
        .convert_in(registry, source, element, false, culture, None)
        .map_err(|inner| element_failure(registry, value, to, &inner))?;
    Ok(Value::List(ListValue::of(element, vec![converted])))
}

/// Convert into the bulk string collection: render to a string array, then
/// fill.
pub(crate) fn to_string_list(
    engine: &ConversionEngine,
    registry: &TypeRegistry,
    value: &Value,
    culture: &Culture,
) -> Result<Value> {
    let strings = engine
        .convert_in(
            registry,
            value,
            TypeId::array_of(well_known::STRING),
            false,
            culture,
            None,
        )
        .map_err(|inner| {
            CastError::invalid_cast(
                value.render(registry),
                registry.name_of(value.type_id()),
                registry.name_of(well_known::STRING_LIST),
                inner.reason(),
            )
        })?;
    match strings {
        Value::List(list) => {
            let mut out = Vec::with_capacity(list.items.len());
            for item in list.items {
                match item {
                    Value::Str(s) => out.push(s),
                    other => out.push(other.render(registry)),
                }
            }
            Ok(Value::StringList(out))
        }
        other => Ok(Value::StringList(vec![other.render(registry)])),
    }
}

/// A string exploded into a char array.
pub(crate) fn string_to_char_list(text: &str) -> Value {
    Value::List(ListValue::of(
        well_known::CHAR,
        text.chars().map(Value::Char).collect(),
    ))
}
