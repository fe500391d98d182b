//! Helpers that decode named arguments out of an LLM argument payload.
//!
//! These are used by the code generated by `#[tool]` but work just as well in
//! hand-written tool bodies.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{ToolError, ToolResult};

/// Borrows the argument payload as a JSON object.
///
/// `null` is accepted as an empty argument list.
///
/// # Errors
///
/// Returns [`ToolError::InvalidArguments`] when the payload is neither an
/// object nor `null`.
pub fn object(input: &Value) -> ToolResult<Map<String, Value>> {
    match input {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        other => Err(ToolError::invalid_arguments(format!(
            "expected a JSON object, found {}",
            kind_of(other)
        ))),
    }
}

/// Decodes the argument called `name`.
///
/// Absent arguments decode from `null`, so `Option<T>` parameters are optional.
///
/// # Errors
///
/// Returns [`ToolError::MissingArgument`] when the argument is absent and the
/// target type does not accept `null`, or [`ToolError::InvalidArguments`] when
/// the value has the wrong shape.
pub fn required<T>(arguments: &Map<String, Value>, name: &str) -> ToolResult<T>
where
    T: DeserializeOwned,
{
    match arguments.get(name) {
        Some(value) => serde_json::from_value(value.clone()).map_err(|err| {
            ToolError::invalid_arguments(format!("argument `{name}`: {err}"))
        }),
        None => serde_json::from_value(Value::Null).map_err(|_| ToolError::MissingArgument {
            name: name.to_owned(),
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
