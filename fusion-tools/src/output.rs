//! Conversions from native return values into tool output.

use std::fmt::Display;

use serde::Serialize;
use serde_json::Value;

use crate::{ToolError, ToolResult};

/// Serialises an infallible return value.
///
/// # Errors
///
/// Returns [`ToolError::Execution`] if the value cannot be represented as JSON.
pub fn from_value<T>(value: T) -> ToolResult<Value>
where
    T: Serialize,
{
    serde_json::to_value(value)
        .map_err(|err| ToolError::execution(format!("failed to serialise tool output: {err}")))
}

/// Serialises a fallible return value, mapping `Err` into [`ToolError::Execution`].
///
/// # Errors
///
/// Returns [`ToolError::Execution`] carrying the error's display text, or when
/// the success value cannot be represented as JSON.
pub fn from_result<T, E>(result: Result<T, E>) -> ToolResult<Value>
where
    T: Serialize,
    E: Display,
{
    match result {
        Ok(value) => from_value(value),
        Err(err) => Err(ToolError::execution(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn maps_error_display_text() {
        let result: Result<i32, String> = Err("division by zero".into());
        let err = from_result(result).expect_err("error result");
        assert_eq!(err, ToolError::execution("division by zero"));
    }

    #[test]
    fn serialises_structs() {
        #[derive(Serialize)]
        struct Weather {
            city: &'static str,
            temperature: i32,
        }

        let value = from_value(Weather {
            city: "Recife",
            temperature: 28,
        })
        .unwrap();
        assert_eq!(value, json!({"city": "Recife", "temperature": 28}));
    }
}
