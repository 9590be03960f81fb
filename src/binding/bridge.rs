//! Exception bridge
//!
//! Host failures become catchable script exceptions whose value is the
//! error text; exceptions escaping evaluation are rendered back to text.
//! Also holds the argument and value conversions shared by the bindings.

use crate::error::{BindingError, BindingResult};
use rhai::{Dynamic, EvalAltResult, Position};
use serde_json::Value;

/// Raise a binding error into the engine
pub fn raise(err: BindingError) -> Box<EvalAltResult> {
    match err {
        // Already a script exception; keep its value and position
        BindingError::Script(inner) => inner,
        other => {
            let text = other.to_string();
            tracing::debug!("Raising script exception: {}", text);
            EvalAltResult::ErrorRuntime(Dynamic::from(text), Position::NONE).into()
        }
    }
}

/// Plain text of an exception that escaped evaluation
pub fn describe(err: &EvalAltResult) -> String {
    match err {
        EvalAltResult::ErrorRuntime(value, _) => {
            if value.is_string() {
                value.clone().into_string().unwrap_or_default()
            } else {
                value.to_string()
            }
        }
        EvalAltResult::ErrorInFunctionCall(name, _, inner, _) => {
            // Function-call wrappers only add noise for host errors
            match **inner {
                EvalAltResult::ErrorRuntime(..) => describe(inner),
                _ => format!("{} (in {})", describe(inner), name),
            }
        }
        other => other.to_string(),
    }
}

/// JSON value to script value
pub fn to_script(value: &Value) -> BindingResult<Dynamic> {
    rhai::serde::to_dynamic(value).map_err(BindingError::Script)
}

/// Script value to JSON value
pub fn from_script(value: &Dynamic) -> BindingResult<Value> {
    rhai::serde::from_dynamic::<Value>(value).map_err(|_| {
        BindingError::InvalidArgument(format!(
            "cannot convert {} to a resource value",
            value.type_name()
        ))
    })
}

pub fn expect_string(value: &Dynamic, what: &str) -> BindingResult<String> {
    if value.is_string() {
        return Ok(value.clone().into_string().unwrap_or_default());
    }
    Err(BindingError::InvalidArgument(format!(
        "{} must be a string, got {}",
        what,
        value.type_name()
    )))
}

pub fn expect_int(value: &Dynamic, what: &str) -> BindingResult<i64> {
    value.as_int().map_err(|found| {
        BindingError::InvalidArgument(format!("{} must be an integer, got {}", what, found))
    })
}

pub fn expect_bool(value: &Dynamic, what: &str) -> BindingResult<bool> {
    value.as_bool().map_err(|found| {
        BindingError::InvalidArgument(format!("{} must be a boolean, got {}", what, found))
    })
}
