//! Rendering of evaluation results for the terminal

use crate::binding::{Runtime, ScriptObject};
use rhai::Dynamic;

/// Text for a result, `None` when there is nothing to show.
///
/// Strings print verbatim, script objects through their `inspect`, plain
/// maps and arrays as pretty JSON. Arrays holding script objects print one
/// element per line.
pub fn render(runtime: &Runtime, value: Dynamic) -> Option<String> {
    if value.is_unit() {
        return None;
    }
    if value.is_string() {
        return value.into_string().ok();
    }
    if value.is::<ScriptObject>() {
        return value
            .try_cast::<ScriptObject>()
            .map(|obj| inspect(runtime, &obj));
    }

    if value.is_map() || value.is_array() {
        if let Ok(json) = rhai::serde::from_dynamic::<serde_json::Value>(&value) {
            return serde_json::to_string_pretty(&json).ok();
        }
        if let Ok(items) = value.clone().into_array() {
            let lines: Vec<String> = items
                .into_iter()
                .map(|item| render(runtime, item).unwrap_or_else(|| "()".to_string()))
                .collect();
            return Some(lines.join("\n"));
        }
    }

    Some(value.to_string())
}

/// `inspect` of an object, falling back to its class name
pub fn inspect(runtime: &Runtime, obj: &ScriptObject) -> String {
    runtime
        .invoke(None, obj, "inspect", &[])
        .ok()
        .and_then(|text| text.into_string().ok())
        .unwrap_or_else(|| format!("#<{}>", obj.class_name()))
}
