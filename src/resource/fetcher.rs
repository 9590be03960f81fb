//! Resource Fetcher
//!
//! Standard list callback for descriptor-driven kinds, plus dot-path helpers
//! used by field accessors.

use super::api::{ListOptions, ResourceApi};
use super::registry::ResourceClassDescriptor;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Fetch every item of a kind and stamp `kind`/`apiVersion` onto each.
///
/// List responses omit both on items; stamping keeps a projected item
/// self-describing after it leaves its collection.
pub fn fetch_items(
    api: &dyn ResourceApi,
    descriptor: &ResourceClassDescriptor,
    scope: &str,
    options: &ListOptions,
) -> Result<Vec<Value>> {
    let list = api.fetch_list(&descriptor.api, scope, options)?;

    if let Some(kind) = list.kind.as_deref() {
        if kind != descriptor.collection_alias {
            return Err(anyhow::anyhow!(
                "Expected {} from the API, got {}",
                descriptor.collection_alias,
                kind
            ));
        }
    }

    tracing::debug!(
        "Fetched {} {} in scope {:?}",
        list.items.len(),
        descriptor.key,
        scope
    );

    Ok(list
        .items
        .into_iter()
        .map(|item| post_process_item(item, descriptor))
        .collect())
}

fn post_process_item(mut item: Value, descriptor: &ResourceClassDescriptor) -> Value {
    if let Value::Object(ref mut map) = item {
        map.entry("kind")
            .or_insert_with(|| Value::String(descriptor.item_alias.clone()));
        map.entry("apiVersion")
            .or_insert_with(|| Value::String(descriptor.api.api_version()));
    }
    item
}

/// Look up a value using a dot-notation path (`status.containerStatuses.0.ready`)
pub fn lookup_path<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(item);
    }

    let mut current = item;
    for part in path.split('.') {
        current = match current {
            Value::Array(arr) => arr.get(part.parse::<usize>().ok()?)?,
            Value::Object(map) => map.get(part)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Assign a value at a dot-notation path, creating intermediate objects
pub fn assign_path(item: &mut Value, path: &str, value: Value) -> Result<()> {
    let mut current = item;
    let parts: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = parts.split_last() else {
        return Err(anyhow::anyhow!("Empty field path"));
    };

    for part in parents {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => map
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            Value::Array(arr) => {
                let idx: usize = part
                    .parse()
                    .map_err(|_| anyhow::anyhow!("'{}' is not an array index", part))?;
                let len = arr.len();
                arr.get_mut(idx)
                    .ok_or_else(|| anyhow::anyhow!("Index {} out of range ({} items)", idx, len))?
            }
            _ => return Err(anyhow::anyhow!("Cannot descend into '{}' of {}", part, path)),
        };
    }

    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
            Ok(())
        }
        Value::Array(arr) => {
            let idx: usize = last
                .parse()
                .map_err(|_| anyhow::anyhow!("'{}' is not an array index", last))?;
            let len = arr.len();
            let slot = arr
                .get_mut(idx)
                .ok_or_else(|| anyhow::anyhow!("Index {} out of range ({} items)", idx, len))?;
            *slot = value;
            Ok(())
        }
        _ => Err(anyhow::anyhow!("Cannot assign '{}' of {}", last, path)),
    }
}

/// Format an RFC3339 timestamp as a short age relative to `now`
pub fn format_age(timestamp: &str, now: DateTime<Utc>) -> Option<String> {
    let created = DateTime::parse_from_rfc3339(timestamp).ok()?;
    let secs = (now - created.with_timezone(&Utc)).num_seconds().max(0);

    const MINUTE: i64 = 60;
    const HOUR: i64 = MINUTE * 60;
    const DAY: i64 = HOUR * 24;

    let age = if secs >= DAY {
        let hours = (secs % DAY) / HOUR;
        if hours > 0 {
            format!("{}d{}h", secs / DAY, hours)
        } else {
            format!("{}d", secs / DAY)
        }
    } else if secs >= HOUR {
        let minutes = (secs % HOUR) / MINUTE;
        if minutes > 0 {
            format!("{}h{}m", secs / HOUR, minutes)
        } else {
            format!("{}h", secs / HOUR)
        }
    } else if secs >= MINUTE {
        format!("{}m", secs / MINUTE)
    } else {
        format!("{}s", secs)
    };
    Some(age)
}
