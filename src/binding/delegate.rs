//! Cross-resource delegation
//!
//! An action such as `pod.logs` does no API work of its own. It allocates
//! an instance of the delegate class, seeds it with the caller's pods and
//! drives the delegate's `get`. Whatever `get` returns or raises goes back
//! to the caller as-is.

use super::bridge::{expect_bool, expect_int, expect_string};
use super::class::{Arity, CallContext, ClassDef};
use super::object::{LogStreamVars, Vars};
use crate::error::{BindingError, BindingResult};
use crate::resource::{lookup_path, ActionDef, ItemIdentity, LogOptions};
use rhai::{Dynamic, Map};
use serde_json::Value;

/// Class driven by the `logs` action
pub const LOG_STREAM_CLASS: &str = "PodLogs";

/// Run a delegating action on behalf of `pods`
pub fn run_action(
    ctx: &CallContext<'_, '_>,
    action: &ActionDef,
    pods: Vec<Value>,
    options: Option<&Dynamic>,
) -> BindingResult<Dynamic> {
    let options = match options {
        Some(value) if !value.is_unit() => parse_log_options(value)?,
        _ => LogOptions::default(),
    };

    tracing::debug!(
        "{} delegating to {} for {} pods",
        action.key,
        action.delegate,
        pods.len()
    );
    let stream = ctx
        .runtime
        .instantiate(&action.delegate, Vars::LogStream(LogStreamVars { pods, options }))?;
    ctx.runtime.invoke(ctx.native, &stream, "get", &[])
}

/// One log stream to read: a pod and maybe a container
struct Target {
    pod: ItemIdentity,
    container: Option<String>,
}

impl Target {
    fn label(&self) -> String {
        match &self.container {
            Some(container) => format!("{}/{}", self.pod, container),
            None => self.pod.to_string(),
        }
    }
}

fn targets(stream: &LogStreamVars) -> BindingResult<Vec<Target>> {
    let mut targets = Vec::new();
    for raw in &stream.pods {
        let pod = ItemIdentity::from_item(raw).ok_or_else(|| {
            BindingError::InvalidArgument("cannot read logs of a pod without a name".to_string())
        })?;

        if let Some(container) = &stream.options.container {
            targets.push(Target {
                pod,
                container: Some(container.clone()),
            });
            continue;
        }

        let containers: Vec<String> = lookup_path(raw, "spec.containers")
            .and_then(|v| v.as_array())
            .map(|list| {
                list.iter()
                    .filter_map(|c| c.get("name").and_then(|n| n.as_str()))
                    .map(|n| n.to_string())
                    .collect()
            })
            .unwrap_or_default();

        if containers.is_empty() {
            // Let the server pick the only container
            targets.push(Target {
                pod,
                container: None,
            });
        } else {
            for container in containers {
                targets.push(Target {
                    pod: pod.clone(),
                    container: Some(container),
                });
            }
        }
    }
    Ok(targets)
}

/// The `PodLogs` class
pub fn log_stream_class() -> ClassDef {
    let mut class = ClassDef::new(LOG_STREAM_CLASS);

    class.method("get", Arity::NONE, |ctx, obj, _| {
        let stream = obj.log_stream("get")?;
        let targets = targets(&stream)?;

        // Collect everything first: one failure means no output at all
        let mut chunks = Vec::with_capacity(targets.len());
        for target in &targets {
            let options = LogOptions {
                container: target.container.clone(),
                ..stream.options.clone()
            };
            let text = ctx.runtime.api().fetch_log_stream(&target.pod, &options)?;
            chunks.push(text);
        }

        if targets.len() == 1 {
            return Ok(Dynamic::from(chunks.remove(0)));
        }

        let mut out = String::new();
        for (target, text) in targets.iter().zip(&chunks) {
            out.push_str(&format!("==> {} <==\n", target.label()));
            out.push_str(text);
            if !text.is_empty() && !text.ends_with('\n') {
                out.push('\n');
            }
        }
        Ok(Dynamic::from(out))
    });

    class.property("inspect", |_, obj| {
        let stream = obj.log_stream("inspect")?;
        Ok(Dynamic::from(format!(
            "#<{} pods={}>",
            LOG_STREAM_CLASS,
            stream.pods.len()
        )))
    });

    class
}

/// `#{container: "app", tail_lines: 100, previous: true, timestamps: true}`
fn parse_log_options(value: &Dynamic) -> BindingResult<LogOptions> {
    let map = value.clone().try_cast::<Map>().ok_or_else(|| {
        BindingError::InvalidArgument(format!(
            "log options must be a map, got {}",
            value.type_name()
        ))
    })?;

    let mut options = LogOptions::default();
    for (key, value) in &map {
        match key.as_str() {
            "container" => options.container = Some(expect_string(value, "container")?),
            "tail_lines" | "tail" => {
                let lines = expect_int(value, "tail_lines")?;
                if lines < 0 {
                    return Err(BindingError::InvalidArgument(format!(
                        "tail_lines must not be negative, got {}",
                        lines
                    )));
                }
                options.tail_lines = Some(lines);
            }
            "previous" => options.previous = expect_bool(value, "previous")?,
            "timestamps" => options.timestamps = expect_bool(value, "timestamps")?,
            other => {
                return Err(BindingError::InvalidArgument(format!(
                    "unknown log option '{}'",
                    other
                )))
            }
        }
    }
    Ok(options)
}
