//! Display Transforms
//!
//! Named transforms that resource definitions can attach to a field by
//! name. Each one becomes a [`DisplayFn`] at registry build time.

use super::component::{Badge, DisplayValue, Link, Stack, StackDirection, Text};
use super::fetcher::extract_json_value;
use super::field::DisplayFn;
use super::registry::ColorDef;
use anyhow::{bail, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Display transform reference from a resource definition
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayDef {
    pub kind: String,
    /// Color map used by `badge`
    #[serde(default)]
    pub color_map: Option<String>,
    /// Record paths rendered by `stack`
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub direction: StackDirection,
}

/// Build a display transform from its definition
pub fn build_display(def: &DisplayDef, color_maps: &HashMap<String, Vec<ColorDef>>) -> Result<DisplayFn> {
    let transform: DisplayFn = match def.kind.as_str() {
        "badge" => {
            let colors = match def.color_map {
                Some(ref name) => match color_maps.get(name) {
                    Some(colors) => colors.clone(),
                    None => bail!("unknown color map '{}'", name),
                },
                None => Vec::new(),
            };
            display_fn(move |raw, _record| {
                let label = display_string(raw);
                let color = colors.iter().find(|c| c.value == label).map(|c| c.color);
                Ok(Badge::new(&label, color).into())
            })
        }
        "uppercase" => display_fn(|raw, _record| Ok(map_string(raw, |s| s.to_uppercase()))),
        "date" => display_fn(|raw, _record| Ok(map_string(raw, format_timestamp_short))),
        "short_name" => display_fn(|raw, _record| Ok(map_string(raw, extract_short_name))),
        "bytes" => display_fn(|raw, _record| {
            let bytes = match raw {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            };
            Ok(match bytes {
                Some(bytes) => json!(format_bytes(bytes)),
                None => raw.clone(),
            }
            .into())
        }),
        // labelled by the last path segment; non-strings pass through
        "link" => display_fn(|raw, _record| match raw {
            Value::String(href) if !href.is_empty() => {
                Ok(Link::new(&extract_short_name(href), href).into())
            }
            other => Ok(other.clone().into()),
        }),
        "count" => display_fn(|raw, _record| {
            let count = raw.as_array().map(|a| a.len()).unwrap_or(0);
            Ok(json!(count).into())
        }),
        "stack" => {
            if def.paths.is_empty() {
                bail!("stack transform needs at least one path");
            }
            let paths = def.paths.clone();
            let direction = def.direction;
            display_fn(move |_raw, record| {
                let stack = paths.iter().fold(Stack::new(direction), |stack, path| {
                    stack.push(Text::new(extract_json_value(record, path)))
                });
                Ok(DisplayValue::from(stack))
            })
        }
        other => bail!("unknown display transform '{}'", other),
    };

    Ok(transform)
}

/// Pins the closure signature so parameter types are inferred
fn display_fn<F>(f: F) -> DisplayFn
where
    F: Fn(&Value, &Value) -> Result<DisplayValue> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Apply `f` to string values, leave everything else untouched
fn map_string(raw: &Value, f: impl Fn(&str) -> String) -> DisplayValue {
    match raw {
        Value::String(s) => json!(f(s)).into(),
        other => other.clone().into(),
    }
}

/// Extract short name from a URL-like value
/// e.g., "https://api.example.com/v1/regions/eu-west" -> "eu-west"
fn extract_short_name(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}

/// Format timestamp to short form
fn format_timestamp_short(timestamp: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(timestamp) {
        Ok(parsed) => parsed.format("%Y-%m-%d").to_string(),
        Err(_) if timestamp.len() >= 10 && timestamp.is_char_boundary(10) => timestamp[..10].to_string(),
        Err(_) => timestamp.to_string(),
    }
}

/// Format bytes to human readable
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
