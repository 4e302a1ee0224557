//! `{{ variable }}` interpolation for scenario and test descriptions
//!
//! Only substitution is supported. A tag names a context key, optionally
//! followed by dotted segments into objects or arrays: `{{ url }}`,
//! `{{ suite.name }}`, `{{ events.0.title }}`. Referencing anything that is
//! not in the context is an error.

use serde_json::Value;

use crate::context::Context;
use crate::error::{EngineError, EngineResult};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

pub fn render_str(template: &str, context: &Context) -> EngineResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];
        let end = after.find(CLOSE).ok_or_else(|| {
            EngineError::Template(format!("unterminated tag in {:?}", template))
        })?;

        let path = after[..end].trim();
        if path.is_empty() {
            return Err(EngineError::Template(format!("empty tag in {:?}", template)));
        }
        let value = lookup(context, path).ok_or_else(|| {
            EngineError::Template(format!("undefined variable `{}` in {:?}", path, template))
        })?;
        push_value(&mut out, value);

        rest = &after[end + CLOSE.len()..];
    }

    out.push_str(rest);
    Ok(out)
}

fn lookup<'a>(context: &'a Context, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.').map(str::trim);
    let mut current = context.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn push_value(out: &mut String, value: &Value) {
    match value {
        Value::String(s) => out.push_str(s),
        Value::Null => {}
        other => out.push_str(&other.to_string()),
    }
}
