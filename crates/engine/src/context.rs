//! Context bags and their merge rules
//!
//! A [`Context`] is a flat map of named JSON values. Suites, scenarios and
//! tests each carry one; templates are rendered against a merge of the
//! relevant layers.
//!
//! Two merge directions exist and both are load-bearing:
//!
//! - [`merge`] and [`merge_over`]: later layers win (scenario context,
//!   template rendering).
//! - [`merge_under`]: the existing bag wins and incoming keys only fill gaps
//!   (test context recorded by probes).

use std::collections::BTreeMap;

use serde_json::Value;

/// Named values used to parameterize descriptions.
pub type Context = BTreeMap<String, Value>;

/// Shallow merge, left to right. Later layers override earlier ones.
pub fn merge(layers: &[&Context]) -> Context {
    let mut merged = Context::new();
    for layer in layers {
        for (key, value) in layer.iter() {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// `incoming` laid over `existing`: incoming wins on collision.
pub fn merge_over(existing: &Context, incoming: &Context) -> Context {
    merge(&[existing, incoming])
}

/// `incoming` slid under `existing`: existing wins on collision.
pub fn merge_under(existing: &Context, incoming: &Context) -> Context {
    merge(&[incoming, existing])
}

/// Build a context from `(key, value)` pairs.
pub fn ctx<K, V, I>(pairs: I) -> Context
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
