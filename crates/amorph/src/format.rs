//! Canonical textual output and the minified-key alias transform.
//!
//! Canonical serialization relies on an already-present property of
//! this crate's `serde_json` dependency: without the `preserve_order`
//! feature, `Value::Object` is backed by a `BTreeMap`, so keys come out
//! sorted ascending for free. All [`to_canonical`] has to add is 2-space
//! pretty printing and a trailing newline.
//!
//! [`minify`]/[`unminify`] walk a JSON tree swapping every object key
//! for its alias (or back) using the fixed table below — key-only,
//! uniform over every dict regardless of which statement/expression
//! variant it belongs to, and invertible since the table is a bijection.

use serde_json::{Map, Value};

/// `(long, short)` pairs. `id` maps to itself, which is fine: applying
/// the table twice over is still a no-op for that entry, and aliasing
/// only ever touches object keys, so a program that happens to hold a
/// string value equal to one of these names is never affected.
const KEY_ALIASES: &[(&str, &str)] = &[
    ("let", "l"),
    ("def", "d"),
    ("value", "val"),
    ("params", "pa"),
    ("body", "b"),
    ("cond", "co"),
    ("var", "v"),
    ("call", "c"),
    ("name", "n"),
    ("then", "t"),
    ("else", "e"),
    ("return", "r"),
    ("print", "p"),
    ("expr", "x"),
    ("if", "i"),
    ("set", "s"),
    ("id", "id"),
];

fn alias_for(key: &str) -> Option<&'static str> {
    KEY_ALIASES.iter().find(|(long, _)| *long == key).map(|(_, short)| *short)
}

fn unalias_for(key: &str) -> Option<&'static str> {
    KEY_ALIASES.iter().find(|(_, short)| *short == key).map(|(long, _)| *long)
}

/// Render `value` in canonical form: 2-space indent, UTF-8, keys sorted
/// ascending, no trailing whitespace on any line, trailing newline.
#[must_use]
pub fn to_canonical(value: &Value) -> String {
    let mut out = serde_json::to_string_pretty(value).unwrap_or_default();
    out.push('\n');
    out
}

/// Substitute every object key for its alias, recursively.
#[must_use]
pub fn minify_value(value: &Value) -> Value {
    rekey(value, alias_for)
}

/// Substitute every aliased key back to its original name, recursively.
#[must_use]
pub fn unminify_value(value: &Value) -> Value {
    rekey(value, unalias_for)
}

fn rekey(value: &Value, lookup: impl Fn(&str) -> Option<&'static str> + Copy) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(|v| rekey(v, lookup)).collect()),
        Value::Object(obj) => {
            let mut out = Map::new();
            for (k, v) in obj {
                let new_key = lookup(k).map_or_else(|| k.clone(), str::to_string);
                out.insert(new_key, rekey(v, lookup));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// Minify to a compact (no whitespace) JSON byte string.
#[must_use]
pub fn minify(value: &Value) -> Vec<u8> {
    serde_json::to_vec(&minify_value(value)).unwrap_or_default()
}

/// Parse minified JSON bytes and restore original key names.
///
/// # Errors
/// Returns the `serde_json` parse error if `bytes` isn't valid JSON.
pub fn unminify(bytes: &[u8]) -> Result<Value, serde_json::Error> {
    let v: Value = serde_json::from_slice(bytes)?;
    Ok(unminify_value(&v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_output_is_sorted_indented_and_newline_terminated() {
        let v = json!({"b": 1, "a": 2});
        let text = to_canonical(&v);
        assert!(text.ends_with('\n'));
        let a_pos = text.find("\"a\"").unwrap();
        let b_pos = text.find("\"b\"").unwrap();
        assert!(a_pos < b_pos);
        assert!(text.contains("  \"a\""));
    }

    #[test]
    fn minify_replaces_every_known_key_uniformly() {
        let program = json!([
            {"let": {"name": "x", "value": 1}, "id": "amr_aaaaaaaa"},
            {"if": {"cond": {"var": "x"}, "then": [{"print": {"var": "x"}}], "else": []}}
        ]);
        let minified = minify_value(&program);
        assert_eq!(
            minified,
            json!([
                {"l": {"n": "x", "val": 1}, "id": "amr_aaaaaaaa"},
                {"i": {"co": {"v": "x"}, "t": [{"p": {"v": "x"}}], "e": []}}
            ])
        );
    }

    #[test]
    fn unminify_is_the_exact_inverse_of_minify() {
        let program = json!([
            {"def": {"name": "f", "params": ["n"], "body": [
                {"return": {"call": {"name": "f", "args": []}}}
            ]}}
        ]);
        let bytes = minify(&program);
        let restored = unminify(&bytes).unwrap();
        assert_eq!(restored, program);
    }

    #[test]
    fn minify_output_has_no_whitespace() {
        let program = json!([{"expr": {"add": [1, 2]}}]);
        let bytes = minify(&program);
        let text = std::str::from_utf8(&bytes).unwrap();
        assert!(!text.contains(' ') && !text.contains('\n'));
    }
}
