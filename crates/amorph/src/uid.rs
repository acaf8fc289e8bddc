//! Stable identifier assignment for statements and functions.
//!
//! IDs look like `amr_1a2b3c4d` (statements) or `fn_1a2b3c4d` (function
//! definitions) — an 8 hex character suffix taken from a fresh v4 UUID.
//!
//! This module works directly on [`serde_json::Value`] rather than the
//! typed [`crate::program`] tree: it only ever adds an `id` key next to
//! whatever a statement object already has, and needs to walk into
//! nested statement lists (`then`, `else`, `body`) generically rather
//! than through a fixed set of typed fields.

use serde_json::{Map, Value};
use uuid::Uuid;

pub const STMT_PREFIX: &str = "amr";
pub const FN_PREFIX: &str = "fn";

/// Generate a fresh id with the given prefix.
#[must_use]
pub fn new_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &hex[..8])
}

/// How far [`assign_uids`] should recurse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// Only the top-level statement list.
    Shallow,
    /// Top-level statements plus every nested statement list reachable
    /// through `then`/`else`/`body`/`program`.
    Deep,
}

/// Assign `id` to every statement, and `def.id` to every function
/// definition, that doesn't already have one. At `Shallow` depth this
/// covers only top-level statements and their defs; at `Deep` it also
/// descends into `then`/`else` blocks and function bodies. Idempotent:
/// statements that already carry an `id` are left untouched, so calling
/// this twice never changes the ids assigned on the first pass. Returns
/// the number of ids assigned.
pub fn assign_uids(stmts: &mut [Value], depth: Depth) -> usize {
    let mut count = 0;
    for stmt in stmts.iter_mut() {
        let Some(obj) = stmt.as_object_mut() else {
            continue;
        };
        count += assign_to_stmt(obj);
        count += assign_to_def(obj);
        if depth == Depth::Deep {
            count += recurse_nested(obj, depth);
        }
    }
    count
}

fn assign_to_stmt(obj: &mut Map<String, Value>) -> usize {
    if obj.contains_key("id") {
        0
    } else {
        obj.insert("id".to_string(), Value::String(new_id(STMT_PREFIX)));
        1
    }
}

/// A `def`'s own stable id (distinct from the statement-level `id`
/// above) is always assigned, at both shallow and deep depth — a
/// function's own def is grouped with the top-level pass.
fn assign_to_def(obj: &mut Map<String, Value>) -> usize {
    let Some(def) = obj.get_mut("def").and_then(Value::as_object_mut) else {
        return 0;
    };
    if def.contains_key("id") {
        0
    } else {
        def.insert("id".to_string(), Value::String(new_id(FN_PREFIX)));
        1
    }
}

fn recurse_nested(obj: &mut Map<String, Value>, depth: Depth) -> usize {
    let mut count = 0;
    if let Some(if_obj) = obj.get_mut("if").and_then(Value::as_object_mut) {
        for key in ["then", "else"] {
            if let Some(Value::Array(nested)) = if_obj.get_mut(key) {
                count += assign_uids(nested, depth);
            }
        }
    }
    if let Some(Value::Array(body)) = obj.get_mut("def").and_then(|d| d.get_mut("body")) {
        count += assign_uids(body, depth);
    }
    count
}

/// True if every statement reachable under `depth` already has an `id`.
#[must_use]
pub fn all_assigned(stmts: &[Value], depth: Depth) -> bool {
    stmts.iter().all(|stmt| {
        let Some(obj) = stmt.as_object() else {
            return true;
        };
        if !obj.contains_key("id") {
            return false;
        }
        if !obj
            .get("def")
            .is_none_or(|d| d.get("id").is_some())
        {
            return false;
        }
        if depth == Depth::Shallow {
            return true;
        }
        if let Some(Value::Array(body)) = obj.get("def").and_then(|d| d.get("body")) {
            if !all_assigned(body, depth) {
                return false;
            }
        }
        if let Some(if_obj) = obj.get("if").and_then(Value::as_object) {
            return ["then", "else"].iter().all(|key| match if_obj.get(*key) {
                Some(Value::Array(nested)) => all_assigned(nested, depth),
                _ => true,
            });
        }
        true
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assigns_missing_ids_shallow() {
        let mut stmts = vec![json!({"print": {"value": 1}}), json!({"id": "amr_deadbeef", "print": {"value": 2}})];
        let n = assign_uids(&mut stmts, Depth::Shallow);
        assert_eq!(n, 1);
        assert!(stmts[0]["id"].as_str().unwrap().starts_with("amr_"));
        assert_eq!(stmts[1]["id"], "amr_deadbeef");
    }

    #[test]
    fn idempotent_on_second_pass() {
        let mut stmts = vec![json!({"print": {"value": 1}})];
        assign_uids(&mut stmts, Depth::Shallow);
        let first = stmts[0]["id"].clone();
        assign_uids(&mut stmts, Depth::Shallow);
        assert_eq!(stmts[0]["id"], first);
    }

    #[test]
    fn deep_recurses_into_branches() {
        let mut stmts = vec![json!({
            "if": {
                "cond": {"value": true},
                "then": [{"print": {"value": 1}}],
                "else": [{"print": {"value": 2}}]
            }
        })];
        let n = assign_uids(&mut stmts, Depth::Deep);
        assert_eq!(n, 3);
        assert!(all_assigned(&stmts, Depth::Deep));
        assert!(!all_assigned(&[json!({"print": {"value": 1}})], Depth::Shallow));
    }

    #[test]
    fn shallow_assigns_def_id_without_descending_into_body() {
        let mut stmts = vec![json!({
            "def": {"name": "f", "params": [], "body": [{"print": {"value": 1}}]}
        })];
        let n = assign_uids(&mut stmts, Depth::Shallow);
        assert_eq!(n, 2); // statement id + def id
        assert!(stmts[0]["def"]["id"].as_str().unwrap().starts_with("fn_"));
        assert!(stmts[0]["def"]["body"][0].get("id").is_none());
        assert!(!all_assigned(&stmts, Depth::Deep));
    }

    #[test]
    fn deep_assigns_ids_inside_def_body() {
        let mut stmts = vec![json!({
            "def": {"name": "f", "params": [], "body": [{"print": {"value": 1}}]}
        })];
        assign_uids(&mut stmts, Depth::Deep);
        assert!(stmts[0]["def"]["body"][0]["id"].as_str().unwrap().starts_with("amr_"));
        assert!(all_assigned(&stmts, Depth::Deep));
    }
}
