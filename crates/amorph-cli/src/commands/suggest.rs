//! `amorph suggest FILE` — non-binding edit suggestions.
//!
//! A heuristic collaborator, not part of the core engine: it proposes
//! edits the engine in [`amorph::edit`] can apply, but never applies
//! any of them itself.

use std::path::PathBuf;

use clap::Args;
use serde_json::Value;

use crate::util::read_json_file;

#[derive(Args, Debug)]
pub struct SuggestArgs {
    pub file: PathBuf,
}

#[derive(Debug, Clone)]
struct Suggestion {
    operation: &'static str,
    reason: String,
    edit_spec: Value,
    priority: &'static str,
}

impl From<Suggestion> for Value {
    fn from(s: Suggestion) -> Self {
        serde_json::json!({
            "operation": s.operation,
            "reason": s.reason,
            "edit_spec": s.edit_spec,
            "priority": s.priority,
        })
    }
}

fn missing_def_ids(stmts: &[Value]) -> Vec<Suggestion> {
    let mut out = Vec::new();
    for (i, stmt) in stmts.iter().enumerate() {
        if let Some(def) = stmt.get("def").and_then(Value::as_object) {
            if !def.contains_key("id") {
                let name = def.get("name").and_then(Value::as_str).unwrap_or("anonymous");
                out.push(Suggestion {
                    operation: "add_uid",
                    reason: format!("Function '{name}' lacks a stable id for robust references"),
                    edit_spec: serde_json::json!({"op": "add_uid", "path": format!("/$[{i}]/def"), "deep": false}),
                    priority: "medium",
                });
            }
        }
    }
    out
}

fn missing_stmt_ids(stmts: &[Value]) -> Option<Suggestion> {
    let missing = stmts.iter().filter(|s| s.get("id").is_none()).count();
    if missing == 0 {
        return None;
    }
    Some(Suggestion {
        operation: "add_uid_all",
        reason: format!("{missing} statement(s) lack ids for precise targeting"),
        edit_spec: serde_json::json!({"op": "add_uid", "deep": true}),
        priority: "low",
    })
}

fn check_calls(node: &Value, saw_name: &mut bool, saw_id: &mut bool) {
    match node {
        Value::Object(obj) => {
            if let Some(call) = obj.get("call").and_then(Value::as_object) {
                *saw_name |= call.contains_key("name");
                *saw_id |= call.contains_key("id");
            }
            for v in obj.values() {
                check_calls(v, saw_name, saw_id);
            }
        }
        Value::Array(items) => {
            for v in items {
                check_calls(v, saw_name, saw_id);
            }
        }
        _ => {}
    }
}

fn mixed_call_style(stmts: &[Value]) -> Option<Suggestion> {
    let (mut saw_name, mut saw_id) = (false, false);
    for stmt in stmts {
        check_calls(stmt, &mut saw_name, &mut saw_id);
    }
    if saw_name && saw_id {
        Some(Suggestion {
            operation: "migrate_calls",
            reason: "Mixed call styles (name and id) found — inconsistent references".to_string(),
            edit_spec: serde_json::json!({"op": "migrate_calls", "to": "id"}),
            priority: "medium",
        })
    } else {
        None
    }
}

/// Variables bound by a single-letter `let`/`def` param — candidates for
/// a more descriptive rename, the same low-confidence heuristic
/// `refactor.py`'s `suggest_variable_rename` applies.
fn single_letter_renames(stmts: &[Value]) -> Vec<Suggestion> {
    let mut out = Vec::new();
    for stmt in stmts {
        if let Some(name) = stmt.get("let").and_then(|l| l.get("name")).and_then(Value::as_str) {
            if name.len() == 1 {
                out.push(Suggestion {
                    operation: "rename_variable",
                    reason: format!("Variable '{name}' has a single-letter name"),
                    edit_spec: serde_json::json!({"op": "rename_variable", "old_name": name, "new_name": format!("{name}_value"), "scope": "all"}),
                    priority: "low",
                });
            }
        }
    }
    out
}

/// Three or more consecutive top-level statements with no function
/// boundary between them — a candidate for `extract_function`, mirroring
/// `refactor.py`'s `suggest_extract_function(min_statements=3)`.
fn extractable_runs(stmts: &[Value]) -> Option<Suggestion> {
    let run_len = stmts.iter().take_while(|s| s.get("def").is_none()).count();
    if run_len >= 3 {
        Some(Suggestion {
            operation: "extract_function",
            reason: format!("The first {run_len} statements form a function-free run and could be extracted"),
            edit_spec: serde_json::json!({
                "op": "extract_function",
                "function_name": "extracted",
                "statements": (0..run_len).collect::<Vec<_>>(),
                "parameters": [],
                "insert_at": 0,
            }),
            priority: "low",
        })
    } else {
        None
    }
}

pub fn run(args: &SuggestArgs) -> Result<(), String> {
    let raw = read_json_file(&args.file)?;
    let stmts = amorph::program_statements(&raw).map_err(|e| format!("{e}"))?;

    let mut suggestions = missing_def_ids(stmts);
    suggestions.extend(missing_stmt_ids(stmts));
    suggestions.extend(mixed_call_style(stmts));
    suggestions.extend(single_letter_renames(stmts));
    suggestions.extend(extractable_runs(stmts));

    let as_json: Vec<Value> = suggestions.into_iter().map(Value::from).collect();
    println!("{}", serde_json::to_string_pretty(&as_json).unwrap_or_default());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flags_def_missing_id_but_not_one_that_has_it() {
        let stmts = vec![
            json!({"def": {"name": "f", "params": [], "body": []}}),
            json!({"def": {"name": "g", "id": "fn_aaaaaaaa", "params": [], "body": []}}),
        ];
        let found = missing_def_ids(&stmts);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].operation, "add_uid");
    }

    #[test]
    fn detects_mixed_call_style_only_when_both_are_present() {
        let name_only = vec![json!({"expr": {"call": {"name": "f", "args": []}}})];
        assert!(mixed_call_style(&name_only).is_none());

        let mixed = vec![
            json!({"expr": {"call": {"name": "f", "args": []}}}),
            json!({"expr": {"call": {"id": "fn_aaaaaaaa", "args": []}}}),
        ];
        assert!(mixed_call_style(&mixed).is_some());
    }

    #[test]
    fn extractable_run_requires_at_least_three_def_free_statements() {
        let short = vec![json!({"print": {"value": 1}}), json!({"print": {"value": 2}})];
        assert!(extractable_runs(&short).is_none());

        let long = vec![
            json!({"print": {"value": 1}}),
            json!({"print": {"value": 2}}),
            json!({"print": {"value": 3}}),
        ];
        assert!(extractable_runs(&long).is_some());
    }
}
