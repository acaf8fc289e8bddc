//! Structural validation, call resolution, style warnings, and optional
//! scope analysis.
//!
//! Operates directly on `serde_json::Value` rather than the typed
//! [`crate::program`] tree: a validator has to report useful paths and
//! partial findings even for programs that don't decode cleanly, so it
//! walks the same raw shape the wire format uses instead of requiring a
//! successful [`crate::program::Stmt::from_json`] first.
//!
//! Function-name/id collection and the structural/call/arity walk both
//! recurse into every nested `then`/`else`/`body` block, not just one
//! level deep — a `def` nested inside an `if` branch is just as valid a
//! function declaration as a top-level one, and its call sites deserve
//! the same checking.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::op_registry::{self, ArityCheck};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub code: &'static str,
    pub message: String,
    pub path: String,
    pub severity: Severity,
    pub hint: Option<String>,
}

impl ValidationIssue {
    fn error(code: &'static str, message: String, path: String) -> Self {
        Self {
            code,
            message,
            path,
            severity: Severity::Error,
            hint: None,
        }
    }

    fn warning(code: &'static str, message: String, path: String, hint: Option<String>) -> Self {
        Self {
            code,
            message,
            path,
            severity: Severity::Warning,
            hint,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateOptions {
    /// Emit `W_PREFER_ID` when a call-by-name could unambiguously be a
    /// call-by-id instead.
    pub prefer_id: bool,
}

/// Run validation and stop at the first error, discarding warnings.
/// Equivalent to taking the first `Severity::Error` issue out of
/// [`validate_report`]'s output, in document order.
pub fn validate_fail_fast(program: &Value) -> Result<(), ValidationIssue> {
    match validate_report(program, &ValidateOptions::default()) {
        issues => issues
            .into_iter()
            .find(|i| i.severity == Severity::Error)
            .map_or(Ok(()), Err),
    }
}

/// Run validation and collect every issue found, errors and warnings
/// alike, instead of stopping at the first one.
#[must_use]
pub fn validate_report(program: &Value, opts: &ValidateOptions) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let stmts = match unwrap_program(program) {
        Some(s) => s,
        None => {
            issues.push(ValidationIssue::error(
                "E_PROGRAM_SHAPE",
                "Program must be a list or a {program:[...]} wrapper".to_string(),
                "/".to_string(),
            ));
            return issues;
        }
    };

    let mut ctx = FnCtx::default();
    collect_functions(stmts, &mut ctx);

    let mut saw_name = false;
    let mut saw_id = false;
    for (i, stmt) in stmts.iter().enumerate() {
        mark_calls(stmt, &mut saw_name, &mut saw_id);
        check_stmt(stmt, &format!("$[{i}]"), &ctx, opts, &mut issues);
    }
    if saw_name && saw_id {
        issues.push(ValidationIssue::warning(
            "W_MIXED_CALL_STYLE",
            "Mixed call styles (name and id) found".to_string(),
            "/".to_string(),
            Some("Unify with: amorph migrate-calls <file> --to=id".to_string()),
        ));
    }

    issues
}

fn unwrap_program(v: &Value) -> Option<&[Value]> {
    match v {
        Value::Array(items) => Some(items),
        Value::Object(obj) => obj.get("program").and_then(Value::as_array).map(Vec::as_slice),
        _ => None,
    }
}

#[derive(Default)]
struct FnCtx {
    names: HashSet<String>,
    ids: HashSet<String>,
    /// name -> id, only for names with a single consistent id across every
    /// `def` that uses that name (so `W_PREFER_ID` never fires for an
    /// ambiguous name).
    name_to_id: HashMap<String, String>,
    name_dups: HashSet<String>,
}

fn collect_functions(stmts: &[Value], ctx: &mut FnCtx) {
    for stmt in stmts {
        let Some(obj) = stmt.as_object() else { continue };
        if let Some(def) = obj.get("def").and_then(Value::as_object) {
            if let Some(name) = def.get("name").and_then(Value::as_str) {
                ctx.names.insert(name.to_string());
                if let Some(id) = def.get("id").and_then(Value::as_str) {
                    match ctx.name_to_id.get(name) {
                        Some(existing) if existing != id => {
                            ctx.name_dups.insert(name.to_string());
                        }
                        Some(_) => {}
                        None => {
                            ctx.name_to_id.insert(name.to_string(), id.to_string());
                        }
                    }
                }
            }
            if let Some(id) = def.get("id").and_then(Value::as_str) {
                ctx.ids.insert(id.to_string());
            }
            if let Some(body) = def.get("body").and_then(Value::as_array) {
                collect_functions(body, ctx);
            }
        }
        if let Some(if_obj) = obj.get("if").and_then(Value::as_object) {
            if let Some(arr) = if_obj.get("then").and_then(Value::as_array) {
                collect_functions(arr, ctx);
            }
            if let Some(arr) = if_obj.get("else").and_then(Value::as_array) {
                collect_functions(arr, ctx);
            }
        }
    }
}

/// Deep, whole-subtree scan for `{"call": {"name": ...}}` vs
/// `{"call": {"id": ...}}` occurrences, used to decide `W_MIXED_CALL_STYLE`.
fn mark_calls(node: &Value, saw_name: &mut bool, saw_id: &mut bool) {
    match node {
        Value::Object(obj) => {
            if let Some(call) = obj.get("call").and_then(Value::as_object) {
                if call.contains_key("id") {
                    *saw_id = true;
                }
                if call.contains_key("name") {
                    *saw_name = true;
                }
            }
            for v in obj.values() {
                mark_calls(v, saw_name, saw_id);
            }
        }
        Value::Array(items) => {
            for item in items {
                mark_calls(item, saw_name, saw_id);
            }
        }
        _ => {}
    }
}

fn check_stmt(
    stmt: &Value,
    path: &str,
    ctx: &FnCtx,
    opts: &ValidateOptions,
    issues: &mut Vec<ValidationIssue>,
) {
    let Some(obj) = stmt.as_object() else {
        issues.push(ValidationIssue::error(
            "E_STMT_SHAPE",
            "Statement must be an object".to_string(),
            path.to_string(),
        ));
        return;
    };

    if let Some(v) = obj.get("let").and_then(|l| l.as_object()).and_then(|l| l.get("value")) {
        check_expr(v, &format!("{path}/let/value"), ctx, opts, issues);
    }
    if let Some(v) = obj.get("set").and_then(|s| s.as_object()).and_then(|s| s.get("value")) {
        check_expr(v, &format!("{path}/set/value"), ctx, opts, issues);
    }
    if let Some(v) = obj.get("return") {
        check_expr(v, &format!("{path}/return"), ctx, opts, issues);
    }
    if let Some(v) = obj.get("expr") {
        check_expr(v, &format!("{path}/expr"), ctx, opts, issues);
    }
    if let Some(v) = obj.get("print") {
        match v {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    check_expr(item, &format!("{path}/print/$[{i}]"), ctx, opts, issues);
                }
            }
            other => check_expr(other, &format!("{path}/print"), ctx, opts, issues),
        }
    }
    if let Some(if_obj) = obj.get("if").and_then(Value::as_object) {
        if let Some(cond) = if_obj.get("cond") {
            check_expr(cond, &format!("{path}/if/cond"), ctx, opts, issues);
        }
        if let Some(then_arr) = if_obj.get("then").and_then(Value::as_array) {
            for (j, s) in then_arr.iter().enumerate() {
                check_stmt(s, &format!("{path}/if/then/$[{j}]"), ctx, opts, issues);
            }
        }
        if let Some(else_arr) = if_obj.get("else").and_then(Value::as_array) {
            for (j, s) in else_arr.iter().enumerate() {
                check_stmt(s, &format!("{path}/if/else/$[{j}]"), ctx, opts, issues);
            }
        }
    }
    if let Some(def) = obj.get("def").and_then(Value::as_object) {
        let fid = def
            .get("id")
            .and_then(Value::as_str)
            .or_else(|| def.get("name").and_then(Value::as_str))
            .unwrap_or("?");
        if let Some(body) = def.get("body").and_then(Value::as_array) {
            for (j, s) in body.iter().enumerate() {
                check_stmt(s, &format!("{path}/fn[{fid}]/body/$[{j}]"), ctx, opts, issues);
            }
        }
    }
}

fn check_expr(
    node: &Value,
    path: &str,
    ctx: &FnCtx,
    opts: &ValidateOptions,
    issues: &mut Vec<ValidationIssue>,
) {
    match node {
        Value::Object(obj) => {
            if let Some(call) = obj.get("call").and_then(Value::as_object) {
                check_call(call, path, ctx, opts, issues);
            } else if obj.len() == 1 && !obj.contains_key("var") {
                let (op, val) = obj.iter().next().expect("len == 1");
                let count = match val {
                    Value::Array(items) => items.len(),
                    _ => 1,
                };
                if let ArityCheck::Mismatch(_) = op_registry::check_arity(op, count) {
                    issues.push(ValidationIssue::error(
                        "E_OP_ARITY",
                        format!("Operator {op} invalid arity: {count}"),
                        path.to_string(),
                    ));
                }
            }
            for (k, v) in obj {
                check_expr(v, &format!("{path}/{k}"), ctx, opts, issues);
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                check_expr(item, &format!("{path}/$[{i}]"), ctx, opts, issues);
            }
        }
        _ => {}
    }
}

fn check_call(
    call: &serde_json::Map<String, Value>,
    path: &str,
    ctx: &FnCtx,
    opts: &ValidateOptions,
    issues: &mut Vec<ValidationIssue>,
) {
    if let Some(id) = call.get("id") {
        let id = id.as_str().unwrap_or("");
        if !ctx.ids.contains(id) {
            issues.push(ValidationIssue::error(
                "E_UNKNOWN_FUNC_ID",
                format!("Unknown function id in call: {id}"),
                path.to_string(),
            ));
        }
    } else if let Some(name) = call.get("name") {
        let name = name.as_str().unwrap_or("");
        if !ctx.names.contains(name) {
            issues.push(ValidationIssue::error(
                "E_UNKNOWN_FUNC_NAME",
                format!("Unknown function name in call: {name}"),
                path.to_string(),
            ));
        } else if opts.prefer_id && !ctx.name_dups.contains(name) {
            if let Some(id) = ctx.name_to_id.get(name) {
                issues.push(ValidationIssue::warning(
                    "W_PREFER_ID",
                    format!("Call by name can use id {id}"),
                    path.to_string(),
                    Some("Run: amorph migrate-calls <file> --to=id".to_string()),
                ));
            }
        }
    }
}

// ---------------------------------------------------------------------
// Scope analysis (optional pass, `--check-scopes`).
// ---------------------------------------------------------------------

struct Scope<'a> {
    vars: HashSet<String>,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    fn root() -> Self {
        Scope {
            vars: HashSet::new(),
            parent: None,
        }
    }

    fn child(&'a self) -> Scope<'a> {
        Scope {
            vars: HashSet::new(),
            parent: Some(self),
        }
    }

    fn is_defined(&self, name: &str) -> bool {
        self.vars.contains(name) || self.parent.is_some_and(|p| p.is_defined(name))
    }

    fn is_defined_locally(&self, name: &str) -> bool {
        self.vars.contains(name)
    }

    fn define(&mut self, name: String) {
        self.vars.insert(name);
    }
}

/// Detect undefined variables (`E_UNDEFINED_VAR`) and local shadowing
/// (`W_VARIABLE_SHADOW`). Independent of [`validate_report`]: a program
/// can be structurally valid and still reference a variable that's
/// never defined on every path, or never at all.
#[must_use]
pub fn analyze_scopes(program: &Value) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let Some(stmts) = unwrap_program(program) else {
        return issues;
    };
    let mut global = Scope::root();
    for (i, stmt) in stmts.iter().enumerate() {
        analyze_stmt(stmt, &mut global, &format!("$[{i}]"), &mut issues);
    }
    issues
}

fn analyze_stmt(stmt: &Value, scope: &mut Scope<'_>, path: &str, issues: &mut Vec<ValidationIssue>) {
    let Some(obj) = stmt.as_object() else { return };

    if let Some(spec) = obj.get("let").and_then(Value::as_object) {
        let name = spec.get("name").and_then(Value::as_str);
        if let Some(name) = name {
            if scope.is_defined_locally(name) {
                issues.push(ValidationIssue::warning(
                    "W_VARIABLE_SHADOW",
                    format!("Variable '{name}' shadows outer definition"),
                    format!("{path}/let"),
                    Some("Use a different name or rename the outer variable".to_string()),
                ));
            }
        }
        if let Some(v) = spec.get("value") {
            analyze_expr(v, scope, &format!("{path}/let/value"), issues);
        }
        if let Some(name) = name {
            scope.define(name.to_string());
        }
    }
    if let Some(spec) = obj.get("set").and_then(Value::as_object) {
        let name = spec.get("name").and_then(Value::as_str);
        if let Some(name) = name {
            if !scope.is_defined(name) {
                issues.push(ValidationIssue::error(
                    "E_UNDEFINED_VAR",
                    format!("Cannot set undefined variable '{name}'"),
                    format!("{path}/set"),
                ));
            }
        }
        if let Some(v) = spec.get("value") {
            analyze_expr(v, scope, &format!("{path}/set/value"), issues);
        }
    }
    if let Some(def) = obj.get("def").and_then(Value::as_object) {
        let mut fn_scope = scope.child();
        if let Some(params) = def.get("params").and_then(Value::as_array) {
            for p in params {
                if let Some(p) = p.as_str() {
                    fn_scope.define(p.to_string());
                }
            }
        }
        let fid = def
            .get("id")
            .and_then(Value::as_str)
            .or_else(|| def.get("name").and_then(Value::as_str))
            .unwrap_or("?");
        if let Some(body) = def.get("body").and_then(Value::as_array) {
            for (j, s) in body.iter().enumerate() {
                analyze_stmt(s, &mut fn_scope, &format!("{path}/fn[{fid}]/body/$[{j}]"), issues);
            }
        }
    }
    if let Some(if_obj) = obj.get("if").and_then(Value::as_object) {
        if let Some(cond) = if_obj.get("cond") {
            analyze_expr(cond, scope, &format!("{path}/if/cond"), issues);
        }
        if let Some(then_arr) = if_obj.get("then").and_then(Value::as_array) {
            let mut then_scope = scope.child();
            for (j, s) in then_arr.iter().enumerate() {
                analyze_stmt(s, &mut then_scope, &format!("{path}/if/then/$[{j}]"), issues);
            }
        }
        if let Some(else_arr) = if_obj.get("else").and_then(Value::as_array) {
            let mut else_scope = scope.child();
            for (j, s) in else_arr.iter().enumerate() {
                analyze_stmt(s, &mut else_scope, &format!("{path}/if/else/$[{j}]"), issues);
            }
        }
    }
    if let Some(v) = obj.get("return") {
        analyze_expr(v, scope, &format!("{path}/return"), issues);
    }
    if let Some(v) = obj.get("expr") {
        analyze_expr(v, scope, &format!("{path}/expr"), issues);
    }
    if let Some(v) = obj.get("print") {
        match v {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    analyze_expr(item, scope, &format!("{path}/print/$[{i}]"), issues);
                }
            }
            other => analyze_expr(other, scope, &format!("{path}/print"), issues),
        }
    }
}

fn analyze_expr(expr: &Value, scope: &Scope<'_>, path: &str, issues: &mut Vec<ValidationIssue>) {
    match expr {
        Value::Object(obj) => {
            if let Some(name) = obj.get("var").and_then(Value::as_str) {
                if !scope.is_defined(name) {
                    issues.push(ValidationIssue::error(
                        "E_UNDEFINED_VAR",
                        format!("Variable '{name}' used before definition"),
                        path.to_string(),
                    ));
                }
            }
            for (k, v) in obj {
                if k != "var" {
                    analyze_expr(v, scope, &format!("{path}/{k}"), issues);
                }
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                analyze_expr(item, scope, &format!("{path}/$[{i}]"), issues);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_call_name_is_an_error() {
        let prog = json!([{"expr": {"call": {"name": "nope", "args": []}}}]);
        let issues = validate_report(&prog, &ValidateOptions::default());
        assert!(issues.iter().any(|i| i.code == "E_UNKNOWN_FUNC_NAME"));
        assert!(validate_fail_fast(&prog).is_err());
    }

    #[test]
    fn forward_reference_to_a_later_def_is_allowed() {
        let prog = json!([
            {"expr": {"call": {"name": "f", "args": []}}},
            {"def": {"name": "f", "params": [], "body": []}}
        ]);
        assert!(validate_fail_fast(&prog).is_ok());
    }

    #[test]
    fn nested_def_inside_if_is_collected() {
        let prog = json!([
            {"if": {"cond": true, "then": [{"def": {"name": "g", "params": [], "body": []}}], "else": []}},
            {"expr": {"call": {"name": "g", "args": []}}}
        ]);
        assert!(validate_fail_fast(&prog).is_ok());
    }

    #[test]
    fn bad_arity_is_flagged() {
        let prog = json!([{"expr": {"not": [1, 2]}}]);
        let issues = validate_report(&prog, &ValidateOptions::default());
        assert!(issues.iter().any(|i| i.code == "E_OP_ARITY"));
    }

    #[test]
    fn mixed_call_styles_warns() {
        let prog = json!([
            {"def": {"name": "f", "id": "fn_aaaaaaaa", "params": [], "body": []}},
            {"expr": {"call": {"name": "f", "args": []}}},
            {"expr": {"call": {"id": "fn_aaaaaaaa", "args": []}}}
        ]);
        let issues = validate_report(&prog, &ValidateOptions::default());
        assert!(issues.iter().any(|i| i.code == "W_MIXED_CALL_STYLE"));
    }

    #[test]
    fn scope_analysis_flags_undefined_and_shadow() {
        let prog = json!([
            {"expr": {"var": "x"}},
            {"let": {"name": "y", "value": 1}},
            {"let": {"name": "y", "value": 2}}
        ]);
        let issues = analyze_scopes(&prog);
        assert!(issues.iter().any(|i| i.code == "E_UNDEFINED_VAR"));
        assert!(issues.iter().any(|i| i.code == "W_VARIABLE_SHADOW"));
    }

    #[test]
    fn if_branches_get_independent_scopes() {
        let prog = json!([
            {"if": {"cond": true,
                    "then": [{"let": {"name": "a", "value": 1}}],
                    "else": [{"expr": {"var": "a"}}]}}
        ]);
        let issues = analyze_scopes(&prog);
        assert!(issues.iter().any(|i| i.code == "E_UNDEFINED_VAR"));
    }
}
