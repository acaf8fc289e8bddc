//! Advisory (warning-only) type inference.
//!
//! A best-effort forward type checker: two passes over the program,
//! first collecting function signatures (every parameter and return
//! type is `Any` — this checker never looks inside a callee to infer a
//! real signature), then walking every statement inferring expression
//! types and flagging arithmetic operators applied to incompatible
//! operand types. Findings are always [`Severity::Warning`] — this pass
//! never blocks `validate`'s pass/fail verdict, only enriches its report
//! when `--check-types` is requested.
//!
//! The type environment is a stack of scopes (same shape as
//! [`crate::frame::Frames`]): a `let` defines into the innermost scope
//! and stays visible to the statements after it in the same block, and
//! `then`/`else`/function bodies each push an independent child scope.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::program::Expr;
use crate::validator::{Severity, ValidationIssue};

#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    Int,
    Float,
    Str,
    Bool,
    Null,
    List(Box<Ty>),
    Object,
    Function,
    Any,
    Unknown,
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Int => write!(f, "int"),
            Ty::Float => write!(f, "float"),
            Ty::Str => write!(f, "str"),
            Ty::Bool => write!(f, "bool"),
            Ty::Null => write!(f, "null"),
            Ty::List(e) => write!(f, "list[{e}]"),
            Ty::Object => write!(f, "object"),
            Ty::Function => write!(f, "function"),
            Ty::Any => write!(f, "any"),
            Ty::Unknown => write!(f, "unknown"),
        }
    }
}

struct TypeEnv {
    scopes: Vec<HashMap<String, Ty>>,
}

impl TypeEnv {
    fn new() -> Self {
        TypeEnv {
            scopes: vec![HashMap::new()],
        }
    }

    fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    fn define(&mut self, name: String, ty: Ty) {
        self.scopes.last_mut().expect("at least one scope").insert(name, ty);
    }

    fn lookup(&self, name: &str) -> Ty {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.get(name))
            .cloned()
            .unwrap_or(Ty::Unknown)
    }
}

/// Run the advisory type checker over a program, producing
/// `E_TYPE_MISMATCH` warnings only.
#[must_use]
pub fn check_types(program: &Value) -> Vec<ValidationIssue> {
    let stmts = match crate::program_statements(program) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut issues = Vec::new();
    let mut functions: HashMap<String, usize> = HashMap::new();
    collect_signatures(stmts, &mut functions);

    let mut env = TypeEnv::new();
    for (i, stmt) in stmts.iter().enumerate() {
        check_stmt(stmt, &mut env, &format!("$[{i}]"), &mut issues);
    }
    issues
}

fn collect_signatures(stmts: &[Value], functions: &mut HashMap<String, usize>) {
    for stmt in stmts {
        let Some(obj) = stmt.as_object() else { continue };
        if let Some(def) = obj.get("def").and_then(Value::as_object) {
            if let Some(name) = def.get("name").and_then(Value::as_str) {
                let arity = def.get("params").and_then(Value::as_array).map_or(0, Vec::len);
                functions.insert(name.to_string(), arity);
            }
            if let Some(body) = def.get("body").and_then(Value::as_array) {
                collect_signatures(body, functions);
            }
        }
        if let Some(if_obj) = obj.get("if").and_then(Value::as_object) {
            if let Some(arr) = if_obj.get("then").and_then(Value::as_array) {
                collect_signatures(arr, functions);
            }
            if let Some(arr) = if_obj.get("else").and_then(Value::as_array) {
                collect_signatures(arr, functions);
            }
        }
    }
}

fn check_stmt(stmt: &Value, env: &mut TypeEnv, path: &str, issues: &mut Vec<ValidationIssue>) {
    let Some(obj) = stmt.as_object() else { return };

    if let Some(spec) = obj.get("let").and_then(Value::as_object) {
        if let Some(value) = spec.get("value") {
            let ty = infer_expr(value, env, &format!("{path}/let/value"), issues);
            if let Some(name) = spec.get("name").and_then(Value::as_str) {
                env.define(name.to_string(), ty);
            }
        }
    }
    if let Some(spec) = obj.get("set").and_then(Value::as_object) {
        if let Some(value) = spec.get("value") {
            infer_expr(value, env, &format!("{path}/set/value"), issues);
        }
    }
    if let Some(v) = obj.get("return") {
        infer_expr(v, env, &format!("{path}/return"), issues);
    }
    if let Some(v) = obj.get("expr") {
        infer_expr(v, env, &format!("{path}/expr"), issues);
    }
    if let Some(if_obj) = obj.get("if").and_then(Value::as_object) {
        if let Some(cond) = if_obj.get("cond") {
            infer_expr(cond, env, &format!("{path}/if/cond"), issues);
        }
        if let Some(then_arr) = if_obj.get("then").and_then(Value::as_array) {
            env.push();
            for (j, s) in then_arr.iter().enumerate() {
                check_stmt(s, env, &format!("{path}/if/then/$[{j}]"), issues);
            }
            env.pop();
        }
        if let Some(else_arr) = if_obj.get("else").and_then(Value::as_array) {
            env.push();
            for (j, s) in else_arr.iter().enumerate() {
                check_stmt(s, env, &format!("{path}/if/else/$[{j}]"), issues);
            }
            env.pop();
        }
    }
    if let Some(def) = obj.get("def").and_then(Value::as_object) {
        env.push();
        if let Some(params) = def.get("params").and_then(Value::as_array) {
            for p in params {
                if let Some(p) = p.as_str() {
                    env.define(p.to_string(), Ty::Any);
                }
            }
        }
        let fid = def
            .get("id")
            .and_then(Value::as_str)
            .or_else(|| def.get("name").and_then(Value::as_str))
            .unwrap_or("?")
            .to_string();
        if let Some(body) = def.get("body").and_then(Value::as_array) {
            for (j, s) in body.iter().enumerate() {
                check_stmt(s, env, &format!("{path}/fn[{fid}]/body/$[{j}]"), issues);
            }
        }
        env.pop();
    }
}

fn infer_expr(expr: &Value, env: &mut TypeEnv, path: &str, issues: &mut Vec<ValidationIssue>) -> Ty {
    match expr {
        Value::Null => Ty::Null,
        Value::Bool(_) => Ty::Bool,
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                Ty::Int
            } else {
                Ty::Float
            }
        }
        Value::String(_) => Ty::Str,
        Value::Array(items) => {
            let mut elem = Ty::Unknown;
            for (i, e) in items.iter().enumerate() {
                let t = infer_expr(e, env, &format!("{path}/$[{i}]"), issues);
                if i == 0 {
                    elem = t;
                }
            }
            Ty::List(Box::new(elem))
        }
        Value::Object(obj) => {
            if let Some(name) = obj.get("var").and_then(Value::as_str) {
                return env.lookup(name);
            }
            if obj.contains_key("call") {
                return Ty::Unknown;
            }
            if obj.len() == 1 {
                let (op, val) = obj.iter().next().expect("len == 1");
                let op = op.clone();
                return infer_operator(&op, val, env, path, issues);
            }
            Ty::Object
        }
    }
}

fn infer_operator(op: &str, val: &Value, env: &mut TypeEnv, path: &str, issues: &mut Vec<ValidationIssue>) -> Ty {
    let base = Expr::operator_base_name(op).to_string();
    let args: Vec<Value> = match val {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    };

    match base.as_str() {
        "add" | "sub" | "mul" | "div" | "mod" | "pow" => {
            let arg_types: Vec<Ty> = args
                .iter()
                .enumerate()
                .map(|(i, a)| infer_expr(a, env, &format!("{path}/{base}/$[{i}]"), issues))
                .collect();

            if base == "add" {
                if arg_types.iter().all(|t| matches!(t, Ty::Int)) {
                    return Ty::Int;
                }
                if arg_types.iter().all(|t| matches!(t, Ty::Int | Ty::Float)) {
                    return Ty::Float;
                }
                if arg_types.iter().all(|t| matches!(t, Ty::Str)) {
                    return Ty::Str;
                }
                let shown: Vec<String> = arg_types.iter().map(ToString::to_string).collect();
                issues.push(ValidationIssue {
                    code: "E_TYPE_MISMATCH",
                    message: format!("add expects all numeric or all string, got {shown:?}"),
                    path: path.to_string(),
                    severity: Severity::Warning,
                    hint: Some("Convert arguments to the same type".to_string()),
                });
                return Ty::Unknown;
            }

            if arg_types
                .iter()
                .any(|t| !matches!(t, Ty::Int | Ty::Float | Ty::Unknown | Ty::Any))
            {
                let shown: Vec<String> = arg_types.iter().map(ToString::to_string).collect();
                issues.push(ValidationIssue {
                    code: "E_TYPE_MISMATCH",
                    message: format!("{base} expects numeric arguments, got {shown:?}"),
                    path: path.to_string(),
                    severity: Severity::Warning,
                    hint: None,
                });
                return Ty::Unknown;
            }
            if arg_types.iter().any(|t| matches!(t, Ty::Float)) {
                Ty::Float
            } else {
                Ty::Int
            }
        }
        "eq" | "ne" | "lt" | "le" | "gt" | "ge" | "and" | "or" | "not" | "has" => {
            for (i, a) in args.iter().enumerate() {
                infer_expr(a, env, &format!("{path}/{base}/$[{i}]"), issues);
            }
            Ty::Bool
        }
        "list" => Ty::List(Box::new(Ty::Unknown)),
        "len" | "int" => Ty::Int,
        "get" | "concat" => Ty::Unknown,
        "range" => Ty::List(Box::new(Ty::Int)),
        "input" => Ty::Str,
        _ => Ty::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn int_add_infers_int() {
        let prog = json!([{"let": {"name": "x", "value": {"add": [1, 2]}}}]);
        let issues = check_types(&prog);
        assert!(issues.is_empty());
    }

    #[test]
    fn mixed_int_str_add_is_a_mismatch() {
        let prog = json!([{"expr": {"add": [1, "two"]}}]);
        let issues = check_types(&prog);
        assert!(issues.iter().any(|i| i.code == "E_TYPE_MISMATCH"));
        assert!(issues.iter().all(|i| i.severity == Severity::Warning));
    }

    #[test]
    fn comparisons_always_yield_bool_with_no_error() {
        let prog = json!([{"expr": {"lt": [1, "two"]}}]);
        let issues = check_types(&prog);
        assert!(issues.is_empty());
    }

    #[test]
    fn let_binding_is_visible_to_later_siblings() {
        let prog = json!([
            {"let": {"name": "x", "value": "hello"}},
            {"expr": {"add": [{"var": "x"}, "world"]}}
        ]);
        let issues = check_types(&prog);
        assert!(issues.is_empty(), "x should be inferred as str: {issues:?}");
    }
}
