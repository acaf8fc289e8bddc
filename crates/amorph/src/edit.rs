//! Declarative program editing.
//!
//! Edits address the program two ways: by `target` (a statement `id`,
//! resolved against top-level statements only — nested statements are
//! not directly addressable this way) or by `path` (a slash-delimited
//! walk of field names and `$[n]` array-index segments, which must end
//! on an array segment for operations that insert or delete). The
//! engine mutates the input tree in place and stops at the first
//! failing edit; making that atomic across the whole batch — or
//! producing a dry-run preview instead — is the caller's job, typically
//! by cloning the tree first.

use std::fmt;

use serde_json::{Map, Value};

use crate::uid::{self, Depth};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    BadSpec { op: &'static str, detail: String },
    BadInput { detail: String },
    BadPath { detail: String },
    NotFound { detail: String },
    Ambiguous { detail: String },
    UnknownOp { op: String },
}

impl EditError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadSpec { .. } => "E_BAD_SPEC",
            Self::BadInput { .. } => "E_BAD_INPUT",
            Self::BadPath { .. } => "E_BAD_PATH",
            Self::NotFound { .. } => "E_NOT_FOUND",
            Self::Ambiguous { .. } => "E_AMBIGUOUS",
            Self::UnknownOp { .. } => "E_UNKNOWN_OP",
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::json!({"code": self.code(), "message": self.to_string()})
    }
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadSpec { op, detail } => write!(f, "{op}: {detail}"),
            Self::BadInput { detail }
            | Self::BadPath { detail }
            | Self::NotFound { detail }
            | Self::Ambiguous { detail } => write!(f, "{detail}"),
            Self::UnknownOp { op } => write!(f, "Unknown op: {op}"),
        }
    }
}

impl std::error::Error for EditError {}

fn bad_spec(op: &'static str, detail: impl Into<String>) -> EditError {
    EditError::BadSpec { op, detail: detail.into() }
}

/// One segment of a parsed edit path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSeg {
    Index(usize),
    Key(String),
}

fn parse_path(path: &str) -> Result<Vec<PathSeg>, EditError> {
    if !path.starts_with('/') {
        return Err(EditError::BadPath { detail: "path must start with '/'".to_string() });
    }
    let mut out = Vec::new();
    for seg in path.split('/').filter(|s| !s.is_empty()) {
        if let Some(inner) = seg.strip_prefix("$[").and_then(|s| s.strip_suffix(']')) {
            let idx: usize = inner
                .parse()
                .map_err(|_| EditError::BadPath { detail: format!("invalid index in path: {seg}") })?;
            out.push(PathSeg::Index(idx));
        } else {
            out.push(PathSeg::Key(seg.to_string()));
        }
    }
    if out.is_empty() {
        return Err(EditError::BadPath { detail: "empty path".to_string() });
    }
    Ok(out)
}

/// Resolve a path to its containing array and the index within it,
/// so the caller can insert/remove/replace at that slot.
fn find_by_path_mut<'a>(
    program: &'a mut Vec<Value>,
    path: &str,
) -> Result<(&'a mut Vec<Value>, usize), EditError> {
    let segs = parse_path(path)?;
    descend(program, &segs)
}

fn descend<'a>(
    cur_list: &'a mut Vec<Value>,
    segs: &[PathSeg],
) -> Result<(&'a mut Vec<Value>, usize), EditError> {
    let (head, rest) = segs.split_first().expect("non-empty path");
    let PathSeg::Index(idx) = head else {
        return Err(EditError::BadPath { detail: "expected array index segment".to_string() });
    };
    if rest.is_empty() {
        return Ok((cur_list, *idx));
    }
    let node = cur_list
        .get_mut(*idx)
        .ok_or_else(|| EditError::BadPath { detail: format!("index out of range: {idx}") })?;
    descend_into_node(node, rest)
}

fn descend_into_node<'a>(
    node: &'a mut Value,
    segs: &[PathSeg],
) -> Result<(&'a mut Vec<Value>, usize), EditError> {
    let (head, rest) = segs.split_first().expect("non-empty path");
    match head {
        PathSeg::Key(key) => {
            let obj = node
                .as_object_mut()
                .ok_or_else(|| EditError::BadPath { detail: format!("expected object at key {key}") })?;
            let child = obj
                .get_mut(key)
                .ok_or_else(|| EditError::BadPath { detail: format!("key missing: {key}") })?;
            if rest.is_empty() {
                return Err(EditError::BadPath {
                    detail: "path must end with an array index segment like $[n]".to_string(),
                });
            }
            descend_into_node(child, rest)
        }
        PathSeg::Index(idx) => {
            let list = node
                .as_array_mut()
                .ok_or_else(|| EditError::BadPath { detail: "expected array".to_string() })?;
            if rest.is_empty() {
                return Ok((list, *idx));
            }
            let child = list
                .get_mut(*idx)
                .ok_or_else(|| EditError::BadPath { detail: format!("index out of range: {idx}") })?;
            descend_into_node(child, rest)
        }
    }
}

/// Find a top-level statement by its `id`. Returns its index.
fn find_stmt_by_id(program: &[Value], id: &str) -> Result<usize, EditError> {
    program
        .iter()
        .position(|s| s.get("id").and_then(Value::as_str) == Some(id))
        .ok_or_else(|| EditError::NotFound { detail: format!("statement not found: {id}") })
}

fn locate_insertion<'a>(
    program: &'a mut Vec<Value>,
    spec: &Map<String, Value>,
    op: &'static str,
) -> Result<(usize, bool), EditError> {
    if let Some(target) = spec.get("target") {
        let target = target
            .as_str()
            .ok_or_else(|| bad_spec(op, "target must be a string"))?;
        let idx = find_stmt_by_id(program, target)?;
        return Ok((idx, false));
    }
    if let Some(path) = spec.get("path") {
        let path = path.as_str().ok_or_else(|| bad_spec(op, "path must be a string"))?;
        let (_, idx) = find_by_path_mut(program, path)?;
        return Ok((idx, true));
    }
    Err(bad_spec(op, "requires target or path"))
}

fn op_add_function(program: &mut Vec<Value>, spec: &Map<String, Value>) -> Result<(), EditError> {
    let name = spec
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| bad_spec("add_function", "requires {name:str, params:list, body:list}"))?;
    let params = spec
        .get("params")
        .and_then(Value::as_array)
        .ok_or_else(|| bad_spec("add_function", "requires {name:str, params:list, body:list}"))?;
    let body = spec
        .get("body")
        .and_then(Value::as_array)
        .ok_or_else(|| bad_spec("add_function", "requires {name:str, params:list, body:list}"))?;

    let mut def = Map::new();
    def.insert("name".to_string(), Value::String(name.to_string()));
    def.insert("params".to_string(), Value::Array(params.clone()));
    def.insert("body".to_string(), Value::Array(body.clone()));
    if let Some(id) = spec.get("id").and_then(Value::as_str) {
        def.insert("id".to_string(), Value::String(id.to_string()));
    }
    let mut stmt = Map::new();
    stmt.insert("def".to_string(), Value::Object(def));
    program.push(Value::Object(stmt));
    Ok(())
}

/// Post-order walk over every expression reachable from a statement
/// list, rewriting each node with `f` after its children have already
/// been rewritten. Recurses fully into nested `then`/`else`/`def.body`
/// blocks, not just the statement's own immediate expression fields.
fn deep_walk_expr(expr: &Value, f: &mut impl FnMut(Value) -> Value) -> Value {
    let walked = match expr {
        Value::Array(items) => Value::Array(items.iter().map(|e| deep_walk_expr(e, f)).collect()),
        Value::Object(obj) => {
            let mut out = Map::new();
            for (k, v) in obj {
                out.insert(k.clone(), deep_walk_expr(v, f));
            }
            Value::Object(out)
        }
        other => other.clone(),
    };
    f(walked)
}

fn walk_stmt_exprs(stmt: &mut Value, f: &mut impl FnMut(Value) -> Value) {
    let Some(obj) = stmt.as_object_mut() else { return };

    for key in ["let", "set"] {
        if let Some(spec) = obj.get_mut(key).and_then(Value::as_object_mut) {
            if let Some(v) = spec.get("value") {
                let rewritten = deep_walk_expr(v, f);
                spec.insert("value".to_string(), rewritten);
            }
        }
    }
    for key in ["return", "expr"] {
        if let Some(v) = obj.get(key) {
            let rewritten = deep_walk_expr(v, f);
            obj.insert(key.to_string(), rewritten);
        }
    }
    if let Some(if_obj) = obj.get_mut("if").and_then(Value::as_object_mut) {
        if let Some(cond) = if_obj.get("cond") {
            let rewritten = deep_walk_expr(cond, f);
            if_obj.insert("cond".to_string(), rewritten);
        }
        for key in ["then", "else"] {
            if let Some(Value::Array(arr)) = if_obj.get_mut(key) {
                for s in arr.iter_mut() {
                    walk_stmt_exprs(s, f);
                }
            }
        }
    }
    if let Some(print) = obj.get("print") {
        let rewritten = deep_walk_expr(print, f);
        obj.insert("print".to_string(), rewritten);
    }
    if let Some(def) = obj.get_mut("def").and_then(Value::as_object_mut) {
        if let Some(Value::Array(body)) = def.get_mut("body") {
            for s in body.iter_mut() {
                walk_stmt_exprs(s, f);
            }
        }
    }
}

fn op_rename_function(program: &mut [Value], spec: &Map<String, Value>) -> Result<usize, EditError> {
    let fn_id = spec.get("id").and_then(Value::as_str);
    let old = spec.get("from").and_then(Value::as_str);
    let new = spec
        .get("to")
        .and_then(Value::as_str)
        .ok_or_else(|| bad_spec("rename_function", "requires {to:str} and either {id} or {from}"))?;

    let mut target_indices = Vec::new();
    if let Some(fn_id) = fn_id {
        for (i, stmt) in program.iter().enumerate() {
            if stmt.get("def").and_then(|d| d.get("id")).and_then(Value::as_str) == Some(fn_id) {
                target_indices.push(i);
            }
        }
    } else if let Some(old) = old {
        for (i, stmt) in program.iter().enumerate() {
            if stmt.get("def").and_then(|d| d.get("name")).and_then(Value::as_str) == Some(old) {
                target_indices.push(i);
            }
        }
        if target_indices.len() > 1 {
            return Err(EditError::Ambiguous { detail: format!("multiple functions named '{old}' found; use id") });
        }
    } else {
        return Err(bad_spec("rename_function", "requires id or from"));
    }

    if target_indices.is_empty() {
        return Err(EditError::NotFound { detail: "function not found".to_string() });
    }

    let mut changed = 0;
    for &i in &target_indices {
        if let Some(def) = program[i].get_mut("def").and_then(Value::as_object_mut) {
            def.insert("name".to_string(), Value::String(new.to_string()));
            changed += 1;
        }
    }

    let name_old_for_calls = old.map(str::to_string).or_else(|| {
        target_indices
            .first()
            .and_then(|&i| program[i].get("def"))
            .and_then(|d| d.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    let mut replace = |node: Value| -> Value {
        if let Value::Object(ref obj) = node {
            if let Some(Value::Object(call)) = obj.get("call") {
                if let (Some(fid), Some(cid)) = (fn_id, call.get("id").and_then(Value::as_str)) {
                    if cid == fid {
                        return node;
                    }
                }
                if let Some(name_old) = &name_old_for_calls {
                    if call.get("name").and_then(Value::as_str) == Some(name_old.as_str()) {
                        let mut new_call = call.clone();
                        new_call.insert("name".to_string(), Value::String(new.to_string()));
                        let mut new_obj = Map::new();
                        new_obj.insert("call".to_string(), Value::Object(new_call));
                        return Value::Object(new_obj);
                    }
                }
            }
        }
        node
    };

    for stmt in program.iter_mut() {
        walk_stmt_exprs(stmt, &mut replace);
    }

    Ok(changed)
}

fn op_insert_before(program: &mut Vec<Value>, spec: &Map<String, Value>) -> Result<(), EditError> {
    let node = spec
        .get("node")
        .filter(|v| v.is_object())
        .ok_or_else(|| bad_spec("insert_before", "requires {node:object} and target or path"))?
        .clone();
    let (idx, _) = locate_insertion(program, spec, "insert_before")?;
    program.insert(idx, node);
    Ok(())
}

fn op_insert_after(program: &mut Vec<Value>, spec: &Map<String, Value>) -> Result<(), EditError> {
    let node = spec
        .get("node")
        .filter(|v| v.is_object())
        .ok_or_else(|| bad_spec("insert_after", "requires {node:object} and target or path"))?
        .clone();
    let (idx, _) = locate_insertion(program, spec, "insert_after")?;
    program.insert(idx + 1, node);
    Ok(())
}

fn op_delete_node(program: &mut Vec<Value>, spec: &Map<String, Value>) -> Result<(), EditError> {
    if let Some(target) = spec.get("target") {
        let target = target.as_str().ok_or_else(|| bad_spec("delete_node", "target must be a string"))?;
        let idx = find_stmt_by_id(program, target)?;
        program.remove(idx);
        return Ok(());
    }
    if let Some(path) = spec.get("path") {
        let path = path.as_str().ok_or_else(|| bad_spec("delete_node", "path must be a string"))?;
        let (list, idx) = find_by_path_mut(program, path)?;
        if idx >= list.len() {
            return Err(EditError::BadPath { detail: format!("index out of range: {idx}") });
        }
        list.remove(idx);
        return Ok(());
    }
    Err(bad_spec("delete_node", "requires target or path"))
}

fn op_replace_call(program: &mut [Value], spec: &Map<String, Value>) -> Result<usize, EditError> {
    let matcher = spec
        .get("match")
        .and_then(Value::as_object)
        .ok_or_else(|| bad_spec("replace_call", "requires {match:{}, set:{}}"))?;
    let setv = spec
        .get("set")
        .and_then(Value::as_object)
        .ok_or_else(|| bad_spec("replace_call", "requires {match:{}, set:{}}"))?;
    let m_name = matcher.get("name").and_then(Value::as_str);
    let m_id = matcher.get("id").and_then(Value::as_str);
    if m_name.is_none() && m_id.is_none() {
        return Err(bad_spec("replace_call", "match must include name or id"));
    }

    let mut changed = 0;
    let mut replace = |node: Value| -> Value {
        if let Value::Object(ref obj) = node {
            if let Some(Value::Object(call)) = obj.get("call") {
                let id_hit = m_id.is_some() && call.get("id").and_then(Value::as_str) == m_id;
                let name_hit = m_name.is_some() && call.get("name").and_then(Value::as_str) == m_name;
                if id_hit || name_hit {
                    let mut new_call = call.clone();
                    if let Some(name) = setv.get("name") {
                        new_call.insert("name".to_string(), name.clone());
                        new_call.remove("id");
                    }
                    if let Some(id) = setv.get("id") {
                        new_call.insert("id".to_string(), id.clone());
                        new_call.remove("name");
                    }
                    if let Some(args) = setv.get("args") {
                        new_call.insert("args".to_string(), args.clone());
                    }
                    changed += 1;
                    let mut new_obj = Map::new();
                    new_obj.insert("call".to_string(), Value::Object(new_call));
                    return Value::Object(new_obj);
                }
            }
        }
        node
    };

    for stmt in program.iter_mut() {
        walk_stmt_exprs(stmt, &mut replace);
    }
    Ok(changed)
}

/// `rename_variable`'s scope restriction. `"all"` means every scope;
/// otherwise a function id (or, for top-level code, `"global"`).
fn op_rename_variable(program: &mut [Value], spec: &Map<String, Value>) -> Result<usize, EditError> {
    let old_name = spec
        .get("old_name")
        .and_then(Value::as_str)
        .ok_or_else(|| bad_spec("rename_variable", "requires old_name and new_name"))?;
    let new_name = spec
        .get("new_name")
        .and_then(Value::as_str)
        .ok_or_else(|| bad_spec("rename_variable", "requires old_name and new_name"))?;
    let scope = spec.get("scope").and_then(Value::as_str).unwrap_or("all");
    let limit_path = spec.get("path").and_then(Value::as_str);

    if !variable_exists(program, old_name, scope, limit_path) {
        return Err(EditError::NotFound { detail: format!("Variable '{old_name}' not found in scope '{scope}'") });
    }

    let mut changed = 0;
    for (i, stmt) in program.iter_mut().enumerate() {
        rename_in_stmt(stmt, old_name, new_name, scope, limit_path, "global", &format!("/$[{i}]"), &mut changed);
    }
    Ok(changed)
}

fn variable_exists(program: &[Value], old_name: &str, scope: &str, limit_path: Option<&str>) -> bool {
    fn walk(stmt: &Value, old_name: &str, scope: &str, limit_path: Option<&str>, current_scope: &str, path: &str) -> bool {
        let Some(obj) = stmt.as_object() else { return false };
        let in_scope = scope == "all" || current_scope == scope;
        let path_ok = |p: &str| limit_path.is_none_or(|lp| p.starts_with(lp));

        if in_scope {
            if let Some(spec) = obj.get("let").and_then(Value::as_object) {
                if spec.get("name").and_then(Value::as_str) == Some(old_name) && path_ok(&format!("{path}/let/name")) {
                    return true;
                }
                if let Some(v) = spec.get("value") {
                    if expr_refs(v, old_name) && path_ok(&format!("{path}/let/value")) {
                        return true;
                    }
                }
            }
            if let Some(spec) = obj.get("set").and_then(Value::as_object) {
                if spec.get("name").and_then(Value::as_str) == Some(old_name) && path_ok(&format!("{path}/set/name")) {
                    return true;
                }
                if let Some(v) = spec.get("value") {
                    if expr_refs(v, old_name) && path_ok(&format!("{path}/set/value")) {
                        return true;
                    }
                }
            }
            for key in ["return", "expr", "print"] {
                if let Some(v) = obj.get(key) {
                    if expr_refs(v, old_name) && path_ok(&format!("{path}/{key}")) {
                        return true;
                    }
                }
            }
            if let Some(if_obj) = obj.get("if").and_then(Value::as_object) {
                if let Some(cond) = if_obj.get("cond") {
                    if expr_refs(cond, old_name) && path_ok(&format!("{path}/if/cond")) {
                        return true;
                    }
                }
                for key in ["then", "else"] {
                    if let Some(Value::Array(arr)) = if_obj.get(key) {
                        for (j, s) in arr.iter().enumerate() {
                            if walk(s, old_name, scope, limit_path, current_scope, &format!("{path}/if/{key}/$[{j}]")) {
                                return true;
                            }
                        }
                    }
                }
            }
        }

        if let Some(def) = obj.get("def").and_then(Value::as_object) {
            let fn_id = def
                .get("id")
                .and_then(Value::as_str)
                .or_else(|| def.get("name").and_then(Value::as_str))
                .unwrap_or("anonymous");
            if scope == "all" || fn_id == scope {
                if let Some(params) = def.get("params").and_then(Value::as_array) {
                    for (j, p) in params.iter().enumerate() {
                        if p.as_str() == Some(old_name) && path_ok(&format!("{path}/def/params/$[{j}]")) {
                            return true;
                        }
                    }
                }
            }
            if let Some(Value::Array(body)) = def.get("body") {
                for (j, s) in body.iter().enumerate() {
                    if walk(s, old_name, scope, limit_path, fn_id, &format!("{path}/def/body/$[{j}]")) {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn expr_refs(expr: &Value, name: &str) -> bool {
        match expr {
            Value::Object(obj) => {
                if obj.get("var").and_then(Value::as_str) == Some(name) {
                    return true;
                }
                obj.values().any(|v| expr_refs(v, name))
            }
            Value::Array(items) => items.iter().any(|v| expr_refs(v, name)),
            _ => false,
        }
    }

    program
        .iter()
        .enumerate()
        .any(|(i, s)| walk(s, old_name, scope, limit_path, "global", &format!("/$[{i}]")))
}

fn rename_in_expr(expr: &mut Value, old_name: &str, new_name: &str, path: &str, limit_path: Option<&str>, changed: &mut usize) {
    let in_scope = limit_path.is_none_or(|lp| path.starts_with(lp));
    match expr {
        Value::Object(obj) => {
            if in_scope && obj.get("var").and_then(Value::as_str) == Some(old_name) {
                obj.insert("var".to_string(), Value::String(new_name.to_string()));
                *changed += 1;
            }
            for (k, v) in obj.iter_mut() {
                rename_in_expr(v, old_name, new_name, &format!("{path}/{k}"), limit_path, changed);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter_mut().enumerate() {
                rename_in_expr(v, old_name, new_name, &format!("{path}/$[{i}]"), limit_path, changed);
            }
        }
        _ => {}
    }
}

#[allow(clippy::too_many_arguments)]
fn rename_in_stmt(
    stmt: &mut Value,
    old_name: &str,
    new_name: &str,
    scope: &str,
    limit_path: Option<&str>,
    current_scope: &str,
    path: &str,
    changed: &mut usize,
) {
    let Some(obj) = stmt.as_object_mut() else { return };
    let in_scope = scope == "all" || current_scope == scope;
    let path_ok = |p: &str| limit_path.is_none_or(|lp| p.starts_with(lp));

    if in_scope {
        if let Some(spec) = obj.get_mut("let").and_then(Value::as_object_mut) {
            if spec.get("name").and_then(Value::as_str) == Some(old_name) && path_ok(&format!("{path}/let/name")) {
                spec.insert("name".to_string(), Value::String(new_name.to_string()));
                *changed += 1;
            }
        }
        if let Some(spec) = obj.get_mut("set").and_then(Value::as_object_mut) {
            if spec.get("name").and_then(Value::as_str) == Some(old_name) && path_ok(&format!("{path}/set/name")) {
                spec.insert("name".to_string(), Value::String(new_name.to_string()));
                *changed += 1;
            }
        }
        for key in ["let", "set"] {
            if let Some(spec) = obj.get_mut(key).and_then(Value::as_object_mut) {
                if let Some(v) = spec.get_mut("value") {
                    rename_in_expr(v, old_name, new_name, &format!("{path}/{key}/value"), limit_path, changed);
                }
            }
        }
        for key in ["return", "expr", "print"] {
            if let Some(v) = obj.get_mut(key) {
                rename_in_expr(v, old_name, new_name, &format!("{path}/{key}"), limit_path, changed);
            }
        }
        if let Some(if_obj) = obj.get_mut("if").and_then(Value::as_object_mut) {
            if let Some(cond) = if_obj.get_mut("cond") {
                rename_in_expr(cond, old_name, new_name, &format!("{path}/if/cond"), limit_path, changed);
            }
            for key in ["then", "else"] {
                if let Some(Value::Array(arr)) = if_obj.get_mut(key) {
                    for (j, s) in arr.iter_mut().enumerate() {
                        rename_in_stmt(s, old_name, new_name, scope, limit_path, current_scope, &format!("{path}/if/{key}/$[{j}]"), changed);
                    }
                }
            }
        }
    }

    if let Some(def) = obj.get_mut("def").and_then(Value::as_object_mut) {
        let fn_id = def
            .get("id")
            .and_then(Value::as_str)
            .or_else(|| def.get("name").and_then(Value::as_str))
            .unwrap_or("anonymous")
            .to_string();
        if scope == "all" || fn_id == scope {
            if let Some(Value::Array(params)) = def.get_mut("params") {
                for (j, p) in params.iter_mut().enumerate() {
                    if p.as_str() == Some(old_name) && path_ok(&format!("{path}/def/params/$[{j}]")) {
                        *p = Value::String(new_name.to_string());
                        *changed += 1;
                    }
                }
            }
        }
        if let Some(Value::Array(body)) = def.get_mut("body") {
            for (j, s) in body.iter_mut().enumerate() {
                rename_in_stmt(s, old_name, new_name, scope, limit_path, &fn_id, &format!("{path}/def/body/$[{j}]"), changed);
            }
        }
    }
}

fn op_extract_function(program: &mut Vec<Value>, spec: &Map<String, Value>) -> Result<(), EditError> {
    let fn_name = spec
        .get("function_name")
        .and_then(Value::as_str)
        .ok_or_else(|| bad_spec("extract_function", "requires function_name"))?;
    let fn_id = spec.get("function_id").and_then(Value::as_str);
    let stmt_indices: Vec<usize> = spec
        .get("statements")
        .and_then(Value::as_array)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| bad_spec("extract_function", "requires non-empty statements list"))?
        .iter()
        .map(|v| {
            v.as_u64()
                .map(|n| n as usize)
                .ok_or_else(|| bad_spec("extract_function", "statement indices must be non-negative integers"))
        })
        .collect::<Result<_, _>>()?;
    let parameters: Vec<String> = spec
        .get("parameters")
        .and_then(Value::as_array)
        .ok_or_else(|| bad_spec("extract_function", "parameters must be a list"))?
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();
    let insert_at = spec.get("insert_at").and_then(Value::as_u64).unwrap_or(0) as usize;
    let replace_with_call = spec.get("replace_with_call").and_then(Value::as_bool).unwrap_or(true);

    for &idx in &stmt_indices {
        if idx >= program.len() {
            return Err(bad_spec("extract_function", format!("Invalid statement index: {idx}")));
        }
    }
    let mut sorted_indices = stmt_indices.clone();
    sorted_indices.sort_unstable();
    for w in sorted_indices.windows(2) {
        if w[1] != w[0] + 1 {
            return Err(bad_spec("extract_function", "Statement indices must be consecutive"));
        }
    }

    let body: Vec<Value> = sorted_indices.iter().map(|&i| program[i].clone()).collect();

    let mut def = Map::new();
    def.insert("name".to_string(), Value::String(fn_name.to_string()));
    def.insert("params".to_string(), Value::Array(parameters.iter().map(|p| Value::String(p.clone())).collect()));
    def.insert("body".to_string(), Value::Array(body));
    if let Some(fn_id) = fn_id {
        def.insert("id".to_string(), Value::String(fn_id.to_string()));
    }
    let mut fn_def = Map::new();
    fn_def.insert("def".to_string(), Value::Object(def));

    program.insert(insert_at, Value::Object(fn_def));

    if replace_with_call {
        let mut call = Map::new();
        let args: Vec<Value> = parameters
            .iter()
            .map(|p| serde_json::json!({"var": p}))
            .collect();
        if let Some(fn_id) = fn_id {
            call.insert("id".to_string(), Value::String(fn_id.to_string()));
        } else {
            call.insert("name".to_string(), Value::String(fn_name.to_string()));
        }
        call.insert("args".to_string(), Value::Array(args));
        let mut call_expr = Map::new();
        call_expr.insert("call".to_string(), Value::Object(call));
        let mut call_stmt = Map::new();
        call_stmt.insert("expr".to_string(), Value::Object(call_expr));

        let adjusted: Vec<usize> = sorted_indices.iter().map(|&i| if i >= insert_at { i + 1 } else { i }).collect();
        program[adjusted[0]] = Value::Object(call_stmt);
        for &i in adjusted[1..].iter().rev() {
            program.remove(i);
        }
    }

    Ok(())
}

/// Name/id bookkeeping collected by walking every `def`, including
/// ones nested in `then`/`else`/function bodies — the same shape
/// `validator::collect_functions` builds, kept local here since this
/// module needs a slightly different product (two lookup directions).
struct FnIndex {
    name_to_id: std::collections::HashMap<String, String>,
    id_to_name: std::collections::HashMap<String, String>,
    name_dups: std::collections::HashSet<String>,
}

fn build_fn_index(stmts: &[Value]) -> FnIndex {
    let mut idx = FnIndex {
        name_to_id: std::collections::HashMap::new(),
        id_to_name: std::collections::HashMap::new(),
        name_dups: std::collections::HashSet::new(),
    };
    collect_fn_index(stmts, &mut idx);
    idx
}

fn collect_fn_index(stmts: &[Value], idx: &mut FnIndex) {
    for stmt in stmts {
        let Some(obj) = stmt.as_object() else { continue };
        if let Some(def) = obj.get("def").and_then(Value::as_object) {
            let name = def.get("name").and_then(Value::as_str);
            let id = def.get("id").and_then(Value::as_str);
            if let (Some(name), Some(id)) = (name, id) {
                if idx.name_to_id.contains_key(name) {
                    idx.name_dups.insert(name.to_string());
                } else {
                    idx.name_to_id.insert(name.to_string(), id.to_string());
                }
                idx.id_to_name.insert(id.to_string(), name.to_string());
            }
            if let Some(body) = def.get("body").and_then(Value::as_array) {
                collect_fn_index(body, idx);
            }
        }
        if let Some(if_obj) = obj.get("if").and_then(Value::as_object) {
            if let Some(arr) = if_obj.get("then").and_then(Value::as_array) {
                collect_fn_index(arr, idx);
            }
            if let Some(arr) = if_obj.get("else").and_then(Value::as_array) {
                collect_fn_index(arr, idx);
            }
        }
    }
}

/// Rewrite every call site between name-based and id-based addressing.
/// `to` is `"id"` or `"name"`.
///
/// Converting to `id` only touches calls whose name resolves to exactly
/// one `def` — a name shared by more than one function (tracked in
/// [`FnIndex::name_dups`]) is left as a name-based call, since there is
/// no single id to pick. Converting to `name` only touches calls whose
/// id is present in the program's `id_to_name` map; unresolvable ids
/// are left alone. Because ambiguous names are never converted to id in
/// the first place, round-tripping `id` then `name` reproduces the
/// original program.
///
/// # Errors
/// Returns [`EditError::BadSpec`] if `to` is neither `"id"` nor `"name"`.
pub fn migrate_calls(program: &mut [Value], to: &str) -> Result<usize, EditError> {
    if to != "id" && to != "name" {
        return Err(bad_spec("migrate_calls", "to must be \"id\" or \"name\""));
    }
    let idx = build_fn_index(program);
    let mut changed = 0;

    let mut rewrite = |node: Value| -> Value {
        let Value::Object(ref obj) = node else { return node };
        let Some(Value::Object(call)) = obj.get("call") else { return node };

        if to == "id" {
            let Some(name) = call.get("name").and_then(Value::as_str) else { return node };
            if idx.name_dups.contains(name) {
                return node;
            }
            let Some(id) = idx.name_to_id.get(name) else { return node };
            let mut new_call = call.clone();
            new_call.remove("name");
            new_call.insert("id".to_string(), Value::String(id.clone()));
            changed += 1;
            let mut new_obj = Map::new();
            new_obj.insert("call".to_string(), Value::Object(new_call));
            Value::Object(new_obj)
        } else {
            let Some(id) = call.get("id").and_then(Value::as_str) else { return node };
            let Some(name) = idx.id_to_name.get(id) else { return node };
            let mut new_call = call.clone();
            new_call.remove("id");
            new_call.insert("name".to_string(), Value::String(name.clone()));
            changed += 1;
            let mut new_obj = Map::new();
            new_obj.insert("call".to_string(), Value::Object(new_call));
            Value::Object(new_obj)
        }
    };

    for stmt in program.iter_mut() {
        walk_stmt_exprs(stmt, &mut rewrite);
    }
    Ok(changed)
}

/// Report of a single `apply_edits` batch.
#[derive(Debug, Clone)]
pub struct EditReport {
    pub applied: usize,
    pub details: Vec<Value>,
}

/// Apply a list of `{op, ...}` edit specs to `program` in place, in
/// order, assigning uids first so `target`-addressed insertions work.
/// Stops and returns the first `EditError` encountered; statements
/// processed before the failure remain mutated in `program`.
pub fn apply_edits(program: &mut Vec<Value>, edits: &[Value]) -> Result<EditReport, EditError> {
    uid::assign_uids(program, Depth::Deep);

    let mut report = EditReport { applied: 0, details: Vec::new() };
    for (i, edit) in edits.iter().enumerate() {
        let obj = edit
            .as_object()
            .ok_or_else(|| EditError::BadInput { detail: "edit must be an object".to_string() })?;
        let op = obj
            .get("op")
            .and_then(Value::as_str)
            .ok_or_else(|| EditError::BadInput { detail: "edit missing op".to_string() })?;
        let mut spec = obj.clone();
        spec.remove("op");

        match op {
            "add_function" => {
                op_add_function(program, &spec)?;
                report.details.push(serde_json::json!({"op": op, "index": i}));
            }
            "rename_function" => {
                let changed = op_rename_function(program, &spec)?;
                report.details.push(serde_json::json!({"op": op, "index": i, "changed": changed}));
            }
            "insert_before" => {
                op_insert_before(program, &spec)?;
                report.details.push(serde_json::json!({"op": op, "index": i}));
            }
            "insert_after" => {
                op_insert_after(program, &spec)?;
                report.details.push(serde_json::json!({"op": op, "index": i}));
            }
            "replace_call" => {
                let changed = op_replace_call(program, &spec)?;
                report.details.push(serde_json::json!({"op": op, "index": i, "changed": changed}));
            }
            "delete_node" => {
                op_delete_node(program, &spec)?;
                report.details.push(serde_json::json!({"op": op, "index": i}));
            }
            "rename_variable" => {
                let changed = op_rename_variable(program, &spec)?;
                report.details.push(serde_json::json!({"op": op, "index": i, "changed": changed}));
            }
            "extract_function" => {
                op_extract_function(program, &spec)?;
                report.details.push(serde_json::json!({"op": op, "index": i}));
            }
            "migrate_calls" => {
                let to = spec
                    .get("to")
                    .and_then(Value::as_str)
                    .ok_or_else(|| bad_spec("migrate_calls", "requires {to: \"id\"|\"name\"}"))?;
                let changed = migrate_calls(program, to)?;
                report.details.push(serde_json::json!({"op": op, "index": i, "changed": changed}));
            }
            other => return Err(EditError::UnknownOp { op: other.to_string() }),
        }
        report.applied += 1;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_function_appends_a_def() {
        let mut program = vec![json!({"print": {"value": 1}})];
        let edits = vec![json!({"op": "add_function", "name": "f", "params": [], "body": []})];
        let report = apply_edits(&mut program, &edits).unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(program.len(), 2);
        assert_eq!(program[1]["def"]["name"], "f");
    }

    #[test]
    fn rename_function_updates_def_and_name_based_call_sites() {
        let mut program = vec![
            json!({"def": {"name": "old", "params": [], "body": []}}),
            json!({"expr": {"call": {"name": "old", "args": []}}}),
        ];
        let edits = vec![json!({"op": "rename_function", "from": "old", "to": "new"})];
        apply_edits(&mut program, &edits).unwrap();
        assert_eq!(program[0]["def"]["name"], "new");
        assert_eq!(program[1]["expr"]["call"]["name"], "new");
    }

    #[test]
    fn rename_function_by_name_ambiguous_when_duplicated() {
        let mut program = vec![
            json!({"def": {"name": "dup", "params": [], "body": []}}),
            json!({"def": {"name": "dup", "params": [], "body": []}}),
        ];
        let edits = vec![json!({"op": "rename_function", "from": "dup", "to": "new"})];
        let err = apply_edits(&mut program, &edits).unwrap_err();
        assert_eq!(err.code(), "E_AMBIGUOUS");
    }

    #[test]
    fn insert_before_and_after_by_target() {
        let mut program = vec![json!({"id": "amr_aaaaaaaa", "print": {"value": 1}})];
        let edits = vec![
            json!({"op": "insert_before", "target": "amr_aaaaaaaa", "node": {"print": {"value": 0}}}),
            json!({"op": "insert_after", "target": "amr_aaaaaaaa", "node": {"print": {"value": 2}}}),
        ];
        apply_edits(&mut program, &edits).unwrap();
        assert_eq!(program.len(), 3);
        assert_eq!(program[0]["print"]["value"], 0);
        assert_eq!(program[2]["print"]["value"], 2);
    }

    #[test]
    fn delete_node_by_path() {
        let mut program = vec![json!({"print": {"value": 1}}), json!({"print": {"value": 2}})];
        let edits = vec![json!({"op": "delete_node", "path": "/$[0]"})];
        apply_edits(&mut program, &edits).unwrap();
        assert_eq!(program.len(), 1);
        assert_eq!(program[0]["print"]["value"], 2);
    }

    #[test]
    fn replace_call_sets_args_and_swaps_name_for_id() {
        let mut program = vec![json!({"expr": {"call": {"name": "f", "args": [1]}}})];
        let edits = vec![json!({
            "op": "replace_call",
            "match": {"name": "f"},
            "set": {"id": "fn_deadbeef", "args": [2, 3]}
        })];
        apply_edits(&mut program, &edits).unwrap();
        let call = &program[0]["expr"]["call"];
        assert_eq!(call["id"], "fn_deadbeef");
        assert!(call.get("name").is_none());
        assert_eq!(call["args"], json!([2, 3]));
    }

    #[test]
    fn rename_variable_limits_to_path_prefix() {
        let mut program = vec![
            json!({"let": {"name": "x", "value": 1}}),
            json!({"if": {"cond": {"value": true}, "then": [{"expr": {"var": "x"}}], "else": []}}),
        ];
        let edits = vec![json!({
            "op": "rename_variable",
            "old_name": "x",
            "new_name": "y",
            "scope": "all",
            "path": "/$[1]"
        })];
        apply_edits(&mut program, &edits).unwrap();
        // restricted to /$[1]/if/then/..., so the top-level let is untouched
        assert_eq!(program[0]["let"]["name"], "x");
        assert_eq!(program[1]["if"]["then"][0]["expr"]["var"], "y");
    }

    #[test]
    fn extract_function_replaces_first_index_and_deletes_rest() {
        let mut program = vec![
            json!({"expr": {"call": {"name": "noop", "args": []}}}),
            json!({"print": {"value": 1}}),
            json!({"print": {"value": 2}}),
        ];
        let edits = vec![json!({
            "op": "extract_function",
            "function_name": "block",
            "statements": [1, 2],
            "parameters": [],
            "insert_at": 0
        })];
        apply_edits(&mut program, &edits).unwrap();
        assert_eq!(program[0]["def"]["name"], "block");
        assert_eq!(program[1]["expr"]["call"]["name"], "block");
        assert_eq!(program.len(), 3);
    }

    #[test]
    fn migrate_calls_to_id_skips_ambiguous_names() {
        let mut program = vec![
            json!({"def": {"name": "f", "id": "fn_aaaaaaaa", "params": [], "body": []}}),
            json!({"def": {"name": "dup", "id": "fn_bbbbbbbb", "params": [], "body": []}}),
            json!({"def": {"name": "dup", "id": "fn_cccccccc", "params": [], "body": []}}),
            json!({"expr": {"call": {"name": "f", "args": []}}}),
            json!({"expr": {"call": {"name": "dup", "args": []}}}),
        ];
        let changed = migrate_calls(&mut program, "id").unwrap();
        assert_eq!(changed, 1);
        assert_eq!(program[3]["expr"]["call"]["id"], "fn_aaaaaaaa");
        assert!(program[3]["expr"]["call"].get("name").is_none());
        assert_eq!(program[4]["expr"]["call"]["name"], "dup");
    }

    #[test]
    fn migrate_calls_round_trips_through_id_and_back_to_name() {
        let original = vec![
            json!({"def": {"name": "f", "id": "fn_aaaaaaaa", "params": [], "body": []}}),
            json!({"expr": {"call": {"name": "f", "args": []}}}),
        ];
        let mut program = original.clone();
        migrate_calls(&mut program, "id").unwrap();
        assert_eq!(program[1]["expr"]["call"]["id"], "fn_aaaaaaaa");
        migrate_calls(&mut program, "name").unwrap();
        assert_eq!(program, original);
    }

    #[test]
    fn migrate_calls_rejects_bad_direction() {
        let mut program = vec![];
        let err = migrate_calls(&mut program, "sideways").unwrap_err();
        assert_eq!(err.code(), "E_BAD_SPEC");
    }

    #[test]
    fn unknown_op_is_an_error() {
        let mut program = vec![];
        let edits = vec![json!({"op": "frobnicate"})];
        let err = apply_edits(&mut program, &edits).unwrap_err();
        assert_eq!(err.code(), "E_UNKNOWN_OP");
    }
}
