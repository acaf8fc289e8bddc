//! The typed Program Model: statements and expressions as genuine Rust
//! sum types, built from (and flattened back to) the JSON-dict-per-
//! variant wire shape.
//!
//! A plain `#[derive(Deserialize)]` tagged enum can't express this wire
//! shape: the discriminant is "which key is present", not a literal tag
//! field, and several expression variants (`Object` vs `Operator`) are
//! told apart by key *count* rather than by name at all. So this module
//! hand-writes the decode (`Stmt::from_json`/`Expr::from_json`) and the
//! matching encode (`Stmt::to_json`/`Expr::to_json`) instead, the same
//! way the evaluator and validator walk the tree: exhaustively, one
//! match arm per variant.
//!
//! Values at runtime are plain [`serde_json::Value`] — this language's
//! values *are* JSON data, so there is no separate runtime value type.

use serde_json::{Map, Number, Value};

use crate::error::ProgramError;

/// A statement, with its optional stable id.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let {
        name: String,
        value: Expr,
        id: Option<String>,
    },
    Set {
        name: String,
        value: Expr,
        id: Option<String>,
    },
    Def {
        name: String,
        fn_id: Option<String>,
        params: Vec<String>,
        body: Vec<Stmt>,
        id: Option<String>,
    },
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Vec<Stmt>,
        id: Option<String>,
    },
    Return {
        value: Expr,
        id: Option<String>,
    },
    Print {
        args: Vec<PrintArg>,
        id: Option<String>,
    },
    Expr {
        value: Expr,
        id: Option<String>,
    },
}

/// An element of a `print` argument list: either a plain expression or
/// a `{spread: expr}` that expands to a list at print time.
#[derive(Debug, Clone, PartialEq)]
pub enum PrintArg {
    Value(Expr),
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    List(Vec<Expr>),
    Var(String),
    Call {
        target: CallTarget,
        args: Vec<Expr>,
    },
    Operator {
        op: String,
        args: Vec<Expr>,
    },
    Spread(Box<Expr>),
    /// Object literal. Kept as an ordered pair list (not a map) so
    /// evaluation order and the ACIR `"obj"` tag's pair order are
    /// preserved; canonical JSON output sorts keys regardless, since
    /// `serde_json::Value`'s map is sorted-key by default.
    ObjectLit(Vec<(String, Expr)>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallTarget {
    Name(String),
    Id(String),
}

impl Stmt {
    /// Decode a statement list (a program, or any nested `then`/`else`/
    /// `body` block) from JSON.
    pub fn list_from_json(arr: &[Value], path: &str) -> Result<Vec<Stmt>, ProgramError> {
        arr.iter()
            .enumerate()
            .map(|(i, v)| Stmt::from_json(v, &format!("{path}/$[{i}]")))
            .collect()
    }

    pub fn from_json(v: &Value, path: &str) -> Result<Stmt, ProgramError> {
        let obj = v.as_object().ok_or_else(|| ProgramError::StmtNotObject {
            path: path.to_string(),
        })?;

        let id = opt_str(obj, "id");

        if let Some(inner) = obj.get("let") {
            let (name, value) = decode_name_value(inner, "let", path)?;
            return Ok(Stmt::Let { name, value, id });
        }
        if let Some(inner) = obj.get("set") {
            let (name, value) = decode_name_value(inner, "set", path)?;
            return Ok(Stmt::Set { name, value, id });
        }
        if let Some(inner) = obj.get("def") {
            return decode_def(inner, id, path);
        }
        if let Some(inner) = obj.get("if") {
            return decode_if(inner, id, path);
        }
        if let Some(v) = obj.get("return") {
            let value = Expr::from_json(v, &format!("{path}/return"))?;
            return Ok(Stmt::Return { value, id });
        }
        if let Some(v) = obj.get("print") {
            let args = decode_print_args(v, path)?;
            return Ok(Stmt::Print { args, id });
        }
        if let Some(v) = obj.get("expr") {
            let value = Expr::from_json(v, &format!("{path}/expr"))?;
            return Ok(Stmt::Expr { value, id });
        }

        Err(ProgramError::BadStmtShape {
            path: path.to_string(),
            detail: "statement has no recognized tag key (let/set/def/if/return/print/expr)"
                .to_string(),
        })
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Stmt::Let { id, .. }
            | Stmt::Set { id, .. }
            | Stmt::Def { id, .. }
            | Stmt::If { id, .. }
            | Stmt::Return { id, .. }
            | Stmt::Print { id, .. }
            | Stmt::Expr { id, .. } => id.as_deref(),
        }
    }

    pub fn set_id(&mut self, new_id: String) {
        let slot = match self {
            Stmt::Let { id, .. }
            | Stmt::Set { id, .. }
            | Stmt::Def { id, .. }
            | Stmt::If { id, .. }
            | Stmt::Return { id, .. }
            | Stmt::Print { id, .. }
            | Stmt::Expr { id, .. } => id,
        };
        *slot = Some(new_id);
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        match self {
            Stmt::Let { name, value, id } => {
                map.insert(
                    "let".to_string(),
                    encode_name_value(name, value),
                );
                insert_opt_id(&mut map, id);
            }
            Stmt::Set { name, value, id } => {
                map.insert(
                    "set".to_string(),
                    encode_name_value(name, value),
                );
                insert_opt_id(&mut map, id);
            }
            Stmt::Def {
                name,
                fn_id,
                params,
                body,
                id,
            } => {
                let mut inner = Map::new();
                inner.insert("name".to_string(), Value::String(name.clone()));
                if let Some(fid) = fn_id {
                    inner.insert("id".to_string(), Value::String(fid.clone()));
                }
                inner.insert(
                    "params".to_string(),
                    Value::Array(params.iter().cloned().map(Value::String).collect()),
                );
                inner.insert(
                    "body".to_string(),
                    Value::Array(body.iter().map(Stmt::to_json).collect()),
                );
                map.insert("def".to_string(), Value::Object(inner));
                insert_opt_id(&mut map, id);
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                id,
            } => {
                let mut inner = Map::new();
                inner.insert("cond".to_string(), cond.to_json());
                inner.insert(
                    "then".to_string(),
                    Value::Array(then_branch.iter().map(Stmt::to_json).collect()),
                );
                if !else_branch.is_empty() {
                    inner.insert(
                        "else".to_string(),
                        Value::Array(else_branch.iter().map(Stmt::to_json).collect()),
                    );
                }
                map.insert("if".to_string(), Value::Object(inner));
                insert_opt_id(&mut map, id);
            }
            Stmt::Return { value, id } => {
                map.insert("return".to_string(), value.to_json());
                insert_opt_id(&mut map, id);
            }
            Stmt::Print { args, id } => {
                map.insert("print".to_string(), encode_print_args(args));
                insert_opt_id(&mut map, id);
            }
            Stmt::Expr { value, id } => {
                map.insert("expr".to_string(), value.to_json());
                insert_opt_id(&mut map, id);
            }
        }
        Value::Object(map)
    }
}

fn insert_opt_id(map: &mut Map<String, Value>, id: &Option<String>) {
    if let Some(id) = id {
        map.insert("id".to_string(), Value::String(id.clone()));
    }
}

fn opt_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn decode_name_value(
    inner: &Value,
    tag: &str,
    path: &str,
) -> Result<(String, Expr), ProgramError> {
    let obj = inner.as_object().ok_or_else(|| ProgramError::BadStmtShape {
        path: path.to_string(),
        detail: format!("{tag} must be an object with name/value"),
    })?;
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| ProgramError::BadStmtShape {
            path: path.to_string(),
            detail: format!("{tag} is missing a string `name`"),
        })?
        .to_string();
    let value = obj
        .get("value")
        .ok_or_else(|| ProgramError::BadStmtShape {
            path: path.to_string(),
            detail: format!("{tag} is missing `value`"),
        })
        .and_then(|v| Expr::from_json(v, &format!("{path}/{tag}/value")))?;
    Ok((name, value))
}

fn encode_name_value(name: &str, value: &Expr) -> Value {
    let mut inner = Map::new();
    inner.insert("name".to_string(), Value::String(name.to_string()));
    inner.insert("value".to_string(), value.to_json());
    Value::Object(inner)
}

fn decode_def(inner: &Value, id: Option<String>, path: &str) -> Result<Stmt, ProgramError> {
    let obj = inner.as_object().ok_or_else(|| ProgramError::BadStmtShape {
        path: path.to_string(),
        detail: "def must be an object".to_string(),
    })?;
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| ProgramError::BadStmtShape {
            path: path.to_string(),
            detail: "def is missing a string `name`".to_string(),
        })?
        .to_string();
    let fn_id = opt_str(obj, "id");
    let params = obj
        .get("params")
        .and_then(Value::as_array)
        .ok_or_else(|| ProgramError::BadStmtShape {
            path: path.to_string(),
            detail: "def is missing a `params` array".to_string(),
        })?
        .iter()
        .map(|p| {
            p.as_str()
                .map(str::to_string)
                .ok_or_else(|| ProgramError::BadStmtShape {
                    path: path.to_string(),
                    detail: "def params must all be strings".to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let body_arr = obj
        .get("body")
        .and_then(Value::as_array)
        .ok_or_else(|| ProgramError::BadStmtShape {
            path: path.to_string(),
            detail: "def is missing a `body` array".to_string(),
        })?;
    let body = Stmt::list_from_json(body_arr, &format!("{path}/def/body"))?;
    Ok(Stmt::Def {
        name,
        fn_id,
        params,
        body,
        id,
    })
}

fn decode_if(inner: &Value, id: Option<String>, path: &str) -> Result<Stmt, ProgramError> {
    let obj = inner.as_object().ok_or_else(|| ProgramError::BadStmtShape {
        path: path.to_string(),
        detail: "if must be an object with `cond`/`then`/`else`".to_string(),
    })?;
    let cond_v = obj.get("cond").ok_or_else(|| ProgramError::BadStmtShape {
        path: path.to_string(),
        detail: "if is missing a `cond` expression".to_string(),
    })?;
    let cond = Expr::from_json(cond_v, &format!("{path}/if/cond"))?;
    let then_arr = obj
        .get("then")
        .and_then(Value::as_array)
        .ok_or_else(|| ProgramError::BadStmtShape {
            path: path.to_string(),
            detail: "if is missing a `then` array".to_string(),
        })?;
    let then_branch = Stmt::list_from_json(then_arr, &format!("{path}/if/then"))?;
    let else_branch = match obj.get("else") {
        Some(v) => {
            let arr = v.as_array().ok_or_else(|| ProgramError::BadStmtShape {
                path: path.to_string(),
                detail: "if's `else` must be an array".to_string(),
            })?;
            Stmt::list_from_json(arr, &format!("{path}/if/else"))?
        }
        None => Vec::new(),
    };
    Ok(Stmt::If {
        cond,
        then_branch,
        else_branch,
        id,
    })
}

fn decode_print_args(v: &Value, path: &str) -> Result<Vec<PrintArg>, ProgramError> {
    match v {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| decode_print_item(item, &format!("{path}/print/$[{i}]")))
            .collect(),
        other => Ok(vec![PrintArg::Value(Expr::from_json(
            other,
            &format!("{path}/print"),
        )?)]),
    }
}

fn decode_print_item(v: &Value, path: &str) -> Result<PrintArg, ProgramError> {
    if let Some(obj) = v.as_object() {
        if let Some(inner) = obj.get("spread") {
            if obj.len() == 1 {
                return Ok(PrintArg::Spread(Expr::from_json(inner, path)?));
            }
        }
    }
    Ok(PrintArg::Value(Expr::from_json(v, path)?))
}

fn encode_print_args(args: &[PrintArg]) -> Value {
    let encode_one = |arg: &PrintArg| match arg {
        PrintArg::Value(e) => e.to_json(),
        PrintArg::Spread(e) => {
            let mut m = Map::new();
            m.insert("spread".to_string(), e.to_json());
            Value::Object(m)
        }
    };
    if let [PrintArg::Value(e)] = args {
        e.to_json()
    } else {
        Value::Array(args.iter().map(encode_one).collect())
    }
}

impl Expr {
    pub fn from_json(v: &Value, path: &str) -> Result<Expr, ProgramError> {
        match v {
            Value::Array(items) => {
                let decoded = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| Expr::from_json(item, &format!("{path}/$[{i}]")))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::List(decoded))
            }
            Value::Object(obj) => decode_expr_object(obj, path),
            scalar => Ok(Expr::Literal(scalar.clone())),
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Expr::Literal(v) => v.clone(),
            Expr::List(items) => Value::Array(items.iter().map(Expr::to_json).collect()),
            Expr::Var(name) => {
                let mut m = Map::new();
                m.insert("var".to_string(), Value::String(name.clone()));
                Value::Object(m)
            }
            Expr::Call { target, args } => {
                let mut inner = Map::new();
                match target {
                    CallTarget::Name(n) => {
                        inner.insert("name".to_string(), Value::String(n.clone()));
                    }
                    CallTarget::Id(i) => {
                        inner.insert("id".to_string(), Value::String(i.clone()));
                    }
                }
                inner.insert(
                    "args".to_string(),
                    Value::Array(args.iter().map(Expr::to_json).collect()),
                );
                let mut m = Map::new();
                m.insert("call".to_string(), Value::Object(inner));
                Value::Object(m)
            }
            Expr::Operator { op, args } => {
                let mut m = Map::new();
                let value = if let [single] = args.as_slice() {
                    single.to_json()
                } else {
                    Value::Array(args.iter().map(Expr::to_json).collect())
                };
                m.insert(op.clone(), value);
                Value::Object(m)
            }
            Expr::Spread(inner) => {
                let mut m = Map::new();
                m.insert("spread".to_string(), inner.to_json());
                Value::Object(m)
            }
            Expr::ObjectLit(pairs) => {
                let mut m = Map::new();
                for (k, v) in pairs {
                    m.insert(k.clone(), v.to_json());
                }
                Value::Object(m)
            }
        }
    }

    /// The final (non-namespaced) segment of an operator's name, e.g.
    /// `"math.add"` -> `"add"`. Applies only to `Operator` nodes.
    #[must_use]
    pub fn operator_base_name(op: &str) -> &str {
        op.rsplit('.').next().unwrap_or(op)
    }
}

fn decode_expr_object(obj: &Map<String, Value>, path: &str) -> Result<Expr, ProgramError> {
    if let Some(v) = obj.get("var") {
        let name = v.as_str().ok_or_else(|| ProgramError::BadExprShape {
            path: path.to_string(),
            detail: "var must be a string".to_string(),
        })?;
        return Ok(Expr::Var(name.to_string()));
    }
    if let Some(v) = obj.get("call") {
        return decode_call(v, path);
    }
    if obj.len() == 1 {
        if let Some(v) = obj.get("spread") {
            return Ok(Expr::Spread(Box::new(Expr::from_json(v, path)?)));
        }
        let (op, arg_value) = obj.iter().next().expect("len == 1");
        let args = match arg_value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| Expr::from_json(item, &format!("{path}/{op}/$[{i}]")))
                .collect::<Result<Vec<_>, _>>()?,
            other => vec![Expr::from_json(other, &format!("{path}/{op}"))?],
        };
        return Ok(Expr::Operator {
            op: op.clone(),
            args,
        });
    }
    let pairs = obj
        .iter()
        .map(|(k, v)| Ok((k.clone(), Expr::from_json(v, &format!("{path}/{k}"))?)))
        .collect::<Result<Vec<_>, ProgramError>>()?;
    Ok(Expr::ObjectLit(pairs))
}

fn decode_call(v: &Value, path: &str) -> Result<Expr, ProgramError> {
    let obj = v.as_object().ok_or_else(|| ProgramError::BadExprShape {
        path: path.to_string(),
        detail: "call must be an object".to_string(),
    })?;
    let name = opt_str(obj, "name");
    let id = opt_str(obj, "id");
    let target = match (name, id) {
        (Some(n), None) => CallTarget::Name(n),
        (None, Some(i)) => CallTarget::Id(i),
        (Some(_), Some(_)) => {
            return Err(ProgramError::BadExprShape {
                path: path.to_string(),
                detail: "call must have exactly one of name/id, found both".to_string(),
            })
        }
        (None, None) => {
            return Err(ProgramError::BadExprShape {
                path: path.to_string(),
                detail: "call must have exactly one of name/id, found neither".to_string(),
            })
        }
    };
    let args = match obj.get("args") {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| Expr::from_json(item, &format!("{path}/call/args/$[{i}]")))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(ProgramError::BadExprShape {
                path: path.to_string(),
                detail: "call's `args` must be an array".to_string(),
            })
        }
        None => Vec::new(),
    };
    Ok(Expr::Call { target, args })
}

/// True if the value is "falsy" under this language's truthiness rule:
/// `false`, `0`, `0.0`, empty string, and empty list are falsy;
/// everything else (including empty object, and non-zero numbers) is
/// truthy.
#[must_use]
pub fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => !is_zero(n),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(_) => true,
    }
}

fn is_zero(n: &Number) -> bool {
    if let Some(i) = n.as_i64() {
        i == 0
    } else if let Some(f) = n.as_f64() {
        f == 0.0
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_let_and_return() {
        let prog = json!([
            {"let": {"name": "x", "value": {"add": [1, 2]}}},
            {"return": {"var": "x"}}
        ]);
        let stmts = Stmt::list_from_json(prog.as_array().unwrap(), "$").unwrap();
        assert_eq!(stmts.len(), 2);
        match &stmts[0] {
            Stmt::Let { name, value, .. } => {
                assert_eq!(name, "x");
                assert_eq!(
                    *value,
                    Expr::Operator {
                        op: "add".to_string(),
                        args: vec![Expr::Literal(json!(1)), Expr::Literal(json!(2))],
                    }
                );
            }
            other => panic!("expected Let, got {other:?}"),
        }
    }

    #[test]
    fn operator_round_trips_canonical_scalar_form() {
        let e = Expr::Operator {
            op: "not".to_string(),
            args: vec![Expr::Literal(json!(true))],
        };
        assert_eq!(e.to_json(), json!({"not": true}));
    }

    #[test]
    fn object_literal_needs_two_keys() {
        let v = json!({"a": 1, "b": 2});
        let e = Expr::from_json(&v, "$").unwrap();
        assert!(matches!(e, Expr::ObjectLit(_)));
    }

    #[test]
    fn call_requires_exactly_one_of_name_or_id() {
        let v = json!({"call": {"args": []}});
        assert!(Expr::from_json(&v, "$").is_err());
        let v = json!({"call": {"name": "f", "id": "fn_aaaaaaaa", "args": []}});
        assert!(Expr::from_json(&v, "$").is_err());
    }

    #[test]
    fn truthiness_rules() {
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
        assert!(is_truthy(&json!(0.5)));
    }
}
