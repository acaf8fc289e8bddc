//! The tree-walking evaluator.

use serde_json::{Map, Number, Value};
use smallvec::SmallVec;
use std::rc::Rc;

use crate::capability::Capabilities;
use crate::error::{ErrorContext, RuntimeError};
use crate::frame::Frames;
use crate::function::FunctionRegistry;
use crate::io::Stdio;
use crate::op_registry::{self, ArityCheck};
use crate::program::{is_truthy, CallTarget, Expr, PrintArg, Stmt};
use crate::tracer::{NoopTracer, VmTracer};

/// Depth ceiling for nested function calls. The language itself has no
/// built-in limit, but an unbounded host recursion would otherwise
/// crash the process before any language-level error fires.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1000;

/// One step's control-flow outcome: either execution falls through to
/// the next statement, or a `return` is unwinding toward the nearest
/// function boundary (or the program boundary, at depth 0).
#[derive(Debug, Clone, PartialEq)]
enum Flow {
    Normal,
    Return(Value),
}

pub struct Evaluator<'a> {
    functions: FunctionRegistry,
    frames: Frames,
    capabilities: Capabilities,
    tracer: &'a dyn VmTracer,
    stdio: &'a mut dyn Stdio,
    call_depth: usize,
    max_call_depth: usize,
    call_stack: Vec<String>,
}

static NOOP: NoopTracer = NoopTracer;

impl<'a> Evaluator<'a> {
    #[must_use]
    pub fn new(capabilities: Capabilities, stdio: &'a mut dyn Stdio) -> Self {
        Self {
            functions: FunctionRegistry::new(),
            frames: Frames::new(),
            capabilities,
            tracer: &NOOP,
            stdio,
            call_depth: 0,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            call_stack: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_tracer(mut self, tracer: &'a dyn VmTracer) -> Self {
        self.tracer = tracer;
        self
    }

    #[must_use]
    pub fn with_max_call_depth(mut self, max: usize) -> Self {
        self.max_call_depth = max;
        self
    }

    /// Run a whole program. A top-level `return` unwinds the program
    /// and its value is yielded; falling off the end yields `Value::Null`.
    pub fn run(&mut self, program: &[Stmt]) -> Result<Value, RuntimeError> {
        self.tracer.start();
        match self.exec_block(program, "$")? {
            Flow::Return(v) => Ok(v),
            Flow::Normal => Ok(Value::Null),
        }
    }

    fn context(&self, path: &str) -> Option<ErrorContext> {
        Some(ErrorContext {
            path: path.to_string(),
            call_stack: self.call_stack.clone(),
        })
    }

    fn exec_block(&mut self, stmts: &[Stmt], path: &str) -> Result<Flow, RuntimeError> {
        for (i, stmt) in stmts.iter().enumerate() {
            let stmt_path = format!("{path}/$[{i}]");
            let flow = self.exec_stmt(stmt, &stmt_path)?;
            if let Flow::Return(_) = flow {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, path: &str) -> Result<Flow, RuntimeError> {
        self.tracer.stmt_start(path);
        let flow = self.exec_stmt_inner(stmt, path)?;
        self.tracer.stmt_end(path);
        Ok(flow)
    }

    fn exec_stmt_inner(&mut self, stmt: &Stmt, path: &str) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Let { name, value, .. } => {
                let v = self.eval_expr(value, path)?;
                self.frames.declare(name, v);
                Ok(Flow::Normal)
            }
            Stmt::Set { name, value, .. } => {
                let v = self.eval_expr(value, path)?;
                if self.frames.set(name, v) {
                    Ok(Flow::Normal)
                } else {
                    Err(RuntimeError::CannotSetUndefined {
                        name: name.clone(),
                        context: self.context(path),
                    })
                }
            }
            Stmt::Def {
                name,
                fn_id,
                params,
                body,
                ..
            } => {
                self.functions.register(
                    name,
                    fn_id.as_deref(),
                    params.clone(),
                    Rc::from(body.clone()),
                );
                Ok(Flow::Normal)
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let c = self.eval_expr(cond, path)?;
                self.frames.push();
                let result = if is_truthy(&c) {
                    self.exec_block(then_branch, &format!("{path}/then"))
                } else {
                    self.exec_block(else_branch, &format!("{path}/else"))
                };
                self.frames.pop();
                result
            }
            Stmt::Return { value, .. } => {
                let v = self.eval_expr(value, path)?;
                self.tracer.on_return(path, &v);
                Ok(Flow::Return(v))
            }
            Stmt::Print { args, .. } => {
                self.capabilities
                    .check_print()
                    .map_err(RuntimeError::EffectDenied)?;
                let mut parts = Vec::new();
                for arg in args {
                    match arg {
                        PrintArg::Value(e) => {
                            let v = self.eval_expr(e, path)?;
                            parts.push(display_value(&v));
                        }
                        PrintArg::Spread(e) => {
                            let v = self.eval_expr(e, path)?;
                            let Value::Array(items) = v else {
                                return Err(RuntimeError::WrongKind {
                                    op: "print",
                                    detail: "spread argument must evaluate to a list".to_string(),
                                });
                            };
                            parts.extend(items.iter().map(display_value));
                        }
                    }
                }
                self.stdio.print_line(&parts.join(" "));
                Ok(Flow::Normal)
            }
            Stmt::Expr { value, .. } => {
                self.eval_expr(value, path)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn eval_expr(&mut self, expr: &Expr, path: &str) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval_expr(item, path)?);
                }
                Ok(Value::Array(out))
            }
            Expr::Var(name) => self
                .frames
                .get(name)
                .cloned()
                .ok_or_else(|| RuntimeError::VariableNotFound {
                    name: name.clone(),
                    context: self.context(path),
                }),
            Expr::Call { target, args } => self.eval_call(target, args, path),
            Expr::Operator { op, args } => self.eval_operator(op, args, path),
            Expr::Spread(_) => Err(RuntimeError::WrongKind {
                op: "spread",
                detail: "spread is only valid inside a print argument list".to_string(),
            }),
            Expr::ObjectLit(pairs) => {
                let mut map = Map::new();
                for (k, v) in pairs {
                    let value = self.eval_expr(v, path)?;
                    map.insert(k.clone(), value);
                }
                Ok(Value::Object(map))
            }
        }
    }

    fn eval_call(
        &mut self,
        target: &CallTarget,
        args: &[Expr],
        path: &str,
    ) -> Result<Value, RuntimeError> {
        // most calls pass a handful of args; avoid a heap Vec for the
        // common case the way the teacher's value evaluation does.
        let mut arg_vals: SmallVec<[Value; 3]> = SmallVec::with_capacity(args.len());
        for a in args {
            arg_vals.push(self.eval_expr(a, path)?);
        }

        let def = match target {
            CallTarget::Name(name) => {
                self.functions
                    .by_name(name)
                    .cloned()
                    .ok_or_else(|| RuntimeError::FunctionNameNotDefined {
                        name: name.clone(),
                        context: self.context(path),
                    })?
            }
            CallTarget::Id(id) => {
                self.functions
                    .by_id(id)
                    .cloned()
                    .ok_or_else(|| RuntimeError::FunctionIdNotDefined {
                        id: id.clone(),
                        context: self.context(path),
                    })?
            }
        };

        if arg_vals.len() != def.params.len() {
            return Err(RuntimeError::CallArityMismatch {
                display_name: def.name.clone(),
                expected: def.params.len(),
                got: arg_vals.len(),
                context: self.context(path),
            });
        }

        self.call_depth += 1;
        if self.call_depth > self.max_call_depth {
            self.call_depth -= 1;
            return Err(RuntimeError::RecursionLimitExceeded);
        }

        self.tracer.call_start(path, &def.name);
        self.frames.push();
        for (param, value) in def.params.iter().zip(arg_vals) {
            self.frames.declare(param, value);
        }
        self.call_stack.push(def.name.clone());

        let body_path = format!("{path}/fn[{}]", def.name);
        let flow = self.exec_block(&def.body, &body_path);

        self.call_stack.pop();
        self.frames.pop();
        self.call_depth -= 1;

        match flow? {
            Flow::Return(v) => Ok(v),
            Flow::Normal => Ok(Value::Null),
        }
    }

    fn eval_operator(&mut self, op: &str, args: &[Expr], path: &str) -> Result<Value, RuntimeError> {
        self.tracer.op(path, op);
        let base = Expr::operator_base_name(op).to_string();

        match op_registry::check_arity(op, args.len()) {
            ArityCheck::Unknown => return Err(RuntimeError::UnknownOperator { op: op.to_string() }),
            ArityCheck::Mismatch(_) => {
                return Err(RuntimeError::OperatorArity {
                    op: op.to_string(),
                    got: args.len(),
                })
            }
            ArityCheck::Ok => {}
        }

        // input's prompt expression must be evaluated lazily, after the
        // capability check, so the other operators all evaluate args
        // eagerly up front here.
        if base == "input" {
            return self.eval_input(args, path);
        }

        let mut vals = Vec::with_capacity(args.len());
        for a in args {
            vals.push(self.eval_expr(a, path)?);
        }

        match base.as_str() {
            "add" => fold_numeric(&vals, NumKind::Int(0), numeric_add),
            "mul" => fold_numeric(&vals, NumKind::Int(1), numeric_mul),
            "sub" => fold_first(&vals, numeric_sub),
            "mod" => fold_first(&vals, numeric_mod),
            "pow" => fold_first(&vals, numeric_pow),
            "div" => fold_first(&vals, numeric_div),
            "concat" => eval_concat(&vals),
            "eq" => Ok(Value::Bool(chain_compare(&vals, |a, b| a == b))),
            "ne" => Ok(Value::Bool(chain_compare(&vals, |a, b| a != b))),
            "lt" => chain_numeric_compare(&vals, |o| o == std::cmp::Ordering::Less),
            "le" => chain_numeric_compare(&vals, |o| o != std::cmp::Ordering::Greater),
            "gt" => chain_numeric_compare(&vals, |o| o == std::cmp::Ordering::Greater),
            "ge" => chain_numeric_compare(&vals, |o| o != std::cmp::Ordering::Less),
            "and" => Ok(Value::Bool(vals.iter().all(is_truthy))),
            "or" => Ok(Value::Bool(vals.iter().any(is_truthy))),
            "not" => Ok(Value::Bool(!is_truthy(&vals[0]))),
            "list" => Ok(Value::Array(vals)),
            "len" => eval_len(&vals[0]),
            "get" => eval_get(&vals[0], &vals[1]),
            "has" => Ok(Value::Bool(eval_get(&vals[0], &vals[1]).is_ok())),
            "range" => eval_range(&vals),
            "int" => eval_int(&vals[0]),
            _ => Err(RuntimeError::UnknownOperator { op: op.to_string() }),
        }
    }

    fn eval_input(&mut self, args: &[Expr], path: &str) -> Result<Value, RuntimeError> {
        self.capabilities
            .check_input()
            .map_err(RuntimeError::EffectDenied)?;
        let prompt = match args.first() {
            Some(e) => Some(display_value(&self.eval_expr(e, path)?)),
            None => None,
        };
        let line = self
            .stdio
            .read_line(prompt.as_deref())
            .map_err(|e| RuntimeError::WrongKind {
                op: "input",
                detail: format!("failed to read input: {e}"),
            })?;
        Ok(Value::String(line))
    }
}

/// Render a value the way `print` does: strings unquoted, numbers in
/// their natural form, everything else as compact JSON.
#[must_use]
pub fn display_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(v).unwrap_or_default(),
    }
}

#[derive(Debug, Clone, Copy)]
enum NumKind {
    Int(i64),
    Float(f64),
}

impl NumKind {
    fn to_value(self) -> Value {
        match self {
            NumKind::Int(i) => Value::Number(i.into()),
            NumKind::Float(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            NumKind::Int(i) => i as f64,
            NumKind::Float(f) => f,
        }
    }
}

fn as_num(v: &Value, op: &'static str) -> Result<NumKind, RuntimeError> {
    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(NumKind::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(NumKind::Float(f))
            } else {
                Err(RuntimeError::WrongKind {
                    op,
                    detail: "number out of range".to_string(),
                })
            }
        }
        Value::String(s) if op == "add" => Err(RuntimeError::WrongKind {
            op,
            detail: format!("cannot mix string and numeric operands: {s:?}"),
        }),
        other => Err(RuntimeError::WrongKind {
            op,
            detail: format!("expected a number, got {other}"),
        }),
    }
}

fn fold_numeric(
    vals: &[Value],
    identity: NumKind,
    combine: fn(NumKind, NumKind) -> Result<NumKind, RuntimeError>,
) -> Result<Value, RuntimeError> {
    let mut acc = identity;
    for v in vals {
        let n = as_num(v, "add")?;
        acc = combine(acc, n)?;
    }
    Ok(acc.to_value())
}

fn fold_first(
    vals: &[Value],
    combine: fn(NumKind, NumKind) -> Result<NumKind, RuntimeError>,
) -> Result<Value, RuntimeError> {
    let mut iter = vals.iter();
    let first = iter.next().expect("arity >= 1 enforced by op registry");
    let mut acc = as_num(first, "arith")?;
    for v in iter {
        let n = as_num(v, "arith")?;
        acc = combine(acc, n)?;
    }
    Ok(acc.to_value())
}

fn numeric_add(a: NumKind, b: NumKind) -> Result<NumKind, RuntimeError> {
    Ok(match (a, b) {
        (NumKind::Int(x), NumKind::Int(y)) => NumKind::Int(x.wrapping_add(y)),
        _ => NumKind::Float(a.as_f64() + b.as_f64()),
    })
}

fn numeric_mul(a: NumKind, b: NumKind) -> Result<NumKind, RuntimeError> {
    Ok(match (a, b) {
        (NumKind::Int(x), NumKind::Int(y)) => NumKind::Int(x.wrapping_mul(y)),
        _ => NumKind::Float(a.as_f64() * b.as_f64()),
    })
}

fn numeric_sub(a: NumKind, b: NumKind) -> Result<NumKind, RuntimeError> {
    Ok(match (a, b) {
        (NumKind::Int(x), NumKind::Int(y)) => NumKind::Int(x.wrapping_sub(y)),
        _ => NumKind::Float(a.as_f64() - b.as_f64()),
    })
}

/// `div` is true division, always a float — matching the host-of-record's
/// `lambda a, b: a / b` rather than a floor/integer divide.
fn numeric_div(a: NumKind, b: NumKind) -> Result<NumKind, RuntimeError> {
    if b.as_f64() == 0.0 {
        return Err(RuntimeError::DivisionByZero);
    }
    Ok(NumKind::Float(a.as_f64() / b.as_f64()))
}

/// `mod` follows Python's `%`: the result takes the sign of the divisor
/// (floored division), not Rust's truncating remainder.
fn numeric_mod(a: NumKind, b: NumKind) -> Result<NumKind, RuntimeError> {
    if b.as_f64() == 0.0 {
        return Err(RuntimeError::DivisionByZero);
    }
    Ok(match (a, b) {
        (NumKind::Int(x), NumKind::Int(y)) => NumKind::Int(((x % y) + y) % y),
        _ => {
            let (x, y) = (a.as_f64(), b.as_f64());
            NumKind::Float(x - y * (x / y).floor())
        }
    })
}

fn numeric_pow(a: NumKind, b: NumKind) -> Result<NumKind, RuntimeError> {
    if let (NumKind::Int(base), NumKind::Int(exp)) = (a, b) {
        if exp >= 0 {
            if let Ok(exp_u32) = u32::try_from(exp) {
                if let Some(result) = base.checked_pow(exp_u32) {
                    return Ok(NumKind::Int(result));
                }
            }
        }
    }
    Ok(NumKind::Float(a.as_f64().powf(b.as_f64())))
}

fn eval_concat(vals: &[Value]) -> Result<Value, RuntimeError> {
    match vals.first() {
        Some(Value::String(_)) => {
            let mut s = String::new();
            for v in vals {
                match v {
                    Value::String(piece) => s.push_str(piece),
                    other => {
                        return Err(RuntimeError::WrongKind {
                            op: "concat",
                            detail: format!("cannot concat string with {other}"),
                        })
                    }
                }
            }
            Ok(Value::String(s))
        }
        Some(Value::Array(_)) => {
            let mut out = Vec::new();
            for v in vals {
                match v {
                    Value::Array(items) => out.extend(items.iter().cloned()),
                    other => {
                        return Err(RuntimeError::WrongKind {
                            op: "concat",
                            detail: format!("cannot concat list with {other}"),
                        })
                    }
                }
            }
            Ok(Value::Array(out))
        }
        Some(other) => Err(RuntimeError::WrongKind {
            op: "concat",
            detail: format!("cannot concat {other}"),
        }),
        None => Err(RuntimeError::OperatorArity {
            op: "concat".to_string(),
            got: 0,
        }),
    }
}

fn chain_compare(vals: &[Value], pred: fn(&Value, &Value) -> bool) -> bool {
    if vals.len() < 2 {
        return true;
    }
    vals.windows(2).all(|w| pred(&w[0], &w[1]))
}

fn chain_numeric_compare(
    vals: &[Value],
    pred: fn(std::cmp::Ordering) -> bool,
) -> Result<Value, RuntimeError> {
    if vals.len() < 2 {
        return Ok(Value::Bool(true));
    }
    for w in vals.windows(2) {
        let ord = compare_values(&w[0], &w[1])?;
        if !pred(ord) {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn compare_values(a: &Value, b: &Value) -> Result<std::cmp::Ordering, RuntimeError> {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => {
            let x = as_num(a, "compare")?.as_f64();
            let y = as_num(b, "compare")?.as_f64();
            x.partial_cmp(&y).ok_or(RuntimeError::WrongKind {
                op: "compare",
                detail: "NaN is not ordered".to_string(),
            })
        }
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        _ => Err(RuntimeError::WrongKind {
            op: "compare",
            detail: format!("cannot order {a} and {b}"),
        }),
    }
}

fn eval_len(v: &Value) -> Result<Value, RuntimeError> {
    match v {
        Value::String(s) => Ok(Value::Number((s.chars().count() as i64).into())),
        Value::Array(a) => Ok(Value::Number((a.len() as i64).into())),
        other => Err(RuntimeError::WrongKind {
            op: "len",
            detail: format!("expected a string or list, got {other}"),
        }),
    }
}

fn eval_get(container: &Value, key: &Value) -> Result<Value, RuntimeError> {
    match container {
        Value::Array(items) => {
            let idx = key.as_i64().ok_or_else(|| RuntimeError::WrongKind {
                op: "get",
                detail: "list index must be an integer".to_string(),
            })?;
            usize::try_from(idx)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .ok_or(RuntimeError::IndexOutOfRange { op: "get" })
        }
        Value::Object(map) => {
            let k = key.as_str().ok_or_else(|| RuntimeError::WrongKind {
                op: "get",
                detail: "object key must be a string".to_string(),
            })?;
            map.get(k)
                .cloned()
                .ok_or(RuntimeError::IndexOutOfRange { op: "get" })
        }
        other => Err(RuntimeError::WrongKind {
            op: "get",
            detail: format!("expected a list or object, got {other}"),
        }),
    }
}

fn eval_range(vals: &[Value]) -> Result<Value, RuntimeError> {
    let n0 = vals[0].as_i64().ok_or_else(|| RuntimeError::WrongKind {
        op: "range",
        detail: "range bound must be an integer".to_string(),
    })?;
    let items: Vec<i64> = if vals.len() == 1 {
        if n0 <= 0 {
            Vec::new()
        } else {
            (1..=n0).collect()
        }
    } else {
        let n1 = vals[1].as_i64().ok_or_else(|| RuntimeError::WrongKind {
            op: "range",
            detail: "range bound must be an integer".to_string(),
        })?;
        if n0 <= n1 {
            (n0..=n1).collect()
        } else {
            (n1..=n0).rev().collect()
        }
    };
    Ok(Value::Array(
        items.into_iter().map(|i| Value::Number(i.into())).collect(),
    ))
}

fn eval_int(v: &Value) -> Result<Value, RuntimeError> {
    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(i.into()))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Number((f.trunc() as i64).into()))
            } else {
                Err(RuntimeError::IntParseFailure {
                    input: n.to_string(),
                })
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(|i| Value::Number(i.into()))
            .map_err(|_| RuntimeError::IntParseFailure { input: s.clone() }),
        other => Err(RuntimeError::IntParseFailure {
            input: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::BufferedStdio;

    fn run_ok(stmts: &[Stmt]) -> Value {
        let mut stdio = BufferedStdio::default();
        let mut ev = Evaluator::new(Capabilities::unrestricted(), &mut stdio);
        ev.run(stmts).expect("should not error")
    }

    fn parse(json: serde_json::Value) -> Vec<Stmt> {
        Stmt::list_from_json(json.as_array().unwrap(), "$").unwrap()
    }

    #[test]
    fn arithmetic_scenario() {
        let stmts = parse(serde_json::json!([
            {"let": {"name": "x", "value": {"add": [1, 2]}}},
            {"return": {"var": "x"}}
        ]));
        assert_eq!(run_ok(&stmts), serde_json::json!(3));
    }

    #[test]
    fn factorial_recursion_scenario() {
        let stmts = parse(serde_json::json!([
            {"def": {"name": "fact", "params": ["n"], "body": [
                {"if": {"cond": {"eq": [{"var": "n"}, 0]},
                        "then": [{"return": 1}],
                        "else": [{"return": {"mul": [
                            {"var": "n"},
                            {"call": {"name": "fact", "args": [{"sub": [{"var": "n"}, 1]}]}}
                        ]}}]}}
            ]}},
            {"return": {"call": {"name": "fact", "args": [5]}}}
        ]));
        assert_eq!(run_ok(&stmts), serde_json::json!(120));
    }

    #[test]
    fn chained_comparison() {
        let stmts = parse(serde_json::json!([{"return": {"lt": [1, 2, 3]}}]));
        assert_eq!(run_ok(&stmts), serde_json::json!(true));
        let stmts = parse(serde_json::json!([{"return": {"lt": [1, 3, 2]}}]));
        assert_eq!(run_ok(&stmts), serde_json::json!(false));
    }

    #[test]
    fn range_variants() {
        let stmts = parse(serde_json::json!([{"return": {"range": 5}}]));
        assert_eq!(run_ok(&stmts), serde_json::json!([1, 2, 3, 4, 5]));
        let stmts = parse(serde_json::json!([{"return": {"range": [7, 3]}}]));
        assert_eq!(run_ok(&stmts), serde_json::json!([7, 6, 5, 4, 3]));
        let stmts = parse(serde_json::json!([{"return": {"range": 0}}]));
        assert_eq!(run_ok(&stmts), serde_json::json!([]));
    }

    #[test]
    fn set_on_undefined_variable_errors() {
        let stmts = parse(serde_json::json!([{"set": {"name": "x", "value": 1}}]));
        let mut stdio = BufferedStdio::default();
        let mut ev = Evaluator::new(Capabilities::unrestricted(), &mut stdio);
        assert!(ev.run(&stmts).is_err());
    }

    #[test]
    fn print_respects_denied_capability() {
        let stmts = parse(serde_json::json!([{"print": "hi"}]));
        let mut stdio = BufferedStdio::default();
        let mut ev = Evaluator::new(Capabilities::none(), &mut stdio);
        let err = ev.run(&stmts).unwrap_err();
        assert!(matches!(err, RuntimeError::EffectDenied(_)));
    }

    #[test]
    fn print_joins_with_spaces_and_expands_spread() {
        let stmts = parse(serde_json::json!([
            {"print": [1, {"spread": {"list": [2, 3]}}, "x"]}
        ]));
        let mut stdio = BufferedStdio::default();
        let mut ev = Evaluator::new(Capabilities::unrestricted(), &mut stdio);
        ev.run(&stmts).unwrap();
        assert_eq!(stdio.output, vec!["1 2 3 x".to_string()]);
    }

    #[test]
    fn branches_do_not_leak_bindings() {
        let stmts = parse(serde_json::json!([
            {"if": {"cond": true, "then": [{"let": {"name": "y", "value": 1}}]}},
            {"return": {"var": "y"}}
        ]));
        let mut stdio = BufferedStdio::default();
        let mut ev = Evaluator::new(Capabilities::unrestricted(), &mut stdio);
        assert!(ev.run(&stmts).is_err());
    }
}
