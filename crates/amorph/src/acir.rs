//! ACIR: a compact, symbol-interned, deterministic encoding of a
//! program.
//!
//! The string table is the sorted, deduplicated set of every
//! *name-like* string reachable in the program — statement ids,
//! operator names, variable names, function names and ids, parameter
//! names, and object-literal keys. String *literals* that appear as
//! values (e.g. the payload of a `{"concat": [...]}` call, or a plain
//! string expression) are left untouched and never interned.
//!
//! Each statement/expression variant becomes a tagged [`AcirStmt`]/
//! [`AcirExpr`] node carrying symbol-table indices instead of the raw
//! strings; `#[serde(rename = "...")]` gives each variant a single-letter
//! tag, so the JSON form of an `AcirStmt::Let` is
//! `{"l": [name_idx, value, id_idx]}` — an array-with-leading-tag shape,
//! via a derive-friendly object wrapper instead of a hand-rolled leading
//! tag element (see DESIGN.md). This keeps the whole codec derive-based
//! rather than hand-rolled seq serialization, which is what lets the
//! same `AcirProgram` type serve both serialization backends in
//! [`pack`]/[`unpack`]: `postcard` (preferred, compact binary) and
//! minified sorted-key JSON (fallback).
//!
//! The trailing `id_idx` is `Option<usize>` (round-trips as `null` when
//! absent rather than via array-length discrimination); `fn_id_idx` on
//! `Def` keeps a `-1`-for-absent sentinel verbatim since it's a distinct
//! convention from the optional trailing id.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::program::{CallTarget, Expr, PrintArg, Stmt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcirError {
    /// A symbol index in a decoded node falls outside the string table.
    BadSymbolIndex { index: i64, table_len: usize },
    /// `pack`/`unpack` couldn't make sense of the bytes in either
    /// supported format.
    UnrecognizedWireFormat,
    Binary(String),
    Json(String),
}

impl AcirError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadSymbolIndex { .. } => "E_ACIR_BAD_SYMBOL",
            Self::UnrecognizedWireFormat => "E_ACIR_BAD_WIRE_FORMAT",
            Self::Binary(_) => "E_ACIR_BINARY",
            Self::Json(_) => "E_ACIR_JSON",
        }
    }
}

impl fmt::Display for AcirError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadSymbolIndex { index, table_len } => {
                write!(f, "symbol index {index} out of range (table has {table_len} entries)")
            }
            Self::UnrecognizedWireFormat => {
                write!(f, "bytes are neither valid postcard nor valid JSON ACIR")
            }
            Self::Binary(e) => write!(f, "binary (postcard) codec error: {e}"),
            Self::Json(e) => write!(f, "JSON codec error: {e}"),
        }
    }
}

impl std::error::Error for AcirError {}

/// A fully symbol-interned program: the sorted string table plus the
/// tagged statement list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcirProgram {
    pub strings: Vec<String>,
    pub statements: Vec<AcirStmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcirStmt {
    #[serde(rename = "l")]
    Let(usize, AcirExpr, Option<usize>),
    #[serde(rename = "s")]
    Set(usize, AcirExpr, Option<usize>),
    #[serde(rename = "d")]
    Def(usize, Vec<usize>, Vec<AcirStmt>, i64, Option<usize>),
    #[serde(rename = "i")]
    If(AcirExpr, Vec<AcirStmt>, Vec<AcirStmt>, Option<usize>),
    #[serde(rename = "r")]
    Return(AcirExpr, Option<usize>),
    #[serde(rename = "p")]
    Print(Vec<AcirPrintArg>, Option<usize>),
    #[serde(rename = "x")]
    Expr(AcirExpr, Option<usize>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AcirPrintArg {
    Value(AcirExpr),
    Spread(AcirExpr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcirExpr {
    Literal(AcirScalar),
    List(Vec<AcirExpr>),
    #[serde(rename = "v")]
    Var(usize),
    /// `["c", 0, name_idx, [arg...]]` (by name) or `["c", 1, id_idx,
    /// [arg...]]` (by id); `by_id` plays the role of that leading `0`/`1`.
    #[serde(rename = "c")]
    Call { by_id: bool, idx: usize, args: Vec<AcirExpr> },
    #[serde(rename = "o")]
    Operator(usize, Vec<AcirExpr>),
    #[serde(rename = "obj")]
    ObjectLit(Vec<(usize, AcirExpr)>),
    Spread(Box<AcirExpr>),
}

/// A literal scalar, mirroring the JSON scalar kinds `Expr::Literal`
/// can wrap (never an array or object — those decode to `List`/
/// `ObjectLit` instead, see [`crate::program`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AcirScalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl AcirScalar {
    fn from_value(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::String(s) => Self::Str(s.clone()),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    Self::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            // Arrays/objects never occur inside a Literal node; fall
            // back to null rather than panic on a malformed tree.
            _ => Self::Null,
        }
    }

    fn to_value(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::Number((*i).into()),
            Self::Float(f) => serde_json::Number::from_f64(*f).map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Str(s) => serde_json::Value::String(s.clone()),
        }
    }
}

/// The sorted, deduplicated symbol table plus an index for encoding.
struct SymbolTable {
    sorted: Vec<String>,
    index: std::collections::HashMap<String, usize>,
}

impl SymbolTable {
    fn build(stmts: &[Stmt]) -> Self {
        let mut set = BTreeSet::new();
        for s in stmts {
            collect_stmt(s, &mut set);
        }
        let sorted: Vec<String> = set.into_iter().collect();
        let index = sorted.iter().cloned().enumerate().map(|(i, s)| (s, i)).collect();
        Self { sorted, index }
    }

    fn idx(&self, name: &str) -> usize {
        *self
            .index
            .get(name)
            .unwrap_or_else(|| panic!("symbol '{name}' missing from interned table"))
    }
}

fn collect_stmt(stmt: &Stmt, out: &mut BTreeSet<String>) {
    if let Some(id) = stmt.id() {
        out.insert(id.to_string());
    }
    match stmt {
        Stmt::Let { name, value, .. } | Stmt::Set { name, value, .. } => {
            out.insert(name.clone());
            collect_expr(value, out);
        }
        Stmt::Def {
            name,
            fn_id,
            params,
            body,
            ..
        } => {
            out.insert(name.clone());
            if let Some(fid) = fn_id {
                out.insert(fid.clone());
            }
            for p in params {
                out.insert(p.clone());
            }
            for s in body {
                collect_stmt(s, out);
            }
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
            ..
        } => {
            collect_expr(cond, out);
            for s in then_branch {
                collect_stmt(s, out);
            }
            for s in else_branch {
                collect_stmt(s, out);
            }
        }
        Stmt::Return { value, .. } | Stmt::Expr { value, .. } => collect_expr(value, out),
        Stmt::Print { args, .. } => {
            for a in args {
                match a {
                    PrintArg::Value(e) | PrintArg::Spread(e) => collect_expr(e, out),
                }
            }
        }
    }
}

fn collect_expr(expr: &Expr, out: &mut BTreeSet<String>) {
    match expr {
        Expr::Literal(_) => {}
        Expr::List(items) => items.iter().for_each(|e| collect_expr(e, out)),
        Expr::Var(name) => {
            out.insert(name.clone());
        }
        Expr::Call { target, args } => {
            match target {
                CallTarget::Name(n) => {
                    out.insert(n.clone());
                }
                CallTarget::Id(i) => {
                    out.insert(i.clone());
                }
            }
            args.iter().for_each(|e| collect_expr(e, out));
        }
        Expr::Operator { op, args } => {
            out.insert(op.clone());
            args.iter().for_each(|e| collect_expr(e, out));
        }
        Expr::Spread(inner) => collect_expr(inner, out),
        Expr::ObjectLit(pairs) => {
            for (k, v) in pairs {
                out.insert(k.clone());
                collect_expr(v, out);
            }
        }
    }
}

/// Encode a typed statement list into its interned ACIR form.
#[must_use]
pub fn encode_program(stmts: &[Stmt]) -> AcirProgram {
    let table = SymbolTable::build(stmts);
    let statements = stmts.iter().map(|s| encode_stmt(s, &table)).collect();
    AcirProgram {
        strings: table.sorted,
        statements,
    }
}

fn encode_stmt(stmt: &Stmt, table: &SymbolTable) -> AcirStmt {
    let id_idx = stmt.id().map(|id| table.idx(id));
    match stmt {
        Stmt::Let { name, value, .. } => AcirStmt::Let(table.idx(name), encode_expr(value, table), id_idx),
        Stmt::Set { name, value, .. } => AcirStmt::Set(table.idx(name), encode_expr(value, table), id_idx),
        Stmt::Def {
            name,
            fn_id,
            params,
            body,
            ..
        } => {
            let fn_id_idx = fn_id.as_deref().map_or(-1, |fid| table.idx(fid) as i64);
            AcirStmt::Def(
                table.idx(name),
                params.iter().map(|p| table.idx(p)).collect(),
                body.iter().map(|s| encode_stmt(s, table)).collect(),
                fn_id_idx,
                id_idx,
            )
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
            ..
        } => AcirStmt::If(
            encode_expr(cond, table),
            then_branch.iter().map(|s| encode_stmt(s, table)).collect(),
            else_branch.iter().map(|s| encode_stmt(s, table)).collect(),
            id_idx,
        ),
        Stmt::Return { value, .. } => AcirStmt::Return(encode_expr(value, table), id_idx),
        Stmt::Print { args, .. } => AcirStmt::Print(
            args.iter()
                .map(|a| match a {
                    PrintArg::Value(e) => AcirPrintArg::Value(encode_expr(e, table)),
                    PrintArg::Spread(e) => AcirPrintArg::Spread(encode_expr(e, table)),
                })
                .collect(),
            id_idx,
        ),
        Stmt::Expr { value, .. } => AcirStmt::Expr(encode_expr(value, table), id_idx),
    }
}

fn encode_expr(expr: &Expr, table: &SymbolTable) -> AcirExpr {
    match expr {
        Expr::Literal(v) => AcirExpr::Literal(AcirScalar::from_value(v)),
        Expr::List(items) => AcirExpr::List(items.iter().map(|e| encode_expr(e, table)).collect()),
        Expr::Var(name) => AcirExpr::Var(table.idx(name)),
        Expr::Call { target, args } => {
            let (by_id, idx) = match target {
                CallTarget::Name(n) => (false, table.idx(n)),
                CallTarget::Id(i) => (true, table.idx(i)),
            };
            AcirExpr::Call {
                by_id,
                idx,
                args: args.iter().map(|e| encode_expr(e, table)).collect(),
            }
        }
        Expr::Operator { op, args } => AcirExpr::Operator(
            table.idx(op),
            args.iter().map(|e| encode_expr(e, table)).collect(),
        ),
        Expr::Spread(inner) => AcirExpr::Spread(Box::new(encode_expr(inner, table))),
        Expr::ObjectLit(pairs) => {
            AcirExpr::ObjectLit(pairs.iter().map(|(k, v)| (table.idx(k), encode_expr(v, table))).collect())
        }
    }
}

/// Decode an [`AcirProgram`] back into a typed statement list. Fails if
/// any symbol index is out of range for the accompanying string table
/// (the only way a well-formed `AcirProgram` can fail to decode).
pub fn decode_program(acir: &AcirProgram) -> Result<Vec<Stmt>, AcirError> {
    acir.statements.iter().map(|s| decode_stmt(s, &acir.strings)).collect()
}

fn sym(strings: &[String], idx: usize) -> Result<String, AcirError> {
    strings
        .get(idx)
        .cloned()
        .ok_or(AcirError::BadSymbolIndex { index: idx as i64, table_len: strings.len() })
}

fn opt_sym(strings: &[String], idx: Option<usize>) -> Result<Option<String>, AcirError> {
    idx.map(|i| sym(strings, i)).transpose()
}

fn decode_stmt(stmt: &AcirStmt, strings: &[String]) -> Result<Stmt, AcirError> {
    Ok(match stmt {
        AcirStmt::Let(name_idx, value, id_idx) => Stmt::Let {
            name: sym(strings, *name_idx)?,
            value: decode_expr(value, strings)?,
            id: opt_sym(strings, *id_idx)?,
        },
        AcirStmt::Set(name_idx, value, id_idx) => Stmt::Set {
            name: sym(strings, *name_idx)?,
            value: decode_expr(value, strings)?,
            id: opt_sym(strings, *id_idx)?,
        },
        AcirStmt::Def(name_idx, param_idxs, body, fn_id_idx, id_idx) => Stmt::Def {
            name: sym(strings, *name_idx)?,
            fn_id: if *fn_id_idx < 0 {
                None
            } else {
                Some(sym(strings, *fn_id_idx as usize)?)
            },
            params: param_idxs.iter().map(|&i| sym(strings, i)).collect::<Result<_, _>>()?,
            body: body.iter().map(|s| decode_stmt(s, strings)).collect::<Result<_, _>>()?,
            id: opt_sym(strings, *id_idx)?,
        },
        AcirStmt::If(cond, then_branch, else_branch, id_idx) => Stmt::If {
            cond: decode_expr(cond, strings)?,
            then_branch: then_branch.iter().map(|s| decode_stmt(s, strings)).collect::<Result<_, _>>()?,
            else_branch: else_branch.iter().map(|s| decode_stmt(s, strings)).collect::<Result<_, _>>()?,
            id: opt_sym(strings, *id_idx)?,
        },
        AcirStmt::Return(value, id_idx) => Stmt::Return {
            value: decode_expr(value, strings)?,
            id: opt_sym(strings, *id_idx)?,
        },
        AcirStmt::Print(args, id_idx) => Stmt::Print {
            args: args
                .iter()
                .map(|a| {
                    Ok(match a {
                        AcirPrintArg::Value(e) => PrintArg::Value(decode_expr(e, strings)?),
                        AcirPrintArg::Spread(e) => PrintArg::Spread(decode_expr(e, strings)?),
                    })
                })
                .collect::<Result<_, AcirError>>()?,
            id: opt_sym(strings, *id_idx)?,
        },
        AcirStmt::Expr(value, id_idx) => Stmt::Expr {
            value: decode_expr(value, strings)?,
            id: opt_sym(strings, *id_idx)?,
        },
    })
}

fn decode_expr(expr: &AcirExpr, strings: &[String]) -> Result<Expr, AcirError> {
    Ok(match expr {
        AcirExpr::Literal(scalar) => Expr::Literal(scalar.to_value()),
        AcirExpr::List(items) => Expr::List(items.iter().map(|e| decode_expr(e, strings)).collect::<Result<_, _>>()?),
        AcirExpr::Var(idx) => Expr::Var(sym(strings, *idx)?),
        AcirExpr::Call { by_id, idx, args } => Expr::Call {
            target: if *by_id {
                CallTarget::Id(sym(strings, *idx)?)
            } else {
                CallTarget::Name(sym(strings, *idx)?)
            },
            args: args.iter().map(|e| decode_expr(e, strings)).collect::<Result<_, _>>()?,
        },
        AcirExpr::Operator(op_idx, args) => Expr::Operator {
            op: sym(strings, *op_idx)?,
            args: args.iter().map(|e| decode_expr(e, strings)).collect::<Result<_, _>>()?,
        },
        AcirExpr::ObjectLit(pairs) => Expr::ObjectLit(
            pairs
                .iter()
                .map(|(k, v)| Ok((sym(strings, *k)?, decode_expr(v, strings)?)))
                .collect::<Result<_, AcirError>>()?,
        ),
        AcirExpr::Spread(inner) => Expr::Spread(Box::new(decode_expr(inner, strings)?)),
    })
}

/// The two wire formats `pack`/`unpack` can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// Compact binary, via `postcard`. Preferred when unspecified.
    Binary,
    /// Minified, sorted-key JSON, via `serde_json`.
    Json,
}

/// Pack a program into bytes. With no explicit `format`, always emits
/// the binary form.
pub fn pack(stmts: &[Stmt], format: Option<WireFormat>) -> Result<Vec<u8>, AcirError> {
    let acir = encode_program(stmts);
    match format.unwrap_or(WireFormat::Binary) {
        WireFormat::Binary => postcard::to_allocvec(&acir).map_err(|e| AcirError::Binary(e.to_string())),
        WireFormat::Json => serde_json::to_vec(&acir).map_err(|e| AcirError::Json(e.to_string())),
    }
}

/// Unpack bytes into a program. With an explicit `format`, decodes
/// exactly that way; with `None`, sniffs by attempting `postcard` first
/// and falling back to JSON.
pub fn unpack(bytes: &[u8], format: Option<WireFormat>) -> Result<Vec<Stmt>, AcirError> {
    let acir = match format {
        Some(WireFormat::Binary) => postcard::from_bytes(bytes).map_err(|e| AcirError::Binary(e.to_string()))?,
        Some(WireFormat::Json) => serde_json::from_slice(bytes).map_err(|e| AcirError::Json(e.to_string()))?,
        None => postcard::from_bytes(bytes)
            .or_else(|_| serde_json::from_slice(bytes))
            .map_err(|_| AcirError::UnrecognizedWireFormat)?,
    };
    decode_program(&acir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: serde_json::Value) -> Vec<Stmt> {
        Stmt::list_from_json(v.as_array().unwrap(), "$").unwrap()
    }

    #[test]
    fn string_table_is_sorted_and_deduplicated() {
        let stmts = parse(json!([
            {"let": {"name": "zeta", "value": 1}},
            {"let": {"name": "alpha", "value": {"var": "zeta"}}}
        ]));
        let acir = encode_program(&stmts);
        assert_eq!(acir.strings, vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[test]
    fn arithmetic_scenario_round_trips() {
        let stmts = parse(json!([
            {"let": {"name": "x", "value": {"add": [1, 2]}}},
            {"return": {"var": "x"}}
        ]));
        let acir = encode_program(&stmts);
        let back = decode_program(&acir).unwrap();
        assert_eq!(back, stmts);
    }

    #[test]
    fn recursion_scenario_round_trips() {
        let stmts = parse(json!([
            {"def": {"name": "fact", "id": "fn_aaaaaaaa", "params": ["n"], "body": [
                {"if": {"cond": {"eq": [{"var": "n"}, 0]},
                        "then": [{"return": 1}],
                        "else": [{"return": {"mul": [
                            {"var": "n"},
                            {"call": {"id": "fn_aaaaaaaa", "args": [{"sub": [{"var": "n"}, 1]}]}}
                        ]}}]}}
            ]}},
            {"return": {"call": {"name": "fact", "args": [5]}}}
        ]));
        let acir = encode_program(&stmts);
        let back = decode_program(&acir).unwrap();
        assert_eq!(back, stmts);
    }

    #[test]
    fn runtime_created_def_without_fn_id_uses_sentinel() {
        let stmts = parse(json!([{"def": {"name": "f", "params": [], "body": []}}]));
        let acir = encode_program(&stmts);
        match &acir.statements[0] {
            AcirStmt::Def(_, _, _, fn_id_idx, _) => assert_eq!(*fn_id_idx, -1),
            other => panic!("expected Def, got {other:?}"),
        }
        assert_eq!(decode_program(&acir).unwrap(), stmts);
    }

    #[test]
    fn object_literal_and_spread_round_trip() {
        let stmts = parse(json!([
            {"print": [1, {"spread": {"list": [2, 3]}}]},
            {"expr": {"a": 1, "b": {"var": "a"}}}
        ]));
        let acir = encode_program(&stmts);
        assert_eq!(decode_program(&acir).unwrap(), stmts);
    }

    #[test]
    fn pack_unpack_binary_round_trips() {
        let stmts = parse(json!([{"return": {"range": [7, 3]}}]));
        let bytes = pack(&stmts, None).unwrap();
        let back = unpack(&bytes, None).unwrap();
        assert_eq!(back, stmts);
    }

    #[test]
    fn pack_unpack_json_round_trips() {
        let stmts = parse(json!([{"return": {"lt": [1, 2, 3]}}]));
        let bytes = pack(&stmts, Some(WireFormat::Json)).unwrap();
        let back = unpack(&bytes, Some(WireFormat::Json)).unwrap();
        assert_eq!(back, stmts);
        // minified: no whitespace in the JSON form.
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains(' ') && !text.contains('\n'));
    }

    #[test]
    fn unpack_sniffs_format_when_unspecified() {
        let stmts = parse(json!([{"return": 1}]));
        let json_bytes = pack(&stmts, Some(WireFormat::Json)).unwrap();
        let binary_bytes = pack(&stmts, Some(WireFormat::Binary)).unwrap();
        assert_eq!(unpack(&json_bytes, None).unwrap(), stmts);
        assert_eq!(unpack(&binary_bytes, None).unwrap(), stmts);
    }

    #[test]
    fn decode_rejects_out_of_range_symbol_index() {
        let acir = AcirProgram {
            strings: vec!["x".to_string()],
            statements: vec![AcirStmt::Return(AcirExpr::Var(5), None)],
        };
        let err = decode_program(&acir).unwrap_err();
        assert_eq!(err.code(), "E_ACIR_BAD_SYMBOL");
    }
}
