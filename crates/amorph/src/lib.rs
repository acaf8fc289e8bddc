//! amorph — an interpreter and program-manipulation toolkit for a small
//! JSON-encoded imperative language.
//!
//! Programs are plain `serde_json::Value` data at the wire boundary
//! (parsing, formatting, the pattern/rewrite and edit engines all work
//! directly on JSON) and a typed [`program::Stmt`]/[`program::Expr`]
//! tree once they're ready to run or be statically checked. See
//! [`program`] for the shape, [`evaluator`] for execution, and
//! [`validator`] for the structural/scope checks the CLI's `validate`
//! subcommand exposes.

pub mod acir;
pub mod capability;
pub mod edit;
pub mod error;
pub mod evaluator;
pub mod format;
pub mod frame;
pub mod function;
pub mod io;
pub mod op_registry;
pub mod pattern;
pub mod program;
pub mod tracer;
pub mod types_check;
pub mod uid;
pub mod validator;

use serde_json::Value;

use error::ProgramError;
use program::Stmt;

/// Unwrap a program's outer JSON shape: either a bare array of
/// statements, or a `{"program": [...]}` (optionally `{"version": ...,
/// "program": [...]}`) wrapper. Returns the statement array as JSON,
/// unparsed.
pub fn program_statements(v: &Value) -> Result<&[Value], ProgramError> {
    match v {
        Value::Array(items) => Ok(items),
        Value::Object(obj) => obj
            .get("program")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or(ProgramError::NotAList),
        _ => Err(ProgramError::NotAList),
    }
}

/// Parse a program's raw JSON into the typed statement tree.
pub fn parse_program(v: &Value) -> Result<Vec<Stmt>, ProgramError> {
    let stmts = program_statements(v)?;
    Stmt::list_from_json(stmts, "$")
}

/// Re-encode a typed statement tree back into its bare-array JSON form.
#[must_use]
pub fn program_to_json(stmts: &[Stmt]) -> Value {
    Value::Array(stmts.iter().map(Stmt::to_json).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_bare_array_and_wrapper_shapes() {
        let bare = json!([{"print": {"value": 1}}]);
        let wrapped = json!({"version": 1, "program": [{"print": {"value": 1}}]});
        assert_eq!(program_statements(&bare).unwrap().len(), 1);
        assert_eq!(program_statements(&wrapped).unwrap().len(), 1);
    }

    #[test]
    fn rejects_non_list_non_wrapper() {
        assert!(program_statements(&json!({"nope": true})).is_err());
        assert!(program_statements(&json!("nope")).is_err());
    }

    #[test]
    fn parse_then_reencode_round_trips() {
        let src = json!([{"let": {"name": "x", "value": 1}}, {"return": {"var": "x"}}]);
        let stmts = parse_program(&src).unwrap();
        assert_eq!(program_to_json(&stmts), src);
    }
}
