//! `amorph validate FILE` — structural, scope, and advisory type checks.

use std::path::PathBuf;

use amorph::validator::{self, Severity, ValidateOptions, ValidationIssue};
use clap::Args;

use crate::util::read_json_file;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    pub file: PathBuf,

    /// Emit the full issue list as JSON instead of stopping at the first error.
    #[arg(long)]
    pub json: bool,

    /// Also run the scope analyzer (`E_UNDEFINED_VAR`, `W_VARIABLE_SHADOW`).
    #[arg(long)]
    pub check_scopes: bool,

    /// Also run the advisory type checker (`E_TYPE_MISMATCH`, warning-only).
    #[arg(long)]
    pub check_types: bool,

    /// Emit `W_PREFER_ID` for unambiguous name-based calls.
    #[arg(long)]
    pub prefer_id: bool,
}

fn issue_to_json(issue: &ValidationIssue) -> serde_json::Value {
    serde_json::json!({
        "code": issue.code,
        "message": issue.message,
        "path": issue.path,
        "severity": match issue.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        },
        "hint": issue.hint,
    })
}

/// `Ok(true)` if validation passed (no errors), `Ok(false)` if it failed
/// with reported issues, `Err` for an I/O-level failure before
/// validation could even run.
pub fn run(args: &ValidateArgs) -> Result<bool, String> {
    let program = read_json_file(&args.file)?;

    if !args.json {
        match validator::validate_fail_fast(&program) {
            Ok(()) => {
                println!("ok");
                return Ok(true);
            }
            Err(issue) => {
                eprintln!("{}: {} (at {})", issue.code, issue.message, issue.path);
                return Ok(false);
            }
        }
    }

    let opts = ValidateOptions { prefer_id: args.prefer_id };
    let mut issues = validator::validate_report(&program, &opts);
    if args.check_scopes {
        issues.extend(validator::analyze_scopes(&program));
    }
    if args.check_types {
        issues.extend(amorph::types_check::check_types(&program));
    }

    let passed = !issues.iter().any(|i| i.severity == Severity::Error);
    let report = serde_json::json!({
        "passed": passed,
        "issues": issues.iter().map(issue_to_json).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
    Ok(passed)
}
