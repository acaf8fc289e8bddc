//! `amorph rewrite FILE --rules RULES_FILE` — declarative pattern rewriting.

use std::path::PathBuf;

use amorph::format::to_canonical;
use amorph::pattern;
use clap::Args;

use crate::util::{read_json_file, write_output};

#[derive(Args, Debug)]
pub struct RewriteArgs {
    pub file: PathBuf,

    /// JSON file holding the array of `{match, replace, ...}` rules.
    #[arg(long)]
    pub rules: PathBuf,

    /// Write the result here instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Fail (exit 2) if more than this many replacements are made in one run.
    #[arg(long)]
    pub max_changes: Option<usize>,
}

/// `Ok(true)` if the run stayed within `max_changes` (or none was set),
/// `Ok(false)` if it exceeded the cap.
pub fn run(args: &RewriteArgs) -> Result<bool, String> {
    let raw = read_json_file(&args.file)?;
    let mut stmts = amorph::program_statements(&raw).map_err(|e| format!("{e}"))?.to_vec();

    let rules_raw = read_json_file(&args.rules)?;
    let rules = rules_raw
        .as_array()
        .ok_or_else(|| "rules file must hold a JSON array".to_string())?
        .clone();

    let changed = pattern::apply_rewrite(&mut stmts, &rules);
    eprintln!("{changed} replacement(s) made");

    let out = to_canonical(&serde_json::Value::Array(stmts));
    write_output(args.output.as_deref(), out.as_bytes())?;

    Ok(args.max_changes.is_none_or(|cap| changed <= cap))
}
