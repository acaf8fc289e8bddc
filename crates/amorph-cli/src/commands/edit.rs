//! `amorph edit FILE --edits EDITS_FILE` — apply a declarative edit batch.

use std::path::PathBuf;

use amorph::edit;
use amorph::format::to_canonical;
use clap::Args;

use crate::util::{read_json_file, write_output};

#[derive(Args, Debug)]
pub struct EditArgs {
    pub file: PathBuf,

    /// JSON file holding the array of `{op, ...}` edit specs.
    #[arg(long)]
    pub edits: PathBuf,

    /// Write the result here instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &EditArgs) -> Result<(), String> {
    let raw = read_json_file(&args.file)?;
    let mut stmts = amorph::program_statements(&raw).map_err(|e| format!("{e}"))?.to_vec();

    let edits_raw = read_json_file(&args.edits)?;
    let edits = edits_raw
        .as_array()
        .ok_or_else(|| "edits file must hold a JSON array".to_string())?
        .clone();

    let report = edit::apply_edits(&mut stmts, &edits).map_err(|e| format!("{}: {e}", e.code()))?;
    eprintln!("applied {} edit(s)", report.applied);

    let out = to_canonical(&serde_json::Value::Array(stmts));
    write_output(args.output.as_deref(), out.as_bytes())
}
