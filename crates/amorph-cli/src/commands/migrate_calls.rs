//! `amorph migrate-calls FILE --to id|name` — bulk call-style conversion.

use std::path::PathBuf;

use amorph::edit;
use amorph::format::to_canonical;
use clap::{Args, ValueEnum};

use crate::util::{read_json_file, write_output};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CallStyle {
    Id,
    Name,
}

#[derive(Args, Debug)]
pub struct MigrateCallsArgs {
    pub file: PathBuf,

    #[arg(long, value_enum)]
    pub to: CallStyle,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &MigrateCallsArgs) -> Result<(), String> {
    let raw = read_json_file(&args.file)?;
    let mut stmts = amorph::program_statements(&raw).map_err(|e| format!("{e}"))?.to_vec();

    let to = match args.to {
        CallStyle::Id => "id",
        CallStyle::Name => "name",
    };
    let changed = edit::migrate_calls(&mut stmts, to).map_err(|e| format!("{}: {e}", e.code()))?;
    eprintln!("migrated {changed} call site(s) to {to}");

    let out = to_canonical(&serde_json::Value::Array(stmts));
    write_output(args.output.as_deref(), out.as_bytes())
}
