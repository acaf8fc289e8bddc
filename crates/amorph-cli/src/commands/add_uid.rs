//! `amorph add-uid FILE` — assign `amr_`/`fn_` ids to statements lacking one.

use std::path::PathBuf;

use amorph::format::to_canonical;
use amorph::uid::{self, Depth};
use clap::Args;

use crate::util::{read_json_file, write_output};

#[derive(Args, Debug)]
pub struct AddUidArgs {
    pub file: PathBuf,

    /// Recurse into `then`/`else`/`def.body` instead of only top-level statements.
    #[arg(long)]
    pub deep: bool,

    /// Write the result here instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &AddUidArgs) -> Result<(), String> {
    let raw = read_json_file(&args.file)?;
    let mut stmts = amorph::program_statements(&raw).map_err(|e| format!("{e}"))?.to_vec();

    let depth = if args.deep { Depth::Deep } else { Depth::Shallow };
    let assigned = uid::assign_uids(&mut stmts, depth);
    eprintln!("assigned {assigned} id(s)");

    let out = to_canonical(&serde_json::Value::Array(stmts));
    write_output(args.output.as_deref(), out.as_bytes())
}
