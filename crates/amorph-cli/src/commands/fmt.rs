//! `amorph fmt FILE` — rewrite a program into canonical form.

use std::path::PathBuf;

use amorph::format::to_canonical;
use clap::Args;

use crate::util::{read_json_file, write_output};

#[derive(Args, Debug)]
pub struct FmtArgs {
    pub file: PathBuf,

    /// Write the result here instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &FmtArgs) -> Result<(), String> {
    let raw = read_json_file(&args.file)?;
    let out = to_canonical(&raw);
    write_output(args.output.as_deref(), out.as_bytes())
}
