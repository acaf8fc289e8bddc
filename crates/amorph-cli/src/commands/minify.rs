//! `amorph minify`/`unminify FILE` — the short-key textual transform.

use std::path::PathBuf;

use amorph::format;
use clap::Args;

use crate::util::{read_json_file, write_output};

#[derive(Args, Debug)]
pub struct MinifyArgs {
    pub file: PathBuf,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn minify(args: &MinifyArgs) -> Result<(), String> {
    let raw = read_json_file(&args.file)?;
    let bytes = format::minify(&raw);
    write_output(args.output.as_deref(), &bytes)
}

pub fn unminify(args: &MinifyArgs) -> Result<(), String> {
    let raw = crate::util::read_bytes_file(&args.file)?;
    let restored = format::unminify(&raw).map_err(|e| format!("error parsing {}: {e}", args.file.display()))?;
    let out = format::to_canonical(&restored);
    write_output(args.output.as_deref(), out.as_bytes())
}
