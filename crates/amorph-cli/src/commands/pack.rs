//! `amorph pack`/`unpack FILE` — the ACIR binary/JSON wire codec.

use std::path::PathBuf;

use amorph::acir::{self, WireFormat};
use amorph::format::to_canonical;
use clap::{Args, ValueEnum};

use crate::util::{read_bytes_file, read_json_file, write_output};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Format {
    Binary,
    Json,
}

impl From<Format> for WireFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Binary => Self::Binary,
            Format::Json => Self::Json,
        }
    }
}

#[derive(Args, Debug)]
pub struct PackArgs {
    pub file: PathBuf,

    /// Defaults to binary (postcard) when omitted.
    #[arg(long, value_enum)]
    pub format: Option<Format>,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct UnpackArgs {
    pub file: PathBuf,

    /// Sniffs (postcard, then JSON) when omitted.
    #[arg(long, value_enum)]
    pub format: Option<Format>,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn pack(args: &PackArgs) -> Result<(), String> {
    let raw = read_json_file(&args.file)?;
    let stmts = amorph::parse_program(&raw).map_err(|e| format!("{e}"))?;
    let bytes = acir::pack(&stmts, args.format.map(Into::into)).map_err(|e| format!("{}: {e}", e.code()))?;
    write_output(args.output.as_deref(), &bytes)
}

pub fn unpack(args: &UnpackArgs) -> Result<(), String> {
    let bytes = read_bytes_file(&args.file)?;
    let stmts = acir::unpack(&bytes, args.format.map(Into::into)).map_err(|e| format!("{}: {e}", e.code()))?;
    let out = to_canonical(&amorph::program_to_json(&stmts));
    write_output(args.output.as_deref(), out.as_bytes())
}
