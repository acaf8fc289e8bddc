//! `amorph run FILE` — execute a program against real stdio.

use std::path::PathBuf;

use amorph::capability::Capabilities;
use amorph::evaluator::Evaluator;
use amorph::io::StdStdio;
use amorph::tracer::StderrTracer;
use clap::Args;

use crate::util::read_json_file;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Program file (JSON array or `{program: [...]}` wrapper).
    pub file: PathBuf,

    /// Deny the `print` effect.
    #[arg(long)]
    pub no_print: bool,

    /// Deny the `input` effect.
    #[arg(long)]
    pub no_input: bool,

    /// Emit a trace event per statement/call to stderr.
    #[arg(long)]
    pub trace: bool,

    /// Override the recursion-depth ceiling (default 1000).
    #[arg(long)]
    pub max_call_depth: Option<usize>,
}

pub fn run(args: &RunArgs) -> Result<(), String> {
    let raw = read_json_file(&args.file)?;
    let stmts = amorph::parse_program(&raw).map_err(|e| format!("{e}"))?;

    let capabilities = Capabilities {
        allow_print: !args.no_print,
        allow_input: !args.no_input,
    };
    let tracer = StderrTracer;
    let mut stdio = StdStdio;
    let mut evaluator = Evaluator::new(capabilities, &mut stdio);
    if args.trace {
        evaluator = evaluator.with_tracer(&tracer);
    }
    if let Some(max) = args.max_call_depth {
        evaluator = evaluator.with_max_call_depth(max);
    }

    // The evaluator always yields its result, including `Null` for a
    // program that falls off the end without returning; only a non-null
    // result is worth printing.
    let value = evaluator.run(&stmts).map_err(|e| format!("{e}"))?;
    if !value.is_null() {
        println!("{value}");
    }
    Ok(())
}
