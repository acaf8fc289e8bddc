//! `amorph` — the command-line surface over the `amorph` library.
//! A thin collaborator: it parses arguments, calls into the
//! library's public functions, and maps the result onto the exit-code
//! contract — `0` on success, `1` on a recoverable error (including a
//! failed `validate`), `2` when a `rewrite` run exceeds its change cap.

mod commands;
mod util;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::{add_uid, bench, edit, fmt, migrate_calls, minify, pack, rewrite, run, suggest, validate};

#[derive(Parser, Debug)]
#[command(name = "amorph", about = "Interpreter and program-manipulation toolkit for a small JSON-encoded imperative language")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a program.
    Run(run::RunArgs),
    /// Check a program's shape, calls, and (optionally) scopes/types.
    Validate(validate::ValidateArgs),
    /// Assign missing statement/function ids.
    AddUid(add_uid::AddUidArgs),
    /// Apply a declarative batch of edits.
    Edit(edit::EditArgs),
    /// Rewrite a program into canonical form.
    Fmt(fmt::FmtArgs),
    /// Substitute short key aliases for a compact textual form.
    Minify(minify::MinifyArgs),
    /// Invert `minify`.
    Unminify(minify::MinifyArgs),
    /// Apply pattern/replace rules to every statement.
    Rewrite(rewrite::RewriteArgs),
    /// Convert call sites between name-based and id-based addressing.
    MigrateCalls(migrate_calls::MigrateCallsArgs),
    /// Encode a program as ACIR (binary by default).
    Pack(pack::PackArgs),
    /// Decode ACIR bytes back into a program.
    Unpack(pack::UnpackArgs),
    /// Report size/structure/timing metrics for one or more programs.
    Bench(bench::BenchArgs),
    /// Report non-binding edit suggestions.
    Suggest(suggest::SuggestArgs),
}

fn report(result: Result<(), String>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(1)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => report(run::run(&args)),
        Command::Validate(args) => match validate::run(&args) {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::from(1),
            Err(msg) => {
                eprintln!("error: {msg}");
                ExitCode::from(1)
            }
        },
        Command::AddUid(args) => report(add_uid::run(&args)),
        Command::Edit(args) => report(edit::run(&args)),
        Command::Fmt(args) => report(fmt::run(&args)),
        Command::Minify(args) => report(minify::minify(&args)),
        Command::Unminify(args) => report(minify::unminify(&args)),
        Command::Rewrite(args) => match rewrite::run(&args) {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::from(2),
            Err(msg) => {
                eprintln!("error: {msg}");
                ExitCode::from(1)
            }
        },
        Command::MigrateCalls(args) => report(migrate_calls::run(&args)),
        Command::Pack(args) => report(pack::pack(&args)),
        Command::Unpack(args) => report(pack::unpack(&args)),
        Command::Bench(args) => report(bench::run(&args)),
        Command::Suggest(args) => report(suggest::run(&args)),
    }
}
