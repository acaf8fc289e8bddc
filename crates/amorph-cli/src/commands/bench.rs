//! `amorph bench [PATHS...]` — size/structure/timing report.
//!
//! A heuristic collaborator, not core engine surface: reports canonical
//! vs. minified byte sizes, structural counts, and `validate`/`run`
//! wall-clock time per file, skipping the `run` timing for any program
//! that uses `input` (since that would block on stdin).

use std::path::{Path, PathBuf};
use std::time::Instant;

use amorph::capability::Capabilities;
use amorph::evaluator::Evaluator;
use amorph::io::BufferedStdio;
use amorph::validator::{self, ValidateOptions};
use clap::Args;
use serde_json::Value;

use crate::util::read_json_file;

#[derive(Args, Debug)]
pub struct BenchArgs {
    /// Files or directories to scan (recursively, for `*.json`). Defaults to `.`.
    pub paths: Vec<PathBuf>,
}

fn find_program_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let roots: Vec<PathBuf> = if paths.is_empty() { vec![PathBuf::from(".")] } else { paths.to_vec() };
    let mut out = Vec::new();
    for root in roots {
        collect(&root, &mut out);
    }
    out.sort_by_key(|p| (!p.to_string_lossy().ends_with(".amr.json"), p.clone()));
    out
}

fn collect(path: &Path, out: &mut Vec<PathBuf>) {
    if path.is_dir() {
        let Ok(entries) = std::fs::read_dir(path) else { return };
        for entry in entries.flatten() {
            collect(&entry.path(), out);
        }
    } else if path.extension().is_some_and(|ext| ext == "json") {
        out.push(path.to_path_buf());
    }
}

fn contains_input(node: &Value) -> bool {
    match node {
        Value::Array(items) => items.iter().any(contains_input),
        Value::Object(obj) => {
            if obj.len() == 1 && obj.contains_key("input") {
                return true;
            }
            obj.values().any(contains_input)
        }
        _ => false,
    }
}

fn structural_counts(stmts: &[Value]) -> Value {
    let mut funcs = 0;
    let mut uid_stmt = 0;
    let mut uid_fn = 0;
    for stmt in stmts {
        let Some(obj) = stmt.as_object() else { continue };
        if obj.contains_key("id") {
            uid_stmt += 1;
        }
        if let Some(def) = obj.get("def").and_then(Value::as_object) {
            funcs += 1;
            if def.contains_key("id") {
                uid_fn += 1;
            }
        }
    }
    serde_json::json!({
        "stmts_top": stmts.len(),
        "func_count": funcs,
        "uid_stmt_count": uid_stmt,
        "uid_fn_count": uid_fn,
    })
}

fn bench_file(path: &Path) -> Value {
    let Ok(raw) = read_json_file(path) else {
        return serde_json::json!({"path": path.display().to_string(), "error": "unreadable"});
    };
    let Ok(stmts) = amorph::program_statements(&raw) else {
        return serde_json::json!({"path": path.display().to_string(), "error": "bad program shape"});
    };

    let canon_bytes = amorph::format::to_canonical(&raw).len();
    let min_bytes = amorph::format::minify(&raw).len();
    let has_input = contains_input(&raw);

    let t0 = Instant::now();
    let _ = validator::validate_report(&raw, &ValidateOptions::default());
    let validate_ms = t0.elapsed().as_secs_f64() * 1000.0;

    let run_ms = if has_input {
        None
    } else if let Ok(typed) = amorph::parse_program(&raw) {
        let mut stdio = BufferedStdio::default();
        let mut evaluator = Evaluator::new(Capabilities::unrestricted(), &mut stdio);
        let t1 = Instant::now();
        let ran = evaluator.run(&typed);
        let ms = t1.elapsed().as_secs_f64() * 1000.0;
        ran.ok().map(|_| ms)
    } else {
        None
    };

    let mut result = serde_json::json!({
        "path": path.display().to_string(),
        "size_bytes_canonical": canon_bytes,
        "size_bytes_minified": min_bytes,
        "ratio_min_over_canon": if canon_bytes > 0 { min_bytes as f64 / canon_bytes as f64 } else { 0.0 },
        "has_input": has_input,
        "validate_ms": validate_ms,
    });
    if let Value::Object(ref mut obj) = result {
        if let Value::Object(counts) = structural_counts(stmts) {
            obj.extend(counts);
        }
        obj.insert("run_ms".to_string(), run_ms.map_or(Value::Null, |v| serde_json::json!(v)));
    }
    result
}

pub fn run(args: &BenchArgs) -> Result<(), String> {
    let files = find_program_files(&args.paths);
    let results: Vec<Value> = files.iter().map(|f| bench_file(f)).collect();

    let canon_ratios: Vec<f64> = results
        .iter()
        .filter_map(|r| r.get("ratio_min_over_canon").and_then(Value::as_f64))
        .collect();
    let validate_times: Vec<f64> = results.iter().filter_map(|r| r.get("validate_ms").and_then(Value::as_f64)).collect();
    let run_times: Vec<f64> = results
        .iter()
        .filter_map(|r| r.get("run_ms").and_then(Value::as_f64))
        .collect();

    let avg = |xs: &[f64]| if xs.is_empty() { 0.0 } else { xs.iter().sum::<f64>() / xs.len() as f64 };

    let report = serde_json::json!({
        "aggregate": {
            "files": results.len(),
            "avg_ratio": avg(&canon_ratios),
            "avg_validate_ms": avg(&validate_times),
            "avg_run_ms": if run_times.is_empty() { Value::Null } else { serde_json::json!(avg(&run_times)) },
        },
        "results": results,
    });
    println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_input_only_through_single_key_operator_objects() {
        assert!(contains_input(&json!({"input": "prompt"})));
        assert!(contains_input(&json!([{"let": {"name": "x", "value": {"input": null}}}])));
        assert!(!contains_input(&json!({"call": {"name": "input", "args": []}})));
    }

    #[test]
    fn structural_counts_tally_ids_and_defs() {
        let stmts = vec![
            json!({"id": "amr_aaaaaaaa", "let": {"name": "x", "value": 1}}),
            json!({"def": {"name": "f", "id": "fn_aaaaaaaa", "params": [], "body": []}}),
            json!({"def": {"name": "g", "params": [], "body": []}}),
        ];
        let counts = structural_counts(&stmts);
        assert_eq!(counts["stmts_top"], 3);
        assert_eq!(counts["func_count"], 2);
        assert_eq!(counts["uid_stmt_count"], 1);
        assert_eq!(counts["uid_fn_count"], 1);
    }
}
