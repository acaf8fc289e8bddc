//! Property-style checks for the round-trip/determinism invariants
//! named as testable properties: validation determinism, trace
//! transparency, ACIR and minify round-trips, UID-assignment
//! idempotency, post-edit re-validation cleanliness, and the
//! `migrate_calls` id/name round trip.

use amorph::acir;
use amorph::capability::Capabilities;
use amorph::edit;
use amorph::evaluator::Evaluator;
use amorph::format;
use amorph::io::BufferedStdio;
use amorph::program::Stmt;
use amorph::tracer::NoopTracer;
use amorph::uid::{self, Depth};
use amorph::validator::{self, ValidateOptions};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn sample_program() -> Value {
    json!([
        {"let": {"name": "x", "value": {"add": [1, 2]}}},
        {"def": {"name": "double", "params": ["n"], "body": [
            {"return": {"mul": [{"var": "n"}, 2]}}
        ]}},
        {"print": {"call": {"name": "double", "args": [{"var": "x"}]}}},
        {"return": {"var": "x"}}
    ])
}

#[test]
fn validate_is_deterministic() {
    let program = sample_program();
    let opts = ValidateOptions::default();
    let first = validator::validate_report(&program, &opts);
    let second = validator::validate_report(&program, &opts);
    assert_eq!(first, second);
}

#[test]
fn trace_enabled_or_not_does_not_change_the_result() {
    let stmts = Stmt::list_from_json(sample_program().as_array().unwrap(), "$").unwrap();

    let mut stdio_plain = BufferedStdio::default();
    let without_trace = Evaluator::new(Capabilities::unrestricted(), &mut stdio_plain).run(&stmts).unwrap();

    let tracer = NoopTracer;
    let mut stdio_traced = BufferedStdio::default();
    let with_trace = Evaluator::new(Capabilities::unrestricted(), &mut stdio_traced)
        .with_tracer(&tracer)
        .run(&stmts)
        .unwrap();

    assert_eq!(without_trace, with_trace);
    assert_eq!(stdio_plain.output, stdio_traced.output);
}

#[test]
fn acir_decode_of_encode_is_deep_equal() {
    let stmts = Stmt::list_from_json(sample_program().as_array().unwrap(), "$").unwrap();
    let encoded = acir::encode_program(&stmts);
    let decoded = acir::decode_program(&encoded).unwrap();
    assert_eq!(decoded, stmts);
}

#[test]
fn acir_pack_and_unpack_round_trip_both_wire_formats() {
    let stmts = Stmt::list_from_json(sample_program().as_array().unwrap(), "$").unwrap();
    for format in [None, Some(acir::WireFormat::Binary), Some(acir::WireFormat::Json)] {
        let bytes = acir::pack(&stmts, format).unwrap();
        let decoded = acir::unpack(&bytes, format).unwrap();
        assert_eq!(decoded, stmts);
    }
}

#[test]
fn unminify_of_minify_is_the_identity() {
    let program = sample_program();
    let minified = format::minify(&program);
    let restored = format::unminify(&minified).unwrap();
    assert_eq!(restored, program);
}

#[test]
fn deep_uid_assignment_is_idempotent_and_total() {
    let mut stmts = sample_program().as_array().unwrap().clone();
    let first_pass = uid::assign_uids(&mut stmts, Depth::Deep);
    assert!(first_pass > 0);
    assert!(uid::all_assigned(&stmts, Depth::Deep));

    let second_pass = uid::assign_uids(&mut stmts, Depth::Deep);
    assert_eq!(second_pass, 0, "a second deep pass should assign nothing new");
}

#[test]
fn successful_edit_leaves_the_program_error_free() {
    let mut program = sample_program().as_array().unwrap().clone();
    let edits = vec![json!({"op": "rename_function", "from": "double", "to": "twice"})];
    edit::apply_edits(&mut program, &edits).unwrap();

    let as_value = Value::Array(program);
    let issues = validator::validate_report(&as_value, &ValidateOptions::default());
    assert!(
        issues.iter().all(|i| i.severity != validator::Severity::Error),
        "post-edit program should still validate cleanly: {issues:?}"
    );
}

#[test]
fn migrate_calls_id_then_name_reproduces_the_original_program() {
    let original = vec![
        json!({"def": {"name": "f", "id": "fn_aaaaaaaa", "params": [], "body": []}}),
        json!({"def": {"name": "g", "id": "fn_bbbbbbbb", "params": [], "body": []}}),
        json!({"expr": {"call": {"name": "f", "args": []}}}),
        json!({"expr": {"call": {"name": "g", "args": []}}}),
    ];
    let mut program = original.clone();
    edit::migrate_calls(&mut program, "id").unwrap();
    assert_ne!(program, original, "id migration should have changed something");
    edit::migrate_calls(&mut program, "name").unwrap();
    assert_eq!(program, original);
}
