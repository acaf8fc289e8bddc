//! Concrete end-to-end scenarios run through the public `amorph` API:
//! parse → evaluate (or encode/decode), checked against exact expected
//! values rather than round-trip grids.

use amorph::acir;
use amorph::capability::Capabilities;
use amorph::evaluator::Evaluator;
use amorph::io::BufferedStdio;
use amorph::program::Stmt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn run_program(src: Value) -> Value {
    let stmts = amorph::parse_program(&src).expect("program should decode");
    let mut stdio = BufferedStdio::default();
    let mut evaluator = Evaluator::new(Capabilities::unrestricted(), &mut stdio);
    evaluator.run(&stmts).expect("program should run")
}

#[test]
fn arithmetic_returns_three() {
    let src = json!([
        {"let": {"name": "x", "value": {"add": [1, 2]}}},
        {"return": {"var": "x"}}
    ]);
    assert_eq!(run_program(src), json!(3));
}

#[test]
fn recursive_factorial_of_five_is_120() {
    let src = json!([
        {"def": {"name": "fact", "params": ["n"], "body": [
            {"if": {"cond": {"le": [{"var": "n"}, 1]},
                    "then": [{"return": 1}],
                    "else": [{"return": {"mul": [
                       {"var": "n"},
                       {"call": {"name": "fact", "args": [{"sub": [{"var": "n"}, 1]}]}}
                    ]}}]}}
        ]}},
        {"return": {"call": {"name": "fact", "args": [5]}}}
    ]);
    assert_eq!(run_program(src), json!(120));
}

#[test]
fn chained_comparison_lt_is_true_only_when_strictly_increasing() {
    assert_eq!(run_program(json!([{"return": {"lt": [1, 2, 3]}}])), json!(true));
    assert_eq!(run_program(json!([{"return": {"lt": [1, 3, 2]}}])), json!(false));
}

#[test]
fn range_variants() {
    assert_eq!(run_program(json!([{"return": {"range": 5}}])), json!([1, 2, 3, 4, 5]));
    assert_eq!(run_program(json!([{"return": {"range": [7, 3]}}])), json!([7, 6, 5, 4, 3]));
    assert_eq!(run_program(json!([{"return": {"range": 0}}])), json!([]));
}

#[test]
fn rename_function_by_id_changes_def_and_both_name_based_calls_only() {
    let mut program = vec![
        json!({"def": {"name": "f", "id": "fn_1", "params": [], "body": []}}),
        json!({"expr": {"call": {"name": "f", "args": []}}}),
        json!({"expr": {"call": {"name": "f", "args": []}}}),
        json!({"expr": {"call": {"id": "fn_1", "args": []}}}),
    ];
    let edits = vec![json!({"op": "rename_function", "id": "fn_1", "to": "g"})];
    let report = amorph::edit::apply_edits(&mut program, &edits).expect("rename should succeed");
    assert_eq!(report.details[0]["changed"], json!(3));
    assert_eq!(program[0]["def"]["name"], "g");
    assert_eq!(program[1]["expr"]["call"]["name"], "g");
    assert_eq!(program[2]["expr"]["call"]["name"], "g");
    // the id-based call is untouched structurally
    assert_eq!(program[3], json!({"expr": {"call": {"id": "fn_1", "args": []}}}));
}

fn parse(v: &Value) -> Vec<Stmt> {
    Stmt::list_from_json(v.as_array().unwrap(), "$").unwrap()
}

#[test]
fn acir_round_trips_scenarios_one_through_three() {
    let scenarios = [
        json!([{"let": {"name": "x", "value": {"add": [1, 2]}}}, {"return": {"var": "x"}}]),
        json!([
            {"def": {"name": "fact", "params": ["n"], "body": [
                {"if": {"cond": {"le": [{"var": "n"}, 1]},
                        "then": [{"return": 1}],
                        "else": [{"return": {"mul": [
                           {"var": "n"},
                           {"call": {"name": "fact", "args": [{"sub": [{"var": "n"}, 1]}]}}
                        ]}}]}}
            ]}},
            {"return": {"call": {"name": "fact", "args": [5]}}}
        ]),
        json!([{"return": {"lt": [1, 2, 3]}}]),
    ];
    for src in scenarios {
        let stmts = parse(&src);
        let acir = acir::encode_program(&stmts);
        let decoded = acir::decode_program(&acir).expect("decode should succeed");
        assert_eq!(decoded, stmts);
    }
}
