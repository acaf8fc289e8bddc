//! Pattern matching and declarative rewriting.
//!
//! Patterns are ordinary JSON values with two kinds of holes: a
//! placeholder string (`"$name"`) binds exactly one subtree, and a star
//! placeholder (`"$*name"`), valid only as the sole element of a list
//! pattern, binds the entire list. [`rewrite_program`] applies a set of
//! `{match, replace, ...}` rules to every statement, in document order,
//! first-match-wins, without re-scanning a freshly substituted subtree.
//!
//! Rule predicates (`apply_to`, `where`, `where_placeholders`,
//! `program_where`) are JMESPath query strings, evaluated with the
//! `jmespath` crate. They are advisory: a predicate that fails to
//! compile or to evaluate simply causes its rule to be skipped for that
//! node, rather than aborting the rewrite.

use serde_json::Value;

/// True if `s` is a placeholder (`$name`, length > 1).
#[must_use]
pub fn is_placeholder(s: &str) -> bool {
    s.len() > 1 && s.starts_with('$')
}

/// True if `s` is a star placeholder (`$*name`, length > 2).
#[must_use]
pub fn is_star_placeholder(s: &str) -> bool {
    s.len() > 2 && s.starts_with("$*")
}

fn as_placeholder(v: &Value) -> Option<&str> {
    v.as_str().filter(|s| is_placeholder(s))
}

fn as_star_placeholder(v: &Value) -> Option<&str> {
    v.as_str().filter(|s| is_star_placeholder(s))
}

/// Bindings captured while matching a pattern against a node.
pub type Bindings = indexmap::IndexMap<String, Value>;

/// Attempt to match `node` against `pattern`, recording placeholder
/// bindings into `env`. A placeholder seen a second time must match a
/// structurally identical subtree to the one it was first bound to.
#[must_use]
pub fn match_pattern(node: &Value, pattern: &Value, env: &mut Bindings) -> bool {
    if let Some(name) = as_placeholder(pattern) {
        let key = &name[1..];
        if let Some(bound) = env.get(key) {
            return bound == node;
        }
        env.insert(key.to_string(), node.clone());
        return true;
    }

    match (pattern, node) {
        (Value::Array(pat_items), Value::Array(node_items)) => {
            if let [single] = pat_items.as_slice() {
                if let Some(name) = as_star_placeholder(single) {
                    let key = &name[2..];
                    if let Some(bound) = env.get(key) {
                        return bound.as_array().map(Vec::as_slice) == Some(node_items.as_slice());
                    }
                    env.insert(key.to_string(), Value::Array(node_items.clone()));
                    return true;
                }
            }
            pat_items.len() == node_items.len()
                && pat_items
                    .iter()
                    .zip(node_items.iter())
                    .all(|(p, n)| match_pattern(n, p, env))
        }
        (Value::Array(_), _) => false,
        (Value::Object(pat_obj), Value::Object(node_obj)) => pat_obj
            .iter()
            .all(|(k, v)| node_obj.get(k).is_some_and(|nv| match_pattern(nv, v, env))),
        (Value::Object(_), _) => false,
        (scalar_pattern, node) => scalar_pattern == node,
    }
}

/// Instantiate a replacement template, substituting bound placeholders
/// and splicing star-placeholder lists into their containing list.
#[must_use]
pub fn substitute(template: &Value, env: &Bindings) -> Value {
    if let Some(name) = as_placeholder(template) {
        let key = &name[1..];
        return env.get(key).cloned().unwrap_or(Value::Null);
    }
    match template {
        Value::Array(items) => {
            let mut out = Vec::new();
            for item in items {
                if let Some(name) = as_star_placeholder(item) {
                    let key = &name[2..];
                    match env.get(key) {
                        Some(Value::Array(vals)) => out.extend(vals.iter().cloned()),
                        Some(other) => out.push(other.clone()),
                        None => {}
                    }
                } else {
                    out.push(substitute(item, env));
                }
            }
            Value::Array(out)
        }
        Value::Object(obj) => {
            let mut out = serde_json::Map::new();
            for (k, v) in obj {
                out.insert(k.clone(), substitute(v, env));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// A single rewrite rule, as found in a rules JSON array.
#[derive(Debug, Clone)]
pub struct Rule<'a> {
    pub value: &'a Value,
}

impl<'a> Rule<'a> {
    fn obj(&self) -> Option<&'a serde_json::Map<String, Value>> {
        self.value.as_object()
    }

    fn field(&self, name: &str) -> Option<&'a Value> {
        self.obj().and_then(|o| o.get(name))
    }

    fn match_pat(&self) -> Option<&'a Value> {
        self.field("match")
    }

    fn replace_tpl(&self) -> Option<&'a Value> {
        self.field("replace")
    }
}

/// One or more JMESPath query strings, evaluated with OR-of-failure
/// short-circuiting (all must be truthy for the rule to apply).
fn queries(v: &Value) -> Vec<&str> {
    match v {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn jmespath_truthy(expr: &str, data: &Value) -> bool {
    let Ok(compiled) = jmespath::compile(expr) else {
        return false;
    };
    match compiled.search(data.clone()) {
        Ok(var) => var.is_truthy(),
        Err(_) => false,
    }
}

fn all_queries_truthy(v: &Value, data: &Value) -> bool {
    queries(v).into_iter().all(|q| jmespath_truthy(q, data))
}

/// Nodes a rule's `apply_to` predicate restricts rewriting to. `None`
/// means unrestricted (no `apply_to` declared).
fn allowed_roots(rule: &Rule<'_>, root: &Value) -> Option<Vec<Value>> {
    let apply_to = rule.field("apply_to")?;
    let mut out = Vec::new();
    for expr in queries(apply_to) {
        let Ok(compiled) = jmespath::compile(expr) else {
            continue;
        };
        if let Ok(var) = compiled.search(root.clone()) {
            if let Ok(as_json) = serde_json::to_value(&*var) {
                match as_json {
                    Value::Array(items) => out.extend(items),
                    Value::Null => {}
                    other => out.push(other),
                }
            }
        }
    }
    Some(out)
}

fn passes_predicates(node: &Value, rule: &Rule<'_>, env: &Bindings, root: &Value) -> bool {
    if let Some(w) = rule.field("where") {
        if !all_queries_truthy(w, node) {
            return false;
        }
    }
    if let Some(pw) = rule.field("program_where") {
        if !all_queries_truthy(pw, root) {
            return false;
        }
    }
    if let Some(Value::Object(where_ph)) = rule.field("where_placeholders") {
        for (ph, expr) in where_ph {
            let Some(expr) = expr.as_str() else { continue };
            if let Some(bound) = env.get(ph) {
                if !jmespath_truthy(expr, bound) {
                    return false;
                }
            }
        }
    }
    true
}

/// Attempt to rewrite `node` itself against every rule in order; on no
/// match, recurse into children. Returns the (possibly unchanged) node
/// and increments `changed` for every successful rewrite performed at
/// or below this node.
pub fn rewrite_node(node: &Value, rules: &[Value], changed: &mut usize, root: &Value) -> Value {
    for rule_value in rules {
        let rule = Rule { value: rule_value };
        let (Some(pat), Some(rep)) = (rule.match_pat(), rule.replace_tpl()) else {
            continue;
        };

        let has_apply_to = rule.field("apply_to").is_some();
        let allowed = allowed_roots(&rule, root);
        if has_apply_to && allowed.is_none() {
            // apply_to was present but every query failed to compile/search;
            // the rule is skipped for this node (predicates are advisory).
            continue;
        }
        let within_scope = match &allowed {
            None => true,
            Some(nodes) => nodes.iter().any(|n| n == node),
        };
        if !within_scope {
            continue;
        }

        let mut env = Bindings::new();
        if match_pattern(node, pat, &mut env) && passes_predicates(node, &rule, &env, root) {
            *changed += 1;
            return substitute(rep, &env);
        }
    }

    match node {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|x| rewrite_node(x, rules, changed, root))
                .collect(),
        ),
        Value::Object(obj) => {
            let mut out = serde_json::Map::new();
            for (k, v) in obj {
                out.insert(k.clone(), rewrite_node(v, rules, changed, root));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// Apply `rules` to every top-level statement of `program` in place.
/// Returns the total number of replacements performed.
pub fn apply_rewrite(program: &mut [Value], rules: &[Value]) -> usize {
    let mut changed = 0;
    let root = Value::Array(program.to_vec());
    for stmt in program.iter_mut() {
        *stmt = rewrite_node(stmt, rules, &mut changed, &root);
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_placeholder_binds_and_requires_repeat_equality() {
        let mut env = Bindings::new();
        let pattern = json!({"add": [{"var": "$x"}, {"var": "$x"}]});
        let same = json!({"add": [{"var": "n"}, {"var": "n"}]});
        assert!(match_pattern(&same, &pattern, &mut env));

        let mut env2 = Bindings::new();
        let different = json!({"add": [{"var": "n"}, {"var": "m"}]});
        assert!(!match_pattern(&different, &pattern, &mut env2));
    }

    #[test]
    fn star_placeholder_captures_whole_list() {
        let mut env = Bindings::new();
        let pattern = json!(["$*rest"]);
        let node = json!([1, 2, 3]);
        assert!(match_pattern(&node, &pattern, &mut env));
        assert_eq!(env.get("rest"), Some(&json!([1, 2, 3])));
    }

    #[test]
    fn substitute_splices_star_binding_into_list() {
        let mut env = Bindings::new();
        env.insert("rest".to_string(), json!([1, 2, 3]));
        let template = json!(["$*rest", 4]);
        assert_eq!(substitute(&template, &env), json!([1, 2, 3, 4]));
    }

    #[test]
    fn rewrite_replaces_first_match_and_does_not_rescan_result() {
        let rules = vec![json!({"match": {"add": ["$x", 0]}, "replace": "$x"})];
        let mut program = vec![json!({"expr": {"add": [{"add": [1, 0]}, 0]}})];
        let total = apply_rewrite(&mut program, &rules);
        assert_eq!(total, 1);
        assert_eq!(program[0], json!({"expr": {"add": [1, 0]}}));
    }

    #[test]
    fn unmatched_node_recurses_into_children() {
        let rules = vec![json!({"match": 0, "replace": "zero"})];
        let mut program = vec![json!({"expr": {"add": [1, 0]}})];
        let total = apply_rewrite(&mut program, &rules);
        assert_eq!(total, 1);
        assert_eq!(program[0], json!({"expr": {"add": [1, "zero"]}}));
    }
}
