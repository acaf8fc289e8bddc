//! Operator arity rules.
//!
//! Unknown operator names pass arity validation by design — the
//! language is openly extensible at the validator layer; the evaluator
//! is the one place an unknown operator is actually rejected, at the
//! moment it would need to be run.

/// An arity requirement for a known operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    AtLeast(usize),
    Exactly(usize),
    OneOf(usize, usize),
}

impl Arity {
    #[must_use]
    pub fn accepts(&self, n: usize) -> bool {
        match self {
            Arity::AtLeast(min) => n >= *min,
            Arity::Exactly(k) => n == *k,
            Arity::OneOf(a, b) => n == *a || n == *b,
        }
    }
}

/// Look up the arity rule for an operator's base (non-namespaced) name.
/// Returns `None` for an operator this registry doesn't know about —
/// callers should treat that as "arity validation passes".
#[must_use]
pub fn arity_for(base_op: &str) -> Option<Arity> {
    Some(match base_op {
        "add" | "sub" | "mul" | "div" => Arity::AtLeast(2),
        "eq" | "ne" | "lt" | "le" | "gt" | "ge" => Arity::AtLeast(2),
        "mod" | "pow" => Arity::Exactly(2),
        "and" | "or" => Arity::AtLeast(0),
        "not" | "len" | "int" => Arity::Exactly(1),
        "list" => Arity::AtLeast(0),
        "concat" => Arity::AtLeast(2),
        "get" | "has" => Arity::Exactly(2),
        "range" => Arity::OneOf(1, 2),
        "input" => Arity::OneOf(0, 1),
        _ => return None,
    })
}

/// Check an operator call's arity, normalizing away any namespace
/// prefix first (only the final `.`-separated segment is significant).
#[must_use]
pub fn check_arity(op: &str, arg_count: usize) -> ArityCheck {
    let base = crate::program::Expr::operator_base_name(op);
    match arity_for(base) {
        Some(arity) if arity.accepts(arg_count) => ArityCheck::Ok,
        Some(arity) => ArityCheck::Mismatch(arity),
        None => ArityCheck::Unknown,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArityCheck {
    Ok,
    Mismatch(Arity),
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaced_operator_normalizes() {
        assert_eq!(check_arity("math.add", 2), ArityCheck::Ok);
        assert_eq!(check_arity("math.add", 0), ArityCheck::Mismatch(Arity::AtLeast(2)));
    }

    #[test]
    fn unknown_operator_passes_arity() {
        assert_eq!(check_arity("frobnicate", 7), ArityCheck::Unknown);
    }

    #[test]
    fn and_or_accept_zero_args() {
        assert_eq!(check_arity("and", 0), ArityCheck::Ok);
        assert_eq!(check_arity("or", 0), ArityCheck::Ok);
    }
}
