//! Lexical scoping: a stack of frames, searched inside-out.
//!
//! The top frame is always the one currently executing; function calls
//! and `then`/`else` blocks each push a fresh frame and pop it on every
//! exit path (normal completion, `return` unwinding, or error
//! propagation) — callers are expected to pop via a guard or in a
//! `finally`-shaped block, since this type itself has no RAII hook.

use ahash::AHashMap;
use serde_json::Value;

/// A single lexical scope: a flat name -> value map.
#[derive(Debug, Default, Clone)]
pub struct Frame {
    vars: AHashMap<String, Value>,
}

impl Frame {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// The live stack of frames for one evaluator run. Frame 0 is the
/// program's global frame and is never popped.
#[derive(Debug, Clone)]
pub struct Frames {
    stack: Vec<Frame>,
}

impl Frames {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: vec![Frame::new()],
        }
    }

    pub fn push(&mut self) {
        self.stack.push(Frame::new());
    }

    /// Pop the top frame. Never pops the global frame.
    pub fn pop(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Bind a new name in the current (top) frame. `let` always
    /// introduces into the innermost scope, shadowing any outer
    /// binding of the same name for the remainder of that scope.
    pub fn declare(&mut self, name: &str, value: Value) {
        self.stack
            .last_mut()
            .expect("global frame always present")
            .vars
            .insert(name.to_string(), value);
    }

    /// Inside-out lookup: the nearest enclosing frame that binds `name`
    /// wins.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.stack.iter().rev().find_map(|f| f.vars.get(name))
    }

    /// Update an existing binding at whichever frame currently owns it,
    /// searching inside-out. Returns `false` if no frame binds `name`.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        for frame in self.stack.iter_mut().rev() {
            if let Some(slot) = frame.vars.get_mut(name) {
                *slot = value;
                return true;
            }
        }
        false
    }
}

impl Default for Frames {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inside_out_lookup_prefers_inner_frame() {
        let mut frames = Frames::new();
        frames.declare("x", json!(1));
        frames.push();
        frames.declare("x", json!(2));
        assert_eq!(frames.get("x"), Some(&json!(2)));
        frames.pop();
        assert_eq!(frames.get("x"), Some(&json!(1)));
    }

    #[test]
    fn set_updates_owning_frame_not_innermost() {
        let mut frames = Frames::new();
        frames.declare("x", json!(1));
        frames.push();
        assert!(frames.set("x", json!(9)));
        frames.pop();
        assert_eq!(frames.get("x"), Some(&json!(9)));
    }

    #[test]
    fn set_on_undeclared_name_fails() {
        let mut frames = Frames::new();
        assert!(!frames.set("nope", json!(1)));
    }

    #[test]
    fn global_frame_is_never_popped() {
        let mut frames = Frames::new();
        frames.pop();
        assert_eq!(frames.depth(), 1);
    }
}
