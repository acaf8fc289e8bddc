//! Thin I/O wrappers the evaluator talks to instead of real stdio.
//!
//! This is deliberately the thinnest layer in the crate: `Stdio` exists
//! so the evaluator never touches `std::io` directly, which makes
//! `print`/`input` testable without a real terminal attached.

use std::io::{self, BufRead, Write};

/// Where `print` writes and `input` reads from.
pub trait Stdio {
    fn print_line(&mut self, text: &str);
    fn read_line(&mut self, prompt: Option<&str>) -> io::Result<String>;
}

/// The real thing: stdout/stdin.
#[derive(Debug, Default)]
pub struct StdStdio;

impl Stdio for StdStdio {
    fn print_line(&mut self, text: &str) {
        println!("{text}");
    }

    fn read_line(&mut self, prompt: Option<&str>) -> io::Result<String> {
        if let Some(p) = prompt {
            print!("{p}");
            io::stdout().flush()?;
        }
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(line)
    }
}

/// An in-memory stdio for tests and embedders: captures everything
/// printed, and serves `input` from a pre-seeded queue of lines.
#[derive(Debug, Default)]
pub struct BufferedStdio {
    pub output: Vec<String>,
    pub input_queue: std::collections::VecDeque<String>,
}

impl BufferedStdio {
    #[must_use]
    pub fn with_input<I: IntoIterator<Item = String>>(lines: I) -> Self {
        Self {
            output: Vec::new(),
            input_queue: lines.into_iter().collect(),
        }
    }
}

impl Stdio for BufferedStdio {
    fn print_line(&mut self, text: &str) {
        self.output.push(text.to_string());
    }

    fn read_line(&mut self, _prompt: Option<&str>) -> io::Result<String> {
        self.input_queue
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no more buffered input"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_stdio_round_trips() {
        let mut io = BufferedStdio::with_input(["42".to_string()]);
        io.print_line("hello");
        assert_eq!(io.output, vec!["hello".to_string()]);
        assert_eq!(io.read_line(None).unwrap(), "42");
        assert!(io.read_line(None).is_err());
    }
}
