//! File-reading helpers shared by every subcommand.

use std::fs;
use std::path::Path;

use serde_json::Value;

/// Read a file and parse it as a JSON program (bare array or
/// `{program: [...]}` wrapper). Both the `fs::read_to_string` failure
/// and the JSON parse failure are folded into one message string, the
/// same granularity the CLI reports at.
pub fn read_json_file(path: &Path) -> Result<Value, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("error reading {}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("error parsing {}: {e}", path.display()))
}

pub fn read_bytes_file(path: &Path) -> Result<Vec<u8>, String> {
    fs::read(path).map_err(|e| format!("error reading {}: {e}", path.display()))
}

pub fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<(), String> {
    match path {
        Some(path) => fs::write(path, bytes).map_err(|e| format!("error writing {}: {e}", path.display())),
        None => {
            use std::io::Write;
            std::io::stdout().write_all(bytes).map_err(|e| format!("error writing stdout: {e}"))
        }
    }
}
