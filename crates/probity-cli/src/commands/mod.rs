pub mod canon;
pub mod diff;

use probity_core::snapshot::parse_json;
use probity_core::ProbityError;
use std::path::Path;

/// Read and parse a JSON document, naming the file in errors.
pub fn read_json(path: &Path) -> Result<serde_json::Value, ProbityError> {
    let text = std::fs::read_to_string(path).map_err(|e| ProbityError::io(path, e))?;
    parse_json(&path.display().to_string(), &text)
}
