//! Reading events and payloads from files or stdin.

use std::path::Path;

use anyhow::Context;
use ingest_client::Event;

/// Reads `path`, or stdin if `path` is `-`.
pub fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        return std::io::read_to_string(std::io::stdin()).context("Failed to read stdin");
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read `{}`", path.display()))
}

/// Parses a JSON array of `{"table_name": ..., "data": ...}` objects.
pub fn parse_events(contents: &str) -> anyhow::Result<Vec<Event>> {
    serde_json::from_str(contents)
        .context("Expected a JSON array of objects with `table_name` and `data` fields")
}

pub fn parse_payload(contents: &str) -> anyhow::Result<serde_json::Value> {
    serde_json::from_str(contents).context("Payload is not valid JSON")
}
