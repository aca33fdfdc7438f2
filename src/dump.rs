use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Parse a stats dump: a JSON array of visit records.
pub fn parse(content: &[u8]) -> Result<Vec<Value>> {
    let records: Vec<Value> =
        serde_json::from_slice(content).context("Stats dump is not a JSON array of records")?;
    Ok(records)
}

/// Read and parse a whole stats dump. Any failure here is fatal to the run.
pub fn load(path: &Path) -> Result<Vec<Value>> {
    let start_time = Instant::now();
    info!(action = "start", component = "dump_loading", file_path = ?path, "Loading stats dump");

    if !path.exists() {
        anyhow::bail!("Stats dump not found at {:?}", path);
    }
    let content = fs::read(path).with_context(|| format!("Failed to read stats dump {:?}", path))?;
    let records = parse(&content).with_context(|| format!("Failed to parse stats dump {:?}", path))?;

    info!(
        action = "complete",
        component = "dump_loading",
        record_count = records.len(),
        byte_count = content.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Stats dump loaded"
    );
    Ok(records)
}
