use anyhow::{Context, Result};
use std::io::Write;
use std::time::Instant;
use tracing::info;

use crate::diagnostic::Diagnostic;
use crate::extract::Extractor;
use crate::stats::Accumulator;

/// Write the header and every row of `per_policy` as CSV, policy by policy.
pub fn write_rows<E: Extractor, W: Write>(
    extractor: &E,
    per_policy: Accumulator<E::Cycle>,
    out: W,
) -> Result<usize> {
    let start_time = Instant::now();
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(out);

    writer
        .write_record(E::HEADER)
        .context("Failed to write CSV header")?;

    let mut rows = 0;
    for (policy, cycles) in per_policy.into_inner() {
        for cycle in &cycles {
            rows += extractor
                .write_rows(&policy, cycle, &mut writer)
                .context("Failed to write CSV rows")?;
        }
    }
    writer.flush().context("Failed to flush CSV output")?;

    info!(
        action = "complete",
        component = "row_emitter",
        family = E::FAMILY,
        row_count = rows,
        duration_ms = start_time.elapsed().as_millis(),
        "Rows written"
    );
    Ok(rows)
}

/// Write diagnostics, each followed by a pretty-printed dump of its JSON node.
pub fn write_diagnostics<W: Write>(diagnostics: &[Diagnostic], mut out: W) -> Result<()> {
    for diag in diagnostics {
        writeln!(out, "{}", diag)?;
        if let Some(node) = &diag.node {
            serde_json::to_writer_pretty(&mut out, node)?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Fault;
    use crate::extract::{LoadingCycle, LoadingExtractor, LoadingMetric};
    use serde_json::json;

    #[test]
    fn test_header_written_even_without_rows() {
        let mut out = Vec::new();
        let rows = write_rows(&LoadingExtractor, Accumulator::new(), &mut out).unwrap();
        assert_eq!(rows, 0);
        assert_eq!(String::from_utf8(out).unwrap(), "url,metric,policy,temp,seconds\n");
    }

    #[test]
    fn test_loading_rows() {
        let mut acc = Accumulator::new();
        acc.push(
            "vanilla",
            LoadingCycle {
                url: "https://a.com".into(),
                metrics: vec![LoadingMetric {
                    name: "loadEventEnd".into(),
                    cold_seconds: 1.0,
                    hot_seconds: 0.25,
                }],
            },
        );
        let mut out = Vec::new();
        let rows = write_rows(&LoadingExtractor, acc, &mut out).unwrap();
        assert_eq!(rows, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "url,metric,policy,temp,seconds\n\
             https://a.com,loadEventEnd,vanilla,cold,1.0\n\
             https://a.com,loadEventEnd,vanilla,hot,0.25\n"
        );
    }

    #[test]
    fn test_fields_with_commas_are_quoted() {
        let mut acc = Accumulator::new();
        acc.push(
            "split,key",
            LoadingCycle {
                url: "https://a.com/?q=1,2".into(),
                metrics: vec![LoadingMetric {
                    name: "load".into(),
                    cold_seconds: 0.5,
                    hot_seconds: 0.5,
                }],
            },
        );
        let mut out = Vec::new();
        write_rows(&LoadingExtractor, acc, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"https://a.com/?q=1,2\",load,\"split,key\",cold,0.5\n"));
    }

    #[test]
    fn test_diagnostics_followed_by_pretty_node() {
        let node = json!({"url": "https://a.com"});
        let diags = vec![Diagnostic::record(2, None, Fault::MissingKey("policy".into()), &node)];
        let mut out = Vec::new();
        write_diagnostics(&diags, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "record[2] malformed, missing key 'policy'\n{\n  \"url\": \"https://a.com\"\n}\n"
        );
    }
}
