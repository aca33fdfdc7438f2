use anyhow::{Context, Result};
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::time::Instant;
use tracing::info;

use crate::args::{Args, Metric};
use crate::domain::SuffixList;
use crate::extract::{ExecCounters, Extractor, LoadingExtractor, OriginExtractor, RequestCounters};
use crate::{dump, emit, suffix, walker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub records: usize,
    pub cycles_seen: usize,
    pub cycles_kept: usize,
    pub rows: usize,
    pub diagnostics: usize,
}

/// Load the dump named by `args`, extract the requested family, and write CSV rows
/// to the output with diagnostics on stderr.
pub fn run(args: &Args) -> Result<RunSummary> {
    let total_start_time = Instant::now();
    info!(action = "start", component = "pipeline", metric = ?args.metric, "Starting stats extraction");

    let suffixes = suffix::load_suffix_list(args.suffix_list.as_deref())?;
    let records = dump::load(&args.dump)?;

    let summary = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {:?}", path))?;
            extract(&records, args.metric, &suffixes, BufWriter::new(file), io::stderr())?
        }
        None => extract(&records, args.metric, &suffixes, io::stdout().lock(), io::stderr())?,
    };

    info!(
        action = "complete",
        component = "pipeline",
        records = summary.records,
        cycles_seen = summary.cycles_seen,
        cycles_kept = summary.cycles_kept,
        rows = summary.rows,
        diagnostics = summary.diagnostics,
        duration_ms = total_start_time.elapsed().as_millis(),
        "Extraction completed"
    );
    Ok(summary)
}

/// Extract `metric` from already-loaded records.
pub fn extract<W: Write, D: Write>(
    records: &[Value],
    metric: Metric,
    suffixes: &SuffixList,
    out: W,
    diag_out: D,
) -> Result<RunSummary> {
    match metric {
        Metric::Loading => extract_with(&LoadingExtractor, records, suffixes, out, diag_out),
        Metric::V8 => extract_with(
            &OriginExtractor::<ExecCounters>::new(suffixes),
            records,
            suffixes,
            out,
            diag_out,
        ),
        Metric::Req => extract_with(
            &OriginExtractor::<RequestCounters>::new(suffixes),
            records,
            suffixes,
            out,
            diag_out,
        ),
    }
}

fn extract_with<E: Extractor, W: Write, D: Write>(
    extractor: &E,
    records: &[Value],
    suffixes: &SuffixList,
    out: W,
    diag_out: D,
) -> Result<RunSummary> {
    let walked = walker::walk(records, extractor, suffixes);

    emit::write_diagnostics(&walked.diagnostics, diag_out)
        .context("Failed to write diagnostics")?;

    let cycles_kept = walked.per_policy.cycle_count();
    let rows = emit::write_rows(extractor, walked.per_policy, out)?;

    Ok(RunSummary {
        records: walked.records,
        cycles_seen: walked.cycles_seen,
        cycles_kept,
        rows,
        diagnostics: walked.diagnostics.len(),
    })
}
