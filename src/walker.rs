use serde_json::{Map, Value};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::diagnostic::{require_object, require_str, Diagnostic, Fault};
use crate::domain::{self, SuffixList};
use crate::extract::{Extractor, Visit};
use crate::stats::Accumulator;

/// Result of one pass over a dump.
#[derive(Debug)]
pub struct WalkOutput<U> {
    pub per_policy: Accumulator<U>,
    pub diagnostics: Vec<Diagnostic>,
    pub records: usize,
    pub cycles_seen: usize,
}

/// The top-level fields of a visit record.
#[derive(Debug)]
struct VisitRecord<'a> {
    url: &'a str,
    policy: &'a str,
    visits: &'a Map<String, Value>,
}

impl<'a> VisitRecord<'a> {
    fn from_value(node: &'a Value) -> Result<Self, Fault> {
        let fields = node.as_object().ok_or_else(|| Fault::WrongType {
            key: "record".to_string(),
            expected: "an object",
        })?;
        Ok(Self {
            url: require_str(fields, "url")?,
            policy: require_str(fields, "policy")?,
            visits: require_object(fields, "visits")?,
        })
    }
}

fn cycle_stats(cycle: &Value) -> Result<&Map<String, Value>, Fault> {
    let fields = cycle.as_object().ok_or_else(|| Fault::WrongType {
        key: "cycle".to_string(),
        expected: "an object",
    })?;
    require_object(fields, "stats")
}

fn visit_etld1(url: &str, suffixes: &SuffixList) -> Option<String> {
    match domain::host_of(url) {
        Ok(Some(host)) => suffixes.registrable_domain(&host),
        Ok(None) => None,
        Err(e) => {
            warn!(action = "parse", component = "visit_url", url = url, error = %e, "Unparseable visit URL");
            None
        }
    }
}

/// Walk every visit record and cycle of `dump`, extracting with `extractor`.
///
/// A malformed record is skipped as a whole; a malformed cycle is skipped on its
/// own. Neither stops the walk.
pub fn walk<E: Extractor>(
    dump: &[Value],
    extractor: &E,
    suffixes: &SuffixList,
) -> WalkOutput<E::Cycle> {
    let start_time = Instant::now();
    info!(
        action = "start",
        component = "record_walk",
        family = E::FAMILY,
        record_count = dump.len(),
        "Walking visit records"
    );

    let mut per_policy = Accumulator::new();
    let mut diagnostics = Vec::new();
    let mut cycles_seen = 0;

    for (i, node) in dump.iter().enumerate() {
        let record = match VisitRecord::from_value(node) {
            Ok(record) => record,
            Err(fault) => {
                let policy = node.get("policy").and_then(Value::as_str);
                diagnostics.push(Diagnostic::record(i, policy, fault, node));
                continue;
            }
        };

        let visit = Visit {
            index: i,
            url: record.url,
            policy: record.policy,
            etld1: visit_etld1(record.url, suffixes),
        };
        if visit.etld1.is_none() {
            warn!(action = "classify", component = "visit_url", record = i, url = record.url, "Visit URL has no registrable domain");
        }

        let cycles = per_policy.policy(record.policy);
        for (ckey, cycle) in record.visits {
            cycles_seen += 1;
            let mut faults = Vec::new();
            let outcome =
                cycle_stats(cycle).and_then(|stats| extractor.extract(&visit, stats, &mut faults));

            diagnostics.extend(
                faults
                    .into_iter()
                    .map(|fault| Diagnostic::origin(i, record.policy, ckey, fault)),
            );
            match outcome {
                Ok(Some(extracted)) => cycles.push(extracted),
                Ok(None) => {
                    debug!(action = "skip", component = "record_walk", record = i, cycle = %ckey, "Cycle has nothing to report");
                }
                Err(fault) => {
                    diagnostics.push(Diagnostic::cycle(i, record.policy, ckey, fault, cycle));
                }
            }
        }
    }

    info!(
        action = "complete",
        component = "record_walk",
        policies = per_policy.len(),
        cycles_seen,
        cycles_kept = per_policy.cycle_count(),
        diagnostics = diagnostics.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Record walk completed"
    );

    WalkOutput {
        per_policy,
        diagnostics,
        records: dump.len(),
        cycles_seen,
    }
}
