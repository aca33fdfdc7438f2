//! Per-cycle metric extraction for the three stats families.
//!
//! Every extractor reads the `cold`, `hot` and `diff` snapshots of a cycle. The
//! `diff` snapshot decides which keys exist; `cold` and `hot` are only consulted
//! for those keys, so each key yields a matched cold/hot pair of rows.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::io::Write;
use std::marker::PhantomData;

use crate::diagnostic::{require, Fault};
use crate::domain::{self, SuffixList};

const MICROS_PER_SECOND: f64 = 1_000_000.0;

const FAMILIES: [&str; 3] = ["loading", "v8", "req"];

/// The visit record a cycle belongs to.
#[derive(Debug, Clone)]
pub struct Visit<'a> {
    pub index: usize,
    pub url: &'a str,
    pub policy: &'a str,
    /// Registrable domain of `url`, if it has one.
    pub etld1: Option<String>,
}

pub trait Extractor {
    /// What one successfully extracted cycle keeps for output.
    type Cycle;

    /// Family key inside a nested stats snapshot.
    const FAMILY: &'static str;

    /// CSV header columns.
    const HEADER: &'static [&'static str];

    /// Extract one cycle from its `stats` map.
    ///
    /// `Ok(None)` drops the cycle without a diagnostic. Origin-level problems go to
    /// `faults` and do not fail the cycle.
    fn extract(
        &self,
        visit: &Visit<'_>,
        stats: &Map<String, Value>,
        faults: &mut Vec<Fault>,
    ) -> Result<Option<Self::Cycle>, Fault>;

    /// Write the rows of one cycle, returning how many were written.
    fn write_rows<W: Write>(
        &self,
        policy: &str,
        cycle: &Self::Cycle,
        writer: &mut csv::Writer<W>,
    ) -> csv::Result<usize>;
}

/// The family map stored under `label`.
///
/// Crawler dumps nest all families in each label (`{"loading": {...}, "v8": {...}}`);
/// a label holding none of the family keys is taken to be the family map itself.
pub fn family_snapshot<'a>(
    stats: &'a Map<String, Value>,
    label: &str,
    family: &str,
) -> Result<&'a Map<String, Value>, Fault> {
    let snapshot = require(stats, label)?
        .as_object()
        .ok_or_else(|| Fault::WrongType {
            key: label.to_string(),
            expected: "an object",
        })?;

    let nested = FAMILIES
        .iter()
        .any(|key| snapshot.get(*key).is_some_and(Value::is_object));
    if !nested {
        return Ok(snapshot);
    }

    require(snapshot, family)?
        .as_object()
        .ok_or_else(|| Fault::WrongType {
            key: format!("{}.{}", label, family),
            expected: "an object",
        })
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadingMetric {
    pub name: String,
    pub cold_seconds: f64,
    pub hot_seconds: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadingCycle {
    pub url: String,
    pub metrics: Vec<LoadingMetric>,
}

/// Page-load timing milestones, converted from microseconds to seconds.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoadingExtractor;

fn seconds(snapshot: &Map<String, Value>, label: &'static str, metric: &str) -> Result<f64, Fault> {
    let value = snapshot.get(metric).ok_or_else(|| Fault::MissingEntry {
        label,
        key: metric.to_string(),
    })?;
    let micros = value.as_f64().ok_or_else(|| Fault::WrongType {
        key: format!("{}.{}", label, metric),
        expected: "a number",
    })?;
    Ok(micros / MICROS_PER_SECOND)
}

#[derive(Serialize)]
struct LoadingRow<'a> {
    url: &'a str,
    metric: &'a str,
    policy: &'a str,
    temp: &'static str,
    seconds: f64,
}

impl Extractor for LoadingExtractor {
    type Cycle = LoadingCycle;

    const FAMILY: &'static str = "loading";
    const HEADER: &'static [&'static str] = &["url", "metric", "policy", "temp", "seconds"];

    fn extract(
        &self,
        visit: &Visit<'_>,
        stats: &Map<String, Value>,
        _faults: &mut Vec<Fault>,
    ) -> Result<Option<LoadingCycle>, Fault> {
        let cold = family_snapshot(stats, "cold", Self::FAMILY)?;
        let hot = family_snapshot(stats, "hot", Self::FAMILY)?;
        let diff = family_snapshot(stats, "diff", Self::FAMILY)?;

        let mut metrics = Vec::with_capacity(diff.len());
        for name in diff.keys() {
            metrics.push(LoadingMetric {
                name: name.clone(),
                cold_seconds: seconds(cold, "cold", name)?,
                hot_seconds: seconds(hot, "hot", name)?,
            });
        }

        Ok(Some(LoadingCycle {
            url: visit.url.to_string(),
            metrics,
        }))
    }

    fn write_rows<W: Write>(
        &self,
        policy: &str,
        cycle: &LoadingCycle,
        writer: &mut csv::Writer<W>,
    ) -> csv::Result<usize> {
        for metric in &cycle.metrics {
            for (temp, seconds) in [("cold", metric.cold_seconds), ("hot", metric.hot_seconds)] {
                writer.serialize(LoadingRow {
                    url: &cycle.url,
                    metric: &metric.name,
                    policy,
                    temp,
                    seconds,
                })?;
            }
        }
        Ok(cycle.metrics.len() * 2)
    }
}

/// Per-origin counter pair of an origin-keyed family.
pub trait Counters: for<'de> Deserialize<'de> {
    const FAMILY: &'static str;
    const HEADER: &'static [&'static str];
    /// Expected JSON shape, for diagnostics.
    const SHAPE: &'static str;

    fn columns(&self) -> (&Number, &Number);
}

/// V8 runtime-call counters per execution context.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExecCounters {
    pub count: Number,
    pub microseconds: Number,
}

impl Counters for ExecCounters {
    const FAMILY: &'static str = "v8";
    const HEADER: &'static [&'static str] =
        &["tpetld1", "policy", "temp", "invokations", "microseconds"];
    const SHAPE: &'static str = "a {count, microseconds} object";

    fn columns(&self) -> (&Number, &Number) {
        (&self.count, &self.microseconds)
    }
}

/// Network request counters per request origin.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RequestCounters {
    pub count: Number,
    pub bytes: Number,
}

impl Counters for RequestCounters {
    const FAMILY: &'static str = "req";
    const HEADER: &'static [&'static str] = &["tpetld1", "policy", "temp", "requests", "bytes"];
    const SHAPE: &'static str = "a {count, bytes} object";

    fn columns(&self) -> (&Number, &Number) {
        (&self.count, &self.bytes)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DomainCounters<C> {
    pub domain: String,
    pub cold: C,
    pub hot: C,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OriginCycle<C> {
    pub domains: Vec<DomainCounters<C>>,
}

/// One CSV row of an origin-keyed family; the header names the two counters.
#[derive(Serialize)]
struct OriginRow<'a> {
    tpetld1: &'a str,
    policy: &'a str,
    temp: &'static str,
    count: &'a Number,
    amount: &'a Number,
}

/// Origin-keyed counters restricted to third-party registrable domains.
#[derive(Debug, Clone)]
pub struct OriginExtractor<'a, C> {
    suffixes: &'a SuffixList,
    _counters: PhantomData<C>,
}

impl<'a, C: Counters> OriginExtractor<'a, C> {
    pub fn new(suffixes: &'a SuffixList) -> Self {
        Self {
            suffixes,
            _counters: PhantomData,
        }
    }

    /// Re-key a snapshot by registrable domain, keeping third-party origins only.
    ///
    /// Origins collapsing onto the same domain overwrite each other; the domain
    /// keeps the position of its first origin.
    pub fn third_party(
        &self,
        visit: &Visit<'_>,
        snapshot: &Map<String, Value>,
        faults: &mut Vec<Fault>,
    ) -> Map<String, Value> {
        let mut retained = Map::new();
        for (raw_origin, stats) in snapshot {
            let host = match domain::host_of(raw_origin) {
                Ok(Some(host)) => host,
                Ok(None) => continue,
                Err(e) => {
                    faults.push(Fault::UnparseableOrigin {
                        url: raw_origin.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            let Some(origin_etld1) = self.suffixes.registrable_domain(&host) else {
                continue;
            };
            if visit.etld1.as_deref() != Some(origin_etld1.as_str()) {
                retained.insert(origin_etld1, stats.clone());
            }
        }
        retained
    }
}

fn counters<C: Counters>(
    retained: &Map<String, Value>,
    label: &'static str,
    domain: &str,
) -> Result<C, Fault> {
    let value = retained.get(domain).ok_or_else(|| Fault::MissingEntry {
        label,
        key: domain.to_string(),
    })?;
    C::deserialize(value).map_err(|_| Fault::WrongType {
        key: format!("{}.{}", label, domain),
        expected: C::SHAPE,
    })
}

impl<C: Counters> Extractor for OriginExtractor<'_, C> {
    type Cycle = OriginCycle<C>;

    const FAMILY: &'static str = C::FAMILY;
    const HEADER: &'static [&'static str] = C::HEADER;

    fn extract(
        &self,
        visit: &Visit<'_>,
        stats: &Map<String, Value>,
        faults: &mut Vec<Fault>,
    ) -> Result<Option<OriginCycle<C>>, Fault> {
        // A diff without third parties drops the cycle before cold/hot are required.
        let diff = family_snapshot(stats, "diff", Self::FAMILY)?;
        let diff = self.third_party(visit, diff, faults);
        if diff.is_empty() {
            return Ok(None);
        }

        let cold = family_snapshot(stats, "cold", Self::FAMILY)?;
        let hot = family_snapshot(stats, "hot", Self::FAMILY)?;
        let cold = self.third_party(visit, cold, faults);
        let hot = self.third_party(visit, hot, faults);

        let mut domains = Vec::with_capacity(diff.len());
        for domain in diff.keys() {
            domains.push(DomainCounters {
                domain: domain.clone(),
                cold: counters(&cold, "cold", domain)?,
                hot: counters(&hot, "hot", domain)?,
            });
        }
        Ok(Some(OriginCycle { domains }))
    }

    fn write_rows<W: Write>(
        &self,
        policy: &str,
        cycle: &OriginCycle<C>,
        writer: &mut csv::Writer<W>,
    ) -> csv::Result<usize> {
        for entry in &cycle.domains {
            for (temp, counters) in [("cold", &entry.cold), ("hot", &entry.hot)] {
                let (count, amount) = counters.columns();
                writer.serialize(OriginRow {
                    tpetld1: &entry.domain,
                    policy,
                    temp,
                    count,
                    amount,
                })?;
            }
        }
        Ok(cycle.domains.len() * 2)
    }
}
