use std::collections::HashSet;
use std::net::IpAddr;

use url::Url;

/// Public-suffix rules used to reduce hostnames to their registrable domain (eTLD+1).
///
/// Wildcard rules are stored verbatim (`*.ck`); exception rules are stored without
/// their leading `!`.
#[derive(Debug, Default, Clone)]
pub struct SuffixList {
    rules: HashSet<String>,
    exceptions: HashSet<String>,
}

impl SuffixList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a normalized rule (lowercase, no trailing dot).
    pub fn insert_rule(&mut self, rule: &str) {
        match rule.strip_prefix('!') {
            Some(exception) => self.exceptions.insert(exception.to_string()),
            None => self.rules.insert(rule.to_string()),
        };
    }

    pub fn len(&self) -> usize {
        self.rules.len() + self.exceptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of labels in the public suffix of `labels`.
    ///
    /// Exception rules take priority, then the longest matching rule. With no
    /// match the implicit `*` rule applies and the last label is the suffix.
    fn suffix_label_count(&self, labels: &[&str]) -> usize {
        let n = labels.len();
        for start in 0..n {
            let candidate = labels[start..].join(".");
            if self.exceptions.contains(&candidate) {
                return n - start - 1;
            }
            if self.rules.contains(&candidate) {
                return n - start;
            }
            if start + 1 < n {
                let wildcard = format!("*.{}", labels[start + 1..].join("."));
                if self.rules.contains(&wildcard) {
                    return n - start;
                }
            }
        }
        1
    }

    /// The public suffix of `hostname`, or `None` for IP literals and malformed hosts.
    pub fn public_suffix(&self, hostname: &str) -> Option<String> {
        let host = normalize_host(hostname)?;
        let labels: Vec<&str> = host.split('.').collect();
        let count = self.suffix_label_count(&labels);
        Some(labels[labels.len() - count..].join("."))
    }

    /// The registrable domain of `hostname`: its public suffix plus one label.
    ///
    /// Returns `None` when the host is itself a public suffix, an IP literal, or
    /// not a well-formed dotted name.
    pub fn registrable_domain(&self, hostname: &str) -> Option<String> {
        let host = normalize_host(hostname)?;
        let labels: Vec<&str> = host.split('.').collect();
        let count = self.suffix_label_count(&labels);
        if labels.len() <= count {
            return None;
        }
        Some(labels[labels.len() - count - 1..].join("."))
    }

    /// True iff both hosts resolve to a registrable domain and those differ.
    pub fn is_third_party(&self, host_a: &str, host_b: &str) -> bool {
        match (self.registrable_domain(host_a), self.registrable_domain(host_b)) {
            (Some(a), Some(b)) => a != b,
            _ => false,
        }
    }
}

fn normalize_host(hostname: &str) -> Option<String> {
    let host = hostname.strip_suffix('.').unwrap_or(hostname);
    if host.is_empty() || host.starts_with('[') || host.parse::<IpAddr>().is_ok() {
        return None;
    }
    let host = host.to_ascii_lowercase();
    if host.split('.').any(str::is_empty) {
        return None;
    }
    Some(host)
}

/// Host component of an origin URL. URLs without a host (`about:blank`, `data:`)
/// yield `Ok(None)`.
pub fn host_of(raw_url: &str) -> Result<Option<String>, url::ParseError> {
    let url = Url::parse(raw_url)?;
    Ok(url.host_str().map(str::to_string))
}
