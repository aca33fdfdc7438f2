use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Why a record, cycle or origin was dropped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Fault {
    #[error("missing key '{0}'")]
    MissingKey(String),
    #[error("key '{key}' is not {expected}")]
    WrongType { key: String, expected: &'static str },
    #[error("key '{key}' present in diff but missing from {label}")]
    MissingEntry { label: &'static str, key: String },
    #[error("unparseable execution context URL: '{url}': {reason}")]
    UnparseableOrigin { url: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub record: usize,
    pub policy: Option<String>,
    pub cycle: Option<String>,
}

/// A dropped unit of input, with the JSON node it was dropped from.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub location: Location,
    pub fault: Fault,
    pub node: Option<Value>,
}

impl Diagnostic {
    pub fn record(record: usize, policy: Option<&str>, fault: Fault, node: &Value) -> Self {
        Self {
            location: Location {
                record,
                policy: policy.map(str::to_string),
                cycle: None,
            },
            fault,
            node: Some(node.clone()),
        }
    }

    pub fn cycle(record: usize, policy: &str, cycle: &str, fault: Fault, node: &Value) -> Self {
        Self {
            location: Location {
                record,
                policy: Some(policy.to_string()),
                cycle: Some(cycle.to_string()),
            },
            fault,
            node: Some(node.clone()),
        }
    }

    pub fn origin(record: usize, policy: &str, cycle: &str, fault: Fault) -> Self {
        Self {
            location: Location {
                record,
                policy: Some(policy.to_string()),
                cycle: Some(cycle.to_string()),
            },
            fault,
            node: None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record[{}]", self.location.record)?;
        if let Some(policy) = &self.location.policy {
            write!(f, ", policy[{}]", policy)?;
        }
        if let Some(cycle) = &self.location.cycle {
            write!(f, ", cycle[{}]", cycle)?;
        }
        match self.fault {
            Fault::UnparseableOrigin { .. } => write!(f, ": {}", self.fault),
            _ => write!(f, " malformed, {}", self.fault),
        }
    }
}

pub fn require<'a>(fields: &'a Map<String, Value>, key: &str) -> Result<&'a Value, Fault> {
    fields
        .get(key)
        .ok_or_else(|| Fault::MissingKey(key.to_string()))
}

pub fn require_str<'a>(fields: &'a Map<String, Value>, key: &str) -> Result<&'a str, Fault> {
    require(fields, key)?
        .as_str()
        .ok_or_else(|| Fault::WrongType {
            key: key.to_string(),
            expected: "a string",
        })
}

pub fn require_object<'a>(
    fields: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a Map<String, Value>, Fault> {
    require(fields, key)?
        .as_object()
        .ok_or_else(|| Fault::WrongType {
            key: key.to_string(),
            expected: "an object",
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_diagnostic_rendering() {
        let node = json!({"url": "https://a.com"});
        let diag = Diagnostic::record(3, None, Fault::MissingKey("policy".into()), &node);
        assert_eq!(diag.to_string(), "record[3] malformed, missing key 'policy'");
    }

    #[test]
    fn test_cycle_diagnostic_rendering() {
        let node = json!({"stats": {}});
        let diag = Diagnostic::cycle(0, "vanilla", "c1", Fault::MissingKey("diff".into()), &node);
        assert_eq!(
            diag.to_string(),
            "record[0], policy[vanilla], cycle[c1] malformed, missing key 'diff'"
        );
    }

    #[test]
    fn test_origin_diagnostic_names_its_cycle() {
        let fault = Fault::UnparseableOrigin {
            url: "::".into(),
            reason: "relative URL without a base".into(),
        };
        let diag = Diagnostic::origin(1, "block3p", "c2", fault);
        assert_eq!(
            diag.to_string(),
            "record[1], policy[block3p], cycle[c2]: unparseable execution context URL: '::': relative URL without a base"
        );
        assert!(diag.node.is_none());
    }

    #[test]
    fn test_require_helpers() {
        let value = json!({"url": "https://a.com", "policy": 7, "visits": {}});
        let fields = value.as_object().unwrap();
        assert_eq!(require_str(fields, "url").unwrap(), "https://a.com");
        assert_eq!(
            require_str(fields, "policy").unwrap_err(),
            Fault::WrongType { key: "policy".into(), expected: "a string" }
        );
        assert!(require_object(fields, "visits").unwrap().is_empty());
        assert_eq!(
            require(fields, "stats").unwrap_err(),
            Fault::MissingKey("stats".into())
        );
    }
}
