use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};
use url::Host;

use crate::domain::SuffixList;

// Include default suffix rules at compile time
const DEFAULT_SUFFIX_LIST_BYTES: &[u8] = include_bytes!("../default_public_suffix_list.dat");

const DEFAULT_SUFFIX_FILE: &str = "public_suffix_list.dat";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid suffix rule '{rule}' at line {line}: {reason}")]
pub struct RuleError {
    pub line: usize,
    pub rule: String,
    pub reason: String,
}

/// Normalize one rule token: lowercase, no trailing dot, IDNA-encoded.
fn normalize_rule(token: &str) -> Result<String, String> {
    let (prefix, body) = if let Some(rest) = token.strip_prefix('!') {
        ("!", rest)
    } else if let Some(rest) = token.strip_prefix("*.") {
        ("*.", rest)
    } else {
        ("", token)
    };
    let body = body.strip_suffix('.').unwrap_or(body);
    if body.is_empty() {
        return Err("empty rule".to_string());
    }

    let body = if body.is_ascii() {
        body.to_ascii_lowercase()
    } else {
        match Host::parse(body) {
            Ok(Host::Domain(ascii)) => ascii,
            Ok(_) => return Err("rule is an IP address".to_string()),
            Err(e) => return Err(e.to_string()),
        }
    };

    for label in body.split('.') {
        if label.is_empty() {
            return Err("empty label".to_string());
        }
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(format!("unexpected character in label '{}'", label));
        }
    }

    Ok(format!("{}{}", prefix, body))
}

/// Parse Public Suffix List text, collecting bad lines instead of failing.
pub fn parse_lines(content: &str) -> (SuffixList, Vec<RuleError>) {
    let mut list = SuffixList::new();
    let mut errors = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let Some(token) = line.split_whitespace().next() else {
            continue;
        };
        if token.starts_with("//") {
            continue;
        }
        match normalize_rule(token) {
            Ok(rule) => list.insert_rule(&rule),
            Err(reason) => errors.push(RuleError {
                line: line_num + 1,
                rule: token.to_string(),
                reason,
            }),
        }
    }

    (list, errors)
}

/// Parse Public Suffix List text, failing on the first bad rule.
pub fn parse_strict(content: &str) -> Result<SuffixList, RuleError> {
    let (list, mut errors) = parse_lines(content);
    if errors.is_empty() {
        Ok(list)
    } else {
        Err(errors.remove(0))
    }
}

fn parse_lenient(content: &str, component: &str) -> SuffixList {
    let (list, errors) = parse_lines(content);
    for e in &errors {
        warn!(action = "parse", component = component, line_number = e.line, error = %e, "Skipping invalid suffix rule");
    }
    list
}

impl SuffixList {
    /// The suffix rules compiled into the binary.
    pub fn default_list() -> Result<Self> {
        let content = std::str::from_utf8(DEFAULT_SUFFIX_LIST_BYTES)
            .context("Failed to decode embedded default suffix list")?;
        Ok(parse_lenient(content, "embedded_suffix_list"))
    }
}

/// Resolve the suffix rules: an explicit file, then `public_suffix_list.dat` in the
/// working directory, then the embedded defaults.
pub fn load_suffix_list(suffix_file_path: Option<&Path>) -> Result<SuffixList> {
    let start_time = Instant::now();
    info!(
        action = "start",
        component = "suffix_loading",
        "Starting public suffix list loading"
    );

    let list = if let Some(path) = suffix_file_path {
        info!(action = "load", component = "suffix_file", file_path = ?path, "Loading suffix rules from specified file");
        if !path.exists() {
            anyhow::bail!("Suffix list file not found: {:?}", path);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read suffix list {:?}", path))?;
        parse_strict(&content).with_context(|| format!("Invalid suffix list {:?}", path))?
    } else {
        let default_file = Path::new(DEFAULT_SUFFIX_FILE);
        let mut list = SuffixList::new();
        if default_file.exists() {
            info!(action = "load", component = "default_suffix_file", file_path = ?default_file, "Loading suffix rules from default file");
            let content = fs::read_to_string(default_file)
                .with_context(|| format!("Failed to read suffix list {:?}", default_file))?;
            list = parse_lenient(&content, "default_suffix_file");
        }

        if list.is_empty() {
            info!(
                action = "load",
                component = "embedded_suffix_list",
                "Using embedded default suffix rules"
            );
            list = SuffixList::default_list()?;
        }
        list
    };

    info!(
        action = "complete",
        component = "suffix_loading",
        rule_count = list.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Loaded public suffix rules"
    );
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_list_format() {
        let content = "// comment\n\ncom\nco.uk   trailing words ignored\n*.ck\n!www.ck\nEXAMPLE.ORG.\n";
        let list = parse_strict(content).unwrap();
        assert_eq!(list.len(), 5);
        assert_eq!(list.registrable_domain("a.b.co.uk").as_deref(), Some("b.co.uk"));
        assert_eq!(list.registrable_domain("www.ck").as_deref(), Some("www.ck"));
        assert_eq!(list.registrable_domain("example.org"), None);
        assert_eq!(list.registrable_domain("x.example.org").as_deref(), Some("x.example.org"));
    }

    #[test]
    fn test_idn_rules_are_ascii_encoded() {
        let list = parse_strict("рф\n*.рф\n").unwrap();
        assert_eq!(list.registrable_domain("b.xn--p1ai"), None);
        assert_eq!(list.registrable_domain("a.b.xn--p1ai").as_deref(), Some("a.b.xn--p1ai"));
    }

    #[test]
    fn test_bad_rules_reported_with_line() {
        let (list, errors) = parse_lines("com\nfoo..bar\nb@d\nnet\n");
        assert_eq!(list.len(), 2);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].line, 2);
        assert_eq!(errors[1].rule, "b@d");
        assert!(parse_strict("com\nfoo..bar\n").is_err());
    }

    #[test]
    fn test_default_list_covers_common_suffixes() {
        let list = SuffixList::default_list().unwrap();
        assert_eq!(list.registrable_domain("www.bbc.co.uk").as_deref(), Some("bbc.co.uk"));
        assert_eq!(list.registrable_domain("cdn.example.com").as_deref(), Some("example.com"));
        assert_eq!(list.registrable_domain("user.github.io").as_deref(), Some("user.github.io"));
        assert_eq!(list.registrable_domain("foo.bar.ck").as_deref(), Some("foo.bar.ck"));
        assert_eq!(list.registrable_domain("www.ck").as_deref(), Some("www.ck"));
        assert_eq!(list.registrable_domain("www.a.com.co").as_deref(), Some("a.com.co"));
        assert_eq!(list.registrable_domain("shop.b.co.ke").as_deref(), Some("b.co.ke"));
        assert_eq!(list.registrable_domain("x.y.com.sa").as_deref(), Some("y.com.sa"));
        assert_eq!(list.registrable_domain("foo.blogspot.com").as_deref(), Some("foo.blogspot.com"));
        assert_eq!(list.registrable_domain("city.kawasaki.jp").as_deref(), Some("city.kawasaki.jp"));
        assert_eq!(list.registrable_domain("a.b.kawasaki.jp").as_deref(), Some("a.b.kawasaki.jp"));
        assert_eq!(list.registrable_domain("com.co"), None);
        assert!(list.len() > 9000);
    }

    #[test]
    fn test_explicit_file_is_strict() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "com\nnot..valid").unwrap();
        assert!(load_suffix_list(Some(file.path())).is_err());

        let missing = file.path().with_extension("missing");
        assert!(load_suffix_list(Some(&missing)).is_err());
    }

    #[test]
    fn test_explicit_file_replaces_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "// only com\ncom").unwrap();
        let list = load_suffix_list(Some(file.path())).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.registrable_domain("www.bbc.co.uk").as_deref(), Some("co.uk"));
    }
}
