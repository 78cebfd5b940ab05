//! Dataset names and name patterns.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::BTreeSet;

/// Prefix reserved for system datasets. Never exported or imported.
pub const RESERVED_PREFIX: &str = "__";

/// Path separator between a parent and a child dataset.
pub const SEPARATOR: char = '/';

/// Wildcard accepted in export patterns.
pub const WILDCARD: char = '*';

/// Full path of a root dataset.
pub fn full_path(name: &str) -> String {
    format!("{}{}", SEPARATOR, name)
}

/// Whether a dataset name is reserved.
pub fn is_reserved(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}

/// Validate a dataset name and return it without its leading separator.
pub fn validate_dataset_name(raw: &str) -> Result<String> {
    let name = raw.strip_prefix(SEPARATOR).unwrap_or(raw);

    if name.is_empty() {
        return Err(Error::argument("dataset name is empty"));
    }
    if name.contains(SEPARATOR) {
        return Err(Error::argument(format!(
            "'{}' names a nested dataset, only root datasets are supported",
            raw
        )));
    }
    if is_reserved(name) {
        return Err(Error::argument(format!(
            "'{}' uses the reserved prefix '{}'",
            raw, RESERVED_PREFIX
        )));
    }

    Ok(name.to_string())
}

/// A literal dataset name or a wildcard pattern.
#[derive(Debug, Clone)]
pub enum DatasetPattern {
    Literal(String),
    Wildcard { raw: String, regex: Regex },
}

impl DatasetPattern {
    pub fn parse(raw: &str) -> Result<Self> {
        if !raw.contains(WILDCARD) {
            return validate_dataset_name(raw).map(DatasetPattern::Literal);
        }

        let body = raw.strip_prefix(SEPARATOR).unwrap_or(raw);
        if body.contains(SEPARATOR) {
            return Err(Error::argument(format!(
                "'{}' names a nested dataset, only root datasets are supported",
                raw
            )));
        }

        let pattern = body
            .split(WILDCARD)
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*?");
        let regex = Regex::new(&format!("^{}$", pattern))
            .map_err(|e| Error::argument(format!("'{}': {}", raw, e)))?;

        Ok(DatasetPattern::Wildcard {
            raw: raw.to_string(),
            regex,
        })
    }

    /// Whether `name` is selected. Reserved names never match a wildcard.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            DatasetPattern::Literal(literal) => literal == name,
            DatasetPattern::Wildcard { regex, .. } => !is_reserved(name) && regex.is_match(name),
        }
    }
}

/// Expand patterns against the available root datasets.
///
/// Literal names are kept even when absent so the caller can report them as
/// missing. Reserved names matched by a wildcard are skipped.
pub fn expand_patterns<S: AsRef<str>>(patterns: &[S], available: &[String]) -> Result<Vec<String>> {
    let mut selected = BTreeSet::new();

    for raw in patterns {
        match DatasetPattern::parse(raw.as_ref())? {
            DatasetPattern::Literal(name) => {
                selected.insert(name);
            }
            pattern @ DatasetPattern::Wildcard { .. } => {
                for name in available {
                    if is_reserved(name) {
                        tracing::debug!(dataset = %name, "Skipping reserved dataset");
                        continue;
                    }
                    if pattern.matches(name) {
                        selected.insert(name.clone());
                    }
                }
            }
        }
    }

    Ok(selected.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn available() -> Vec<String> {
        ["orders", "order_lines", "customers", "__system", "__orders_meta"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_validate_strips_leading_separator() {
        assert_eq!(validate_dataset_name("/orders").unwrap(), "orders");
        assert_eq!(validate_dataset_name("orders").unwrap(), "orders");
    }

    #[test]
    fn test_validate_rejects_nested_reserved_and_empty() {
        for bad in ["/orders/lines", "__system", "/__system", "", "/"] {
            assert!(
                matches!(validate_dataset_name(bad), Err(Error::Argument(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_wildcard_skips_reserved() {
        let names = expand_patterns(&["*"], &available()).unwrap();
        assert_eq!(names, vec!["customers", "order_lines", "orders"]);

        let names = expand_patterns(&["*orders*"], &available()).unwrap();
        assert_eq!(names, vec!["orders"]);
    }

    #[test]
    fn test_trailing_wildcard_and_literals() {
        let names = expand_patterns(&["order*", "/customers", "missing"], &available()).unwrap();
        assert_eq!(names, vec!["customers", "missing", "order_lines", "orders"]);
    }

    #[test]
    fn test_literal_reserved_is_an_error() {
        assert!(matches!(
            expand_patterns(&["__system"], &available()),
            Err(Error::Argument(_))
        ));
        // An explicit reserved-looking wildcard still selects nothing.
        assert!(expand_patterns(&["__*"], &available()).unwrap().is_empty());
    }

    #[test]
    fn test_pattern_metacharacters_are_literal() {
        let pattern = DatasetPattern::parse("a.b*").unwrap();
        assert!(pattern.matches("a.bc"));
        assert!(!pattern.matches("axbc"));
    }
}
