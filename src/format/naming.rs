//! Export file names.
//!
//! `<dataset>[.<member>].<timestamp>.<suffix>`. The member segment is only
//! present for files written by a dataset-hosting member.

use super::record::FileType;
use crate::error::{Error, Result};
use std::fmt;

const TOKEN_SEPARATOR: char = '.';

/// Components of an export file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFileName {
    pub dataset: String,
    pub member: Option<String>,
    pub timestamp: u64,
    pub file_type: FileType,
}

impl ExportFileName {
    pub fn new(
        dataset: impl Into<String>,
        member: Option<&str>,
        timestamp: u64,
        file_type: FileType,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            member: member.map(str::to_string),
            timestamp,
            file_type,
        }
    }

    /// Render the file name.
    pub fn file_name(&self) -> String {
        match &self.member {
            Some(member) => format!(
                "{}.{}.{}.{}",
                self.dataset,
                member,
                self.timestamp,
                self.file_type.suffix()
            ),
            None => format!(
                "{}.{}.{}",
                self.dataset,
                self.timestamp,
                self.file_type.suffix()
            ),
        }
    }

    /// Parse a file name without a member segment.
    ///
    /// Every token but the last two is part of the dataset name, so dataset
    /// names may themselves contain dots.
    pub fn parse(name: &str) -> Result<Self> {
        let tokens: Vec<&str> = name.split(TOKEN_SEPARATOR).collect();
        if tokens.len() < 3 || tokens.iter().any(|t| t.is_empty()) {
            return Err(Error::argument(format!(
                "'{}' is not of the form <dataset>.<timestamp>.<suffix>",
                name
            )));
        }

        let n = tokens.len();
        let file_type: FileType = tokens[n - 1]
            .parse()
            .map_err(|e| Error::argument(format!("'{}': {}", name, e)))?;
        let timestamp = tokens[n - 2].parse::<u64>().map_err(|_| {
            Error::argument(format!("'{}': '{}' is not a timestamp", name, tokens[n - 2]))
        })?;

        Ok(Self {
            dataset: tokens[..n - 2].join("."),
            member: None,
            timestamp,
            file_type,
        })
    }

    /// Parse a file name that may carry the given member's segment.
    ///
    /// The segment before the timestamp is taken as the member when it equals
    /// `member` ignoring case and at least one dataset token remains.
    pub fn parse_for_member(name: &str, member: &str) -> Result<Self> {
        let mut parsed = Self::parse(name)?;
        if let Some((dataset, last)) = parsed.dataset.rsplit_once(TOKEN_SEPARATOR) {
            if last.eq_ignore_ascii_case(member) {
                parsed.member = Some(last.to_string());
                parsed.dataset = dataset.to_string();
            }
        }
        Ok(parsed)
    }
}

impl fmt::Display for ExportFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_name_round_trips() {
        let name = ExportFileName::new("orders", None, 1700000000000, FileType::Adp);
        assert_eq!(name.file_name(), "orders.1700000000000.adp");
        assert_eq!(ExportFileName::parse(&name.file_name()).unwrap(), name);
    }

    #[test]
    fn test_member_name_round_trips() {
        let name = ExportFileName::new("orders", Some("server1"), 5, FileType::Adp);
        assert_eq!(name.file_name(), "orders.server1.5.adp");
        assert_eq!(
            ExportFileName::parse_for_member(&name.file_name(), "SERVER1")
                .unwrap()
                .dataset,
            "orders"
        );

        // Without the member it reads as a dotted dataset name.
        assert_eq!(
            ExportFileName::parse(&name.file_name()).unwrap().dataset,
            "orders.server1"
        );
    }

    #[test]
    fn test_dotted_dataset_name() {
        let parsed = ExportFileName::parse("eu.orders.v2.99.adp").unwrap();
        assert_eq!(parsed.dataset, "eu.orders.v2");
        assert_eq!(parsed.timestamp, 99);
    }

    #[test]
    fn test_rejects_malformed_names() {
        for bad in ["orders.adp", "orders", "orders.abc.adp", "orders.1.csv", "orders..1.adp"] {
            assert!(
                matches!(ExportFileName::parse(bad), Err(Error::Argument(_))),
                "{bad} should be rejected"
            );
        }
    }
}
