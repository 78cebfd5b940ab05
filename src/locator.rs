//! Locator list parsing.
//!
//! A run is pointed at a cluster through exactly two locators, written either
//! as `host[port],host[port]` or `host:port,host:port`.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Number of locators a connection string must list.
pub const LOCATOR_COUNT: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    pub host: String,
    pub port: u16,
}

impl Locator {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl FromStr for Locator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (host, port) = s
            .strip_suffix(']')
            .and_then(|rest| rest.split_once('['))
            .or_else(|| s.rsplit_once(':'))
            .ok_or_else(|| Error::argument(format!("could not parse '{}' as \"host[port]\"", s)))?;

        if host.is_empty() {
            return Err(Error::argument(format!("'{}' has no host", s)));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| Error::argument(format!("'{}' has an invalid port", s)))?;

        Ok(Locator::new(host, port))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.host, self.port)
    }
}

/// Parse a comma-separated locator list.
pub fn parse_locators(arg: &str) -> Result<Vec<Locator>> {
    let parts: Vec<&str> = arg.split(',').collect();
    if parts.len() != LOCATOR_COUNT {
        return Err(Error::argument(format!(
            "'{}' should list two locators separated by a comma",
            arg
        )));
    }

    parts.into_iter().map(str::parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_styles() {
        let locators = parse_locators("alpha[10334],beta:10335").unwrap();
        assert_eq!(
            locators,
            vec![Locator::new("alpha", 10334), Locator::new("beta", 10335)]
        );
        assert_eq!(locators[0].to_string(), "alpha[10334]");
    }

    #[test]
    fn test_wrong_count() {
        assert!(matches!(parse_locators("alpha[1]"), Err(Error::Argument(_))));
        assert!(matches!(
            parse_locators("a[1],b[2],c[3]"),
            Err(Error::Argument(_))
        ));
    }

    #[test]
    fn test_unparseable_locator() {
        for bad in ["alpha,beta[1]", "alpha[x],beta[1]", "[1],beta[2]", "alpha[70000],b[1]"] {
            assert!(
                matches!(parse_locators(bad), Err(Error::Argument(_))),
                "{bad} should be rejected"
            );
        }
    }
}
