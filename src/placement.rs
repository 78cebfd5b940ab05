//! Placement of import files onto members.
//!
//! Placement is a hint. A member that does not own a file's keys still
//! imports it correctly because the store forwards misrouted writes; a poor
//! hint only costs network hops.

use crate::dataset::validate_dataset_name;
use crate::error::{Error, Result};
use crate::format::ExportFileName;
use crate::store::RegionService;
use crate::types::ImportRequest;
use std::collections::BTreeMap;
use std::path::{Path, MAIN_SEPARATOR};

/// Parse a `member,path` argument into a request for that member.
pub fn parse_member_file(arg: &str) -> Result<ImportRequest> {
    let (member, path) = arg.split_once(',').ok_or_else(|| {
        Error::argument(format!(
            "argument '{}' not valid, needs member name, comma then file",
            arg
        ))
    })?;

    let member = member.trim();
    let path = path.trim();
    if member.is_empty() || path.is_empty() {
        return Err(Error::argument(format!(
            "argument '{}' not valid, needs member name, comma then file",
            arg
        )));
    }

    let (file_dir, file_name) = split_path(path)?;
    let parsed = ExportFileName::parse_for_member(&file_name, member)?;
    let region = validate_dataset_name(&parsed.dataset)?;

    Ok(ImportRequest {
        member: Some(member.to_string()),
        file_dir,
        file_name,
        region,
    })
}

/// Parse a bare path into a request for the calling process.
pub fn parse_local_file(path: &str) -> Result<ImportRequest> {
    let (file_dir, file_name) = split_path(path.trim())?;
    let parsed = ExportFileName::parse(&file_name)?;
    let region = validate_dataset_name(&parsed.dataset)?;

    Ok(ImportRequest {
        member: None,
        file_dir,
        file_name,
        region,
    })
}

/// Requests built from a list of arguments, plus one error per rejected argument.
#[derive(Debug, Default)]
pub struct Placement {
    pub requests: Vec<ImportRequest>,
    pub rejected: Vec<(String, Error)>,
}

impl Placement {
    /// Requests grouped by target dataset, each dataset once, in name order.
    pub fn by_dataset(&self) -> BTreeMap<String, Vec<ImportRequest>> {
        group_by_dataset(&self.requests)
    }

    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Build requests from `member,path` pairs.
pub fn place_member_files<S: AsRef<str>>(args: &[S]) -> Placement {
    build(args, parse_member_file)
}

/// Build requests from bare paths.
pub fn place_local_files<S: AsRef<str>>(args: &[S]) -> Placement {
    build(args, parse_local_file)
}

fn build<S: AsRef<str>>(args: &[S], parse: fn(&str) -> Result<ImportRequest>) -> Placement {
    let mut placement = Placement::default();
    for arg in args {
        let arg = arg.as_ref();
        match parse(arg) {
            Ok(request) => placement.requests.push(request),
            Err(e) => {
                tracing::error!(argument = %arg, error = %e, "Rejected import argument");
                placement.rejected.push((arg.to_string(), e));
            }
        }
    }
    placement
}

/// Settle each request's dataset against the datasets `service` holds.
///
/// A file written by one member and routed to another still carries the
/// writer's segment in the parsed name (`orders.server2`). When that name
/// does not exist but the name without its last dotted token does, the
/// shorter name is the dataset.
pub fn resolve_datasets(requests: &[ImportRequest], service: &dyn RegionService) -> Vec<ImportRequest> {
    requests
        .iter()
        .map(|request| {
            let mut request = request.clone();
            if let Some(dataset) = writer_stripped(&request.region, service) {
                tracing::debug!(
                    file = %request.file_name,
                    parsed = %request.region,
                    dataset = %dataset,
                    "Dropped writer segment from dataset name"
                );
                request.region = dataset;
            }
            request
        })
        .collect()
}

fn writer_stripped(region: &str, service: &dyn RegionService) -> Option<String> {
    if service.region(region).is_some() {
        return None;
    }
    let (dataset, _writer) = region.rsplit_once('.')?;
    let dataset = validate_dataset_name(dataset).ok()?;
    service.region(&dataset).map(|_| dataset)
}

/// Group requests by target dataset.
pub fn group_by_dataset(requests: &[ImportRequest]) -> BTreeMap<String, Vec<ImportRequest>> {
    let mut groups: BTreeMap<String, Vec<ImportRequest>> = BTreeMap::new();
    for request in requests {
        groups
            .entry(request.region.clone())
            .or_default()
            .push(request.clone());
    }
    groups
}

fn split_path(path: &str) -> Result<(String, String)> {
    let file_name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::argument(format!("'{}' does not name a file", path)))?
        .to_string();

    let file_dir = match path.rfind(['/', MAIN_SEPARATOR]) {
        Some(i) => path[..i].to_string(),
        None => String::new(),
    };
    Ok((file_dir, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryService;

    #[test]
    fn test_member_pair() {
        let request = parse_member_file("server1,/data/export/orders.server1.1700.adp").unwrap();
        assert_eq!(request.member.as_deref(), Some("server1"));
        assert_eq!(request.file_dir, "/data/export");
        assert_eq!(request.file_name, "orders.server1.1700.adp");
        assert_eq!(request.region, "orders");
    }

    #[test]
    fn test_member_pair_without_member_segment() {
        let request = parse_member_file("server2,orders.1700.adp").unwrap();
        assert_eq!(request.file_dir, "");
        assert_eq!(request.region, "orders");
    }

    #[test]
    fn test_missing_comma_adds_nothing() {
        let placement = place_member_files(&["server1", "server1,orders.1.adp"]);
        assert_eq!(placement.requests.len(), 1);
        assert_eq!(placement.rejected.len(), 1);
        assert_eq!(placement.rejected[0].0, "server1");
        assert!(matches!(placement.rejected[0].1, Error::Argument(_)));
        assert!(!placement.is_clean());
    }

    #[test]
    fn test_malformed_pairs() {
        for bad in [",orders.1.adp", "server1,", "server1,orders.adp", "server1,__system.1.adp"] {
            assert!(
                matches!(parse_member_file(bad), Err(Error::Argument(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_writer_segment_resolved_against_service() {
        let service = MemoryService::new();
        service.create_region("orders");
        service.create_region("eu.orders");

        let placement = place_member_files(&[
            "server1,orders.server2.7.adp",
            "server1,orders.server1.7.adp",
            "server1,eu.orders.7.adp",
            "server1,missing.server2.7.adp",
        ]);
        assert!(placement.is_clean());
        assert_eq!(placement.requests[0].region, "orders.server2");

        let regions: Vec<_> = resolve_datasets(&placement.requests, &service)
            .into_iter()
            .map(|r| r.region)
            .collect();
        assert_eq!(regions, vec!["orders", "orders", "eu.orders", "missing.server2"]);
    }

    #[test]
    fn test_local_files_grouped_by_dataset() {
        let placement = place_local_files(&[
            "out/orders.2.adp",
            "out/customers.2.adp",
            "out/orders.3.adp",
        ]);
        assert!(placement.is_clean());
        assert!(placement.requests.iter().all(|r| r.member.is_none()));

        let groups = placement.by_dataset();
        let names: Vec<_> = groups.keys().cloned().collect();
        assert_eq!(names, vec!["customers", "orders"]);
        assert_eq!(groups["orders"].len(), 2);
    }
}
