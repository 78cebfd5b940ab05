//! Bulk export and import of datasets held in a partitioned key/value store.
//!
//! Each dataset is written to, and read back from, a self-describing record
//! stream. For a partitioned dataset the work runs once on every member that
//! owns a portion of it, and the per-member outcomes are collated into one
//! report.
//!
//! # Features
//!
//! - Tagged record streams with type hints and a counted footer
//! - Memory-bounded batch reads and writes
//! - Fan-out to every hosting member with sorted, greppable collation
//! - Placement hints for imports; misrouted writes still land correctly
//!
//! # Example
//!
//! ```rust,no_run
//! use adp_transfer::config::TransferConfig;
//! use adp_transfer::placement::place_local_files;
//! use adp_transfer::session::TransferSession;
//! use adp_transfer::store::MemoryService;
//! use adp_transfer::transfer::{LocalTransfer, Role};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> adp_transfer::Result<()> {
//!     let service = Arc::new(MemoryService::new());
//!     let orders = service.create_region("orders");
//!     orders.insert(1i64, "x");
//!
//!     let config = TransferConfig::from_env().with_export_dir("/tmp/adp");
//!     let transfer = Arc::new(LocalTransfer::new(Role::Client, config));
//!     let session = TransferSession::new(service, transfer);
//!
//!     let exported = session.export(&["orders"]).await?;
//!     let paths: Vec<String> = exported
//!         .results
//!         .iter()
//!         .map(|r| r.path().display().to_string())
//!         .collect();
//!
//!     let imported = session.import_placement(place_local_files(paths.as_slice())).await;
//!     assert!(imported.is_success());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              TransferSession                 │
//! │  • export(patterns) -> RunSummary            │
//! │  • import_placement(placement) -> RunSummary │
//! └─────────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴────────────┐
//!         ▼                        ▼
//! ┌───────────────┐      ┌─────────────────────┐
//! │ LocalTransfer │      │ DistributedTransfer │
//! └───────────────┘      └─────────────────────┘
//!         │                        │ per member
//!         ▼                        ▼
//! ┌─────────────────────────────────────────────┐
//! │   TransferEngine ── RecordWriter/Reader      │
//! └─────────────────────────────────────────────┘
//! ```

pub mod cluster;
pub mod codec;
pub mod config;
pub mod dataset;
pub mod error;
pub mod format;
pub mod locator;
pub mod metrics;
pub mod placement;
pub mod session;
pub mod store;
pub mod testing;
pub mod transfer;
pub mod types;

pub use config::TransferConfig;
pub use error::{Error, RemoteExecutionError, Result};
pub use types::{ImportRequest, MemberInfo, MemberName, ShardResult, TransferDirection};

// Re-export codec and format types
pub use codec::{BincodeCodec, Value, ValueCodec, ValueKind};
pub use format::{ExportFileName, FileType, FormatError, RecordReader, RecordWriter};

// Re-export transfer types
pub use cluster::{DistributedTransfer, FunctionHandler, InProcessInvoker, RemoteInvoker};
pub use placement::Placement;
pub use session::{RunSummary, TransferSession};
pub use transfer::{DataTransfer, LocalTransfer, Role, TransferEngine};

// Re-export store types
pub use store::{KeyScope, MemoryRegion, MemoryService, Region, RegionKind, RegionService, ShardedRegion};

pub use metrics::{TransferMetrics, TransferMetricsSnapshot};
pub use testing::TestCluster;
