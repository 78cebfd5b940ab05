//! Test fixtures for exercising the distributed path in one process.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         TestCluster                           │
//! │                                                               │
//! │   client service ── full handles to every dataset             │
//! │                                                               │
//! │   InProcessInvoker                                            │
//! │     ├── server1: FunctionHandler ── member view of datasets   │
//! │     ├── server2: FunctionHandler ── member view of datasets   │
//! │     └── ...                                                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use adp_transfer::config::TransferConfig;
//! use adp_transfer::testing::TestCluster;
//!
//! # async fn run() -> adp_transfer::Result<()> {
//! let cluster = TestCluster::new(3, TransferConfig::new().with_export_dir("/tmp/adp"))?;
//! let orders = cluster.add_partitioned("orders")?;
//! orders.insert(1i64, "x");
//!
//! let summary = cluster.distributed_session().export(&["orders"]).await?;
//! assert!(summary.is_success());
//! # Ok(())
//! # }
//! ```

mod fixture;

pub use fixture::TestCluster;
