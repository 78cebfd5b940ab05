//! Distributed coordination of export and import.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    DistributedTransfer                      │
//! │  Invocation ──► RemoteInvoker ──► member 1..N               │
//! │                                     │                       │
//! │                            FunctionHandler                  │
//! │                        (filter, LocalTransfer)              │
//! │                                     │                       │
//! │  collate ◄──────── MemberReply ◄────┘                       │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The coordinator does not know which members host a dataset; it
//! broadcasts to all of them and every member decides for itself what to do.

mod collate;
mod coordinator;
mod handler;
mod invoker;
mod messages;

pub use collate::{collate, Collation};
pub use coordinator::DistributedTransfer;
pub use handler::{clock_skew, select_requests, FunctionHandler};
pub use invoker::{InProcessInvoker, RemoteInvoker};
pub use messages::{
    decode_reply, encode_reply, FunctionResult, Invocation, MemberReply, TransferFunction,
};
