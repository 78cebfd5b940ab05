//! Messages exchanged between the coordinating process and members.

use crate::error::{RemoteExecutionError, Result};
use crate::types::{ImportRequest, ShardResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Work a member runs against its local view of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferFunction {
    /// Export the member's share, labelling the file with `timestamp`.
    ParallelExport { timestamp: u64 },

    /// Import every request whose member hint names the receiving member.
    ParallelImport { requests: Vec<ImportRequest> },
}

impl TransferFunction {
    pub fn name(&self) -> &'static str {
        match self {
            TransferFunction::ParallelExport { .. } => "parallel-export",
            TransferFunction::ParallelImport { .. } => "parallel-import",
        }
    }
}

/// One broadcast of a [`TransferFunction`] to the members hosting `region`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// Correlates member replies and log lines.
    pub id: Uuid,

    /// Dataset name without the leading separator.
    pub region: String,

    pub function: TransferFunction,
}

impl Invocation {
    pub fn new(region: impl Into<String>, function: TransferFunction) -> Self {
        Self {
            id: Uuid::new_v4(),
            region: region.into(),
            function,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// What a member returns on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionResult {
    Exported(ShardResult),
    Imported(Vec<ShardResult>),
}

impl FunctionResult {
    pub fn into_results(self) -> Vec<ShardResult> {
        match self {
            FunctionResult::Exported(result) => vec![result],
            FunctionResult::Imported(results) => results,
        }
    }
}

/// A member's reply as it crosses the transport.
pub type MemberReply = std::result::Result<FunctionResult, RemoteExecutionError>;

pub fn encode_reply(reply: &MemberReply) -> Result<Vec<u8>> {
    Ok(bincode::serialize(reply)?)
}

pub fn decode_reply(bytes: &[u8]) -> Result<MemberReply> {
    Ok(bincode::deserialize(bytes)?)
}
