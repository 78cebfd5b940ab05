//! Dispatch of transfer functions to members.

use super::handler::FunctionHandler;
use super::messages::{decode_reply, encode_reply, Invocation, MemberReply};
use crate::error::{RemoteExecutionError, Result};
use crate::types::MemberInfo;
use parking_lot::RwLock;
use std::fmt::Debug;
use std::sync::Arc;

/// Runs an invocation on every member hosting its dataset.
///
/// Implementations must not retry a failed member elsewhere: it may already
/// have written part of a file.
#[async_trait::async_trait]
pub trait RemoteInvoker: Send + Sync + Debug {
    /// Members currently hosting `region`.
    fn members_hosting(&self, region: &str) -> Vec<MemberInfo>;

    /// Send `invocation` to every hosting member and wait for all replies.
    async fn broadcast(&self, invocation: Invocation) -> Result<Vec<(MemberInfo, MemberReply)>>;
}

/// Invoker for members living in the current process.
///
/// Each member runs on its own task. Invocations and replies still go
/// through their serialized form so nothing relies on shared memory.
#[derive(Debug, Default)]
pub struct InProcessInvoker {
    handlers: RwLock<Vec<Arc<FunctionHandler>>>,
}

impl InProcessInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handler: Arc<FunctionHandler>) {
        tracing::debug!(member = %handler.member().name, "Member registered");
        self.handlers.write().push(handler);
    }

    /// Remove a member. Returns whether it was registered.
    pub fn deregister(&self, member: &str) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|h| h.member().name != member);
        before != handlers.len()
    }

    fn hosting(&self, region: &str) -> Vec<Arc<FunctionHandler>> {
        self.handlers
            .read()
            .iter()
            .filter(|h| h.hosts(region))
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl RemoteInvoker for InProcessInvoker {
    fn members_hosting(&self, region: &str) -> Vec<MemberInfo> {
        self.hosting(region)
            .iter()
            .map(|h| h.member().clone())
            .collect()
    }

    async fn broadcast(&self, invocation: Invocation) -> Result<Vec<(MemberInfo, MemberReply)>> {
        let payload = Arc::new(invocation.to_bytes()?);
        let targets = self.hosting(&invocation.region);

        tracing::info!(
            invocation = %invocation.id,
            function = invocation.function.name(),
            region = %invocation.region,
            members = targets.len(),
            "Broadcasting transfer function"
        );

        let mut tasks = Vec::with_capacity(targets.len());
        for handler in targets {
            let payload = Arc::clone(&payload);
            let member = handler.member().clone();
            let task = tokio::spawn(async move {
                let invocation = Invocation::from_bytes(&payload)?;
                let reply = handler.handle(&invocation).await;
                encode_reply(&reply)
            });
            tasks.push((member, task));
        }

        let mut replies = Vec::with_capacity(tasks.len());
        for (member, task) in tasks {
            let reply = match task.await {
                Ok(Ok(bytes)) => decode_reply(&bytes)?,
                Ok(Err(e)) => Err(RemoteExecutionError::capture(member.name.clone(), &e)),
                Err(join_error) => Err(RemoteExecutionError::new(
                    member.name.clone(),
                    format!("member task did not complete: {}", join_error),
                )),
            };
            replies.push((member, reply));
        }

        Ok(replies)
    }
}
