//! The **transfer** handler family (§4.4): opcodes 100, 101, 107, 108.
//!
//! 100/107 bridge immediately to an extension; 108 attempts an attended
//! bridge. All three hand control away from the script, so they return
//! [`HandlerOutcome::Terminated`] for this interpreter pass. 101
//! enqueues into a call-center queue and records `cc_last_nodeId` so
//! the agent-callback re-entry path (§4.6) can resume at this node's
//! children later.

use crate::common::ensure_answered;
use async_trait::async_trait;
use ivr_core::context::CallContext;
use ivr_core::error::DispatchError;
use ivr_core::flow::Node;
use ivr_core::handler::{HandlerOutcome, NodeHandlerFamily};
use ivr_core::host::AppArgs;

const TRANSFER_EXTENSION: i64 = 100;
const ENQUEUE_CALL_CENTER: i64 = 101;
const BLIND_TRANSFER: i64 = 107;
const ATTENDED_TRANSFER: i64 = 108;

/// Handles opcodes 100, 101, 107, 108.
pub struct TransferFamily;

impl TransferFamily {
    /// A fresh, stateless instance.
    pub fn new() -> Self {
        Self
    }
}

impl Default for TransferFamily {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeHandlerFamily for TransferFamily {
    fn family_name(&self) -> &str {
        "transfer"
    }

    async fn execute(
        &self,
        opcode: i64,
        node: &Node,
        ctx: &dyn CallContext,
    ) -> Result<HandlerOutcome, DispatchError> {
        ensure_answered(ctx).await;

        match opcode {
            TRANSFER_EXTENSION | BLIND_TRANSFER => {
                let extension = node.attr_str("TransferExtension").unwrap_or_default();
                ctx.host().execute("bridge", AppArgs::new([extension])).await;
                Ok(HandlerOutcome::Terminated)
            }
            ATTENDED_TRANSFER => {
                let extension = node.attr_str("TransferExtension").unwrap_or_default();
                ctx.host().execute("att_xfer", AppArgs::new([extension])).await;
                Ok(HandlerOutcome::Terminated)
            }
            ENQUEUE_CALL_CENTER => {
                let queue = node.attr_str("QueueName").unwrap_or_default();
                ctx.set_variable("cc_last_nodeId", node.node_id.to_string(), true).await;
                ctx.host().execute("callcenter", AppArgs::new([queue])).await;
                Ok(HandlerOutcome::Terminated)
            }
            other => Err(DispatchError::HandlerFailure {
                opcode: other,
                cause: "transfer family does not own this opcode".to_string(),
            }),
        }
    }
}
