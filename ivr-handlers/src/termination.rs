//! The **termination** handler family (§4.4): opcode 200.
//!
//! Issues a host hangup and never returns control to the interpreter.

use async_trait::async_trait;
use ivr_core::context::CallContext;
use ivr_core::error::DispatchError;
use ivr_core::flow::Node;
use ivr_core::handler::{HandlerOutcome, NodeHandlerFamily};

const HANGUP: i64 = 200;

/// Handles opcode 200.
pub struct TerminationFamily;

impl TerminationFamily {
    /// A fresh, stateless instance.
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminationFamily {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeHandlerFamily for TerminationFamily {
    fn family_name(&self) -> &str {
        "termination"
    }

    async fn execute(
        &self,
        opcode: i64,
        _node: &Node,
        ctx: &dyn CallContext,
    ) -> Result<HandlerOutcome, DispatchError> {
        if opcode != HANGUP {
            return Err(DispatchError::HandlerFailure {
                opcode,
                cause: "termination family does not own this opcode".to_string(),
            });
        }
        ctx.host().hangup().await;
        Ok(HandlerOutcome::Terminated)
    }
}
