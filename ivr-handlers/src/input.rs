//! The **input** handler family (§4.4): opcodes 20, 105.
//!
//! Raw DTMF collection honoring per-node `MinDigits`/`MaxDigits`/
//! `Terminator`/`Timeout`. Short input or a timeout is not special-cased
//! here: the collected (possibly empty) digits are written to the route
//! key and the interpreter's DTMF-keyed lookup naturally falls through
//! to `handle_invalid_input` when nothing matches.

use crate::common::{ensure_answered, set_route_key};
use async_trait::async_trait;
use ivr_core::context::CallContext;
use ivr_core::error::DispatchError;
use ivr_core::flow::Node;
use ivr_core::handler::{HandlerOutcome, NodeHandlerFamily};
use std::time::Duration;

const COLLECT_DTMF: i64 = 20;
const COLLECT_MULTI_DIGIT: i64 = 105;

const DEFAULT_MIN_DIGITS: u32 = 1;
const DEFAULT_MAX_DIGITS: u32 = 1;
const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Handles opcodes 20, 105.
pub struct InputFamily;

impl InputFamily {
    /// A fresh, stateless instance.
    pub fn new() -> Self {
        Self
    }
}

impl Default for InputFamily {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeHandlerFamily for InputFamily {
    fn family_name(&self) -> &str {
        "input"
    }

    async fn execute(
        &self,
        opcode: i64,
        node: &Node,
        ctx: &dyn CallContext,
    ) -> Result<HandlerOutcome, DispatchError> {
        ensure_answered(ctx).await;

        if opcode != COLLECT_DTMF && opcode != COLLECT_MULTI_DIGIT {
            return Err(DispatchError::HandlerFailure {
                opcode,
                cause: "input family does not own this opcode".to_string(),
            });
        }

        let min_digits = node.attr_i64("MinDigits").unwrap_or(DEFAULT_MIN_DIGITS as i64).max(0) as u32;
        let max_digits = node
            .attr_i64("MaxDigits")
            .unwrap_or(DEFAULT_MAX_DIGITS as i64)
            .max(min_digits as i64) as u32;
        let timeout_ms = node.attr_i64("Timeout").map(|v| v as u64).unwrap_or(DEFAULT_TIMEOUT_MS);
        let terminator = node.attr_str("Terminator").and_then(|s| s.chars().next());

        let collected = ctx
            .host()
            .collect_digits(min_digits, max_digits, terminator, Duration::from_millis(timeout_ms))
            .await;
        set_route_key(ctx, collected.digits).await;
        Ok(HandlerOutcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivr_core::flow::Edge;
    use ivr_core::id::NodeId;
    use ivr_core::test_utils::{MockCallContext, MockHostSession};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn node(op: i64, attrs: serde_json::Value) -> Node {
        Node {
            node_id: NodeId::new(1),
            node_name: None,
            operation_code: op,
            is_start_node: true,
            child_node_config: Vec::<Edge>::new(),
            attributes: attrs.as_object().cloned().unwrap_or_default().into_iter().collect::<HashMap<_, _>>(),
        }
    }

    #[tokio::test]
    async fn short_input_still_writes_whatever_was_collected() {
        let host = Arc::new(MockHostSession::new());
        host.queue_digits("1");
        let ctx = MockCallContext::new(host);
        let n = node(COLLECT_DTMF, serde_json::json!({"MinDigits": 4, "MaxDigits": 4, "Timeout": 5000}));

        let outcome = InputFamily::new().execute(COLLECT_DTMF, &n, &ctx).await.unwrap();
        assert!(matches!(outcome, HandlerOutcome::Continue));
        assert_eq!(ctx.get_variable(ivr_core::handler::ROUTE_KEY_VAR, "", false).await, "1");
    }

    #[tokio::test]
    async fn no_digits_collected_on_host_timeout_yields_empty_route_key() {
        let host = Arc::new(MockHostSession::new());
        let ctx = MockCallContext::new(host);
        let n = node(COLLECT_MULTI_DIGIT, serde_json::json!({"MaxDigits": 6}));

        InputFamily::new().execute(COLLECT_MULTI_DIGIT, &n, &ctx).await.unwrap();
        assert_eq!(ctx.get_variable(ivr_core::handler::ROUTE_KEY_VAR, "", false).await, "");
    }
}
