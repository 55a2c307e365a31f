//! The **logic** handler family (§4.4): opcode 120, conditional branch.
//!
//! Evaluates a declared predicate against a session variable and writes
//! the branch label (`"true"`/`"false"`) to the route key, reusing the
//! exact same DTMF-keyed edge-matching path as digit routing (§4.5)
//! instead of a parallel branch-selection mechanism.

use crate::common::set_route_key;
use async_trait::async_trait;
use ivr_core::context::CallContext;
use ivr_core::error::DispatchError;
use ivr_core::flow::Node;
use ivr_core::handler::{HandlerOutcome, NodeHandlerFamily};

const CONDITIONAL_BRANCH: i64 = 120;

/// Handles opcode 120.
pub struct LogicFamily;

impl LogicFamily {
    /// A fresh, stateless instance.
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogicFamily {
    fn default() -> Self {
        Self::new()
    }
}

fn evaluate(operator: &str, actual: &str, expected: &str) -> bool {
    match operator {
        "eq" => actual == expected,
        "ne" => actual != expected,
        "contains" => actual.contains(expected),
        "gt" | "lt" | "ge" | "le" => match (actual.parse::<f64>(), expected.parse::<f64>()) {
            (Ok(a), Ok(b)) => match operator {
                "gt" => a > b,
                "lt" => a < b,
                "ge" => a >= b,
                "le" => a <= b,
                _ => unreachable!(),
            },
            _ => false,
        },
        _ => false,
    }
}

#[async_trait]
impl NodeHandlerFamily for LogicFamily {
    fn family_name(&self) -> &str {
        "logic"
    }

    async fn execute(
        &self,
        opcode: i64,
        node: &Node,
        ctx: &dyn CallContext,
    ) -> Result<HandlerOutcome, DispatchError> {
        if opcode != CONDITIONAL_BRANCH {
            return Err(DispatchError::HandlerFailure {
                opcode,
                cause: "logic family does not own this opcode".to_string(),
            });
        }

        let variable = node.attr_str("Variable").unwrap_or_default();
        let operator = node.attr_str("Operator").unwrap_or("eq");
        let expected = node.attr_str("Value").unwrap_or_default();

        let actual = ctx.get_variable(variable, "", true).await;
        let branch = if evaluate(operator, &actual, expected) { "true" } else { "false" };
        set_route_key(ctx, branch).await;
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

    fn node(attrs: serde_json::Value) -> Node {
        Node {
            node_id: NodeId::new(1),
            node_name: None,
            operation_code: CONDITIONAL_BRANCH,
            is_start_node: false,
            child_node_config: Vec::<Edge>::new(),
            attributes: attrs.as_object().cloned().unwrap_or_default().into_iter().collect::<HashMap<_, _>>(),
        }
    }

    #[tokio::test]
    async fn equality_predicate_routes_true() {
        let host = Arc::new(MockHostSession::new().with_variable("selected_menu", "2"));
        let ctx = MockCallContext::new(host);
        let n = node(serde_json::json!({"Variable": "selected_menu", "Operator": "eq", "Value": "2"}));

        LogicFamily::new().execute(CONDITIONAL_BRANCH, &n, &ctx).await.unwrap();
        assert_eq!(ctx.get_variable(ivr_core::handler::ROUTE_KEY_VAR, "", false).await, "true");
    }

    #[tokio::test]
    async fn numeric_range_predicate_routes_false_when_out_of_range() {
        let host = Arc::new(MockHostSession::new().with_variable("wait_time", "30"));
        let ctx = MockCallContext::new(host);
        let n = node(serde_json::json!({"Variable": "wait_time", "Operator": "gt", "Value": "60"}));

        LogicFamily::new().execute(CONDITIONAL_BRANCH, &n, &ctx).await.unwrap();
        assert_eq!(ctx.get_variable(ivr_core::handler::ROUTE_KEY_VAR, "", false).await, "false");
    }
}
