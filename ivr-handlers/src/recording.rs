//! The **recording** handler family (§4.4): opcodes 40, 341.
//!
//! Writes caller audio to a host-provided filename template and
//! records the resulting length/file-size as session variables on
//! success. 341 layers recording options (max length, silence
//! threshold, beep) onto the same primitive.

use crate::common::ensure_answered;
use async_trait::async_trait;
use ivr_core::context::CallContext;
use ivr_core::error::DispatchError;
use ivr_core::flow::Node;
use ivr_core::handler::{HandlerOutcome, NodeHandlerFamily};
use ivr_core::host::AppArgs;

const RECORD: i64 = 40;
const RECORD_WITH_OPTIONS: i64 = 341;

const DEFAULT_MAX_LENGTH_SECS: i64 = 120;
const DEFAULT_SILENCE_THRESHOLD: i64 = 500;

/// Handles opcodes 40, 341.
pub struct RecordingFamily;

impl RecordingFamily {
    /// A fresh, stateless instance.
    pub fn new() -> Self {
        Self
    }
}

impl Default for RecordingFamily {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeHandlerFamily for RecordingFamily {
    fn family_name(&self) -> &str {
        "recording"
    }

    async fn execute(
        &self,
        opcode: i64,
        node: &Node,
        ctx: &dyn CallContext,
    ) -> Result<HandlerOutcome, DispatchError> {
        ensure_answered(ctx).await;

        if opcode != RECORD && opcode != RECORD_WITH_OPTIONS {
            return Err(DispatchError::HandlerFailure {
                opcode,
                cause: "recording family does not own this opcode".to_string(),
            });
        }

        let filename = node.attr_str("RecordingFile").unwrap_or("recording.wav");
        let max_length = node.attr_i64("MaxLength").unwrap_or(DEFAULT_MAX_LENGTH_SECS);
        let silence_threshold = node
            .attr_i64("SilenceThreshold")
            .unwrap_or(DEFAULT_SILENCE_THRESHOLD);

        ctx.host()
            .execute(
                "record",
                AppArgs::new([filename.to_string(), max_length.to_string(), silence_threshold.to_string()]),
            )
            .await;

        if let Some(report) = ctx.host().execute_string(&format!("record_stat {filename}")).await {
            let mut parts = report.splitn(2, ',');
            if let Some(length) = parts.next() {
                ctx.set_variable("last_recording_length", length.to_string(), true).await;
            }
            if let Some(size) = parts.next() {
                ctx.set_variable("last_recording_file_size", size.to_string(), true).await;
            }
        }

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
    async fn successful_recording_stores_length_and_size() {
        let host = Arc::new(MockHostSession::new());
        host.queue_string_result(Some("12.5,204800".to_string()));
        let ctx = MockCallContext::new(host);
        let n = node(RECORD, serde_json::json!({"RecordingFile": "call.wav"}));

        let outcome = RecordingFamily::new().execute(RECORD, &n, &ctx).await.unwrap();
        assert!(matches!(outcome, HandlerOutcome::Continue));
        assert_eq!(ctx.get_variable("last_recording_length", "", true).await, "12.5");
        assert_eq!(ctx.get_variable("last_recording_file_size", "", true).await, "204800");
    }

    #[tokio::test]
    async fn missing_stat_report_leaves_variables_unset() {
        let host = Arc::new(MockHostSession::new());
        let ctx = MockCallContext::new(host);
        let n = node(RECORD_WITH_OPTIONS, serde_json::json!({}));

        RecordingFamily::new().execute(RECORD_WITH_OPTIONS, &n, &ctx).await.unwrap();
        assert_eq!(ctx.get_variable("last_recording_length", "missing", true).await, "missing");
    }
}
