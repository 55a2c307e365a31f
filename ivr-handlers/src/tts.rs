//! The **tts** handler family (§4.4): opcodes 330, 331.
//!
//! Configures the host's TTS engine/voice (from the node, falling back
//! to the conventional `flite`/`slt` default used elsewhere in the
//! engine — see the agent-callback apology in §4.6) and speaks the
//! node's text. 331 then collects DTMF exactly like the audio family's
//! play-and-collect variants (§4.3's opcode 105 kinship).

use crate::common::{ensure_answered, set_route_key};
use async_trait::async_trait;
use ivr_core::context::CallContext;
use ivr_core::error::DispatchError;
use ivr_core::flow::Node;
use ivr_core::handler::{HandlerOutcome, NodeHandlerFamily};
use std::time::Duration;

const SPEAK_TEXT: i64 = 330;
const SPEAK_AND_COLLECT: i64 = 331;

const DEFAULT_TTS_ENGINE: &str = "flite";
const DEFAULT_TTS_VOICE: &str = "slt";
const DEFAULT_MAX_DIGITS: u32 = 1;
const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Handles opcodes 330, 331.
pub struct TtsFamily;

impl TtsFamily {
    /// A fresh, stateless instance.
    pub fn new() -> Self {
        Self
    }

    async fn speak(&self, ctx: &dyn CallContext, node: &Node) {
        let engine = node.attr_str("TtsEngine").unwrap_or(DEFAULT_TTS_ENGINE);
        let voice = node.attr_str("TtsVoice").unwrap_or(DEFAULT_TTS_VOICE);
        ctx.host().set_tts_params(engine, voice).await;
        let text = node.attr_str("Text").unwrap_or_default();
        ctx.host().speak(text).await;
    }
}

impl Default for TtsFamily {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeHandlerFamily for TtsFamily {
    fn family_name(&self) -> &str {
        "tts"
    }

    async fn execute(
        &self,
        opcode: i64,
        node: &Node,
        ctx: &dyn CallContext,
    ) -> Result<HandlerOutcome, DispatchError> {
        ensure_answered(ctx).await;

        match opcode {
            SPEAK_TEXT => {
                self.speak(ctx, node).await;
                Ok(HandlerOutcome::Continue)
            }
            SPEAK_AND_COLLECT => {
                self.speak(ctx, node).await;
                let max_digits = node.attr_i64("MaxDigits").unwrap_or(DEFAULT_MAX_DIGITS as i64).max(1) as u32;
                let timeout_ms = node.attr_i64("Timeout").map(|v| v as u64).unwrap_or(DEFAULT_TIMEOUT_MS);
                let terminator = node.attr_str("Terminator").and_then(|s| s.chars().next());
                let collected = ctx
                    .host()
                    .collect_digits(1, max_digits, terminator, Duration::from_millis(timeout_ms))
                    .await;
                set_route_key(ctx, collected.digits).await;
                Ok(HandlerOutcome::Continue)
            }
            other => Err(DispatchError::HandlerFailure {
                opcode: other,
                cause: "tts family does not own this opcode".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivr_core::flow::Edge;
    use ivr_core::id::NodeId;
    use ivr_core::test_utils::{MockCallContext, MockHostSession, RecordedCall};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn node(op: i64, attrs: serde_json::Value) -> Node {
        Node {
            node_id: NodeId::new(1),
            node_name: None,
            operation_code: op,
            is_start_node: false,
            child_node_config: Vec::<Edge>::new(),
            attributes: attrs.as_object().cloned().unwrap_or_default().into_iter().collect::<HashMap<_, _>>(),
        }
    }

    #[tokio::test]
    async fn speak_uses_default_engine_and_voice_when_unset() {
        let host = Arc::new(MockHostSession::new());
        let ctx = MockCallContext::new(host.clone());
        let n = node(SPEAK_TEXT, serde_json::json!({"Text": "hello"}));

        TtsFamily::new().execute(SPEAK_TEXT, &n, &ctx).await.unwrap();
        let calls = host.calls();
        assert!(calls.contains(&RecordedCall::SetTtsParams("flite".to_string(), "slt".to_string())));
        assert!(calls.contains(&RecordedCall::Speak("hello".to_string())));
    }

    #[tokio::test]
    async fn speak_and_collect_writes_route_key() {
        let host = Arc::new(MockHostSession::new());
        host.queue_digits("5");
        let ctx = MockCallContext::new(host);
        let n = node(SPEAK_AND_COLLECT, serde_json::json!({"Text": "pick one", "MaxDigits": 1}));

        TtsFamily::new().execute(SPEAK_AND_COLLECT, &n, &ctx).await.unwrap();
        assert_eq!(ctx.get_variable(ivr_core::handler::ROUTE_KEY_VAR, "", false).await, "5");
    }
}
