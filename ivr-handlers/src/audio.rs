//! The **audio** handler family (§4.4): opcodes 10, 11, 30, 31, 50.
//!
//! Plain playback (10/11) returns control to the interpreter for linear
//! traversal. The "play + collect" variants (30/31) gather up to
//! `MaxDigits` DTMF digits and hand off to §4.5 DTMF-keyed routing via
//! [`common::set_route_key`].

use crate::common::{ensure_answered, resolve_sound_path, resolve_sound_path_raw, set_route_key};
use ivr_core::context::CallContext;
use ivr_core::error::DispatchError;
use ivr_core::flow::Node;
use ivr_core::handler::{HandlerOutcome, NodeHandlerFamily};
use ivr_core::host::AppArgs;
use async_trait::async_trait;
use std::time::Duration;

const PLAY_AUDIO: i64 = 10;
const PLAY_RECORDED: i64 = 11;
const PLAY_AND_COLLECT: i64 = 30;
const PLAY_MENU: i64 = 31;
const READ_NUMBER: i64 = 50;

const DEFAULT_MAX_DIGITS: u32 = 1;
const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Handles opcodes 10, 11, 30, 31, 50.
pub struct AudioFamily;

impl AudioFamily {
    /// A fresh, stateless instance.
    pub fn new() -> Self {
        Self
    }

    async fn play(&self, ctx: &dyn CallContext, node: &Node) -> Result<(), DispatchError> {
        let filename = node.attr_str("AudioFile").unwrap_or_default();
        let path = resolve_sound_path(ctx, filename).await;
        ctx.host().execute("playback", AppArgs::new([path])).await;
        Ok(())
    }

    async fn play_and_collect(&self, ctx: &dyn CallContext, node: &Node) -> Result<(), DispatchError> {
        self.play(ctx, node).await?;
        let max_digits = node.attr_i64("MaxDigits").unwrap_or(DEFAULT_MAX_DIGITS as i64).max(1) as u32;
        let timeout_ms = node.attr_i64("Timeout").map(|v| v as u64).unwrap_or(DEFAULT_TIMEOUT_MS);
        let terminator = node.attr_str("Terminator").and_then(|s| s.chars().next());

        let collected = ctx
            .host()
            .collect_digits(1, max_digits, terminator, Duration::from_millis(timeout_ms))
            .await;
        set_route_key(ctx, collected.digits).await;
        Ok(())
    }

    async fn read_number(&self, ctx: &dyn CallContext, node: &Node) -> Result<(), DispatchError> {
        let number = node.attr_str("NumberSequence").unwrap_or_default();
        for digit in number.chars().filter(|c| c.is_ascii_digit()) {
            let path = resolve_sound_path_raw(ctx, &format!("digits/{digit}.wav")).await;
            ctx.host().execute("playback", AppArgs::new([path])).await;
        }
        Ok(())
    }
}

impl Default for AudioFamily {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeHandlerFamily for AudioFamily {
    fn family_name(&self) -> &str {
        "audio"
    }

    async fn execute(
        &self,
        opcode: i64,
        node: &Node,
        ctx: &dyn CallContext,
    ) -> Result<HandlerOutcome, DispatchError> {
        ensure_answered(ctx).await;

        match opcode {
            PLAY_AUDIO | PLAY_RECORDED => {
                self.play(ctx, node).await?;
                Ok(HandlerOutcome::Continue)
            }
            PLAY_AND_COLLECT | PLAY_MENU => {
                self.play_and_collect(ctx, node).await?;
                Ok(HandlerOutcome::Continue)
            }
            READ_NUMBER => {
                self.read_number(ctx, node).await?;
                Ok(HandlerOutcome::Continue)
            }
            other => Err(DispatchError::HandlerFailure {
                opcode: other,
                cause: "audio family does not own this opcode".to_string(),
            }),
        }
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
            attributes: attrs
                .as_object()
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .collect::<HashMap<_, _>>(),
        }
    }

    #[tokio::test]
    async fn plain_playback_resolves_sound_path_and_continues() {
        let host = Arc::new(MockHostSession::new().with_global("sounds_dir", "/snd"));
        let ctx = MockCallContext::new(host.clone());
        let n = node(PLAY_AUDIO, serde_json::json!({"AudioFile": "welcome.wav"}));

        let outcome = AudioFamily::new().execute(PLAY_AUDIO, &n, &ctx).await.unwrap();
        assert!(matches!(outcome, HandlerOutcome::Continue));
        assert!(host.answered().await);
    }

    #[tokio::test]
    async fn play_and_collect_writes_route_key_from_digits() {
        let host = Arc::new(MockHostSession::new());
        host.queue_digits("2");
        let ctx = MockCallContext::new(host.clone());
        let n = node(
            PLAY_MENU,
            serde_json::json!({"AudioFile": "menu.wav", "MaxDigits": 1, "Timeout": 5000}),
        );

        AudioFamily::new().execute(PLAY_MENU, &n, &ctx).await.unwrap();
        let route_key = ctx.get_variable(ivr_core::handler::ROUTE_KEY_VAR, "", false).await;
        assert_eq!(route_key, "2");
    }

    #[tokio::test]
    async fn unknown_opcode_is_rejected() {
        let host = Arc::new(MockHostSession::new());
        let ctx = MockCallContext::new(host);
        let n = node(999, serde_json::json!({}));
        let err = AudioFamily::new().execute(999, &n, &ctx).await.unwrap_err();
        assert!(matches!(err, DispatchError::HandlerFailure { .. }));
    }
}
