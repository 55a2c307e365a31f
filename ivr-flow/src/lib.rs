#![deny(missing_docs)]
//! # ivr-flow — the call-flow interpreter (§4.5, §4.6)
//!
//! A per-call state machine: locates the start node, dispatches each
//! node's opcode through [`ivr_dispatch::Dispatcher`], navigates linear
//! or DTMF-keyed child edges, enforces the loop guard, and re-enters at
//! the right place when a call returns from a call-center queue.
//!
//! The interpreter is constructed with an owned snapshot of the
//! `ProcessFlow` (§5: "a call in flight continues against the document
//! it first saw") and drives calls through [`ivr_core::context::CallContext`],
//! never the concrete `ivr-session::SessionContext` type.

use ivr_core::context::CallContext;
use ivr_core::error::InterpreterError;
use ivr_core::flow::{Node, ProcessFlow};
use ivr_core::handler::ROUTE_KEY_VAR;
use ivr_core::host::AppArgs;
use ivr_core::id::NodeId;
use ivr_dispatch::Dispatcher;
use ivr_handlers::presence::update_agent_presence;
use std::sync::Arc;
use std::time::Duration;

const INVALID_INPUT_PAUSE: Duration = Duration::from_millis(500);
const CALLBACK_APOLOGY_PAUSE: Duration = Duration::from_millis(1000);
const TTS_ENGINE: &str = "flite";
const TTS_VOICE: &str = "slt";
const APOLOGY_TEXT: &str = "Sorry, the agents are not available or busy at this moment";
const THANK_YOU_TEXT: &str = "Thank you";

/// A per-call interpreter bound to one immutable `ProcessFlow` snapshot
/// and the shared opcode dispatcher.
pub struct Interpreter {
    flow: ProcessFlow,
    dispatcher: Arc<Dispatcher>,
}

impl Interpreter {
    /// Bind an interpreter to a flow snapshot and dispatcher. This is
    /// the `initialize()` operation from §4.5: after this call the
    /// interpreter is ready to `start()` a call.
    pub fn initialize(flow: ProcessFlow, dispatcher: Arc<Dispatcher>) -> Self {
        Self { flow, dispatcher }
    }

    /// The first node flagged `IsStartNode == true`.
    pub fn find_start_node(&self) -> Option<&Node> {
        self.flow.find_start_node()
    }

    /// Look up a node by ID within this interpreter's flow snapshot.
    pub fn find_node_by_id(&self, id: NodeId) -> Option<&Node> {
        self.flow.find(id)
    }

    /// Linear child lookup: the first (only meaningful) edge.
    pub fn find_child_node(&self, node: &Node) -> Option<NodeId> {
        node.child_node_config.first().map(|e| e.child_node_id)
    }

    /// DTMF-keyed child lookup (§4.5): the first edge, in declaration
    /// order, whose `input_keys` compares string-equal (trimmed) to
    /// `digits` (§9 open-question resolution: leading zeros significant,
    /// surrounding whitespace is not).
    pub fn find_child_node_with_dtmf_input(&self, digits: &str, node: &Node) -> Option<NodeId> {
        let digits = digits.trim();
        node.child_node_config
            .iter()
            .find(|e| e.input_keys.as_deref().map(str::trim) == Some(digits))
            .map(|e| e.child_node_id)
    }

    /// Whether `node` declares at least one keyed edge (`InputKeys` set
    /// on a `ChildNodeConfig` entry). A node with keyed edges routes
    /// through [`Interpreter::find_child_node_with_dtmf_input`]
    /// unconditionally — including on an empty collected digit string,
    /// which then can't match any key and falls through to
    /// [`Interpreter::handle_invalid_input`] rather than being
    /// misread as "linear, take the first edge" (§4.4, §4.5).
    fn has_keyed_edges(node: &Node) -> bool {
        node.child_node_config.iter().any(|e| e.input_keys.is_some())
    }

    /// Start a call: answer (and wait for silence) if needed, locate
    /// the start node, and run the execution loop from it.
    pub async fn start(&self, ctx: &dyn CallContext) -> Result<(), InterpreterError> {
        ivr_handlers::common::ensure_answered(ctx).await;

        let start = self
            .find_start_node()
            .ok_or_else(|| InterpreterError::StartNodeError("no node is flagged as the start node".to_string()))?;
        self.execute_node(start, ctx).await
    }

    /// Run the execution loop starting at `entry`: dispatch, navigate,
    /// repeat, until a handler terminates the call, a terminal edge is
    /// reached, or the loop guard trips.
    pub async fn execute_node(&self, entry: &Node, ctx: &dyn CallContext) -> Result<(), InterpreterError> {
        let mut current = entry;

        loop {
            let visits = ctx.record_visit(current.node_id).await;
            if visits > ctx.visit_budget() {
                tracing::warn!(
                    level_name = "warning",
                    module = "flow",
                    node = %current.node_id,
                    visits,
                    "infinite loop detected"
                );
                ctx.host().hangup().await;
                return Err(InterpreterError::LoopGuardTripped {
                    node: current.node_id,
                    visits,
                });
            }

            ctx.unset_variable(ROUTE_KEY_VAR).await;
            let outcome = self.dispatcher.execute(current, ctx).await?;

            match outcome {
                ivr_core::handler::HandlerOutcome::Terminated => return Ok(()),
                ivr_core::handler::HandlerOutcome::Navigated => return Ok(()),
                ivr_core::handler::HandlerOutcome::Continue => {
                    let next_id = if Self::has_keyed_edges(current) {
                        let route_key = ctx.get_variable(ROUTE_KEY_VAR, "", false).await;
                        match self.find_child_node_with_dtmf_input(&route_key, current) {
                            Some(id) => Some(id),
                            None => {
                                self.handle_invalid_input(current, ctx).await?;
                                continue;
                            }
                        }
                    } else {
                        self.find_child_node(current)
                    };

                    match next_id {
                        Some(id) => match self.find_node_by_id(id) {
                            Some(node) => current = node,
                            None => return Err(InterpreterError::NodeNotFound(id)),
                        },
                        None => {
                            ctx.host().hangup().await;
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// No edge matched the collected input (§4.5): replay
    /// `InvalidInputAudioFile` if the node declares one, pause, and let
    /// the caller re-execute the same node (the visit budget is the
    /// sole retry cap, per §9).
    async fn handle_invalid_input(&self, node: &Node, ctx: &dyn CallContext) -> Result<(), InterpreterError> {
        if let Some(audio_file) = node.attr_str("InvalidInputAudioFile") {
            let path = ivr_handlers::common::resolve_sound_path(ctx, audio_file).await;
            ctx.host().execute("playback", AppArgs::new([path])).await;
        }
        ctx.host()
            .execute("sleep", AppArgs::new([INVALID_INPUT_PAUSE.as_millis().to_string()]))
            .await;
        Ok(())
    }

    /// Agent-callback re-entry (§4.6): the host re-enters the script on
    /// the original session after a call-center queue returns control,
    /// with `cc_*` variables describing what happened.
    pub async fn handle_agent_callback(&self, ctx: &dyn CallContext) -> Result<(), InterpreterError> {
        let cancel_reason = ctx.get_variable("cc_cancel_reason", "", true).await;
        let agent_bridged = ctx.get_variable("cc_agent_bridged", "", true).await;
        let agent = ctx.get_variable("cc_agent", "", true).await;

        if cancel_reason == "TIMEOUT" {
            ctx.host().set_tts_params(TTS_ENGINE, TTS_VOICE).await;
            ctx.host()
                .execute("sleep", AppArgs::new([CALLBACK_APOLOGY_PAUSE.as_millis().to_string()]))
                .await;
            ctx.host().speak(APOLOGY_TEXT).await;
            ctx.host()
                .execute("sleep", AppArgs::new([CALLBACK_APOLOGY_PAUSE.as_millis().to_string()]))
                .await;
            ctx.host().speak(THANK_YOU_TEXT).await;
            ctx.host()
                .execute("sleep", AppArgs::new([CALLBACK_APOLOGY_PAUSE.as_millis().to_string()]))
                .await;
            // §9: the source hangs up inside an `if ready()` arm, then
            // unconditionally again; double-hangup is a documented no-op.
            if ctx.host().ready().await {
                ctx.host().hangup().await;
            }
            ctx.host().hangup().await;
            return Ok(());
        }

        if agent_bridged == "true" {
            if !agent.is_empty() {
                update_agent_presence(ctx, &agent).await;
            }

            let last_node_id_str = ctx.get_variable("cc_last_nodeId", "", true).await;
            let last_node_id: i64 = last_node_id_str
                .parse()
                .map_err(|_| InterpreterError::StartNodeError(format!("invalid cc_last_nodeId: {last_node_id_str:?}")))?;
            let last_node = self
                .find_node_by_id(NodeId::new(last_node_id))
                .ok_or(InterpreterError::NodeNotFound(NodeId::new(last_node_id)))?;
            let next_id = self.find_child_node(last_node).ok_or(InterpreterError::EdgeResolutionFailure {
                node: last_node.node_id,
                digits: None,
            })?;
            let next_node = self.find_node_by_id(next_id).ok_or(InterpreterError::NodeNotFound(next_id))?;
            return self.execute_node(next_node, ctx).await;
        }

        ctx.host().hangup().await;
        Ok(())
    }
}
