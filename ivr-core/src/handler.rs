//! The node handler family boundary (§4.4).
//!
//! Any node handler family (audio, input, recording, transfer, api,
//! logic, tts, termination) implements [`NodeHandlerFamily`]. Families
//! are stored as `Arc<dyn NodeHandlerFamily>` in the dispatcher's
//! registry, keyed by the opcodes they claim.

use crate::context::CallContext;
use crate::error::DispatchError;
use crate::flow::Node;
use async_trait::async_trait;
use std::sync::Arc;

/// What a handler did, communicated back to the interpreter.
///
/// Most handlers return [`HandlerOutcome::Continue`] and let the
/// interpreter perform linear child lookup. A handler that has already
/// driven navigation itself (DTMF routing, logic branch, transfer,
/// termination) returns [`HandlerOutcome::Navigated`] or
/// [`HandlerOutcome::Terminated`] so the interpreter does not also try
/// to advance.
#[derive(Debug, Clone)]
pub enum HandlerOutcome {
    /// Return control to the interpreter for linear child lookup.
    Continue,
    /// The handler already selected and is executing the next node;
    /// the interpreter should not advance further on this call.
    Navigated,
    /// The call ended (hangup, transfer, enqueue). The interpreter's
    /// execution loop for this call is done.
    Terminated,
}

/// An object-safe node handler family.
///
/// Implementations are registered with the dispatcher and invoked under
/// a fault barrier (§4.3): a failure here is translated into a
/// [`DispatchError::HandlerFailure`] and counted, never a panic.
#[async_trait]
pub trait NodeHandlerFamily: Send + Sync {
    /// Human-readable family name (`"audio"`, `"transfer"`, …), used in
    /// logs and error messages.
    fn family_name(&self) -> &str;

    /// Execute the operation named by `node.operation_code` against
    /// `ctx`. The shared contract from §4.4 applies: on entry, the
    /// session must be answered (answer-if-needed is the caller's
    /// responsibility — see `ivr-flow`'s interpreter, which answers
    /// once at call start); on host failure, treat as empty input and
    /// let the interpreter's invalid-input/terminal-edge logic take
    /// over rather than propagating the host error.
    async fn execute(
        &self,
        opcode: i64,
        node: &Node,
        ctx: &dyn CallContext,
    ) -> Result<HandlerOutcome, DispatchError>;
}

/// A thread-safe handle to a registered handler family.
pub type HandlerFamilyRef = Arc<dyn NodeHandlerFamily>;

/// Reserved session-variable name a handler writes the value used for
/// keyed edge selection into: DTMF digits for input/audio-with-input
/// opcodes, or the branch label (`"true"`/`"false"`) for the logic
/// opcode. The interpreter reads this, not the handler's return value,
/// to perform DTMF-keyed child lookup (§4.5) — this is what lets the
/// logic handler (120) reuse the exact same edge-matching path as DTMF
/// routing instead of a parallel mechanism.
pub const ROUTE_KEY_VAR: &str = "__route_key";
