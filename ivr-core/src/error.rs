//! Error types for each component boundary.
//!
//! Every call path surfaces a distinct error kind rather than a single
//! opaque string, so callers (and tests) can match on what actually
//! failed instead of scraping messages.

use crate::id::NodeId;
use thiserror::Error;

/// Configuration store errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The named logical document has no resolvable file on disk.
    #[error("config not found: {0}")]
    ConfigNotFound(String),

    /// The file exists but is not valid JSON.
    #[error("config parse error in {name}: {cause}")]
    ConfigParseError {
        /// Logical document name.
        name: String,
        /// Underlying parse failure.
        cause: String,
    },

    /// The document parsed but failed schema validation.
    #[error("config validation error in {name}.{field}: {reason}")]
    ConfigValidationError {
        /// Logical document name.
        name: String,
        /// Field or structural path that failed validation.
        field: String,
        /// Human-readable reason.
        reason: String,
    },

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Operation dispatcher errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DispatchError {
    /// `OperationCode` is not in the dispatcher's closed domain.
    #[error("unknown opcode: {0}")]
    UnknownOpcode(i64),

    /// A handler family's `execute` failed or panicked.
    #[error("handler failure in opcode {opcode}: {cause}")]
    HandlerFailure {
        /// The opcode being handled.
        opcode: i64,
        /// Cause of the failure.
        cause: String,
    },

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Session context errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SessionError {
    /// The host session has not answered and cannot be driven yet.
    #[error("session not ready")]
    SessionNotReady,

    /// The host session has hung up; the call is over.
    #[error("session hung up")]
    SessionHungUp,

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Auth / token cache errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token endpoint could not be reached at all (network/transport).
    #[error("token endpoint unreachable: {0}")]
    TokenEndpointUnreachable(String),

    /// The token endpoint responded but rejected the request.
    #[error("token endpoint rejected request: {0}")]
    TokenEndpointRejected(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Call-flow interpreter errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum InterpreterError {
    /// A node was visited more times than `visit_budget` allows.
    #[error("loop guard tripped at node {node} after {visits} visits")]
    LoopGuardTripped {
        /// The node that tripped the guard.
        node: NodeId,
        /// Number of visits recorded when the guard tripped.
        visits: u32,
    },

    /// No edge matched the collected DTMF digits (or a linear child
    /// could not be resolved).
    #[error("edge resolution failure at node {node}: digits={digits:?}")]
    EdgeResolutionFailure {
        /// The node whose children could not be resolved.
        node: NodeId,
        /// Digits collected, if any.
        digits: Option<String>,
    },

    /// No node is flagged as the start node, or more than one is.
    #[error("start node error: {0}")]
    StartNodeError(String),

    /// A referenced node ID does not exist in the `ProcessFlow`.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// A session-level error propagated up through the interpreter.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// A dispatcher-level error propagated up through the interpreter.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
