//! # ivr-core — protocol traits and data model for the IVR call-flow engine
//!
//! This crate defines the boundaries every other `ivr-*` crate builds on:
//!
//! | Concern | Types | What it does |
//! |---|---|---|
//! | Data model | [`flow::Flow`], [`flow::Node`], [`flow::Edge`] | The declarative call-flow graph |
//! | Host contract | [`host::HostSession`] | The telephony primitives a host adapter provides |
//! | Dispatch contract | [`handler::NodeHandlerFamily`] | What a node handler family must implement |
//! | Errors | [`error`] | One `#[non_exhaustive]` enum per component boundary |
//! | Logging | [`log::LogLevel`] | The host's six-level leveled sink |
//! | Identifiers | [`id`] | Typed wrappers for call/node/endpoint IDs |
//!
//! Every trait here is operation-defined: [`host::HostSession::execute`]
//! means "run this host application and wait," not "shell out to a
//! specific binary." This is what lets a FreeSWITCH adapter, an
//! Asterisk adapter, and a test double all satisfy the same contract.

#![deny(missing_docs)]

pub mod context;
pub mod duration;
pub mod error;
pub mod flow;
pub mod handler;
pub mod host;
pub mod id;
pub mod log;
pub mod opcode;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use context::CallContext;
pub use duration::DurationMs;
pub use error::{AuthError, ConfigError, DispatchError, InterpreterError, SessionError};
pub use flow::{Configuration, Edge, EndpointCatalog, Flow, GeneralSettings, Node, ProcessFlow};
pub use handler::{HandlerOutcome, NodeHandlerFamily};
pub use host::HostSession;
pub use id::{CallId, EndpointName, ExtensionId, NodeId};
pub use log::LogLevel;
