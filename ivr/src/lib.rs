#![deny(missing_docs)]
//! # ivr — umbrella crate
//!
//! A single import surface over the engine's crates, plus a `prelude`
//! and the [`bootstrap`] wiring the system overview's "Bootstrap" line
//! describes: build a [`ConfigStore`](ivr_config::ConfigStore), a
//! [`Dispatcher`](ivr_dispatch::Dispatcher) with every handler family
//! registered, and an [`Interpreter`](ivr_flow::Interpreter) bound to
//! the currently published flow — ready to drive one call's
//! [`SessionContext`](ivr_session::SessionContext).

pub use ivr_auth;
pub use ivr_config;
pub use ivr_core;
pub use ivr_dispatch;
pub use ivr_flow;
pub use ivr_handlers;
pub use ivr_session;

/// Happy-path imports for wiring an engine instance.
pub mod prelude {
    pub use ivr_auth::{TokenCache, TokenCacheConfig};
    pub use ivr_config::{ConfigStore, DocumentName, FileNames};
    pub use ivr_core::context::CallContext;
    pub use ivr_core::error::InterpreterError;
    pub use ivr_core::host::HostSession;
    pub use ivr_dispatch::Dispatcher;
    pub use ivr_flow::Interpreter;
    pub use ivr_session::SessionContext;
}

pub mod bootstrap;
