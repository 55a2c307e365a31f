#![deny(missing_docs)]
//! # ivr-handlers — node handler families (§4.4, §4.8)
//!
//! One [`ivr_core::handler::NodeHandlerFamily`] implementation per
//! family named in the opcode table: [`audio`], [`input`],
//! [`recording`], [`transfer`], [`api`], [`logic`], [`tts`],
//! [`termination`]. [`presence`] is the agent-presence side effect the
//! interpreter's callback path invokes directly; it has no opcode and
//! is not registered with the dispatcher.

/// Shared helpers (answer-if-needed, sound-path resolution, route-key
/// handoff) reused by `ivr-flow`'s invalid-input re-prompt path.
pub mod common;

pub mod api;
pub mod audio;
pub mod input;
pub mod logic;
pub mod presence;
pub mod recording;
pub mod termination;
pub mod transfer;
pub mod tts;

pub use api::ApiFamily;
pub use audio::AudioFamily;
pub use input::InputFamily;
pub use logic::LogicFamily;
pub use recording::RecordingFamily;
pub use termination::TerminationFamily;
pub use transfer::TransferFamily;
pub use tts::TtsFamily;
