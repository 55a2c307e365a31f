//! The host session protocol — the telephony platform primitives the
//! interpreter and handlers drive (§6). Out of scope to implement: call
//! answering, media playback, DTMF collection, and bridge/transfer are
//! owned by the softswitch itself. This crate only specifies the trait
//! boundary a host adapter must satisfy.

use async_trait::async_trait;
use serde_json::Value;

/// Arguments passed to [`HostSession::execute`] for a host "app"
/// invocation (`playback`, `wait_for_silence`, `sleep`, …).
#[derive(Debug, Clone, Default)]
pub struct AppArgs(pub Vec<String>);

impl AppArgs {
    /// Build app args from string-like values.
    pub fn new(args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(args.into_iter().map(Into::into).collect())
    }
}

/// The telephony session contract consumed by session context, node
/// handlers, and the interpreter.
///
/// Implementations adapt a concrete softswitch API (FreeSWITCH,
/// Asterisk, a proprietary platform) to this trait. A call is
/// single-threaded cooperative: no method should be invoked
/// concurrently against the same session.
#[async_trait]
pub trait HostSession: Send + Sync {
    /// Whether the session is still live (not hung up).
    async fn ready(&self) -> bool;

    /// Whether media has been answered on this leg.
    async fn answered(&self) -> bool;

    /// Answer the call.
    async fn answer(&self);

    /// Hang up. Idempotent: a second call on an already-hung-up session
    /// is a documented no-op (§9 open question resolution).
    async fn hangup(&self);

    /// Read a call variable. `None` if unset.
    async fn get_variable(&self, name: &str) -> Option<String>;

    /// Set a call variable, or clear it when `value` is `None`.
    async fn set_variable(&self, name: &str, value: Option<&str>);

    /// Run a host "application" (`playback`, `wait_for_silence`,
    /// `sleep`, a bridge/transfer primitive) and wait for completion.
    async fn execute(&self, app: &str, args: AppArgs);

    /// Invoke the host TTS engine on `text` using the currently
    /// configured engine/voice.
    async fn speak(&self, text: &str);

    /// Configure the TTS engine/voice used by subsequent `speak` calls.
    async fn set_tts_params(&self, engine: &str, voice: &str);

    /// Read a global (process-wide, not per-call) variable such as
    /// `script_dir` or `sounds_dir`.
    async fn global_variable(&self, name: &str) -> Option<String>;

    /// Execute an out-of-band command string against the generic API
    /// handle (`sofia_contact <ext>`, `callcenter_config agent set …`)
    /// and return its raw string result.
    async fn execute_string(&self, cmd: &str) -> Option<String>;

    /// Collect DTMF digits, honoring `min_digits`/`max_digits`,
    /// `terminator` (absent disables early termination by key), and a
    /// per-collection timeout. A host failure or timeout with no
    /// digits yields an empty, non-terminated [`CollectedDigits`]
    /// rather than propagating an error (§4.4 shared contract).
    async fn collect_digits(
        &self,
        min_digits: u32,
        max_digits: u32,
        terminator: Option<char>,
        timeout: std::time::Duration,
    ) -> CollectedDigits;
}

/// Outcome of a DTMF collection primitive, as produced by the `input`
/// and `audio` handler families.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedDigits {
    /// Digits collected, possibly empty on timeout or host failure.
    pub digits: String,
    /// Whether collection ended because the terminator digit was seen.
    pub terminated: bool,
}

/// A host-issued HTTP response, returned by whatever client
/// implementation the host adapter wires in (§6: "any conformant HTTP
/// client satisfies the contract").
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw UTF-8 response body.
    pub body: String,
}

impl HttpResponse {
    /// Parse the body as JSON, if it is well-formed.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}
