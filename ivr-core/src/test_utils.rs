//! In-memory [`host::HostSession`] for testing. Available behind the
//! `test-utils` feature flag.

use crate::context::CallContext;
use crate::host::{AppArgs, CollectedDigits, HostSession};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Records every call made against it so tests can assert exact
/// sequences (e.g. S1/S5 in the node handler and interpreter suites).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    /// `answer()` was invoked.
    Answer,
    /// `hangup()` was invoked.
    Hangup,
    /// `execute(app, args)` was invoked.
    Execute(String, Vec<String>),
    /// `speak(text)` was invoked.
    Speak(String),
    /// `set_tts_params(engine, voice)` was invoked.
    SetTtsParams(String, String),
    /// `execute_string(cmd)` was invoked.
    ExecuteString(String),
}

/// A `HostSession` double backed by in-memory maps and a call log.
///
/// `ready`/`answered` start `true`/`false` and can be mutated through
/// `set_ready`/`set_answered` to simulate hangup or answer mid-test.
/// DTMF collection is simulated via `queued_digits`, which
/// `collect_digits`-style callers (the `input`/`audio` handler
/// families) drain in FIFO order.
pub struct MockHostSession {
    ready: Mutex<bool>,
    answered: Mutex<bool>,
    variables: Mutex<std::collections::HashMap<String, String>>,
    globals: Mutex<std::collections::HashMap<String, String>>,
    calls: Mutex<Vec<RecordedCall>>,
    queued_digits: Mutex<std::collections::VecDeque<String>>,
    queued_strings: Mutex<std::collections::VecDeque<Option<String>>>,
}

impl MockHostSession {
    /// Create a ready-but-not-answered session with no preset state.
    pub fn new() -> Self {
        Self {
            ready: Mutex::new(true),
            answered: Mutex::new(false),
            variables: Mutex::new(std::collections::HashMap::new()),
            globals: Mutex::new(std::collections::HashMap::new()),
            calls: Mutex::new(Vec::new()),
            queued_digits: Mutex::new(std::collections::VecDeque::new()),
            queued_strings: Mutex::new(std::collections::VecDeque::new()),
        }
    }

    /// Preset a global variable (`script_dir`, `sounds_dir`, …).
    pub fn with_global(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.globals.lock().unwrap().insert(name.into(), value.into());
        self
    }

    /// Preset a call variable.
    pub fn with_variable(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.lock().unwrap().insert(name.into(), value.into());
        self
    }

    /// Queue a string to be returned by the next `execute_string` call.
    pub fn queue_string_result(&self, value: Option<String>) {
        self.queued_strings.lock().unwrap().push_back(value);
    }

    /// Queue digits to be returned by the next `collect_digits` call.
    pub fn queue_digits(&self, digits: impl Into<String>) {
        self.queued_digits.lock().unwrap().push_back(digits.into());
    }

    /// Force `ready()` to return `false` on subsequent calls.
    pub fn set_ready(&self, ready: bool) {
        *self.ready.lock().unwrap() = ready;
    }

    /// The ordered log of every call made against this session.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockHostSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostSession for MockHostSession {
    async fn ready(&self) -> bool {
        *self.ready.lock().unwrap()
    }

    async fn answered(&self) -> bool {
        *self.answered.lock().unwrap()
    }

    async fn answer(&self) {
        *self.answered.lock().unwrap() = true;
        self.calls.lock().unwrap().push(RecordedCall::Answer);
    }

    async fn hangup(&self) {
        *self.ready.lock().unwrap() = false;
        self.calls.lock().unwrap().push(RecordedCall::Hangup);
    }

    async fn get_variable(&self, name: &str) -> Option<String> {
        self.variables.lock().unwrap().get(name).cloned()
    }

    async fn set_variable(&self, name: &str, value: Option<&str>) {
        let mut vars = self.variables.lock().unwrap();
        match value {
            Some(v) => {
                vars.insert(name.to_string(), v.to_string());
            }
            None => {
                vars.remove(name);
            }
        }
    }

    async fn execute(&self, app: &str, args: AppArgs) {
        self.calls
            .lock()
            .unwrap()
            .push(RecordedCall::Execute(app.to_string(), args.0));
    }

    async fn speak(&self, text: &str) {
        self.calls.lock().unwrap().push(RecordedCall::Speak(text.to_string()));
    }

    async fn set_tts_params(&self, engine: &str, voice: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(RecordedCall::SetTtsParams(engine.to_string(), voice.to_string()));
    }

    async fn global_variable(&self, name: &str) -> Option<String> {
        self.globals.lock().unwrap().get(name).cloned()
    }

    async fn execute_string(&self, cmd: &str) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .push(RecordedCall::ExecuteString(cmd.to_string()));
        self.queued_strings.lock().unwrap().pop_front().flatten()
    }

    async fn collect_digits(
        &self,
        _min_digits: u32,
        _max_digits: u32,
        terminator: Option<char>,
        _timeout: std::time::Duration,
    ) -> CollectedDigits {
        match self.queued_digits.lock().unwrap().pop_front() {
            Some(digits) => {
                let terminated = terminator
                    .map(|t| digits.ends_with(t))
                    .unwrap_or(false);
                CollectedDigits { digits, terminated }
            }
            None => CollectedDigits::default(),
        }
    }
}

/// A minimal [`CallContext`] over a [`MockHostSession`], for handler-
/// and dispatcher-level tests that don't need the real write-through
/// cache semantics `ivr-session::SessionContext` provides.
pub struct MockCallContext {
    host: Arc<MockHostSession>,
    cache: Mutex<HashMap<String, String>>,
    visited: Mutex<HashMap<crate::id::NodeId, u32>>,
    visit_budget: u32,
}

const DEFAULT_MOCK_VISIT_BUDGET: u32 = 10;

impl MockCallContext {
    /// Wrap a [`MockHostSession`], with the default visit budget (10).
    pub fn new(host: Arc<MockHostSession>) -> Self {
        Self::with_visit_budget(host, DEFAULT_MOCK_VISIT_BUDGET)
    }

    /// Wrap a [`MockHostSession`] with an explicit loop-guard budget.
    pub fn with_visit_budget(host: Arc<MockHostSession>, visit_budget: u32) -> Self {
        Self {
            host,
            cache: Mutex::new(HashMap::new()),
            visited: Mutex::new(HashMap::new()),
            visit_budget,
        }
    }
}

#[async_trait]
impl CallContext for MockCallContext {
    fn host(&self) -> &dyn HostSession {
        self.host.as_ref()
    }

    async fn get_variable(&self, name: &str, default: &str, use_cache: bool) -> String {
        if use_cache {
            if let Some(v) = self.cache.lock().unwrap().get(name) {
                return v.clone();
            }
        }
        match self.host.get_variable(name).await {
            Some(v) => {
                if use_cache {
                    self.cache.lock().unwrap().insert(name.to_string(), v.clone());
                }
                v
            }
            None => default.to_string(),
        }
    }

    async fn set_variable(&self, name: &str, value: String, update_cache: bool) {
        self.host.set_variable(name, Some(&value)).await;
        if update_cache {
            self.cache.lock().unwrap().insert(name.to_string(), value);
        }
    }

    async fn unset_variable(&self, name: &str) {
        self.host.set_variable(name, None).await;
        self.cache.lock().unwrap().remove(name);
    }

    async fn clear_cache(&self) {
        self.cache.lock().unwrap().clear();
    }

    async fn record_visit(&self, node: crate::id::NodeId) -> u32 {
        let mut visited = self.visited.lock().unwrap();
        let count = visited.entry(node).or_insert(0);
        *count += 1;
        *count
    }

    async fn visit_count(&self, node: crate::id::NodeId) -> u32 {
        *self.visited.lock().unwrap().get(&node).unwrap_or(&0)
    }

    fn visit_budget(&self) -> u32 {
        self.visit_budget
    }
}

fn _assert_send_sync<T: Send + Sync>() {}
fn _assert_mock_session_send_sync() {
    _assert_send_sync::<MockHostSession>();
    _assert_send_sync::<MockCallContext>();
}
