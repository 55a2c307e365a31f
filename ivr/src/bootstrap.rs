//! Wires the engine's pieces together per the system overview's
//! "Bootstrap" responsibility: one [`Engine`] per process, loading
//! configuration and registering every handler family with the
//! dispatcher; one [`SessionContext`]/[`Interpreter`] pair per call.

use ivr_auth::{TokenCache, TokenCacheConfig};
use ivr_config::{ConfigStore, FileNames};
use ivr_core::error::InterpreterError;
use ivr_core::host::HostSession;
use ivr_dispatch::Dispatcher;
use ivr_flow::Interpreter;
use ivr_handlers::{
    ApiFamily, AudioFamily, InputFamily, LogicFamily, RecordingFamily, TerminationFamily,
    TransferFamily, TtsFamily,
};
use ivr_session::SessionContext;
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_VISIT_BUDGET: u32 = 10;
const VISIT_BUDGET_SETTING: &str = "visit_budget";

/// Process-wide engine state: the configuration store, the shared
/// token cache, and a dispatcher with every handler family registered.
/// Cheap to clone (everything inside is already `Arc`-backed).
#[derive(Clone)]
pub struct Engine {
    config: Arc<ConfigStore>,
    tokens: Arc<TokenCache>,
    dispatcher: Arc<Dispatcher>,
}

impl Engine {
    /// Build an engine rooted at `script_dir`, with every handler
    /// family wired into the dispatcher. Call [`Engine::load`] before
    /// serving calls.
    pub fn new(script_dir: impl Into<PathBuf>, names: FileNames) -> Self {
        let config = Arc::new(ConfigStore::new(script_dir, names));
        let tokens = Arc::new(TokenCache::new());

        let api_config = Arc::clone(&config);
        let api_tokens = Arc::clone(&tokens);
        let dispatcher = Arc::new(
            Dispatcher::new()
                .with_family("audio", Arc::new(|| Arc::new(AudioFamily::new())))
                .with_family("input", Arc::new(|| Arc::new(InputFamily::new())))
                .with_family("recording", Arc::new(|| Arc::new(RecordingFamily::new())))
                .with_family("transfer", Arc::new(|| Arc::new(TransferFamily::new())))
                .with_family("logic", Arc::new(|| Arc::new(LogicFamily::new())))
                .with_family("tts", Arc::new(|| Arc::new(TtsFamily::new())))
                .with_family("termination", Arc::new(|| Arc::new(TerminationFamily::new())))
                .with_family(
                    "api",
                    Arc::new(move || Arc::new(ApiFamily::new(Arc::clone(&api_config), Arc::clone(&api_tokens)))),
                ),
        );

        Self { config, tokens, dispatcher }
    }

    /// The configuration store, for direct access (e.g. wiring
    /// [`ConfigStore::watch`](ivr_config::ConfigStore::watch)).
    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    /// Load every configuration document. Must succeed (at minimum for
    /// the `ivr` document) before [`Engine::interpreter`] can build an
    /// interpreter.
    pub async fn load(&self) -> (Vec<&'static str>, Vec<ivr_core::error::ConfigError>) {
        self.config.load_all().await
    }

    /// Configure the shared token cache's OAuth2 endpoint. A no-op
    /// engine that never calls `api` endpoints with `auth_required`
    /// need not call this.
    pub async fn configure_auth(&self, token_config: TokenCacheConfig) {
        self.tokens.configure(token_config).await;
    }

    /// Build an interpreter bound to the currently published flow.
    /// Re-call this per call (or whenever the flow reloads) rather than
    /// caching the result — it snapshots the document at the moment of
    /// the call, per §5's "a call in flight continues against the
    /// document it first saw". The loop-guard budget lives on the
    /// per-call [`SessionContext`] ([`Engine::begin_call`]), not here.
    pub async fn interpreter(&self) -> Result<Interpreter, InterpreterError> {
        let flow = self
            .config
            .ivr_flow()
            .await
            .ok_or_else(|| InterpreterError::StartNodeError("no ivr flow document is published".to_string()))?;
        let configuration = flow
            .configuration()
            .ok_or_else(|| InterpreterError::StartNodeError("flow document has no configuration".to_string()))?;

        Ok(Interpreter::initialize(configuration.process_flow.clone(), Arc::clone(&self.dispatcher)))
    }

    /// Initialize a session context for one inbound call, honoring the
    /// same `visit_budget` general setting [`Engine::interpreter`] uses.
    pub async fn begin_call(&self, host: Arc<dyn HostSession>) -> Result<SessionContext, InterpreterError> {
        let visit_budget = self
            .config
            .general_settings()
            .await
            .and_then(|s| s.get(VISIT_BUDGET_SETTING).and_then(|v| v.as_u64()))
            .map(|v| v as u32)
            .unwrap_or(DEFAULT_VISIT_BUDGET);
        Ok(SessionContext::initialize_with_budget(host, visit_budget).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivr_core::test_utils::MockHostSession;
    use std::io::Write;

    fn names() -> FileNames {
        FileNames {
            ivr: "ivr.json".to_string(),
            webapi: "webapi.json".to_string(),
            extensions: "ext.json".to_string(),
            recording: "rec.json".to_string(),
        }
    }

    const VALID_IVR: &str = r#"{
        "IVRConfiguration": [{
            "IVRProcessFlow": [
                {"NodeId": 1, "OperationCode": 10, "IsStartNode": true,
                 "ChildNodeConfig": [{"ChildNodeId": 2}], "AudioFile": "welcome.wav"},
                {"NodeId": 2, "OperationCode": 200, "IsStartNode": false, "ChildNodeConfig": []}
            ],
            "GeneralSettingValues": {"visit_budget": 4}
        }]
    }"#;

    fn write_file(dir: &std::path::Path, name: &str, contents: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    #[tokio::test]
    async fn engine_builds_interpreter_from_published_flow_with_custom_visit_budget() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "ivr.json", VALID_IVR);
        write_file(dir.path(), "webapi.json", r#"{"result": {}}"#);
        write_file(dir.path(), "ext.json", "{}");
        write_file(dir.path(), "rec.json", "{}");

        let engine = Engine::new(dir.path(), names());
        let (_, errs) = engine.load().await;
        assert!(errs.is_empty(), "{errs:?}");

        let interpreter = engine.interpreter().await.unwrap();
        let host = Arc::new(MockHostSession::new().with_global("sounds_dir", "/snd"));
        let ctx = engine.begin_call(host.clone()).await.unwrap();

        interpreter.start(&ctx).await.unwrap();
        assert!(host.calls().iter().any(|c| matches!(c, ivr_core::test_utils::RecordedCall::Hangup)));
    }

    #[tokio::test]
    async fn interpreter_errors_when_flow_never_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new(dir.path(), names());
        let err = engine.interpreter().await.unwrap_err();
        assert!(matches!(err, InterpreterError::StartNodeError(_)));
    }
}
