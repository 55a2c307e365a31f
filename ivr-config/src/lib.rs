#![deny(missing_docs)]
//! Configuration store: load-on-startup, mtime-based hot-reload, typed
//! accessors over the flow, endpoint-catalog, extension, and
//! recording-type documents (§4.1).
//!
//! Publication is atomic: a document's published pointer is only
//! replaced after both parse and validation succeed, and only after
//! that swap does the store advance the recorded mtime. A reader that
//! calls a typed accessor concurrently with a reload observes either
//! the pre-reload or post-reload document in full, never a mix.

use ivr_core::error::ConfigError;
use ivr_core::flow::{self, EndpointCatalog, ExtensionMap, Flow, GeneralSettings, RecordingTypeMap};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::RwLock;

/// Logical document names this store knows how to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentName {
    /// The IVR flow document.
    Ivr,
    /// The endpoint catalog document.
    WebApi,
    /// The extension map document.
    Extensions,
    /// The recording-type map document.
    Recording,
}

impl DocumentName {
    fn as_str(&self) -> &'static str {
        match self {
            DocumentName::Ivr => "ivr",
            DocumentName::WebApi => "webapi",
            DocumentName::Extensions => "extensions",
            DocumentName::Recording => "recording",
        }
    }
}

/// Filenames resolved relative to `script_dir`. Defaults match the
/// literal names the flow document format uses in practice.
#[derive(Debug, Clone)]
pub struct FileNames {
    /// Filename for the `ivr` document.
    pub ivr: String,
    /// Filename for the `webapi` document.
    pub webapi: String,
    /// Filename for the `extensions` document.
    pub extensions: String,
    /// Filename for the `recording` document.
    pub recording: String,
}

impl Default for FileNames {
    fn default() -> Self {
        Self {
            ivr: "ivrconfig (3).json".to_string(),
            webapi: "automax_webAPIConfig (2).json".to_string(),
            extensions: "Extensions_qa.json".to_string(),
            recording: "RecordingType_qa.json".to_string(),
        }
    }
}

struct Published {
    value: Arc<serde_json::Value>,
    mtime: Option<SystemTime>,
}

/// Load-on-startup, hot-reloading configuration store.
///
/// Single writer (the `load_all`/`reload` paths), many readers; each
/// document is copy-on-publish (§5).
pub struct ConfigStore {
    script_dir: PathBuf,
    names: FileNames,
    documents: RwLock<HashMap<&'static str, Published>>,
}

impl ConfigStore {
    /// Create a store rooted at `script_dir`, with no documents loaded
    /// yet. Call [`ConfigStore::load_all`] before serving traffic.
    pub fn new(script_dir: impl Into<PathBuf>, names: FileNames) -> Self {
        Self {
            script_dir: script_dir.into(),
            names,
            documents: RwLock::new(HashMap::new()),
        }
    }

    fn path_for(&self, name: DocumentName) -> PathBuf {
        let filename = match name {
            DocumentName::Ivr => &self.names.ivr,
            DocumentName::WebApi => &self.names.webapi,
            DocumentName::Extensions => &self.names.extensions,
            DocumentName::Recording => &self.names.recording,
        };
        self.script_dir.join(filename)
    }

    /// For each registered logical document, probe its mtime and only
    /// re-parse on change. Returns the names that loaded successfully
    /// and the errors for those that didn't; a failure on one document
    /// leaves the others' (and its own previous) state untouched.
    pub async fn load_all(&self) -> (Vec<&'static str>, Vec<ConfigError>) {
        let mut ok = Vec::new();
        let mut errs = Vec::new();
        for name in [
            DocumentName::Ivr,
            DocumentName::WebApi,
            DocumentName::Extensions,
            DocumentName::Recording,
        ] {
            match self.load_if_changed(name).await {
                Ok(true) => ok.push(name.as_str()),
                Ok(false) => ok.push(name.as_str()),
                Err(e) => errs.push(e),
            }
        }
        (ok, errs)
    }

    /// Force re-parse of a single document regardless of mtime.
    pub async fn reload(&self, name: DocumentName) -> Result<(), ConfigError> {
        self.load_document(name).await
    }

    async fn load_if_changed(&self, name: DocumentName) -> Result<bool, ConfigError> {
        let path = self.path_for(name);
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|_| ConfigError::ConfigNotFound(name.as_str().to_string()))?;
        let mtime = metadata.modified().ok();

        let unchanged = {
            let docs = self.documents.read().await;
            docs.get(name.as_str())
                .map(|p| p.mtime == mtime && mtime.is_some())
                .unwrap_or(false)
        };
        if unchanged {
            return Ok(false);
        }
        self.load_document(name).await?;
        Ok(true)
    }

    async fn load_document(&self, name: DocumentName) -> Result<(), ConfigError> {
        let path = self.path_for(name);
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|_| ConfigError::ConfigNotFound(name.as_str().to_string()))?;
        let value: serde_json::Value =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ConfigParseError {
                name: name.as_str().to_string(),
                cause: e.to_string(),
            })?;

        self.validate(name, &value)?;

        let mtime = tokio::fs::metadata(&path).await.ok().and_then(|m| m.modified().ok());
        let mut docs = self.documents.write().await;
        docs.insert(
            name.as_str(),
            Published {
                value: Arc::new(value),
                mtime,
            },
        );
        Ok(())
    }

    fn validate(&self, name: DocumentName, value: &serde_json::Value) -> Result<(), ConfigError> {
        match name {
            DocumentName::Ivr => {
                let flow: Flow = serde_json::from_value(value.clone()).map_err(|e| {
                    ConfigError::ConfigValidationError {
                        name: "ivr".to_string(),
                        field: "IVRConfiguration".to_string(),
                        reason: e.to_string(),
                    }
                })?;
                let config = flow.configuration().ok_or_else(|| ConfigError::ConfigValidationError {
                    name: "ivr".to_string(),
                    field: "IVRConfiguration[0]".to_string(),
                    reason: "missing IVRConfiguration[0]".to_string(),
                })?;
                let known_opcodes = ivr_core::opcode::known_opcodes();
                flow::validate("ivr", &config.process_flow, &known_opcodes).map_err(|mut errs| {
                    errs.remove(0)
                })?;
                Ok(())
            }
            DocumentName::WebApi => {
                if value.get("result").is_none() {
                    return Err(ConfigError::ConfigValidationError {
                        name: "webapi".to_string(),
                        field: "result".to_string(),
                        reason: "missing `result` key".to_string(),
                    });
                }
                serde_json::from_value::<EndpointCatalog>(value.clone()).map_err(|e| {
                    ConfigError::ConfigValidationError {
                        name: "webapi".to_string(),
                        field: "result".to_string(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(())
            }
            DocumentName::Extensions => {
                if let Some(obj) = value.as_object() {
                    if obj.is_empty() {
                        tracing::warn!(level_name = "warning", module = "config", "extensions document is empty");
                    }
                }
                Ok(())
            }
            DocumentName::Recording => Ok(()),
        }
    }

    async fn get_typed<T: DeserializeOwned>(&self, name: DocumentName) -> Option<T> {
        let docs = self.documents.read().await;
        let published = docs.get(name.as_str())?;
        serde_json::from_value(published.value.as_ref().clone()).ok()
    }

    /// Return the currently published raw document, or `None` if it
    /// has never been loaded successfully.
    pub async fn get(&self, name: DocumentName) -> Option<Arc<serde_json::Value>> {
        let docs = self.documents.read().await;
        docs.get(name.as_str()).map(|p| Arc::clone(&p.value))
    }

    /// The published flow document.
    pub async fn ivr_flow(&self) -> Option<Flow> {
        self.get_typed(DocumentName::Ivr).await
    }

    /// `GeneralSettingValues` of the first configuration in the flow.
    pub async fn general_settings(&self) -> Option<GeneralSettings> {
        let flow: Flow = self.get_typed(DocumentName::Ivr).await?;
        flow.configuration().map(|c| c.general_settings.clone())
    }

    /// The published endpoint catalog.
    pub async fn webapi_endpoints(&self) -> Option<EndpointCatalog> {
        self.get_typed(DocumentName::WebApi).await
    }

    /// The published recording-type map.
    pub async fn recording_config(&self) -> Option<RecordingTypeMap> {
        self.get_typed(DocumentName::Recording).await
    }

    /// The published extension map.
    pub async fn agent_extensions(&self) -> Option<ExtensionMap> {
        self.get_typed(DocumentName::Extensions).await
    }

    /// Spawn a background task that polls for mtime changes and calls
    /// `load_all` on an interval. Opt-in: manual `load_all`/`reload`
    /// remain the primitives the rest of the engine relies on.
    pub fn watch(self: Arc<Self>, interval: std::time::Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let (_, errs) = self.load_all().await;
                for e in errs {
                    tracing::error!(level_name = "err", module = "config", error = %e, "reload failed");
                }
            }
        })
    }
}
