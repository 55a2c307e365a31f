//! The **api** handler family (§4.4): opcodes 111 (GET), 112 (POST).
//!
//! Resolves the target endpoint against the [`ivr_config::ConfigStore`]'s
//! endpoint catalog by name, or falls back to a literal URL carried on
//! the node. Endpoints marked `auth_required` get an `Authorization`
//! header from the shared [`ivr_auth::TokenCache`]. Selected top-level
//! response fields are persisted to session variables per the node's
//! `ResponseFieldMap` (JSON field name → session variable name).
//!
//! A transport failure or non-2xx response is logged and treated as the
//! shared "host failure" case (§4.4): the node falls through to linear
//! traversal rather than propagating an error, leaving error-edge
//! routing to whatever logic node follows.

use crate::common::ensure_answered;
use async_trait::async_trait;
use ivr_config::ConfigStore;
use ivr_core::context::CallContext;
use ivr_core::error::DispatchError;
use ivr_core::flow::Node;
use ivr_core::handler::{HandlerOutcome, NodeHandlerFamily};
use ivr_auth::TokenCache;
use std::collections::HashMap;
use std::sync::Arc;

const HTTP_GET: i64 = 111;
const HTTP_POST: i64 = 112;

/// Handles opcodes 111, 112.
pub struct ApiFamily {
    config: Arc<ConfigStore>,
    tokens: Arc<TokenCache>,
    client: reqwest::Client,
}

impl ApiFamily {
    /// Wire the config store (for endpoint lookups) and token cache
    /// (for `auth_required` endpoints).
    pub fn new(config: Arc<ConfigStore>, tokens: Arc<TokenCache>) -> Self {
        Self {
            config,
            tokens,
            client: reqwest::Client::new(),
        }
    }

    async fn resolve_url_and_auth(&self, node: &Node) -> (String, bool, HashMap<String, String>) {
        if let Some(name) = node.attr_str("EndpointName") {
            if let Some(catalog) = self.config.webapi_endpoints().await {
                if let Some(endpoint) = catalog.get(name) {
                    return (endpoint.url.clone(), endpoint.auth_required, endpoint.default_headers.clone());
                }
            }
        }
        (node.attr_str("Url").unwrap_or_default().to_string(), false, HashMap::new())
    }

    async fn persist_response_fields(&self, ctx: &dyn CallContext, node: &Node, body: &str) {
        let Some(field_map) = node.attributes.get("ResponseFieldMap").and_then(|v| v.as_object()) else {
            return;
        };
        let Ok(parsed) = serde_json::from_str::<serde_json::Value>(body) else {
            return;
        };
        for (json_field, session_var) in field_map {
            let Some(session_var) = session_var.as_str() else { continue };
            if let Some(value) = parsed.get(json_field) {
                let as_text = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                ctx.set_variable(session_var, as_text, true).await;
            }
        }
    }
}

#[async_trait]
impl NodeHandlerFamily for ApiFamily {
    fn family_name(&self) -> &str {
        "api"
    }

    async fn execute(
        &self,
        opcode: i64,
        node: &Node,
        ctx: &dyn CallContext,
    ) -> Result<HandlerOutcome, DispatchError> {
        ensure_answered(ctx).await;

        if opcode != HTTP_GET && opcode != HTTP_POST {
            return Err(DispatchError::HandlerFailure {
                opcode,
                cause: "api family does not own this opcode".to_string(),
            });
        }

        let (url, auth_required, default_headers) = self.resolve_url_and_auth(node).await;
        if url.is_empty() {
            tracing::warn!(level_name = "warning", module = "handlers.api", node = %node.node_id, "no endpoint resolved");
            return Ok(HandlerOutcome::Continue);
        }

        let mut request = if opcode == HTTP_GET {
            self.client.get(&url)
        } else {
            let body = node.attr_str("Body").unwrap_or_default();
            self.client.post(&url).body(body.to_string())
        };
        for (k, v) in &default_headers {
            request = request.header(k, v);
        }
        if auth_required {
            match self.tokens.get_auth_header().await {
                Ok(header) => request = request.header("Authorization", header),
                Err(e) => {
                    tracing::warn!(level_name = "warning", module = "handlers.api", error = %e, "token acquisition failed");
                    return Ok(HandlerOutcome::Continue);
                }
            }
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                match response.text().await {
                    Ok(body) => {
                        if status.is_success() {
                            self.persist_response_fields(ctx, node, &body).await;
                        } else {
                            tracing::warn!(level_name = "warning", module = "handlers.api", %status, "endpoint rejected request");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(level_name = "warning", module = "handlers.api", error = %e, "failed to read response body");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(level_name = "warning", module = "handlers.api", error = %e, "endpoint unreachable");
            }
        }

        Ok(HandlerOutcome::Continue)
    }
}
