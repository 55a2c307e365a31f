#![deny(missing_docs)]
//! OAuth2 client-credentials token cache (§4.7).
//!
//! Shared across every call in the process: acquisition is a single
//! critical section (check expiry → request → install); a spurious
//! double-fetch under contention is tolerable since both writes
//! install a valid token (§5).

use ivr_core::error::AuthError;
use serde::Deserialize;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

const EXPIRY_SKEW_SECS: u64 = 60;
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;
const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Static configuration for one token endpoint.
#[derive(Debug, Clone)]
pub struct TokenCacheConfig {
    /// Token endpoint URL.
    pub token_url: String,
    /// `grant_type` form field. Always `"client_credentials"` in
    /// practice, kept configurable for forward compatibility.
    pub grant_type: String,
    /// Optional `scope` form field.
    pub scope: Option<String>,
    /// Pre-built `Authorization` header value (e.g. HTTP Basic of
    /// `client_id:client_secret`), attached to the token request itself.
    pub auth_header: Option<String>,
}

impl TokenCacheConfig {
    /// Client-credentials config with HTTP Basic auth already encoded
    /// into `auth_header`.
    pub fn client_credentials(token_url: impl Into<String>, auth_header: impl Into<String>) -> Self {
        Self {
            token_url: token_url.into(),
            grant_type: "client_credentials".to_string(),
            scope: None,
            auth_header: Some(auth_header.into()),
        }
    }

    /// Attach a scope to the token request.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    token_type: String,
    expires_at_epoch: u64,
}

impl CachedToken {
    fn is_fresh(&self, now: u64) -> bool {
        self.expires_at_epoch.saturating_sub(EXPIRY_SKEW_SECS) > now
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
    error_description: Option<String>,
}

fn parse_token_response(body: &str) -> Result<(String, String, u64), AuthError> {
    let parsed: TokenResponse = serde_json::from_str(body)
        .map_err(|e| AuthError::TokenEndpointRejected(format!("malformed response: {e}")))?;

    if let Some(err) = parsed.error {
        let desc = parsed.error_description.unwrap_or_default();
        return Err(AuthError::TokenEndpointRejected(format!("{err}: {desc}")));
    }

    let token = parsed
        .access_token
        .or(parsed.token)
        .ok_or_else(|| AuthError::TokenEndpointRejected("response has no access_token".to_string()))?;
    let token_type = parsed.token_type.unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string());
    let expires_in = parsed.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    Ok((token, token_type, expires_in))
}

fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Lazily-populated, expiry-aware OAuth2 token cache.
pub struct TokenCache {
    config: RwLock<Option<TokenCacheConfig>>,
    token: RwLock<Option<CachedToken>>,
    client: reqwest::Client,
}

impl TokenCache {
    /// An unconfigured cache. Call [`Self::configure`] before use.
    pub fn new() -> Self {
        Self {
            config: RwLock::new(None),
            token: RwLock::new(None),
            client: reqwest::Client::new(),
        }
    }

    /// (Re)configure the token endpoint. Does not clear any cached
    /// token; call [`Self::clear_token`] if the new configuration
    /// invalidates the existing one.
    pub async fn configure(&self, config: TokenCacheConfig) {
        *self.config.write().await = Some(config);
    }

    /// Return a valid access token, refreshing if necessary.
    ///
    /// Never returns a token whose `expires_at - 60 <= now` (§8.6): a
    /// stale cached token is always re-fetched.
    pub async fn get_access_token(&self, force_refresh: bool) -> Result<String, AuthError> {
        if !force_refresh {
            if let Some(token) = self.token.read().await.as_ref() {
                if token.is_fresh(now_epoch()) {
                    return Ok(token.access_token.clone());
                }
            }
        }
        self.authenticate().await?;
        let token = self.token.read().await;
        Ok(token.as_ref().expect("authenticate populates token on success").access_token.clone())
    }

    /// `"<token_type> <access_token>"`, ready to drop into an
    /// `Authorization` header.
    pub async fn get_auth_header(&self) -> Result<String, AuthError> {
        let access_token = self.get_access_token(false).await?;
        let token_type = self
            .token
            .read()
            .await
            .as_ref()
            .map(|t| t.token_type.clone())
            .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string());
        Ok(format!("{token_type} {access_token}"))
    }

    /// Install a token directly (bypassing the HTTP round trip), as
    /// when an upstream handler already has one. Surrounding double
    /// quotes are stripped before storing.
    pub async fn set_access_token(&self, token: &str, expires_in: Option<u64>) {
        let cleaned = token.trim_matches('"').to_string();
        let expires_in = expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        *self.token.write().await = Some(CachedToken {
            access_token: cleaned,
            token_type: DEFAULT_TOKEN_TYPE.to_string(),
            expires_at_epoch: now_epoch() + expires_in,
        });
    }

    /// Drop the cached token, forcing the next `get_access_token` to
    /// re-authenticate.
    pub async fn clear_token(&self) {
        *self.token.write().await = None;
    }

    /// Whether a fresh token is currently cached.
    pub async fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .await
            .as_ref()
            .map(|t| t.is_fresh(now_epoch()))
            .unwrap_or(false)
    }

    /// Force a token request against the configured endpoint,
    /// regardless of what is currently cached.
    pub async fn authenticate(&self) -> Result<(), AuthError> {
        let config = self
            .config
            .read()
            .await
            .clone()
            .ok_or_else(|| AuthError::TokenEndpointRejected("token cache not configured".to_string()))?;

        let mut form = vec![("grant_type".to_string(), config.grant_type.clone())];
        if let Some(scope) = &config.scope {
            form.push(("scope".to_string(), scope.clone()));
        }

        let mut request = self.client.post(&config.token_url).form(&form);
        if let Some(header) = &config.auth_header {
            request = request.header("Authorization", header);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AuthError::TokenEndpointUnreachable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::TokenEndpointUnreachable(e.to_string()))?;

        if !status.is_success() {
            return Err(AuthError::TokenEndpointRejected(format!("HTTP {status}: {body}")));
        }

        let (access_token, token_type, expires_in) = parse_token_response(&body)?;
        *self.token.write().await = Some(CachedToken {
            access_token,
            token_type,
            expires_at_epoch: now_epoch() + expires_in,
        });
        Ok(())
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}
