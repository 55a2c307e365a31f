#![deny(missing_docs)]
//! Per-call session context (§4.2): wraps the host telephony session,
//! snapshots the immutable call header, and keeps a write-through cache
//! over host variables. Also owns the per-call loop guard (§3, §8.4):
//! `visited[nodeId]` and `visit_budget`.

use async_trait::async_trait;
use ivr_core::context::CallContext;
use ivr_core::host::HostSession;
use ivr_core::id::NodeId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

const UNKNOWN: &str = "unknown";
const DEFAULT_VISIT_BUDGET: u32 = 10;

/// Immutable fields captured once, at session initialization.
#[derive(Debug, Clone)]
pub struct Header {
    /// The call's unique ID.
    pub call_uuid: String,
    /// Caller's ANI/CLID.
    pub caller_id: String,
    /// Caller's display name, if the host provides one.
    pub caller_name: String,
    /// SIP domain the call arrived on.
    pub domain: String,
    /// Wall-clock epoch seconds at initialization.
    pub call_start_time: u64,
}

/// Per-call context coupling the host session to a cached variable
/// store and the interpreter's loop guard.
pub struct SessionContext {
    host: Arc<dyn HostSession>,
    header: Header,
    cache: RwLock<HashMap<String, String>>,
    visited: RwLock<HashMap<NodeId, u32>>,
    visit_budget: u32,
}

impl SessionContext {
    /// Initialize a session context from a live host session.
    ///
    /// Snapshots the immutable header, defaulting absent fields to the
    /// literal `"unknown"`, and stamps `call_start_time` to the current
    /// wall-clock epoch.
    pub async fn initialize(host: Arc<dyn HostSession>) -> Self {
        Self::initialize_with_budget(host, DEFAULT_VISIT_BUDGET).await
    }

    /// Like [`Self::initialize`], with an explicit visit budget.
    pub async fn initialize_with_budget(host: Arc<dyn HostSession>, visit_budget: u32) -> Self {
        let field = |v: Option<String>| v.unwrap_or_else(|| UNKNOWN.to_string());
        let header = Header {
            call_uuid: field(host.get_variable("call_uuid").await),
            caller_id: field(host.get_variable("caller_id").await),
            caller_name: field(host.get_variable("caller_name").await),
            domain: field(host.get_variable("domain").await),
            call_start_time: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        };
        Self {
            host,
            header,
            cache: RwLock::new(HashMap::new()),
            visited: RwLock::new(HashMap::new()),
            visit_budget,
        }
    }

    /// The immutable call header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The configured loop-guard budget.
    pub fn visit_budget(&self) -> u32 {
        self.visit_budget
    }

    /// Read a variable. With `use_cache`, a cache hit is returned
    /// without touching the host; a cache miss falls through to the
    /// host and populates the cache. With caching disabled, the host
    /// is always consulted and the cache is left untouched either way.
    pub async fn get_variable(&self, name: &str, default: &str, use_cache: bool) -> String {
        if use_cache {
            if let Some(v) = self.cache.read().await.get(name) {
                return v.clone();
            }
        }
        match self.host.get_variable(name).await {
            Some(v) => {
                if use_cache {
                    self.cache.write().await.insert(name.to_string(), v.clone());
                }
                v
            }
            None => default.to_string(),
        }
    }

    /// Write a variable. Values are stringified (the host protocol is
    /// string-only). Write-through: the host is always updated; the
    /// cache is updated too unless `update_cache` is `false`.
    pub async fn set_variable(&self, name: &str, value: impl ToString, update_cache: bool) {
        let value = value.to_string();
        self.host.set_variable(name, Some(&value)).await;
        if update_cache {
            self.cache.write().await.insert(name.to_string(), value);
        }
    }

    /// Clear a variable on the host and drop it from the cache.
    pub async fn unset_variable(&self, name: &str) {
        self.host.set_variable(name, None).await;
        self.cache.write().await.remove(name);
    }

    /// Drop every cached value. Used after any code path that may have
    /// mutated host variables externally (e.g. after a bridge returns
    /// from a call-center enqueue).
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    /// Whether media has been answered.
    pub async fn is_answered(&self) -> bool {
        self.host.answered().await
    }

    /// Whether the host session is still live.
    pub async fn is_ready(&self) -> bool {
        self.host.ready().await
    }

    /// The underlying host session, for handler families that need the
    /// raw telephony primitives.
    pub fn host(&self) -> &Arc<dyn HostSession> {
        &self.host
    }

    /// Record a visit to `node`, returning the new visit count.
    pub async fn record_visit(&self, node: NodeId) -> u32 {
        let mut visited = self.visited.write().await;
        let count = visited.entry(node).or_insert(0);
        *count += 1;
        *count
    }

    /// Current visit count for `node` (0 if never visited).
    pub async fn visit_count(&self, node: NodeId) -> u32 {
        *self.visited.read().await.get(&node).unwrap_or(&0)
    }

    /// Release call resources. Cheap and idempotent: clears the cache.
    /// The host session's own teardown (hangup) is driven by the
    /// interpreter, not by this method.
    pub async fn cleanup(&self) {
        self.clear_cache().await;
    }
}

#[async_trait]
impl CallContext for SessionContext {
    fn host(&self) -> &dyn HostSession {
        self.host.as_ref()
    }

    async fn get_variable(&self, name: &str, default: &str, use_cache: bool) -> String {
        SessionContext::get_variable(self, name, default, use_cache).await
    }

    async fn set_variable(&self, name: &str, value: String, update_cache: bool) {
        SessionContext::set_variable(self, name, value, update_cache).await
    }

    async fn unset_variable(&self, name: &str) {
        SessionContext::unset_variable(self, name).await
    }

    async fn clear_cache(&self) {
        SessionContext::clear_cache(self).await
    }

    async fn record_visit(&self, node: NodeId) -> u32 {
        SessionContext::record_visit(self, node).await
    }

    async fn visit_count(&self, node: NodeId) -> u32 {
        SessionContext::visit_count(self, node).await
    }

    fn visit_budget(&self) -> u32 {
        SessionContext::visit_budget(self)
    }
}
