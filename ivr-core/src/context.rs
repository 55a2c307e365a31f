//! The object-safe call-context boundary node handler families are
//! driven through.
//!
//! Handler families need both the raw host session and the cached
//! variable read/write surface session context provides, but must not
//! depend on the concrete `SessionContext` type (that would put
//! `ivr-handlers` above `ivr-session` in the dependency graph for no
//! reason). [`CallContext`] is the trait `ivr-session::SessionContext`
//! implements and the one `ivr-handlers` and `ivr-dispatch` consume.

use crate::host::HostSession;
use async_trait::async_trait;

/// Per-call variable read/write surface, plus the underlying host
/// session, exposed to node handler families and the interpreter.
#[async_trait]
pub trait CallContext: Send + Sync {
    /// The underlying telephony session.
    fn host(&self) -> &dyn HostSession;

    /// Read a variable (§4.2 semantics: `use_cache` controls whether a
    /// cache hit short-circuits the host, and whether a miss populates
    /// the cache).
    async fn get_variable(&self, name: &str, default: &str, use_cache: bool) -> String;

    /// Write a variable (write-through unless `update_cache` is false).
    async fn set_variable(&self, name: &str, value: String, update_cache: bool);

    /// Clear a variable on the host and in the cache.
    async fn unset_variable(&self, name: &str);

    /// Drop every cached value.
    async fn clear_cache(&self);

    /// Record a visit to `node`, returning the new visit count. Backs
    /// the interpreter's loop guard (§3, §8.4).
    async fn record_visit(&self, node: crate::id::NodeId) -> u32;

    /// Current visit count for `node` (0 if never visited).
    async fn visit_count(&self, node: crate::id::NodeId) -> u32;

    /// The configured per-call loop-guard budget.
    fn visit_budget(&self) -> u32;
}
