#![deny(missing_docs)]
//! Operation dispatcher (§4.3): turns `Node::operation_code` into a
//! handler-family invocation, under a fault barrier, with per-opcode
//! statistics.

use futures_util::FutureExt;
use ivr_core::context::CallContext;
use ivr_core::error::DispatchError;
use ivr_core::flow::Node;
use ivr_core::handler::{HandlerFamilyRef, HandlerOutcome, NodeHandlerFamily};
use serde::Serialize;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Constructs a handler family the first time its opcode is dispatched.
pub type FamilyLoader = Arc<dyn Fn() -> HandlerFamilyRef + Send + Sync>;

/// Read-only statistics snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchStats {
    /// Total `execute` invocations.
    pub total: u64,
    /// Invocations per opcode.
    pub per_opcode: HashMap<i64, u64>,
    /// Invocations that ended in an error.
    pub failed: u64,
    /// `(total - failed) / total`, or `1.0` when `total == 0`.
    pub success_rate: f64,
}

/// Maps opcodes to handler families, lazily constructing and caching
/// each family on first use, and tracking per-opcode counters.
pub struct Dispatcher {
    loaders: HashMap<&'static str, FamilyLoader>,
    bindings: RwLock<HashMap<i64, HandlerFamilyRef>>,
    total: AtomicU64,
    failed: AtomicU64,
    per_opcode: RwLock<HashMap<i64, u64>>,
}

impl Dispatcher {
    /// A dispatcher with no family loaders registered. Use
    /// [`Self::with_family`] to wire each handler family before serving
    /// calls.
    pub fn new() -> Self {
        Self {
            loaders: HashMap::new(),
            bindings: RwLock::new(HashMap::new()),
            total: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            per_opcode: RwLock::new(HashMap::new()),
        }
    }

    /// Register a lazy constructor for the handler family named
    /// `family_name` (`"audio"`, `"input"`, …, matching
    /// [`ivr_core::opcode::OPCODE_TABLE`]).
    pub fn with_family(mut self, family_name: &'static str, loader: FamilyLoader) -> Self {
        self.loaders.insert(family_name, loader);
        self
    }

    /// Bind a concrete handler family instance directly to `opcode`,
    /// bypassing the lazy-loader path. Re-registration overrides the
    /// existing binding and logs a warning.
    pub async fn register_operation(&self, opcode: i64, family: HandlerFamilyRef) {
        let mut bindings = self.bindings.write().await;
        if bindings.contains_key(&opcode) {
            tracing::warn!(
                level_name = "warning",
                module = "dispatch",
                opcode,
                "overriding existing handler binding"
            );
        }
        bindings.insert(opcode, family);
    }

    async fn resolve_family(&self, opcode: i64) -> Result<HandlerFamilyRef, DispatchError> {
        if let Some(family) = self.bindings.read().await.get(&opcode) {
            return Ok(Arc::clone(family));
        }
        let family_name = ivr_core::opcode::family_for(opcode)
            .ok_or(DispatchError::UnknownOpcode(opcode))?;
        let loader = self.loaders.get(family_name).ok_or_else(|| DispatchError::HandlerFailure {
            opcode,
            cause: format!("no handler family registered for \"{family_name}\""),
        })?;
        let family = loader();
        self.bindings.write().await.insert(opcode, Arc::clone(&family));
        Ok(family)
    }

    /// Execute `node`'s opcode against `ctx`.
    ///
    /// Always increments total and per-opcode counters first, so even
    /// an unknown-opcode rejection is counted. The handler family's
    /// `execute` runs under a fault barrier: a panic is caught and
    /// translated into [`DispatchError::HandlerFailure`] rather than
    /// unwinding into the caller.
    pub async fn execute(
        &self,
        node: &Node,
        ctx: &dyn CallContext,
    ) -> Result<HandlerOutcome, DispatchError> {
        let opcode = node.operation_code;
        self.total.fetch_add(1, Ordering::Relaxed);
        *self.per_opcode.write().await.entry(opcode).or_insert(0) += 1;

        let family = match self.resolve_family(opcode).await {
            Ok(f) => f,
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        let result = AssertUnwindSafe(family.execute(opcode, node, ctx))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(e)) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
            Err(panic) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                Err(DispatchError::HandlerFailure {
                    opcode,
                    cause: panic_message(&panic),
                })
            }
        }
    }

    /// Read-only statistics snapshot.
    pub async fn stats(&self) -> DispatchStats {
        let total = self.total.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let success_rate = if total == 0 {
            1.0
        } else {
            (total - failed) as f64 / total as f64
        };
        DispatchStats {
            total,
            per_opcode: self.per_opcode.read().await.clone(),
            failed,
            success_rate,
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ivr_core::flow::{Edge, Node};
    use ivr_core::id::NodeId;
    use ivr_core::test_utils::{MockCallContext, MockHostSession};
    use std::collections::HashMap as StdHashMap;

    struct StubFamily {
        name: &'static str,
        panics: bool,
        fails: bool,
    }

    #[async_trait]
    impl NodeHandlerFamily for StubFamily {
        fn family_name(&self) -> &str {
            self.name
        }

        async fn execute(
            &self,
            _opcode: i64,
            _node: &Node,
            _ctx: &dyn CallContext,
        ) -> Result<HandlerOutcome, DispatchError> {
            if self.panics {
                panic!("boom");
            }
            if self.fails {
                return Err(DispatchError::HandlerFailure {
                    opcode: 0,
                    cause: "stub failure".to_string(),
                });
            }
            Ok(HandlerOutcome::Continue)
        }
    }

    fn node(op: i64) -> Node {
        Node {
            node_id: NodeId::new(1),
            node_name: None,
            operation_code: op,
            is_start_node: true,
            child_node_config: Vec::<Edge>::new(),
            attributes: StdHashMap::new(),
        }
    }

    fn dispatcher_with(name: &'static str, panics: bool, fails: bool) -> Dispatcher {
        Dispatcher::new().with_family(
            name,
            Arc::new(move || Arc::new(StubFamily { name, panics, fails }) as HandlerFamilyRef),
        )
    }

    #[tokio::test]
    async fn unknown_opcode_is_rejected_and_counted() {
        let dispatcher = Dispatcher::new();
        let ctx = MockCallContext::new(Arc::new(MockHostSession::new()));
        let err = dispatcher.execute(&node(9999), &ctx).await.unwrap_err();
        assert!(matches!(err, DispatchError::UnknownOpcode(9999)));
        let stats = dispatcher.stats().await;
        assert_eq!(stats.total, 1);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn successful_execute_increments_counters_without_failure() {
        let dispatcher = dispatcher_with("audio", false, false);
        let ctx = MockCallContext::new(Arc::new(MockHostSession::new()));
        let outcome = dispatcher.execute(&node(10), &ctx).await.unwrap();
        assert!(matches!(outcome, HandlerOutcome::Continue));
        let stats = dispatcher.stats().await;
        assert_eq!(stats.total, 1);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.success_rate, 1.0);
    }

    #[tokio::test]
    async fn handler_panic_is_caught_as_dispatch_error() {
        let dispatcher = dispatcher_with("audio", true, false);
        let ctx = MockCallContext::new(Arc::new(MockHostSession::new()));
        let err = dispatcher.execute(&node(10), &ctx).await.unwrap_err();
        assert!(matches!(err, DispatchError::HandlerFailure { .. }));
        assert_eq!(dispatcher.stats().await.failed, 1);
    }

    #[tokio::test]
    async fn handler_family_is_cached_after_first_use() {
        let dispatcher = dispatcher_with("audio", false, false);
        let ctx = MockCallContext::new(Arc::new(MockHostSession::new()));
        dispatcher.execute(&node(10), &ctx).await.unwrap();
        // Second opcode backed by the same family reuses the cached
        // binding keyed per-opcode, not per-family, so it still
        // resolves correctly.
        dispatcher.execute(&node(11), &ctx).await.unwrap();
        assert_eq!(dispatcher.stats().await.total, 2);
    }

    #[tokio::test]
    async fn register_operation_overrides_existing_binding() {
        let dispatcher = dispatcher_with("audio", false, true);
        let ctx = MockCallContext::new(Arc::new(MockHostSession::new()));
        let err = dispatcher.execute(&node(10), &ctx).await.unwrap_err();
        assert!(matches!(err, DispatchError::HandlerFailure { .. }));

        dispatcher
            .register_operation(10, Arc::new(StubFamily { name: "audio", panics: false, fails: false }))
            .await;
        let outcome = dispatcher.execute(&node(10), &ctx).await.unwrap();
        assert!(matches!(outcome, HandlerOutcome::Continue));
    }
}
