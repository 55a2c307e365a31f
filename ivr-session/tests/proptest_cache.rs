//! Property-based tests: the quantified variable-cache laws.

use ivr_core::test_utils::MockHostSession;
use ivr_session::SessionContext;
use proptest::prelude::*;
use std::sync::Arc;

proptest! {
    /// Testable property 7: `set(k, v); set(k, v)` is observationally
    /// equivalent to `set(k, v)` — writing the same value twice leaves
    /// both the cache and the host in the same state a single write
    /// would have.
    #[test]
    fn set_variable_is_idempotent(key in "[a-z_]{1,12}", value in "[ -~]{0,40}") {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let once = SessionContext::initialize(Arc::new(MockHostSession::new())).await;
            once.set_variable(&key, value.clone(), true).await;

            let twice = SessionContext::initialize(Arc::new(MockHostSession::new())).await;
            twice.set_variable(&key, value.clone(), true).await;
            twice.set_variable(&key, value.clone(), true).await;

            let cached_once = once.get_variable(&key, "", true).await;
            let cached_twice = twice.get_variable(&key, "", true).await;
            assert_eq!(cached_once, cached_twice);

            let uncached_once = once.get_variable(&key, "", false).await;
            let uncached_twice = twice.get_variable(&key, "", false).await;
            assert_eq!(uncached_once, uncached_twice);
        });
    }

    /// Testable property 8: after `set_variable(k, v)`,
    /// `get_variable(k)` with the cache enabled returns `v`, and a
    /// cache-bypass read (straight to the host) also returns `v`.
    #[test]
    fn set_variable_writes_through_to_both_cache_and_host(
        key in "[a-z_]{1,12}",
        value in "[ -~]{0,40}",
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ctx = SessionContext::initialize(Arc::new(MockHostSession::new())).await;
            ctx.set_variable(&key, value.clone(), true).await;

            assert_eq!(ctx.get_variable(&key, "", true).await, value);
            assert_eq!(ctx.get_variable(&key, "", false).await, value);
        });
    }
}
