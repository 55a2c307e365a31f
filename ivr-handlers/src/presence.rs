//! Agent presence update (§4.8): a best-effort SIP contact probe run
//! after an agent bridges with a call-center caller. Not a node handler
//! family — invoked directly by the interpreter's agent-callback path
//! (§4.6), since it has no opcode of its own.

use ivr_core::context::CallContext;

const UNREGISTERED_SENTINEL: &str = "error/user_not_registered";

/// Probe `extension`'s SIP registration and poke the call-center
/// agent-status table accordingly. Failures are logged; they never
/// alter call control (§4.8).
pub async fn update_agent_presence(ctx: &dyn CallContext, extension: &str) {
    let Some(contact) = ctx.host().execute_string(&format!("sofia_contact {extension}")).await else {
        tracing::warn!(
            level_name = "warning",
            module = "handlers.presence",
            extension,
            "SIP contact probe returned no result"
        );
        return;
    };

    if contact == UNREGISTERED_SENTINEL {
        ctx.host()
            .execute_string(&format!("callcenter_config agent set status {extension} 'Logged Out'"))
            .await;
        return;
    }

    ctx.host()
        .execute_string(&format!("callcenter_config agent set status {extension} Available"))
        .await;
    ctx.host()
        .execute_string(&format!("callcenter_config agent set contact {extension} {contact}"))
        .await;
    ctx.host()
        .execute_string(&format!("callcenter_config agent set state {extension} Waiting"))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivr_core::test_utils::{MockCallContext, MockHostSession, RecordedCall};
    use std::sync::Arc;

    #[tokio::test]
    async fn registered_contact_sets_available_waiting() {
        let host = Arc::new(MockHostSession::new());
        host.queue_string_result(Some("sofia/internal/2001@10.0.0.1".to_string()));
        let ctx = MockCallContext::new(host.clone());

        update_agent_presence(&ctx, "2001").await;

        let calls = host.calls();
        assert!(calls.iter().any(|c| matches!(c, RecordedCall::ExecuteString(s) if s.contains("Available"))));
        assert!(calls.iter().any(|c| matches!(c, RecordedCall::ExecuteString(s) if s.contains("Waiting"))));
    }

    #[tokio::test]
    async fn unregistered_sentinel_sets_logged_out() {
        let host = Arc::new(MockHostSession::new());
        host.queue_string_result(Some("error/user_not_registered".to_string()));
        let ctx = MockCallContext::new(host.clone());

        update_agent_presence(&ctx, "2002").await;

        let calls = host.calls();
        assert!(calls.iter().any(|c| matches!(c, RecordedCall::ExecuteString(s) if s.contains("Logged Out"))));
        assert!(!calls.iter().any(|c| matches!(c, RecordedCall::ExecuteString(s) if s.contains("Available"))));
    }

    #[tokio::test]
    async fn probe_failure_does_not_panic_or_touch_call_control() {
        let host = Arc::new(MockHostSession::new());
        let ctx = MockCallContext::new(host.clone());
        update_agent_presence(&ctx, "2003").await;
        assert!(host.ready().await);
    }
}
