//! Property-based tests: the quantified routing and loop-guard laws.

use ivr_core::flow::{Edge, Node, ProcessFlow};
use ivr_core::id::NodeId;
use ivr_core::test_utils::{MockCallContext, MockHostSession};
use ivr_dispatch::Dispatcher;
use ivr_flow::Interpreter;
use ivr_handlers::audio::AudioFamily;
use ivr_handlers::termination::TerminationFamily;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

fn dispatcher() -> Arc<Dispatcher> {
    Arc::new(
        Dispatcher::new()
            .with_family("audio", Arc::new(|| Arc::new(AudioFamily::new())))
            .with_family("termination", Arc::new(|| Arc::new(TerminationFamily::new()))),
    )
}

fn linear_self_loop() -> ProcessFlow {
    ProcessFlow {
        nodes: vec![Node {
            node_id: NodeId::new(1),
            node_name: None,
            operation_code: 10,
            is_start_node: true,
            child_node_config: vec![Edge { child_node_id: NodeId::new(1), input_keys: None }],
            attributes: HashMap::new(),
        }],
    }
}

fn menu_node(keys: &[&str]) -> ProcessFlow {
    let nodes = std::iter::once(Node {
        node_id: NodeId::new(1),
        node_name: None,
        operation_code: 31,
        is_start_node: true,
        child_node_config: keys
            .iter()
            .enumerate()
            .map(|(i, k)| Edge { child_node_id: NodeId::new(i as i64 + 2), input_keys: Some(k.to_string()) })
            .collect(),
        attributes: serde_json::json!({"MaxDigits": 1, "Timeout": 5000})
            .as_object()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .collect(),
    })
    .chain(keys.iter().enumerate().map(|(i, _)| Node {
        node_id: NodeId::new(i as i64 + 2),
        node_name: None,
        operation_code: 200,
        is_start_node: false,
        child_node_config: vec![],
        attributes: HashMap::new(),
    }))
    .collect();
    ProcessFlow { nodes }
}

proptest! {
    /// Testable property 4: for a cyclic flow with no exit, the
    /// interpreter terminates after exactly `visit_budget` visits to
    /// the looping node and issues a hangup.
    #[test]
    fn loop_guard_trips_after_exactly_visit_budget_visits(budget in 1u32..30) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let interp = Interpreter::initialize(linear_self_loop(), dispatcher());
            let host = Arc::new(MockHostSession::new());
            let ctx = MockCallContext::with_visit_budget(host, budget);

            let err = interp.start(&ctx).await.unwrap_err();
            let visits = ctx.visit_count(NodeId::new(1)).await;
            assert_eq!(visits, budget + 1);
            assert!(matches!(
                err,
                ivr_core::error::InterpreterError::LoopGuardTripped { visits: v, .. } if v == budget + 1
            ));
        });
    }

    /// Testable property 5: when two edges declare the same
    /// `InputKeys`, the earlier one in declaration order wins,
    /// regardless of how many duplicate-keyed edges precede it or
    /// what the other declared keys are.
    #[test]
    fn dtmf_tie_break_always_prefers_earliest_declaration(
        prefix_len in 0usize..5,
        other_keys in proptest::collection::vec("[0-9]{1,3}", 0..4),
    ) {
        let mut keys: Vec<String> = (0..prefix_len).map(|_| "5".to_string()).collect();
        keys.extend(other_keys);
        keys.push("5".to_string());
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();

        let flow = menu_node(&key_refs);
        let interp = Interpreter::initialize(flow, dispatcher());
        let start = interp.find_start_node().unwrap().clone();

        if let Some(expected) = key_refs.iter().position(|k| *k == "5") {
            let found = interp.find_child_node_with_dtmf_input("5", &start);
            prop_assert_eq!(found, Some(NodeId::new(expected as i64 + 2)));
        }
    }
}
