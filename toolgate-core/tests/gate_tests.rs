//! End-to-end behavior of the approval gate.

mod common;

use common::{EventCollector, HumanInTheLoop, ScriptedCallback};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use toolgate_core::{
    ApprovalDecision, ApprovalGate, AutoApprove, AutoDeny, DecisionSource, GateEvent, RiskLevel,
    SessionId,
};

#[tokio::test]
async fn test_default_registry_without_callback_configuration() {
    let gate = ApprovalGate::builder().with_callback(AutoDeny::new()).build();
    let ctx = gate.new_context();

    for tool in ["execute_command", "write_file", "crawl"] {
        let decision = gate.request_approval(&ctx, tool, &json!({})).await;
        assert!(!decision.approved, "{} should need approval", tool);
    }

    let decision = gate.request_approval(&ctx, "list_files", &json!({})).await;
    assert!(decision.approved);
    assert_eq!(decision.reason, "No approval required");
}

#[tokio::test]
async fn test_session_approval_flow() {
    let callback = Arc::new(
        ScriptedCallback::new()
            .answer("write_file", ApprovalDecision::approve_for_session("User approved")),
    );
    let gate = ApprovalGate::builder()
        .with_shared_callback(callback.clone())
        .build();

    let conversation = gate.context(SessionId::from_string("conversation-42"));
    for _ in 0..3 {
        let decision = gate
            .request_approval(&conversation, "write_file", &json!({"path": "notes.md"}))
            .await;
        assert!(decision.approved);
    }

    // Asked once; the rest were covered by the session approval
    assert_eq!(callback.asked(), vec!["write_file".to_string()]);
    assert_eq!(conversation.approved_tools(), vec!["write_file".to_string()]);

    // A new conversation starts from scratch
    let other = gate.context(SessionId::from_string("conversation-43"));
    gate.request_approval(&other, "write_file", &json!({})).await;
    assert_eq!(callback.asked().len(), 2);

    // Clearing the context asks again
    conversation.clear();
    gate.request_approval(&conversation, "write_file", &json!({}))
        .await;
    assert_eq!(callback.asked().len(), 3);
}

#[tokio::test]
async fn test_removed_requirement_skips_callback() {
    let callback = Arc::new(ScriptedCallback::new());
    let gate = ApprovalGate::builder()
        .with_shared_callback(callback.clone())
        .build();
    let ctx = gate.default_context();

    gate.remove_requirement("crawl");
    let decision = gate.request_approval(&ctx, "crawl", &json!({})).await;

    assert!(decision.approved);
    assert!(callback.asked().is_empty());
}

#[tokio::test]
async fn test_requirement_upgrade_reaches_callback() {
    let gate = ApprovalGate::builder()
        .with_callback(|req: &toolgate_core::ApprovalRequest| {
            if req.risk_level == RiskLevel::Critical {
                ApprovalDecision::deny("critical")
            } else {
                ApprovalDecision::approve("fine")
            }
        })
        .build();
    let ctx = gate.new_context();

    assert!(gate.request_approval(&ctx, "crawl", &json!({})).await.approved);
    gate.add_requirement("crawl", RiskLevel::Critical);
    assert!(!gate.request_approval(&ctx, "crawl", &json!({})).await.approved);
}

#[tokio::test]
async fn test_waiting_request_does_not_block_others() {
    let human = HumanInTheLoop::new();
    let gate = Arc::new(
        ApprovalGate::builder()
            .with_shared_callback(human.clone())
            .build(),
    );
    let ctx = gate.new_context();

    let pending = {
        let gate = Arc::clone(&gate);
        let ctx = ctx.clone();
        tokio::spawn(async move {
            gate.request_approval(&ctx, "execute_command", &json!({"command": "make"}))
                .await
        })
    };
    human.wait_for_request().await;

    // Unrelated calls complete while the operator is thinking
    let decision = gate.request_approval(&ctx, "read_file", &json!({})).await;
    assert!(decision.approved);

    human.release();
    let decision = pending.await.unwrap();
    assert!(decision.approved);
    assert_eq!(decision.reason, "User approved");
}

#[tokio::test]
async fn test_callback_swap_does_not_affect_inflight_request() {
    let human = HumanInTheLoop::new();
    let gate = Arc::new(
        ApprovalGate::builder()
            .with_shared_callback(human.clone())
            .build(),
    );
    let ctx = gate.new_context();

    let pending = {
        let gate = Arc::clone(&gate);
        let ctx = ctx.clone();
        tokio::spawn(async move { gate.request_approval(&ctx, "write_file", &json!({})).await })
    };
    human.wait_for_request().await;

    gate.set_callback(AutoDeny::with_reason("locked down"));
    human.release();

    // In-flight request keeps the callback it started with
    assert!(pending.await.unwrap().approved);

    // New requests use the new one
    let decision = gate.request_approval(&ctx, "write_file", &json!({})).await;
    assert_eq!(decision.reason, "locked down");
}

#[tokio::test]
async fn test_timeout_denies_and_gate_recovers() {
    let human = HumanInTheLoop::new();
    let gate = ApprovalGate::builder()
        .with_shared_callback(human.clone())
        .with_callback_timeout(Duration::from_millis(50))
        .build();
    let ctx = gate.new_context();

    let decision = gate.request_approval(&ctx, "kill_process", &json!({})).await;
    assert!(!decision.approved);
    assert!(decision.reason.contains("timed out"));
    assert!(!ctx.is_pre_approved("kill_process"));

    gate.set_callback(AutoApprove::new());
    assert!(gate.request_approval(&ctx, "kill_process", &json!({})).await.approved);
}

#[tokio::test]
async fn test_events_describe_each_decision_path() {
    let collector = EventCollector::new();
    let gate = ApprovalGate::builder()
        .with_callback(ScriptedCallback::new().answer(
            "write_file",
            ApprovalDecision::approve_for_session("User approved"),
        ))
        .build();
    gate.add_hook(collector.clone());
    let ctx = gate.new_context();

    gate.request_approval(&ctx, "write_file", &json!({})).await;
    gate.request_approval(&ctx, "write_file", &json!({})).await;
    gate.request_approval(&ctx, "read_file", &json!({})).await;
    gate.request_approval(&ctx, "delete_file", &json!({})).await;

    let sources: Vec<DecisionSource> = collector
        .events()
        .iter()
        .filter_map(|e| match e {
            GateEvent::ApprovalGranted { source, .. } => Some(*source),
            _ => None,
        })
        .collect();
    assert_eq!(
        sources,
        vec![
            DecisionSource::Callback,
            DecisionSource::PreApproved,
            DecisionSource::NotRequired
        ]
    );
    assert_eq!(collector.denied_tools(), vec!["delete_file".to_string()]);
}

#[tokio::test]
async fn test_registry_mutation_under_concurrent_requests() {
    let gate = Arc::new(ApprovalGate::builder().with_callback(AutoApprove::new()).build());

    let writer = {
        let gate = Arc::clone(&gate);
        tokio::spawn(async move {
            for i in 0..200 {
                let level = if i % 2 == 0 { RiskLevel::Low } else { RiskLevel::High };
                gate.add_requirement("flaky_tool", level);
                if i % 3 == 0 {
                    gate.remove_requirement("flaky_tool");
                }
                tokio::task::yield_now().await;
            }
        })
    };

    let readers: Vec<_> = (0..8)
        .map(|_| {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                let ctx = gate.new_context();
                for _ in 0..50 {
                    let decision = gate.request_approval(&ctx, "flaky_tool", &json!({})).await;
                    assert!(decision.approved);
                    assert!(!decision.reason.is_empty());
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
}
