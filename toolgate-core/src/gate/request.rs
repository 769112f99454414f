//! Approval request evaluation

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde_json::Value;

use crate::events::GateEvent;
use crate::permission::{
    ApprovalCallback, ApprovalContext, ApprovalDecision, ApprovalRequest, DecisionSource,
};

use super::ApprovalGate;

impl ApprovalGate {
    /// Decide whether `tool_name` may run with `arguments` in this context.
    ///
    /// Never fails: callback errors, panics and timeouts come back as
    /// denials. An approval with `remember` set pre-approves the tool for the
    /// rest of the context's session.
    ///
    /// Dropping the returned future abandons the request without side
    /// effects; no lock is held while the callback runs.
    pub async fn request_approval(
        &self,
        ctx: &ApprovalContext,
        tool_name: &str,
        arguments: &Value,
    ) -> ApprovalDecision {
        if ctx.is_pre_approved(tool_name) {
            tracing::debug!(tool = tool_name, session = %ctx.session(), "tool pre-approved");
            let decision = ApprovalDecision::pre_approved();
            self.emit_granted(ctx, tool_name, DecisionSource::PreApproved, &decision);
            return decision;
        }

        // One registry read answers both "is it required" and "at what level"
        let Some(risk_level) = self.registry.risk_level_of(tool_name) else {
            tracing::debug!(tool = tool_name, "no approval required");
            let decision = ApprovalDecision::not_required();
            self.emit_granted(ctx, tool_name, DecisionSource::NotRequired, &decision);
            return decision;
        };

        let request = ApprovalRequest {
            tool_name: tool_name.to_string(),
            arguments: arguments.clone(),
            risk_level,
            session: ctx.session().clone(),
        };

        self.emit_event(GateEvent::ApprovalRequired {
            session: request.session.clone(),
            tool_name: request.tool_name.clone(),
            params: request.arguments.clone(),
            risk_level,
        });

        let callback = self.callbacks.get();
        tracing::debug!(
            tool = tool_name,
            risk = %risk_level,
            callback = callback.name(),
            "requesting approval"
        );

        let decision = self.invoke_callback(callback.as_ref(), &request).await;

        if decision.approved {
            if decision.remember {
                ctx.mark_approved(tool_name);
                tracing::info!(tool = tool_name, session = %ctx.session(), "approved for session");
            } else {
                tracing::info!(tool = tool_name, reason = %decision.reason, "approved");
            }
            self.emit_granted(ctx, tool_name, DecisionSource::Callback, &decision);
        } else {
            tracing::info!(tool = tool_name, reason = %decision.reason, "denied");
            self.emit_event(GateEvent::ApprovalDenied {
                session: ctx.session().clone(),
                tool_name: tool_name.to_string(),
                reason: decision.reason.clone(),
            });
        }

        decision
    }

    /// Run the callback, turning every failure mode into a denial.
    async fn invoke_callback(
        &self,
        callback: &dyn ApprovalCallback,
        request: &ApprovalRequest,
    ) -> ApprovalDecision {
        let decide = AssertUnwindSafe(callback.decide(request)).catch_unwind();

        let outcome = match self.callback_timeout {
            Some(limit) => match tokio::time::timeout(limit, decide).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!(
                        tool = %request.tool_name,
                        callback = callback.name(),
                        "approval callback timed out"
                    );
                    return ApprovalDecision::deny(format!(
                        "approval callback timed out after {:?}",
                        limit
                    ));
                }
            },
            None => decide.await,
        };

        match outcome {
            Ok(Ok(decision)) => decision.normalized(),
            Ok(Err(e)) => {
                tracing::warn!(tool = %request.tool_name, error = %e, "approval callback failed");
                ApprovalDecision::deny(format!("approval callback error: {}", e))
            }
            Err(_) => {
                tracing::error!(tool = %request.tool_name, "approval callback panicked");
                ApprovalDecision::deny("approval callback error: callback panicked")
            }
        }
    }

    fn emit_granted(
        &self,
        ctx: &ApprovalContext,
        tool_name: &str,
        source: DecisionSource,
        decision: &ApprovalDecision,
    ) {
        self.emit_event(GateEvent::ApprovalGranted {
            session: ctx.session().clone(),
            tool_name: tool_name.to_string(),
            source,
            reason: decision.reason.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::{
        AutoApprove, AutoDeny, RiskLevel, REASON_NOT_REQUIRED, REASON_PRE_APPROVED,
    };
    use crate::test_utils::{
        FailingCallback, PanickingCallback, RecordingCallback, SlowCallback,
    };
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn gate_with(callback: impl ApprovalCallback + 'static) -> ApprovalGate {
        ApprovalGate::builder().with_callback(callback).build()
    }

    #[tokio::test]
    async fn test_unregistered_tool_never_reaches_callback() {
        let recorder = RecordingCallback::approving();
        let gate = ApprovalGate::builder()
            .with_shared_callback(recorder.clone())
            .build();
        let ctx = gate.new_context();

        let decision = gate.request_approval(&ctx, "read_file", &json!({})).await;

        assert!(decision.approved);
        assert_eq!(decision.reason, REASON_NOT_REQUIRED);
        assert_eq!(recorder.call_count(), 0);
    }

    #[tokio::test]
    async fn test_callback_sees_registered_risk() {
        let recorder = RecordingCallback::approving();
        let gate = ApprovalGate::builder()
            .with_shared_callback(recorder.clone())
            .build();
        let ctx = gate.new_context();
        let args = json!({"command": "rm -rf /tmp/x"});

        let decision = gate.request_approval(&ctx, "execute_command", &args).await;
        assert!(decision.approved);

        let requests = recorder.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].tool_name, "execute_command");
        assert_eq!(requests[0].risk_level, RiskLevel::Critical);
        assert_eq!(requests[0].arguments, args);
        assert_eq!(&requests[0].session, ctx.session());
    }

    #[tokio::test]
    async fn test_denial_is_returned_verbatim() {
        let gate = gate_with(AutoDeny::with_reason("User denied"));
        let ctx = gate.new_context();

        let decision = gate.request_approval(&ctx, "delete_file", &json!({})).await;
        assert!(!decision.approved);
        assert_eq!(decision.reason, "User denied");
    }

    #[tokio::test]
    async fn test_pre_approval_bypasses_registry_and_callback() {
        let recorder = RecordingCallback::denying();
        let gate = ApprovalGate::builder()
            .with_shared_callback(recorder.clone())
            .build();
        let ctx = gate.new_context();
        ctx.mark_approved("execute_command");

        let decision = gate
            .request_approval(&ctx, "execute_command", &json!({}))
            .await;

        assert!(decision.approved);
        assert_eq!(decision.reason, REASON_PRE_APPROVED);
        assert_eq!(recorder.call_count(), 0);
    }

    #[tokio::test]
    async fn test_pre_approval_is_per_session() {
        let gate = gate_with(AutoDeny::new());
        let first = gate.new_context();
        let second = gate.new_context();
        first.mark_approved("write_file");

        assert!(gate.request_approval(&first, "write_file", &json!({})).await.approved);
        assert!(!gate.request_approval(&second, "write_file", &json!({})).await.approved);
    }

    #[tokio::test]
    async fn test_remember_pre_approves_later_calls() {
        let recorder = RecordingCallback::new(ApprovalDecision::approve_for_session("always"));
        let gate = ApprovalGate::builder()
            .with_shared_callback(recorder.clone())
            .build();
        let ctx = gate.new_context();

        let first = gate.request_approval(&ctx, "write_file", &json!({})).await;
        assert_eq!(first.reason, "always");
        assert!(ctx.is_pre_approved("write_file"));

        let second = gate.request_approval(&ctx, "write_file", &json!({})).await;
        assert_eq!(second.reason, REASON_PRE_APPROVED);
        assert_eq!(recorder.call_count(), 1);
    }

    #[tokio::test]
    async fn test_callback_error_becomes_denial() {
        let gate = gate_with(FailingCallback::new("backend unreachable"));
        let ctx = gate.new_context();

        let decision = gate.request_approval(&ctx, "kill_process", &json!({})).await;
        assert!(!decision.approved);
        assert_eq!(decision.reason, "approval callback error: backend unreachable");
    }

    #[tokio::test]
    async fn test_callback_panic_becomes_denial() {
        let gate = gate_with(PanickingCallback);
        let ctx = gate.new_context();

        let decision = gate.request_approval(&ctx, "kill_process", &json!({})).await;
        assert!(!decision.approved);
        assert_eq!(decision.reason, "approval callback error: callback panicked");
    }

    #[tokio::test]
    async fn test_callback_timeout_becomes_denial() {
        let gate = ApprovalGate::builder()
            .with_callback(SlowCallback::new(Duration::from_secs(30)))
            .with_callback_timeout(Duration::from_millis(20))
            .build();
        let ctx = gate.new_context();

        let decision = gate.request_approval(&ctx, "write_file", &json!({})).await;
        assert!(!decision.approved);
        assert!(decision.reason.starts_with("approval callback timed out after"));
    }

    #[tokio::test]
    async fn test_empty_reason_is_filled() {
        let gate = gate_with(|_: &ApprovalRequest| ApprovalDecision::approve(""));
        let ctx = gate.new_context();

        let decision = gate.request_approval(&ctx, "write_file", &json!({})).await;
        assert!(decision.approved);
        assert!(!decision.reason.is_empty());
    }

    #[tokio::test]
    async fn test_denial_drops_remember() {
        let gate = gate_with(|_: &ApprovalRequest| ApprovalDecision {
            approved: false,
            reason: "no".into(),
            modified_args: Some(json!({"x": 1})),
            remember: true,
        });
        let ctx = gate.new_context();

        let decision = gate.request_approval(&ctx, "write_file", &json!({})).await;
        assert!(!decision.remember);
        assert!(decision.modified_args.is_none());
        assert!(!ctx.is_pre_approved("write_file"));
    }

    #[tokio::test]
    async fn test_callback_swap_applies_to_next_request() {
        let gate = gate_with(AutoDeny::new());
        let ctx = gate.new_context();

        assert!(!gate.request_approval(&ctx, "write_file", &json!({})).await.approved);
        gate.set_callback(AutoApprove::new());
        assert!(gate.request_approval(&ctx, "write_file", &json!({})).await.approved);
    }

    #[tokio::test]
    async fn test_dropped_request_leaves_no_state() {
        let gate = Arc::new(
            ApprovalGate::builder()
                .with_callback(SlowCallback::new(Duration::from_secs(30)))
                .build(),
        );
        let ctx = gate.new_context();

        let pending = {
            let gate = Arc::clone(&gate);
            let ctx = ctx.clone();
            tokio::spawn(async move {
                gate.request_approval(&ctx, "write_file", &json!({})).await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        pending.abort();
        assert!(pending.await.unwrap_err().is_cancelled());

        // Gate is still usable and nothing was remembered
        assert!(!ctx.is_pre_approved("write_file"));
        gate.set_callback(AutoApprove::new());
        assert!(gate.request_approval(&ctx, "write_file", &json!({})).await.approved);
    }

    #[tokio::test]
    async fn test_events_for_callback_path() {
        let gate = gate_with(AutoDeny::with_reason("nope"));
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        gate.add_hook(move |event: &GateEvent| sink.lock().push(event.clone()));

        let ctx = gate.new_context();
        gate.request_approval(&ctx, "write_file", &json!({"path": "a"}))
            .await;
        gate.request_approval(&ctx, "read_file", &json!({})).await;

        let events = seen.lock();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[0],
            GateEvent::ApprovalRequired { risk_level: RiskLevel::High, .. }
        ));
        assert!(matches!(&events[1], GateEvent::ApprovalDenied { reason, .. } if reason == "nope"));
        assert!(matches!(
            &events[2],
            GateEvent::ApprovalGranted { source: DecisionSource::NotRequired, .. }
        ));
    }

    #[tokio::test]
    async fn test_concurrent_requests_from_many_sessions() {
        let gate = Arc::new(gate_with(AutoApprove::new()));

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let gate = Arc::clone(&gate);
                tokio::spawn(async move {
                    let ctx = gate.new_context();
                    let tool = if i % 2 == 0 { "write_file" } else { "read_file" };
                    gate.request_approval(&ctx, tool, &json!({"i": i})).await
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().approved);
        }
    }
}
