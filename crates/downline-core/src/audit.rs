use std::time::SystemTime;

use serde::Serialize;

use crate::subject::SubjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Allowed,
    Denied,
    Failure,
}

impl AuditOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Denied => "denied",
            Self::Failure => "failure",
        }
    }
}

/// One security decision, as recorded. The core emits one event per decision
/// point: resolution failure, permission decision, scope violation,
/// structural failure.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub actor: SubjectId,
    pub action: &'static str,
    pub entity_type: &'static str,
    pub entity_id: String,
    pub outcome: AuditOutcome,
    pub reason: String,
    pub metadata: Vec<(String, String)>,
    pub timestamp: SystemTime,
}

impl AuditEvent {
    pub fn new(
        actor: SubjectId,
        action: &'static str,
        entity_type: &'static str,
        entity_id: impl Into<String>,
        outcome: AuditOutcome,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            actor,
            action,
            entity_type,
            entity_id: entity_id.into(),
            outcome,
            reason: reason.into(),
            metadata: Vec::new(),
            timestamp: SystemTime::now(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }
}

/// Best-effort sink for security-decision events.
///
/// Emission is issued after the decision it records, in order within a
/// request, but must never block or fail the primary operation:
/// implementations swallow their own failures and log them locally.
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

/// Writes audit events as structured tracing events under the `audit`
/// target, one level per outcome. Cannot fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        match event.outcome {
            AuditOutcome::Allowed => tracing::info!(
                target: "audit",
                actor = %event.actor,
                action = event.action,
                entity_type = event.entity_type,
                entity_id = %event.entity_id,
                outcome = event.outcome.label(),
                reason = %event.reason,
                metadata = ?event.metadata,
                "access decision"
            ),
            AuditOutcome::Denied => tracing::warn!(
                target: "audit",
                actor = %event.actor,
                action = event.action,
                entity_type = event.entity_type,
                entity_id = %event.entity_id,
                outcome = event.outcome.label(),
                reason = %event.reason,
                metadata = ?event.metadata,
                "access denied"
            ),
            AuditOutcome::Failure => tracing::error!(
                target: "audit",
                actor = %event.actor,
                action = event.action,
                entity_type = event.entity_type,
                entity_id = %event.entity_id,
                outcome = event.outcome.label(),
                reason = %event.reason,
                metadata = ?event.metadata,
                "security failure"
            ),
        }
    }
}

/// Discards every event. For embedders that haven't wired an audit pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn emit(&self, _event: AuditEvent) {}
}
