use downline_core::audit::{AuditEvent, AuditSink};
use tokio::sync::mpsc;

/// Audit pipe backed by a bounded channel. `emit` never blocks: when the
/// channel is full or the receiver is gone the event is dropped and logged
/// locally, keeping audit delivery out of the response's critical path.
#[derive(Debug, Clone)]
pub struct BufferedAuditSink {
    tx: mpsc::Sender<AuditEvent>,
}

impl BufferedAuditSink {
    /// Returns the sink and the receiving end a persistence worker drains.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<AuditEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl AuditSink for BufferedAuditSink {
    fn emit(&self, event: AuditEvent) {
        if let Err(err) = self.tx.try_send(event) {
            tracing::warn!(target: "audit", error = %err, "audit event dropped");
        }
    }
}
