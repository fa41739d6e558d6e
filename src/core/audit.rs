//! Audit trail of workload transitions.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::util::clock::now_ms;
use crate::util::serde::WorkloadId;

/// Workload transition recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Submitted and queued directly.
    Admit,
    /// Submitted and parked for approval.
    Park,
    /// Minimum execution test started.
    TestStart,
    /// Minimum execution test finished.
    TestFinish,
    /// Approved and queued.
    Approve,
    /// Rejected.
    Reject,
    /// Priority changed while queued.
    Reprioritize,
    /// Selected for execution.
    Start,
    /// Completed with an artifact.
    Complete,
    /// Execution failed.
    Fail,
    /// Cancelled.
    Cancel,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Admit => "admit",
            Self::Park => "park",
            Self::TestStart => "test_start",
            Self::TestFinish => "test_finish",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Reprioritize => "reprioritize",
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Fail => "fail",
            Self::Cancel => "cancel",
        };
        f.write_str(label)
    }
}

/// Audit event structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Related workload.
    pub workload_id: WorkloadId,
    /// Requester of the workload.
    pub requester: String,
    /// Transition recorded.
    pub action: AuditAction,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context.
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: AuditEvent);
}

/// Bounded in-memory audit sink; the oldest events are dropped first.
pub struct InMemoryAuditSink {
    events: Mutex<VecDeque<AuditEvent>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(max_events.min(1024))),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Events recorded for one workload, oldest first.
    pub fn events_for(&self, workload_id: &WorkloadId) -> Vec<AuditEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| &e.workload_id == workload_id)
            .cloned()
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Helper to build an audit event from context.
pub fn build_audit_event(
    workload_id: &WorkloadId,
    requester: impl Into<String>,
    action: AuditAction,
    detail: Option<String>,
) -> AuditEvent {
    let created_at_ms = now_ms();
    AuditEvent {
        event_id: format!("{workload_id}-{action}-{}", uuid::Uuid::new_v4().simple()),
        workload_id: workload_id.clone(),
        requester: requester.into(),
        action,
        created_at_ms,
        detail,
    }
}
