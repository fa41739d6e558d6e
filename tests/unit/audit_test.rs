//! Tests for audit sink

use gpu_admission::core::{build_audit_event, AuditAction, AuditSink, InMemoryAuditSink};
use gpu_admission::util::serde::WorkloadId;

#[test]
fn test_in_memory_audit_sink() {
    let sink = InMemoryAuditSink::new(10);
    let id = WorkloadId::new("WL-1");

    sink.record(build_audit_event(&id, "alice", AuditAction::Park, None));
    sink.record(build_audit_event(&WorkloadId::new("WL-2"), "bob", AuditAction::Admit, None));
    sink.record(build_audit_event(&id, "alice", AuditAction::Reject, Some("too big".into())));

    assert_eq!(sink.events().len(), 3);
    let for_one = sink.events_for(&id);
    assert_eq!(for_one.len(), 2);
    assert_eq!(for_one[1].action, AuditAction::Reject);
    assert_eq!(for_one[1].detail.as_deref(), Some("too big"));
}

#[test]
fn test_audit_sink_overflow() {
    let sink = InMemoryAuditSink::new(2);

    sink.record(build_audit_event(&WorkloadId::new("WL-1"), "a", AuditAction::Admit, None));
    sink.record(build_audit_event(&WorkloadId::new("WL-2"), "a", AuditAction::Admit, None));
    sink.record(build_audit_event(&WorkloadId::new("WL-3"), "a", AuditAction::Admit, None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].workload_id.as_str(), "WL-2"); // First one popped
    assert_eq!(events[1].workload_id.as_str(), "WL-3");
}

#[test]
fn test_build_audit_event() {
    let event = build_audit_event(
        &WorkloadId::new("WL-7"),
        "carol",
        AuditAction::Complete,
        Some("MD-1".to_string()),
    );

    assert!(event.event_id.starts_with("WL-7-complete-"));
    assert_eq!(event.requester, "carol");
    assert_eq!(event.action, AuditAction::Complete);
    assert_eq!(event.detail, Some("MD-1".to_string()));
    assert!(event.created_at_ms > 0);
}

#[test]
fn test_event_ids_are_unique() {
    let id = WorkloadId::new("WL-7");
    let a = build_audit_event(&id, "carol", AuditAction::Start, None);
    let b = build_audit_event(&id, "carol", AuditAction::Start, None);
    assert_ne!(a.event_id, b.event_id);
}
