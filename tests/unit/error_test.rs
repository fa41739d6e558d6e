//! Tests for error types

use gpu_admission::core::{SchedulerError, ValidationError};

#[test]
fn test_not_found_error() {
    let err = SchedulerError::not_found("workload", "WL-42");
    assert_eq!(format!("{}", err), "workload not found: WL-42");
    assert_eq!(err.code(), "not_found");
}

#[test]
fn test_precondition_failed_error() {
    let err = SchedulerError::PreconditionFailed("test not passed".to_string());
    assert_eq!(format!("{}", err), "precondition failed: test not passed");
    assert_eq!(err.code(), "precondition_failed");
}

#[test]
fn test_concurrency_violation_error() {
    let err = SchedulerError::ConcurrencyViolation { running: 2, cap: 1 };
    assert_eq!(
        format!("{}", err),
        "concurrency violation: 2 workloads running, cap is 1"
    );
    assert_eq!(err.code(), "concurrency_violation");
}

#[test]
fn test_remaining_codes() {
    assert_eq!(SchedulerError::InvalidRequest("x".into()).code(), "invalid_request");
    assert_eq!(SchedulerError::InvalidConfig("x".into()).code(), "invalid_config");
    assert_eq!(SchedulerError::Shutdown.code(), "shutdown");
    assert_eq!(format!("{}", SchedulerError::Shutdown), "scheduler shut down");
}

#[test]
fn test_validation_error_wraps_scheduler_error() {
    let err: ValidationError = SchedulerError::not_found("job definition", "SP-9").into();
    assert_eq!(format!("{}", err), "job definition not found: SP-9");
    assert_eq!(format!("{}", ValidationError::RunnerClosed), "validation runner closed");
}
