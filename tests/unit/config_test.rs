//! Tests for configuration validation

use gpu_admission::config::{ClusterCapacity, SchedulerConfig};

#[test]
fn test_scheduler_config_defaults_are_valid() {
    let config = SchedulerConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.trigger_buffer, 64);
    assert_eq!(config.min_test_duration_ms, 2500);
    assert_eq!(config.cluster, ClusterCapacity::default());
}

#[test]
fn test_scheduler_config_zero_threshold() {
    let invalid = SchedulerConfig {
        gpu_threshold: 0,
        ..SchedulerConfig::default()
    };
    assert!(invalid.validate().is_err());

    let invalid = SchedulerConfig {
        mem_threshold_gb: 0,
        ..SchedulerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_zero_concurrency() {
    let invalid = SchedulerConfig {
        max_concurrent: 0,
        ..SchedulerConfig::default()
    };
    let err = invalid.validate().unwrap_err();
    assert!(err.contains("max_concurrent"));
}

#[test]
fn test_scheduler_config_zero_buffers() {
    let invalid = SchedulerConfig {
        trigger_buffer: 0,
        ..SchedulerConfig::default()
    };
    assert!(invalid.validate().is_err());

    let invalid = SchedulerConfig {
        audit_capacity: 0,
        ..SchedulerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_from_json() {
    let json = r#"{
        "gpu_threshold": 8,
        "max_concurrent": 2,
        "cluster": { "a100_gpus": 32 }
    }"#;

    let config = SchedulerConfig::from_json_str(json).unwrap();
    assert_eq!(config.gpu_threshold, 8);
    assert_eq!(config.mem_threshold_gb, 128);
    assert_eq!(config.max_concurrent, 2);
    assert_eq!(config.cluster.a100_gpus, 32);
    assert_eq!(config.cluster.v100_gpus, 8);
}

#[test]
fn test_scheduler_config_from_json_rejects_invalid() {
    assert!(SchedulerConfig::from_json_str(r#"{ "max_concurrent": 0 }"#).is_err());
    let err = SchedulerConfig::from_json_str("{ not json").unwrap_err();
    assert!(err.starts_with("parse error"));
}
