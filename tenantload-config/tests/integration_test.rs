//! Integration tests for tenantload-config

use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use temp_env::with_vars;
use tenantload_config::*;
use tenantload_core::{RunConfig, TenantId};

const ALL_VARS: &[&str] = &[
    "TENANTS",
    "USERS",
    "USERS_MAP",
    "RATE",
    "RATE_MAP",
    "INGEST_INTERVAL",
    "MONGO_URI",
    "LOG_LEVEL",
    "BATCH_SIZE",
    "FLUSH_INTERVAL",
    "LOG_FORMAT",
    "MONGO_DATABASE",
    "KAFKA_TOPIC",
    "SHUTDOWN_TIMEOUT",
    "AGGREGATION_TIMEOUT",
];

/// Run `f` with exactly `vars` set and every other loader variable cleared
fn with_env<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
    let mut all: Vec<(&str, Option<&str>)> = ALL_VARS.iter().map(|name| (*name, None)).collect();
    for &(name, value) in vars {
        all.retain(|(n, _)| *n != name);
        all.push((name, Some(value)));
    }
    with_vars(all, f);
}

#[test]
fn test_default_config_validation() {
    let config = LoadConfig::default();
    assert!(config.validate_all().is_ok());
}

#[test]
fn test_two_tenant_plan_from_env() {
    with_env(
        &[
            ("TENANTS", "T1,T2"),
            ("USERS_MAP", "T1=2,T2=1"),
            ("RATE_MAP", "T1=1s,T2=2s"),
            ("MONGO_URI", "memory://"),
        ],
        || {
            let config = ConfigLoader::new().from_env().unwrap();
            let plan = config.run_plan().unwrap();

            assert_eq!(
                plan,
                vec![
                    RunConfig::new("T1", 2, Duration::from_secs(1)),
                    RunConfig::new("T2", 1, Duration::from_secs(2)),
                ]
            );
            assert_eq!(config.backend.kind().unwrap(), BackendKind::Memory);
        },
    );
}

#[test]
fn test_ingest_interval_overrides_named_rate() {
    with_env(
        &[
            ("TENANTS", "T1001"),
            ("USERS", "4"),
            ("RATE", "medium"),
            ("INGEST_INTERVAL", "15s"),
        ],
        || {
            let plan = ConfigLoader::new().from_env().unwrap().run_plan().unwrap();
            assert_eq!(plan[0].tenant, TenantId::from("T1001"));
            assert_eq!(plan[0].user_count, 4);
            assert_eq!(plan[0].pacing_interval, Duration::from_secs(15));
        },
    );
}

#[test]
fn test_missing_tenants_is_fatal_for_run_plan() {
    with_env(&[], || {
        let config = ConfigLoader::new().from_env().unwrap();
        let err = config.run_plan().unwrap_err();
        assert!(err.to_string().contains("TENANTS is required"));
    });
}

#[test]
fn test_malformed_values_are_rejected() {
    with_env(&[("TENANTS", "T1"), ("INGEST_INTERVAL", "90s")], || {
        let err = ConfigLoader::new().from_env().unwrap_err();
        assert!(err.to_string().contains("between 1s and 50s"));
    });

    with_env(&[("TENANTS", "T1"), ("USERS", "zero")], || {
        assert!(ConfigLoader::new().from_env().is_err());
    });

    with_env(&[("TENANTS", "T1"), ("USERS_MAP", "T1=0")], || {
        assert!(ConfigLoader::new().from_env().is_err());
    });

    with_env(&[("TENANTS", "T1"), ("RATE", "ludicrous")], || {
        assert!(ConfigLoader::new().from_env().is_err());
    });

    with_env(&[("MONGO_URI", "redis://localhost")], || {
        assert!(ConfigLoader::new().from_env().is_err());
    });
}

#[test]
fn test_prefixed_loader() {
    with_vars(
        vec![
            ("TENANTLOAD_TENANTS", Some("A,B")),
            ("TENANTLOAD_LOG_LEVEL", Some("debug")),
            ("TENANTS", Some("IGNORED")),
        ],
        || {
            let config = ConfigLoader::with_prefix("TENANTLOAD").from_env().unwrap();
            assert_eq!(config.tenants.tenants, vec!["A", "B"]);
            assert_eq!(config.logging.level, LogLevel::Debug);
        },
    );
}

#[test]
fn test_yaml_file_with_env_override() {
    let yaml = r#"
tenants:
  tenants: [T1001, T1002]
  users: 2
  rate: high
  rate_map:
    T1002: 5s

backend:
  uri: "memory://"
  database: loadtest

workload:
  aggregation_timeout: 30s
  shutdown_timeout: 10s

relay:
  topic: orders
  batch_size: 250
  flush_interval: 1s

logging:
  level: warn
  format: json
"#;

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    with_env(&[("BATCH_SIZE", "500")], || {
        let config = ConfigLoader::new().from_file(file.path()).unwrap();

        assert_eq!(config.backend.database, "loadtest");
        assert_eq!(config.workload.aggregation_timeout, Duration::from_secs(30));
        assert_eq!(config.workload.shutdown_timeout, Duration::from_secs(10));
        assert_eq!(config.relay.batch_size, 500);
        assert_eq!(config.relay.flush_interval, Duration::from_secs(1));
        assert_eq!(config.relay.group_id(), "bulk-consumer-orders");
        assert_eq!(config.logging.format, LogFormat::Json);

        let plan = config.run_plan().unwrap();
        assert_eq!(plan[0], RunConfig::new("T1001", 2, Duration::from_secs(10)));
        assert_eq!(plan[1], RunConfig::new("T1002", 2, Duration::from_secs(5)));
    });
}

#[test]
fn test_load_without_file_uses_env() {
    with_env(&[("TENANTS", "X")], || {
        let config = ConfigLoader::new().load(None::<&str>).unwrap();
        assert_eq!(config.tenants.tenants, vec!["X"]);
    });
}

#[test]
fn test_missing_file_is_an_error() {
    let result = ConfigLoader::new().from_file("/nonexistent/tenantload.yaml");
    assert!(matches!(result, Err(ConfigError::FileReadError(_))));
}
