use tenantload_config::{LogFormat, LogLevel, LoggingConfig};
use tenantload_logging::{init_logging_from_config, init_simple_tracing, user_span};

#[test]
fn test_logging_config_integration() {
    let yaml_config = r#"
level: debug
format: json
include_target: true
directives:
  - tenantload_storage=trace
"#;

    let config: LoggingConfig = serde_yaml::from_str(yaml_config).unwrap();
    assert_eq!(config.level, LogLevel::Debug);
    assert_eq!(config.format, LogFormat::Json);

    temp_env::with_var_unset("RUST_LOG", || {
        init_logging_from_config(&config).unwrap();
    });

    // A second initialisation is a no-op rather than a panic
    init_simple_tracing("info").unwrap();
    init_logging_from_config(&LoggingConfig::default()).unwrap();

    let _guard = user_span("T1", 1).entered();
    tracing::info!(order_id = "T1-ORD-1", "order created");
}
