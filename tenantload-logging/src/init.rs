use anyhow::{Context, Result};
use tenantload_config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Filter for `config`; a non-empty `RUST_LOG` replaces it entirely
pub fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if std::env::var("RUST_LOG").map(|v| !v.trim().is_empty()).unwrap_or(false) {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
    }

    let mut directives = vec![config.level.as_str().to_string()];
    directives.extend(config.directives.iter().map(|d| d.trim().to_string()));
    let spec = directives.join(",");

    EnvFilter::try_new(&spec).with_context(|| format!("Invalid log filter '{}'", spec))
}

/// Initialize logging from configuration
pub fn init_logging_from_config(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_env_filter(config)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(config.include_target)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    // Use try_init to avoid panic if global subscriber already set
    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    if result.is_err() {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}

/// Initialize simple tracing for basic console output
pub fn init_simple_tracing(log_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_new(log_level)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenantload_config::LogLevel;

    #[test]
    fn test_filter_from_config() {
        temp_env::with_var_unset("RUST_LOG", || {
            let config = LoggingConfig {
                level: LogLevel::Warn,
                directives: vec!["tenantload_runtime=debug".to_string()],
                ..Default::default()
            };
            let filter = build_env_filter(&config).unwrap().to_string();
            assert!(filter.contains("warn"), "{}", filter);
            assert!(filter.contains("tenantload_runtime=debug"), "{}", filter);
        });
    }

    #[test]
    fn test_rust_log_wins() {
        temp_env::with_var("RUST_LOG", Some("trace"), || {
            let filter = build_env_filter(&LoggingConfig::default()).unwrap().to_string();
            assert!(filter.contains("trace"), "{}", filter);
        });
    }

    #[test]
    fn test_invalid_directive_is_an_error() {
        temp_env::with_var_unset("RUST_LOG", || {
            let config = LoggingConfig {
                directives: vec!["tenantload=loud".to_string()],
                ..Default::default()
            };
            assert!(build_env_filter(&config).is_err());
        });
    }
}
