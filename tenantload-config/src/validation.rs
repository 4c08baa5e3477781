//! Configuration validation traits and utilities

use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Trait for validatable configuration
pub trait Validatable {
    /// Validate the configuration
    fn validate(&self) -> ConfigResult<()>;

    /// Get the domain name for error reporting
    fn domain_name(&self) -> &'static str;

    /// Helper to create a domain-specific validation error
    fn validation_error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::DomainError {
            domain: self.domain_name().to_string(),
            message: message.into(),
        }
    }
}

/// Validate a required string field
pub fn validate_required_string(value: &str, field_name: &str, domain: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} cannot be empty", field_name),
        });
    }
    Ok(())
}

/// Validate a positive number
pub fn validate_positive<T>(value: T, field_name: &str, domain: &str) -> ConfigResult<()>
where
    T: PartialOrd + Default + std::fmt::Display,
{
    if value <= T::default() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} must be greater than 0, got {}", field_name, value),
        });
    }
    Ok(())
}

/// Validate a non-zero duration
pub fn validate_non_zero(value: Duration, field_name: &str, domain: &str) -> ConfigResult<()> {
    if value.is_zero() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} must be greater than 0", field_name),
        });
    }
    Ok(())
}

/// Validate that a duration lies within `min..=max`
pub fn validate_duration_range(
    value: Duration,
    min: Duration,
    max: Duration,
    field_name: &str,
    domain: &str,
) -> ConfigResult<()> {
    if value < min || value > max {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!(
                "{} must be between {} and {}, got {}",
                field_name,
                humantime::format_duration(min),
                humantime::format_duration(max),
                humantime::format_duration(value)
            ),
        });
    }
    Ok(())
}

/// Validate a fraction in `[0, 1)`
pub fn validate_fraction(value: f64, field_name: &str, domain: &str) -> ConfigResult<()> {
    if !(0.0..1.0).contains(&value) {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} must be in [0, 1), got {}", field_name, value),
        });
    }
    Ok(())
}

/// Validate that a URI parses and uses one of the allowed schemes
pub fn validate_uri_scheme(
    uri: &str,
    allowed: &[&str],
    field_name: &str,
    domain: &str,
) -> ConfigResult<()> {
    validate_required_string(uri, field_name, domain)?;

    let parsed = url::Url::parse(uri).map_err(|e| ConfigError::DomainError {
        domain: domain.to_string(),
        message: format!("{} has invalid URI format: {}", field_name, e),
    })?;

    if !allowed.contains(&parsed.scheme()) {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!(
                "{} scheme '{}' is not supported. Valid schemes: {}",
                field_name,
                parsed.scheme(),
                allowed.join(", ")
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive(1usize, "users", "tenants").is_ok());
        assert!(validate_positive(0usize, "users", "tenants").is_err());
    }

    #[test]
    fn test_validate_duration_range() {
        let min = Duration::from_secs(1);
        let max = Duration::from_secs(50);
        assert!(validate_duration_range(Duration::from_secs(1), min, max, "i", "d").is_ok());
        assert!(validate_duration_range(Duration::from_secs(50), min, max, "i", "d").is_ok());

        let err = validate_duration_range(Duration::from_millis(500), min, max, "i", "d")
            .unwrap_err()
            .to_string();
        assert!(err.contains("between 1s and 50s"), "{}", err);
    }

    #[test]
    fn test_validate_fraction() {
        assert!(validate_fraction(0.25, "jitter", "workload").is_ok());
        assert!(validate_fraction(1.0, "jitter", "workload").is_err());
        assert!(validate_fraction(-0.1, "jitter", "workload").is_err());
    }

    #[test]
    fn test_validate_uri_scheme() {
        let allowed = ["memory", "mongodb", "mongodb+srv"];
        assert!(validate_uri_scheme("memory://", &allowed, "uri", "backend").is_ok());
        assert!(validate_uri_scheme(
            "mongodb+srv://user:pw@cluster0.example.net/?appName=Load",
            &allowed,
            "uri",
            "backend"
        )
        .is_ok());
        assert!(validate_uri_scheme("postgres://localhost", &allowed, "uri", "backend").is_err());
        assert!(validate_uri_scheme("", &allowed, "uri", "backend").is_err());
    }
}
