//! Tenant population and pacing configuration

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tenantload_core::{RunConfig, TenantId};

use crate::error::{ConfigError, ConfigResult};
use crate::validation::{validate_duration_range, validate_positive, Validatable};

/// Shortest explicit pacing interval accepted
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Longest explicit pacing interval accepted
pub const MAX_INTERVAL: Duration = Duration::from_secs(50);

/// Named workload rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rate {
    High,
    Medium,
    Low,
}

impl Rate {
    /// Pacing interval for this rate
    pub fn interval(self) -> Duration {
        match self {
            Rate::High => Duration::from_secs(10),
            Rate::Medium => Duration::from_secs(30),
            Rate::Low => Duration::from_secs(60),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rate::High => "high",
            Rate::Medium => "medium",
            Rate::Low => "low",
        }
    }
}

impl FromStr for Rate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Rate::High),
            "medium" => Ok(Rate::Medium),
            "low" => Ok(Rate::Low),
            _ => Err(format!("Invalid rate: {}", s)),
        }
    }
}

/// A rate name or an explicit interval, as written in `RATE` / `RATE_MAP`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PacingSpec {
    Named(Rate),
    Interval(Duration),
}

impl PacingSpec {
    pub fn interval(&self) -> Duration {
        match self {
            PacingSpec::Named(rate) => rate.interval(),
            PacingSpec::Interval(interval) => *interval,
        }
    }
}

impl Default for PacingSpec {
    fn default() -> Self {
        PacingSpec::Named(Rate::Low)
    }
}

impl FromStr for PacingSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(rate) = Rate::from_str(s) {
            return Ok(PacingSpec::Named(rate));
        }

        let interval = humantime::parse_duration(s.trim()).map_err(|_| {
            format!(
                "Invalid rate '{}': expected high, medium, low or a duration such as 5s",
                s
            )
        })?;

        if !(MIN_INTERVAL..=MAX_INTERVAL).contains(&interval) {
            return Err(format!(
                "Invalid rate '{}': interval must be between 1s and 50s",
                s
            ));
        }

        Ok(PacingSpec::Interval(interval))
    }
}

impl TryFrom<String> for PacingSpec {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PacingSpec> for String {
    fn from(spec: PacingSpec) -> Self {
        spec.to_string()
    }
}

impl fmt::Display for PacingSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacingSpec::Named(rate) => f.write_str(rate.as_str()),
            PacingSpec::Interval(interval) => {
                write!(f, "{}", humantime::format_duration(*interval))
            }
        }
    }
}

/// Which tenants run, how many users each gets, and how fast they cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantsConfig {
    /// Tenant identifiers
    pub tenants: Vec<String>,

    /// Simulated users per tenant when no override exists
    pub users: usize,

    /// Per-tenant user counts
    pub users_map: BTreeMap<String, usize>,

    /// Global rate when no override exists
    pub rate: PacingSpec,

    /// Per-tenant rate or interval
    pub rate_map: BTreeMap<String, PacingSpec>,

    /// Global interval; wins over `rate` but not over `rate_map`
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub ingest_interval: Option<Duration>,
}

impl Default for TenantsConfig {
    fn default() -> Self {
        Self {
            tenants: Vec::new(),
            users: 1,
            users_map: BTreeMap::new(),
            rate: PacingSpec::default(),
            rate_map: BTreeMap::new(),
            ingest_interval: None,
        }
    }
}

impl TenantsConfig {
    /// Trimmed, de-duplicated tenant ids in configured order
    pub fn tenant_ids(&self) -> ConfigResult<Vec<TenantId>> {
        let mut seen = BTreeSet::new();
        let mut ids = Vec::new();

        for raw in &self.tenants {
            let id = raw.trim();
            if id.is_empty() {
                continue;
            }
            if !seen.insert(id.to_string()) {
                warn!("Tenant {} listed more than once, ignoring duplicate", id);
                continue;
            }
            ids.push(TenantId::new(id));
        }

        if ids.is_empty() {
            return Err(ConfigError::ValidationError(
                "TENANTS is required, e.g. TENANTS=T1001,T1002".to_string(),
            ));
        }

        Ok(ids)
    }

    /// User count for `tenant`: `users_map` then `users`
    pub fn users_for(&self, tenant: &TenantId) -> usize {
        self.users_map
            .get(tenant.as_str())
            .copied()
            .unwrap_or(self.users)
    }

    /// Pacing interval for `tenant`: `rate_map`, then `ingest_interval`, then `rate`
    pub fn interval_for(&self, tenant: &TenantId) -> Duration {
        if let Some(spec) = self.rate_map.get(tenant.as_str()) {
            return spec.interval();
        }
        self.ingest_interval
            .unwrap_or_else(|| self.rate.interval())
    }

    /// Resolve one immutable [`RunConfig`] per tenant
    pub fn resolve(&self) -> ConfigResult<Vec<RunConfig>> {
        self.validate()?;
        let tenants = self.tenant_ids()?;

        for key in self.users_map.keys().chain(self.rate_map.keys()) {
            if !tenants.iter().any(|t| t.as_str() == key) {
                warn!("Override for unknown tenant {} ignored", key);
            }
        }

        Ok(tenants
            .into_iter()
            .map(|tenant| {
                let users = self.users_for(&tenant);
                let interval = self.interval_for(&tenant);
                RunConfig::new(tenant, users, interval)
            })
            .collect())
    }
}

impl Validatable for TenantsConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.users, "users", self.domain_name())?;

        for (tenant, users) in &self.users_map {
            validate_positive(*users, &format!("users_map.{}", tenant), self.domain_name())?;
        }

        if let Some(interval) = self.ingest_interval {
            validate_duration_range(
                interval,
                MIN_INTERVAL,
                MAX_INTERVAL,
                "ingest_interval",
                self.domain_name(),
            )?;
        }

        for (tenant, spec) in &self.rate_map {
            if let PacingSpec::Interval(interval) = spec {
                validate_duration_range(
                    *interval,
                    MIN_INTERVAL,
                    MAX_INTERVAL,
                    &format!("rate_map.{}", tenant),
                    self.domain_name(),
                )?;
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "tenants"
    }
}
