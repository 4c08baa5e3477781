//! Core type definitions for tenantload

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Tenant identifier; the unit of isolation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Physical collection name for one of this tenant's collections
    pub fn collection_name(&self, kind: CollectionKind) -> String {
        format!("{}_{}", self.0, kind.as_str())
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TenantId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TenantId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The fixed set of collections every tenant owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Customers,
    Inventory,
    Orders,
    Shipments,
    Payments,
}

impl CollectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Customers => "customers",
            CollectionKind::Inventory => "inventory",
            CollectionKind::Orders => "orders",
            CollectionKind::Shipments => "shipments",
            CollectionKind::Payments => "payments",
        }
    }

    pub fn all() -> &'static [CollectionKind] {
        &[
            CollectionKind::Customers,
            CollectionKind::Inventory,
            CollectionKind::Orders,
            CollectionKind::Shipments,
            CollectionKind::Payments,
        ]
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved per-tenant run parameters, immutable for the lifetime of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub tenant: TenantId,
    pub user_count: usize,
    #[serde(with = "serde_millis")]
    pub pacing_interval: Duration,
}

impl RunConfig {
    pub fn new(tenant: impl Into<TenantId>, user_count: usize, pacing_interval: Duration) -> Self {
        Self {
            tenant: tenant.into(),
            user_count,
            pacing_interval,
        }
    }
}

/// Millisecond (de)serialisation for durations embedded in run plans
mod serde_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_names_are_tenant_prefixed() {
        let tenant = TenantId::from("T1001");
        assert_eq!(tenant.collection_name(CollectionKind::Orders), "T1001_orders");
        assert_eq!(
            tenant.collection_name(CollectionKind::Inventory),
            "T1001_inventory"
        );
        assert_eq!(CollectionKind::all().len(), 5);
    }

    #[test]
    fn test_run_config_serialization() {
        let config = RunConfig::new("T1", 2, Duration::from_secs(1));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["tenant"], "T1");
        assert_eq!(json["user_count"], 2);
        assert_eq!(json["pacing_interval"], 1000);
    }
}
