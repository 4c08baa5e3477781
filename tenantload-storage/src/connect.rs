//! Backend selection by connection URI

use std::sync::Arc;
use tracing::info;

use tenantload_config::{BackendConfig, BackendKind};
use tenantload_interfaces::DocumentStore;

use crate::error::{StorageError, StorageResult};
use crate::memory::MemoryStore;

/// Connect to the backend named by `config.uri`, using `config.database`
pub async fn connect(config: &BackendConfig) -> StorageResult<Arc<dyn DocumentStore>> {
    connect_database(config, &config.database).await
}

/// Connect to the backend named by `config.uri`, using `database`
pub async fn connect_database(
    config: &BackendConfig,
    database: &str,
) -> StorageResult<Arc<dyn DocumentStore>> {
    let kind = config
        .kind()
        .map_err(|e| StorageError::ConfigError(e.to_string()))?;

    match kind {
        BackendKind::Memory => {
            info!(database, "Using in-memory document store");
            Ok(Arc::new(MemoryStore::new()))
        }
        BackendKind::MongoDb => connect_mongo(config, database).await,
    }
}

#[cfg(feature = "mongodb")]
async fn connect_mongo(
    config: &BackendConfig,
    database: &str,
) -> StorageResult<Arc<dyn DocumentStore>> {
    let store = crate::mongo::MongoStore::connect(config, database).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "mongodb"))]
async fn connect_mongo(
    config: &BackendConfig,
    _database: &str,
) -> StorageResult<Arc<dyn DocumentStore>> {
    Err(StorageError::ConfigError(format!(
        "{} needs a build with the `mongodb` feature enabled",
        config.uri
    )))
}
