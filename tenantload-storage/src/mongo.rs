//! MongoDB-backed document store

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Bson};
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use tenantload_config::BackendConfig;
use tenantload_interfaces::{with_deadline, BackendError, Document, DocumentCollection, DocumentStore};

use crate::error::{StorageError, StorageResult};

/// Classify a driver error for the retry executor
fn classify(err: MongoError) -> BackendError {
    match err.kind.as_ref() {
        ErrorKind::Io(_)
        | ErrorKind::ServerSelection { .. }
        | ErrorKind::ConnectionPoolCleared { .. } => BackendError::network(err.to_string()),
        ErrorKind::BsonSerialization(_) | ErrorKind::BsonDeserialization(_) => {
            BackendError::Serialization {
                message: err.to_string(),
            }
        }
        ErrorKind::Write(_) | ErrorKind::InsertMany(_) | ErrorKind::Command(_) => {
            BackendError::rejected(err.to_string())
        }
        _ => BackendError::internal(err.to_string()),
    }
}

fn to_bson(doc: &Document) -> Result<bson::Document, BackendError> {
    bson::to_document(doc).map_err(|e| BackendError::Serialization {
        message: e.to_string(),
    })
}

fn from_bson(doc: bson::Document) -> Document {
    Bson::Document(doc).into_relaxed_extjson()
}

/// Store backed by one MongoDB database
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    database: Database,
    ping_timeout: Duration,
}

impl MongoStore {
    /// Connect with the configured pool size and deadlines, then ping once
    pub async fn connect(config: &BackendConfig, database: &str) -> StorageResult<Self> {
        let mut options = with_deadline(config.connect_timeout, async {
            ClientOptions::parse(&config.uri).await.map_err(classify)
        })
        .await
        .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        options.max_pool_size = Some(config.max_pool_size);
        options.connect_timeout = Some(config.connect_timeout);
        options.server_selection_timeout = Some(config.connect_timeout);
        options.app_name = Some("tenantload".to_string());

        let client =
            Client::with_options(options).map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;
        let store = Self {
            database: client.database(database),
            client,
            ping_timeout: config.ping_timeout,
        };

        store
            .ping()
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;
        info!(
            database,
            max_pool_size = config.max_pool_size,
            "Connected to MongoDB"
        );
        Ok(store)
    }

    /// Close pooled connections
    pub async fn shutdown(self) {
        self.client.shutdown().await;
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn backend_name(&self) -> &'static str {
        "mongodb"
    }

    fn collection(&self, name: &str) -> Arc<dyn DocumentCollection> {
        Arc::new(MongoCollection {
            name: name.to_string(),
            inner: self.database.collection(name),
        })
    }

    async fn ping(&self) -> Result<(), BackendError> {
        with_deadline(self.ping_timeout, async {
            self.database
                .run_command(doc! { "ping": 1 })
                .await
                .map(|_| ())
                .map_err(classify)
        })
        .await
    }
}

/// One MongoDB collection
#[derive(Debug, Clone)]
pub struct MongoCollection {
    name: String,
    inner: Collection<bson::Document>,
}

#[async_trait]
impl DocumentCollection for MongoCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert_one(&self, doc: Document) -> Result<(), BackendError> {
        let doc = to_bson(&doc)?;
        self.inner.insert_one(doc).await.map_err(classify)?;
        Ok(())
    }

    async fn insert_many(
        &self,
        docs: Vec<Document>,
        ordered: bool,
    ) -> Result<usize, BackendError> {
        let docs = docs.iter().map(to_bson).collect::<Result<Vec<_>, _>>()?;
        let result = self
            .inner
            .insert_many(docs)
            .ordered(ordered)
            .await
            .map_err(classify)?;
        Ok(result.inserted_ids.len())
    }

    async fn find(&self, filter: Document) -> Result<Vec<Document>, BackendError> {
        let cursor = self.inner.find(to_bson(&filter)?).await.map_err(classify)?;
        let docs: Vec<bson::Document> = cursor.try_collect().await.map_err(classify)?;
        Ok(docs.into_iter().map(from_bson).collect())
    }

    async fn count(&self, filter: Document) -> Result<u64, BackendError> {
        self.inner
            .count_documents(to_bson(&filter)?)
            .await
            .map_err(classify)
    }

    async fn aggregate(
        &self,
        pipeline: Vec<Document>,
        batch_size: u32,
    ) -> Result<Vec<Document>, BackendError> {
        let pipeline = pipeline.iter().map(to_bson).collect::<Result<Vec<_>, _>>()?;
        let cursor = self
            .inner
            .aggregate(pipeline)
            .batch_size(batch_size)
            .await
            .map_err(classify)?;
        let docs: Vec<bson::Document> = cursor.try_collect().await.map_err(classify)?;
        debug!(collection = %self.name, results = docs.len(), "Aggregation drained");
        Ok(docs.into_iter().map(from_bson).collect())
    }

    async fn create_index(&self, keys: Document) -> Result<(), BackendError> {
        let model = IndexModel::builder().keys(to_bson(&keys)?).build();
        self.inner.create_index(model).await.map_err(classify)?;
        Ok(())
    }
}
