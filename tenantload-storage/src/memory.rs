//! In-memory document store
//!
//! Collections are created on first use and live as long as the store. Every
//! call passes through the store's [`FaultInjector`] before it touches data,
//! and is counted per collection and operation so tests can assert on the
//! traffic a workload generated.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use tenantload_interfaces::{BackendError, Document, DocumentCollection, DocumentStore};

use crate::faults::{FaultInjector, Operation};
use crate::query;

type SharedDocs = Arc<RwLock<Vec<Document>>>;

#[derive(Debug, Default)]
struct StoreInner {
    collections: RwLock<HashMap<String, SharedDocs>>,
    calls: Mutex<HashMap<(String, Operation), u64>>,
    faults: FaultInjector,
}

impl StoreInner {
    fn docs(&self, name: &str) -> SharedDocs {
        if let Some(docs) = self.collections.read().get(name) {
            return docs.clone();
        }

        let mut collections = self.collections.write();
        collections
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(collection = name, "Creating in-memory collection");
                Arc::new(RwLock::new(Vec::new()))
            })
            .clone()
    }

    fn record(&self, name: &str, operation: Operation) {
        *self
            .calls
            .lock()
            .entry((name.to_string(), operation))
            .or_insert(0) += 1;
    }

    async fn enter(&self, name: &str, operation: Operation) -> Result<(), BackendError> {
        self.record(name, operation);
        self.faults.apply(Some(name), operation).await
    }
}

/// Document store kept entirely in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fault rules applied to every call on this store
    pub fn faults(&self) -> &FaultInjector {
        &self.inner.faults
    }

    /// Number of documents currently in `name`
    pub fn document_count(&self, name: &str) -> usize {
        self.inner
            .collections
            .read()
            .get(name)
            .map(|docs| docs.read().len())
            .unwrap_or(0)
    }

    /// Snapshot of every document in `name`
    pub fn documents(&self, name: &str) -> Vec<Document> {
        self.inner
            .collections
            .read()
            .get(name)
            .map(|docs| docs.read().clone())
            .unwrap_or_default()
    }

    /// Remove every document from `name`, keeping the collection
    pub fn clear_collection(&self, name: &str) {
        if let Some(docs) = self.inner.collections.read().get(name) {
            docs.write().clear();
        }
    }

    /// Names of every collection touched so far, sorted
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// How many times `operation` was called on `name`, including failed calls
    pub fn call_count(&self, name: &str, operation: Operation) -> u64 {
        self.inner
            .calls
            .lock()
            .get(&(name.to_string(), operation))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn collection(&self, name: &str) -> Arc<dyn DocumentCollection> {
        Arc::new(MemoryCollection {
            name: name.to_string(),
            docs: self.inner.docs(name),
            store: self.inner.clone(),
        })
    }

    async fn ping(&self) -> Result<(), BackendError> {
        self.inner.faults.apply(None, Operation::Ping).await
    }
}

/// Handle for one collection of a [`MemoryStore`]
#[derive(Debug, Clone)]
pub struct MemoryCollection {
    name: String,
    docs: SharedDocs,
    store: Arc<StoreInner>,
}

fn ensure_object(doc: &Document, position: usize) -> Result<(), BackendError> {
    if doc.is_object() {
        Ok(())
    } else {
        Err(BackendError::rejected(format!(
            "document {} is not an object",
            position
        )))
    }
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert_one(&self, doc: Document) -> Result<(), BackendError> {
        self.store.enter(&self.name, Operation::InsertOne).await?;
        ensure_object(&doc, 0)?;
        self.docs.write().push(doc);
        Ok(())
    }

    async fn insert_many(
        &self,
        docs: Vec<Document>,
        ordered: bool,
    ) -> Result<usize, BackendError> {
        self.store.enter(&self.name, Operation::InsertMany).await?;

        let mut written = 0;
        let mut rejected = Vec::new();
        {
            let mut stored = self.docs.write();
            for (position, doc) in docs.into_iter().enumerate() {
                match ensure_object(&doc, position) {
                    Ok(()) => {
                        stored.push(doc);
                        written += 1;
                    }
                    Err(err) if ordered => return Err(err),
                    Err(_) => rejected.push(position),
                }
            }
        }

        if rejected.is_empty() {
            Ok(written)
        } else {
            Err(BackendError::rejected(format!(
                "{} of {} documents rejected (positions {:?})",
                rejected.len(),
                written + rejected.len(),
                rejected
            )))
        }
    }

    async fn find(&self, filter: Document) -> Result<Vec<Document>, BackendError> {
        self.store.enter(&self.name, Operation::Find).await?;
        let docs = self.docs.read();
        let mut found = Vec::new();
        for doc in docs.iter() {
            if query::matches(doc, &filter)? {
                found.push(doc.clone());
            }
        }
        Ok(found)
    }

    async fn count(&self, filter: Document) -> Result<u64, BackendError> {
        self.store.enter(&self.name, Operation::Count).await?;
        let docs = self.docs.read();
        let mut count = 0;
        for doc in docs.iter() {
            if query::matches(doc, &filter)? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn aggregate(
        &self,
        pipeline: Vec<Document>,
        _batch_size: u32,
    ) -> Result<Vec<Document>, BackendError> {
        self.store.enter(&self.name, Operation::Aggregate).await?;
        let snapshot = self.docs.read().clone();
        query::aggregate(snapshot, &pipeline)
    }
}
