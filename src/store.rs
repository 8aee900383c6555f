use serde_json::{Map, Value};
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    future::Future,
    path::{Path, PathBuf},
    pin::Pin,
    sync::{Mutex, PoisonError},
};
use thiserror::Error;
use tokio::{fs, sync::watch};
use tracing::{debug, error};

/// Top-level fields of a stored document.
pub type Document = Map<String, Value>;

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write data file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode documents: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentKey {
    pub collection: String,
    pub document: String,
}

impl DocumentKey {
    pub fn new(collection: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            document: document.into(),
        }
    }

    /// Per-user tracker document: `trackers/{tracker_id}/users/{user_id}`.
    pub fn tracker(tracker_id: &str, user_id: &str) -> Self {
        Self::new(format!("trackers/{tracker_id}/users"), user_id)
    }

    fn path(&self) -> String {
        format!("{}/{}", self.collection, self.document)
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Live view of one document. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    rx: watch::Receiver<Option<Document>>,
}

impl Subscription {
    pub fn new(rx: watch::Receiver<Option<Document>>) -> Self {
        Self { rx }
    }

    /// Latest delivered snapshot; `None` when the document does not exist.
    pub fn current(&mut self) -> Option<Document> {
        self.rx.borrow_and_update().clone()
    }

    /// Waits for the next delivery. Returns `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<Option<Document>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

pub trait DocumentStore: Send + Sync {
    fn subscribe(&self, key: &DocumentKey) -> Subscription;

    /// Replaces the given top-level fields, creating the document when absent.
    /// Fields not named in `fields` are kept.
    fn merge_write<'a>(&'a self, key: &'a DocumentKey, fields: Document) -> StoreFuture<'a, ()>;
}

/// Document store kept in process, optionally mirrored to a JSON file.
pub struct LocalStore {
    documents: Mutex<BTreeMap<String, Document>>,
    watchers: Mutex<HashMap<String, watch::Sender<Option<Document>>>>,
    write_lock: tokio::sync::Mutex<()>,
    path: Option<PathBuf>,
}

impl LocalStore {
    pub fn in_memory() -> Self {
        Self::with_documents(BTreeMap::new(), None)
    }

    /// Opens a file-backed store. Unreadable files start empty.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let documents = load_documents(&path).await;
        Self::with_documents(documents, Some(path))
    }

    fn with_documents(documents: BTreeMap<String, Document>, path: Option<PathBuf>) -> Self {
        Self {
            documents: Mutex::new(documents),
            watchers: Mutex::new(HashMap::new()),
            write_lock: tokio::sync::Mutex::new(()),
            path,
        }
    }

    /// Subscriptions on `key` that are still held by someone.
    pub fn live_subscribers(&self, key: &DocumentKey) -> usize {
        let watchers = self.watchers.lock().unwrap_or_else(PoisonError::into_inner);
        watchers
            .get(&key.path())
            .map_or(0, |tx| tx.receiver_count())
    }

    pub fn get(&self, key: &DocumentKey) -> Option<Document> {
        let documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        documents.get(&key.path()).cloned()
    }

    async fn merge(&self, key: &DocumentKey, fields: Document) -> Result<(), StoreError> {
        let _writer = self.write_lock.lock().await;
        let path = key.path();

        let (merged, all) = {
            let documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
            let mut merged = documents.get(&path).cloned().unwrap_or_default();
            merged.extend(fields);
            let all = self.path.as_ref().map(|_| {
                let mut all = documents.clone();
                all.insert(path.clone(), merged.clone());
                all
            });
            (merged, all)
        };

        if let (Some(file), Some(all)) = (self.path.as_deref(), all.as_ref()) {
            persist_documents(file, all).await?;
        }

        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.clone(), merged.clone());

        let watchers = self.watchers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = watchers.get(&path) {
            tx.send_replace(Some(merged));
            debug!(document = %key, receivers = tx.receiver_count(), "delivered snapshot");
        }
        Ok(())
    }
}

impl DocumentStore for LocalStore {
    fn subscribe(&self, key: &DocumentKey) -> Subscription {
        let path = key.path();
        let mut watchers = self.watchers.lock().unwrap_or_else(PoisonError::into_inner);
        watchers.retain(|_, tx| tx.receiver_count() > 0);
        let rx = match watchers.get(&path) {
            Some(tx) => tx.subscribe(),
            None => {
                let (tx, rx) = watch::channel(self.get(key));
                watchers.insert(path, tx);
                rx
            }
        };
        Subscription::new(rx)
    }

    fn merge_write<'a>(&'a self, key: &'a DocumentKey, fields: Document) -> StoreFuture<'a, ()> {
        Box::pin(self.merge(key, fields))
    }
}

async fn load_documents(path: &Path) -> BTreeMap<String, Document> {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(documents) => documents,
            Err(err) => {
                error!("failed to parse data file: {err}");
                BTreeMap::new()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
        Err(err) => {
            error!("failed to read data file: {err}");
            BTreeMap::new()
        }
    }
}

async fn persist_documents(
    path: &Path,
    documents: &BTreeMap<String, Document>,
) -> Result<(), StoreError> {
    let payload = serde_json::to_vec_pretty(documents)?;
    fs::write(path, payload).await?;
    Ok(())
}
