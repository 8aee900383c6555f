//! Keeps one user's blocks in memory and in step with the document store.
//!
//! Local state is replaced wholesale whenever the store delivers a snapshot
//! and is updated optimistically on every toggle. A label with one of this
//! session's writes still in flight keeps its local value until the write
//! settles. Writes are queued in order and never rolled back automatically;
//! callers that want rollback use [`TrackerSession::restore`] with the block
//! returned in [`Toggled`].

use crate::identity::UserId;
use crate::layout::TrackerLayout;
use crate::store::{Document, DocumentKey, DocumentStore, StoreError, Subscription};
use crate::tracker::Block;
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot, Mutex},
    task::JoinHandle,
};
use tracing::{debug, error, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("unknown block '{0}'")]
    UnknownBlock(String),

    #[error("block '{label}' has {expected} cells, got {actual}")]
    LengthMismatch {
        label: String,
        expected: usize,
        actual: usize,
    },

    #[error("cell {index} is out of range for '{label}' ({len} cells)")]
    IndexOutOfRange {
        label: String,
        index: usize,
        len: usize,
    },
}

struct LocalState {
    blocks: HashMap<String, Block>,
    in_flight: HashMap<String, usize>,
}

type Shared = Arc<Mutex<LocalState>>;

struct WriteRequest {
    label: String,
    fields: Document,
    done: oneshot::Sender<Result<(), StoreError>>,
}

/// Completion of a queued write. Dropping it does not cancel the write.
#[derive(Debug)]
pub struct PendingWrite {
    rx: oneshot::Receiver<Result<(), StoreError>>,
}

impl PendingWrite {
    pub async fn outcome(self) -> Result<(), StoreError> {
        self.rx
            .await
            .unwrap_or_else(|_| Err(StoreError::Unavailable("session closed".to_string())))
    }
}

#[derive(Debug)]
pub struct Toggled {
    pub previous: Block,
    pub current: Block,
    pub write: PendingWrite,
}

struct SyncLink {
    key: DocumentKey,
    writes: mpsc::UnboundedSender<WriteRequest>,
    listener: JoinHandle<()>,
}

pub struct TrackerSession {
    user: Option<UserId>,
    layout: Arc<TrackerLayout>,
    state: Shared,
    sync: Option<SyncLink>,
}

impl TrackerSession {
    /// Session bound to `user`'s tracker document.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn open(
        store: Arc<dyn DocumentStore>,
        tracker_id: &str,
        user: UserId,
        layout: Arc<TrackerLayout>,
    ) -> Self {
        let key = DocumentKey::tracker(tracker_id, user.as_str());
        let mut subscription = store.subscribe(&key);
        let initial = subscription.current();
        let state: Shared = Arc::new(Mutex::new(LocalState {
            blocks: materialize_all(&layout, initial.as_ref()),
            in_flight: HashMap::new(),
        }));

        let listener = tokio::spawn(listen(
            subscription,
            Arc::clone(&state),
            Arc::clone(&layout),
            key.clone(),
        ));

        let (writes, queue) = mpsc::unbounded_channel();
        tokio::spawn(write_in_order(store, key.clone(), Arc::clone(&state), queue));

        Self {
            user: Some(user),
            layout,
            state,
            sync: Some(SyncLink {
                key,
                writes,
                listener,
            }),
        }
    }

    /// Session with no identity. It renders blank blocks and refuses toggles.
    pub fn detached(layout: Arc<TrackerLayout>) -> Self {
        let state = Arc::new(Mutex::new(LocalState {
            blocks: materialize_all(&layout, None),
            in_flight: HashMap::new(),
        }));
        Self {
            user: None,
            layout,
            state,
            sync: None,
        }
    }

    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    pub fn is_persisting(&self) -> bool {
        self.sync.is_some()
    }

    pub fn layout(&self) -> &TrackerLayout {
        &self.layout
    }

    /// Blocks in layout order.
    pub async fn snapshot(&self) -> Vec<Block> {
        let state = self.state.lock().await;
        self.layout
            .blocks
            .iter()
            .filter_map(|spec| state.blocks.get(&spec.label).cloned())
            .collect()
    }

    pub async fn block(&self, label: &str) -> Option<Block> {
        self.state.lock().await.blocks.get(label).cloned()
    }

    /// Replaces local blocks with what `document` holds. An absent document
    /// leaves local state alone, as do labels with writes in flight.
    pub async fn apply_snapshot(&self, document: Option<&Document>) {
        replace_blocks(&self.state, &self.layout, document).await;
    }

    pub async fn toggle(&self, label: &str, index: usize) -> Result<Toggled, TrackerError> {
        let sync = self.sync.as_ref().ok_or(TrackerError::NotAuthenticated)?;

        let (previous, current) = {
            let mut state = self.state.lock().await;
            let block = state
                .blocks
                .get_mut(label)
                .ok_or_else(|| TrackerError::UnknownBlock(label.to_string()))?;
            if index >= block.len() {
                return Err(TrackerError::IndexOutOfRange {
                    label: label.to_string(),
                    index,
                    len: block.len(),
                });
            }
            let next = block.toggled(index);
            let previous = std::mem::replace(block, next.clone());
            *state.in_flight.entry(label.to_string()).or_default() += 1;
            (previous, next)
        };

        let (field, value) = current.to_field();
        let mut fields = Document::new();
        fields.insert(field, value);

        let (done, rx) = oneshot::channel();
        let request = WriteRequest {
            label: label.to_string(),
            fields,
            done,
        };
        if sync.writes.send(request).is_err() {
            warn!(document = %sync.key, "write queue closed; change kept locally only");
            settle(&self.state, label).await;
        }

        Ok(Toggled {
            previous,
            current,
            write: PendingWrite { rx },
        })
    }

    /// Puts `block` back as the local value for its label without writing it.
    pub async fn restore(&self, block: Block) -> Result<(), TrackerError> {
        let mut state = self.state.lock().await;
        match state.blocks.get_mut(block.label()) {
            Some(slot) if slot.len() == block.len() => {
                *slot = block;
                Ok(())
            }
            Some(slot) => Err(TrackerError::LengthMismatch {
                label: block.label().to_string(),
                expected: slot.len(),
                actual: block.len(),
            }),
            None => Err(TrackerError::UnknownBlock(block.label().to_string())),
        }
    }
}

impl Drop for TrackerSession {
    fn drop(&mut self) {
        if let Some(sync) = &self.sync {
            sync.listener.abort();
        }
    }
}

fn materialize_all(layout: &TrackerLayout, document: Option<&Document>) -> HashMap<String, Block> {
    layout
        .blocks
        .iter()
        .map(|spec| {
            (
                spec.label.clone(),
                Block::materialize(&spec.label, spec.rows, document),
            )
        })
        .collect()
}

async fn replace_blocks(
    state: &Mutex<LocalState>,
    layout: &TrackerLayout,
    document: Option<&Document>,
) {
    let Some(document) = document else {
        return;
    };
    let mut state = state.lock().await;
    let LocalState { blocks, in_flight } = &mut *state;
    for spec in &layout.blocks {
        if in_flight.get(&spec.label).is_some_and(|count| *count > 0) {
            continue;
        }
        blocks.insert(
            spec.label.clone(),
            Block::materialize(&spec.label, spec.rows, Some(document)),
        );
    }
}

async fn settle(state: &Mutex<LocalState>, label: &str) {
    let mut state = state.lock().await;
    if let Some(count) = state.in_flight.get_mut(label) {
        *count = count.saturating_sub(1);
        if *count == 0 {
            state.in_flight.remove(label);
        }
    }
}

async fn listen(
    mut subscription: Subscription,
    state: Shared,
    layout: Arc<TrackerLayout>,
    key: DocumentKey,
) {
    while let Some(document) = subscription.changed().await {
        debug!(document = %key, present = document.is_some(), "snapshot received");
        replace_blocks(&state, &layout, document.as_ref()).await;
    }
}

async fn write_in_order(
    store: Arc<dyn DocumentStore>,
    key: DocumentKey,
    state: Shared,
    mut queue: mpsc::UnboundedReceiver<WriteRequest>,
) {
    while let Some(WriteRequest { label, fields, done }) = queue.recv().await {
        let result = store.merge_write(&key, fields).await;
        if let Err(err) = &result {
            error!(document = %key, "error updating document: {err}");
        }
        settle(&state, &label).await;
        let _ = done.send(result);
    }
}
