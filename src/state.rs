use crate::identity::{IdentityProvider, UserId};
use crate::layout::TrackerLayout;
use crate::session::TrackerSession;
use crate::store::DocumentStore;
use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};
use tokio::sync::Mutex;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub tracker_id: String,
    pub layout: Arc<TrackerLayout>,
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub sessions: Arc<Mutex<HashMap<UserId, Weak<TrackerSession>>>>,
    pub detached: Arc<TrackerSession>,
}

impl AppState {
    pub fn new(
        tracker_id: impl Into<String>,
        layout: TrackerLayout,
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let layout = Arc::new(layout);
        Self {
            tracker_id: tracker_id.into(),
            detached: Arc::new(TrackerSession::detached(Arc::clone(&layout))),
            layout,
            store,
            identity,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Session for `user`, shared by every request that holds it at the same time.
    /// The map only keeps weak handles; a session closes once the last request drops it.
    pub async fn session_for(&self, user: &UserId) -> Arc<TrackerSession> {
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, session| session.strong_count() > 0);
        if let Some(session) = sessions.get(user).and_then(Weak::upgrade) {
            return session;
        }
        info!(user = %user, "opening tracker session");
        let session = Arc::new(TrackerSession::open(
            Arc::clone(&self.store),
            &self.tracker_id,
            user.clone(),
            Arc::clone(&self.layout),
        ));
        sessions.insert(user.clone(), Arc::downgrade(&session));
        session
    }

    pub async fn close_all(&self) {
        self.sessions.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::AnonymousIdentity;
    use crate::store::{DocumentKey, LocalStore};
    use std::time::Duration;

    fn state_on(store: Arc<LocalStore>) -> AppState {
        AppState::new("t", TrackerLayout::default(), store, Arc::new(AnonymousIdentity))
    }

    #[tokio::test]
    async fn sessions_are_reused_per_user() {
        let state = state_on(Arc::new(LocalStore::in_memory()));
        let alice = UserId::for_tests("alice");
        let bob = UserId::for_tests("bob");

        let first = state.session_for(&alice).await;
        let again = state.session_for(&alice).await;
        let other = state.session_for(&bob).await;
        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
        assert!(!state.detached.is_persisting());

        state.close_all().await;
        assert!(state.sessions.lock().await.is_empty());
    }

    #[tokio::test]
    async fn released_sessions_are_evicted() {
        let store = Arc::new(LocalStore::in_memory());
        let state = state_on(Arc::clone(&store));

        let mut open = Vec::new();
        for n in 0..50 {
            let user = UserId::for_tests(&format!("user-{n}"));
            open.push(state.session_for(&user).await);
        }
        assert_eq!(state.sessions.lock().await.len(), 50);
        drop(open);

        let last = UserId::for_tests("last");
        let held = state.session_for(&last).await;
        assert_eq!(state.sessions.lock().await.len(), 1);

        let gone = DocumentKey::tracker("t", "user-0");
        tokio::time::timeout(Duration::from_secs(1), async {
            while store.live_subscribers(&gone) > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("dropped session kept its subscription");
        assert_eq!(store.live_subscribers(&DocumentKey::tracker("t", "last")), 1);
        drop(held);
    }

    #[tokio::test]
    async fn a_fresh_session_replaces_a_released_one() {
        let state = state_on(Arc::new(LocalStore::in_memory()));
        let alice = UserId::for_tests("alice");

        let first = state.session_for(&alice).await;
        let weak = Arc::downgrade(&first);
        drop(first);
        assert!(weak.upgrade().is_none());

        let second = state.session_for(&alice).await;
        assert!(second.is_persisting());
        assert_eq!(state.sessions.lock().await.len(), 1);
    }
}
