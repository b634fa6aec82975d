//! In-process session slots, one per user
//!
//! Each user gets a slot guarded by its own async mutex. Handlers hold the
//! slot for the whole request, so a user's ranking requests run one at a
//! time while different users proceed in parallel.

use crate::session::InsertionSession;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

pub type SessionSlot = OwnedMutexGuard<Option<InsertionSession>>;

#[derive(Clone, Default)]
pub struct SessionStore {
    slots: Arc<RwLock<HashMap<String, Arc<Mutex<Option<InsertionSession>>>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the user's slot, creating an empty one on first use
    pub async fn lock(&self, user_id: &str) -> SessionSlot {
        let existing = self.slots.read().await.get(user_id).cloned();
        let slot = match existing {
            Some(slot) => slot,
            None => self
                .slots
                .write()
                .await
                .entry(user_id.to_string())
                .or_default()
                .clone(),
        };
        slot.lock_owned().await
    }

    /// Current session for a user without holding the slot
    pub async fn peek(&self, user_id: &str) -> Option<InsertionSession> {
        let slot = self.slots.read().await.get(user_id).cloned()?;
        let session = *slot.lock().await;
        session
    }

    /// Drop the user's session if it belongs to `entry_id`
    pub async fn clear_for_entry(&self, user_id: &str, entry_id: uuid::Uuid) {
        let mut slot = self.lock(user_id).await;
        if matches!(*slot, Some(session) if session.matches(entry_id)) {
            *slot = None;
        }
    }
}
