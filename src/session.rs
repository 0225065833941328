//! Debug session snapshot and the feed it is published through.
//!
//! The feed is written only by a session provider (the engine side). Panes hold a cloned
//! snapshot and learn about changes through [`SessionWatcher`].

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Opaque session identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session lifecycle state.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd)]
pub enum SessionStatus {
    Running,
    Paused,
    Stopped,
    Finished,
    Error(String),
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Running => f.write_str("running"),
            SessionStatus::Paused => f.write_str("paused"),
            SessionStatus::Stopped => f.write_str("stopped"),
            SessionStatus::Finished => f.write_str("finished"),
            SessionStatus::Error(e) => write!(f, "error: {e}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd)]
pub struct Session {
    pub id: SessionId,
    pub status: SessionStatus,
    /// Incremented once per executed step or stop.
    pub current_event: u64,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            status: SessionStatus::Paused,
            current_event: 0,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.status == SessionStatus::Paused
    }
}

#[derive(Default)]
struct FeedState {
    snapshot: Option<Session>,
    revision: u64,
}

/// Shared session snapshot with a revision counter.
#[derive(Clone, Default)]
pub struct SessionFeed {
    state: Arc<Mutex<FeedState>>,
}

impl SessionFeed {
    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the whole snapshot.
    pub fn publish(&self, snapshot: Option<Session>) {
        let mut state = self.lock();
        state.snapshot = snapshot;
        state.revision += 1;
    }

    /// Modify current session in place. Return `false` if there is no session.
    pub fn update(&self, f: impl FnOnce(&mut Session)) -> bool {
        let mut state = self.lock();
        let Some(session) = state.snapshot.as_mut() else {
            return false;
        };
        f(session);
        state.revision += 1;
        true
    }

    pub fn current(&self) -> Option<Session> {
        self.lock().snapshot.clone()
    }

    pub fn watch(&self) -> SessionWatcher {
        SessionWatcher {
            feed: self.clone(),
            seen_revision: None,
        }
    }
}

/// Read side of a [`SessionFeed`].
pub struct SessionWatcher {
    feed: SessionFeed,
    seen_revision: Option<u64>,
}

impl SessionWatcher {
    /// Return a fresh snapshot if the feed was changed since the last call.
    /// The first call always returns a snapshot.
    pub fn changed(&mut self) -> Option<Option<Session>> {
        let state = self.feed.lock();
        if self.seen_revision == Some(state.revision) {
            return None;
        }
        self.seen_revision = Some(state.revision);
        Some(state.snapshot.clone())
    }
}
