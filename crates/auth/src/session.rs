use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use shelfkeeper_core::{SessionId, Username};

#[derive(Debug, Clone)]
struct LiveSession {
    username: Username,
    expires_at: DateTime<Utc>,
}

/// Registry of live sessions, keyed by session id.
///
/// Exiting a session removes it; tokens that reference a missing session are
/// no longer accepted.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    live: RwLock<HashMap<SessionId, LiveSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, sid: SessionId, username: Username, expires_at: DateTime<Utc>) {
        let mut live = self.live.write().unwrap_or_else(|e| e.into_inner());
        live.insert(sid, LiveSession { username, expires_at });
    }

    /// True when `sid` is open for `username` and not past its expiry.
    pub fn is_live(&self, sid: &SessionId, username: &Username, now: DateTime<Utc>) -> bool {
        let live = self.live.read().unwrap_or_else(|e| e.into_inner());
        live.get(sid)
            .is_some_and(|s| &s.username == username && now < s.expires_at)
    }

    /// Close a session. Returns whether it was open.
    pub fn close(&self, sid: &SessionId) -> bool {
        let mut live = self.live.write().unwrap_or_else(|e| e.into_inner());
        live.remove(sid).is_some()
    }

    /// Drop expired entries; returns how many were removed.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let mut live = self.live.write().unwrap_or_else(|e| e.into_inner());
        let before = live.len();
        live.retain(|_, s| now < s.expires_at);
        before - live.len()
    }
}
