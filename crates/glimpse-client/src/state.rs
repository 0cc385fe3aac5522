//! Application state shared across the client core.
//!
//! The [`AppState`] struct is wrapped in `Arc<tokio::sync::Mutex<_>>` and
//! handed to whichever components need it.  It is created once at
//! application start; only the session portion is torn down on logout.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::graph::SocialGraphCache;
use crate::session::SessionStore;

/// Central application state: the session and the graph cache.
///
/// Only the mutation coordinator and the login/logout paths write to it;
/// view adapters read.
pub struct AppState {
    /// Who is logged in, plus the persistence handle.
    pub session: SessionStore,

    /// Fetched profiles and posts, patched optimistically by mutations.
    pub graph: SocialGraphCache,
}

impl AppState {
    pub fn new(session: SessionStore) -> Self {
        Self {
            session,
            graph: SocialGraphCache::new(),
        }
    }

    /// State backed by the default on-disk store (memory-only if storage
    /// is unavailable), wrapped for sharing.
    pub fn shared_default() -> SharedState {
        Arc::new(Mutex::new(Self::new(SessionStore::open_default())))
    }

    /// Memory-only state, wrapped for sharing.  Used by tests and by runs
    /// that must not touch the disk.
    pub fn shared_in_memory() -> SharedState {
        Arc::new(Mutex::new(Self::new(SessionStore::new(None))))
    }
}

/// The process-wide handle components are constructed with.
pub type SharedState = Arc<Mutex<AppState>>;
