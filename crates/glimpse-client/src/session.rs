//! Session store: the single source of truth for "who is logged in".
//!
//! Holds the current user's profile snapshot and auth token, and mirrors
//! both into the local database so a restart preserves the session.  The
//! invariant is that token and profile are both present or both absent; a
//! half-present pair found on disk is discarded rather than restored.

use glimpse_shared::{Profile, ProfilePatch, UserId};
use glimpse_store::{Database, PROFILE_KEY, TOKEN_KEY};

use crate::error::{ClientError, Result};

/// In-memory session plus its persistence handle.
///
/// Only the mutation coordinator and the login/logout paths write here;
/// everything else reads.
pub struct SessionStore {
    profile: Option<Profile>,
    token: Option<String>,
    /// `None` when local storage is unavailable; the session then lives
    /// in memory only for this run.
    store: Option<Database>,
}

impl SessionStore {
    /// Create a session store over an already-open database (or none).
    pub fn new(store: Option<Database>) -> Self {
        Self {
            profile: None,
            token: None,
            store,
        }
    }

    /// Open the default database, degrading to memory-only if storage is
    /// unavailable.
    pub fn open_default() -> Self {
        let store = match Database::new() {
            Ok(db) => Some(db),
            Err(e) => {
                tracing::warn!(error = %e, "session storage unavailable, running memory-only");
                None
            }
        };
        Self::new(store)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Store a freshly authenticated session and persist it.
    ///
    /// Fails only on invalid arguments; persistence errors degrade to a
    /// memory-only session for the run.
    pub fn login(&mut self, profile: Profile, token: String) -> Result<()> {
        if profile.is_blank() {
            return Err(ClientError::InvalidProfile);
        }

        tracing::info!(user = %profile.username, "session opened");

        self.profile = Some(profile);
        self.token = Some(token);
        self.persist();
        Ok(())
    }

    /// Clear the session and its persisted entries.  Safe to call when
    /// already logged out.
    pub fn logout(&mut self) {
        if self.profile.is_some() {
            tracing::info!("session closed");
        }

        self.profile = None;
        self.token = None;

        if let Some(ref db) = self.store {
            if let Err(e) = db.clear_session() {
                tracing::warn!(error = %e, "failed to clear persisted session");
            }
        }
    }

    /// Shallow-merge `patch` into the stored profile and re-persist.
    ///
    /// Does not talk to the network; the caller is responsible for having
    /// already confirmed the change with the server.  No-op when logged out.
    pub fn update_profile(&mut self, patch: &ProfilePatch) {
        let Some(ref mut profile) = self.profile else {
            return;
        };
        profile.apply(patch);
        self.persist();
    }

    /// Replace the whole snapshot (e.g. after a server refresh) and
    /// re-persist.  No-op when logged out.
    pub fn replace_profile(&mut self, profile: Profile) {
        if self.profile.is_none() {
            return;
        }
        self.profile = Some(profile);
        self.persist();
    }

    /// Read the persisted session back, if any.
    ///
    /// Corrupt or half-present data is discarded and the session starts
    /// unauthenticated; this never errors.
    pub fn restore_on_startup(&mut self) {
        let Some(ref db) = self.store else {
            return;
        };

        let token = db.get_entry(TOKEN_KEY).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to read persisted token");
            None
        });
        let profile_json = db.get_entry(PROFILE_KEY).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to read persisted profile");
            None
        });

        match (token, profile_json) {
            (Some(token), Some(json)) => match serde_json::from_str::<Profile>(&json) {
                Ok(profile) => {
                    tracing::info!(user = %profile.username, "session restored");
                    self.profile = Some(profile);
                    self.token = Some(token);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "persisted profile is corrupt, discarding session");
                    self.discard_persisted();
                }
            },
            (None, None) => {}
            // Half a session on disk violates the invariant; drop it.
            _ => {
                tracing::warn!("persisted session is incomplete, discarding");
                self.discard_persisted();
            }
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn is_authenticated(&self) -> bool {
        self.profile.is_some() && self.token.is_some()
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Mutable access to the snapshot for optimistic graph patches.
    ///
    /// Changes made through here are in-memory only; they become durable
    /// when a confirmed mutation calls [`SessionStore::replace_profile`].
    pub fn profile_mut(&mut self) -> Option<&mut Profile> {
        self.profile.as_mut()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn current_user_id(&self) -> Option<&UserId> {
        self.profile.as_ref().map(|p| &p.id)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    fn persist(&self) {
        let Some(ref db) = self.store else {
            return;
        };
        let (Some(profile), Some(token)) = (&self.profile, &self.token) else {
            return;
        };

        let json = match serde_json::to_string(profile) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize profile snapshot");
                return;
            }
        };

        if let Err(e) = db
            .put_entry(TOKEN_KEY, token)
            .and_then(|_| db.put_entry(PROFILE_KEY, &json))
        {
            tracing::warn!(error = %e, "failed to persist session, continuing in memory");
        }
    }

    fn discard_persisted(&self) {
        if let Some(ref db) = self.store {
            if let Err(e) = db.clear_session() {
                tracing::warn!(error = %e, "failed to discard persisted session");
            }
        }
    }
}
