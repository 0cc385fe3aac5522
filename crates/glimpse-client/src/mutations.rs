//! Mutation coordinator: optimistic local updates reconciled with the
//! authoritative server outcome.
//!
//! Every mutation runs the same state machine, `Idle -> Pending ->
//! {Confirmed | RolledBack}`:
//!
//! - the affected set is patched in local memory immediately, so views
//!   reflect the change without waiting on the network;
//! - at most one mutation per (target, kind) is in flight; a re-entrant
//!   trigger while one is pending is dropped, not queued;
//! - a successful response leaves the optimistic state in place (and, for
//!   follow/unfollow, refreshes the viewer's own profile from the server so
//!   the `following` set matches the ledger exactly);
//! - a failed response restores the snapshot taken at trigger time.
//!
//! Responses are applied defensively: if the target entity was dropped from
//! the cache while the request was in flight, the cache write is skipped.

use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Utc};

use glimpse_api::Backend;
use glimpse_shared::profile::{contains_user, EmbeddedUser};
use glimpse_shared::{Comment, PostId, UserId, UserRef};

use crate::error::{ClientError, Result};
use crate::signals::{Signal, SignalBus};
use crate::state::SharedState;

/// The kinds of user actions the coordinator serializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Follow,
    Unfollow,
    Like,
    Unlike,
    Save,
    Unsave,
    Comment,
}

impl MutationKind {
    fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Follow => "follow",
            MutationKind::Unfollow => "unfollow",
            MutationKind::Like => "like",
            MutationKind::Unlike => "unlike",
            MutationKind::Save => "save",
            MutationKind::Unsave => "unsave",
            MutationKind::Comment => "comment",
        }
    }
}

/// How a triggered mutation resolved, short of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The server acknowledged; the optimistic state stands.
    Confirmed,
    /// An identical mutation was already pending; this trigger was a no-op.
    Dropped,
}

/// The affected set as it was before the optimistic patch.  `None` means
/// the entity was not cached at trigger time (nothing was patched).
#[derive(Debug, Clone)]
enum PreviousState {
    Graph {
        viewer_following: Vec<UserRef>,
        target_followers: Option<Vec<UserRef>>,
    },
    Likes(Option<Vec<UserRef>>),
    SavedBy(Option<Vec<UserRef>>),
    Comments(Option<Vec<Comment>>),
}

/// A mutation that has been applied locally and awaits the server verdict.
struct PendingMutation {
    kind: MutationKind,
    target: String,
    previous: PreviousState,
    issued_at: DateTime<Utc>,
}

impl PendingMutation {
    fn new(kind: MutationKind, target: &str, previous: PreviousState) -> Self {
        Self {
            kind,
            target: target.to_string(),
            previous,
            issued_at: Utc::now(),
        }
    }

    fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.issued_at).num_milliseconds()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PendingKey {
    target: String,
    kind: MutationKind,
}

/// Removes its key from the in-flight set when dropped, on every exit path.
struct InFlightGuard {
    set: Arc<StdMutex<HashSet<PendingKey>>>,
    key: PendingKey,
}

impl InFlightGuard {
    fn try_acquire(set: &Arc<StdMutex<HashSet<PendingKey>>>, key: PendingKey) -> Option<Self> {
        let mut entries = set.lock().unwrap_or_else(|e| e.into_inner());
        if !entries.insert(key.clone()) {
            return None;
        }
        Some(Self {
            set: set.clone(),
            key,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}

/// Which membership set of a post a mutation touches.
#[derive(Debug, Clone, Copy)]
enum PostSet {
    Likes,
    SavedBy,
}

/// Applies optimistic mutations and reconciles them with the server.
pub struct MutationCoordinator {
    state: SharedState,
    backend: Arc<dyn Backend>,
    signals: SignalBus,
    in_flight: Arc<StdMutex<HashSet<PendingKey>>>,
}

impl MutationCoordinator {
    pub fn new(state: SharedState, backend: Arc<dyn Backend>, signals: SignalBus) -> Self {
        Self {
            state,
            backend,
            signals,
            in_flight: Arc::new(StdMutex::new(HashSet::new())),
        }
    }

    // ------------------------------------------------------------------
    // Public triggers
    // ------------------------------------------------------------------

    pub async fn follow(&self, target: &UserId) -> Result<MutationOutcome> {
        self.follow_edge(target, MutationKind::Follow).await
    }

    pub async fn unfollow(&self, target: &UserId) -> Result<MutationOutcome> {
        self.follow_edge(target, MutationKind::Unfollow).await
    }

    pub async fn like(&self, post: &PostId) -> Result<MutationOutcome> {
        self.toggle_post_set(post, PostSet::Likes, true).await
    }

    pub async fn unlike(&self, post: &PostId) -> Result<MutationOutcome> {
        self.toggle_post_set(post, PostSet::Likes, false).await
    }

    pub async fn save(&self, post: &PostId) -> Result<MutationOutcome> {
        self.toggle_post_set(post, PostSet::SavedBy, true).await
    }

    pub async fn unsave(&self, post: &PostId) -> Result<MutationOutcome> {
        self.toggle_post_set(post, PostSet::SavedBy, false).await
    }

    pub async fn comment(&self, post: &PostId, text: &str) -> Result<MutationOutcome> {
        self.add_comment(post, text).await
    }

    // ------------------------------------------------------------------
    // Follow / unfollow
    // ------------------------------------------------------------------

    async fn follow_edge(&self, target: &UserId, kind: MutationKind) -> Result<MutationOutcome> {
        let adding = kind == MutationKind::Follow;

        let Some(_guard) = self.acquire(target.as_str(), kind) else {
            return Ok(MutationOutcome::Dropped);
        };

        // Optimistic patch: the viewer's `following` and, when the target
        // profile is cached, its `followers`.
        let (viewer_id, pending) = {
            let mut state = self.state.lock().await;
            let viewer = state.session.profile().ok_or(ClientError::Unauthenticated)?;
            let viewer_id = viewer.id.clone();

            let previous = PreviousState::Graph {
                viewer_following: viewer.following.clone(),
                target_followers: state.graph.profile(target).map(|p| p.followers.clone()),
            };
            let pending = PendingMutation::new(kind, target.as_str(), previous);

            if let Some(profile) = state.session.profile_mut() {
                if adding {
                    if !contains_user(&profile.following, target) {
                        profile.following.push(target.clone().into());
                    }
                } else {
                    profile.following.retain(|r| r.id() != target);
                }
            }
            if let Some(profile) = state.graph.profile_mut(target) {
                if adding {
                    if !contains_user(&profile.followers, &viewer_id) {
                        profile.followers.push(viewer_id.clone().into());
                    }
                } else {
                    profile.followers.retain(|r| r.id() != &viewer_id);
                }
            }

            (viewer_id, pending)
        };

        let result = if adding {
            self.backend.follow(target, &viewer_id).await
        } else {
            self.backend.unfollow(target, &viewer_id).await
        };

        match result {
            Ok(()) => {
                self.refresh_viewer(&viewer_id).await;
                tracing::debug!(
                    kind = kind.as_str(),
                    %target,
                    elapsed_ms = pending.elapsed_ms(),
                    "mutation confirmed"
                );
                self.signals.broadcast(Signal::RefreshNotifications);
                Ok(MutationOutcome::Confirmed)
            }
            Err(e) => {
                self.rollback(pending, &viewer_id).await;
                Err(e.into())
            }
        }
    }

    /// Re-fetch the viewer's own profile so the `following` set matches the
    /// server's ledger exactly.  A failed refresh keeps the optimistic
    /// state; the next fetch-on-mount closes the drift.
    async fn refresh_viewer(&self, viewer_id: &UserId) {
        match self.backend.get_user(viewer_id.as_str()).await {
            Ok(fresh) => {
                let mut state = self.state.lock().await;
                // The session may have been logged out (or switched) while
                // the request was in flight.
                if state.session.current_user_id() == Some(viewer_id) && fresh.id == *viewer_id {
                    state.session.replace_profile(fresh);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "viewer refresh failed, keeping optimistic state");
            }
        }
    }

    // ------------------------------------------------------------------
    // Like / save
    // ------------------------------------------------------------------

    async fn toggle_post_set(
        &self,
        post_id: &PostId,
        set: PostSet,
        adding: bool,
    ) -> Result<MutationOutcome> {
        let kind = match (set, adding) {
            (PostSet::Likes, true) => MutationKind::Like,
            (PostSet::Likes, false) => MutationKind::Unlike,
            (PostSet::SavedBy, true) => MutationKind::Save,
            (PostSet::SavedBy, false) => MutationKind::Unsave,
        };

        let Some(_guard) = self.acquire(post_id.as_str(), kind) else {
            return Ok(MutationOutcome::Dropped);
        };

        let (viewer_id, pending) = {
            let mut state = self.state.lock().await;
            let viewer = state.session.profile().ok_or(ClientError::Unauthenticated)?;
            let viewer_id = viewer.id.clone();

            let snapshot = state.graph.post(post_id).map(|p| match set {
                PostSet::Likes => p.likes.clone(),
                PostSet::SavedBy => p.saved_by.clone(),
            });
            let previous = match set {
                PostSet::Likes => PreviousState::Likes(snapshot),
                PostSet::SavedBy => PreviousState::SavedBy(snapshot),
            };
            let pending = PendingMutation::new(kind, post_id.as_str(), previous);

            if let Some(post) = state.graph.post_mut(post_id) {
                let entries = match set {
                    PostSet::Likes => &mut post.likes,
                    PostSet::SavedBy => &mut post.saved_by,
                };
                if adding {
                    if !contains_user(entries, &viewer_id) {
                        entries.push(viewer_id.clone().into());
                    }
                } else {
                    entries.retain(|r| r.id() != &viewer_id);
                }
            }

            (viewer_id, pending)
        };

        let result = match (set, adding) {
            (PostSet::Likes, true) => self.backend.like_post(post_id, &viewer_id).await,
            (PostSet::Likes, false) => self.backend.unlike_post(post_id, &viewer_id).await,
            (PostSet::SavedBy, true) => self.backend.save_post(post_id, &viewer_id).await,
            (PostSet::SavedBy, false) => self.backend.unsave_post(post_id, &viewer_id).await,
        };

        match result {
            Ok(()) => {
                tracing::debug!(
                    kind = kind.as_str(),
                    target = %post_id,
                    elapsed_ms = pending.elapsed_ms(),
                    "mutation confirmed"
                );
                if kind == MutationKind::Like {
                    self.signals.broadcast(Signal::RefreshNotifications);
                }
                Ok(MutationOutcome::Confirmed)
            }
            Err(e) => {
                self.rollback(pending, &viewer_id).await;
                Err(e.into())
            }
        }
    }

    // ------------------------------------------------------------------
    // Comment
    // ------------------------------------------------------------------

    async fn add_comment(&self, post_id: &PostId, text: &str) -> Result<MutationOutcome> {
        let kind = MutationKind::Comment;

        let Some(_guard) = self.acquire(post_id.as_str(), kind) else {
            return Ok(MutationOutcome::Dropped);
        };

        let (viewer_id, pending) = {
            let mut state = self.state.lock().await;
            let viewer = state.session.profile().ok_or(ClientError::Unauthenticated)?;
            let viewer_id = viewer.id.clone();
            let viewer_username = viewer.username.clone();

            let snapshot = state.graph.post(post_id).map(|p| p.comments.clone());
            let pending =
                PendingMutation::new(kind, post_id.as_str(), PreviousState::Comments(snapshot));

            if let Some(post) = state.graph.post_mut(post_id) {
                post.comments.push(Comment {
                    id: None,
                    user: Some(UserRef::Embedded(EmbeddedUser {
                        id: viewer_id.clone(),
                        username: Some(viewer_username),
                        avatar: None,
                    })),
                    text: text.to_string(),
                    created_at: Some(Utc::now()),
                });
            }

            (viewer_id, pending)
        };

        match self.backend.comment_post(post_id, &viewer_id, text).await {
            Ok(()) => {
                tracing::debug!(
                    kind = kind.as_str(),
                    target = %post_id,
                    elapsed_ms = pending.elapsed_ms(),
                    "mutation confirmed"
                );
                self.signals.broadcast(Signal::RefreshNotifications);
                Ok(MutationOutcome::Confirmed)
            }
            Err(e) => {
                self.rollback(pending, &viewer_id).await;
                Err(e.into())
            }
        }
    }

    // ------------------------------------------------------------------
    // Shared machinery
    // ------------------------------------------------------------------

    fn acquire(&self, target: &str, kind: MutationKind) -> Option<InFlightGuard> {
        let key = PendingKey {
            target: target.to_string(),
            kind,
        };
        let guard = InFlightGuard::try_acquire(&self.in_flight, key);
        if guard.is_none() {
            tracing::debug!(kind = kind.as_str(), target, "mutation already pending, dropped");
        }
        guard
    }

    /// Restore the snapshot taken at trigger time.  Entities that left the
    /// cache while the request was in flight are skipped.
    async fn rollback(&self, pending: PendingMutation, viewer_id: &UserId) {
        let mut state = self.state.lock().await;

        let elapsed_ms = pending.elapsed_ms();
        match pending.previous {
            PreviousState::Graph {
                viewer_following,
                target_followers,
            } => {
                if state.session.current_user_id() == Some(viewer_id) {
                    if let Some(profile) = state.session.profile_mut() {
                        profile.following = viewer_following;
                    }
                }
                let target = UserId::from(pending.target.clone());
                if let Some(followers) = target_followers {
                    if let Some(profile) = state.graph.profile_mut(&target) {
                        profile.followers = followers;
                    }
                }
            }
            PreviousState::Likes(snapshot) => {
                let post_id = PostId::from(pending.target.clone());
                if let Some(likes) = snapshot {
                    if let Some(post) = state.graph.post_mut(&post_id) {
                        post.likes = likes;
                    }
                }
            }
            PreviousState::SavedBy(snapshot) => {
                let post_id = PostId::from(pending.target.clone());
                if let Some(saved_by) = snapshot {
                    if let Some(post) = state.graph.post_mut(&post_id) {
                        post.saved_by = saved_by;
                    }
                }
            }
            PreviousState::Comments(snapshot) => {
                let post_id = PostId::from(pending.target.clone());
                if let Some(comments) = snapshot {
                    if let Some(post) = state.graph.post_mut(&post_id) {
                        post.comments = comments;
                    }
                }
            }
        }

        tracing::warn!(
            kind = pending.kind.as_str(),
            target = %pending.target,
            elapsed_ms = elapsed_ms,
            "mutation rolled back"
        );
    }
}
