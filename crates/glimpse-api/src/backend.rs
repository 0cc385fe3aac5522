//! The [`Backend`] trait and its wire payloads.
//!
//! The state layer (and its tests) only ever see `Arc<dyn Backend>`; the
//! production implementation lives in [`crate::rest`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use glimpse_shared::{Notification, Post, PostId, Profile, ProfilePatch, UserId};

use crate::error::Result;

/// Credentials payload for `POST /api/auth/signup`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// Response of `POST /api/auth/signin`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: Profile,
    pub token: String,
}

/// Everything the client core needs from the remote service.
///
/// All methods are thin calls; retries, caching and fallbacks are the
/// caller's business.  Mutating calls return `()` on acknowledgement, the
/// local optimistic patch is the state the UI shows.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Install (or clear) the bearer token attached to subsequent requests.
    fn set_token(&self, token: Option<String>);

    // -- auth ----------------------------------------------------------

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthResponse>;

    async fn sign_up(&self, request: &SignUpRequest) -> Result<()>;

    // -- users ---------------------------------------------------------

    /// `GET /api/users/{id_or_username}`.
    async fn get_user(&self, id_or_username: &str) -> Result<Profile>;

    /// `PUT /api/users/{username}`.  Returns the updated profile.
    async fn update_profile(&self, username: &str, patch: &ProfilePatch) -> Result<Profile>;

    async fn follow(&self, target: &UserId, follower: &UserId) -> Result<()>;

    async fn unfollow(&self, target: &UserId, follower: &UserId) -> Result<()>;

    /// Users who follow both `user` and `other`.  Computed server-side; the
    /// viewer does not hold the target's full follower list.
    async fn mutual_followers(&self, user: &UserId, other: &UserId) -> Result<Vec<Profile>>;

    async fn suggested_users(&self, user: &UserId) -> Result<Vec<Profile>>;

    async fn search_users(&self, query: &str) -> Result<Vec<Profile>>;

    // -- posts ---------------------------------------------------------

    async fn feed(&self) -> Result<Vec<Post>>;

    async fn posts_by_user(&self, user: &UserId) -> Result<Vec<Post>>;

    async fn saved_posts(&self, user: &UserId) -> Result<Vec<Post>>;

    async fn like_post(&self, post: &PostId, user: &UserId) -> Result<()>;

    async fn unlike_post(&self, post: &PostId, user: &UserId) -> Result<()>;

    async fn save_post(&self, post: &PostId, user: &UserId) -> Result<()>;

    async fn unsave_post(&self, post: &PostId, user: &UserId) -> Result<()>;

    async fn comment_post(&self, post: &PostId, user: &UserId, text: &str) -> Result<()>;

    // -- notifications -------------------------------------------------

    async fn notifications(&self, user: &UserId) -> Result<Vec<Notification>>;

    /// `GET /api/notifications/{user_id}/unread-count`.
    async fn unread_count(&self, user: &UserId) -> Result<u64>;
}
