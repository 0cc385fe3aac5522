//! Shared test fixtures: an in-memory [`Backend`] with scriptable failures
//! and a gate for holding mutations in flight.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use glimpse_api::{ApiError, AuthResponse, Backend, SignUpRequest};
use glimpse_shared::{Notification, Post, PostId, Profile, ProfilePatch, UserId};

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Default)]
pub struct MockBackend {
    calls: Mutex<HashMap<&'static str, usize>>,
    fail: AtomicBool,
    fail_user_fetch: AtomicBool,
    gate: Mutex<Option<Arc<Semaphore>>>,
    user_response: Mutex<Option<Profile>>,
    mutuals: Mutex<Vec<Profile>>,
    unread: AtomicU64,
    token: Mutex<Option<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a simulated server rejection.
    pub fn fail_all(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Make only `get_user` fail (e.g. to test a failed post-confirm
    /// refresh).
    pub fn fail_user_fetch(&self) {
        self.fail_user_fetch.store(true, Ordering::SeqCst);
    }

    /// Hold every subsequent mutating call until a permit is added to the
    /// returned semaphore.
    pub fn gate_mutations(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Profile served by `get_user` (and `sign_in`).
    pub fn respond_with_user(&self, profile: Profile) {
        *self.user_response.lock().unwrap() = Some(profile);
    }

    pub fn respond_with_mutuals(&self, profiles: Vec<Profile>) {
        *self.mutuals.lock().unwrap() = profiles;
    }

    pub fn set_unread(&self, count: u64) {
        self.unread.store(count, Ordering::SeqCst);
    }

    /// Number of times the named endpoint was hit.
    pub fn calls(&self, name: &'static str) -> usize {
        *self.calls.lock().unwrap().get(name).unwrap_or(&0)
    }

    /// Token most recently installed via `set_token`.
    pub fn installed_token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    fn record(&self, name: &'static str) {
        *self.calls.lock().unwrap().entry(name).or_insert(0) += 1;
    }

    fn rejected() -> ApiError {
        ApiError::Rejected {
            status: 500,
            message: "simulated failure".into(),
        }
    }

    async fn mutation(&self, name: &'static str) -> ApiResult<()> {
        self.record(name);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        if self.fail.load(Ordering::SeqCst) {
            Err(Self::rejected())
        } else {
            Ok(())
        }
    }

    fn read_profiles(&self, name: &'static str, value: Vec<Profile>) -> ApiResult<Vec<Profile>> {
        self.record(name);
        if self.fail.load(Ordering::SeqCst) {
            Err(Self::rejected())
        } else {
            Ok(value)
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn set_token(&self, token: Option<String>) {
        *self.token.lock().unwrap() = token;
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> ApiResult<AuthResponse> {
        self.record("sign_in");
        if self.fail.load(Ordering::SeqCst) {
            return Err(Self::rejected());
        }
        let user = self
            .user_response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Profile::new("u1", "alice"));
        Ok(AuthResponse {
            user,
            token: "jwt-mock".into(),
        })
    }

    async fn sign_up(&self, _request: &SignUpRequest) -> ApiResult<()> {
        self.mutation("sign_up").await
    }

    async fn get_user(&self, _id_or_username: &str) -> ApiResult<Profile> {
        self.record("get_user");
        if self.fail.load(Ordering::SeqCst) || self.fail_user_fetch.load(Ordering::SeqCst) {
            return Err(Self::rejected());
        }
        self.user_response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(Self::rejected)
    }

    async fn update_profile(&self, _username: &str, patch: &ProfilePatch) -> ApiResult<Profile> {
        self.record("update_profile");
        if self.fail.load(Ordering::SeqCst) {
            return Err(Self::rejected());
        }
        let mut profile = self
            .user_response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Profile::new("u1", "alice"));
        profile.apply(patch);
        Ok(profile)
    }

    async fn follow(&self, _target: &UserId, _follower: &UserId) -> ApiResult<()> {
        self.mutation("follow").await
    }

    async fn unfollow(&self, _target: &UserId, _follower: &UserId) -> ApiResult<()> {
        self.mutation("unfollow").await
    }

    async fn mutual_followers(&self, _user: &UserId, _other: &UserId) -> ApiResult<Vec<Profile>> {
        let mutuals = self.mutuals.lock().unwrap().clone();
        self.read_profiles("mutual_followers", mutuals)
    }

    async fn suggested_users(&self, _user: &UserId) -> ApiResult<Vec<Profile>> {
        self.read_profiles("suggested_users", Vec::new())
    }

    async fn search_users(&self, _query: &str) -> ApiResult<Vec<Profile>> {
        self.read_profiles("search_users", Vec::new())
    }

    async fn feed(&self) -> ApiResult<Vec<Post>> {
        self.record("feed");
        if self.fail.load(Ordering::SeqCst) {
            return Err(Self::rejected());
        }
        Ok(Vec::new())
    }

    async fn posts_by_user(&self, _user: &UserId) -> ApiResult<Vec<Post>> {
        self.record("posts_by_user");
        Ok(Vec::new())
    }

    async fn saved_posts(&self, _user: &UserId) -> ApiResult<Vec<Post>> {
        self.record("saved_posts");
        Ok(Vec::new())
    }

    async fn like_post(&self, _post: &PostId, _user: &UserId) -> ApiResult<()> {
        self.mutation("like_post").await
    }

    async fn unlike_post(&self, _post: &PostId, _user: &UserId) -> ApiResult<()> {
        self.mutation("unlike_post").await
    }

    async fn save_post(&self, _post: &PostId, _user: &UserId) -> ApiResult<()> {
        self.mutation("save_post").await
    }

    async fn unsave_post(&self, _post: &PostId, _user: &UserId) -> ApiResult<()> {
        self.mutation("unsave_post").await
    }

    async fn comment_post(&self, _post: &PostId, _user: &UserId, _text: &str) -> ApiResult<()> {
        self.mutation("comment_post").await
    }

    async fn notifications(&self, _user: &UserId) -> ApiResult<Vec<Notification>> {
        self.record("notifications");
        if self.fail.load(Ordering::SeqCst) {
            return Err(Self::rejected());
        }
        Ok(Vec::new())
    }

    async fn unread_count(&self, _user: &UserId) -> ApiResult<u64> {
        self.record("unread_count");
        if self.fail.load(Ordering::SeqCst) {
            return Err(Self::rejected());
        }
        Ok(self.unread.load(Ordering::SeqCst))
    }
}
