//! Production [`Backend`] implementation over HTTP.

use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use glimpse_shared::{Notification, Post, PostId, Profile, ProfilePatch, UserId};

use crate::backend::{AuthResponse, Backend, SignUpRequest};
use crate::error::{ApiError, Result};

/// REST client for a Glimpse backend instance.
///
/// Cheap to clone the inner `reqwest::Client`; a single instance is shared
/// process-wide behind `Arc<dyn Backend>`.
pub struct RestBackend {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FollowBody<'a> {
    follower_id: &'a UserId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserBody<'a> {
    user_id: &'a UserId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CommentBody<'a> {
    user_id: &'a UserId,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SignInBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct UnreadCountResponse {
    count: u64,
}

/// Error payload some endpoints return on rejection.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl RestBackend {
    /// Create a client for the backend at `base_url` (scheme + host, no
    /// trailing slash needed).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            token: RwLock::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let token = self.token.read().ok().and_then(|guard| guard.clone());
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Map non-success statuses to [`ApiError::Rejected`], extracting the
    /// server's error message when the body carries one.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error.or(body.message))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });

        tracing::warn!(status = status.as_u16(), %message, "backend rejected request");

        Err(ApiError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.authorize(self.http.get(self.url(path))).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    /// POST with a JSON body, discarding the acknowledgement payload.
    async fn post_ack<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<()> {
        let response = self
            .authorize(self.http.post(self.url(path)))
            .json(body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// DELETE with a JSON body, discarding the acknowledgement payload.
    async fn delete_ack<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<()> {
        let response = self
            .authorize(self.http.delete(self.url(path)))
            .json(body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl Backend for RestBackend {
    fn set_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let response = self
            .http
            .post(self.url("/auth/signin"))
            .json(&SignInBody { email, password })
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<()> {
        let response = self
            .http
            .post(self.url("/auth/signup"))
            .json(request)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn get_user(&self, id_or_username: &str) -> Result<Profile> {
        self.get_json(&format!("/users/{}", urlencoding::encode(id_or_username)))
            .await
    }

    async fn update_profile(&self, username: &str, patch: &ProfilePatch) -> Result<Profile> {
        let response = self
            .authorize(
                self.http
                    .put(self.url(&format!("/users/{}", urlencoding::encode(username)))),
            )
            .json(patch)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn follow(&self, target: &UserId, follower: &UserId) -> Result<()> {
        self.post_ack(
            &format!("/users/{target}/follow"),
            &FollowBody {
                follower_id: follower,
            },
        )
        .await
    }

    async fn unfollow(&self, target: &UserId, follower: &UserId) -> Result<()> {
        self.post_ack(
            &format!("/users/{target}/unfollow"),
            &FollowBody {
                follower_id: follower,
            },
        )
        .await
    }

    async fn mutual_followers(&self, user: &UserId, other: &UserId) -> Result<Vec<Profile>> {
        self.get_json(&format!("/users/{user}/mutual/{other}")).await
    }

    async fn suggested_users(&self, user: &UserId) -> Result<Vec<Profile>> {
        self.get_json(&format!("/users/suggested/{user}")).await
    }

    async fn search_users(&self, query: &str) -> Result<Vec<Profile>> {
        self.get_json(&format!("/users/search/{}", urlencoding::encode(query)))
            .await
    }

    async fn feed(&self) -> Result<Vec<Post>> {
        self.get_json("/posts").await
    }

    async fn posts_by_user(&self, user: &UserId) -> Result<Vec<Post>> {
        self.get_json(&format!("/posts/user/{user}")).await
    }

    async fn saved_posts(&self, user: &UserId) -> Result<Vec<Post>> {
        self.get_json(&format!("/posts/saved/{user}")).await
    }

    async fn like_post(&self, post: &PostId, user: &UserId) -> Result<()> {
        self.post_ack(&format!("/posts/{post}/like"), &UserBody { user_id: user })
            .await
    }

    async fn unlike_post(&self, post: &PostId, user: &UserId) -> Result<()> {
        self.delete_ack(&format!("/posts/{post}/like"), &UserBody { user_id: user })
            .await
    }

    async fn save_post(&self, post: &PostId, user: &UserId) -> Result<()> {
        self.post_ack(&format!("/posts/{post}/save"), &UserBody { user_id: user })
            .await
    }

    async fn unsave_post(&self, post: &PostId, user: &UserId) -> Result<()> {
        self.delete_ack(&format!("/posts/{post}/save"), &UserBody { user_id: user })
            .await
    }

    async fn comment_post(&self, post: &PostId, user: &UserId, text: &str) -> Result<()> {
        self.post_ack(
            &format!("/posts/{post}/comment"),
            &CommentBody {
                user_id: user,
                text,
            },
        )
        .await
    }

    async fn notifications(&self, user: &UserId) -> Result<Vec<Notification>> {
        self.get_json(&format!("/notifications/{user}")).await
    }

    async fn unread_count(&self, user: &UserId) -> Result<u64> {
        let response: UnreadCountResponse = self
            .get_json(&format!("/notifications/{user}/unread-count"))
            .await?;
        Ok(response.count)
    }
}
