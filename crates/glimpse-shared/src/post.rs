//! Post and comment models.
//!
//! The core holds no ownership over post content; posts are cached only so
//! their `likes` / `savedBy` / `comments` sets can be patched optimistically
//! and rolled back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::profile::UserRef;
use crate::types::PostId;

/// A post as served by the feed and profile endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: PostId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_type: Option<String>,
    /// Users who liked this post.  Drift-prone like the profile graph fields.
    #[serde(default)]
    pub likes: Vec<UserRef>,
    /// Users who saved this post.
    #[serde(default)]
    pub saved_by: Vec<UserRef>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn new(id: impl Into<PostId>) -> Self {
        Self {
            id: id.into(),
            user: None,
            caption: None,
            photo: None,
            video: None,
            post_type: None,
            likes: Vec::new(),
            saved_by: Vec::new(),
            comments: Vec::new(),
            created_at: None,
        }
    }
}

/// A single comment on a post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default, rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
