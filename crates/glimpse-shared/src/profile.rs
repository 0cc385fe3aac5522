//! Profile model and graph-membership normalization.
//!
//! The backend is inconsistent about how it represents entries of the
//! `followers` / `following` lists: depending on the endpoint (and on
//! whether the server populated the relation) an entry is either a bare
//! identifier string or an embedded user object carrying `_id`.  [`UserRef`]
//! absorbs that drift once, here, so no other crate has to care.

use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// One entry of a `followers` / `following` list.
///
/// Deserializes from either `"64ab…"` or `{ "_id": "64ab…", … }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Id(UserId),
    Embedded(EmbeddedUser),
}

/// The populated form of a graph entry: a partial user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedUser {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UserRef {
    /// The identifier, whichever shape the entry arrived in.
    pub fn id(&self) -> &UserId {
        match self {
            UserRef::Id(id) => id,
            UserRef::Embedded(user) => &user.id,
        }
    }
}

impl PartialEq for UserRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl From<UserId> for UserRef {
    fn from(id: UserId) -> Self {
        UserRef::Id(id)
    }
}

/// `true` if any entry in `refs` points at `id`.
pub fn contains_user(refs: &[UserRef], id: &UserId) -> bool {
    refs.iter().any(|r| r.id() == id)
}

/// A user profile as served by `GET /api/users/{id_or_username}`.
///
/// Every field except the id and username is optional; absent graph fields
/// deserialize as empty sets, never as errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default)]
    pub followers: Vec<UserRef>,
    #[serde(default)]
    pub following: Vec<UserRef>,
}

impl Profile {
    /// Minimal constructor, mostly useful in tests and fixtures.
    pub fn new(id: impl Into<UserId>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            display_name: None,
            email: None,
            avatar: None,
            bio: None,
            website: None,
            followers: Vec::new(),
            following: Vec::new(),
        }
    }

    /// Does this profile follow `target`?  Tolerant of both entry shapes.
    pub fn follows(&self, target: &UserId) -> bool {
        contains_user(&self.following, target)
    }

    /// Is `other` a follower of this profile?
    pub fn followed_by(&self, other: &UserId) -> bool {
        contains_user(&self.followers, other)
    }

    /// A profile with a blank id or username cannot identify a session.
    pub fn is_blank(&self) -> bool {
        self.id.as_str().trim().is_empty() || self.username.trim().is_empty()
    }

    /// Shallow-merge `patch` into this profile.  Only fields present in the
    /// patch are touched; graph fields are never modified this way.
    pub fn apply(&mut self, patch: &ProfilePatch) {
        if let Some(ref username) = patch.username {
            self.username = username.clone();
        }
        if patch.display_name.is_some() {
            self.display_name = patch.display_name.clone();
        }
        if patch.email.is_some() {
            self.email = patch.email.clone();
        }
        if patch.avatar.is_some() {
            self.avatar = patch.avatar.clone();
        }
        if patch.bio.is_some() {
            self.bio = patch.bio.clone();
        }
        if patch.website.is_some() {
            self.website = patch.website.clone();
        }
    }
}

/// Partial profile update, sent to `PUT /api/users/{username}` and merged
/// into the session snapshot after the server confirms the edit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}
