//! Social graph cache.
//!
//! Answers "does A follow B" from already-fetched data and holds the
//! profiles and posts whose membership sets the mutation coordinator
//! patches optimistically.  Entries follow a refetch-on-mount policy:
//! a view revisiting a profile fetches it again and reinserts it; there is
//! no invalidation protocol beyond that and the optimistic patches.
//!
//! The enrichment fetchers at the bottom (mutual followers, suggestions,
//! search) are non-critical: any fetch error collapses to an empty result
//! instead of propagating.

use std::collections::HashMap;

use glimpse_api::Backend;
use glimpse_shared::{profile::contains_user, Post, PostId, Profile, UserId};

/// Process-wide cache of fetched profiles and posts, keyed by id.
///
/// Written to only by the mutation coordinator and the fetch-on-mount
/// paths; all other components read.
#[derive(Default)]
pub struct SocialGraphCache {
    profiles: HashMap<UserId, Profile>,
    posts: HashMap<PostId, Post>,
}

impl SocialGraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Does `viewer` follow `target`?  Tolerant of the target id being
    /// stored either as a bare identifier or as an embedded object.
    pub fn is_following(viewer: &Profile, target: &UserId) -> bool {
        contains_user(&viewer.following, target)
    }

    // ------------------------------------------------------------------
    // Profiles
    // ------------------------------------------------------------------

    pub fn insert_profile(&mut self, profile: Profile) {
        self.profiles.insert(profile.id.clone(), profile);
    }

    pub fn profile(&self, id: &UserId) -> Option<&Profile> {
        self.profiles.get(id)
    }

    pub fn profile_mut(&mut self, id: &UserId) -> Option<&mut Profile> {
        self.profiles.get_mut(id)
    }

    /// Drop a profile, e.g. when its view unmounts.
    pub fn remove_profile(&mut self, id: &UserId) -> Option<Profile> {
        self.profiles.remove(id)
    }

    // ------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------

    pub fn insert_post(&mut self, post: Post) {
        self.posts.insert(post.id.clone(), post);
    }

    pub fn insert_posts(&mut self, posts: impl IntoIterator<Item = Post>) {
        for post in posts {
            self.insert_post(post);
        }
    }

    pub fn post(&self, id: &PostId) -> Option<&Post> {
        self.posts.get(id)
    }

    pub fn post_mut(&mut self, id: &PostId) -> Option<&mut Post> {
        self.posts.get_mut(id)
    }

    pub fn remove_post(&mut self, id: &PostId) -> Option<Post> {
        self.posts.remove(id)
    }
}

// ----------------------------------------------------------------------
// Read-only enrichments (absorbed failures)
// ----------------------------------------------------------------------

/// Users who follow both `viewer` and `target`, in the order the server
/// returns them.  Empty on any fetch error.
pub async fn mutual_followers(
    backend: &dyn Backend,
    viewer: &UserId,
    target: &UserId,
) -> Vec<Profile> {
    match backend.mutual_followers(target, viewer).await {
        Ok(profiles) => profiles,
        Err(e) => {
            tracing::warn!(error = %e, %target, "mutual follower fetch failed, returning empty");
            Vec::new()
        }
    }
}

/// Follow suggestions for `viewer`.  Empty on any fetch error.
pub async fn suggested_users(backend: &dyn Backend, viewer: &UserId) -> Vec<Profile> {
    match backend.suggested_users(viewer).await {
        Ok(profiles) => profiles,
        Err(e) => {
            tracing::warn!(error = %e, "suggestion fetch failed, returning empty");
            Vec::new()
        }
    }
}

/// Username search.  Empty on any fetch error.
pub async fn search_users(backend: &dyn Backend, query: &str) -> Vec<Profile> {
    match backend.search_users(query).await {
        Ok(profiles) => profiles,
        Err(e) => {
            tracing::warn!(error = %e, query, "user search failed, returning empty");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockBackend;
    use glimpse_shared::UserRef;

    #[test]
    fn is_following_handles_both_entry_shapes() {
        let mut viewer = Profile::new("u1", "alice");
        viewer.following.push(UserRef::Id(UserId::from("u2")));
        viewer.following.push(
            serde_json::from_str::<UserRef>(r#"{ "_id": "u3", "username": "carol" }"#).unwrap(),
        );

        assert!(SocialGraphCache::is_following(&viewer, &UserId::from("u2")));
        assert!(SocialGraphCache::is_following(&viewer, &UserId::from("u3")));
        assert!(!SocialGraphCache::is_following(
            &viewer,
            &UserId::from("u4")
        ));
    }

    #[test]
    fn cache_insert_and_remove() {
        let mut cache = SocialGraphCache::new();
        cache.insert_profile(Profile::new("u2", "bob"));
        assert!(cache.profile(&UserId::from("u2")).is_some());

        cache.remove_profile(&UserId::from("u2"));
        assert!(cache.profile(&UserId::from("u2")).is_none());
    }

    #[tokio::test]
    async fn mutual_followers_keep_server_order() {
        let backend = MockBackend::new();
        backend.respond_with_mutuals(vec![
            Profile::new("u3", "carol"),
            Profile::new("u4", "dan"),
        ]);

        let mutuals =
            mutual_followers(&backend, &UserId::from("u1"), &UserId::from("u2")).await;
        let names: Vec<_> = mutuals.iter().map(|p| p.username.as_str()).collect();
        assert_eq!(names, ["carol", "dan"]);
    }

    #[tokio::test]
    async fn mutual_followers_absorbs_fetch_errors() {
        let backend = MockBackend::new();
        backend.fail_all();

        let mutuals =
            mutual_followers(&backend, &UserId::from("u1"), &UserId::from("u2")).await;
        assert!(mutuals.is_empty());
    }

    #[tokio::test]
    async fn search_absorbs_fetch_errors() {
        let backend = MockBackend::new();
        backend.fail_all();

        assert!(search_users(&backend, "ali").await.is_empty());
        assert!(suggested_users(&backend, &UserId::from("u1")).await.is_empty());
    }
}
