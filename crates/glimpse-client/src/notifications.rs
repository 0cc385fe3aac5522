//! Notification reads.
//!
//! The unread count is owned by no component; any view that displays a
//! badge recomputes it here when it mounts or when the
//! [`Signal::RefreshNotifications`](crate::signals::Signal) event fires.
//! Both reads are non-critical enrichments, so failures are absorbed.

use glimpse_api::Backend;
use glimpse_shared::{Notification, UserId};

/// Current unread badge count, `None` on any fetch error (the caller keeps
/// whatever it was showing).
pub async fn unread_count(backend: &dyn Backend, viewer: &UserId) -> Option<u64> {
    match backend.unread_count(viewer).await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!(error = %e, "unread count fetch failed");
            None
        }
    }
}

/// The viewer's notification list, empty on any fetch error.
pub async fn recent(backend: &dyn Backend, viewer: &UserId) -> Vec<Notification> {
    match backend.notifications(viewer).await {
        Ok(notifications) => notifications,
        Err(e) => {
            tracing::warn!(error = %e, "notification fetch failed, returning empty");
            Vec::new()
        }
    }
}
