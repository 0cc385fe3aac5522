//! # glimpse-shared
//!
//! Domain types shared by every Glimpse crate: identifier newtypes, the
//! profile and post models as the backend serves them, and the [`UserRef`]
//! normalization for graph membership fields that arrive either as bare
//! identifiers or as embedded user objects.

pub mod notification;
pub mod post;
pub mod profile;
pub mod types;

pub use notification::{Notification, NotificationKind};
pub use post::{Comment, Post};
pub use profile::{Profile, ProfilePatch, UserRef};
pub use types::{PostId, UserId};
