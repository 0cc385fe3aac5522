use thiserror::Error;

/// Errors surfaced by the state layer.
///
/// Read-only enrichment failures (mutual followers, suggestions, search,
/// unread counts) are absorbed locally and never appear here; only login
/// preconditions and failed mutations reach the caller.
#[derive(Error, Debug)]
pub enum ClientError {
    /// An action that requires a session was attempted without one.
    /// Rejected before any network call.
    #[error("Not signed in")]
    Unauthenticated,

    /// `login` was handed a profile with a blank id or username.
    #[error("Profile is missing an id or username")]
    InvalidProfile,

    /// The remote call failed; for mutations the optimistic patch has
    /// already been rolled back when this is returned.
    #[error(transparent)]
    Api(#[from] glimpse_api::ApiError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
