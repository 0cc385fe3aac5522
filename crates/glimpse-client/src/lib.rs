//! # glimpse-client
//!
//! The social/session state layer of the Glimpse client: the session store
//! ("who is logged in"), the social graph cache, the optimistic mutation
//! coordinator, and the cross-component signal bus.  View adapters (feed,
//! profile, search, notifications) are external collaborators that render
//! what this crate holds and trigger its mutations.

pub mod auth;
pub mod graph;
pub mod mutations;
pub mod notifications;
pub mod session;
pub mod signals;
pub mod state;

mod error;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ClientError, Result};
pub use graph::SocialGraphCache;
pub use mutations::{MutationCoordinator, MutationKind, MutationOutcome};
pub use session::SessionStore;
pub use signals::{Signal, SignalBus, Subscription};
pub use state::{AppState, SharedState};

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the process-wide tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the state layer logs at debug and
/// everything else at warn.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("glimpse_client=debug,glimpse_api=debug,glimpse_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
