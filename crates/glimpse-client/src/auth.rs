//! Login, signup and logout orchestration.
//!
//! These are the only paths besides the mutation coordinator that write to
//! the session.  Each one keeps the backend's bearer token in step with the
//! session store.

use std::sync::Arc;

use glimpse_api::{Backend, SignUpRequest};
use glimpse_shared::{Profile, ProfilePatch};

use crate::error::{ClientError, Result};
use crate::state::SharedState;

/// Authenticate against the backend and open a session.
pub async fn sign_in(
    backend: &Arc<dyn Backend>,
    state: &SharedState,
    email: &str,
    password: &str,
) -> Result<Profile> {
    let auth = backend.sign_in(email, password).await?;
    backend.set_token(Some(auth.token.clone()));

    let mut state = state.lock().await;
    if let Err(e) = state.session.login(auth.user.clone(), auth.token) {
        backend.set_token(None);
        return Err(e);
    }
    Ok(auth.user)
}

/// Register a new account, then sign straight in with the same
/// credentials.
pub async fn sign_up(
    backend: &Arc<dyn Backend>,
    state: &SharedState,
    request: &SignUpRequest,
) -> Result<Profile> {
    backend.sign_up(request).await?;
    sign_in(backend, state, &request.email, &request.password).await
}

/// Close the session.  Idempotent.
pub async fn sign_out(backend: &Arc<dyn Backend>, state: &SharedState) {
    backend.set_token(None);
    state.lock().await.session.logout();
}

/// Restore a persisted session, if any, and install its token on the
/// backend.  Never fails; a corrupt session simply starts logged out.
pub async fn restore_on_startup(backend: &Arc<dyn Backend>, state: &SharedState) {
    let mut state = state.lock().await;
    state.session.restore_on_startup();
    backend.set_token(state.session.token().map(String::from));
}

/// Re-fetch the viewer's own profile and replace the session snapshot with
/// the server's view.  A failed fetch is absorbed; the old snapshot stays.
pub async fn refresh_profile(backend: &Arc<dyn Backend>, state: &SharedState) {
    let viewer_id = {
        let state = state.lock().await;
        match state.session.current_user_id() {
            Some(id) => id.clone(),
            None => return,
        }
    };

    match backend.get_user(viewer_id.as_str()).await {
        Ok(fresh) => {
            let mut state = state.lock().await;
            if state.session.current_user_id() == Some(&viewer_id) {
                state.session.replace_profile(fresh);
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "profile refresh failed, keeping current snapshot");
        }
    }
}

/// Confirm a profile edit with the server, then merge it into the session
/// snapshot.  Returns the server's view of the updated profile.
pub async fn edit_profile(
    backend: &Arc<dyn Backend>,
    state: &SharedState,
    patch: &ProfilePatch,
) -> Result<Profile> {
    let username = {
        let state = state.lock().await;
        state
            .session
            .profile()
            .map(|p| p.username.clone())
            .ok_or(ClientError::Unauthenticated)?
    };

    let updated = backend.update_profile(&username, patch).await?;

    state.lock().await.session.update_profile(patch);
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStore;
    use crate::state::AppState;
    use crate::test_support::MockBackend;
    use glimpse_store::Database;
    use tokio::sync::Mutex;

    fn backend() -> Arc<MockBackend> {
        Arc::new(MockBackend::new())
    }

    #[tokio::test]
    async fn sign_in_opens_a_session_and_installs_the_token() {
        let mock = backend();
        let backend: Arc<dyn Backend> = mock.clone();
        let state = AppState::shared_in_memory();

        let profile = sign_in(&backend, &state, "alice@example.com", "hunter2")
            .await
            .unwrap();

        assert_eq!(profile.username, "alice");
        assert!(state.lock().await.session.is_authenticated());
        assert_eq!(mock.installed_token().as_deref(), Some("jwt-mock"));
    }

    #[tokio::test]
    async fn failed_sign_in_leaves_no_session() {
        let mock = backend();
        mock.fail_all();
        let backend: Arc<dyn Backend> = mock.clone();
        let state = AppState::shared_in_memory();

        let err = sign_in(&backend, &state, "alice@example.com", "wrong").await;
        assert!(err.is_err());
        assert!(!state.lock().await.session.is_authenticated());
        assert_eq!(mock.installed_token(), None);
    }

    #[tokio::test]
    async fn sign_up_signs_straight_in() {
        let mock = backend();
        let backend: Arc<dyn Backend> = mock.clone();
        let state = AppState::shared_in_memory();

        let request = SignUpRequest {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "hunter2".into(),
            bio: Some("hello".into()),
        };
        sign_up(&backend, &state, &request).await.unwrap();

        assert!(state.lock().await.session.is_authenticated());
        assert_eq!(mock.calls("sign_up"), 1);
        assert_eq!(mock.calls("sign_in"), 1);
    }

    #[tokio::test]
    async fn sign_out_clears_session_and_token() {
        let mock = backend();
        let backend: Arc<dyn Backend> = mock.clone();
        let state = AppState::shared_in_memory();

        sign_in(&backend, &state, "alice@example.com", "hunter2")
            .await
            .unwrap();
        sign_out(&backend, &state).await;
        // Safe to repeat.
        sign_out(&backend, &state).await;

        assert!(!state.lock().await.session.is_authenticated());
        assert_eq!(mock.installed_token(), None);
    }

    #[tokio::test]
    async fn restore_installs_the_persisted_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.db");

        {
            let db = Database::open_at(&path).unwrap();
            let mut session = SessionStore::new(Some(db));
            session
                .login(glimpse_shared::Profile::new("u1", "alice"), "jwt-disk".into())
                .unwrap();
        }

        let mock = backend();
        let backend: Arc<dyn Backend> = mock.clone();
        let db = Database::open_at(&path).unwrap();
        let state = Arc::new(Mutex::new(AppState::new(SessionStore::new(Some(db)))));

        restore_on_startup(&backend, &state).await;

        assert!(state.lock().await.session.is_authenticated());
        assert_eq!(mock.installed_token().as_deref(), Some("jwt-disk"));
    }

    #[tokio::test]
    async fn refresh_replaces_the_snapshot() {
        let mock = backend();
        let backend: Arc<dyn Backend> = mock.clone();
        let state = AppState::shared_in_memory();
        sign_in(&backend, &state, "alice@example.com", "hunter2")
            .await
            .unwrap();

        let mut fresh = glimpse_shared::Profile::new("u1", "alice");
        fresh.bio = Some("from server".into());
        mock.respond_with_user(fresh);

        refresh_profile(&backend, &state).await;

        let state = state.lock().await;
        assert_eq!(
            state.session.profile().unwrap().bio.as_deref(),
            Some("from server")
        );
    }

    #[tokio::test]
    async fn failed_refresh_keeps_the_snapshot() {
        let mock = backend();
        let backend: Arc<dyn Backend> = mock.clone();
        let state = AppState::shared_in_memory();
        sign_in(&backend, &state, "alice@example.com", "hunter2")
            .await
            .unwrap();

        mock.fail_user_fetch();
        refresh_profile(&backend, &state).await;

        let state = state.lock().await;
        assert_eq!(state.session.profile().unwrap().username, "alice");
    }

    #[tokio::test]
    async fn edit_profile_confirms_then_merges() {
        let mock = backend();
        let backend: Arc<dyn Backend> = mock.clone();
        let state = AppState::shared_in_memory();
        sign_in(&backend, &state, "alice@example.com", "hunter2")
            .await
            .unwrap();

        let patch = ProfilePatch {
            bio: Some("new bio".into()),
            ..Default::default()
        };
        let updated = edit_profile(&backend, &state, &patch).await.unwrap();

        assert_eq!(updated.bio.as_deref(), Some("new bio"));
        let state = state.lock().await;
        assert_eq!(
            state.session.profile().unwrap().bio.as_deref(),
            Some("new bio")
        );
    }

    #[tokio::test]
    async fn edit_profile_requires_a_session() {
        let mock = backend();
        let backend: Arc<dyn Backend> = mock.clone();
        let state = AppState::shared_in_memory();

        let err = edit_profile(&backend, &state, &ProfilePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Unauthenticated));
        assert_eq!(mock.calls("update_profile"), 0);
    }
}
