use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{debug, instrument};

use crate::{
    auth::password::PasswordHasher,
    state::AppState,
    users::{repo::StoreError, repo::UserStore, repo_types::User},
};

/// Checks a username/password pair against the active users in the store.
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
}

impl FromRef<AppState> for Authenticator {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.store.clone(), state.hasher.clone())
    }
}

impl Authenticator {
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    /// `Ok(None)` covers unknown user, inactive user and wrong password alike.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = self.store.find_active_by_username(username).await?;

        let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
        let known = stored_hash.is_some();
        let ok = self
            .hasher
            .verify_blocking(password.to_string(), stored_hash)
            .await;

        if !ok {
            debug!(known, "authentication failed");
            return Ok(None);
        }
        Ok(user)
    }
}
