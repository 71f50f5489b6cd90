use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{debug, warn};

use crate::{
    auth::jwt::{JwtKeys, TokenError},
    error::AppError,
    state::AppState,
    users::{repo::UserStore, repo_types::User},
};

/// Turns a bearer token into the current, active user.
///
/// The token only names the user; the store decides whether that user may
/// still act, so deactivation takes effect before the token expires.
#[derive(Clone)]
pub struct SessionResolver {
    keys: JwtKeys,
    store: Arc<dyn UserStore>,
}

impl FromRef<AppState> for SessionResolver {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.keys.clone(), state.store.clone())
    }
}

impl SessionResolver {
    pub fn new(keys: JwtKeys, store: Arc<dyn UserStore>) -> Self {
        Self { keys, store }
    }

    pub async fn resolve(&self, token: &str) -> Result<User, AppError> {
        let claims = self.keys.decode(token).map_err(|e| {
            match e {
                TokenError::Expired => debug!("session token expired"),
                _ => warn!("session token rejected"),
            }
            AppError::Unauthenticated
        })?;

        match self.store.find_active_by_username(&claims.subject).await? {
            Some(user) if user.is_active() => {
                debug!(user_id = user.id, expires_at = %claims.expires_at, "session resolved");
                Ok(user)
            }
            _ => {
                debug!(subject = %claims.subject, "token subject missing or inactive");
                Err(AppError::Unauthenticated)
            }
        }
    }
}
