use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::{
    auth::authenticator::Authenticator,
    error::{AppError, AppResult},
    state::AppState,
    users::{
        dto::{ChangePasswordRequest, ListQuery, RegisterRequest, UpdateUserRequest},
        repo_types::{NewUser, Page, User, UserFilter, UserPatch, UserPredicate, UserStatus},
    },
};

const MAX_USERNAME_LEN: usize = 32;
const MAX_PASSWORD_LEN: usize = 128;
const MAX_EMAIL_LEN: usize = 32;
const MAX_FULL_NAME_LEN: usize = 16;
const MAX_MOBILE_LEN: usize = 11;
const MAX_PAGE_SIZE: i64 = 100;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn validate_username(username: &str) -> AppResult<String> {
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::validation("username must be 1-32 characters"));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(AppError::validation("username must not contain whitespace"));
    }
    Ok(username.to_string())
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.is_empty() || password.chars().count() > MAX_PASSWORD_LEN {
        return Err(AppError::validation("password must be 1-128 characters"));
    }
    Ok(())
}

fn validate_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    if email.len() > MAX_EMAIL_LEN || !is_valid_email(&email) {
        return Err(AppError::validation("invalid email"));
    }
    Ok(email)
}

fn validate_full_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_FULL_NAME_LEN {
        return Err(AppError::validation("full_name must be 1-16 characters"));
    }
    Ok(name.to_string())
}

fn validate_mobile(mobile: &str) -> AppResult<String> {
    let mobile = mobile.trim();
    if mobile.is_empty()
        || mobile.len() > MAX_MOBILE_LEN
        || !mobile.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(AppError::validation("mobile must be 1-11 digits"));
    }
    Ok(mobile.to_string())
}

fn parse_status(status: i32) -> AppResult<UserStatus> {
    UserStatus::try_from(status).map_err(AppError::Validation)
}

impl ListQuery {
    /// Maps each supplied query field onto its typed predicate.
    pub fn filter(&self) -> AppResult<UserFilter> {
        let mut predicates = Vec::new();
        if let Some(id) = self.id {
            predicates.push(UserPredicate::Id(id));
        }
        if let Some(v) = &self.username {
            predicates.push(UserPredicate::Username(v.clone()));
        }
        if let Some(v) = &self.full_name {
            predicates.push(UserPredicate::FullName(v.clone()));
        }
        if let Some(v) = &self.email {
            predicates.push(UserPredicate::Email(v.trim().to_lowercase()));
        }
        if let Some(v) = &self.mobile {
            predicates.push(UserPredicate::Mobile(v.clone()));
        }
        if let Some(v) = self.status {
            predicates.push(UserPredicate::Status(parse_status(v)?));
        }
        Ok(UserFilter { predicates })
    }

    pub fn page(&self) -> AppResult<Page> {
        if self.page < 1 {
            return Err(AppError::validation("page must be at least 1"));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.limit) {
            return Err(AppError::validation("limit must be between 1 and 100"));
        }
        Page::new(self.page, self.limit).ok_or_else(|| AppError::validation("page out of range"))
    }
}

fn optional<T>(
    value: Option<&str>,
    validate: impl Fn(&str) -> AppResult<T>,
) -> AppResult<Option<T>> {
    value.map(validate).transpose()
}

pub async fn register(state: &AppState, req: RegisterRequest) -> AppResult<User> {
    let username = validate_username(&req.username)?;
    validate_password(&req.password)?;
    let email = optional(
        req.email.as_deref().filter(|e| !e.trim().is_empty()),
        validate_email,
    )?;

    let password_hash = state.hasher.hash_blocking(req.password).await?;
    let user = state
        .store
        .create(NewUser {
            username,
            password_hash,
            email,
        })
        .await
        .map_err(|e| {
            let err = AppError::from(e);
            if matches!(err, AppError::DuplicateUsername) {
                warn!(username = %req.username, "username already registered");
            }
            err
        })?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

/// The caller must re-prove the current password of their own account.
pub async fn change_password(
    state: &AppState,
    current: &User,
    req: ChangePasswordRequest,
) -> AppResult<()> {
    validate_password(&req.new_password)?;

    let user = Authenticator::from_ref(state)
        .authenticate(&req.username, &req.password)
        .await?
        .ok_or(AppError::BadCredentials)?;
    if user.id != current.id {
        warn!(user_id = current.id, target = %req.username, "password change for another account");
        return Err(AppError::BadCredentials);
    }

    let password_hash = state.hasher.hash_blocking(req.new_password).await?;
    let patch = UserPatch {
        password_hash: Some(password_hash),
        ..UserPatch::default()
    };
    state
        .store
        .update(user.id, patch)
        .await?
        .ok_or(AppError::UserNotFound)?;

    info!(user_id = user.id, "password changed");
    Ok(())
}

pub async fn update_user(state: &AppState, req: UpdateUserRequest) -> AppResult<User> {
    let mut patch = UserPatch {
        password_hash: None,
        full_name: optional(req.full_name.as_deref(), validate_full_name)?,
        email: optional(req.email.as_deref(), validate_email)?,
        mobile: optional(req.mobile.as_deref(), validate_mobile)?,
        status: req.status.map(parse_status).transpose()?,
    };
    if patch.is_empty() && req.password.is_none() {
        return Err(AppError::validation("nothing to update"));
    }
    if let Some(password) = req.password {
        validate_password(&password)?;
        patch.password_hash = Some(state.hasher.hash_blocking(password).await?);
    }

    let user = state
        .store
        .update(req.id, patch)
        .await?
        .ok_or(AppError::UserNotFound)?;
    info!(user_id = user.id, "user updated");
    Ok(user)
}

/// Soft delete: the record stays, flagged inactive. Deleting twice is a no-op.
pub async fn delete_user(state: &AppState, id: i64) -> AppResult<()> {
    let user = state
        .store
        .find_by_id(id)
        .await?
        .ok_or(AppError::UserNotFound)?;
    if !user.is_active() {
        debug!(user_id = id, "user already inactive");
        return Ok(());
    }
    state
        .store
        .update(id, UserPatch::status(UserStatus::Inactive))
        .await?
        .ok_or(AppError::UserNotFound)?;
    info!(user_id = id, "user deactivated");
    Ok(())
}

pub async fn list_users(state: &AppState, query: &ListQuery) -> AppResult<(Vec<User>, i64)> {
    let filter = query.filter()?;
    let page = query.page()?;
    Ok(state.store.list(&filter, page).await?)
}
