//! In-process `UserStore` used by unit and router tests.

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::users::repo::{StoreError, UserStore};
use crate::users::repo_types::{
    NewUser, Page, User, UserFilter, UserPatch, UserPredicate, UserStatus,
};

fn predicate_matches(predicate: &UserPredicate, user: &User) -> bool {
    match predicate {
        UserPredicate::Id(id) => user.id == *id,
        UserPredicate::Username(v) => &user.username == v,
        UserPredicate::FullName(v) => user.full_name.as_ref() == Some(v),
        UserPredicate::Email(v) => user.email.as_ref() == Some(v),
        UserPredicate::Mobile(v) => user.mobile.as_ref() == Some(v),
        UserPredicate::Status(s) => user.status == *s,
    }
}

fn filter_matches(filter: &UserFilter, user: &User) -> bool {
    filter.predicates.iter().all(|p| predicate_matches(p, user))
}

fn apply_patch(patch: UserPatch, user: &mut User) {
    if let Some(v) = patch.password_hash {
        user.password_hash = v;
    }
    if let Some(v) = patch.full_name {
        user.full_name = Some(v);
    }
    if let Some(v) = patch.email {
        user.email = Some(v);
    }
    if let Some(v) = patch.mobile {
        user.mobile = Some(v);
    }
    if let Some(v) = patch.status {
        user.status = v;
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_active_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|u| u.username == username && u.is_active())
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.username == new_user.username) {
            return Err(StoreError::DuplicateUsername);
        }
        let user = User {
            id: users.iter().map(|u| u.id).max().unwrap_or(0) + 1,
            username: new_user.username,
            password_hash: new_user.password_hash,
            full_name: None,
            email: new_user.email,
            mobile: None,
            status: UserStatus::Active,
            create_time: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: i64, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
            apply_patch(patch, u);
            u.clone()
        }))
    }

    async fn list(&self, filter: &UserFilter, page: Page) -> Result<(Vec<User>, i64), StoreError> {
        let users = self.users.read().await;
        let matching: Vec<&User> = users.iter().filter(|u| filter_matches(filter, u)).collect();
        let count = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(page.offset.max(0) as usize)
            .take(page.limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((items, count))
    }
}

/// A store whose every call fails, for exercising the infrastructure error path.
pub struct UnavailableUserStore;

#[async_trait]
impl UserStore for UnavailableUserStore {
    async fn find_active_by_username(&self, _username: &str) -> Result<Option<User>, StoreError> {
        Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut))
    }
    async fn find_by_id(&self, _id: i64) -> Result<Option<User>, StoreError> {
        Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut))
    }
    async fn create(&self, _new_user: NewUser) -> Result<User, StoreError> {
        Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut))
    }
    async fn update(&self, _id: i64, _patch: UserPatch) -> Result<Option<User>, StoreError> {
        Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut))
    }
    async fn list(&self, _f: &UserFilter, _p: Page) -> Result<(Vec<User>, i64), StoreError> {
        Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> NewUser {
        NewUser {
            username: "alice".into(),
            password_hash: "$argon2id$stub".into(),
            email: Some("a@x.com".into()),
        }
    }

    #[tokio::test]
    async fn filter_requires_every_predicate() {
        let store = MemoryUserStore::new();
        let user = store.create(alice()).await.unwrap();

        let both = UserFilter {
            predicates: vec![
                UserPredicate::Username("alice".into()),
                UserPredicate::Status(UserStatus::Active),
            ],
        };
        assert!(filter_matches(&both, &user));

        let mismatch = UserFilter {
            predicates: vec![
                UserPredicate::Username("alice".into()),
                UserPredicate::Email("b@x.com".into()),
            ],
        };
        assert!(!filter_matches(&mismatch, &user));
        assert!(filter_matches(&UserFilter::default(), &user));
    }

    #[tokio::test]
    async fn patch_only_touches_given_fields() {
        let store = MemoryUserStore::new();
        let user = store.create(alice()).await.unwrap();
        let patch = UserPatch {
            mobile: Some("5551234".into()),
            ..UserPatch::default()
        };
        let updated = store.update(user.id, patch).await.unwrap().unwrap();
        assert_eq!(updated.mobile.as_deref(), Some("5551234"));
        assert_eq!(updated.email.as_deref(), Some("a@x.com"));
        assert!(updated.is_active());

        assert!(store.find_active_by_username("alice").await.unwrap().is_some());
        store
            .update(user.id, UserPatch::status(UserStatus::Inactive))
            .await
            .unwrap();
        assert!(store.find_active_by_username("alice").await.unwrap().is_none());
        assert!(store.find_by_id(user.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn duplicate_username_is_refused() {
        let store = MemoryUserStore::new();
        store.create(alice()).await.unwrap();
        assert!(matches!(
            store.create(alice()).await,
            Err(StoreError::DuplicateUsername)
        ));
    }
}
