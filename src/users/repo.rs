use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use thiserror::Error;

use crate::users::repo_types::{
    NewUser, Page, User, UserFilter, UserPatch, UserPredicate, UserStatus,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username already exists")]
    DuplicateUsername,
    #[error("user store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateUsername,
            _ => StoreError::Unavailable(e),
        }
    }
}

/// Persistence for user records. Username uniqueness is the store's job.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_active_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;
    /// Returns `None` when no user has this id.
    async fn update(&self, id: i64, patch: UserPatch) -> Result<Option<User>, StoreError>;
    /// One page of matching users plus the total number of matches.
    async fn list(&self, filter: &UserFilter, page: Page) -> Result<(Vec<User>, i64), StoreError>;
}

const USER_COLUMNS: &str =
    "id, username, password_hash, full_name, email, mobile, status, create_time";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn push_predicates(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    for predicate in &filter.predicates {
        qb.push(" AND ").push(predicate.column()).push(" = ");
        match predicate.clone() {
            UserPredicate::Id(v) => qb.push_bind(v),
            UserPredicate::Username(v)
            | UserPredicate::FullName(v)
            | UserPredicate::Email(v)
            | UserPredicate::Mobile(v) => qb.push_bind(v),
            UserPredicate::Status(v) => qb.push_bind(v),
        };
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_active_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND status = $2"
        ))
        .bind(username)
        .bind(UserStatus::Active)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, password_hash, email, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .bind(&new_user.email)
        .bind(UserStatus::Active)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn update(&self, id: i64, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET password_hash = COALESCE($2, password_hash),
                   full_name     = COALESCE($3, full_name),
                   email         = COALESCE($4, email),
                   mobile        = COALESCE($5, mobile),
                   status        = COALESCE($6, status)
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.password_hash)
        .bind(patch.full_name)
        .bind(patch.email)
        .bind(patch.mobile)
        .bind(patch.status)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn list(&self, filter: &UserFilter, page: Page) -> Result<(Vec<User>, i64), StoreError> {
        let mut count_q = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE TRUE");
        push_predicates(&mut count_q, filter);
        let count: i64 = count_q.build_query_scalar().fetch_one(&self.db).await?;

        let mut rows_q =
            QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users WHERE TRUE"));
        push_predicates(&mut rows_q, filter);
        rows_q
            .push(" ORDER BY id LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        let users = rows_q.build_query_as::<User>().fetch_all(&self.db).await?;

        Ok((users, count))
    }
}
