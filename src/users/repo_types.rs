use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Account status flag. Only active accounts can log in or hold a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(try_from = "i32", into = "i32")]
#[repr(i32)]
pub enum UserStatus {
    Inactive = 0,
    Active = 1,
}

impl From<UserStatus> for i32 {
    fn from(status: UserStatus) -> Self {
        status as i32
    }
}

impl TryFrom<i32> for UserStatus {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(UserStatus::Inactive),
            1 => Ok(UserStatus::Active),
            other => Err(format!("unknown status {}", other)),
        }
    }
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, never exposed in JSON
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub status: UserStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub create_time: OffsetDateTime,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// Values for a user insert. The store assigns id and create_time.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
}

/// Field-level update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub password_hash: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub status: Option<UserStatus>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.password_hash.is_none()
            && self.full_name.is_none()
            && self.email.is_none()
            && self.mobile.is_none()
            && self.status.is_none()
    }

    pub fn status(status: UserStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// The filterable columns of the listing endpoint, one variant per column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserPredicate {
    Id(i64),
    Username(String),
    FullName(String),
    Email(String),
    Mobile(String),
    Status(UserStatus),
}

impl UserPredicate {
    pub fn column(&self) -> &'static str {
        match self {
            UserPredicate::Id(_) => "id",
            UserPredicate::Username(_) => "username",
            UserPredicate::FullName(_) => "full_name",
            UserPredicate::Email(_) => "email",
            UserPredicate::Mobile(_) => "mobile",
            UserPredicate::Status(_) => "status",
        }
    }
}

/// Conjunction of predicates; an empty filter matches every user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub predicates: Vec<UserPredicate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// `page` is 1-based. `None` when the offset does not fit in an i64.
    pub fn new(page: i64, limit: i64) -> Option<Self> {
        let offset = page.checked_sub(1)?.checked_mul(limit)?;
        Some(Self { limit, offset })
    }
}
