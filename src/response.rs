use serde::Serialize;

pub const CODE_OK: i32 = 200;
pub const CODE_FAILED: i32 = 0;

/// JSON envelope shared by every `/api/user` endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
}

impl ApiResponse<()> {
    pub fn message(code: i32, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: None,
            count: None,
        }
    }

    pub fn ok(msg: impl Into<String>) -> Self {
        Self::message(CODE_OK, msg)
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn with_data(msg: impl Into<String>, data: T) -> Self {
        Self {
            code: CODE_OK,
            msg: msg.into(),
            data: Some(data),
            count: None,
        }
    }

    pub fn with_count(msg: impl Into<String>, data: T, count: i64) -> Self {
        Self {
            count: Some(count),
            ..Self::with_data(msg, data)
        }
    }
}
