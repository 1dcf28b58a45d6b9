use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderName, request::Parts},
};
use std::convert::Infallible;

use crate::models::error::ApiError;

/// Caller identity set by the upstream gateway
pub static X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");

/// Optional caller identity; `None` means an anonymous caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub Option<String>);

impl UserId {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Identity required for endpoints that read or mutate stored state
    pub fn require(&self) -> Result<&str, ApiError> {
        self.as_deref()
            .ok_or_else(|| ApiError::Unauthorized("x-user-id header is required".into()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(&X_USER_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from);

        Ok(UserId(user))
    }
}
