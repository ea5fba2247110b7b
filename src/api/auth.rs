//! Caller identity.
//!
//! Sessions and passwords are handled by the authenticating proxy in front of this
//! service, which forwards the resolved user id in the `X-User-Id` header.

use crate::errors::Error;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Header carrying the authenticated user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller's user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub i64);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .map(Self)
            .ok_or(Error::Unauthenticated)
    }
}
