use crate::db::DbPool;
use crate::error::ApiError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use foodgram_core::User;
use std::sync::Arc;

use super::db::get_user_from_token;

/// The authenticated user. Rejects the request with 401 if there is no valid bearer token.
pub struct AuthUser(pub User);

/// The viewer of a public endpoint: `Some` with a valid bearer token, `None` without one.
/// A present but invalid token is still rejected with 401.
pub struct MaybeAuthUser(pub Option<User>);

impl MaybeAuthUser {
    pub fn id(&self) -> Option<uuid::Uuid> {
        self.0.as_ref().map(|u| u.id)
    }
}

/// The raw bearer token of the request, for operations on the session itself.
pub struct SessionToken(pub String);

/// Pull the bearer token out of the Authorization header.
/// `Ok(None)` means the header is absent.
pub(super) fn bearer_token(parts: &Parts) -> Result<Option<&str>, ApiError> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid Authorization header".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("Token "))
        .map(|t| Some(t.trim()))
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header format".to_string()))
}

fn resolve(pool: &DbPool, token: &str) -> Result<User, ApiError> {
    get_user_from_token(pool, token)
        .map(User::from)
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired token".to_string()))
}

impl<S> FromRequestParts<S> for AuthUser
where
    Arc<DbPool>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<User>() {
            return Ok(AuthUser(user.clone()));
        }

        let token = bearer_token(parts)?
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;
        let pool = Arc::<DbPool>::from_ref(state);
        resolve(&pool, token).map(AuthUser)
    }
}

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    Arc<DbPool>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => {
                let pool = Arc::<DbPool>::from_ref(state);
                resolve(&pool, token).map(|user| MaybeAuthUser(Some(user)))
            }
            None => Ok(MaybeAuthUser(None)),
        }
    }
}

impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        bearer_token(parts)?
            .map(|token| SessionToken(token.to_string()))
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/recipes");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(bearer_token(&parts(None)), Ok(None)));
    }

    #[test]
    fn test_bearer_and_token_schemes() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc"))).unwrap(), Some("abc"));
        assert_eq!(bearer_token(&parts(Some("Token abc"))).unwrap(), Some("abc"));
    }

    #[test]
    fn test_unknown_scheme_is_rejected() {
        let err = bearer_token(&parts(Some("Basic dXNlcjpwYXNz"))).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
