//! Request identity. A bearer token resolves to a user when it verifies and
//! its user still exists; anything else is an anonymous request. Each
//! protected route states its [`Access`] requirement through the extractor
//! it takes.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Access {
    Authenticated,
    Role(UserRole),
    AnyRole(&'static [UserRole]),
}

pub(crate) fn is_authorized(user: &User, access: Access) -> bool {
    match access {
        Access::Authenticated => true,
        Access::Role(role) => user.role == role,
        Access::AnyRole(roles) => roles.contains(&user.role),
    }
}

/// Applies `access` to a possibly anonymous caller: 401 when anonymous,
/// 403 when the role does not fit.
pub(crate) fn authorize(user: Option<User>, access: Access) -> Result<User, ApiError> {
    let Some(user) = user else {
        return Err(ApiError::Unauthorized("Not authenticated"));
    };

    if is_authorized(&user, access) {
        Ok(user)
    } else {
        Err(ApiError::Forbidden("Not enough permissions"))
    }
}

pub(crate) struct MaybeUser(pub(crate) Option<User>);
pub(crate) struct CurrentUser(pub(crate) User);
pub(crate) struct CurrentStudent(pub(crate) User);
pub(crate) struct CurrentTeacher(pub(crate) User);
pub(crate) struct StudentOrTeacher(pub(crate) User);

/// Resolves a raw bearer token by its user id claim, so tokens survive an
/// email change. Unverifiable tokens and unknown users yield `None`; only
/// store failures are errors.
pub(crate) async fn resolve_token(state: &AppState, token: &str) -> Result<Option<User>, ApiError> {
    let Ok(claims) = security::verify_token(token, state.settings()) else {
        return Ok(None);
    };

    repositories::users::find_by_id(state.db(), &claims.uid)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(MaybeUser(None));
        };

        Ok(MaybeUser(resolve_token(state, token).await?))
    }
}

async fn require(parts: &mut Parts, state: &AppState, access: Access) -> Result<User, ApiError> {
    let MaybeUser(user) = MaybeUser::from_request_parts(parts, state).await?;
    authorize(user, access)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require(parts, state, Access::Authenticated).await.map(CurrentUser)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentStudent {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require(parts, state, Access::Role(UserRole::Student)).await.map(CurrentStudent)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentTeacher {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require(parts, state, Access::Role(UserRole::Teacher)).await.map(CurrentTeacher)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for StudentOrTeacher {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        const ROLES: &[UserRole] = &[UserRole::Student, UserRole::Teacher];
        require(parts, state, Access::AnyRole(ROLES)).await.map(StudentOrTeacher)
    }
}
