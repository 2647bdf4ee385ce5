// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::{Auth, Claims, Principal},
    error::ApiError,
    state::AppState,
};

/// Response for GET /v1/users/me
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserMeResponse {
    /// Token subject
    pub username: String,
    /// Authorities granted by the token
    pub authorities: Vec<String>,
    /// Token expiry (Unix seconds)
    pub expires_at: i64,
}

impl From<Claims> for UserMeResponse {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.sub,
            authorities: claims.authorities.into_iter().collect(),
            expires_at: claims.exp,
        }
    }
}

/// Directory entry returned to administrators.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub username: String,
    pub authorities: Vec<String>,
}

impl From<Principal> for UserResponse {
    fn from(principal: Principal) -> Self {
        Self {
            username: principal.subject().to_string(),
            authorities: principal.authorities().iter().cloned().collect(),
        }
    }
}

/// Get the current caller's identity and authorities.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User information", body = UserMeResponse),
        (status = 401, description = "Missing, malformed, forged or expired token"),
        (status = 503, description = "Authority unreachable")
    )
)]
pub async fn get_current_user(Auth(claims): Auth) -> Json<UserMeResponse> {
    Json(claims.into())
}

/// Look up a user in the directory (requires ADMIN).
#[utoipa::path(
    get,
    path = "/v1/admin/users/{username}",
    tag = "Admin",
    security(("bearer" = [])),
    params(("username" = String, Path, description = "Username to look up")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 401, description = "Missing, malformed, forged or expired token"),
        (status = 403, description = "Caller lacks ADMIN"),
        (status = 404, description = "Unknown user"),
        (status = 503, description = "Authority unreachable")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Auth(admin): Auth,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let principal = state
        .directory
        .lookup(&username)
        .ok_or_else(|| ApiError::not_found(format!("User '{username}' not found")))?;

    tracing::info!(admin = %admin.sub, user = %username, "Admin looked up user");
    Ok(Json(principal.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_me_response_from_claims() {
        let claims = Claims {
            sub: "user_123".to_string(),
            authorities: ["USER".to_string(), "ADMIN".to_string()].into_iter().collect(),
            iat: 10,
            exp: 20,
            jti: "jti".to_string(),
        };

        let response: UserMeResponse = claims.into();
        assert_eq!(response.username, "user_123");
        assert_eq!(response.authorities, vec!["ADMIN", "USER"]);
        assert_eq!(response.expires_at, 20);
    }

    #[test]
    fn user_response_from_principal() {
        let response: UserResponse = Principal::new("bob", ["USER"]).into();
        assert_eq!(response.username, "bob");
        assert_eq!(response.authorities, vec!["USER"]);
    }
}
