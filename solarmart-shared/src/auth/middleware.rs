/// Bearer-token authentication
///
/// [`authenticate`] turns an `Authorization` header into an [`AuthContext`]
/// by validating the access token and loading the user and profile from the
/// database, so deactivated accounts lose access immediately even while
/// their tokens are still valid.
///
/// Handlers receive the context either through `Extension<AuthContext>` or
/// by naming `AuthContext` directly as an extractor.
///
/// # Example
///
/// ```
/// use solarmart_shared::auth::middleware::AuthContext;
///
/// async fn whoami(auth: AuthContext) -> String {
///     format!("user {} ({:?})", auth.user_id, auth.role)
/// }
/// ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::jwt::{validate_access_token, JwtError};
use crate::models::{profile::{Profile, UserRole}, user::User};

/// Identity of the caller, placed into request extensions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: i64,

    /// None for accounts without a profile (e.g. bare staff users)
    pub profile_id: Option<i64>,

    pub role: Option<UserRole>,

    /// Staff users pass every role check
    pub is_staff: bool,

    pub email: String,
}

impl AuthContext {
    pub fn new(user: &User, profile: Option<&Profile>) -> Self {
        Self {
            user_id: user.id,
            profile_id: profile.map(|p| p.id),
            role: profile.map(|p| p.role),
            is_staff: user.is_staff,
            email: user.email.clone(),
        }
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        self.role == Some(role)
    }

    /// Staff or admin-role callers, who see every record
    pub fn sees_everything(&self) -> bool {
        self.is_staff || self.has_role(UserRole::Admin)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authentication credentials were not provided.")]
    MissingCredentials,

    #[error("{0}")]
    InvalidFormat(String),

    #[error("{0}")]
    InvalidToken(String),

    /// Token is valid but the account is gone or deactivated
    #[error("User not found or inactive")]
    InactiveUser,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
            AuthError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        };

        let message = match &self {
            AuthError::DatabaseError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        (status, message).into_response()
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` value
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingCredentials)?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Validates the bearer token and loads the caller
///
/// # Errors
///
/// - `MissingCredentials` / `InvalidFormat` for a missing or malformed header
/// - `InvalidToken` when the signature, expiry, issuer or type is wrong
/// - `InactiveUser` when the user was deleted or deactivated
pub async fn authenticate(
    pool: &PgPool,
    secret: &str,
    header: Option<&str>,
) -> Result<AuthContext, AuthError> {
    let token = bearer_token(header)?;

    let claims = validate_access_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
        other => AuthError::InvalidToken(format!("Invalid token: {}", other)),
    })?;

    let user = User::find_by_id(pool, claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or(AuthError::InactiveUser)?;

    let profile = Profile::find_by_user_id(pool, user.id).await?;

    Ok(AuthContext::new(&user, profile.as_ref()))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::MissingCredentials)
    }
}
