/// Authentication endpoints
///
/// - `POST /api/auth/login` - exchange credentials and role for a token pair
/// - `POST /api/auth/refresh-token` - new access token (and rotated refresh token)
/// - `POST /api/auth/verify-token` - check a token's signature and expiry
/// - `POST /api/auth/forgot-password` - e-mail a password reset link
/// - `POST /api/auth/reset-password/:token` - set a new password

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use solarmart_shared::{
    auth::{
        jwt::{self, Claims, TokenType},
        password::{self, PasswordContext},
    },
    models::{
        profile::{InvalidRole, Profile, UserRole},
        token_blacklist::TokenBlacklist,
        user::User,
    },
    notify::password_reset_email,
};
use tracing::{info, warn};
use validator::Validate;

const INVALID_CREDENTIALS: &str = "No active account found with the given credentials";

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "This field is required."))]
    pub email: String,

    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,

    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 8, message = "Ensure this field has at least 8 characters."))]
    pub new_password: String,
}

/// Login with e-mail, password and the expected role
///
/// ```text
/// POST /api/auth/login
///
/// { "email": "seller@example.com", "password": "...", "role": "seller" }
/// ```
///
/// # Errors
///
/// - `401`: unknown e-mail, wrong password or inactive account
/// - `400`: role missing, unknown, or not the account's role
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let requested = req
        .role
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Please provide the role.".to_string()))?;
    let requested: UserRole = requested
        .parse()
        .map_err(|e: InvalidRole| ApiError::BadRequest(e.to_string()))?;

    let profile = Profile::find_by_user_id(&state.db, user.id).await?;
    let role = match profile {
        Some(p) if p.role == requested => p.role,
        _ => {
            return Err(ApiError::BadRequest(
                "The role does not match the user's account type.".to_string(),
            ))
        }
    };

    User::update_last_login(&state.db, user.id).await?;

    let pair = jwt::issue_token_pair(user.id, Some(role), state.jwt_secret(), state.config.token_lifetimes())?;

    info!(user_id = user.id, role = %role, "User logged in");

    Ok(Json(LoginResponse {
        access: pair.access,
        refresh: pair.refresh,
        role,
    }))
}

/// Exchanges a refresh token for a new access token
///
/// With rotation enabled a new refresh token is returned as well and,
/// with blacklisting enabled, the consumed one can no longer be used.
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh, state.jwt_secret())?;

    if TokenBlacklist::contains(&state.db, claims.jti).await? {
        return Err(ApiError::Unauthorized("Token is blacklisted".to_string()));
    }

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    // The role may have changed since the refresh token was issued
    let role = Profile::find_by_user_id(&state.db, user.id).await?.map(|p| p.role);
    let lifetimes = state.config.token_lifetimes();

    let access = jwt::create_token(
        &Claims::with_expiration(user.id, role, TokenType::Access, lifetimes.access),
        state.jwt_secret(),
    )?;

    let refresh = if state.config.jwt.rotate_refresh_tokens {
        if state.config.jwt.blacklist_after_rotation {
            TokenBlacklist::add(&state.db, claims.jti, user.id, claims.expires_at()).await?;
        }

        Some(jwt::create_token(
            &Claims::with_expiration(user.id, role, TokenType::Refresh, lifetimes.refresh),
            state.jwt_secret(),
        )?)
    } else {
        None
    };

    Ok(Json(RefreshResponse { access, refresh }))
}

/// Returns `{}` when the token is valid
pub async fn verify_token(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let claims = jwt::validate_token(&req.token, state.jwt_secret())?;

    if claims.token_type == TokenType::Refresh && TokenBlacklist::contains(&state.db, claims.jti).await? {
        return Err(ApiError::Unauthorized("Token is blacklisted".to_string()));
    }

    Ok(Json(json!({})))
}

/// E-mails a reset link to an active account
///
/// The response is the same whether or not the account exists.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    req.validate()?;

    if let Some(user) = User::find_by_email(&state.db, &req.email)
        .await?
        .filter(|u| u.is_active)
    {
        let claims = Claims::for_password_reset(user.id, &user.password_hash);
        let token = jwt::create_token(&claims, state.jwt_secret())?;
        let link = format!("{}/reset-password/{}", state.config.api.public_base_url, token);

        if let Err(e) = state.mailer.send(&password_reset_email(&user.email, &link)).await {
            warn!(user_id = user.id, error = %e, "Failed to send password reset e-mail");
        } else {
            info!(user_id = user.id, "Password reset e-mail sent");
        }
    }

    Ok(Json(json!({
        "message": "If an account with that email exists, a password reset link has been sent."
    })))
}

/// Sets a new password using a reset token
///
/// A link works once, and only while the password it was issued against is
/// still the current one.
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    req.validate()?;

    let invalid = || ApiError::BadRequest("Invalid or expired token.".to_string());

    let claims = jwt::validate_reset_token(&token, state.jwt_secret()).map_err(|_| invalid())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .filter(|u| u.is_active && claims.matches_password(&u.password_hash))
        .ok_or_else(invalid)?;

    let ctx = PasswordContext {
        email: Some(&user.email),
        full_name: Some(&user.full_name),
    };
    password::validate_password(&req.new_password, &ctx)
        .map_err(|messages| ApiError::field_messages("new_password", messages))?;

    let hash = password::hash_password(&req.new_password)?;

    let mut tx = state.db.begin().await?;

    if !TokenBlacklist::add(&mut *tx, claims.jti, user.id, claims.expires_at()).await? {
        return Err(invalid());
    }
    User::set_password(&mut *tx, user.id, &hash).await?;

    tx.commit().await?;

    info!(user_id = user.id, "Password reset");

    Ok(Json(json!({ "message": "Password has been reset successfully." })))
}
