/// Account endpoints
///
/// - `GET|POST /api/accounts/profiles` - list (paginated, `?role=`) / create (admin)
/// - `GET|PATCH|PUT|DELETE /api/accounts/profiles/:id` - admin profile management
/// - `GET /api/accounts/me` - the caller's own profile
/// - `GET|PUT /api/accounts/company` - the calling seller's company
/// - `GET /api/accounts/company-names` - every company's id and name

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    pagination::{Page, PageParams},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use solarmart_shared::{
    auth::{
        authorization::{require_admin, require_profile, require_seller},
        middleware::AuthContext,
        password::{self, PasswordContext},
    },
    models::{
        company::{Company, CompanyData, CompanyName},
        profile::{Profile, ProfileDetail, UserRole},
        user::{CreateUser, UpdateUser, User},
    },
};
use tracing::info;
use validator::Validate;

#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub email: String,
    pub full_name: String,
    pub phone_number: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub user: UserView,
    pub role: UserRole,
    pub company: Option<Company>,
}

impl From<ProfileDetail> for ProfileResponse {
    fn from(detail: ProfileDetail) -> Self {
        let company = detail.company();

        Self {
            id: detail.id,
            role: detail.role,
            company,
            user: UserView {
                email: detail.email,
                full_name: detail.full_name,
                phone_number: detail.phone_number,
                username: detail.username,
            },
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewUser {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,

    #[validate(length(min = 1, max = 255, message = "Ensure this field has 1 to 255 characters."))]
    pub full_name: String,

    #[validate(length(min = 1, max = 15, message = "Ensure this field has 1 to 15 characters."))]
    pub phone_number: String,

    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub username: Option<String>,

    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub user: NewUser,
    pub role: String,
    #[serde(default)]
    pub company: Option<CompanyData>,
}

/// User fields accepted on update
///
/// `email` and `username` are only declared so their presence can be rejected.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UserPatch {
    pub email: Option<String>,
    pub username: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Ensure this field has 1 to 255 characters."))]
    pub full_name: Option<String>,

    #[validate(length(min = 1, max = 15, message = "Ensure this field has 1 to 15 characters."))]
    pub phone_number: Option<String>,

    pub password: Option<String>,
    pub confirm_password: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub user: Option<UserPatch>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub company: Option<CompanyData>,
}

#[derive(Debug, Deserialize)]
pub struct RoleFilter {
    pub role: Option<String>,
}

fn company_problems(company: &CompanyData) -> Vec<(String, String)> {
    let mut problems = Vec::new();

    let mut check = |field: &str, value: &str, max: usize| {
        let len = value.trim().chars().count();
        if len == 0 || len > max {
            problems.push((
                format!("company.{}", field),
                format!("Ensure this field has 1 to {} characters.", max),
            ));
        }
    };

    check("name", &company.name, 255);
    check("phone_number", &company.phone_number, 20);
    check("city", &company.city, 100);

    problems
}

/// Checks that both password fields match and pass the password policy
fn checked_password(
    password: Option<&str>,
    confirm: Option<&str>,
    ctx: &PasswordContext<'_>,
) -> ApiResult<String> {
    if password != confirm {
        return Err(ApiError::invalid("non_field_errors", "Passwords do not match."));
    }

    let password = password.unwrap_or_default();
    password::validate_password(password, ctx).map_err(|m| ApiError::field_messages("password", m))?;

    Ok(password::hash_password(password)?)
}

async fn load_detail(state: &AppState, id: i64) -> ApiResult<ProfileDetail> {
    Profile::detail(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found.".to_string()))
}

pub async fn list_profiles(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<PageParams>,
    Query(filter): Query<RoleFilter>,
) -> ApiResult<Json<Page<ProfileResponse>>> {
    require_admin(&auth)?;

    let role = match filter.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => Some(raw.parse::<UserRole>()?),
        None => None,
    };

    let count = Profile::count(&state.db, role).await?;
    params.check(count)?;

    let profiles = Profile::list_details(&state.db, role, params.limit(), params.offset()).await?;

    Ok(Json(Page::new(
        &params,
        count,
        profiles.into_iter().map(ProfileResponse::from).collect(),
    )))
}

/// Creates a user, its profile and (for sellers) its company in one transaction
pub async fn create_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateProfileRequest>,
) -> ApiResult<(StatusCode, Json<ProfileResponse>)> {
    require_admin(&auth)?;
    req.user.validate()?;

    let role: UserRole = req.role.parse()?;

    if let Some(company) = &req.company {
        ApiError::check_fields(company_problems(company))?;
    }

    let password_hash = checked_password(
        Some(&req.user.password),
        Some(&req.user.confirm_password),
        &PasswordContext {
            email: Some(&req.user.email),
            full_name: Some(&req.user.full_name),
        },
    )?;

    let mut tx = state.db.begin().await?;

    let user = User::create(
        &mut *tx,
        CreateUser {
            email: req.user.email,
            full_name: req.user.full_name,
            phone_number: req.user.phone_number,
            username: req.user.username.filter(|u| !u.trim().is_empty()),
            password_hash,
            is_staff: false,
            is_superuser: false,
        },
    )
    .await?;

    let profile = Profile::create(&mut *tx, user.id, role).await?;

    if role == UserRole::Seller {
        if let Some(company) = req.company {
            Company::upsert_for_owner(&mut *tx, profile.id, company).await?;
        }
    }

    let detail = Profile::detail(&mut *tx, profile.id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    tx.commit().await?;

    info!(profile_id = profile.id, user_id = user.id, role = %role, "Profile created");

    Ok((StatusCode::CREATED, Json(detail.into())))
}

pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<ProfileResponse>> {
    require_admin(&auth)?;
    Ok(Json(load_detail(&state, id).await?.into()))
}

/// Updates user fields, role and company
///
/// E-mail and username cannot be changed. A new password needs a matching
/// confirmation.
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    require_admin(&auth)?;

    let current = load_detail(&state, id).await?;
    let patch = req.user.unwrap_or_default();
    patch.validate()?;

    if patch.email.is_some() || patch.username.is_some() {
        return Err(ApiError::invalid(
            "user",
            "Updating the email or username is not allowed.",
        ));
    }

    let role = match req.role.as_deref() {
        Some(raw) => raw.parse::<UserRole>()?,
        None => current.role,
    };

    if let Some(company) = &req.company {
        ApiError::check_fields(company_problems(company))?;
    }

    let password_hash = if patch.password.is_some() || patch.confirm_password.is_some() {
        let full_name = patch.full_name.as_deref().unwrap_or(&current.full_name);
        Some(checked_password(
            patch.password.as_deref(),
            patch.confirm_password.as_deref(),
            &PasswordContext {
                email: Some(&current.email),
                full_name: Some(full_name),
            },
        )?)
    } else {
        None
    };

    let update = UpdateUser {
        full_name: patch.full_name,
        phone_number: patch.phone_number,
        password_hash,
        is_active: patch.is_active,
    };

    let mut tx = state.db.begin().await?;

    if !update.is_empty() {
        User::update(&mut *tx, current.user_id, update).await?;
    }

    if role != current.role {
        Profile::update_role(&mut *tx, id, role).await?;
    }

    if role == UserRole::Seller {
        if let Some(company) = req.company {
            Company::upsert_for_owner(&mut *tx, id, company).await?;
        }
    }

    let detail = Profile::detail(&mut *tx, id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    tx.commit().await?;

    info!(profile_id = id, "Profile updated");

    Ok(Json(detail.into()))
}

/// Deletes the profile and its user account
pub async fn delete_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    require_admin(&auth)?;

    if !Profile::delete_with_user(&state.db, id).await? {
        return Err(ApiError::NotFound("Not found.".to_string()));
    }

    info!(profile_id = id, deleted_by = auth.user_id, "Profile deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<ProfileResponse>> {
    let profile_id = require_profile(&auth)?;
    Ok(Json(load_detail(&state, profile_id).await?.into()))
}

pub async fn get_company(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<Company>> {
    require_seller(&auth)?;
    let profile_id = require_profile(&auth)?;

    Company::find_by_owner(&state.db, profile_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No company registered for this seller.".to_string()))
}

pub async fn put_company(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(company): Json<CompanyData>,
) -> ApiResult<Json<Company>> {
    require_seller(&auth)?;
    let profile_id = require_profile(&auth)?;

    ApiError::check_fields(company_problems(&company))?;

    let company = Company::upsert_for_owner(&state.db, profile_id, company).await?;
    info!(profile_id, company_id = company.id, "Company saved");

    Ok(Json(company))
}

pub async fn company_names(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> ApiResult<Json<Vec<CompanyName>>> {
    Ok(Json(Company::list_names(&state.db).await?))
}
