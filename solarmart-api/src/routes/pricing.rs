/// Subscription plans and seller passes
///
/// - `GET|POST /api/pricing/subscription-plan`
/// - `GET|POST /api/pricing/subscription-passes`
/// - `GET /api/pricing/subscription-passes/:id`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solarmart_shared::{
    auth::{
        authorization::{require_admin, require_profile, require_seller},
        middleware::AuthContext,
    },
    models::{
        profile::UserRole,
        subscription::{PlanName, SubscriptionPass, SubscriptionPlan},
    },
};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct CreatePlanRequest {
    pub name: PlanName,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CreatePassRequest {
    pub plan_id: i64,
}

#[derive(Debug, Serialize)]
pub struct PassUser {
    pub id: i64,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct PassSeller {
    pub id: i64,
    pub user: PassUser,
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
pub struct PassPlan {
    pub id: i64,
    pub name: PlanName,
    pub price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct PassResponse {
    pub id: i64,
    pub seller: PassSeller,
    pub plan: PassPlan,
    pub created: DateTime<Utc>,
}

impl From<SubscriptionPass> for PassResponse {
    fn from(pass: SubscriptionPass) -> Self {
        Self {
            id: pass.id,
            seller: PassSeller {
                id: pass.seller_id,
                user: PassUser {
                    id: pass.seller_user_id,
                    full_name: pass.seller_full_name,
                    email: pass.seller_email,
                },
                role: pass.seller_role,
            },
            plan: PassPlan {
                id: pass.plan_id,
                name: pass.plan_name,
                price: pass.plan_price,
            },
            created: pass.created,
        }
    }
}

/// `None` for callers who see every pass, otherwise the caller's profile
fn pass_scope(auth: &AuthContext) -> ApiResult<Option<i64>> {
    if auth.sees_everything() {
        Ok(None)
    } else {
        Ok(Some(require_profile(auth)?))
    }
}

pub async fn list_plans(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> ApiResult<Json<Vec<SubscriptionPlan>>> {
    Ok(Json(SubscriptionPlan::list_active(&state.db).await?))
}

/// Returns the plan with this name, creating it first if needed
///
/// An existing plan is returned unchanged.
pub async fn create_plan(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreatePlanRequest>,
) -> ApiResult<Json<SubscriptionPlan>> {
    require_admin(&auth)?;

    if req.price <= Decimal::ZERO {
        return Err(ApiError::invalid("price", "Price must be a positive number."));
    }

    let (plan, created) =
        SubscriptionPlan::get_or_create(&state.db, req.name, req.description, req.price).await?;

    if created {
        info!(plan_id = plan.id, "Subscription plan created");
    }

    Ok(Json(plan))
}

pub async fn list_passes(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<PassResponse>>> {
    let scope = pass_scope(&auth)?;
    let passes = SubscriptionPass::list(&state.db, scope).await?;

    Ok(Json(passes.into_iter().map(PassResponse::from).collect()))
}

pub async fn get_pass(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<PassResponse>> {
    let scope = pass_scope(&auth)?;

    SubscriptionPass::find_by_id(&state.db, id, scope)
        .await?
        .map(|pass| Json(pass.into()))
        .ok_or_else(|| ApiError::NotFound("Not found.".to_string()))
}

/// Subscribes the calling seller to an active plan
pub async fn create_pass(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreatePassRequest>,
) -> ApiResult<(StatusCode, Json<PassResponse>)> {
    require_seller(&auth)?;
    let seller_id = require_profile(&auth)?;

    let plan = SubscriptionPlan::find_by_id(&state.db, req.plan_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| {
            ApiError::invalid(
                "plan_id",
                format!("Invalid pk \"{}\" - object does not exist.", req.plan_id),
            )
        })?;

    let pass = SubscriptionPass::create(&state.db, seller_id, plan.id).await?;
    info!(pass_id = pass.id, seller_id, plan_id = plan.id, "Subscription pass created");

    Ok((StatusCode::CREATED, Json(pass.into())))
}
