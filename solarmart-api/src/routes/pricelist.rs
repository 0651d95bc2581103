/// Per-seller price lists
///
/// One route family serves every kind; the `:kind` path segment picks the
/// list (`panel`, `inverter`, `mechanical-work`, ...). Each kind has its own
/// required attributes, see [`PriceListKind::rules`].
///
/// - `GET|POST /api/pricelist/:kind`
/// - `GET|PUT|PATCH|DELETE /api/pricelist/:kind/:id`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::accounts::ProfileResponse,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use solarmart_shared::{
    auth::{
        authorization::{require_admin_or_seller, require_profile},
        middleware::AuthContext,
    },
    models::{
        price_list::{PriceListData, PriceListItem, PriceListKind},
        profile::Profile,
    },
};
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct PriceListResponse {
    #[serde(flatten)]
    pub item: PriceListItem,
    pub seller: Option<ProfileResponse>,
}

fn parse_kind(segment: &str) -> ApiResult<PriceListKind> {
    PriceListKind::from_path(segment).ok_or_else(not_found)
}

fn not_found() -> ApiError {
    ApiError::NotFound("Not found.".to_string())
}

/// `None` for callers who see every seller's items, otherwise the caller's profile
fn item_scope(auth: &AuthContext) -> ApiResult<Option<i64>> {
    require_admin_or_seller(auth)?;

    if auth.sees_everything() {
        Ok(None)
    } else {
        Ok(Some(require_profile(auth)?))
    }
}

async fn with_seller(state: &AppState, item: PriceListItem) -> ApiResult<PriceListResponse> {
    let seller = Profile::detail(&state.db, item.seller_id).await?.map(ProfileResponse::from);
    Ok(PriceListResponse { item, seller })
}

async fn load_item(
    state: &AppState,
    auth: &AuthContext,
    kind: PriceListKind,
    id: i64,
) -> ApiResult<PriceListItem> {
    let scope = item_scope(auth)?;

    PriceListItem::find(&state.db, kind, id, scope)
        .await?
        .ok_or_else(not_found)
}

pub async fn list_items(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(kind): Path<String>,
) -> ApiResult<Json<Vec<PriceListResponse>>> {
    let kind = parse_kind(&kind)?;
    let scope = item_scope(&auth)?;

    let items = PriceListItem::list(&state.db, kind, scope).await?;

    let mut sellers: HashMap<i64, Option<ProfileResponse>> = HashMap::new();
    let mut results = Vec::with_capacity(items.len());

    for item in items {
        let seller = match sellers.get(&item.seller_id) {
            Some(cached) => cached.clone(),
            None => {
                let detail = Profile::detail(&state.db, item.seller_id)
                    .await?
                    .map(ProfileResponse::from);
                sellers.insert(item.seller_id, detail.clone());
                detail
            }
        };

        results.push(PriceListResponse { item, seller });
    }

    Ok(Json(results))
}

/// Adds the caller's item to a price list; one item per seller and kind
pub async fn create_item(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(kind): Path<String>,
    Json(data): Json<PriceListData>,
) -> ApiResult<(StatusCode, Json<PriceListResponse>)> {
    let kind = parse_kind(&kind)?;
    require_admin_or_seller(&auth)?;
    let seller_id = require_profile(&auth)?;

    ApiError::check_fields(data.problems(kind))?;

    let item = PriceListItem::create(&state.db, seller_id, kind, data).await?;
    info!(item_id = item.id, seller_id, kind = kind.as_path(), "Price list item created");

    Ok((StatusCode::CREATED, Json(with_seller(&state, item).await?)))
}

pub async fn get_item(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((kind, id)): Path<(String, i64)>,
) -> ApiResult<Json<PriceListResponse>> {
    let kind = parse_kind(&kind)?;
    let item = load_item(&state, &auth, kind, id).await?;

    Ok(Json(with_seller(&state, item).await?))
}

/// Validates `data` and stores it; the caller becomes the item's seller
async fn store(
    state: &AppState,
    auth: &AuthContext,
    kind: PriceListKind,
    id: i64,
    data: PriceListData,
) -> ApiResult<PriceListResponse> {
    let seller_id = require_profile(auth)?;
    ApiError::check_fields(data.problems(kind))?;

    let item = PriceListItem::replace(&state.db, id, seller_id, data)
        .await?
        .ok_or_else(not_found)?;

    info!(item_id = id, seller_id, kind = kind.as_path(), "Price list item updated");

    with_seller(state, item).await
}

pub async fn replace_item(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((kind, id)): Path<(String, i64)>,
    Json(data): Json<PriceListData>,
) -> ApiResult<Json<PriceListResponse>> {
    let kind = parse_kind(&kind)?;
    load_item(&state, &auth, kind, id).await?;

    Ok(Json(store(&state, &auth, kind, id, data).await?))
}

/// Partial update: omitted fields keep their stored values
pub async fn patch_item(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((kind, id)): Path<(String, i64)>,
    Json(data): Json<PriceListData>,
) -> ApiResult<Json<PriceListResponse>> {
    let kind = parse_kind(&kind)?;
    let current = load_item(&state, &auth, kind, id).await?;

    Ok(Json(store(&state, &auth, kind, id, data.merged_onto(&current)).await?))
}

pub async fn delete_item(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((kind, id)): Path<(String, i64)>,
) -> ApiResult<StatusCode> {
    let kind = parse_kind(&kind)?;
    let item = load_item(&state, &auth, kind, id).await?;

    PriceListItem::delete(&state.db, item.id).await?;

    info!(item_id = id, kind = kind.as_path(), "Price list item deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solarmart_shared::models::profile::UserRole;

    fn auth(role: Option<UserRole>, profile_id: Option<i64>) -> AuthContext {
        AuthContext {
            user_id: 1,
            profile_id,
            role,
            is_staff: false,
            email: "caller@example.com".to_string(),
        }
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind("mechanical-work").unwrap(), PriceListKind::MechanicalWork);
        assert!(matches!(parse_kind("mechanical_work"), Err(ApiError::NotFound(_))));
        assert!(matches!(parse_kind("solar-panel"), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_item_scope() {
        assert_eq!(item_scope(&auth(Some(UserRole::Admin), Some(1))).unwrap(), None);
        assert_eq!(item_scope(&auth(Some(UserRole::Seller), Some(8))).unwrap(), Some(8));
        assert!(matches!(
            item_scope(&auth(Some(UserRole::Buyer), Some(9))),
            Err(ApiError::Forbidden(_))
        ));
    }
}
