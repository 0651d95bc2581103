/// Component and tag catalogs shared by all listings

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use solarmart_shared::{
    auth::{authorization::require_admin_or_seller, middleware::AuthContext},
    models::{
        component::{Component, CreateComponent},
        tag::Tag,
    },
};
use tracing::info;

const TAG_NAME_MAX: usize = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct TagInput {
    pub name: String,
}

/// Problem with a tag name, if any
pub fn tag_name_problem(name: &str) -> Option<String> {
    let len = name.trim().chars().count();

    if len == 0 {
        Some("This field may not be blank.".to_string())
    } else if len > TAG_NAME_MAX {
        Some(format!("Ensure this field has no more than {} characters.", TAG_NAME_MAX))
    } else {
        None
    }
}

pub async fn list_components(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> ApiResult<Json<Vec<Component>>> {
    Ok(Json(Component::list(&state.db).await?))
}

pub async fn create_component(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateComponent>,
) -> ApiResult<(StatusCode, Json<Component>)> {
    require_admin_or_seller(&auth)?;
    ApiError::check_fields(req.problems())?;

    let component = Component::create(&state.db, req).await?;
    info!(component_id = component.id, "Component created");

    Ok((StatusCode::CREATED, Json(component)))
}

pub async fn list_tags(State(state): State<AppState>, _auth: AuthContext) -> ApiResult<Json<Vec<Tag>>> {
    Ok(Json(Tag::list(&state.db).await?))
}

/// Creates a tag; an existing name is a conflict
pub async fn create_tag(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<TagInput>,
) -> ApiResult<(StatusCode, Json<Tag>)> {
    require_admin_or_seller(&auth)?;

    if let Some(problem) = tag_name_problem(&req.name) {
        return Err(ApiError::invalid("name", problem));
    }

    let tag = Tag::create(&state.db, &req.name).await?;
    info!(tag_id = tag.id, name = %tag.name, "Tag created");

    Ok((StatusCode::CREATED, Json(tag)))
}
