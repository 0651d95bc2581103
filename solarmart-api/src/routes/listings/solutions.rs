/// Solar solution endpoints
///
/// - `GET /api/listings/solar-solutions` - search visible listings
/// - `POST /api/listings/solar-solutions` - nested create with tags, components and service
/// - `GET /api/listings/solar-solutions/:id` - detail
/// - `PATCH|PUT /api/listings/solar-solutions/:id` - partial update
/// - `DELETE /api/listings/solar-solutions/:id`

use super::{
    catalog::{tag_name_problem, TagInput},
    is_visible, list_items, media, solution_detail, visibility, SolutionDetail, SolutionListItem,
};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    pagination::{Page, PageParams},
    routes::nullable,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use solarmart_shared::{
    auth::{
        authorization::{require_admin_or_seller, require_owner_or_admin},
        middleware::AuthContext,
    },
    models::{
        approval::Approval,
        component::{Component, CreateComponent},
        media::SolutionMedia,
        service::{Service, ServiceData},
        solution::{NewSolution, PaymentSchedule, SolarSolution, SolutionFilter, SolutionType, UpdateSolution},
        tag::Tag,
    },
};
use tracing::info;

const SELLER_NOTE_MAX: usize = 500;
const DEFAULT_COMPLETION_DAYS: i32 = 15;

fn default_completion_days() -> i32 {
    DEFAULT_COMPLETION_DAYS
}

#[derive(Debug, Deserialize)]
pub struct CreateSolutionRequest {
    pub size: i32,
    pub price: Decimal,
    pub solution_type: SolutionType,
    #[serde(default = "default_completion_days")]
    pub completion_time_days: i32,
    #[serde(default)]
    pub payment_schedule: PaymentSchedule,
    #[serde(default)]
    pub seller_note: Option<String>,
    #[serde(default)]
    pub tags: Vec<TagInput>,
    #[serde(default)]
    pub components: Vec<CreateComponent>,
    #[serde(default)]
    pub service: Option<ServiceData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSolutionRequest {
    pub size: Option<i32>,
    pub price: Option<Decimal>,
    pub solution_type: Option<SolutionType>,
    pub completion_time_days: Option<i32>,
    pub payment_schedule: Option<PaymentSchedule>,
    #[serde(default, deserialize_with = "nullable")]
    pub seller_note: Option<Option<String>>,
    pub tag_ids: Option<Vec<i64>>,
    pub component_ids: Option<Vec<i64>>,
    pub service: Option<ServiceData>,
}

/// Checks the scalar listing fields shared by create and update
fn field_problems(
    size: Option<i32>,
    price: Option<Decimal>,
    completion_time_days: Option<i32>,
    seller_note: Option<&str>,
) -> Vec<(String, String)> {
    let mut problems = Vec::new();
    let non_negative = "Ensure this value is greater than or equal to 0.";

    if size.map_or(false, |s| s < 0) {
        problems.push(("size".to_string(), non_negative.to_string()));
    }
    if let Some(price) = price {
        if price.is_sign_negative() {
            problems.push(("price".to_string(), non_negative.to_string()));
        } else if price.trunc() >= Decimal::from(100_000_000) {
            problems.push((
                "price".to_string(),
                "Ensure that there are no more than 10 digits in total.".to_string(),
            ));
        } else if price.scale() > 2 {
            problems.push((
                "price".to_string(),
                "Ensure that there are no more than 2 decimal places.".to_string(),
            ));
        }
    }
    if completion_time_days.map_or(false, |d| d < 0) {
        problems.push(("completion_time_days".to_string(), non_negative.to_string()));
    }
    if seller_note.map_or(false, |n| n.chars().count() > SELLER_NOTE_MAX) {
        problems.push((
            "seller_note".to_string(),
            format!("Ensure this field has no more than {} characters.", SELLER_NOTE_MAX),
        ));
    }

    problems
}

impl CreateSolutionRequest {
    fn problems(&self) -> Vec<(String, String)> {
        let mut problems = field_problems(
            Some(self.size),
            Some(self.price),
            Some(self.completion_time_days),
            self.seller_note.as_deref(),
        );

        for (i, tag) in self.tags.iter().enumerate() {
            if let Some(problem) = tag_name_problem(&tag.name) {
                problems.push((format!("tags[{}].name", i), problem));
            }
        }
        for (i, component) in self.components.iter().enumerate() {
            for (field, problem) in component.problems() {
                problems.push((format!("components[{}].{}", i, field), problem));
            }
        }
        if let Some(service) = &self.service {
            for (field, problem) in service.problems() {
                problems.push((format!("service.{}", field), problem));
            }
        }

        problems
    }
}

impl UpdateSolutionRequest {
    fn problems(&self) -> Vec<(String, String)> {
        let mut problems = field_problems(
            self.size,
            self.price,
            self.completion_time_days,
            self.seller_note.as_ref().and_then(|n| n.as_deref()),
        );

        if let Some(service) = &self.service {
            for (field, problem) in service.problems() {
                problems.push((format!("service.{}", field), problem));
            }
        }

        problems
    }
}

fn id_list(ids: &[i64]) -> String {
    ids.iter().map(i64::to_string).collect::<Vec<_>>().join(", ")
}

/// Loads a listing the caller may see, or 404
async fn load_visible(state: &AppState, auth: &AuthContext, id: i64) -> ApiResult<SolarSolution> {
    SolarSolution::find_by_id(&state.db, id)
        .await?
        .filter(|s| is_visible(s, visibility(auth)))
        .ok_or_else(|| ApiError::NotFound("Not found.".to_string()))
}

/// Loads a listing the caller may modify
pub(super) async fn load_owned(state: &AppState, auth: &AuthContext, id: i64) -> ApiResult<SolarSolution> {
    require_admin_or_seller(auth)?;

    let solution = load_visible(state, auth, id).await?;
    require_owner_or_admin(auth, solution.seller_id)?;

    Ok(solution)
}

async fn render_detail(state: &AppState, id: i64) -> ApiResult<SolutionDetail> {
    let solution = SolarSolution::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found.".to_string()))?;

    Ok(solution_detail(&state.db, solution).await?)
}

/// Search listings
///
/// Staff and admins see everything, sellers their own listings and buyers
/// approved listings only. Filters: `city`, `min_price`, `max_price`,
/// `min_size`, `max_size`, `solution_type`.
pub async fn list_solutions(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<PageParams>,
    Query(filter): Query<SolutionFilter>,
) -> ApiResult<Json<Page<SolutionListItem>>> {
    let visibility = visibility(&auth);

    let count = SolarSolution::count(&state.db, visibility, &filter).await?;
    params.check(count)?;

    let solutions =
        SolarSolution::list(&state.db, visibility, &filter, params.limit(), params.offset()).await?;
    let results = list_items(&state.db, solutions).await?;

    Ok(Json(Page::new(&params, count, results)))
}

/// Creates a listing with its tags, components, service and a pending approval
///
/// ```text
/// POST /api/listings/solar-solutions
///
/// {
///   "size": 10, "price": "1250000.00", "solution_type": "Hybrid",
///   "tags": [{"name": "Residential"}],
///   "components": [{"component_type": "Inverter", "brand": "Huawei"}],
///   "service": {"net_metering_included": true}
/// }
/// ```
pub async fn create_solution(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateSolutionRequest>,
) -> ApiResult<(StatusCode, Json<SolutionDetail>)> {
    require_admin_or_seller(&auth)?;
    ApiError::check_fields(req.problems())?;

    let mut tx = state.db.begin().await?;

    let solution_id = SolarSolution::create(
        &mut *tx,
        NewSolution {
            size: req.size,
            price: req.price,
            solution_type: req.solution_type,
            completion_time_days: req.completion_time_days,
            payment_schedule: req.payment_schedule,
            seller_id: auth.profile_id,
            seller_note: req.seller_note,
        },
    )
    .await?;

    let mut tag_ids = Vec::with_capacity(req.tags.len());
    for tag in &req.tags {
        tag_ids.push(Tag::get_or_create(&mut tx, &tag.name).await?.id);
    }
    Tag::link(&mut tx, solution_id, &tag_ids).await?;

    let mut component_ids = Vec::with_capacity(req.components.len());
    for component in req.components {
        component_ids.push(Component::create(&mut *tx, component).await?.id);
    }
    Component::link(&mut tx, solution_id, &component_ids).await?;

    if let Some(service) = req.service {
        Service::upsert_for_solution(&mut *tx, solution_id, service).await?;
    }

    Approval::create_for_solution(&mut *tx, solution_id).await?;

    tx.commit().await?;

    info!(
        solution_id,
        seller_id = ?auth.profile_id,
        tags = tag_ids.len(),
        components = component_ids.len(),
        "Solar solution created"
    );

    Ok((StatusCode::CREATED, Json(render_detail(&state, solution_id).await?)))
}

pub async fn get_solution(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<SolutionDetail>> {
    let solution = load_visible(&state, &auth, id).await?;
    Ok(Json(solution_detail(&state.db, solution).await?))
}

/// Partial update
///
/// Supplied `tag_ids` / `component_ids` replace the current relations and a
/// supplied `service` is upserted, all in one transaction.
pub async fn update_solution(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
    Json(req): Json<UpdateSolutionRequest>,
) -> ApiResult<Json<SolutionDetail>> {
    load_owned(&state, &auth, id).await?;
    ApiError::check_fields(req.problems())?;

    let mut problems = Vec::new();
    if let Some(ids) = &req.component_ids {
        let missing = Component::missing_ids(&state.db, ids).await?;
        if !missing.is_empty() {
            problems.push(("component_ids", format!("Invalid component IDs: {}", id_list(&missing))));
        }
    }
    if let Some(ids) = &req.tag_ids {
        let missing = Tag::missing_ids(&state.db, ids).await?;
        if !missing.is_empty() {
            problems.push(("tag_ids", format!("Invalid tag IDs: {}", id_list(&missing))));
        }
    }
    ApiError::check_fields(problems)?;

    let mut tx = state.db.begin().await?;

    let updated = SolarSolution::update(
        &mut tx,
        id,
        UpdateSolution {
            size: req.size,
            price: req.price,
            solution_type: req.solution_type,
            completion_time_days: req.completion_time_days,
            payment_schedule: req.payment_schedule,
            seller_note: req.seller_note,
        },
    )
    .await?;

    if !updated {
        return Err(ApiError::NotFound("Not found.".to_string()));
    }

    if let Some(ids) = &req.tag_ids {
        Tag::set_for_solution(&mut tx, id, ids).await?;
    }
    if let Some(ids) = &req.component_ids {
        Component::set_for_solution(&mut tx, id, ids).await?;
    }
    if let Some(service) = req.service {
        Service::upsert_for_solution(&mut *tx, id, service).await?;
    }

    tx.commit().await?;

    info!(solution_id = id, updated_by = auth.user_id, "Solar solution updated");

    Ok(Json(render_detail(&state, id).await?))
}

/// Deletes a listing; its relations cascade and stored images are removed
pub async fn delete_solution(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    load_owned(&state, &auth, id).await?;

    let stored = SolutionMedia::for_solutions(&state.db, &[id], false).await?;

    if !SolarSolution::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Not found.".to_string()));
    }

    for item in stored.iter().filter_map(|m| m.image.as_deref()) {
        media::remove_stored_file(&state.config.api.media_root, item).await;
    }

    info!(solution_id = id, deleted_by = auth.user_id, "Solar solution deleted");
    Ok(StatusCode::NO_CONTENT)
}
