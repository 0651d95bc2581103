/// Listing endpoints
///
/// Solar solutions and their media, the shared component and tag catalogs,
/// and the admin seller report. The response shapes shared by several
/// handlers live here.

pub mod catalog;
pub mod media;
pub mod report;
pub mod solutions;

use rust_decimal::Decimal;
use serde::Serialize;
use solarmart_shared::{
    auth::middleware::AuthContext,
    models::{
        component::Component,
        interaction::BuyerInteraction,
        media::SolutionMedia,
        profile::UserRole,
        service::Service,
        solution::{PaymentSchedule, SolarSolution, SolutionType, Visibility},
        tag::Tag,
    },
};
use sqlx::PgPool;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct WhatsAppNumber {
    pub whatsapp_number: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageView {
    pub id: i64,
    pub image: Option<String>,
    pub is_display_image: bool,
}

impl From<SolutionMedia> for ImageView {
    fn from(media: SolutionMedia) -> Self {
        Self {
            id: media.id,
            image: media.image.as_deref().map(media_url),
            is_display_image: media.is_display_image,
        }
    }
}

/// One row of the listing search and the seller report
#[derive(Debug, Clone, Serialize)]
pub struct SolutionListItem {
    pub id: i64,
    pub size: i32,
    pub price: Decimal,
    pub solution_type: SolutionType,
    pub completion_time_days: i32,
    pub payment_schedule: PaymentSchedule,
    pub buyer_interaction_count: usize,
    pub buyer_whatsapp_numbers: Vec<WhatsAppNumber>,
    pub images: Vec<ImageView>,
    pub seller_note: Option<String>,
    pub display_name: String,
    pub city: Option<String>,
    pub is_approved: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApprovalState {
    pub admin_verified: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SolutionDetail {
    pub id: i64,
    pub size: i32,
    pub price: Decimal,
    pub solution_type: SolutionType,
    pub tags: Vec<Tag>,
    pub completion_time_days: i32,
    pub payment_schedule: PaymentSchedule,
    pub components: Vec<Component>,
    pub service: Option<Service>,
    pub images: Vec<ImageView>,
    pub approval: Option<ApprovalState>,
    pub seller_note: Option<String>,
    pub display_name: String,
    pub city: Option<String>,
}

/// Public URL of a stored media path
pub fn media_url(path: &str) -> String {
    format!("/media/{}", path.trim_start_matches('/'))
}

/// Which listings the caller may see
pub fn visibility(auth: &AuthContext) -> Visibility {
    if auth.sees_everything() {
        return Visibility::All;
    }

    match auth.profile_id {
        Some(profile_id) if auth.has_role(UserRole::Seller) => Visibility::OwnedBy(profile_id),
        _ => Visibility::ApprovedOnly,
    }
}

/// Whether a single listing is readable under `visibility`
pub fn is_visible(solution: &SolarSolution, visibility: Visibility) -> bool {
    match visibility {
        Visibility::All => true,
        Visibility::OwnedBy(owner) => solution.seller_id == Some(owner),
        Visibility::ApprovedOnly => solution.is_approved(),
    }
}

fn list_item(
    solution: SolarSolution,
    interactions: Vec<BuyerInteraction>,
    media: Vec<SolutionMedia>,
) -> SolutionListItem {
    let display_name = solution.display_name();
    let is_approved = solution.is_approved();

    SolutionListItem {
        id: solution.id,
        size: solution.size,
        price: solution.price,
        solution_type: solution.solution_type,
        completion_time_days: solution.completion_time_days,
        payment_schedule: solution.payment_schedule,
        buyer_interaction_count: interactions.len(),
        buyer_whatsapp_numbers: interactions
            .into_iter()
            .map(|i| WhatsAppNumber {
                whatsapp_number: i.whatsapp_number,
            })
            .collect(),
        images: media.into_iter().map(ImageView::from).collect(),
        seller_note: solution.seller_note,
        display_name,
        city: solution.city,
        is_approved,
    }
}

/// Renders list rows, loading interactions and media for the whole page at once
pub async fn list_items(
    db: &PgPool,
    solutions: Vec<SolarSolution>,
) -> Result<Vec<SolutionListItem>, sqlx::Error> {
    let ids: Vec<i64> = solutions.iter().map(|s| s.id).collect();

    let mut interactions: HashMap<i64, Vec<BuyerInteraction>> = HashMap::new();
    for interaction in BuyerInteraction::for_solutions(db, &ids).await? {
        interactions
            .entry(interaction.solar_solution_id)
            .or_default()
            .push(interaction);
    }

    let mut media: HashMap<i64, Vec<SolutionMedia>> = HashMap::new();
    for item in SolutionMedia::for_solutions(db, &ids, false).await? {
        media.entry(item.solution_id).or_default().push(item);
    }

    Ok(solutions
        .into_iter()
        .map(|s| {
            let id = s.id;
            list_item(
                s,
                interactions.remove(&id).unwrap_or_default(),
                media.remove(&id).unwrap_or_default(),
            )
        })
        .collect())
}

/// Renders the detail view with tags, components, service and display images
pub async fn solution_detail(db: &PgPool, solution: SolarSolution) -> Result<SolutionDetail, sqlx::Error> {
    let tags = Tag::for_solution(db, solution.id).await?;
    let components = Component::for_solution(db, solution.id).await?;
    let service = Service::find_by_solution(db, solution.id).await?;
    let images = SolutionMedia::for_solutions(db, &[solution.id], true)
        .await?
        .into_iter()
        .map(ImageView::from)
        .collect();

    let display_name = solution.display_name();

    Ok(SolutionDetail {
        id: solution.id,
        size: solution.size,
        price: solution.price,
        solution_type: solution.solution_type,
        tags,
        completion_time_days: solution.completion_time_days,
        payment_schedule: solution.payment_schedule,
        components,
        service,
        images,
        approval: solution
            .approval_verified
            .map(|admin_verified| ApprovalState { admin_verified }),
        seller_note: solution.seller_note,
        display_name,
        city: solution.city,
    })
}
