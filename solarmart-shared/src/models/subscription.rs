/// Subscription plans and seller passes
///
/// Admins define plans; a seller enrolls in a plan by holding a pass for it.
/// A seller holds at most one pass per plan.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::profile::UserRole;

/// Plan tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_package", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanName {
    Basic,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SubscriptionPlan {
    pub id: i64,
    pub name: PlanName,
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(skip)]
    pub is_active: bool,
}

const PLAN_COLUMNS: &str = "id, name, description, price, is_active";

impl SubscriptionPlan {
    /// Returns the plan named `name`, creating it if it does not exist
    ///
    /// An existing plan is returned unchanged; the supplied description and
    /// price only apply on creation.
    pub async fn get_or_create(
        pool: &PgPool,
        name: PlanName,
        description: Option<String>,
        price: Decimal,
    ) -> Result<(Self, bool), sqlx::Error> {
        let query = format!(
            "INSERT INTO subscription_plans (name, description, price) VALUES ($1, $2, $3) \
             ON CONFLICT (name) DO NOTHING RETURNING {}",
            PLAN_COLUMNS
        );

        let created = sqlx::query_as::<_, SubscriptionPlan>(&query)
            .bind(name)
            .bind(description)
            .bind(price)
            .fetch_optional(pool)
            .await?;

        if let Some(plan) = created {
            return Ok((plan, true));
        }

        let query = format!("SELECT {} FROM subscription_plans WHERE name = $1", PLAN_COLUMNS);
        let existing = sqlx::query_as::<_, SubscriptionPlan>(&query)
            .bind(name)
            .fetch_one(pool)
            .await?;

        Ok((existing, false))
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM subscription_plans WHERE id = $1", PLAN_COLUMNS);

        sqlx::query_as::<_, SubscriptionPlan>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_active(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM subscription_plans WHERE is_active ORDER BY id",
            PLAN_COLUMNS
        );

        sqlx::query_as::<_, SubscriptionPlan>(&query).fetch_all(pool).await
    }
}

/// A pass joined with its seller and plan
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubscriptionPass {
    pub id: i64,
    pub created: DateTime<Utc>,
    pub seller_id: i64,
    pub seller_role: UserRole,
    pub seller_user_id: i64,
    pub seller_full_name: String,
    pub seller_email: String,
    pub plan_id: i64,
    pub plan_name: PlanName,
    pub plan_price: Decimal,
}

const PASS_SELECT: &str = r#"
    SELECT sp.id, sp.created,
           p.id AS seller_id, p.role AS seller_role,
           u.id AS seller_user_id, u.full_name AS seller_full_name, u.email AS seller_email,
           pl.id AS plan_id, pl.name AS plan_name, pl.price AS plan_price
    FROM subscription_passes sp
    JOIN user_profiles p ON p.id = sp.seller_id
    JOIN users u ON u.id = p.user_id
    JOIN subscription_plans pl ON pl.id = sp.plan_id
"#;

impl SubscriptionPass {
    /// # Errors
    ///
    /// Unique violation on `subscription_passes_seller_plan_key` when the
    /// seller already holds the plan.
    pub async fn create(pool: &PgPool, seller_id: i64, plan_id: i64) -> Result<Self, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO subscription_passes (seller_id, plan_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(seller_id)
        .bind(plan_id)
        .fetch_one(pool)
        .await?;

        Self::find_by_id(pool, id, None)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Looks a pass up, restricted to one seller when `seller_id` is given
    pub async fn find_by_id(
        pool: &PgPool,
        id: i64,
        seller_id: Option<i64>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "{} WHERE sp.id = $1 AND ($2::BIGINT IS NULL OR sp.seller_id = $2)",
            PASS_SELECT
        );

        sqlx::query_as::<_, SubscriptionPass>(&query)
            .bind(id)
            .bind(seller_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool, seller_id: Option<i64>) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "{} WHERE ($1::BIGINT IS NULL OR sp.seller_id = $1) ORDER BY sp.created DESC, sp.id DESC",
            PASS_SELECT
        );

        sqlx::query_as::<_, SubscriptionPass>(&query)
            .bind(seller_id)
            .fetch_all(pool)
            .await
    }
}
