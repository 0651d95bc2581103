/// Solar solutions (listings)
///
/// A solar solution is a seller's packaged offer: system size, price,
/// solution type, payment terms, and the components, tags, service and media
/// attached to it. Buyers only see a solution once its newest approval is
/// verified.
///
/// Every read goes through one joined query that also resolves the seller's
/// company city, the seller's name, and the newest approval state, so list
/// and detail views never disagree about those derived fields.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE solar_solutions (
///     id BIGSERIAL PRIMARY KEY,
///     size INTEGER NOT NULL CHECK (size >= 0),
///     price NUMERIC(10, 2) NOT NULL,
///     solution_type solution_type NOT NULL,
///     completion_time_days INTEGER NOT NULL DEFAULT 15,
///     payment_schedule payment_schedule NOT NULL DEFAULT 'Flexible',
///     seller_id BIGINT REFERENCES user_profiles(id) ON DELETE CASCADE,
///     seller_note VARCHAR(1000),
///     created TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use solarmart_shared::models::solution::{SolarSolution, SolutionFilter, Visibility};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let filter = SolutionFilter { city: Some("Lahore".to_string()), ..Default::default() };
/// let page = SolarSolution::list(&pool, Visibility::ApprovedOnly, &filter, 10, 0).await?;
/// for solution in page {
///     println!("{} ({:?})", solution.display_name(), solution.city);
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor, PgPool};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "solution_type")]
pub enum SolutionType {
    #[sqlx(rename = "On-Grid")]
    #[serde(rename = "On-Grid")]
    OnGrid,
    Hybrid,
    #[sqlx(rename = "Off-Grid")]
    #[serde(rename = "Off-Grid")]
    OffGrid,
}

impl SolutionType {
    pub fn label(&self) -> &'static str {
        match self {
            SolutionType::OnGrid => "On-Grid",
            SolutionType::Hybrid => "Hybrid",
            SolutionType::OffGrid => "Off-Grid",
        }
    }
}

impl fmt::Display for SolutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_schedule")]
pub enum PaymentSchedule {
    #[sqlx(rename = "100% Advance")]
    #[serde(rename = "100% Advance")]
    FullAdvance,
    #[default]
    Flexible,
}

/// Solution row with its derived seller and approval fields
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SolarSolution {
    pub id: i64,

    /// System size in kW
    pub size: i32,

    pub price: Decimal,
    pub solution_type: SolutionType,
    pub completion_time_days: i32,
    pub payment_schedule: PaymentSchedule,
    pub seller_id: Option<i64>,
    pub seller_note: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,

    /// City of the seller's company, only for seller-role owners
    pub city: Option<String>,

    /// Full name of the owning user
    pub seller_name: Option<String>,

    /// `admin_verified` of the newest approval, None when never submitted
    pub approval_verified: Option<bool>,
}

impl SolarSolution {
    /// Human-readable title, e.g. `"10 kW Hybrid Solar Solution"`
    pub fn display_name(&self) -> String {
        display_name(self.size, self.solution_type)
    }

    pub fn is_approved(&self) -> bool {
        self.approval_verified.unwrap_or(false)
    }
}

pub fn display_name(size: i32, solution_type: SolutionType) -> String {
    format!("{} kW {} Solar Solution", size, solution_type)
}

/// Which solutions the caller may see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Staff and admins
    All,
    /// A seller sees only their own listings
    OwnedBy(i64),
    /// Buyers see approved listings only
    ApprovedOnly,
}

/// Query-string filters for the listing search
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SolutionFilter {
    pub city: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_size: Option<i32>,
    pub max_size: Option<i32>,
    pub solution_type: Option<SolutionType>,
}

#[derive(Debug, Clone)]
pub struct NewSolution {
    pub size: i32,
    pub price: Decimal,
    pub solution_type: SolutionType,
    pub completion_time_days: i32,
    pub payment_schedule: PaymentSchedule,
    pub seller_id: Option<i64>,
    pub seller_note: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSolution {
    pub size: Option<i32>,
    pub price: Option<Decimal>,
    pub solution_type: Option<SolutionType>,
    pub completion_time_days: Option<i32>,
    pub payment_schedule: Option<PaymentSchedule>,
    /// `Some(None)` clears the note
    pub seller_note: Option<Option<String>>,
}

const SOLUTION_SELECT: &str = r#"
    SELECT s.id, s.size, s.price, s.solution_type, s.completion_time_days,
           s.payment_schedule, s.seller_id, s.seller_note, s.created, s.updated,
           c.city AS city,
           u.full_name AS seller_name,
           la.admin_verified AS approval_verified
    FROM solar_solutions s
    LEFT JOIN user_profiles p ON p.id = s.seller_id
    LEFT JOIN users u ON u.id = p.user_id
    LEFT JOIN companies c ON c.owner_id = p.id AND p.role = 'seller'
    LEFT JOIN LATERAL (
        SELECT a.admin_verified
        FROM approvals a
        WHERE a.solution_id = s.id
        ORDER BY a.created DESC, a.id DESC
        LIMIT 1
    ) la ON TRUE
"#;

// $1 owner, $2 approved-only, $3..$8 filters
const SOLUTION_FILTER: &str = r#"
    WHERE ($1::BIGINT IS NULL OR s.seller_id = $1)
      AND (NOT $2::BOOLEAN OR COALESCE(la.admin_verified, FALSE))
      AND ($3::TEXT IS NULL OR LOWER(c.city) = LOWER($3))
      AND ($4::NUMERIC IS NULL OR s.price >= $4)
      AND ($5::NUMERIC IS NULL OR s.price <= $5)
      AND ($6::INTEGER IS NULL OR s.size >= $6)
      AND ($7::INTEGER IS NULL OR s.size <= $7)
      AND ($8::solution_type IS NULL OR s.solution_type = $8)
"#;

impl Visibility {
    fn owner(&self) -> Option<i64> {
        match self {
            Visibility::OwnedBy(id) => Some(*id),
            _ => None,
        }
    }

    fn approved_only(&self) -> bool {
        matches!(self, Visibility::ApprovedOnly)
    }
}

impl SolarSolution {
    /// Inserts the bare solution row and returns its id
    pub async fn create(executor: impl PgExecutor<'_>, data: NewSolution) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            INSERT INTO solar_solutions
                (size, price, solution_type, completion_time_days, payment_schedule, seller_id, seller_note)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(data.size)
        .bind(data.price)
        .bind(data.solution_type)
        .bind(data.completion_time_days)
        .bind(data.payment_schedule)
        .bind(data.seller_id)
        .bind(data.seller_note)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id(executor: impl PgExecutor<'_>, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("{} WHERE s.id = $1", SOLUTION_SELECT);

        sqlx::query_as::<_, SolarSolution>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Pages through visible solutions, newest first
    pub async fn list(
        pool: &PgPool,
        visibility: Visibility,
        filter: &SolutionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "{} {} ORDER BY s.created DESC, s.id DESC LIMIT $9 OFFSET $10",
            SOLUTION_SELECT, SOLUTION_FILTER
        );

        sqlx::query_as::<_, SolarSolution>(&query)
            .bind(visibility.owner())
            .bind(visibility.approved_only())
            .bind(filter.city.as_deref().map(str::trim).filter(|c| !c.is_empty()))
            .bind(filter.min_price)
            .bind(filter.max_price)
            .bind(filter.min_size)
            .bind(filter.max_size)
            .bind(filter.solution_type)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(
        pool: &PgPool,
        visibility: Visibility,
        filter: &SolutionFilter,
    ) -> Result<i64, sqlx::Error> {
        let query = format!(
            r#"
            SELECT COUNT(*)
            FROM solar_solutions s
            LEFT JOIN user_profiles p ON p.id = s.seller_id
            LEFT JOIN companies c ON c.owner_id = p.id AND p.role = 'seller'
            LEFT JOIN LATERAL (
                SELECT a.admin_verified FROM approvals a
                WHERE a.solution_id = s.id
                ORDER BY a.created DESC, a.id DESC
                LIMIT 1
            ) la ON TRUE
            {}
            "#,
            SOLUTION_FILTER
        );

        sqlx::query_scalar(&query)
            .bind(visibility.owner())
            .bind(visibility.approved_only())
            .bind(filter.city.as_deref().map(str::trim).filter(|c| !c.is_empty()))
            .bind(filter.min_price)
            .bind(filter.max_price)
            .bind(filter.min_size)
            .bind(filter.max_size)
            .bind(filter.solution_type)
            .fetch_one(pool)
            .await
    }

    /// Every solution that has a seller, grouped by seller for the admin report
    pub async fn list_by_seller(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "{} WHERE s.seller_id IS NOT NULL ORDER BY s.seller_id, s.id",
            SOLUTION_SELECT
        );

        sqlx::query_as::<_, SolarSolution>(&query).fetch_all(pool).await
    }

    /// Applies the supplied fields; returns false when the row is gone
    pub async fn update(
        conn: &mut PgConnection,
        id: i64,
        data: UpdateSolution,
    ) -> Result<bool, sqlx::Error> {
        let mut query = String::from("UPDATE solar_solutions SET updated = NOW()");
        let mut bind_count = 1;

        if data.size.is_some() {
            bind_count += 1;
            query.push_str(&format!(", size = ${}", bind_count));
        }
        if data.price.is_some() {
            bind_count += 1;
            query.push_str(&format!(", price = ${}", bind_count));
        }
        if data.solution_type.is_some() {
            bind_count += 1;
            query.push_str(&format!(", solution_type = ${}", bind_count));
        }
        if data.completion_time_days.is_some() {
            bind_count += 1;
            query.push_str(&format!(", completion_time_days = ${}", bind_count));
        }
        if data.payment_schedule.is_some() {
            bind_count += 1;
            query.push_str(&format!(", payment_schedule = ${}", bind_count));
        }
        if data.seller_note.is_some() {
            bind_count += 1;
            query.push_str(&format!(", seller_note = ${}", bind_count));
        }

        query.push_str(" WHERE id = $1");

        let mut q = sqlx::query(&query).bind(id);

        if let Some(size) = data.size {
            q = q.bind(size);
        }
        if let Some(price) = data.price {
            q = q.bind(price);
        }
        if let Some(solution_type) = data.solution_type {
            q = q.bind(solution_type);
        }
        if let Some(days) = data.completion_time_days {
            q = q.bind(days);
        }
        if let Some(schedule) = data.payment_schedule {
            q = q.bind(schedule);
        }
        if let Some(note) = data.seller_note {
            q = q.bind(note);
        }

        let result = q.execute(&mut *conn).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM solar_solutions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn exists(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM solar_solutions WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }
}
