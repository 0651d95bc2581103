/// Listing approvals
///
/// Each solution gets an unverified approval when it is created. Admins
/// review the listing, note discrepancies, and finally verify it, which makes
/// it visible to buyers. A solution may accumulate several approvals; the
/// newest one decides.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE approvals (
///     id BIGSERIAL PRIMARY KEY,
///     solution_id BIGINT NOT NULL REFERENCES solar_solutions(id) ON DELETE CASCADE,
///     admin_verified BOOLEAN NOT NULL DEFAULT FALSE,
///     discrepancy TEXT,
///     discrepancy_resolved BOOLEAN NOT NULL DEFAULT FALSE,
///     email_notification_sent BOOLEAN NOT NULL DEFAULT FALSE,
///     created TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgExecutor, PgPool};

use super::solution::SolutionType;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Approval {
    pub id: i64,
    #[serde(rename = "solution")]
    pub solution_id: i64,
    pub admin_verified: bool,
    pub discrepancy: Option<String>,
    pub discrepancy_resolved: bool,
    pub email_notification_sent: bool,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateApproval {
    pub admin_verified: Option<bool>,
    /// `Some(None)` clears the discrepancy note
    pub discrepancy: Option<Option<String>>,
    pub discrepancy_resolved: Option<bool>,
    pub email_notification_sent: Option<bool>,
}

/// Who to notify about an approval and what about
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApprovalRecipient {
    pub email: String,
    pub full_name: String,
    pub solution_id: i64,
    pub size: i32,
    pub solution_type: SolutionType,
}

const APPROVAL_COLUMNS: &str = "id, solution_id, admin_verified, discrepancy, discrepancy_resolved, \
     email_notification_sent, created, updated";

impl Approval {
    /// Opens a fresh, unverified approval for a solution
    pub async fn create_for_solution(
        executor: impl PgExecutor<'_>,
        solution_id: i64,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO approvals (solution_id) VALUES ($1) RETURNING {}",
            APPROVAL_COLUMNS
        );

        sqlx::query_as::<_, Approval>(&query)
            .bind(solution_id)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM approvals WHERE id = $1", APPROVAL_COLUMNS);

        sqlx::query_as::<_, Approval>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM approvals ORDER BY created DESC, id DESC LIMIT $1 OFFSET $2",
            APPROVAL_COLUMNS
        );

        sqlx::query_as::<_, Approval>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM approvals")
            .fetch_one(pool)
            .await
    }

    /// Approvals still waiting for verification, oldest first
    pub async fn pending(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM approvals WHERE admin_verified = FALSE ORDER BY created, id",
            APPROVAL_COLUMNS
        );

        sqlx::query_as::<_, Approval>(&query).fetch_all(pool).await
    }

    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: UpdateApproval,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE approvals SET updated = NOW()");
        let mut bind_count = 1;

        if data.admin_verified.is_some() {
            bind_count += 1;
            query.push_str(&format!(", admin_verified = ${}", bind_count));
        }
        if data.discrepancy.is_some() {
            bind_count += 1;
            query.push_str(&format!(", discrepancy = ${}", bind_count));
        }
        if data.discrepancy_resolved.is_some() {
            bind_count += 1;
            query.push_str(&format!(", discrepancy_resolved = ${}", bind_count));
        }
        if data.email_notification_sent.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email_notification_sent = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", APPROVAL_COLUMNS));

        let mut q = sqlx::query_as::<_, Approval>(&query).bind(id);

        if let Some(verified) = data.admin_verified {
            q = q.bind(verified);
        }
        if let Some(discrepancy) = data.discrepancy {
            q = q.bind(discrepancy);
        }
        if let Some(resolved) = data.discrepancy_resolved {
            q = q.bind(resolved);
        }
        if let Some(sent) = data.email_notification_sent {
            q = q.bind(sent);
        }

        q.fetch_optional(pool).await
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM approvals WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Seller contact for the approval's solution
    ///
    /// None when the solution has no seller.
    pub async fn recipient(pool: &PgPool, id: i64) -> Result<Option<ApprovalRecipient>, sqlx::Error> {
        sqlx::query_as::<_, ApprovalRecipient>(
            r#"
            SELECT u.email, u.full_name, s.id AS solution_id, s.size, s.solution_type
            FROM approvals a
            JOIN solar_solutions s ON s.id = a.solution_id
            JOIN user_profiles p ON p.id = s.seller_id
            JOIN users u ON u.id = p.user_id
            WHERE a.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
