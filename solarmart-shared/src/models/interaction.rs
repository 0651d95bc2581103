/// Buyer interest in a solution
///
/// Recorded after a buyer verifies their WhatsApp number with an OTP, so
/// sellers can follow up.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BuyerInteraction {
    pub id: i64,
    pub solar_solution_id: i64,
    pub whatsapp_number: String,
    pub created: DateTime<Utc>,
}

impl BuyerInteraction {
    pub async fn create(
        pool: &PgPool,
        solar_solution_id: i64,
        whatsapp_number: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, BuyerInteraction>(
            r#"
            INSERT INTO buyer_interactions (solar_solution_id, whatsapp_number)
            VALUES ($1, $2)
            RETURNING id, solar_solution_id, whatsapp_number, created
            "#,
        )
        .bind(solar_solution_id)
        .bind(whatsapp_number)
        .fetch_one(pool)
        .await
    }

    pub async fn for_solutions(pool: &PgPool, solution_ids: &[i64]) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, BuyerInteraction>(
            r#"
            SELECT id, solar_solution_id, whatsapp_number, created
            FROM buyer_interactions
            WHERE solar_solution_id = ANY($1)
            ORDER BY solar_solution_id, id
            "#,
        )
        .bind(solution_ids)
        .fetch_all(pool)
        .await
    }
}
