/// Seller companies
///
/// A seller profile owns at most one company. The company's city is what
/// buyers filter listings by.

use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Company {
    pub id: i64,
    #[serde(skip)]
    pub owner_id: i64,
    pub name: String,
    pub phone_number: String,
    pub description: String,
    pub city: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompanyData {
    pub name: String,
    pub phone_number: String,
    pub description: String,
    pub city: String,
}

/// Row for the company-name picker
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CompanyName {
    pub id: i64,
    pub name: String,
}

impl Company {
    /// Creates or replaces the company owned by `owner_id`
    ///
    /// # Errors
    ///
    /// Unique violation on `companies_name_key` if another owner already uses
    /// the name.
    pub async fn upsert_for_owner(
        executor: impl PgExecutor<'_>,
        owner_id: i64,
        data: CompanyData,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (owner_id, name, phone_number, description, city)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (owner_id) DO UPDATE
            SET name = EXCLUDED.name,
                phone_number = EXCLUDED.phone_number,
                description = EXCLUDED.description,
                city = EXCLUDED.city,
                updated = NOW()
            RETURNING id, owner_id, name, phone_number, description, city
            "#,
        )
        .bind(owner_id)
        .bind(data.name.trim())
        .bind(data.phone_number)
        .bind(data.description)
        .bind(data.city.trim())
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_owner(
        executor: impl PgExecutor<'_>,
        owner_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Company>(
            "SELECT id, owner_id, name, phone_number, description, city FROM companies WHERE owner_id = $1",
        )
        .bind(owner_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn list_names(pool: &PgPool) -> Result<Vec<CompanyName>, sqlx::Error> {
        sqlx::query_as::<_, CompanyName>("SELECT id, name FROM companies ORDER BY name, id")
            .fetch_all(pool)
            .await
    }
}
