/// Free-form listing tags
///
/// Tags are shared across sellers and created on demand when a listing
/// names one that does not exist yet.

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor, PgPool};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

impl Tag {
    /// # Errors
    ///
    /// Unique violation on `tags_name_key` for a duplicate name.
    pub async fn create(executor: impl PgExecutor<'_>, name: &str) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Tag>("INSERT INTO tags (name) VALUES ($1) RETURNING id, name")
            .bind(name.trim())
            .fetch_one(executor)
            .await
    }

    /// Returns the tag with `name`, creating it if needed
    pub async fn get_or_create(conn: &mut PgConnection, name: &str) -> Result<Self, sqlx::Error> {
        let name = name.trim();

        // The no-op update makes RETURNING yield the existing row on conflict
        sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name
            "#,
        )
        .bind(name)
        .fetch_one(&mut *conn)
        .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Tag>("SELECT id, name FROM tags ORDER BY name")
            .fetch_all(pool)
            .await
    }

    /// Returns the ids from `ids` that have no tag row, in input order
    pub async fn missing_ids(executor: impl PgExecutor<'_>, ids: &[i64]) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT requested.id
            FROM UNNEST($1::BIGINT[]) WITH ORDINALITY AS requested(id, ord)
            LEFT JOIN tags t ON t.id = requested.id
            WHERE t.id IS NULL
            ORDER BY requested.ord
            "#,
        )
        .bind(ids)
        .fetch_all(executor)
        .await
    }

    pub async fn for_solution(executor: impl PgExecutor<'_>, solution_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.name
            FROM tags t
            JOIN solar_solution_tags st ON st.tag_id = t.id
            WHERE st.solar_solution_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(solution_id)
        .fetch_all(executor)
        .await
    }

    /// Replaces the solution's tag set with `tag_ids`
    pub async fn set_for_solution(
        conn: &mut PgConnection,
        solution_id: i64,
        tag_ids: &[i64],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM solar_solution_tags WHERE solar_solution_id = $1")
            .bind(solution_id)
            .execute(&mut *conn)
            .await?;

        Self::link(conn, solution_id, tag_ids).await
    }

    /// Adds tags to a solution, ignoring links that already exist
    pub async fn link(conn: &mut PgConnection, solution_id: i64, tag_ids: &[i64]) -> Result<(), sqlx::Error> {
        if tag_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO solar_solution_tags (solar_solution_id, tag_id)
            SELECT $1, UNNEST($2::BIGINT[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(solution_id)
        .bind(tag_ids)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
