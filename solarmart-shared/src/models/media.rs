/// Images attached to a solution
///
/// `image` holds the path relative to the media root, e.g.
/// `solution_images/5f0c...e1.jpg`.

use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SolutionMedia {
    pub id: i64,
    #[serde(skip)]
    pub solution_id: i64,
    pub image: Option<String>,
    pub is_display_image: bool,
}

impl SolutionMedia {
    pub async fn create(
        pool: &PgPool,
        solution_id: i64,
        image: &str,
        is_display_image: bool,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, SolutionMedia>(
            r#"
            INSERT INTO solution_media (solution_id, image, is_display_image)
            VALUES ($1, $2, $3)
            RETURNING id, solution_id, image, is_display_image
            "#,
        )
        .bind(solution_id)
        .bind(image)
        .bind(is_display_image)
        .fetch_one(pool)
        .await
    }

    pub async fn find(pool: &PgPool, solution_id: i64, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SolutionMedia>(
            "SELECT id, solution_id, image, is_display_image FROM solution_media WHERE id = $1 AND solution_id = $2",
        )
        .bind(id)
        .bind(solution_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM solution_media WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All media for the given solutions, optionally display images only
    pub async fn for_solutions(
        pool: &PgPool,
        solution_ids: &[i64],
        display_only: bool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SolutionMedia>(
            r#"
            SELECT id, solution_id, image, is_display_image
            FROM solution_media
            WHERE solution_id = ANY($1) AND (NOT $2 OR is_display_image)
            ORDER BY solution_id, id
            "#,
        )
        .bind(solution_ids)
        .bind(display_only)
        .fetch_all(pool)
        .await
    }
}
