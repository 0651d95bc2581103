/// Installation services bundled with a solution
///
/// Each solution has at most one service row describing what the seller
/// includes beyond the hardware.

use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Service {
    pub id: i64,
    #[serde(skip)]
    pub solution_id: i64,
    pub dc_earthing_included: bool,
    pub afss_included: bool,
    pub afss_warranty_years: Option<i32>,
    pub online_monitoring_included: bool,
    pub net_metering_included: bool,
    pub hse_equipment_included: bool,
    pub transportation_included: bool,
    pub transportation_distance: Option<i32>,
}

fn default_true() -> bool {
    true
}

/// Service fields as submitted; omitted flags take the column defaults
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceData {
    #[serde(default)]
    pub dc_earthing_included: bool,
    #[serde(default)]
    pub afss_included: bool,
    #[serde(default)]
    pub afss_warranty_years: Option<i32>,
    #[serde(default)]
    pub online_monitoring_included: bool,
    #[serde(default)]
    pub net_metering_included: bool,
    #[serde(default)]
    pub hse_equipment_included: bool,
    #[serde(default = "default_true")]
    pub transportation_included: bool,
    #[serde(default)]
    pub transportation_distance: Option<i32>,
}

impl Default for ServiceData {
    fn default() -> Self {
        Self {
            dc_earthing_included: false,
            afss_included: false,
            afss_warranty_years: None,
            online_monitoring_included: false,
            net_metering_included: false,
            hse_equipment_included: false,
            transportation_included: true,
            transportation_distance: None,
        }
    }
}

impl ServiceData {
    pub fn problems(&self) -> Vec<(&'static str, String)> {
        let mut problems = Vec::new();
        let non_negative = "Ensure this value is greater than or equal to 0.".to_string();

        if self.afss_warranty_years.map_or(false, |y| y < 0) {
            problems.push(("afss_warranty_years", non_negative.clone()));
        }
        if self.transportation_distance.map_or(false, |d| d < 0) {
            problems.push(("transportation_distance", non_negative));
        }

        problems
    }
}

const SERVICE_COLUMNS: &str = "id, solution_id, dc_earthing_included, afss_included, afss_warranty_years, \
     online_monitoring_included, net_metering_included, hse_equipment_included, \
     transportation_included, transportation_distance";

impl Service {
    /// Creates the solution's service or overwrites the existing one
    pub async fn upsert_for_solution(
        executor: impl PgExecutor<'_>,
        solution_id: i64,
        data: ServiceData,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO services (solution_id, dc_earthing_included, afss_included, afss_warranty_years,
                online_monitoring_included, net_metering_included, hse_equipment_included,
                transportation_included, transportation_distance)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (solution_id) DO UPDATE
            SET dc_earthing_included = EXCLUDED.dc_earthing_included,
                afss_included = EXCLUDED.afss_included,
                afss_warranty_years = EXCLUDED.afss_warranty_years,
                online_monitoring_included = EXCLUDED.online_monitoring_included,
                net_metering_included = EXCLUDED.net_metering_included,
                hse_equipment_included = EXCLUDED.hse_equipment_included,
                transportation_included = EXCLUDED.transportation_included,
                transportation_distance = EXCLUDED.transportation_distance,
                updated = NOW()
            RETURNING {}
            "#,
            SERVICE_COLUMNS
        );

        sqlx::query_as::<_, Service>(&query)
            .bind(solution_id)
            .bind(data.dc_earthing_included)
            .bind(data.afss_included)
            .bind(data.afss_warranty_years)
            .bind(data.online_monitoring_included)
            .bind(data.net_metering_included)
            .bind(data.hse_equipment_included)
            .bind(data.transportation_included)
            .bind(data.transportation_distance)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_solution(
        executor: impl PgExecutor<'_>,
        solution_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM services WHERE solution_id = $1", SERVICE_COLUMNS);

        sqlx::query_as::<_, Service>(&query)
            .bind(solution_id)
            .fetch_optional(executor)
            .await
    }
}
