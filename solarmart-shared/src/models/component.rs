/// Solution components
///
/// A component is one line of a listing's bill of materials: panels,
/// inverter, batteries, or a category of installation work. Only the
/// attributes relevant to the component type are expected to be filled in.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE solution_components (
///     id BIGSERIAL PRIMARY KEY,
///     component_type component_type NOT NULL,
///     subtype VARCHAR(100),
///     brand VARCHAR(100),
///     capacity NUMERIC(10, 2),
///     quantity INTEGER NOT NULL DEFAULT 1,
///     warranty NUMERIC(4, 1) NOT NULL DEFAULT 1,
///     details TEXT,
///     ip_rating VARCHAR(10),
///     total_backup_capacity NUMERIC(8, 2),
///     mechanical_material mechanical_material,
///     mechanical_structure_type mechanical_structure_type,
///     civil_material civil_material,
///     wire_material wire_material,
///     ...
/// );
/// ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor, PgPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "component_type")]
pub enum ComponentType {
    #[sqlx(rename = "PV Module")]
    #[serde(rename = "PV Module")]
    PvModule,
    Inverter,
    Battery,
    #[sqlx(rename = "Electrical Work")]
    #[serde(rename = "Electrical Work")]
    ElectricalWork,
    #[sqlx(rename = "Mechanical Work")]
    #[serde(rename = "Mechanical Work")]
    MechanicalWork,
    #[sqlx(rename = "Civil Work")]
    #[serde(rename = "Civil Work")]
    CivilWork,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "wire_material")]
pub enum WireMaterial {
    Copper,
    Silver,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "mechanical_material")]
pub enum MechanicalMaterial {
    Iron,
    Aluminium,
    #[sqlx(rename = "GI")]
    #[serde(rename = "GI")]
    Gi,
    #[sqlx(rename = "PVC")]
    #[serde(rename = "PVC")]
    Pvc,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "mechanical_structure_type")]
pub enum MechanicalStructureType {
    L2,
    L3,
    Special,
    Sawtooth,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "civil_material")]
pub enum CivilMaterial {
    Concrete,
    Curbstone,
    Brick,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Component {
    pub id: i64,
    pub component_type: ComponentType,
    pub subtype: Option<String>,
    pub brand: Option<String>,
    pub capacity: Option<Decimal>,
    pub quantity: i32,
    pub warranty: Decimal,
    pub details: Option<String>,
    pub ip_rating: Option<String>,
    pub total_backup_capacity: Option<Decimal>,
    pub mechanical_material: Option<MechanicalMaterial>,
    pub mechanical_structure_type: Option<MechanicalStructureType>,
    pub civil_material: Option<CivilMaterial>,
    pub wire_material: Option<WireMaterial>,
}

fn default_quantity() -> i32 {
    1
}

fn default_warranty() -> Decimal {
    Decimal::ONE
}

/// Component fields accepted on create
#[derive(Debug, Clone, Deserialize)]
pub struct CreateComponent {
    pub component_type: ComponentType,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub capacity: Option<Decimal>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default = "default_warranty")]
    pub warranty: Decimal,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub ip_rating: Option<String>,
    #[serde(default)]
    pub total_backup_capacity: Option<Decimal>,
    #[serde(default)]
    pub mechanical_material: Option<MechanicalMaterial>,
    #[serde(default)]
    pub mechanical_structure_type: Option<MechanicalStructureType>,
    #[serde(default)]
    pub civil_material: Option<CivilMaterial>,
    #[serde(default)]
    pub wire_material: Option<WireMaterial>,
}

impl CreateComponent {
    /// Field-level problems that the column constraints would otherwise
    /// report as opaque database errors
    pub fn problems(&self) -> Vec<(&'static str, String)> {
        let mut problems = Vec::new();

        if self.quantity < 0 {
            problems.push(("quantity", "Ensure this value is greater than or equal to 0.".to_string()));
        }
        if self.subtype.as_deref().map_or(false, |s| s.chars().count() > 100) {
            problems.push(("subtype", "Ensure this field has no more than 100 characters.".to_string()));
        }
        if self.brand.as_deref().map_or(false, |s| s.chars().count() > 100) {
            problems.push(("brand", "Ensure this field has no more than 100 characters.".to_string()));
        }
        if self.ip_rating.as_deref().map_or(false, |s| s.chars().count() > 10) {
            problems.push(("ip_rating", "Ensure this field has no more than 10 characters.".to_string()));
        }
        if self.warranty.abs() >= Decimal::from(1000) {
            problems.push(("warranty", "Ensure that there are no more than 4 digits in total.".to_string()));
        }

        problems
    }
}

const COMPONENT_COLUMNS: &str = "id, component_type, subtype, brand, capacity, quantity, warranty, \
     details, ip_rating, total_backup_capacity, mechanical_material, mechanical_structure_type, \
     civil_material, wire_material";

impl Component {
    pub async fn create(executor: impl PgExecutor<'_>, data: CreateComponent) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO solution_components (component_type, subtype, brand, capacity, quantity, warranty, \
             details, ip_rating, total_backup_capacity, mechanical_material, mechanical_structure_type, \
             civil_material, wire_material) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) RETURNING {}",
            COMPONENT_COLUMNS
        );

        sqlx::query_as::<_, Component>(&query)
            .bind(data.component_type)
            .bind(data.subtype)
            .bind(data.brand)
            .bind(data.capacity)
            .bind(data.quantity)
            .bind(data.warranty)
            .bind(data.details)
            .bind(data.ip_rating)
            .bind(data.total_backup_capacity)
            .bind(data.mechanical_material)
            .bind(data.mechanical_structure_type)
            .bind(data.civil_material)
            .bind(data.wire_material)
            .fetch_one(executor)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM solution_components ORDER BY id", COMPONENT_COLUMNS);

        sqlx::query_as::<_, Component>(&query).fetch_all(pool).await
    }

    /// Returns the ids from `ids` that have no component row, in input order
    pub async fn missing_ids(executor: impl PgExecutor<'_>, ids: &[i64]) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT requested.id
            FROM UNNEST($1::BIGINT[]) WITH ORDINALITY AS requested(id, ord)
            LEFT JOIN solution_components c ON c.id = requested.id
            WHERE c.id IS NULL
            ORDER BY requested.ord
            "#,
        )
        .bind(ids)
        .fetch_all(executor)
        .await
    }

    pub async fn for_solution(executor: impl PgExecutor<'_>, solution_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let columns = COMPONENT_COLUMNS
            .split(", ")
            .map(|c| format!("c.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!(
            "SELECT {} FROM solution_components c \
             JOIN solar_solution_components sc ON sc.component_id = c.id \
             WHERE sc.solar_solution_id = $1 ORDER BY c.id",
            columns
        );

        sqlx::query_as::<_, Component>(&query)
            .bind(solution_id)
            .fetch_all(executor)
            .await
    }

    /// Replaces the solution's component set with `component_ids`
    pub async fn set_for_solution(
        conn: &mut PgConnection,
        solution_id: i64,
        component_ids: &[i64],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM solar_solution_components WHERE solar_solution_id = $1")
            .bind(solution_id)
            .execute(&mut *conn)
            .await?;

        Self::link(conn, solution_id, component_ids).await
    }

    pub async fn link(
        conn: &mut PgConnection,
        solution_id: i64,
        component_ids: &[i64],
    ) -> Result<(), sqlx::Error> {
        if component_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO solar_solution_components (solar_solution_id, component_id)
            SELECT $1, UNNEST($2::BIGINT[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(solution_id)
        .bind(component_ids)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_type_labels() {
        assert_eq!(serde_json::to_string(&ComponentType::PvModule).unwrap(), "\"PV Module\"");
        assert_eq!(
            serde_json::from_str::<ComponentType>("\"Civil Work\"").unwrap(),
            ComponentType::CivilWork
        );
        assert_eq!(serde_json::to_string(&MechanicalMaterial::Gi).unwrap(), "\"GI\"");
        assert!(serde_json::from_str::<ComponentType>("\"Wind Turbine\"").is_err());
    }

    #[test]
    fn test_create_component_defaults() {
        let data: CreateComponent =
            serde_json::from_str(r#"{"component_type": "Inverter", "brand": "Huawei"}"#).unwrap();

        assert_eq!(data.quantity, 1);
        assert_eq!(data.warranty, Decimal::ONE);
        assert!(data.capacity.is_none());
        assert!(data.problems().is_empty());
    }

    #[test]
    fn test_create_component_problems() {
        let data: CreateComponent = serde_json::from_str(
            r#"{"component_type": "Battery", "quantity": -2, "ip_rating": "IP65-EXTENDED"}"#,
        )
        .unwrap();

        let fields: Vec<&str> = data.problems().iter().map(|(f, _)| *f).collect();
        assert_eq!(fields, vec!["quantity", "ip_rating"]);
    }
}
