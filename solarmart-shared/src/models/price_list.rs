/// Seller price lists
///
/// Each seller keeps one catalog price per kind of hardware or work. All
/// kinds share the `price_list_items` table; which optional attributes a
/// kind uses (brand, capacity, system type, structure type) is decided by
/// [`PriceListKind::rules`].
///
/// # Example
///
/// ```
/// use solarmart_shared::models::price_list::{PriceListData, PriceListKind, PriceUnit};
///
/// let kind = PriceListKind::from_path("inverter").unwrap();
/// let data = PriceListData {
///     brand_name: Some("Growatt".to_string()),
///     specification: Some("6kW hybrid".to_string()),
///     capacity: Some(6),
///     system_type: Some("hybrid".to_string()),
///     unit: Some(PriceUnit::Kw),
///     price: Some(185000),
///     ..Default::default()
/// };
/// assert!(data.problems(kind).is_empty());
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "price_list_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PriceListKind {
    Panel,
    MechanicalWork,
    AfterSalesService,
    Bms,
    CivilWork,
    DcEarthing,
    ElectricWork,
    HseEquipment,
    Inverter,
    Battery,
    NetMetering,
    OnlineMonitoring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "price_unit", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PriceUnit {
    Watt,
    Kw,
}

pub const INVERTER_SYSTEM_TYPES: &[&str] = &["on_grid", "hybrid", "vfd"];
pub const BATTERY_TYPES: &[&str] = &["tubular", "lithium"];
pub const STRUCTURE_TYPES: &[&str] = &["iron_standard", "aluminum_standard", "ms_iron_standard"];

/// Which optional attributes a kind requires
///
/// Attributes a kind does not use must be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindRules {
    pub brand_name: bool,
    pub capacity: bool,
    /// Allowed `system_type` values, None when the kind has no system type
    pub system_types: Option<&'static [&'static str]>,
    /// Allowed `structure_type` values, None when unused
    pub structure_types: Option<&'static [&'static str]>,
}

impl PriceListKind {
    pub const ALL: [PriceListKind; 12] = [
        PriceListKind::Panel,
        PriceListKind::MechanicalWork,
        PriceListKind::AfterSalesService,
        PriceListKind::Bms,
        PriceListKind::CivilWork,
        PriceListKind::DcEarthing,
        PriceListKind::ElectricWork,
        PriceListKind::HseEquipment,
        PriceListKind::Inverter,
        PriceListKind::Battery,
        PriceListKind::NetMetering,
        PriceListKind::OnlineMonitoring,
    ];

    /// URL segment for the kind, e.g. `after-sales-service`
    pub fn as_path(&self) -> &'static str {
        match self {
            PriceListKind::Panel => "panel",
            PriceListKind::MechanicalWork => "mechanical-work",
            PriceListKind::AfterSalesService => "after-sales-service",
            PriceListKind::Bms => "bms",
            PriceListKind::CivilWork => "civil-work",
            PriceListKind::DcEarthing => "dc-earthing",
            PriceListKind::ElectricWork => "electric-work",
            PriceListKind::HseEquipment => "hse-equipment",
            PriceListKind::Inverter => "inverter",
            PriceListKind::Battery => "battery",
            PriceListKind::NetMetering => "net-metering",
            PriceListKind::OnlineMonitoring => "online-monitoring",
        }
    }

    pub fn from_path(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_path() == segment)
    }

    pub fn rules(&self) -> KindRules {
        let capacity_only = KindRules {
            brand_name: false,
            capacity: true,
            system_types: None,
            structure_types: None,
        };

        match self {
            PriceListKind::Panel => KindRules {
                brand_name: true,
                ..capacity_only
            },
            PriceListKind::MechanicalWork => KindRules {
                capacity: false,
                structure_types: Some(STRUCTURE_TYPES),
                ..capacity_only
            },
            PriceListKind::ElectricWork => KindRules {
                capacity: false,
                system_types: Some(INVERTER_SYSTEM_TYPES),
                ..capacity_only
            },
            PriceListKind::Inverter => KindRules {
                brand_name: true,
                system_types: Some(INVERTER_SYSTEM_TYPES),
                ..capacity_only
            },
            PriceListKind::Battery => KindRules {
                brand_name: true,
                system_types: Some(BATTERY_TYPES),
                ..capacity_only
            },
            PriceListKind::AfterSalesService
            | PriceListKind::Bms
            | PriceListKind::CivilWork
            | PriceListKind::DcEarthing
            | PriceListKind::HseEquipment
            | PriceListKind::NetMetering
            | PriceListKind::OnlineMonitoring => capacity_only,
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PriceListItem {
    pub id: i64,
    #[serde(skip)]
    pub seller_id: i64,
    #[serde(skip)]
    pub kind: PriceListKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
    pub specification: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure_type: Option<String>,
    pub unit: PriceUnit,
    pub price: i32,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Submitted item attributes
///
/// Everything is optional so the same type serves create, replace and
/// partial update; [`problems`](Self::problems) enforces what each kind needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceListData {
    pub brand_name: Option<String>,
    pub specification: Option<String>,
    pub capacity: Option<i32>,
    pub system_type: Option<String>,
    pub structure_type: Option<String>,
    pub unit: Option<PriceUnit>,
    pub price: Option<i32>,
}

const REQUIRED: &str = "This field is required.";
const NOT_ALLOWED: &str = "This field is not allowed for this price list.";

fn check_choice(
    problems: &mut Vec<(&'static str, String)>,
    field: &'static str,
    value: Option<&str>,
    allowed: Option<&'static [&'static str]>,
) {
    match (value, allowed) {
        (None, Some(_)) => problems.push((field, REQUIRED.to_string())),
        (Some(_), None) => problems.push((field, NOT_ALLOWED.to_string())),
        (Some(v), Some(choices)) if !choices.contains(&v) => {
            problems.push((field, format!("\"{}\" is not a valid choice.", v)))
        }
        _ => {}
    }
}

impl PriceListData {
    /// Overlays the supplied fields onto an existing item
    pub fn merged_onto(self, item: &PriceListItem) -> Self {
        Self {
            brand_name: self.brand_name.or_else(|| item.brand_name.clone()),
            specification: self.specification.or_else(|| Some(item.specification.clone())),
            capacity: self.capacity.or(item.capacity),
            system_type: self.system_type.or_else(|| item.system_type.clone()),
            structure_type: self.structure_type.or_else(|| item.structure_type.clone()),
            unit: self.unit.or(Some(item.unit)),
            price: self.price.or(Some(item.price)),
        }
    }

    /// Field-level problems for storing this data as a `kind` item
    pub fn problems(&self, kind: PriceListKind) -> Vec<(&'static str, String)> {
        let rules = kind.rules();
        let mut problems = Vec::new();

        match (&self.brand_name, rules.brand_name) {
            (None, true) => problems.push(("brand_name", REQUIRED.to_string())),
            (Some(_), false) => problems.push(("brand_name", NOT_ALLOWED.to_string())),
            (Some(name), true) if name.trim().is_empty() || name.chars().count() > 200 => {
                problems.push(("brand_name", "Ensure this field has 1 to 200 characters.".to_string()))
            }
            _ => {}
        }

        match &self.specification {
            None => problems.push(("specification", REQUIRED.to_string())),
            Some(spec) if spec.trim().is_empty() || spec.chars().count() > 200 => problems.push((
                "specification",
                "Ensure this field has 1 to 200 characters.".to_string(),
            )),
            _ => {}
        }

        match (self.capacity, rules.capacity) {
            (None, true) => problems.push(("capacity", REQUIRED.to_string())),
            (Some(_), false) => problems.push(("capacity", NOT_ALLOWED.to_string())),
            _ => {}
        }

        check_choice(&mut problems, "system_type", self.system_type.as_deref(), rules.system_types);
        check_choice(
            &mut problems,
            "structure_type",
            self.structure_type.as_deref(),
            rules.structure_types,
        );

        if self.unit.is_none() {
            problems.push(("unit", REQUIRED.to_string()));
        }
        if self.price.is_none() {
            problems.push(("price", REQUIRED.to_string()));
        }

        problems
    }
}

const ITEM_COLUMNS: &str = "id, seller_id, kind, brand_name, specification, capacity, system_type, \
     structure_type, unit, price, created, updated";

impl PriceListItem {
    /// Inserts an item; `data` must already be free of [`PriceListData::problems`]
    ///
    /// # Errors
    ///
    /// Unique violation on `price_list_items_seller_kind_key` when the seller
    /// already has an item of this kind.
    pub async fn create(
        pool: &PgPool,
        seller_id: i64,
        kind: PriceListKind,
        data: PriceListData,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO price_list_items (seller_id, kind, brand_name, specification, capacity, \
             system_type, structure_type, unit, price) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            ITEM_COLUMNS
        );

        sqlx::query_as::<_, PriceListItem>(&query)
            .bind(seller_id)
            .bind(kind)
            .bind(data.brand_name)
            .bind(data.specification.unwrap_or_default())
            .bind(data.capacity)
            .bind(data.system_type)
            .bind(data.structure_type)
            .bind(data.unit.unwrap_or(PriceUnit::Watt))
            .bind(data.price.unwrap_or_default())
            .fetch_one(pool)
            .await
    }

    /// Finds an item of `kind`, restricted to one seller when given
    pub async fn find(
        pool: &PgPool,
        kind: PriceListKind,
        id: i64,
        seller_id: Option<i64>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM price_list_items WHERE id = $1 AND kind = $2 \
             AND ($3::BIGINT IS NULL OR seller_id = $3)",
            ITEM_COLUMNS
        );

        sqlx::query_as::<_, PriceListItem>(&query)
            .bind(id)
            .bind(kind)
            .bind(seller_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        kind: PriceListKind,
        seller_id: Option<i64>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM price_list_items WHERE kind = $1 \
             AND ($2::BIGINT IS NULL OR seller_id = $2) ORDER BY id",
            ITEM_COLUMNS
        );

        sqlx::query_as::<_, PriceListItem>(&query)
            .bind(kind)
            .bind(seller_id)
            .fetch_all(pool)
            .await
    }

    /// Overwrites every attribute and assigns the item to `seller_id`
    pub async fn replace(
        pool: &PgPool,
        id: i64,
        seller_id: i64,
        data: PriceListData,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE price_list_items SET seller_id = $2, brand_name = $3, specification = $4, \
             capacity = $5, system_type = $6, structure_type = $7, unit = $8, price = $9, \
             updated = NOW() WHERE id = $1 RETURNING {}",
            ITEM_COLUMNS
        );

        sqlx::query_as::<_, PriceListItem>(&query)
            .bind(id)
            .bind(seller_id)
            .bind(data.brand_name)
            .bind(data.specification.unwrap_or_default())
            .bind(data.capacity)
            .bind(data.system_type)
            .bind(data.structure_type)
            .bind(data.unit.unwrap_or(PriceUnit::Watt))
            .bind(data.price.unwrap_or_default())
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM price_list_items WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> PriceListData {
        PriceListData {
            specification: Some("Standard".to_string()),
            unit: Some(PriceUnit::Kw),
            price: Some(1000),
            ..Default::default()
        }
    }

    fn fields(problems: Vec<(&'static str, String)>) -> Vec<&'static str> {
        problems.into_iter().map(|(f, _)| f).collect()
    }

    #[test]
    fn test_path_roundtrip() {
        for kind in PriceListKind::ALL {
            assert_eq!(PriceListKind::from_path(kind.as_path()), Some(kind));
        }
        assert_eq!(PriceListKind::from_path("after_sales_service"), None);
        assert_eq!(PriceListKind::from_path("wind-turbine"), None);
    }

    #[test]
    fn test_capacity_only_kinds() {
        let data = PriceListData { capacity: Some(5), ..base() };
        for kind in [PriceListKind::Bms, PriceListKind::NetMetering, PriceListKind::DcEarthing] {
            assert!(data.problems(kind).is_empty(), "{:?}", kind);
        }

        assert_eq!(fields(base().problems(PriceListKind::Bms)), vec!["capacity"]);
    }

    #[test]
    fn test_panel_requires_brand() {
        let data = PriceListData { capacity: Some(550), ..base() };
        assert_eq!(fields(data.problems(PriceListKind::Panel)), vec!["brand_name"]);
    }

    #[test]
    fn test_unused_attributes_rejected() {
        let data = PriceListData {
            capacity: Some(10),
            brand_name: Some("Jinko".to_string()),
            structure_type: Some("iron_standard".to_string()),
            ..base()
        };
        assert_eq!(
            fields(data.problems(PriceListKind::CivilWork)),
            vec!["brand_name", "structure_type"]
        );
    }

    #[test]
    fn test_mechanical_work_structure_choices() {
        let ok = PriceListData { structure_type: Some("ms_iron_standard".to_string()), ..base() };
        assert!(ok.problems(PriceListKind::MechanicalWork).is_empty());

        let bad = PriceListData { structure_type: Some("wooden".to_string()), ..base() };
        let problems = bad.problems(PriceListKind::MechanicalWork);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].1.contains("not a valid choice"));
    }

    #[test]
    fn test_battery_uses_battery_types() {
        let data = PriceListData {
            brand_name: Some("Narada".to_string()),
            capacity: Some(200),
            system_type: Some("lithium".to_string()),
            ..base()
        };
        assert!(data.problems(PriceListKind::Battery).is_empty());
        assert_eq!(fields(data.problems(PriceListKind::Inverter)), vec!["system_type"]);
    }

    #[test]
    fn test_missing_common_fields() {
        let problems = PriceListData::default().problems(PriceListKind::ElectricWork);
        assert_eq!(fields(problems), vec!["specification", "system_type", "unit", "price"]);
    }

    #[test]
    fn test_merged_onto_existing_item() {
        let item = PriceListItem {
            id: 1,
            seller_id: 2,
            kind: PriceListKind::Panel,
            brand_name: Some("Longi".to_string()),
            specification: "Mono".to_string(),
            capacity: Some(540),
            system_type: None,
            structure_type: None,
            unit: PriceUnit::Watt,
            price: 38,
            created: Utc::now(),
            updated: Utc::now(),
        };

        let patch = PriceListData { price: Some(40), ..Default::default() };
        let merged = patch.merged_onto(&item);

        assert_eq!(merged.price, Some(40));
        assert_eq!(merged.brand_name.as_deref(), Some("Longi"));
        assert!(merged.problems(PriceListKind::Panel).is_empty());
    }
}
