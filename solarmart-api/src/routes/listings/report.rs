/// Admin report of every seller's listings

use super::{list_items, SolutionListItem};
use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde::Serialize;
use solarmart_shared::{
    auth::{authorization::require_admin, middleware::AuthContext},
    models::solution::SolarSolution,
};

#[derive(Debug, Serialize)]
pub struct SellerProducts {
    pub seller_id: i64,
    pub seller_name: Option<String>,
    pub products: Vec<SolutionListItem>,
}

/// Splits solutions ordered by seller into one group per seller
fn group_by_seller(solutions: Vec<SolarSolution>) -> Vec<(i64, Option<String>, Vec<SolarSolution>)> {
    let mut groups: Vec<(i64, Option<String>, Vec<SolarSolution>)> = Vec::new();

    for solution in solutions {
        let Some(seller_id) = solution.seller_id else {
            continue;
        };

        match groups.last_mut() {
            Some((id, _, items)) if *id == seller_id => items.push(solution),
            _ => groups.push((seller_id, solution.seller_name.clone(), vec![solution])),
        }
    }

    groups
}

pub async fn seller_report(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<SellerProducts>>> {
    require_admin(&auth)?;

    let solutions = SolarSolution::list_by_seller(&state.db).await?;
    let mut report = Vec::new();

    for (seller_id, seller_name, solutions) in group_by_seller(solutions) {
        report.push(SellerProducts {
            seller_id,
            seller_name,
            products: list_items(&state.db, solutions).await?,
        });
    }

    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use solarmart_shared::models::solution::{PaymentSchedule, SolutionType};

    fn solution(id: i64, seller_id: Option<i64>, seller_name: &str) -> SolarSolution {
        SolarSolution {
            id,
            size: 5,
            price: Decimal::from(500_000),
            solution_type: SolutionType::OffGrid,
            completion_time_days: 15,
            payment_schedule: PaymentSchedule::FullAdvance,
            seller_id,
            seller_note: None,
            created: Utc::now(),
            updated: Utc::now(),
            city: None,
            seller_name: Some(seller_name.to_string()),
            approval_verified: None,
        }
    }

    #[test]
    fn test_group_by_seller() {
        let groups = group_by_seller(vec![
            solution(1, Some(2), "Asad"),
            solution(4, Some(2), "Asad"),
            solution(3, None, "nobody"),
            solution(2, Some(5), "Hira"),
        ]);

        let summary: Vec<(i64, usize)> = groups.iter().map(|(id, _, items)| (*id, items.len())).collect();
        assert_eq!(summary, vec![(2, 2), (5, 1)]);
        assert_eq!(groups[1].1.as_deref(), Some("Hira"));
    }
}
