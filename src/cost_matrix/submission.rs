use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{CityId, CityLocations, CostEntry, CostRow, DirectedPair, LocationId};
use crate::utils::validation::FieldErrors;

pub const COST_NOT_A_NUMBER: &str = "Cost must be a number";
pub const COST_NOT_POSITIVE: &str = "Cost must be positive";
pub const COST_REQUIRED: &str = "At least one location cost is required";
pub const MIN_COST: f64 = 1.0;

/// Which rows go out on save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMode {
    /// Only rows without a stored cost; stored pairs are left alone on the server.
    Amend,
    /// Every row, stored or not, is sent and overwrites what the server has.
    BulkOverwrite,
}

impl SubmissionMode {
    pub fn includes(self, row: &CostRow) -> bool {
        match self {
            SubmissionMode::Amend => !row.readonly,
            SubmissionMode::BulkOverwrite => true,
        }
    }

    pub fn locks(self, row: &CostRow) -> bool {
        !self.includes(row)
    }
}

/// Body of a location-cost create or update request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCostPayload {
    pub city: CityId,
    pub location_cost_details: Vec<CostDetailPayload>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostDetailPayload {
    pub pickup_location: LocationId,
    pub drop_location: LocationId,
    pub cost: f64,
}

impl CostDetailPayload {
    pub fn pair(&self) -> DirectedPair {
        DirectedPair {
            pickup: self.pickup_location,
            drop: self.drop_location,
        }
    }
}

/// Parse a cost typed into the matrix.
pub fn parse_cost(raw: &str) -> Result<f64, &'static str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(COST_NOT_A_NUMBER);
    }

    let cost: f64 = raw.parse().map_err(|_| COST_NOT_A_NUMBER)?;
    check_cost(cost)
}

pub fn check_cost(cost: f64) -> Result<f64, &'static str> {
    if !cost.is_finite() {
        return Err(COST_NOT_A_NUMBER);
    }
    if cost < MIN_COST {
        return Err(COST_NOT_POSITIVE);
    }
    Ok(cost)
}

pub fn row_cost_field(index: usize) -> String {
    format!("locationCosts.{}.cost", index)
}

/// Turn the rows being edited into a request body.
///
/// Errors are keyed by the row's position in `rows`, so they line up with the rows as shown.
/// Any error means nothing is submitted.
pub fn build_submission(
    city_id: CityId,
    rows: &[CostRow],
    mode: SubmissionMode,
) -> Result<LocationCostPayload, FieldErrors> {
    let mut errors = FieldErrors::new();
    let mut details = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        if !mode.includes(row) {
            continue;
        }

        match parse_cost(&row.cost) {
            Ok(cost) => details.push(CostDetailPayload {
                pickup_location: row.pickup_location_id,
                drop_location: row.drop_location_id,
                cost,
            }),
            Err(message) => errors.add(row_cost_field(index), message),
        }
    }

    if details.is_empty() && errors.is_empty() {
        errors.add("locationCosts", COST_REQUIRED);
    }

    errors.into_result(LocationCostPayload {
        city: city_id,
        location_cost_details: details,
    })
}

/// Server-side check of a submitted body against the city it names.
pub fn check_payload(city: &CityLocations, payload: &LocationCostPayload) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if payload.city != city.id {
        errors.add("city", "City does not match the location cost record");
    }
    if payload.location_cost_details.is_empty() {
        errors.add("locationCostDetails", COST_REQUIRED);
    }

    let mut seen = HashSet::new();
    for (index, detail) in payload.location_cost_details.iter().enumerate() {
        let field = |name: &str| format!("locationCostDetails.{}.{}", index, name);

        if city.location(detail.pickup_location).is_none() {
            errors.add(field("pickupLocation"), "Pickup location does not belong to this city");
        }
        if city.location(detail.drop_location).is_none() {
            errors.add(field("dropLocation"), "Drop location does not belong to this city");
        }
        if detail.pickup_location == detail.drop_location {
            errors.add(field("dropLocation"), "Pickup and drop locations must be different");
        }
        if let Err(message) = check_cost(detail.cost) {
            errors.add(field("cost"), message);
        }
        if !seen.insert(detail.pair()) {
            errors.add(field("pickupLocation"), "Duplicate pickup and drop combination");
        }
    }

    errors.into_result(())
}

/// How submitted prices land on a city's stored ones.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpsertPlan {
    /// Pairs with no stored price yet.
    pub inserts: Vec<CostDetailPayload>,
    /// Stored detail id and its new cost.
    pub overwrites: Vec<(i32, f64)>,
    /// Submitted pairs whose stored cost already matches.
    pub unchanged: usize,
}

/// Split a submission into inserts and overwrites against `stored` (detail id, entry).
///
/// Stored pairs that are not submitted do not appear in the plan and keep their cost.
pub fn plan_upsert(stored: &[(i32, CostEntry)], submitted: &[CostDetailPayload]) -> UpsertPlan {
    let mut plan = UpsertPlan::default();

    for detail in submitted {
        match stored.iter().find(|(_, entry)| entry.pair == detail.pair()) {
            Some((_, entry)) if entry.cost == detail.cost => plan.unchanged += 1,
            Some((id, _)) => plan.overwrites.push((*id, detail.cost)),
            None => plan.inserts.push(*detail),
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost_matrix::{reconcile, CostEntry, LocationRef};

    fn row(pickup: i32, drop: i32, cost: &str, readonly: bool) -> CostRow {
        CostRow {
            pickup_location_id: pickup,
            pickup_location_name: format!("L{}", pickup),
            drop_location_id: drop,
            drop_location_name: format!("L{}", drop),
            cost: cost.to_string(),
            readonly,
        }
    }

    fn city() -> CityLocations {
        CityLocations {
            id: 3,
            name: "Mysore".to_string(),
            locations: vec![
                LocationRef { id: 1, name: "Palace".to_string() },
                LocationRef { id: 2, name: "Zoo".to_string() },
                LocationRef { id: 4, name: "Station".to_string() },
            ],
        }
    }

    #[test]
    fn test_parse_cost() {
        assert_eq!(parse_cost("12.5"), Ok(12.5));
        assert_eq!(parse_cost(" 40 "), Ok(40.0));
        assert_eq!(parse_cost("1"), Ok(1.0));
        assert_eq!(parse_cost(""), Err(COST_NOT_A_NUMBER));
        assert_eq!(parse_cost("abc"), Err(COST_NOT_A_NUMBER));
        assert_eq!(parse_cost("NaN"), Err(COST_NOT_A_NUMBER));
        assert_eq!(parse_cost("inf"), Err(COST_NOT_A_NUMBER));
        assert_eq!(parse_cost("0"), Err(COST_NOT_POSITIVE));
        assert_eq!(parse_cost("-5"), Err(COST_NOT_POSITIVE));
        assert_eq!(parse_cost("0.5"), Err(COST_NOT_POSITIVE));
    }

    #[test]
    fn test_amend_with_empty_editable_row_submits_nothing() {
        let rows = vec![row(1, 2, "12.5", true), row(1, 4, "", false)];

        let errors = build_submission(3, &rows, SubmissionMode::Amend).unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("locationCosts.1.cost"), Some(COST_NOT_A_NUMBER));
    }

    #[test]
    fn test_amend_skips_stored_rows() {
        let rows = vec![row(1, 2, "12.5", true), row(1, 4, "30", false)];

        let payload = build_submission(3, &rows, SubmissionMode::Amend).unwrap();

        assert_eq!(
            payload.location_cost_details,
            vec![CostDetailPayload { pickup_location: 1, drop_location: 4, cost: 30.0 }]
        );
    }

    #[test]
    fn test_amend_with_everything_stored_is_rejected() {
        let rows = vec![row(1, 2, "12.5", true), row(2, 1, "8", true)];

        let errors = build_submission(3, &rows, SubmissionMode::Amend).unwrap_err();

        assert_eq!(errors.get("locationCosts"), Some(COST_REQUIRED));
    }

    #[test]
    fn test_create_with_all_rows_filled() {
        let mut rows = reconcile(&city(), &[]).rows;
        for (i, r) in rows.iter_mut().enumerate() {
            r.cost = format!("{}", 10 + i);
        }

        let payload = build_submission(3, &rows, SubmissionMode::Amend).unwrap();

        assert_eq!(payload.city, 3);
        assert_eq!(payload.location_cost_details.len(), 6);
        let costs: Vec<f64> = payload.location_cost_details.iter().map(|d| d.cost).collect();
        assert_eq!(costs, vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
    }

    #[test]
    fn test_bulk_overwrite_includes_stored_rows() {
        let stored = [CostEntry { pair: DirectedPair { pickup: 1, drop: 2 }, cost: 12.5 }];
        let mut rows = reconcile(&city(), &stored).rows;
        for r in rows.iter_mut().filter(|r| !r.readonly) {
            r.cost = "20".to_string();
        }

        let payload = build_submission(3, &rows, SubmissionMode::BulkOverwrite).unwrap();

        assert_eq!(payload.location_cost_details.len(), 6);
        assert_eq!(payload.location_cost_details[0].cost, 12.5);
    }

    #[test]
    fn test_bulk_overwrite_reports_every_bad_row() {
        let rows = vec![
            row(1, 2, "0", true),
            row(2, 1, "x", false),
            row(1, 4, "15", false),
        ];

        let errors = build_submission(3, &rows, SubmissionMode::BulkOverwrite).unwrap_err();

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("locationCosts.0.cost"), Some(COST_NOT_POSITIVE));
        assert_eq!(errors.get("locationCosts.1.cost"), Some(COST_NOT_A_NUMBER));
    }

    #[test]
    fn test_payload_uses_camel_case() {
        let payload = LocationCostPayload {
            city: 3,
            location_cost_details: vec![CostDetailPayload {
                pickup_location: 1,
                drop_location: 2,
                cost: 12.5,
            }],
        };

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({
                "city": 3,
                "locationCostDetails": [
                    { "pickupLocation": 1, "dropLocation": 2, "cost": 12.5 }
                ]
            })
        );
    }

    #[test]
    fn test_check_payload_rejects_foreign_and_degenerate_pairs() {
        let payload = LocationCostPayload {
            city: 3,
            location_cost_details: vec![
                CostDetailPayload { pickup_location: 1, drop_location: 2, cost: 10.0 },
                CostDetailPayload { pickup_location: 1, drop_location: 99, cost: 10.0 },
                CostDetailPayload { pickup_location: 4, drop_location: 4, cost: 10.0 },
                CostDetailPayload { pickup_location: 2, drop_location: 1, cost: 0.0 },
                CostDetailPayload { pickup_location: 1, drop_location: 2, cost: 11.0 },
            ],
        };

        let errors = check_payload(&city(), &payload).unwrap_err();

        assert_eq!(errors.get("locationCostDetails.0.pickupLocation"), None);
        assert!(errors.get("locationCostDetails.1.dropLocation").is_some());
        assert!(errors.get("locationCostDetails.2.dropLocation").is_some());
        assert_eq!(errors.get("locationCostDetails.3.cost"), Some(COST_NOT_POSITIVE));
        assert!(errors.get("locationCostDetails.4.pickupLocation").is_some());
    }

    #[test]
    fn test_check_payload_city_and_empty_details() {
        let payload = LocationCostPayload {
            city: 8,
            location_cost_details: vec![],
        };

        let errors = check_payload(&city(), &payload).unwrap_err();

        assert!(errors.get("city").is_some());
        assert_eq!(errors.get("locationCostDetails"), Some(COST_REQUIRED));
    }

    fn entry(pickup: i32, drop: i32, cost: f64) -> CostEntry {
        CostEntry { pair: DirectedPair { pickup, drop }, cost }
    }

    fn detail(pickup: i32, drop: i32, cost: f64) -> CostDetailPayload {
        CostDetailPayload { pickup_location: pickup, drop_location: drop, cost }
    }

    #[test]
    fn test_plan_upsert_overwrites_and_inserts() {
        let stored = [(70, entry(1, 2, 12.5)), (71, entry(2, 1, 9.0))];
        let submitted = [detail(1, 2, 15.0), detail(1, 4, 20.0)];

        let plan = plan_upsert(&stored, &submitted);

        assert_eq!(plan.overwrites, vec![(70, 15.0)]);
        assert_eq!(plan.inserts, vec![detail(1, 4, 20.0)]);
        assert_eq!(plan.unchanged, 0);
        // (2,1) was not submitted, so nothing touches detail 71
        assert!(plan.overwrites.iter().all(|(id, _)| *id != 71));
    }

    #[test]
    fn test_plan_upsert_same_cost_is_unchanged() {
        let stored = [(70, entry(1, 2, 12.5))];

        let plan = plan_upsert(&stored, &[detail(1, 2, 12.5)]);

        assert_eq!(plan, UpsertPlan { unchanged: 1, ..Default::default() });
    }

    #[test]
    fn test_plan_upsert_is_direction_sensitive() {
        let stored = [(70, entry(1, 2, 12.5))];

        let plan = plan_upsert(&stored, &[detail(2, 1, 12.5)]);

        assert!(plan.overwrites.is_empty());
        assert_eq!(plan.inserts, vec![detail(2, 1, 12.5)]);
    }
}
