use serde::Serialize;

use super::{CityLocations, CostEntry, CostRow, DirectedPair};

/// How the matrix is presented once derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixMode {
    /// Fewer than two locations, nothing to price.
    InsufficientLocations,
    /// No stored costs for the city, every row is editable.
    Create,
    /// Some costs are stored; those rows are locked, the rest still need a price.
    Amend,
}

impl MatrixMode {
    pub fn is_ready(self) -> bool {
        !matches!(self, MatrixMode::InsufficientLocations)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    pub mode: MatrixMode,
    pub rows: Vec<CostRow>,
}

/// Derive every directed pickup/drop row for `city` and merge in `existing` costs.
///
/// Rows are grouped by pickup in location order, drops in location order within each group.
/// The mode depends only on whether `existing` is empty, not on how much of the matrix it covers.
pub fn reconcile(city: &CityLocations, existing: &[CostEntry]) -> Reconciliation {
    let locations = &city.locations;
    if locations.len() < 2 {
        return Reconciliation {
            mode: MatrixMode::InsufficientLocations,
            rows: Vec::new(),
        };
    }

    let mut rows = Vec::with_capacity(locations.len() * (locations.len() - 1));
    for (i, pickup) in locations.iter().enumerate() {
        for (j, drop) in locations.iter().enumerate() {
            if i == j {
                continue;
            }

            let pair = DirectedPair {
                pickup: pickup.id,
                drop: drop.id,
            };
            let stored = existing.iter().find(|entry| entry.pair == pair);

            rows.push(CostRow {
                pickup_location_id: pickup.id,
                pickup_location_name: pickup.name.clone(),
                drop_location_id: drop.id,
                drop_location_name: drop.name.clone(),
                cost: stored.map(|entry| entry.cost.to_string()).unwrap_or_default(),
                readonly: stored.is_some(),
            });
        }
    }

    let mode = if existing.is_empty() {
        MatrixMode::Create
    } else {
        MatrixMode::Amend
    };

    tracing::debug!(
        city_id = city.id,
        locations = locations.len(),
        rows = rows.len(),
        priced = rows.iter().filter(|r| r.readonly).count(),
        ?mode,
        "Cost matrix reconciled"
    );

    Reconciliation { mode, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost_matrix::LocationRef;

    fn city(names: &[&str]) -> CityLocations {
        CityLocations {
            id: 7,
            name: "Pune".to_string(),
            locations: names
                .iter()
                .enumerate()
                .map(|(i, name)| LocationRef {
                    id: (i as i32 + 1) * 10,
                    name: name.to_string(),
                })
                .collect(),
        }
    }

    fn entry(pickup: i32, drop: i32, cost: f64) -> CostEntry {
        CostEntry {
            pair: DirectedPair { pickup, drop },
            cost,
        }
    }

    #[test]
    fn test_row_count_is_n_times_n_minus_one() {
        for n in 2..=6 {
            let names: Vec<String> = (0..n).map(|i| format!("Stop {}", i)).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let result = reconcile(&city(&refs), &[]);

            assert_eq!(result.rows.len(), n * (n - 1));
            assert!(result
                .rows
                .iter()
                .all(|r| r.pickup_location_id != r.drop_location_id));
        }
    }

    #[test]
    fn test_three_locations_in_pickup_major_order() {
        let result = reconcile(&city(&["Airport", "Baner", "Camp"]), &[]);
        let order: Vec<(&str, &str)> = result
            .rows
            .iter()
            .map(|r| (r.pickup_location_name.as_str(), r.drop_location_name.as_str()))
            .collect();

        assert_eq!(
            order,
            vec![
                ("Airport", "Baner"),
                ("Airport", "Camp"),
                ("Baner", "Airport"),
                ("Baner", "Camp"),
                ("Camp", "Airport"),
                ("Camp", "Baner"),
            ]
        );
    }

    #[test]
    fn test_fewer_than_two_locations_is_inert() {
        let stored = [entry(10, 20, 5.0)];
        let none: &[CostEntry] = &[];
        for names in [vec![], vec!["Airport"]] {
            for existing in [&stored[..], none] {
                let result = reconcile(&city(&names), existing);
                assert!(result.rows.is_empty());
                assert_eq!(result.mode, MatrixMode::InsufficientLocations);
                assert!(!result.mode.is_ready());
            }
        }
    }

    #[test]
    fn test_stored_cost_locks_its_row_only() {
        let result = reconcile(&city(&["Airport", "Baner", "Camp"]), &[entry(10, 20, 12.5)]);

        let priced = &result.rows[0];
        assert_eq!((priced.pickup_location_id, priced.drop_location_id), (10, 20));
        assert_eq!(priced.cost, "12.5");
        assert!(priced.readonly);

        for row in &result.rows[1..] {
            assert!(!row.readonly);
            assert!(row.is_unset());
        }
    }

    #[test]
    fn test_reverse_direction_is_a_different_pair() {
        let result = reconcile(&city(&["Airport", "Baner"]), &[entry(20, 10, 9.0)]);

        assert!(!result.rows[0].readonly);
        assert!(result.rows[1].readonly);
        assert_eq!(result.rows[1].cost, "9");
    }

    #[test]
    fn test_mode_follows_presence_of_stored_costs() {
        let c = city(&["Airport", "Baner", "Camp"]);

        assert_eq!(reconcile(&c, &[]).mode, MatrixMode::Create);
        assert_eq!(reconcile(&c, &[entry(10, 20, 1.0)]).mode, MatrixMode::Amend);

        // Costs for pairs outside the city still switch the mode
        assert_eq!(reconcile(&c, &[entry(98, 99, 1.0)]).mode, MatrixMode::Amend);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let c = city(&["Airport", "Baner", "Camp", "Deccan"]);
        let stored = [entry(10, 30, 40.0), entry(40, 20, 55.25)];

        let first = reconcile(&c, &stored);
        let second = reconcile(&c, &stored);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }
}
