use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::reconcile::{reconcile, MatrixMode};
use super::submission::{
    build_submission, parse_cost, row_cost_field, LocationCostPayload, SubmissionMode,
};
use super::{CityId, CityLocations, CostEntry, CostRow, DirectedPair, LocationId};
use crate::utils::validation::FieldErrors;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    NoCitySelected,
    /// City chosen, its stored costs have not arrived yet.
    AwaitingCosts { city_id: CityId },
    /// Stays here until another city is selected.
    InsufficientLocations { city_id: CityId },
    MatrixReady {
        city_id: CityId,
        mode: MatrixMode,
        cost_record_id: Option<i32>,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("No cost matrix is ready")]
    NotReady,

    #[error("Row {0} does not exist")]
    RowOutOfRange(usize),

    #[error("Row {0} already has a stored cost")]
    RowLocked(usize),

    #[error("Validation failed: {0}")]
    Invalid(FieldErrors),
}

pub const PAIR_NOT_IN_MATRIX: &str = "Pickup and drop combination is not part of this city";
pub const COST_ALREADY_STORED: &str = "Cost is already stored for this pair";

/// A cost entered for one pair, addressed by its locations rather than its row position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowEdit {
    pub pickup_location_id: LocationId,
    pub drop_location_id: LocationId,
    pub cost: String,
}

impl RowEdit {
    pub fn pair(&self) -> DirectedPair {
        DirectedPair {
            pickup: self.pickup_location_id,
            drop: self.drop_location_id,
        }
    }
}

/// What to send once the matrix validates.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitRequest {
    Create(LocationCostPayload),
    Update { id: i32, payload: LocationCostPayload },
}

/// Editing state for one city's cost matrix.
///
/// The session owns the derived rows between edits. A failed submit never touches them, so the
/// same rows can be submitted again.
#[derive(Debug, Clone)]
pub struct CostMatrixSession {
    submission_mode: SubmissionMode,
    state: SessionState,
    city: Option<CityLocations>,
    rows: Vec<CostRow>,
}

impl CostMatrixSession {
    pub fn new(submission_mode: SubmissionMode) -> Self {
        Self {
            submission_mode,
            state: SessionState::NoCitySelected,
            city: None,
            rows: Vec::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn rows(&self) -> &[CostRow] {
        &self.rows
    }

    pub fn submission_mode(&self) -> SubmissionMode {
        self.submission_mode
    }

    /// Start over with `city`. Cities with fewer than two locations settle immediately.
    pub fn select_city(&mut self, city: CityLocations) {
        self.rows.clear();

        if city.locations.len() < 2 {
            tracing::debug!(city_id = city.id, "City has fewer than two locations");
            self.state = SessionState::InsufficientLocations { city_id: city.id };
            self.city = None;
            return;
        }

        self.state = SessionState::AwaitingCosts { city_id: city.id };
        self.city = Some(city);
    }

    /// Apply the stored costs fetched for `city_id`.
    ///
    /// Returns `false` and changes nothing when the result belongs to a city that is no longer
    /// selected, or when no lookup is pending.
    pub fn apply_costs(
        &mut self,
        city_id: CityId,
        cost_record_id: Option<i32>,
        existing: &[CostEntry],
    ) -> bool {
        let city = match (&self.state, &self.city) {
            (SessionState::AwaitingCosts { city_id: pending }, Some(city)) if *pending == city_id => {
                city
            }
            _ => {
                tracing::debug!(city_id, "Discarding stale cost lookup");
                return false;
            }
        };

        let result = reconcile(city, existing);
        self.rows = result.rows;
        self.state = SessionState::MatrixReady {
            city_id,
            mode: result.mode,
            cost_record_id,
        };
        true
    }

    pub fn set_cost(&mut self, index: usize, cost: impl Into<String>) -> Result<(), SessionError> {
        if !matches!(self.state, SessionState::MatrixReady { .. }) {
            return Err(SessionError::NotReady);
        }

        let mode = self.submission_mode;
        let row = self
            .rows
            .get_mut(index)
            .ok_or(SessionError::RowOutOfRange(index))?;
        if mode.locks(row) {
            return Err(SessionError::RowLocked(index));
        }

        row.cost = cost.into();
        Ok(())
    }

    /// Apply a batch of pair-addressed edits, all or nothing.
    ///
    /// A locked row accepts an edit only when it repeats the stored cost; the row stays as it is.
    pub fn apply_edits(&mut self, edits: &[RowEdit]) -> Result<(), SessionError> {
        if !matches!(self.state, SessionState::MatrixReady { .. }) {
            return Err(SessionError::NotReady);
        }

        let mut errors = FieldErrors::new();
        let mut updates = Vec::new();

        for (position, edit) in edits.iter().enumerate() {
            let Some(index) = self.rows.iter().position(|r| r.pair() == edit.pair()) else {
                errors.add(format!("rows.{}", position), PAIR_NOT_IN_MATRIX);
                continue;
            };

            let row = &self.rows[index];
            if self.submission_mode.locks(row) {
                if parse_cost(&edit.cost).ok() != parse_cost(&row.cost).ok() {
                    errors.add(row_cost_field(index), COST_ALREADY_STORED);
                }
                continue;
            }

            updates.push((index, edit.cost.clone()));
        }

        if !errors.is_empty() {
            return Err(SessionError::Invalid(errors));
        }

        for (index, cost) in updates {
            self.rows[index].cost = cost;
        }
        Ok(())
    }

    /// Validate the rows and build the request to send. Rows are left as they are either way.
    pub fn submit(&self) -> Result<SubmitRequest, SessionError> {
        let (city_id, cost_record_id) = match self.state {
            SessionState::MatrixReady {
                city_id,
                cost_record_id,
                ..
            } => (city_id, cost_record_id),
            _ => return Err(SessionError::NotReady),
        };

        let payload = build_submission(city_id, &self.rows, self.submission_mode)
            .map_err(SessionError::Invalid)?;

        Ok(match cost_record_id {
            Some(id) => SubmitRequest::Update { id, payload },
            None => SubmitRequest::Create(payload),
        })
    }

    pub fn clear(&mut self) {
        self.state = SessionState::NoCitySelected;
        self.city = None;
        self.rows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost_matrix::{DirectedPair, LocationRef};

    fn city(id: i32, count: i32) -> CityLocations {
        CityLocations {
            id,
            name: format!("City {}", id),
            locations: (1..=count)
                .map(|n| LocationRef {
                    id: id * 100 + n,
                    name: format!("Stop {}", n),
                })
                .collect(),
        }
    }

    #[test]
    fn test_select_city_with_one_location() {
        let mut session = CostMatrixSession::new(SubmissionMode::Amend);
        session.select_city(city(1, 1));

        assert_eq!(session.state(), &SessionState::InsufficientLocations { city_id: 1 });
        assert!(!session.apply_costs(1, None, &[]));
        assert!(session.rows().is_empty());
        assert_eq!(session.submit(), Err(SessionError::NotReady));
    }

    #[test]
    fn test_stale_lookup_is_discarded() {
        let mut session = CostMatrixSession::new(SubmissionMode::Amend);
        session.select_city(city(1, 3));
        session.select_city(city(2, 2));

        assert!(!session.apply_costs(1, Some(5), &[]));
        assert_eq!(session.state(), &SessionState::AwaitingCosts { city_id: 2 });

        assert!(session.apply_costs(2, None, &[]));
        assert_eq!(session.rows().len(), 2);
        assert_eq!(
            session.state(),
            &SessionState::MatrixReady {
                city_id: 2,
                mode: MatrixMode::Create,
                cost_record_id: None
            }
        );
    }

    #[test]
    fn test_amend_session_locks_stored_rows() {
        let stored = [CostEntry {
            pair: DirectedPair { pickup: 101, drop: 102 },
            cost: 12.5,
        }];
        let mut session = CostMatrixSession::new(SubmissionMode::Amend);
        session.select_city(city(1, 2));
        session.apply_costs(1, Some(9), &stored);

        assert_eq!(session.set_cost(0, "50"), Err(SessionError::RowLocked(0)));
        assert_eq!(session.set_cost(5, "50"), Err(SessionError::RowOutOfRange(5)));

        session.set_cost(1, "18").unwrap();
        match session.submit().unwrap() {
            SubmitRequest::Update { id, payload } => {
                assert_eq!(id, 9);
                assert_eq!(payload.location_cost_details.len(), 1);
                assert_eq!(payload.location_cost_details[0].cost, 18.0);
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_failed_submit_keeps_rows() {
        let mut session = CostMatrixSession::new(SubmissionMode::Amend);
        session.select_city(city(1, 3));
        session.apply_costs(1, None, &[]);
        session.set_cost(0, "25").unwrap();

        let before = session.rows().to_vec();
        match session.submit() {
            Err(SessionError::Invalid(errors)) => assert_eq!(errors.len(), 5),
            other => panic!("expected validation errors, got {:?}", other),
        }
        assert_eq!(session.rows(), &before[..]);

        for i in 1..6 {
            session.set_cost(i, "30").unwrap();
        }
        assert!(matches!(session.submit(), Ok(SubmitRequest::Create(p)) if p.location_cost_details.len() == 6));
    }

    #[test]
    fn test_bulk_session_edits_stored_rows() {
        let stored = [CostEntry {
            pair: DirectedPair { pickup: 101, drop: 102 },
            cost: 12.5,
        }];
        let mut session = CostMatrixSession::new(SubmissionMode::BulkOverwrite);
        session.select_city(city(1, 2));
        session.apply_costs(1, Some(4), &stored);

        session.set_cost(0, "14").unwrap();
        session.set_cost(1, "16").unwrap();

        match session.submit().unwrap() {
            SubmitRequest::Update { payload, .. } => {
                let costs: Vec<f64> =
                    payload.location_cost_details.iter().map(|d| d.cost).collect();
                assert_eq!(costs, vec![14.0, 16.0]);
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_clear_returns_to_start() {
        let mut session = CostMatrixSession::new(SubmissionMode::Amend);
        session.select_city(city(1, 2));
        session.apply_costs(1, None, &[]);
        session.clear();

        assert_eq!(session.state(), &SessionState::NoCitySelected);
        assert!(session.rows().is_empty());
    }

    fn edit(pickup: i32, drop: i32, cost: &str) -> RowEdit {
        RowEdit {
            pickup_location_id: pickup,
            drop_location_id: drop,
            cost: cost.to_string(),
        }
    }

    #[test]
    fn test_edits_rejected_until_costs_arrive() {
        let mut session = CostMatrixSession::new(SubmissionMode::Amend);
        assert_eq!(session.set_cost(0, "10"), Err(SessionError::NotReady));

        session.select_city(city(1, 3));
        assert_eq!(session.state(), &SessionState::AwaitingCosts { city_id: 1 });
        assert_eq!(session.set_cost(0, "10"), Err(SessionError::NotReady));
        assert_eq!(
            session.apply_edits(&[edit(101, 102, "10")]),
            Err(SessionError::NotReady)
        );
        assert!(session.rows().is_empty());
    }

    #[test]
    fn test_apply_edits_by_pair() {
        let stored = [CostEntry {
            pair: DirectedPair { pickup: 101, drop: 102 },
            cost: 12.5,
        }];
        let mut session = CostMatrixSession::new(SubmissionMode::Amend);
        session.select_city(city(1, 2));
        session.apply_costs(1, Some(9), &stored);

        // Repeating the stored cost of a locked row is accepted and changes nothing
        session
            .apply_edits(&[edit(101, 102, "12.50"), edit(102, 101, "22")])
            .unwrap();

        assert_eq!(session.rows()[0].cost, "12.5");
        assert_eq!(session.rows()[1].cost, "22");
    }

    #[test]
    fn test_apply_edits_is_all_or_nothing() {
        let stored = [CostEntry {
            pair: DirectedPair { pickup: 101, drop: 102 },
            cost: 12.5,
        }];
        let mut session = CostMatrixSession::new(SubmissionMode::Amend);
        session.select_city(city(1, 2));
        session.apply_costs(1, Some(9), &stored);

        let result = session.apply_edits(&[
            edit(102, 101, "22"),
            edit(101, 102, "40"),
            edit(101, 999, "5"),
        ]);

        match result {
            Err(SessionError::Invalid(errors)) => {
                assert_eq!(errors.get("locationCosts.0.cost"), Some(COST_ALREADY_STORED));
                assert_eq!(errors.get("rows.2"), Some(PAIR_NOT_IN_MATRIX));
                assert_eq!(errors.len(), 2);
            }
            other => panic!("expected validation errors, got {:?}", other),
        }
        assert!(session.rows()[1].is_unset());
    }
}
