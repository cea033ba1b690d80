//! Pickup/drop cost matrix for a city.
//!
//! Every ordered pair of distinct locations in a city carries a price. This module derives the full
//! set of pairs from the city's locations, merges in the prices that are already stored, validates
//! what the back office submits and tracks the editing session around it. Nothing here touches the
//! database; the handlers load the inputs and persist the resulting payloads.

pub mod reconcile;
pub mod session;
pub mod submission;

use serde::{Deserialize, Serialize};

pub use reconcile::{reconcile, MatrixMode, Reconciliation};
pub use session::{CostMatrixSession, RowEdit, SessionError, SessionState, SubmitRequest};
pub use submission::{
    build_submission, check_payload, parse_cost, plan_upsert, CostDetailPayload,
    LocationCostPayload, SubmissionMode, UpsertPlan,
};

pub type CityId = i32;
pub type LocationId = i32;

/// A location as the matrix sees it: an id and a display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRef {
    pub id: LocationId,
    pub name: String,
}

/// A city with its locations in backend order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityLocations {
    pub id: CityId,
    pub name: String,
    pub locations: Vec<LocationRef>,
}

impl CityLocations {
    pub fn location(&self, id: LocationId) -> Option<&LocationRef> {
        self.locations.iter().find(|l| l.id == id)
    }
}

/// Ordered (pickup, drop) combination. Pickup and drop are always different locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectedPair {
    pub pickup: LocationId,
    pub drop: LocationId,
}

/// A stored price for one pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostEntry {
    pub pair: DirectedPair,
    pub cost: f64,
}

/// One editable line of the matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRow {
    pub pickup_location_id: LocationId,
    pub pickup_location_name: String,
    pub drop_location_id: LocationId,
    pub drop_location_name: String,
    /// Raw cost as entered; empty when unset.
    pub cost: String,
    /// The cost was already stored for this pair.
    pub readonly: bool,
}

impl CostRow {
    pub fn pair(&self) -> DirectedPair {
        DirectedPair {
            pickup: self.pickup_location_id,
            drop: self.drop_location_id,
        }
    }

    pub fn is_unset(&self) -> bool {
        self.cost.trim().is_empty()
    }
}
