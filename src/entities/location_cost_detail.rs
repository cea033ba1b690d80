use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cost_matrix::{CostEntry, DirectedPair};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "location_cost_detail")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub location_cost_id: i32,
    pub pickup_location_id: i32,
    pub drop_location_id: i32,
    pub cost: f64,
}

impl Model {
    pub fn entry(&self) -> CostEntry {
        CostEntry {
            pair: DirectedPair {
                pickup: self.pickup_location_id,
                drop: self.drop_location_id,
            },
            cost: self.cost,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::location_cost::Entity",
        from = "Column::LocationCostId",
        to = "super::location_cost::Column::Id"
    )]
    LocationCost,
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::PickupLocationId",
        to = "super::location::Column::Id"
    )]
    PickupLocation,
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::DropLocationId",
        to = "super::location::Column::Id"
    )]
    DropLocation,
}

impl Related<super::location_cost::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LocationCost.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
