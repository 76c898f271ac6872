//! Progress report entity - A dated work-progress measurement (avance) for a contract.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Progress report database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "progress_reports")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Contract being measured
    pub contract_id: i64,
    /// Date of the measurement
    pub report_date: Date,
    /// Per-contract sequence number (1, 2, ...)
    pub sequence: i32,
    /// Catalog version the measurement was taken against
    pub catalog_version_id: Option<i64>,
}

/// Defines relationships between `ProgressReport` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each report belongs to one contract
    #[sea_orm(
        belongs_to = "super::contract::Entity",
        from = "Column::ContractId",
        to = "super::contract::Column::Id"
    )]
    Contract,
    /// One report has many details
    #[sea_orm(has_many = "super::progress_detail::Entity")]
    Details,
}

impl Related<super::contract::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contract.def()
    }
}

impl Related<super::progress_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Details.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
