//! Pre-settlement entity - A persisted comparison between two catalog versions.
//!
//! Holds the subtotal sums of both sides and their difference; the per-concept rows
//! live in `presettlement_detail`. Pre-settlements are generated, never updated.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Pre-settlement database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "presettlements")]
pub struct Model {
    /// Unique identifier; the highest id per contract is authoritative
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Contract being compared
    pub contract_id: i64,
    /// Catalog version on the "original" side
    pub original_version_id: i64,
    /// Catalog version on the "updated" side
    pub updated_version_id: i64,
    /// Date of generation
    pub generated_on: Date,
    /// Sum of original-side subtotals
    pub total_original: f64,
    /// Sum of updated-side subtotals
    pub total_updated: f64,
    /// `total_updated - total_original`
    pub total_difference: f64,
}

/// Defines relationships between Presettlement and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each pre-settlement belongs to one contract
    #[sea_orm(
        belongs_to = "super::contract::Entity",
        from = "Column::ContractId",
        to = "super::contract::Column::Id"
    )]
    Contract,
    /// Version on the original side
    #[sea_orm(
        belongs_to = "super::catalog_version::Entity",
        from = "Column::OriginalVersionId",
        to = "super::catalog_version::Column::Id"
    )]
    OriginalVersion,
    /// Version on the updated side
    #[sea_orm(
        belongs_to = "super::catalog_version::Entity",
        from = "Column::UpdatedVersionId",
        to = "super::catalog_version::Column::Id"
    )]
    UpdatedVersion,
    /// One pre-settlement has many details
    #[sea_orm(has_many = "super::presettlement_detail::Entity")]
    Details,
}

impl Related<super::contract::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contract.def()
    }
}

impl Related<super::presettlement_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Details.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
