//! Catalog concept entity - A priced line item within one catalog version.
//!
//! `concept_key` identifies the concept across versions; keys starting with `E`
//! mark extraordinary concepts whose `status` follows the approval workflow
//! (`E` elaboration, `R1`/`R2`/... revision, `A` approved).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Catalog concept database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "catalog_concepts")]
pub struct Model {
    /// Unique identifier for the row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Catalog version this row belongs to
    pub version_id: i64,
    /// Cost grouping number (partida)
    pub group_number: String,
    /// Cost grouping name
    pub group_name: String,
    /// Identifier of the concept within the logical catalog
    pub concept_key: Option<String>,
    /// Free-text description
    pub description: String,
    /// Unit of measure
    pub unit: String,
    /// Price per unit
    pub unit_price: f64,
    /// Contracted quantity
    pub quantity: f64,
    /// Subtotal as supplied by the source spreadsheet
    pub subtotal: f64,
    /// Approval status code; absent means approved
    pub status: Option<String>,
}

/// Defines relationships between `CatalogConcept` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each concept belongs to one catalog version
    #[sea_orm(
        belongs_to = "super::catalog_version::Entity",
        from = "Column::VersionId",
        to = "super::catalog_version::Column::Id"
    )]
    CatalogVersion,
}

impl Related<super::catalog_version::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CatalogVersion.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
