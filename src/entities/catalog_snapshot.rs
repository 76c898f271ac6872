//! Catalog snapshot entity - Content-addressed history of the consolidated catalog.
//! A new row is written only when the SHA-256 digest of the canonical concept list
//! changes (or when forced); rows are never updated.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Consolidated catalog snapshot database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "catalog_snapshots")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Contract the snapshot was computed for
    pub contract_id: i64,
    /// Per-contract version number (1, 2, 3, ...)
    pub version: i32,
    /// Hex SHA-256 digest of `concepts_json`
    pub content_hash: String,
    /// Canonical JSON of the consolidated concepts, sorted by key
    #[sea_orm(column_type = "Text")]
    pub concepts_json: String,
    /// Date the snapshot was generated
    pub generated_on: Date,
}

/// Defines relationships between `CatalogSnapshot` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each snapshot belongs to one contract
    #[sea_orm(
        belongs_to = "super::contract::Entity",
        from = "Column::ContractId",
        to = "super::contract::Column::Id"
    )]
    Contract,
}

impl Related<super::contract::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contract.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
