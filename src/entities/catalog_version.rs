//! Catalog version entity - One upload of priced line items for a contract.
//!
//! The first upload of a contract is its `original` version; every later upload is
//! `amended`. Versions are immutable apart from the free-text comment.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Catalog version database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "catalog_versions")]
pub struct Model {
    /// Unique identifier; also the creation order of versions
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Contract this version belongs to
    pub contract_id: i64,
    /// `"original"` or `"amended"`
    pub kind: String,
    /// Date the catalog was uploaded
    pub upload_date: Date,
    /// Display name (e.g. "Catalog Original")
    pub name: String,
    /// Free-text note, the only mutable field
    pub comment: String,
}

/// Defines relationships between `CatalogVersion` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each version belongs to one contract
    #[sea_orm(
        belongs_to = "super::contract::Entity",
        from = "Column::ContractId",
        to = "super::contract::Column::Id"
    )]
    Contract,
    /// One version has many concepts
    #[sea_orm(has_many = "super::catalog_concept::Entity")]
    Concepts,
}

impl Related<super::contract::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contract.def()
    }
}

impl Related<super::catalog_concept::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Concepts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
