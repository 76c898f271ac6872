//! Concept approval entity - Approval record of one extraordinary concept per contract.
//! The `state` here is the source of truth that gets mirrored onto concept rows.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Concept approval database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "concept_approvals")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Contract the concept belongs to
    pub contract_id: i64,
    /// Extraordinary concept key
    pub concept_key: String,
    /// `"elaboration"`, `"revision"` or `"approved"`
    pub state: String,
    /// Latest negotiated unit price
    pub unit_price: Option<f64>,
    /// Latest description
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    /// Latest comment
    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,
    /// File name of the descriptive document
    pub attachment: Option<String>,
}

/// Defines relationships between `ConceptApproval` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each approval belongs to one contract
    #[sea_orm(
        belongs_to = "super::contract::Entity",
        from = "Column::ContractId",
        to = "super::contract::Column::Id"
    )]
    Contract,
    /// One approval has many revisions
    #[sea_orm(has_many = "super::concept_revision::Entity")]
    Revisions,
}

impl Related<super::contract::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contract.def()
    }
}

impl Related<super::concept_revision::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Revisions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
