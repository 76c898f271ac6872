//! Pre-settlement detail entity - One compared concept inside a pre-settlement.
//!
//! Side values are zero when the concept is absent on that side. `change_type` is
//! one of `"modified"`, `"unchanged"` or `"new"`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Pre-settlement detail database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "presettlement_details")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Parent pre-settlement
    pub presettlement_id: i64,
    /// Concept row the descriptive fields were copied from
    pub concept_id: Option<i64>,
    /// Cost grouping number
    pub group_number: String,
    /// Cost grouping name
    pub group_name: String,
    /// Compared concept key
    pub concept_key: String,
    /// Description, updated side preferred
    pub description: String,
    /// Unit of measure, updated side preferred
    pub unit: String,
    pub original_unit_price: f64,
    pub original_quantity: f64,
    pub original_subtotal: f64,
    pub updated_unit_price: f64,
    pub updated_quantity: f64,
    pub updated_subtotal: f64,
    /// `updated_quantity - original_quantity`
    pub quantity_delta: f64,
    /// `updated_subtotal - original_subtotal`
    pub subtotal_delta: f64,
    /// Classification of the change
    pub change_type: String,
}

/// Defines relationships between `PresettlementDetail` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each detail belongs to one pre-settlement
    #[sea_orm(
        belongs_to = "super::presettlement::Entity",
        from = "Column::PresettlementId",
        to = "super::presettlement::Column::Id"
    )]
    Presettlement,
    /// Source concept row, if any
    #[sea_orm(
        belongs_to = "super::catalog_concept::Entity",
        from = "Column::ConceptId",
        to = "super::catalog_concept::Column::Id"
    )]
    CatalogConcept,
}

impl Related<super::presettlement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Presettlement.def()
    }
}

impl Related<super::catalog_concept::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CatalogConcept.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
