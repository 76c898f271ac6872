//! Progress detail entity - Quantity of one concept executed in a progress report.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Progress detail database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "progress_details")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Parent progress report
    pub progress_report_id: i64,
    /// Concept row the quantity was measured against
    pub concept_id: i64,
    /// Executed quantity
    pub quantity: f64,
    /// `quantity * unit_price` of the concept
    pub subtotal: f64,
}

/// Defines relationships between `ProgressDetail` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each detail belongs to one progress report
    #[sea_orm(
        belongs_to = "super::progress_report::Entity",
        from = "Column::ProgressReportId",
        to = "super::progress_report::Column::Id"
    )]
    ProgressReport,
    /// Concept the quantity refers to
    #[sea_orm(
        belongs_to = "super::catalog_concept::Entity",
        from = "Column::ConceptId",
        to = "super::catalog_concept::Column::Id"
    )]
    CatalogConcept,
}

impl Related<super::progress_report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProgressReport.def()
    }
}

impl Related<super::catalog_concept::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CatalogConcept.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
