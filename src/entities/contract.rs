//! Contract entity - A unit of work for a client.
//!
//! A contract owns its catalog versions, consolidated snapshots, pre-settlements,
//! extraordinary approvals, progress reports and estimations. The advance percentage drives the
//! advance-payment figures in contract totals.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Contract database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contracts")]
pub struct Model {
    /// Unique identifier for the contract
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Descriptive name of the contract
    pub name: String,
    /// Contract code as printed on documents
    pub code: String,
    /// `"open"` or `"closed"`
    pub state: String,
    /// Advance payment as a percentage of the original amount (e.g. 30.0)
    pub advance_percentage: f64,
}

/// Defines relationships between Contract and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One contract has many catalog versions
    #[sea_orm(has_many = "super::catalog_version::Entity")]
    CatalogVersions,
    /// One contract has many consolidated snapshots
    #[sea_orm(has_many = "super::catalog_snapshot::Entity")]
    CatalogSnapshots,
    /// One contract has many pre-settlements
    #[sea_orm(has_many = "super::presettlement::Entity")]
    Presettlements,
    /// One contract has many extraordinary approvals
    #[sea_orm(has_many = "super::concept_approval::Entity")]
    ConceptApprovals,
    /// One contract has many progress reports
    #[sea_orm(has_many = "super::progress_report::Entity")]
    ProgressReports,
    /// One contract has many estimations
    #[sea_orm(has_many = "super::estimation::Entity")]
    Estimations,
}

impl Related<super::catalog_version::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CatalogVersions.def()
    }
}

impl Related<super::catalog_snapshot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CatalogSnapshots.def()
    }
}

impl Related<super::presettlement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Presettlements.def()
    }
}

impl Related<super::concept_approval::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ConceptApprovals.def()
    }
}

impl Related<super::progress_report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProgressReports.def()
    }
}

impl Related<super::estimation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Estimations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
