//! Concept revision entity - One numbered step of an extraordinary concept's approval.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Concept revision database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "concept_revisions")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Parent approval record
    pub approval_id: i64,
    /// 1-based revision number within the approval
    pub revision_number: i32,
    /// State recorded with this revision
    pub state: String,
    /// Unit price at the time of the revision
    pub unit_price: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,
    /// File name of the descriptive document
    pub attachment: Option<String>,
    /// File name of the signed acknowledgement
    pub acknowledgement: Option<String>,
    /// Date the revision was registered
    pub registered_on: Date,
}

/// Defines relationships between `ConceptRevision` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each revision belongs to one approval
    #[sea_orm(
        belongs_to = "super::concept_approval::Entity",
        from = "Column::ApprovalId",
        to = "super::concept_approval::Column::Id"
    )]
    ConceptApproval,
}

impl Related<super::concept_approval::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ConceptApproval.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
