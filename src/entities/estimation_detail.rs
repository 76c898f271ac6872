//! Estimation detail entity - One billed concept of an estimation.
//!
//! Descriptive fields and the unit price are copied from the base catalog when the
//! estimation is created, so later catalog changes do not alter billed amounts.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "estimation_details")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Parent estimation
    pub estimation_id: i64,
    pub concept_key: String,
    pub group_number: String,
    /// Cost group (partida) the concept is billed under
    pub group_name: String,
    pub description: String,
    pub unit: String,
    /// Billed quantity
    pub quantity: f64,
    /// Consolidated unit price at creation time
    pub unit_price: f64,
    /// `quantity * unit_price`
    pub subtotal: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each detail belongs to one estimation
    #[sea_orm(
        belongs_to = "super::estimation::Entity",
        from = "Column::EstimationId",
        to = "super::estimation::Column::Id"
    )]
    Estimation,
}

impl Related<super::estimation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Estimation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
