//! Estimation entity - A numbered billing of executed work priced at the base catalog.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Estimation database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "estimations")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Contract being billed
    pub contract_id: i64,
    /// Per-contract sequence number (1, 2, ...)
    pub number: i32,
    /// Issue date
    pub estimation_date: Date,
    /// First day of the billed work period
    pub period_start: Option<Date>,
    /// Last day of the billed work period
    pub period_end: Option<Date>,
    pub comment: Option<String>,
    /// Sum of the detail subtotals
    pub subtotal: f64,
    pub vat: f64,
    /// `subtotal + vat`
    pub total: f64,
    /// Advance amount deducted by this estimation, unset until chosen
    pub amortization: Option<f64>,
}

/// Defines relationships between Estimation and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each estimation belongs to one contract
    #[sea_orm(
        belongs_to = "super::contract::Entity",
        from = "Column::ContractId",
        to = "super::contract::Column::Id"
    )]
    Contract,
    /// One estimation has many details
    #[sea_orm(has_many = "super::estimation_detail::Entity")]
    Details,
}

impl Related<super::contract::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contract.def()
    }
}

impl Related<super::estimation_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Details.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
