//! Contract business logic - Creation, lookup, state changes and original totals.

use crate::{
    core::status::{ContractState, VersionKind},
    entities::{CatalogConcept, CatalogVersion, Contract, catalog_version, contract},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::info;

/// Amounts of the original catalog and the advance payment derived from it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContractTotals {
    /// Sum of the original version's subtotals
    pub subtotal: f64,
    pub vat: f64,
    pub total: f64,
    /// `subtotal * advance_percentage / 100`
    pub advance_subtotal: f64,
    pub advance_vat: f64,
    pub advance_total: f64,
}

/// Rounds to cents.
#[must_use]
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Creates a new open contract.
///
/// # Errors
/// Returns an error if:
/// - The name or code is empty or whitespace-only
/// - The advance percentage is negative or not finite
/// - The database insert fails
pub async fn create_contract(
    db: &DatabaseConnection,
    name: String,
    code: String,
    advance_percentage: f64,
) -> Result<contract::Model> {
    if name.trim().is_empty() || code.trim().is_empty() {
        return Err(Error::Config {
            message: "Contract name and code cannot be empty".to_string(),
        });
    }

    if !advance_percentage.is_finite() || advance_percentage < 0.0 {
        return Err(Error::InvalidAmount {
            amount: advance_percentage,
        });
    }

    let contract = contract::ActiveModel {
        name: Set(name.trim().to_string()),
        code: Set(code.trim().to_string()),
        state: Set(ContractState::Open.as_str().to_string()),
        advance_percentage: Set(advance_percentage),
        ..Default::default()
    };

    let created = contract.insert(db).await?;
    info!("Created contract {} ({})", created.id, created.code);
    Ok(created)
}

/// Finds a contract by id.
pub async fn get_contract<C>(db: &C, contract_id: i64) -> Result<Option<contract::Model>>
where
    C: ConnectionTrait,
{
    Contract::find_by_id(contract_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a contract by id, failing with `ContractNotFound` when absent.
pub async fn require_contract<C>(db: &C, contract_id: i64) -> Result<contract::Model>
where
    C: ConnectionTrait,
{
    get_contract(db, contract_id)
        .await?
        .ok_or(Error::ContractNotFound { id: contract_id })
}

/// Lists all contracts ordered by code.
pub async fn list_contracts(db: &DatabaseConnection) -> Result<Vec<contract::Model>> {
    Contract::find()
        .order_by_asc(contract::Column::Code)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Opens or closes a contract.
pub async fn set_contract_state(
    db: &DatabaseConnection,
    contract_id: i64,
    state: ContractState,
) -> Result<contract::Model> {
    let existing = require_contract(db, contract_id).await?;

    let mut active: contract::ActiveModel = existing.into();
    active.state = Set(state.as_str().to_string());
    let updated = active.update(db).await?;

    info!("Contract {} is now {}", contract_id, state);
    Ok(updated)
}

/// Computes original catalog totals and the advance payment of a contract.
///
/// A contract without an original catalog yields all-zero totals.
pub async fn contract_totals(
    db: &DatabaseConnection,
    contract_id: i64,
    vat_rate: f64,
) -> Result<ContractTotals> {
    let contract = require_contract(db, contract_id).await?;

    let Some(original) = CatalogVersion::find()
        .filter(catalog_version::Column::ContractId.eq(contract_id))
        .filter(catalog_version::Column::Kind.eq(VersionKind::Original.as_str()))
        .order_by_asc(catalog_version::Column::Id)
        .one(db)
        .await?
    else {
        return Ok(ContractTotals::default());
    };

    let subtotal: f64 = original
        .find_related(CatalogConcept)
        .all(db)
        .await?
        .iter()
        .map(|c| c.subtotal)
        .sum();

    let vat = round_cents(subtotal * vat_rate);
    let advance_subtotal = round_cents(subtotal * (contract.advance_percentage / 100.0));
    let advance_vat = round_cents(advance_subtotal * vat_rate);

    Ok(ContractTotals {
        subtotal,
        vat,
        total: subtotal + vat,
        advance_subtotal,
        advance_vat,
        advance_total: advance_subtotal + advance_vat,
    })
}
