//! Estimations - Billing executed work against the base catalog.
//!
//! An estimation prices the billed quantities at the consolidated unit price of
//! each concept and adds VAT. Extraordinary concepts can be billed only once
//! approved. Each estimation may amortize part of the contract's advance payment;
//! the balance left to amortize never drops below zero.

use crate::{
    core::{
        catalog::original_version,
        consolidation::{ConsolidatedConcept, consolidate},
        contract::{contract_totals, require_contract, round_cents},
        progress::UNGROUPED,
        status::{ConceptStatus, is_extraordinary},
    },
    entities::{CatalogConcept, Estimation, EstimationDetail, estimation, estimation_detail},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, instrument};

/// Quantity of one concept key to bill.
#[derive(Clone, Debug, PartialEq)]
pub struct EstimationEntry {
    pub concept_key: String,
    pub quantity: f64,
}

/// Header and billed quantities of a new estimation.
#[derive(Clone, Debug, PartialEq)]
pub struct NewEstimation {
    pub estimation_date: NaiveDate,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub comment: Option<String>,
    pub entries: Vec<EstimationEntry>,
}

impl NewEstimation {
    /// An estimation dated `estimation_date` without period or comment.
    #[must_use]
    pub fn dated(estimation_date: NaiveDate, entries: Vec<EstimationEntry>) -> Self {
        Self {
            estimation_date,
            period_start: None,
            period_end: None,
            comment: None,
            entries,
        }
    }
}

/// Billable concepts of one cost group.
#[derive(Clone, Debug, PartialEq)]
pub struct EstimableGroup {
    pub group_name: String,
    /// Sorted by key
    pub concepts: Vec<ConsolidatedConcept>,
}

/// Billed amount of one cost group next to its original contract amount.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupEstimate {
    pub group_name: String,
    /// Sum of the original catalog subtotals of the group
    pub original_amount: f64,
    pub estimated_amount: f64,
    pub details: Vec<estimation_detail::Model>,
}

/// An estimation with its details grouped by cost group.
#[derive(Clone, Debug, PartialEq)]
pub struct EstimationSummary {
    pub estimation: estimation::Model,
    /// Sorted by group name
    pub groups: Vec<GroupEstimate>,
}

/// Advance-payment position of one estimation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Amortization {
    pub advance_percentage: f64,
    /// Advance without VAT, derived from the original catalog
    pub advance_subtotal: f64,
    pub advance_vat: f64,
    pub advance_total: f64,
    /// Amortized by the earlier estimations of the contract
    pub amortized: f64,
    /// `advance_subtotal - amortized`, never below zero
    pub balance: f64,
    pub balance_vat: f64,
    pub balance_total: f64,
    /// Stored amortization, or the whole balance when none is stored yet
    pub amount: f64,
    pub amount_vat: f64,
    pub amount_total: f64,
}

/// Whether a base catalog concept may be billed.
///
/// Ordinary concepts always can; extraordinary ones only once approved.
#[must_use]
pub fn is_estimable(concept: &ConsolidatedConcept) -> bool {
    !is_extraordinary(&concept.concept_key) || concept.status == ConceptStatus::Approved
}

/// Advance left after `amortized` was deducted, rounded to cents and floored at zero.
#[must_use]
pub fn remaining_balance(advance: f64, amortized: f64) -> f64 {
    round_cents(advance - amortized).max(0.0)
}

fn group_label(name: &str) -> String {
    if name.trim().is_empty() {
        UNGROUPED.to_string()
    } else {
        name.to_string()
    }
}

/// Base catalog concepts that can be billed, grouped by cost group.
pub async fn estimable_concepts<C>(db: &C, contract_id: i64) -> Result<Vec<EstimableGroup>>
where
    C: ConnectionTrait,
{
    require_contract(db, contract_id).await?;

    let mut groups: BTreeMap<String, Vec<ConsolidatedConcept>> = BTreeMap::new();
    for concept in consolidate(db, contract_id).await?.into_iter().filter(is_estimable) {
        groups
            .entry(group_label(&concept.group_name))
            .or_default()
            .push(concept);
    }

    Ok(groups
        .into_iter()
        .map(|(group_name, mut concepts)| {
            concepts.sort_by(|a, b| a.concept_key.cmp(&b.concept_key));
            EstimableGroup {
                group_name,
                concepts,
            }
        })
        .collect())
}

/// Creates the next estimation of a contract.
///
/// Estimations are numbered per contract in creation order. Each entry is priced
/// at the consolidated unit price of its key; VAT is rounded to cents. The
/// amortization stays unset until [`set_amortization`] stores one.
///
/// # Errors
/// - `ContractNotFound` if the contract does not exist
/// - `ConceptNotEstimable` if a key is not in the base catalog, or is an
///   extraordinary concept that is not approved
/// - `InvalidAmount` if a quantity is not finite
#[instrument(skip(db, input))]
pub async fn create_estimation(
    db: &DatabaseConnection,
    contract_id: i64,
    input: NewEstimation,
    vat_rate: f64,
) -> Result<estimation::Model> {
    if let Some(entry) = input.entries.iter().find(|e| !e.quantity.is_finite()) {
        return Err(Error::InvalidAmount {
            amount: entry.quantity,
        });
    }

    let txn = db.begin().await?;
    require_contract(&txn, contract_id).await?;

    let catalog: HashMap<String, ConsolidatedConcept> = consolidate(&txn, contract_id)
        .await?
        .into_iter()
        .filter(is_estimable)
        .map(|concept| (concept.concept_key.clone(), concept))
        .collect();

    let previous = Estimation::find()
        .filter(estimation::Column::ContractId.eq(contract_id))
        .count(&txn)
        .await?;

    let created = estimation::ActiveModel {
        contract_id: Set(contract_id),
        number: Set(i32::try_from(previous + 1).unwrap_or(i32::MAX)),
        estimation_date: Set(input.estimation_date),
        period_start: Set(input.period_start),
        period_end: Set(input.period_end),
        comment: Set(input.comment),
        subtotal: Set(0.0),
        vat: Set(0.0),
        total: Set(0.0),
        amortization: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut subtotal = 0.0;
    for entry in &input.entries {
        let concept = catalog
            .get(&entry.concept_key)
            .ok_or_else(|| Error::ConceptNotEstimable {
                contract_id,
                key: entry.concept_key.clone(),
            })?;
        let line = entry.quantity * concept.unit_price;
        subtotal += line;

        estimation_detail::ActiveModel {
            estimation_id: Set(created.id),
            concept_key: Set(concept.concept_key.clone()),
            group_number: Set(concept.group_number.clone()),
            group_name: Set(concept.group_name.clone()),
            description: Set(concept.description.clone()),
            unit: Set(concept.unit.clone()),
            quantity: Set(entry.quantity),
            unit_price: Set(concept.unit_price),
            subtotal: Set(line),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    let vat = round_cents(subtotal * vat_rate);
    let mut active: estimation::ActiveModel = created.into();
    active.subtotal = Set(subtotal);
    active.vat = Set(vat);
    active.total = Set(subtotal + vat);
    let stored = active.update(&txn).await?;

    txn.commit().await?;
    info!(
        "Created estimation #{} for contract {} ({} concepts, total {:.2})",
        stored.number,
        contract_id,
        input.entries.len(),
        stored.total
    );
    Ok(stored)
}

/// Finds an estimation by id, failing with `EstimationNotFound` when absent.
pub async fn get_estimation<C>(db: &C, estimation_id: i64) -> Result<estimation::Model>
where
    C: ConnectionTrait,
{
    Estimation::find_by_id(estimation_id)
        .one(db)
        .await?
        .ok_or(Error::EstimationNotFound { id: estimation_id })
}

/// Lists the estimations of a contract by number.
pub async fn list_estimations(
    db: &DatabaseConnection,
    contract_id: i64,
) -> Result<Vec<estimation::Model>> {
    require_contract(db, contract_id).await?;

    Estimation::find()
        .filter(estimation::Column::ContractId.eq(contract_id))
        .order_by_asc(estimation::Column::Number)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Original contract amount per cost group, from the contract's original catalog.
///
/// Empty when the contract has no original version.
pub async fn original_amounts_by_group<C>(
    db: &C,
    contract_id: i64,
) -> Result<HashMap<String, f64>>
where
    C: ConnectionTrait,
{
    let Some(original) = original_version(db, contract_id).await? else {
        return Ok(HashMap::new());
    };

    let mut amounts = HashMap::new();
    for concept in original.find_related(CatalogConcept).all(db).await? {
        *amounts.entry(group_label(&concept.group_name)).or_insert(0.0) += concept.subtotal;
    }
    Ok(amounts)
}

/// Loads an estimation with its details grouped by cost group.
pub async fn estimation_summary(
    db: &DatabaseConnection,
    estimation_id: i64,
) -> Result<EstimationSummary> {
    let estimation = get_estimation(db, estimation_id).await?;
    let details = estimation
        .find_related(EstimationDetail)
        .order_by_asc(estimation_detail::Column::ConceptKey)
        .all(db)
        .await?;
    let originals = original_amounts_by_group(db, estimation.contract_id).await?;

    let mut groups: BTreeMap<String, GroupEstimate> = BTreeMap::new();
    for detail in details {
        let group_name = group_label(&detail.group_name);
        let group = groups
            .entry(group_name.clone())
            .or_insert_with(|| GroupEstimate {
                original_amount: originals.get(&group_name).copied().unwrap_or(0.0),
                group_name,
                estimated_amount: 0.0,
                details: Vec::new(),
            });
        group.estimated_amount += detail.subtotal;
        group.details.push(detail);
    }

    Ok(EstimationSummary {
        estimation,
        groups: groups.into_values().collect(),
    })
}

/// Computes the advance-payment position of an estimation.
///
/// The advance comes from the contract's original catalog. Only estimations with
/// a lower number count as already amortized.
pub async fn amortization(
    db: &DatabaseConnection,
    estimation_id: i64,
    vat_rate: f64,
) -> Result<Amortization> {
    let estimation = get_estimation(db, estimation_id).await?;
    let contract = require_contract(db, estimation.contract_id).await?;
    let totals = contract_totals(db, contract.id, vat_rate).await?;

    let amortized: f64 = Estimation::find()
        .filter(estimation::Column::ContractId.eq(contract.id))
        .filter(estimation::Column::Number.lt(estimation.number))
        .all(db)
        .await?
        .iter()
        .filter_map(|e| e.amortization)
        .sum();

    let balance = remaining_balance(totals.advance_subtotal, amortized);
    let balance_vat = round_cents(balance * vat_rate);
    let amount = estimation.amortization.unwrap_or(balance);
    let amount_vat = round_cents(amount * vat_rate);
    debug!(
        "Estimation #{} of contract {}: amortized {:.2}, balance {:.2}",
        estimation.number, contract.id, amortized, balance
    );

    Ok(Amortization {
        advance_percentage: contract.advance_percentage,
        advance_subtotal: totals.advance_subtotal,
        advance_vat: totals.advance_vat,
        advance_total: totals.advance_total,
        amortized,
        balance,
        balance_vat,
        balance_total: balance + balance_vat,
        amount,
        amount_vat,
        amount_total: amount + amount_vat,
    })
}

/// Stores the advance amount an estimation amortizes.
///
/// # Errors
/// - `EstimationNotFound` if the estimation does not exist
/// - `InvalidAmount` if the amount is negative or not finite
pub async fn set_amortization(
    db: &DatabaseConnection,
    estimation_id: i64,
    amount: f64,
) -> Result<estimation::Model> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount { amount });
    }

    let existing = get_estimation(db, estimation_id).await?;
    let mut active: estimation::ActiveModel = existing.into();
    active.amortization = Set(Some(amount));
    let updated = active.update(db).await?;

    info!(
        "Estimation #{} of contract {} amortizes {:.2}",
        updated.number, updated.contract_id, amount
    );
    Ok(updated)
}

/// Deletes an estimation and its details.
pub async fn delete_estimation(db: &DatabaseConnection, estimation_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let existing = get_estimation(&txn, estimation_id).await?;

    EstimationDetail::delete_many()
        .filter(estimation_detail::Column::EstimationId.eq(estimation_id))
        .exec(&txn)
        .await?;
    Estimation::delete_by_id(estimation_id).exec(&txn).await?;

    txn.commit().await?;
    info!(
        "Deleted estimation #{} of contract {}",
        existing.number, existing.contract_id
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::{entities::catalog_concept, test_utils::*};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn entry(key: &str, quantity: f64) -> EstimationEntry {
        EstimationEntry {
            concept_key: key.to_string(),
            quantity,
        }
    }

    #[test]
    fn test_remaining_balance() {
        assert_eq!(remaining_balance(300.0, 250.0), 50.0);
        assert_eq!(remaining_balance(100.0, 33.333), 66.67);
        assert_eq!(remaining_balance(300.0, 420.0), 0.0);
        assert_eq!(remaining_balance(300.0, 299.999), 0.0);
    }

    #[tokio::test]
    async fn test_only_approved_extraordinaries_are_estimable() -> Result<()> {
        let (db, contract) = setup_with_contract().await?;
        let original = insert_test_version(&db, contract.id, "original").await?;
        insert_test_concept(&db, original.id, "A1", 100.0, 10.0, None).await?;
        insert_test_concept(&db, original.id, "E1", 80.0, 1.0, Some("E")).await?;
        insert_test_concept(&db, original.id, "E2", 50.0, 2.0, Some("A")).await?;
        insert_test_concept(&db, original.id, "E3", 70.0, 1.0, Some("R1")).await?;

        let groups = estimable_concepts(&db, contract.id).await?;
        assert_eq!(groups.len(), 1);
        let keys: Vec<&str> = groups[0]
            .concepts
            .iter()
            .map(|c| c.concept_key.as_str())
            .collect();
        assert_eq!(keys, vec!["A1", "E2"]);

        let rejected = create_estimation(
            &db,
            contract.id,
            NewEstimation::dated(date(1), vec![entry("A1", 1.0), entry("E1", 1.0)]),
            0.16,
        )
        .await;
        assert!(matches!(
            rejected,
            Err(Error::ConceptNotEstimable { contract_id: _, key }) if key == "E1"
        ));
        assert!(list_estimations(&db, contract.id).await?.is_empty());

        let created = create_estimation(
            &db,
            contract.id,
            NewEstimation::dated(date(1), vec![entry("A1", 4.0), entry("E2", 1.0)]),
            0.16,
        )
        .await?;
        assert_eq!(created.subtotal, 450.0);
        assert_eq!(created.vat, 72.0);
        assert_eq!(created.total, 522.0);
        assert_eq!(created.amortization, None);

        Ok(())
    }

    #[tokio::test]
    async fn test_create_estimation_uses_consolidated_price() -> Result<()> {
        let (db, contract) = setup_with_contract().await?;
        let original = insert_test_version(&db, contract.id, "original").await?;
        insert_test_concept(&db, original.id, "A1", 100.0, 10.0, None).await?;
        let amended = insert_test_version(&db, contract.id, "amended").await?;
        insert_test_concept(&db, amended.id, "A1", 120.0, 10.0, None).await?;

        let created = create_estimation(
            &db,
            contract.id,
            NewEstimation::dated(date(2), vec![entry("A1", 2.5)]),
            0.16,
        )
        .await?;
        assert_eq!(created.subtotal, 300.0);

        let summary = estimation_summary(&db, created.id).await?;
        let detail = &summary.groups[0].details[0];
        assert_eq!(detail.unit_price, 120.0);
        assert_eq!(detail.quantity, 2.5);
        assert_eq!(detail.group_name, "Preliminaries");

        let result = create_estimation(
            &db,
            contract.id,
            NewEstimation::dated(date(2), vec![entry("A1", f64::INFINITY)]),
            0.16,
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount: _ })));

        let empty = NewEstimation::dated(date(2), Vec::new());
        let result = create_estimation(&db, 999, empty, 0.16).await;
        assert!(matches!(result, Err(Error::ContractNotFound { id: 999 })));

        Ok(())
    }

    #[tokio::test]
    async fn test_estimations_are_numbered_per_contract() -> Result<()> {
        let (db, contract) = setup_with_contract().await?;
        let other = create_test_contract(&db, "Other").await?;
        for c in [&contract, &other] {
            let version = insert_test_version(&db, c.id, "original").await?;
            insert_test_concept(&db, version.id, "A1", 10.0, 10.0, None).await?;
        }

        let first = create_estimation(
            &db,
            contract.id,
            NewEstimation::dated(date(1), vec![entry("A1", 1.0)]),
            0.16,
        )
        .await?;
        let theirs = create_estimation(
            &db,
            other.id,
            NewEstimation::dated(date(2), vec![entry("A1", 1.0)]),
            0.16,
        )
        .await?;
        let second = create_estimation(
            &db,
            contract.id,
            NewEstimation::dated(date(3), vec![entry("A1", 2.0)]),
            0.16,
        )
        .await?;

        assert_eq!(first.number, 1);
        assert_eq!(second.number, 2);
        assert_eq!(theirs.number, 1);

        let listed: Vec<i32> = list_estimations(&db, contract.id)
            .await?
            .iter()
            .map(|e| e.number)
            .collect();
        assert_eq!(listed, vec![1, 2]);

        Ok(())
    }

    #[tokio::test]
    async fn test_amortization_balance_never_goes_negative() -> Result<()> {
        let (db, contract) = setup_with_contract().await?;
        let original = insert_test_version(&db, contract.id, "original").await?;
        insert_test_concept(&db, original.id, "A1", 100.0, 10.0, None).await?;

        let mut ids = Vec::new();
        for day in 1..=3 {
            let created = create_estimation(
                &db,
                contract.id,
                NewEstimation::dated(date(day), vec![entry("A1", 1.0)]),
                0.16,
            )
            .await?;
            ids.push(created.id);
        }

        // Test contracts carry a 30% advance over a 1000.00 original catalog
        let first = amortization(&db, ids[0], 0.16).await?;
        assert_eq!(first.advance_subtotal, 300.0);
        assert_eq!(first.amortized, 0.0);
        assert_eq!(first.balance, 300.0);
        assert_eq!(first.amount, 300.0);

        set_amortization(&db, ids[0], 250.0).await?;
        let second = amortization(&db, ids[1], 0.16).await?;
        assert_eq!(second.amortized, 250.0);
        assert_eq!(second.balance, 50.0);
        assert_eq!(second.balance_vat, 8.0);
        assert_eq!(second.amount, 50.0);
        assert_eq!(second.amount_total, 58.0);

        set_amortization(&db, ids[1], 120.0).await?;
        let third = amortization(&db, ids[2], 0.16).await?;
        assert_eq!(third.amortized, 370.0);
        assert_eq!(third.balance, 0.0);
        assert_eq!(third.balance_total, 0.0);
        assert_eq!(third.amount, 0.0);

        let result = set_amortization(&db, ids[2], -1.0).await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount: _ })));
        let result = amortization(&db, 999, 0.16).await;
        assert!(matches!(result, Err(Error::EstimationNotFound { id: 999 })));

        Ok(())
    }

    #[tokio::test]
    async fn test_estimation_summary_groups_with_original_amounts() -> Result<()> {
        let (db, contract) = setup_with_contract().await?;
        let original = insert_test_version(&db, contract.id, "original").await?;
        insert_test_concept(&db, original.id, "A1", 100.0, 10.0, None).await?;
        let b1 = insert_test_concept(&db, original.id, "B1", 20.0, 5.0, None).await?;
        let mut active: catalog_concept::ActiveModel = b1.into();
        active.group_name = Set("Structure".to_string());
        active.update(&db).await?;

        let created = create_estimation(
            &db,
            contract.id,
            NewEstimation::dated(date(4), vec![entry("B1", 5.0), entry("A1", 2.0)]),
            0.16,
        )
        .await?;

        let summary = estimation_summary(&db, created.id).await?;
        assert_eq!(summary.estimation, created);
        assert_eq!(summary.groups.len(), 2);

        let preliminaries = &summary.groups[0];
        assert_eq!(preliminaries.group_name, "Preliminaries");
        assert_eq!(preliminaries.original_amount, 1000.0);
        assert_eq!(preliminaries.estimated_amount, 200.0);

        let structure = &summary.groups[1];
        assert_eq!(structure.group_name, "Structure");
        assert_eq!(structure.original_amount, 100.0);
        assert_eq!(structure.estimated_amount, 100.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_estimation_removes_details() -> Result<()> {
        let (db, contract) = setup_with_contract().await?;
        let original = insert_test_version(&db, contract.id, "original").await?;
        insert_test_concept(&db, original.id, "A1", 100.0, 10.0, None).await?;

        let created = create_estimation(
            &db,
            contract.id,
            NewEstimation::dated(date(5), vec![entry("A1", 1.0)]),
            0.16,
        )
        .await?;
        delete_estimation(&db, created.id).await?;

        assert!(list_estimations(&db, contract.id).await?.is_empty());
        assert_eq!(EstimationDetail::find().count(&db).await?, 0);

        let missing = delete_estimation(&db, created.id).await;
        assert!(matches!(missing, Err(Error::EstimationNotFound { id: _ })));

        Ok(())
    }
}
