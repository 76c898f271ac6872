//! Work progress - Recording executed quantities and comparing them against the
//! latest pre-settlement of a contract.

use crate::{
    core::{
        approval::contract_concepts,
        consolidation::row_status,
        contract::{require_contract, round_cents},
        presettlement::{latest_presettlement, presettlement_details},
        status::{ConceptStatus, is_extraordinary},
    },
    entities::{
        CatalogConcept, CatalogVersion, ProgressDetail, ProgressReport, catalog_concept,
        progress_detail, progress_report,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, instrument};

pub(crate) const UNGROUPED: &str = "Ungrouped";

/// Executed quantity of one concept row.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressEntry {
    pub concept_id: i64,
    pub quantity: f64,
}

/// Catalog, executed and pending amounts of one concept.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressRow {
    pub concept_key: String,
    pub description: String,
    pub unit: String,
    pub unit_price: f64,
    pub catalog_quantity: f64,
    pub progress_quantity: f64,
    pub pending_quantity: f64,
    pub catalog_subtotal: f64,
    pub progress_subtotal: f64,
    pub pending_subtotal: f64,
    /// Status of the latest row carrying the key, if any
    pub status: Option<ConceptStatus>,
}

/// Sums of the catalog, executed and pending subtotals.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProgressTotals {
    pub catalog: f64,
    pub progress: f64,
    pub pending: f64,
}

impl ProgressTotals {
    fn add(&mut self, row: &ProgressRow) {
        self.catalog += row.catalog_subtotal;
        self.progress += row.progress_subtotal;
        self.pending += row.pending_subtotal;
    }

    /// Applies a VAT rate to every amount.
    #[must_use]
    pub fn vat(&self, vat_rate: f64) -> Self {
        Self {
            catalog: round_cents(self.catalog * vat_rate),
            progress: round_cents(self.progress * vat_rate),
            pending: round_cents(self.pending * vat_rate),
        }
    }
}

/// Rows of one cost group.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressGroup {
    pub group_name: String,
    pub rows: Vec<ProgressRow>,
    pub totals: ProgressTotals,
}

/// Pre-settlement versus executed work for a contract.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProgressComparison {
    /// Sorted by group name
    pub groups: Vec<ProgressGroup>,
    pub subtotals: ProgressTotals,
    pub vat: ProgressTotals,
    pub totals: ProgressTotals,
    /// Original amount of the ordinary (non-extraordinary) concepts
    pub original_contract_amount: f64,
    /// `original_contract_amount - subtotals.catalog`
    pub difference: f64,
}

/// Records a progress report with its executed quantities.
///
/// Reports are numbered per contract in creation order. Each detail's subtotal is
/// the quantity priced at the concept's unit price.
///
/// # Errors
/// - `ContractNotFound` if the contract does not exist
/// - `VersionNotFound` if the referenced version belongs to another contract
/// - `ConceptNotFound` if a concept does not exist or belongs to another contract
/// - `InvalidAmount` if a quantity is not finite
#[instrument(skip(db, entries))]
pub async fn record_progress(
    db: &DatabaseConnection,
    contract_id: i64,
    report_date: NaiveDate,
    catalog_version_id: Option<i64>,
    entries: Vec<ProgressEntry>,
) -> Result<progress_report::Model> {
    if let Some(entry) = entries.iter().find(|e| !e.quantity.is_finite()) {
        return Err(Error::InvalidAmount {
            amount: entry.quantity,
        });
    }

    let txn = db.begin().await?;
    require_contract(&txn, contract_id).await?;

    if let Some(version_id) = catalog_version_id {
        CatalogVersion::find_by_id(version_id)
            .one(&txn)
            .await?
            .filter(|v| v.contract_id == contract_id)
            .ok_or(Error::VersionNotFound { id: version_id })?;
    }

    let previous = ProgressReport::find()
        .filter(progress_report::Column::ContractId.eq(contract_id))
        .count(&txn)
        .await?;

    let report = progress_report::ActiveModel {
        contract_id: Set(contract_id),
        report_date: Set(report_date),
        sequence: Set(i32::try_from(previous + 1).unwrap_or(i32::MAX)),
        catalog_version_id: Set(catalog_version_id),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for entry in &entries {
        let concept = contract_concepts(contract_id)
            .filter(catalog_concept::Column::Id.eq(entry.concept_id))
            .one(&txn)
            .await?
            .ok_or(Error::ConceptNotFound {
                id: entry.concept_id,
            })?;

        progress_detail::ActiveModel {
            progress_report_id: Set(report.id),
            concept_id: Set(concept.id),
            quantity: Set(entry.quantity),
            subtotal: Set(entry.quantity * concept.unit_price),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;
    info!(
        "Recorded progress report #{} for contract {} ({} concepts)",
        report.sequence,
        contract_id,
        entries.len()
    );
    Ok(report)
}

/// Accumulated executed quantity per concept key over all reports of a contract.
pub async fn progress_by_concept<C>(db: &C, contract_id: i64) -> Result<BTreeMap<String, f64>>
where
    C: ConnectionTrait,
{
    let report_ids: Vec<i64> = ProgressReport::find()
        .filter(progress_report::Column::ContractId.eq(contract_id))
        .all(db)
        .await?
        .into_iter()
        .map(|r| r.id)
        .collect();

    if report_ids.is_empty() {
        return Ok(BTreeMap::new());
    }

    let details = ProgressDetail::find()
        .filter(progress_detail::Column::ProgressReportId.is_in(report_ids))
        .find_also_related(CatalogConcept)
        .all(db)
        .await?;

    let mut accumulated = BTreeMap::new();
    for (detail, concept) in details {
        if let Some(key) = concept.and_then(|c| c.concept_key) {
            *accumulated.entry(key).or_insert(0.0) += detail.quantity;
        }
    }
    Ok(accumulated)
}

/// Compares the latest pre-settlement of a contract with the work executed so far.
///
/// Returns an empty comparison when the contract has no pre-settlement yet.
pub async fn compare_with_progress(
    db: &DatabaseConnection,
    contract_id: i64,
    vat_rate: f64,
) -> Result<ProgressComparison> {
    require_contract(db, contract_id).await?;

    let Some(presettlement) = latest_presettlement(db, contract_id).await? else {
        return Ok(ProgressComparison::default());
    };
    let details = presettlement_details(db, presettlement.id).await?;
    let executed = progress_by_concept(db, contract_id).await?;

    let latest_status: HashMap<String, ConceptStatus> = contract_concepts(contract_id)
        .order_by_asc(catalog_concept::Column::Id)
        .all(db)
        .await?
        .iter()
        .filter_map(|row| Some((row.concept_key.clone()?, row_status(row))))
        .collect();

    let mut groups: BTreeMap<String, ProgressGroup> = BTreeMap::new();
    let mut comparison = ProgressComparison::default();

    for detail in &details {
        let unit_price = detail.updated_unit_price;
        let catalog_quantity = detail.updated_quantity;
        let progress_quantity = executed.get(&detail.concept_key).copied().unwrap_or(0.0);
        let pending_quantity = catalog_quantity - progress_quantity;

        let row = ProgressRow {
            concept_key: detail.concept_key.clone(),
            description: detail.description.clone(),
            unit: detail.unit.clone(),
            unit_price,
            catalog_quantity,
            progress_quantity,
            pending_quantity,
            catalog_subtotal: catalog_quantity * unit_price,
            progress_subtotal: progress_quantity * unit_price,
            pending_subtotal: pending_quantity * unit_price,
            status: latest_status.get(&detail.concept_key).copied(),
        };

        let group_name = if detail.group_name.trim().is_empty() {
            UNGROUPED.to_string()
        } else {
            detail.group_name.clone()
        };
        let group = groups
            .entry(group_name.clone())
            .or_insert_with(|| ProgressGroup {
                group_name,
                rows: Vec::new(),
                totals: ProgressTotals::default(),
            });
        group.totals.add(&row);
        comparison.subtotals.add(&row);
        group.rows.push(row);

        if !is_extraordinary(&detail.concept_key) {
            comparison.original_contract_amount +=
                detail.original_quantity * detail.original_unit_price;
        }
    }

    comparison.vat = comparison.subtotals.vat(vat_rate);
    comparison.totals = ProgressTotals {
        catalog: comparison.subtotals.catalog + comparison.vat.catalog,
        progress: comparison.subtotals.progress + comparison.vat.progress,
        pending: comparison.subtotals.pending + comparison.vat.pending,
    };
    comparison.difference = comparison.original_contract_amount - comparison.subtotals.catalog;
    comparison.groups = groups.into_values().collect();

    Ok(comparison)
}
