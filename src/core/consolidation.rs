//! Base catalog consolidation - Folds every catalog version of a contract into one
//! logical catalog with a single entry per concept key.
//!
//! Versions are applied oldest first and later rows overwrite earlier ones, except
//! that an extraordinary concept that has reached the approved state is never
//! regressed by a later row still in elaboration or revision. Rows without a key
//! cannot be tracked across versions and are dropped.

use crate::{
    core::status::{ConceptStatus, is_extraordinary},
    entities::{CatalogConcept, CatalogVersion, catalog_concept, catalog_version},
    errors::Result,
};
use sea_orm::{QueryOrder, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

/// One entry of the consolidated (base) catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedConcept {
    /// Row the entry was taken from
    pub concept_id: i64,
    /// Version that row belongs to
    pub version_id: i64,
    pub group_number: String,
    pub group_name: String,
    pub concept_key: String,
    pub description: String,
    pub unit: String,
    pub unit_price: f64,
    pub quantity: f64,
    /// Always `unit_price * quantity`, whatever the source row stored
    pub subtotal: f64,
    pub status: ConceptStatus,
}

impl ConsolidatedConcept {
    fn from_row(row: &catalog_concept::Model, key: &str, status: ConceptStatus) -> Self {
        Self {
            concept_id: row.id,
            version_id: row.version_id,
            group_number: row.group_number.clone(),
            group_name: row.group_name.clone(),
            concept_key: key.to_string(),
            description: row.description.clone(),
            unit: row.unit.clone(),
            unit_price: row.unit_price,
            quantity: row.quantity,
            subtotal: row.unit_price * row.quantity,
            status,
        }
    }
}

/// Outcome of merging one incoming row into the accumulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeDecision {
    /// Leave the accumulated entry untouched
    KeepExisting,
    /// Replace (or insert) the entry with the incoming row
    Overwrite,
}

/// Decides how an incoming row for `key` merges with the accumulated entry, if any.
#[must_use]
pub fn merge_decision(
    key: &str,
    existing: Option<ConceptStatus>,
    incoming: ConceptStatus,
) -> MergeDecision {
    match existing {
        Some(ConceptStatus::Approved) if is_extraordinary(key) && incoming.is_pending() => {
            MergeDecision::KeepExisting
        }
        _ => MergeDecision::Overwrite,
    }
}

pub(crate) fn row_status(row: &catalog_concept::Model) -> ConceptStatus {
    ConceptStatus::from_stored(row.status.as_deref()).unwrap_or_else(|e| {
        warn!(
            "Concept row {} has an unreadable status ({}), treating it as approved",
            row.id, e
        );
        ConceptStatus::Approved
    })
}

/// Folds concept rows, given in version creation order, into the consolidated catalog.
///
/// The result happens to be sorted by key; callers needing a specific order should
/// still sort explicitly.
pub fn consolidate_rows<'a, I>(rows: I) -> Vec<ConsolidatedConcept>
where
    I: IntoIterator<Item = &'a catalog_concept::Model>,
{
    let mut accumulated: BTreeMap<String, ConsolidatedConcept> = BTreeMap::new();

    for row in rows {
        let Some(key) = row.concept_key.as_deref().filter(|k| !k.is_empty()) else {
            debug!("Dropping concept row {} without a key", row.id);
            continue;
        };
        let status = row_status(row);
        let existing = accumulated.get(key).map(|entry| entry.status);

        match merge_decision(key, existing, status) {
            MergeDecision::KeepExisting => {
                debug!(
                    "Keeping approved extraordinary concept '{}' over row {} ({})",
                    key, row.id, status
                );
            }
            MergeDecision::Overwrite => {
                accumulated.insert(
                    key.to_string(),
                    ConsolidatedConcept::from_row(row, key, status),
                );
            }
        }
    }

    accumulated.into_values().collect()
}

/// Consolidates all catalog versions of a contract into its base catalog.
///
/// Returns an empty list when the contract has no versions. Reads only, so it can
/// run on a connection or inside an open transaction.
#[instrument(skip(db))]
pub async fn consolidate<C>(db: &C, contract_id: i64) -> Result<Vec<ConsolidatedConcept>>
where
    C: ConnectionTrait,
{
    let version_ids: Vec<i64> = CatalogVersion::find()
        .filter(catalog_version::Column::ContractId.eq(contract_id))
        .order_by_asc(catalog_version::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(|version| version.id)
        .collect();

    if version_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = CatalogConcept::find()
        .filter(catalog_concept::Column::VersionId.is_in(version_ids.clone()))
        .order_by_asc(catalog_concept::Column::VersionId)
        .order_by_asc(catalog_concept::Column::Id)
        .all(db)
        .await?;

    let concepts = consolidate_rows(&rows);
    debug!(
        "Consolidated {} rows from {} versions into {} concepts",
        rows.len(),
        version_ids.len(),
        concepts.len()
    );
    Ok(concepts)
}
