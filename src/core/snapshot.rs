//! Base catalog snapshots - Versioned, content-addressed copies of the consolidated
//! catalog.
//!
//! The consolidated concept list is canonicalized (sorted by key, serialized to JSON
//! with a fixed field order) and hashed with SHA-256. A new snapshot row is written
//! only when that digest differs from the latest one stored for the contract, or when
//! the caller forces it. Correctness never depends on a snapshot existing; it is an
//! optimization plus an audit trail of when the consolidated catalog changed.

use crate::{
    core::consolidation::{ConsolidatedConcept, consolidate},
    entities::{CatalogSnapshot, catalog_snapshot},
    errors::Result,
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

/// Serializes concepts in canonical form: sorted by key, stable field order.
pub fn canonical_json(concepts: &[ConsolidatedConcept]) -> Result<String> {
    let mut sorted: Vec<&ConsolidatedConcept> = concepts.iter().collect();
    sorted.sort_by(|a, b| a.concept_key.cmp(&b.concept_key));
    serde_json::to_string(&sorted).map_err(Into::into)
}

/// Hex-encoded SHA-256 digest of the given bytes.
#[must_use]
pub fn content_hash(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Gets the most recent snapshot (highest version) for a contract.
pub async fn latest_snapshot<C>(db: &C, contract_id: i64) -> Result<Option<catalog_snapshot::Model>>
where
    C: ConnectionTrait,
{
    CatalogSnapshot::find()
        .filter(catalog_snapshot::Column::ContractId.eq(contract_id))
        .order_by_desc(catalog_snapshot::Column::Version)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists all snapshots of a contract, newest version first.
pub async fn list_snapshots(
    db: &DatabaseConnection,
    contract_id: i64,
) -> Result<Vec<catalog_snapshot::Model>> {
    CatalogSnapshot::find()
        .filter(catalog_snapshot::Column::ContractId.eq(contract_id))
        .order_by_desc(catalog_snapshot::Column::Version)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Parses the stored concept list of a snapshot.
pub fn decode_snapshot(snapshot: &catalog_snapshot::Model) -> Result<Vec<ConsolidatedConcept>> {
    serde_json::from_str(&snapshot.concepts_json).map_err(Into::into)
}

/// Stores a new snapshot of the consolidated catalog if its content changed.
///
/// Returns `None` when the contract has nothing to consolidate. With `force == false`
/// and an unchanged digest, the latest stored snapshot is returned as is; otherwise a
/// new snapshot with the next version number is written. The read and the insert
/// run in one transaction.
#[instrument(skip(db))]
pub async fn snapshot_if_changed(
    db: &DatabaseConnection,
    contract_id: i64,
    force: bool,
) -> Result<Option<catalog_snapshot::Model>> {
    let txn = db.begin().await?;

    let concepts = consolidate(&txn, contract_id).await?;
    if concepts.is_empty() {
        debug!("Contract {} has no consolidated concepts to snapshot", contract_id);
        return Ok(None);
    }

    let contents = canonical_json(&concepts)?;
    let digest = content_hash(contents.as_bytes());

    let latest = latest_snapshot(&txn, contract_id).await?;
    if let Some(existing) = latest.as_ref().filter(|s| !force && s.content_hash == digest) {
        debug!(
            "Consolidated catalog of contract {} unchanged, reusing snapshot v{}",
            contract_id, existing.version
        );
        return Ok(latest);
    }

    let next_version = latest.map_or(1, |s| s.version + 1);
    let snapshot = catalog_snapshot::ActiveModel {
        contract_id: Set(contract_id),
        version: Set(next_version),
        content_hash: Set(digest),
        concepts_json: Set(contents),
        generated_on: Set(chrono::Utc::now().date_naive()),
        ..Default::default()
    };
    let stored = snapshot.insert(&txn).await?;
    txn.commit().await?;

    info!(
        "Stored base catalog snapshot v{} for contract {} ({} concepts)",
        stored.version,
        contract_id,
        concepts.len()
    );
    Ok(Some(stored))
}
