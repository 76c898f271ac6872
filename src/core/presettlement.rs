//! Pre-settlement (prefiniquito) generation - Diffs two catalog versions of a contract
//! into a persisted comparison with one detail row per concept key.
//!
//! Details are produced in ascending key order. Descriptive fields come from the
//! updated side when it has the concept, else from the original side. Stored
//! subtotals are compared as they are, without recomputation. A concept that only
//! exists on the original side is classified as unchanged, not removed.
//!
//! The parent row and all of its details are written in a single transaction.

use crate::{
    core::status::ChangeType,
    entities::{
        CatalogConcept, CatalogVersion, Contract, Presettlement, PresettlementDetail,
        catalog_concept, presettlement, presettlement_detail,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument};

/// One side (original or updated) of a compared concept.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SideValues {
    pub unit_price: f64,
    pub quantity: f64,
    pub subtotal: f64,
}

impl SideValues {
    fn of(concept: Option<&catalog_concept::Model>) -> Self {
        concept.map_or_else(Self::default, |c| Self {
            unit_price: c.unit_price,
            quantity: c.quantity,
            subtotal: c.subtotal,
        })
    }
}

/// Comparison of one concept key across the two versions, before persistence.
#[derive(Clone, Debug, PartialEq)]
pub struct ConceptComparison {
    pub concept_key: String,
    /// Row the descriptive fields were taken from
    pub concept_id: Option<i64>,
    pub group_number: String,
    pub group_name: String,
    pub description: String,
    pub unit: String,
    pub original: SideValues,
    pub updated: SideValues,
    pub quantity_delta: f64,
    pub subtotal_delta: f64,
    pub change_type: ChangeType,
}

/// Result of diffing two concept maps.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CatalogComparison {
    /// One entry per key, ascending
    pub concepts: Vec<ConceptComparison>,
    pub total_original: f64,
    pub total_updated: f64,
}

impl CatalogComparison {
    /// `total_updated - total_original`
    #[must_use]
    pub fn total_difference(&self) -> f64 {
        self.total_updated - self.total_original
    }
}

/// A stored pre-settlement together with its detail rows.
#[derive(Clone, Debug, PartialEq)]
pub struct PresettlementWithDetails {
    pub presettlement: presettlement::Model,
    /// Ordered by concept key
    pub details: Vec<presettlement_detail::Model>,
}

/// Builds a key → concept map; within one version the later row wins.
#[must_use]
pub fn concept_map(rows: Vec<catalog_concept::Model>) -> BTreeMap<String, catalog_concept::Model> {
    let mut map = BTreeMap::new();
    for row in rows {
        match row.concept_key.clone().filter(|k| !k.is_empty()) {
            Some(key) => {
                map.insert(key, row);
            }
            None => debug!("Skipping concept row {} without a key", row.id),
        }
    }
    map
}

#[allow(clippy::float_cmp)] // Exact comparison of stored values is the intended semantics
fn classify(
    original: Option<&catalog_concept::Model>,
    updated: Option<&catalog_concept::Model>,
) -> ChangeType {
    match (original, updated) {
        (Some(orig), Some(act)) => {
            if orig.unit_price != act.unit_price || orig.quantity != act.quantity {
                ChangeType::Modified
            } else {
                ChangeType::Unchanged
            }
        }
        (None, Some(_)) => ChangeType::New,
        // Dropped from the updated catalog: kept as "unchanged"
        (Some(_) | None, None) => ChangeType::Unchanged,
    }
}

/// Diffs two key → concept maps in ascending key order.
#[must_use]
pub fn compare_catalogs(
    original: &BTreeMap<String, catalog_concept::Model>,
    updated: &BTreeMap<String, catalog_concept::Model>,
) -> CatalogComparison {
    let keys: BTreeSet<&String> = original.keys().chain(updated.keys()).collect();
    let mut comparison = CatalogComparison::default();

    for key in keys {
        let orig = original.get(key);
        let act = updated.get(key);
        let source = act.or(orig);

        let original_side = SideValues::of(orig);
        let updated_side = SideValues::of(act);

        comparison.total_original += original_side.subtotal;
        comparison.total_updated += updated_side.subtotal;

        comparison.concepts.push(ConceptComparison {
            concept_key: key.clone(),
            concept_id: source.map(|c| c.id),
            group_number: source.map(|c| c.group_number.clone()).unwrap_or_default(),
            group_name: source.map(|c| c.group_name.clone()).unwrap_or_default(),
            description: source.map(|c| c.description.clone()).unwrap_or_default(),
            unit: source.map(|c| c.unit.clone()).unwrap_or_default(),
            quantity_delta: updated_side.quantity - original_side.quantity,
            subtotal_delta: updated_side.subtotal - original_side.subtotal,
            change_type: classify(orig, act),
            original: original_side,
            updated: updated_side,
        });
    }

    comparison
}

async fn load_version_concepts<C>(
    db: &C,
    contract_id: i64,
    version_id: i64,
) -> Result<BTreeMap<String, catalog_concept::Model>>
where
    C: ConnectionTrait,
{
    let version = CatalogVersion::find_by_id(version_id)
        .one(db)
        .await?
        .filter(|v| v.contract_id == contract_id)
        .ok_or(Error::VersionNotFound { id: version_id })?;

    let rows = version
        .find_related(CatalogConcept)
        .order_by_asc(catalog_concept::Column::Id)
        .all(db)
        .await?;

    Ok(concept_map(rows))
}

/// Generates and stores a pre-settlement comparing two versions of a contract.
///
/// # Errors
/// - `ContractNotFound` if the contract does not exist
/// - `VersionNotFound` if either version does not exist or belongs to another contract
/// - `Database` if any write fails; nothing is persisted in that case
#[instrument(skip(db))]
pub async fn generate(
    db: &DatabaseConnection,
    contract_id: i64,
    original_version_id: i64,
    updated_version_id: i64,
) -> Result<presettlement::Model> {
    let txn = db.begin().await?;

    Contract::find_by_id(contract_id)
        .one(&txn)
        .await?
        .ok_or(Error::ContractNotFound { id: contract_id })?;

    let original = load_version_concepts(&txn, contract_id, original_version_id).await?;
    let updated = load_version_concepts(&txn, contract_id, updated_version_id).await?;
    let comparison = compare_catalogs(&original, &updated);

    let parent = presettlement::ActiveModel {
        contract_id: Set(contract_id),
        original_version_id: Set(original_version_id),
        updated_version_id: Set(updated_version_id),
        generated_on: Set(chrono::Utc::now().date_naive()),
        total_original: Set(comparison.total_original),
        total_updated: Set(comparison.total_updated),
        total_difference: Set(comparison.total_difference()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for concept in &comparison.concepts {
        presettlement_detail::ActiveModel {
            presettlement_id: Set(parent.id),
            concept_id: Set(concept.concept_id),
            group_number: Set(concept.group_number.clone()),
            group_name: Set(concept.group_name.clone()),
            concept_key: Set(concept.concept_key.clone()),
            description: Set(concept.description.clone()),
            unit: Set(concept.unit.clone()),
            original_unit_price: Set(concept.original.unit_price),
            original_quantity: Set(concept.original.quantity),
            original_subtotal: Set(concept.original.subtotal),
            updated_unit_price: Set(concept.updated.unit_price),
            updated_quantity: Set(concept.updated.quantity),
            updated_subtotal: Set(concept.updated.subtotal),
            quantity_delta: Set(concept.quantity_delta),
            subtotal_delta: Set(concept.subtotal_delta),
            change_type: Set(concept.change_type.as_str().to_string()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    info!(
        "Generated pre-settlement {} for contract {} (versions {} -> {}, {} concepts, delta {:.2})",
        parent.id,
        contract_id,
        original_version_id,
        updated_version_id,
        comparison.concepts.len(),
        parent.total_difference
    );
    Ok(parent)
}

/// Gets the authoritative (most recently created) pre-settlement of a contract.
pub async fn latest_presettlement<C>(
    db: &C,
    contract_id: i64,
) -> Result<Option<presettlement::Model>>
where
    C: ConnectionTrait,
{
    Presettlement::find()
        .filter(presettlement::Column::ContractId.eq(contract_id))
        .order_by_desc(presettlement::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists the pre-settlements of a contract, newest first.
pub async fn list_presettlements(
    db: &DatabaseConnection,
    contract_id: i64,
) -> Result<Vec<presettlement::Model>> {
    Presettlement::find()
        .filter(presettlement::Column::ContractId.eq(contract_id))
        .order_by_desc(presettlement::Column::GeneratedOn)
        .order_by_desc(presettlement::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Loads the details of a stored pre-settlement in ascending key order.
pub async fn presettlement_details<C>(
    db: &C,
    presettlement_id: i64,
) -> Result<Vec<presettlement_detail::Model>>
where
    C: ConnectionTrait,
{
    PresettlementDetail::find()
        .filter(presettlement_detail::Column::PresettlementId.eq(presettlement_id))
        .order_by_asc(presettlement_detail::Column::ConceptKey)
        .order_by_asc(presettlement_detail::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Loads a pre-settlement with its details.
pub async fn presettlement_with_details(
    db: &DatabaseConnection,
    presettlement_id: i64,
) -> Result<PresettlementWithDetails> {
    let presettlement = Presettlement::find_by_id(presettlement_id)
        .one(db)
        .await?
        .ok_or(Error::PresettlementNotFound {
            id: presettlement_id,
        })?;
    let details = presettlement_details(db, presettlement_id).await?;

    Ok(PresettlementWithDetails {
        presettlement,
        details,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    /// Original {A1: 1000, A2: 500}, updated {A1: 1200, A3: 300}.
    async fn seed_example(db: &DatabaseConnection, contract_id: i64) -> Result<(i64, i64)> {
        let original = insert_test_version(db, contract_id, "original").await?;
        insert_test_concept(db, original.id, "A1", 100.0, 10.0, None).await?;
        insert_test_concept(db, original.id, "A2", 50.0, 10.0, None).await?;

        let updated = insert_test_version(db, contract_id, "amended").await?;
        insert_test_concept(db, updated.id, "A3", 30.0, 10.0, None).await?;
        insert_test_concept(db, updated.id, "A1", 100.0, 12.0, None).await?;

        Ok((original.id, updated.id))
    }

    #[tokio::test]
    async fn test_generate_totals_and_classification() -> Result<()> {
        let (db, contract) = setup_with_contract().await?;
        let (original_id, updated_id) = seed_example(&db, contract.id).await?;

        let generated = generate(&db, contract.id, original_id, updated_id).await?;
        assert_eq!(generated.total_original, 1500.0);
        assert_eq!(generated.total_updated, 1500.0);
        assert_eq!(generated.total_difference, 0.0);

        let details = presettlement_details(&db, generated.id).await?;
        let keys: Vec<&str> = details.iter().map(|d| d.concept_key.as_str()).collect();
        assert_eq!(keys, vec!["A1", "A2", "A3"]);

        assert_eq!(details[0].change_type, "modified");
        assert_eq!(details[0].subtotal_delta, 200.0);
        assert_eq!(details[0].quantity_delta, 2.0);

        assert_eq!(details[1].change_type, "unchanged");
        assert_eq!(details[1].updated_unit_price, 0.0);
        assert_eq!(details[1].updated_quantity, 0.0);
        assert_eq!(details[1].updated_subtotal, 0.0);
        assert_eq!(details[1].subtotal_delta, -500.0);

        assert_eq!(details[2].change_type, "new");
        assert_eq!(details[2].subtotal_delta, 300.0);
        assert_eq!(details[2].original_subtotal, 0.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_generate_uses_stored_subtotals() -> Result<()> {
        let (db, contract) = setup_with_contract().await?;
        let original = insert_test_version(&db, contract.id, "original").await?;
        let row = insert_test_concept(&db, original.id, "A1", 10.0, 1.0, None).await?;
        let updated = insert_test_version(&db, contract.id, "amended").await?;
        insert_test_concept(&db, updated.id, "A1", 10.0, 1.0, None).await?;

        // Source spreadsheet supplied a subtotal that disagrees with price * quantity
        let mut active: catalog_concept::ActiveModel = row.into();
        active.subtotal = Set(99.0);
        active.update(&db).await?;

        let generated = generate(&db, contract.id, original.id, updated.id).await?;
        assert_eq!(generated.total_original, 99.0);

        let details = presettlement_details(&db, generated.id).await?;
        assert_eq!(details[0].change_type, "unchanged");
        assert_eq!(details[0].subtotal_delta, -89.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_generate_last_row_wins_within_version() -> Result<()> {
        let (db, contract) = setup_with_contract().await?;
        let original = insert_test_version(&db, contract.id, "original").await?;
        insert_test_concept(&db, original.id, "A1", 10.0, 1.0, None).await?;
        insert_test_concept(&db, original.id, "A1", 20.0, 1.0, None).await?;
        let updated = insert_test_version(&db, contract.id, "amended").await?;
        insert_test_concept(&db, updated.id, "A1", 20.0, 1.0, None).await?;

        let generated = generate(&db, contract.id, original.id, updated.id).await?;
        let details = presettlement_details(&db, generated.id).await?;
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].original_unit_price, 20.0);
        assert_eq!(details[0].change_type, "unchanged");

        Ok(())
    }

    #[tokio::test]
    async fn test_generate_descriptive_fields_prefer_updated_side() -> Result<()> {
        let (db, contract) = setup_with_contract().await?;
        let original = insert_test_version(&db, contract.id, "original").await?;
        insert_test_concept(&db, original.id, "A1", 10.0, 1.0, None).await?;
        let updated = insert_test_version(&db, contract.id, "amended").await?;
        let newer = insert_test_concept(&db, updated.id, "A1", 11.0, 1.0, None).await?;

        let generated = generate(&db, contract.id, original.id, updated.id).await?;
        let details = presettlement_details(&db, generated.id).await?;
        assert_eq!(details[0].concept_id, Some(newer.id));
        assert_eq!(details[0].description, newer.description);

        Ok(())
    }

    #[tokio::test]
    async fn test_generate_missing_contract() -> Result<()> {
        let db = setup_test_db().await?;

        let result = generate(&db, 999, 1, 2).await;
        assert!(matches!(result, Err(Error::ContractNotFound { id: 999 })));

        Ok(())
    }

    #[tokio::test]
    async fn test_generate_missing_version_persists_nothing() -> Result<()> {
        let (db, contract) = setup_with_contract().await?;
        let original = insert_test_version(&db, contract.id, "original").await?;

        let result = generate(&db, contract.id, original.id, 4242).await;
        assert!(matches!(result, Err(Error::VersionNotFound { id: 4242 })));
        assert_eq!(Presettlement::find().count(&db).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_generate_rejects_version_of_other_contract() -> Result<()> {
        let (db, contract) = setup_with_contract().await?;
        let other = create_test_contract(&db, "Other").await?;
        let mine = insert_test_version(&db, contract.id, "original").await?;
        let theirs = insert_test_version(&db, other.id, "original").await?;

        let result = generate(&db, contract.id, mine.id, theirs.id).await;
        assert!(matches!(result, Err(Error::VersionNotFound { id }) if id == theirs.id));

        Ok(())
    }

    #[tokio::test]
    async fn test_generate_rolls_back_on_detail_failure() -> Result<()> {
        let (db, contract) = setup_with_contract().await?;
        let (original_id, updated_id) = seed_example(&db, contract.id).await?;

        db.execute_unprepared(
            "CREATE TRIGGER reject_details BEFORE INSERT ON presettlement_details \
             BEGIN SELECT RAISE(ABORT, 'detail insert rejected'); END;",
        )
        .await?;

        let result = generate(&db, contract.id, original_id, updated_id).await;
        assert!(matches!(result, Err(Error::Database(_))));
        assert_eq!(Presettlement::find().count(&db).await?, 0);
        assert_eq!(PresettlementDetail::find().count(&db).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_latest_presettlement_is_highest_id() -> Result<()> {
        let (db, contract) = setup_with_contract().await?;
        let (original_id, updated_id) = seed_example(&db, contract.id).await?;

        assert!(latest_presettlement(&db, contract.id).await?.is_none());

        let first = generate(&db, contract.id, original_id, updated_id).await?;
        let second = generate(&db, contract.id, updated_id, original_id).await?;
        assert!(second.id > first.id);

        let latest = latest_presettlement(&db, contract.id).await?.unwrap();
        assert_eq!(latest.id, second.id);

        let history = list_presettlements(&db, contract.id).await?;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.id);

        let loaded = presettlement_with_details(&db, second.id).await?;
        assert_eq!(loaded.details.len(), 3);
        // Swapped sides: A3 only exists on the original side now
        assert_eq!(loaded.details[2].concept_key, "A3");
        assert_eq!(loaded.details[2].change_type, "unchanged");
        assert_eq!(loaded.details[1].change_type, "new");

        Ok(())
    }

    #[tokio::test]
    async fn test_presettlement_with_details_not_found() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([Vec::<presettlement::Model>::new()])
            .into_connection();

        let result = presettlement_with_details(&db, 7).await;
        assert!(matches!(result, Err(Error::PresettlementNotFound { id: 7 })));

        Ok(())
    }

    #[test]
    fn test_compare_catalogs_empty_sides() {
        let comparison = compare_catalogs(&BTreeMap::new(), &BTreeMap::new());
        assert!(comparison.concepts.is_empty());
        assert_eq!(comparison.total_difference(), 0.0);
    }
}
