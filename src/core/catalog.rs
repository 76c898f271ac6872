//! Catalog registry - Uploading catalog versions, maintaining them and breaking a
//! catalog down by cost group.
//!
//! Uploading an amended version also generates its pre-settlement against the
//! contract's original version once the upload is committed.

use crate::{
    core::{
        approval::{ensure_approval, mirrored_status},
        consolidation::{ConsolidatedConcept, row_status},
        contract::{require_contract, round_cents},
        presettlement,
        snapshot::{decode_snapshot, snapshot_if_changed},
        status::{ConceptStatus, VersionKind, is_extraordinary},
    },
    entities::{
        CatalogConcept, CatalogVersion, Presettlement, PresettlementDetail, ProgressReport,
        catalog_concept, catalog_version, presettlement as presettlement_entity,
        presettlement_detail, progress_report,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use std::cmp::Ordering;
use tracing::{debug, info, instrument};

/// One priced line item of an uploaded catalog.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewConcept {
    pub group_number: String,
    pub group_name: String,
    pub concept_key: Option<String>,
    pub description: String,
    pub unit: String,
    pub unit_price: f64,
    pub quantity: f64,
    /// Stored as given; `unit_price * quantity` when absent
    pub subtotal: Option<f64>,
}

/// Result of uploading a catalog version.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadOutcome {
    pub version: catalog_version::Model,
    /// Generated for amended versions
    pub presettlement: Option<presettlement_entity::Model>,
}

/// One concept line of a breakdown.
#[derive(Clone, Debug, PartialEq)]
pub struct BreakdownLine {
    pub concept_key: Option<String>,
    pub description: String,
    pub unit: String,
    pub unit_price: f64,
    pub quantity: f64,
    pub subtotal: f64,
    pub status: ConceptStatus,
}

impl From<&catalog_concept::Model> for BreakdownLine {
    fn from(row: &catalog_concept::Model) -> Self {
        Self {
            concept_key: row.concept_key.clone(),
            description: row.description.clone(),
            unit: row.unit.clone(),
            unit_price: row.unit_price,
            quantity: row.quantity,
            subtotal: row.subtotal,
            status: row_status(row),
        }
    }
}

impl From<&ConsolidatedConcept> for BreakdownLine {
    fn from(concept: &ConsolidatedConcept) -> Self {
        Self {
            concept_key: Some(concept.concept_key.clone()),
            description: concept.description.clone(),
            unit: concept.unit.clone(),
            unit_price: concept.unit_price,
            quantity: concept.quantity,
            subtotal: concept.subtotal,
            status: concept.status,
        }
    }
}

/// Concepts of one cost group.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupBreakdown {
    pub group_number: String,
    pub group_name: String,
    pub lines: Vec<BreakdownLine>,
    pub subtotal: f64,
}

/// A catalog grouped by cost group, with VAT totals.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CatalogBreakdown {
    pub groups: Vec<GroupBreakdown>,
    pub subtotal: f64,
    pub vat: f64,
    pub total: f64,
}

/// Orders group numbers numerically when both parse, else lexically.
fn compare_group_numbers(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y),
        _ => a.cmp(b),
    }
}

/// Groups breakdown lines by group number and totals them.
pub fn build_breakdown<I>(lines: I, vat_rate: f64) -> CatalogBreakdown
where
    I: IntoIterator<Item = (String, String, BreakdownLine)>,
{
    let mut groups: Vec<GroupBreakdown> = Vec::new();

    for (group_number, group_name, line) in lines {
        if let Some(group) = groups.iter_mut().find(|g| g.group_number == group_number) {
            group.subtotal += line.subtotal;
            group.lines.push(line);
        } else {
            groups.push(GroupBreakdown {
                group_number,
                group_name,
                subtotal: line.subtotal,
                lines: vec![line],
            });
        }
    }
    groups.sort_by(|a, b| compare_group_numbers(&a.group_number, &b.group_number));

    let subtotal: f64 = groups.iter().map(|g| g.subtotal).sum();
    let vat = round_cents(subtotal * vat_rate);

    CatalogBreakdown {
        groups,
        subtotal,
        vat,
        total: subtotal + vat,
    }
}

fn validate_row(row: &NewConcept) -> Result<()> {
    for amount in [row.unit_price, row.quantity]
        .into_iter()
        .chain(row.subtotal)
    {
        if !amount.is_finite() {
            return Err(Error::InvalidAmount { amount });
        }
    }
    Ok(())
}

/// Finds the first original version of a contract.
pub async fn original_version<C>(db: &C, contract_id: i64) -> Result<Option<catalog_version::Model>>
where
    C: ConnectionTrait,
{
    CatalogVersion::find()
        .filter(catalog_version::Column::ContractId.eq(contract_id))
        .filter(catalog_version::Column::Kind.eq(VersionKind::Original.as_str()))
        .order_by_asc(catalog_version::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Uploads a new catalog version for a contract.
///
/// The first upload becomes the original version, later ones are amended.
/// Extraordinary rows get an approval record on first sight and carry its mirrored
/// status; ordinary rows carry none. The version and its rows are written in one
/// transaction; the pre-settlement of an amended version is generated afterwards.
///
/// # Errors
/// - `ContractNotFound` if the contract does not exist
/// - `InvalidAmount` if a row has a non-finite price, quantity or subtotal
#[instrument(skip(db, rows))]
pub async fn register_version(
    db: &DatabaseConnection,
    contract_id: i64,
    comment: String,
    rows: Vec<NewConcept>,
    upload_date: NaiveDate,
) -> Result<UploadOutcome> {
    for row in &rows {
        validate_row(row)?;
    }

    let txn = db.begin().await?;
    require_contract(&txn, contract_id).await?;

    let original = original_version(&txn, contract_id).await?;
    let kind = if original.is_some() {
        VersionKind::Amended
    } else {
        VersionKind::Original
    };

    let version = catalog_version::ActiveModel {
        contract_id: Set(contract_id),
        kind: Set(kind.as_str().to_string()),
        upload_date: Set(upload_date),
        name: Set(kind.display_name().to_string()),
        comment: Set(comment),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let row_count = rows.len();
    for row in rows {
        let key = row
            .concept_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        let status = match key.as_deref() {
            Some(k) if is_extraordinary(k) => {
                let approval = ensure_approval(
                    &txn,
                    contract_id,
                    k,
                    row.unit_price,
                    &row.description,
                    upload_date,
                )
                .await?;
                Some(mirrored_status(&txn, &approval).await?.to_string())
            }
            _ => None,
        };

        catalog_concept::ActiveModel {
            version_id: Set(version.id),
            group_number: Set(row.group_number),
            group_name: Set(row.group_name),
            concept_key: Set(key),
            description: Set(row.description),
            unit: Set(row.unit),
            unit_price: Set(row.unit_price),
            quantity: Set(row.quantity),
            subtotal: Set(row.subtotal.unwrap_or(row.unit_price * row.quantity)),
            status: Set(status),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;
    info!(
        "Registered {} version {} for contract {} ({} rows)",
        kind, version.id, contract_id, row_count
    );

    let presettlement = match original {
        Some(original) => {
            Some(presettlement::generate(db, contract_id, original.id, version.id).await?)
        }
        None => None,
    };

    Ok(UploadOutcome {
        version,
        presettlement,
    })
}

/// Finds a version by id, failing with `VersionNotFound` when absent.
pub async fn get_version<C>(db: &C, version_id: i64) -> Result<catalog_version::Model>
where
    C: ConnectionTrait,
{
    CatalogVersion::find_by_id(version_id)
        .one(db)
        .await?
        .ok_or(Error::VersionNotFound { id: version_id })
}

/// Replaces the comment of a version.
pub async fn update_version_comment(
    db: &DatabaseConnection,
    version_id: i64,
    comment: String,
) -> Result<catalog_version::Model> {
    let version = get_version(db, version_id).await?;

    let mut active: catalog_version::ActiveModel = version.into();
    active.comment = Set(comment);
    active.update(db).await.map_err(Into::into)
}

/// Deletes a version with its concepts and every pre-settlement referencing it.
///
/// Progress reports measured against the version keep their details but lose the
/// version reference. Progress details still referencing its concepts make the
/// delete fail.
#[instrument(skip(db))]
pub async fn delete_version(db: &DatabaseConnection, version_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    get_version(&txn, version_id).await?;

    let presettlement_ids: Vec<i64> = Presettlement::find()
        .filter(
            Condition::any()
                .add(presettlement_entity::Column::OriginalVersionId.eq(version_id))
                .add(presettlement_entity::Column::UpdatedVersionId.eq(version_id)),
        )
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();

    if !presettlement_ids.is_empty() {
        PresettlementDetail::delete_many()
            .filter(presettlement_detail::Column::PresettlementId.is_in(presettlement_ids.clone()))
            .exec(&txn)
            .await?;
        Presettlement::delete_many()
            .filter(presettlement_entity::Column::Id.is_in(presettlement_ids.clone()))
            .exec(&txn)
            .await?;
    }

    let detached = ProgressReport::update_many()
        .col_expr(
            progress_report::Column::CatalogVersionId,
            Expr::value(Option::<i64>::None),
        )
        .filter(progress_report::Column::CatalogVersionId.eq(version_id))
        .exec(&txn)
        .await?;

    let concepts = CatalogConcept::delete_many()
        .filter(catalog_concept::Column::VersionId.eq(version_id))
        .exec(&txn)
        .await?;
    CatalogVersion::delete_by_id(version_id).exec(&txn).await?;

    txn.commit().await?;
    info!(
        "Deleted version {} ({} concepts, {} pre-settlements, {} progress reports detached)",
        version_id,
        concepts.rows_affected,
        presettlement_ids.len(),
        detached.rows_affected
    );
    Ok(())
}

/// Lists the versions of a contract, newest first.
pub async fn list_versions(
    db: &DatabaseConnection,
    contract_id: i64,
) -> Result<Vec<catalog_version::Model>> {
    CatalogVersion::find()
        .filter(catalog_version::Column::ContractId.eq(contract_id))
        .order_by_desc(catalog_version::Column::UploadDate)
        .order_by_desc(catalog_version::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Loads the concept rows of a version in upload order.
pub async fn version_concepts(
    db: &DatabaseConnection,
    version_id: i64,
) -> Result<Vec<catalog_concept::Model>> {
    let version = get_version(db, version_id).await?;
    version
        .find_related(CatalogConcept)
        .order_by_asc(catalog_concept::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Breaks one version down by cost group.
pub async fn version_breakdown(
    db: &DatabaseConnection,
    version_id: i64,
    vat_rate: f64,
) -> Result<CatalogBreakdown> {
    let rows = version_concepts(db, version_id).await?;
    Ok(build_breakdown(
        rows.iter()
            .map(|r| (r.group_number.clone(), r.group_name.clone(), BreakdownLine::from(r))),
        vat_rate,
    ))
}

/// Breaks the consolidated catalog of a contract down by cost group.
///
/// Goes through the snapshot cache, storing a new snapshot when the consolidated
/// catalog changed.
pub async fn base_catalog_breakdown(
    db: &DatabaseConnection,
    contract_id: i64,
    vat_rate: f64,
) -> Result<CatalogBreakdown> {
    require_contract(db, contract_id).await?;

    let Some(snapshot) = snapshot_if_changed(db, contract_id, false).await? else {
        debug!("Contract {} has an empty base catalog", contract_id);
        return Ok(CatalogBreakdown::default());
    };

    let concepts = decode_snapshot(&snapshot)?;
    Ok(build_breakdown(
        concepts
            .iter()
            .map(|c| (c.group_number.clone(), c.group_name.clone(), BreakdownLine::from(c))),
        vat_rate,
    ))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::{
        core::{
            presettlement::presettlement_details, progress::record_progress,
            snapshot::list_snapshots,
        },
        entities::concept_approval,
        test_utils::*,
    };

    fn upload_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
    }

    fn concept(group: &str, key: &str, price: f64, quantity: f64) -> NewConcept {
        NewConcept {
            group_number: group.to_string(),
            group_name: format!("Group {group}"),
            concept_key: Some(key.to_string()),
            description: format!("Concept {key}"),
            unit: "m3".to_string(),
            unit_price: price,
            quantity,
            subtotal: None,
        }
    }

    #[tokio::test]
    async fn test_first_upload_is_original() -> Result<()> {
        let (db, contract) = setup_with_contract().await?;

        let mut explicit = concept("1", " A2 ", 10.0, 3.0);
        explicit.subtotal = Some(31.5);
        let outcome = register_version(
            &db,
            contract.id,
            "first".to_string(),
            vec![concept("1", "A1", 100.0, 2.0), explicit],
            upload_date(),
        )
        .await?;

        assert_eq!(outcome.version.kind, "original");
        assert_eq!(outcome.version.name, "Catalog Original");
        assert!(outcome.presettlement.is_none());

        let rows = version_concepts(&db, outcome.version.id).await?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].subtotal, 200.0);
        assert_eq!(rows[0].status, None);
        assert_eq!(rows[1].concept_key.as_deref(), Some("A2"));
        assert_eq!(rows[1].subtotal, 31.5);

        Ok(())
    }

    #[tokio::test]
    async fn test_amended_upload_generates_presettlement() -> Result<()> {
        let (db, contract) = setup_with_contract().await?;

        let original = register_version(
            &db,
            contract.id,
            String::new(),
            vec![concept("1", "A1", 100.0, 10.0)],
            upload_date(),
        )
        .await?;
        let amended = register_version(
            &db,
            contract.id,
            String::new(),
            vec![concept("1", "A1", 100.0, 12.0), concept("2", "A3", 50.0, 6.0)],
            upload_date(),
        )
        .await?;

        assert_eq!(amended.version.kind, "amended");
        assert_eq!(amended.version.name, "Catalog Amended");

        let generated = amended.presettlement.unwrap();
        assert_eq!(generated.original_version_id, original.version.id);
        assert_eq!(generated.updated_version_id, amended.version.id);
        assert_eq!(generated.total_original, 1000.0);
        assert_eq!(generated.total_updated, 1500.0);
        assert_eq!(generated.total_difference, 500.0);

        let details = presettlement_details(&db, generated.id).await?;
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].change_type, "modified");
        assert_eq!(details[1].change_type, "new");

        Ok(())
    }

    #[tokio::test]
    async fn test_upload_registers_extraordinary_approval() -> Result<()> {
        let (db, contract) = setup_with_contract().await?;

        let outcome = register_version(
            &db,
            contract.id,
            String::new(),
            vec![concept("1", "E1", 300.0, 1.0), concept("1", "A1", 10.0, 1.0)],
            upload_date(),
        )
        .await?;

        let rows = version_concepts(&db, outcome.version.id).await?;
        assert_eq!(rows[0].status.as_deref(), Some("E"));
        assert_eq!(rows[1].status, None);

        let approvals = crate::entities::ConceptApproval::find()
            .filter(concept_approval::Column::ContractId.eq(contract.id))
            .all(&db)
            .await?;
        assert_eq!(approvals.len(), 1);
        assert_eq!(approvals[0].concept_key, "E1");
        assert_eq!(approvals[0].state, "elaboration");

        Ok(())
    }

    #[tokio::test]
    async fn test_upload_validation() -> Result<()> {
        let (db, contract) = setup_with_contract().await?;

        let result = register_version(
            &db,
            contract.id,
            String::new(),
            vec![concept("1", "A1", f64::INFINITY, 1.0)],
            upload_date(),
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount: _ })));

        let result = register_version(&db, 999, String::new(), Vec::new(), upload_date()).await;
        assert!(matches!(result, Err(Error::ContractNotFound { id: 999 })));
        assert!(list_versions(&db, contract.id).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_delete_version() -> Result<()> {
        let (db, contract) = setup_with_contract().await?;

        let original = register_version(
            &db,
            contract.id,
            String::new(),
            vec![concept("1", "A1", 100.0, 1.0)],
            upload_date(),
        )
        .await?;
        let amended = register_version(
            &db,
            contract.id,
            String::new(),
            vec![concept("1", "A1", 120.0, 1.0)],
            upload_date(),
        )
        .await?;

        let updated =
            update_version_comment(&db, amended.version.id, "signed off".to_string()).await?;
        assert_eq!(updated.comment, "signed off");

        let listed = list_versions(&db, contract.id).await?;
        assert_eq!(listed[0].id, amended.version.id);

        delete_version(&db, amended.version.id).await?;
        let listed = list_versions(&db, contract.id).await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, original.version.id);
        assert!(Presettlement::find().all(&db).await?.is_empty());
        assert!(PresettlementDetail::find().all(&db).await?.is_empty());

        let missing = delete_version(&db, amended.version.id).await;
        assert!(matches!(missing, Err(Error::VersionNotFound { id: _ })));

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_version_detaches_progress_reports() -> Result<()> {
        let (db, contract) = setup_with_contract().await?;
        let original = insert_test_version(&db, contract.id, "original").await?;
        insert_test_concept(&db, original.id, "A1", 100.0, 1.0, None).await?;
        let amended = insert_test_version(&db, contract.id, "amended").await?;
        insert_test_concept(&db, amended.id, "A1", 120.0, 1.0, None).await?;

        let measured =
            record_progress(&db, contract.id, upload_date(), Some(amended.id), Vec::new()).await?;
        let untouched =
            record_progress(&db, contract.id, upload_date(), Some(original.id), Vec::new()).await?;

        delete_version(&db, amended.id).await?;

        let measured = ProgressReport::find_by_id(measured.id).one(&db).await?.unwrap();
        assert_eq!(measured.catalog_version_id, None);
        let untouched = ProgressReport::find_by_id(untouched.id).one(&db).await?.unwrap();
        assert_eq!(untouched.catalog_version_id, Some(original.id));

        Ok(())
    }

    #[tokio::test]
    async fn test_breakdowns_group_and_total() -> Result<()> {
        let (db, contract) = setup_with_contract().await?;

        let original = register_version(
            &db,
            contract.id,
            String::new(),
            vec![
                concept("10", "C1", 10.0, 1.0),
                concept("2", "B1", 100.0, 2.0),
                concept("2", "B2", 50.0, 1.0),
            ],
            upload_date(),
        )
        .await?;

        let breakdown = version_breakdown(&db, original.version.id, 0.16).await?;
        let numbers: Vec<&str> = breakdown
            .groups
            .iter()
            .map(|g| g.group_number.as_str())
            .collect();
        assert_eq!(numbers, vec!["2", "10"]);
        assert_eq!(breakdown.groups[0].subtotal, 250.0);
        assert_eq!(breakdown.groups[0].lines.len(), 2);
        assert_eq!(breakdown.subtotal, 260.0);
        assert_eq!(breakdown.vat, 41.6);
        assert_eq!(breakdown.total, 301.6);

        register_version(
            &db,
            contract.id,
            String::new(),
            vec![concept("2", "B1", 100.0, 3.0)],
            upload_date(),
        )
        .await?;

        let base = base_catalog_breakdown(&db, contract.id, 0.16).await?;
        assert_eq!(base.subtotal, 360.0);
        assert_eq!(list_snapshots(&db, contract.id).await?.len(), 1);

        base_catalog_breakdown(&db, contract.id, 0.16).await?;
        assert_eq!(list_snapshots(&db, contract.id).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_base_breakdown_empty_contract() -> Result<()> {
        let (db, contract) = setup_with_contract().await?;

        let breakdown = base_catalog_breakdown(&db, contract.id, 0.16).await?;
        assert_eq!(breakdown, CatalogBreakdown::default());

        Ok(())
    }

    #[test]
    fn test_compare_group_numbers() {
        assert_eq!(compare_group_numbers("2", "10"), Ordering::Less);
        assert_eq!(compare_group_numbers("B", "A"), Ordering::Greater);
    }
}
