//! Extraordinary concept approval workflow - Numbered revisions per concept key, with
//! the approval state mirrored onto the latest catalog row carrying the key.
//!
//! Mirrored codes: `E` while in elaboration, `R<n>` while in revision (n counts the
//! revisions recorded in the revision state), `A` once approved.

use crate::{
    core::{
        consolidation::consolidate,
        contract::require_contract,
        status::{ApprovalState, ConceptStatus, is_extraordinary},
    },
    entities::{
        CatalogConcept, CatalogVersion, ConceptApproval, ConceptRevision, catalog_concept,
        catalog_version, concept_approval, concept_revision,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{PaginatorTrait, QueryOrder, Select, Set, TransactionTrait, prelude::*};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

const INITIAL_REVISION_COMMENT: &str = "initial registration from catalog";

/// Data of one new revision.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RevisionInput {
    pub date: NaiveDate,
    pub unit_price: f64,
    pub comment: Option<String>,
    pub description: Option<String>,
    /// Defaults to the approval's current state
    pub state: Option<ApprovalState>,
    pub attachment: Option<String>,
    pub acknowledgement: Option<String>,
}

/// One extraordinary concept of the consolidated catalog with its approval status.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtraordinaryConcept {
    pub concept_key: String,
    pub description: String,
    pub unit_price: f64,
    pub state: ApprovalState,
    pub comment: Option<String>,
    pub revision_count: u64,
}

/// One entry of a concept's revision history.
#[derive(Clone, Debug, PartialEq)]
pub struct RevisionEntry {
    pub revision_number: i32,
    pub state: String,
    pub unit_price: f64,
    pub description: Option<String>,
    pub comment: Option<String>,
    pub attachment: Option<String>,
    pub acknowledgement: Option<String>,
    /// `None` for the synthesized revision 0
    pub registered_on: Option<NaiveDate>,
}

/// Finds the approval record of a concept key within a contract.
pub async fn find_approval<C>(
    db: &C,
    contract_id: i64,
    concept_key: &str,
) -> Result<Option<concept_approval::Model>>
where
    C: ConnectionTrait,
{
    ConceptApproval::find()
        .filter(concept_approval::Column::ContractId.eq(contract_id))
        .filter(concept_approval::Column::ConceptKey.eq(concept_key))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn revision_count<C>(db: &C, approval_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    ConceptRevision::find()
        .filter(concept_revision::Column::ApprovalId.eq(approval_id))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Status code a catalog row should carry for the given approval.
pub async fn mirrored_status<C>(db: &C, approval: &concept_approval::Model) -> Result<ConceptStatus>
where
    C: ConnectionTrait,
{
    match approval.state.parse::<ApprovalState>()? {
        ApprovalState::Elaboration => Ok(ConceptStatus::Elaboration),
        ApprovalState::Approved => Ok(ConceptStatus::Approved),
        ApprovalState::Revision => {
            let in_revision = ConceptRevision::find()
                .filter(concept_revision::Column::ApprovalId.eq(approval.id))
                .filter(concept_revision::Column::State.eq(ApprovalState::Revision.as_str()))
                .count(db)
                .await?;
            Ok(ConceptStatus::Revision(
                u32::try_from(in_revision).unwrap_or(u32::MAX),
            ))
        }
    }
}

/// Gets the approval of an extraordinary concept, creating it on first sight.
///
/// A new approval starts in elaboration with revision 1 recording the catalog's
/// price and description.
pub async fn ensure_approval<C>(
    db: &C,
    contract_id: i64,
    concept_key: &str,
    unit_price: f64,
    description: &str,
    date: NaiveDate,
) -> Result<concept_approval::Model>
where
    C: ConnectionTrait,
{
    if let Some(existing) = find_approval(db, contract_id, concept_key).await? {
        return Ok(existing);
    }

    let approval = concept_approval::ActiveModel {
        contract_id: Set(contract_id),
        concept_key: Set(concept_key.to_string()),
        state: Set(ApprovalState::Elaboration.as_str().to_string()),
        unit_price: Set(Some(unit_price)),
        description: Set(Some(description.to_string())),
        comment: Set(None),
        attachment: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    concept_revision::ActiveModel {
        approval_id: Set(approval.id),
        revision_number: Set(1),
        state: Set(ApprovalState::Elaboration.as_str().to_string()),
        unit_price: Set(Some(unit_price)),
        description: Set(Some(description.to_string())),
        comment: Set(Some(INITIAL_REVISION_COMMENT.to_string())),
        attachment: Set(None),
        acknowledgement: Set(None),
        registered_on: Set(date),
        ..Default::default()
    }
    .insert(db)
    .await?;

    debug!(
        "Registered approval {} for extraordinary concept '{}'",
        approval.id, concept_key
    );
    Ok(approval)
}

/// Concept rows of every version of a contract.
pub(crate) fn contract_concepts(contract_id: i64) -> Select<CatalogConcept> {
    CatalogConcept::find()
        .inner_join(CatalogVersion)
        .filter(catalog_version::Column::ContractId.eq(contract_id))
}

/// Records a new revision of an extraordinary concept.
///
/// The approval's price and state always follow the revision; its comment and
/// description only while the new state is not approved. The most recent catalog
/// row carrying the key gets the mirrored status code.
#[instrument(skip(db, input))]
pub async fn register_revision(
    db: &DatabaseConnection,
    contract_id: i64,
    concept_key: &str,
    input: RevisionInput,
) -> Result<concept_revision::Model> {
    if !input.unit_price.is_finite() {
        return Err(Error::InvalidAmount {
            amount: input.unit_price,
        });
    }

    let txn = db.begin().await?;
    require_contract(&txn, contract_id).await?;

    let approval = match find_approval(&txn, contract_id, concept_key).await? {
        Some(approval) => approval,
        None => {
            concept_approval::ActiveModel {
                contract_id: Set(contract_id),
                concept_key: Set(concept_key.to_string()),
                state: Set(ApprovalState::Elaboration.as_str().to_string()),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    let state = match input.state {
        Some(state) => state,
        None => approval.state.parse()?,
    };
    let number = revision_count(&txn, approval.id).await? + 1;

    let revision = concept_revision::ActiveModel {
        approval_id: Set(approval.id),
        revision_number: Set(i32::try_from(number).unwrap_or(i32::MAX)),
        state: Set(state.as_str().to_string()),
        unit_price: Set(Some(input.unit_price)),
        description: Set(input.description.clone()),
        comment: Set(input.comment.clone()),
        attachment: Set(input.attachment.clone()),
        acknowledgement: Set(input.acknowledgement),
        registered_on: Set(input.date),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut active: concept_approval::ActiveModel = approval.into();
    active.unit_price = Set(Some(input.unit_price));
    active.state = Set(state.as_str().to_string());
    if state != ApprovalState::Approved {
        active.comment = Set(input.comment);
        active.description = Set(input.description);
    }
    if input.attachment.is_some() {
        active.attachment = Set(input.attachment);
    }
    let approval = active.update(&txn).await?;

    let latest_row = contract_concepts(contract_id)
        .filter(catalog_concept::Column::ConceptKey.eq(concept_key))
        .order_by_desc(catalog_concept::Column::Id)
        .one(&txn)
        .await?;

    if let Some(row) = latest_row {
        let status = mirrored_status(&txn, &approval).await?;
        let mut row: catalog_concept::ActiveModel = row.into();
        row.status = Set(Some(status.to_string()));
        row.update(&txn).await?;
    }

    txn.commit().await?;

    info!(
        "Registered revision {} of '{}' in contract {} ({})",
        revision.revision_number, concept_key, contract_id, state
    );
    Ok(revision)
}

/// Lists the extraordinary concepts of a contract's consolidated catalog.
///
/// A concept whose approval is not approved but already has revisions is shown as
/// in revision. Concepts without an approval record show as in elaboration.
pub async fn list_extraordinaries(
    db: &DatabaseConnection,
    contract_id: i64,
) -> Result<Vec<ExtraordinaryConcept>> {
    require_contract(db, contract_id).await?;

    let approvals: HashMap<String, concept_approval::Model> = ConceptApproval::find()
        .filter(concept_approval::Column::ContractId.eq(contract_id))
        .all(db)
        .await?
        .into_iter()
        .map(|a| (a.concept_key.clone(), a))
        .collect();

    let mut extraordinaries = Vec::new();
    for concept in consolidate(db, contract_id).await? {
        if !is_extraordinary(&concept.concept_key) {
            continue;
        }

        let entry = match approvals.get(&concept.concept_key) {
            Some(approval) => {
                let revisions = revision_count(db, approval.id).await?;
                let stored: ApprovalState = approval.state.parse()?;
                let state = if stored != ApprovalState::Approved && revisions > 0 {
                    ApprovalState::Revision
                } else {
                    stored
                };
                ExtraordinaryConcept {
                    concept_key: concept.concept_key,
                    description: concept.description,
                    unit_price: approval.unit_price.unwrap_or(concept.unit_price),
                    state,
                    comment: approval.comment.clone(),
                    revision_count: revisions,
                }
            }
            None => ExtraordinaryConcept {
                concept_key: concept.concept_key,
                description: concept.description,
                unit_price: concept.unit_price,
                state: ApprovalState::Elaboration,
                comment: None,
                revision_count: 0,
            },
        };
        extraordinaries.push(entry);
    }

    Ok(extraordinaries)
}

/// Revision history of a concept, starting with a revision 0 built from the approval.
pub async fn revision_history(
    db: &DatabaseConnection,
    contract_id: i64,
    concept_key: &str,
) -> Result<Vec<RevisionEntry>> {
    let approval = find_approval(db, contract_id, concept_key)
        .await?
        .ok_or_else(|| Error::ApprovalNotFound {
            contract_id,
            key: concept_key.to_string(),
        })?;

    let revisions = approval
        .find_related(ConceptRevision)
        .order_by_asc(concept_revision::Column::RevisionNumber)
        .all(db)
        .await?;

    let mut history = Vec::with_capacity(revisions.len() + 1);
    history.push(RevisionEntry {
        revision_number: 0,
        state: ApprovalState::Elaboration.as_str().to_string(),
        unit_price: approval.unit_price.unwrap_or(0.0),
        description: approval.description,
        comment: approval.comment,
        attachment: None,
        acknowledgement: None,
        registered_on: None,
    });
    history.extend(revisions.into_iter().map(|r| RevisionEntry {
        revision_number: r.revision_number,
        state: r.state,
        unit_price: r.unit_price.unwrap_or(0.0),
        description: r.description,
        comment: r.comment,
        attachment: r.attachment,
        acknowledgement: r.acknowledgement,
        registered_on: Some(r.registered_on),
    }));

    Ok(history)
}

/// Renumbers revision status codes per key as `R1`, `R2`, ... in row order.
///
/// Only rows whose status is a revision are touched. Returns how many rows were
/// updated.
#[instrument(skip(db))]
pub async fn renumber_revision_statuses(
    db: &DatabaseConnection,
    contract_id: i64,
) -> Result<usize> {
    let txn = db.begin().await?;
    require_contract(&txn, contract_id).await?;

    let rows = contract_concepts(contract_id)
        .filter(catalog_concept::Column::Status.like("R%"))
        .order_by_asc(catalog_concept::Column::ConceptKey)
        .order_by_asc(catalog_concept::Column::Id)
        .all(&txn)
        .await?;

    let mut counters: HashMap<String, u32> = HashMap::new();
    let mut updated = 0;
    for row in rows {
        let Some(key) = row.concept_key.clone() else {
            continue;
        };
        if !matches!(
            ConceptStatus::from_stored(row.status.as_deref()),
            Ok(ConceptStatus::Revision(_))
        ) {
            continue;
        }

        let counter = counters.entry(key).or_insert(0);
        *counter += 1;
        let status = ConceptStatus::Revision(*counter).to_string();

        if row.status.as_deref() != Some(status.as_str()) {
            let mut active: catalog_concept::ActiveModel = row.into();
            active.status = Set(Some(status));
            active.update(&txn).await?;
            updated += 1;
        }
    }

    txn.commit().await?;
    info!("Renumbered {} revision statuses in contract {}", updated, contract_id);
    Ok(updated)
}
