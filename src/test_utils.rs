//! Shared test utilities for the catalog store.
//!
//! This module provides common helper functions for setting up test databases
//! and inserting catalog rows with sensible defaults.

use crate::{
    core::contract,
    entities::{self, catalog_concept, catalog_version},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test contract with sensible defaults.
///
/// # Defaults
/// * `code`: the name in upper case
/// * `advance_percentage`: 30.0
pub async fn create_test_contract(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::contract::Model> {
    contract::create_contract(db, name.to_string(), name.to_uppercase(), 30.0).await
}

/// Sets up a test database with one contract.
pub async fn setup_with_contract() -> Result<(DatabaseConnection, entities::contract::Model)> {
    let db = setup_test_db().await?;
    let contract = create_test_contract(&db, "Test Contract").await?;
    Ok((db, contract))
}

/// Inserts a catalog version directly, bypassing upload rules.
///
/// # Arguments
/// * `kind` - Stored kind, `"original"` or `"amended"`
pub async fn insert_test_version(
    db: &DatabaseConnection,
    contract_id: i64,
    kind: &str,
) -> Result<catalog_version::Model> {
    let version = catalog_version::ActiveModel {
        contract_id: Set(contract_id),
        kind: Set(kind.to_string()),
        upload_date: Set(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap_or_default()),
        name: Set(format!("Test {kind}")),
        comment: Set(String::new()),
        ..Default::default()
    };
    Ok(version.insert(db).await?)
}

/// Inserts a concept row directly into a version.
///
/// # Defaults
/// * `group_number`: "1"
/// * `group_name`: "Preliminaries"
/// * `unit`: "m2"
/// * `subtotal`: `price * quantity`
pub async fn insert_test_concept(
    db: &DatabaseConnection,
    version_id: i64,
    key: &str,
    price: f64,
    quantity: f64,
    status: Option<&str>,
) -> Result<catalog_concept::Model> {
    let concept = catalog_concept::ActiveModel {
        version_id: Set(version_id),
        group_number: Set("1".to_string()),
        group_name: Set("Preliminaries".to_string()),
        concept_key: Set(Some(key.to_string())),
        description: Set(format!("Concept {key}")),
        unit: Set("m2".to_string()),
        unit_price: Set(price),
        quantity: Set(quantity),
        subtotal: Set(price * quantity),
        status: Set(status.map(str::to_string)),
        ..Default::default()
    };
    Ok(concept.insert(db).await?)
}
