//! Database configuration module for the catalog store.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. Creation is idempotent
//! (`CREATE TABLE IF NOT EXISTS`) so a file database can be reopened.

use crate::entities::{
    CatalogConcept, CatalogSnapshot, CatalogVersion, ConceptApproval, ConceptRevision, Contract,
    Estimation, EstimationDetail, Presettlement, PresettlementDetail, ProgressDetail,
    ProgressReport,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/obra_catalog.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, or the default
/// local `SQLite` file if it is not set.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the given database URL.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database at {}", database_url);
    Database::connect(database_url).await.map_err(Into::into)
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all catalog tables from the entity definitions.
///
/// Parents are created before children so the generated foreign keys always point
/// at existing tables.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, Contract).await?;
    create_table(db, &schema, CatalogVersion).await?;
    create_table(db, &schema, CatalogConcept).await?;
    create_table(db, &schema, CatalogSnapshot).await?;
    create_table(db, &schema, Presettlement).await?;
    create_table(db, &schema, PresettlementDetail).await?;
    create_table(db, &schema, ConceptApproval).await?;
    create_table(db, &schema, ConceptRevision).await?;
    create_table(db, &schema, ProgressReport).await?;
    create_table(db, &schema, ProgressDetail).await?;
    create_table(db, &schema, Estimation).await?;
    create_table(db, &schema, EstimationDetail).await?;

    info!("Catalog tables ensured");
    Ok(())
}
