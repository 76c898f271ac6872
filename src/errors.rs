//! Unified error type for the catalog core.
//!
//! Every fallible operation returns [`Result`]; store errors, serialization
//! errors and I/O errors convert in through `#[from]` so callers can use `?`.

use thiserror::Error;

/// All errors surfaced by the catalog core
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description of what went wrong
        message: String,
    },

    /// Underlying store error from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Snapshot content could not be serialized or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O failure (configuration file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Referenced contract does not exist
    #[error("Contract {id} not found")]
    ContractNotFound {
        /// Contract id that was looked up
        id: i64,
    },

    /// Referenced catalog version does not exist (or belongs to another contract)
    #[error("Catalog version {id} not found")]
    VersionNotFound {
        /// Catalog version id that was looked up
        id: i64,
    },

    /// Referenced catalog concept does not exist
    #[error("Catalog concept {id} not found")]
    ConceptNotFound {
        /// Concept row id that was looked up
        id: i64,
    },

    /// Referenced pre-settlement does not exist
    #[error("Pre-settlement {id} not found")]
    PresettlementNotFound {
        /// Pre-settlement id that was looked up
        id: i64,
    },

    /// Referenced estimation does not exist
    #[error("Estimation {id} not found")]
    EstimationNotFound {
        /// Estimation id that was looked up
        id: i64,
    },

    /// Concept key is missing from the base catalog or still awaits approval
    #[error("Concept '{key}' cannot be estimated in contract {contract_id}")]
    ConceptNotEstimable {
        /// Contract being estimated
        contract_id: i64,
        /// Concept key that was requested
        key: String,
    },

    /// No approval record exists for an extraordinary concept
    #[error("No approval record for concept '{key}' in contract {contract_id}")]
    ApprovalNotFound {
        /// Contract the concept belongs to
        contract_id: i64,
        /// Extraordinary concept key
        key: String,
    },

    /// A quantity, price or percentage is not a usable number
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// Offending value
        amount: f64,
    },

    /// A stored status or state tag could not be parsed
    #[error("Invalid status tag '{value}'")]
    InvalidStatus {
        /// Offending tag as stored
        value: String,
    },
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
