//! Core business logic - Framework-agnostic catalog operations.
//!
//! Everything in here works on a `SeaORM` connection and returns structured data;
//! the CLI layer only parses arguments and prints.

/// Extraordinary concept approvals and revisions
pub mod approval;
/// Catalog version uploads, maintenance and breakdowns
pub mod catalog;
/// Folding catalog versions into the base catalog
pub mod consolidation;
/// Contract records and original totals
pub mod contract;
/// Estimations billed from the base catalog and advance amortization
pub mod estimation;
/// Pre-settlement generation and lookup
pub mod presettlement;
/// Executed work and its comparison against the pre-settlement
pub mod progress;
/// Text formatting of operation results
pub mod report;
/// Content-addressed snapshots of the base catalog
pub mod snapshot;
/// Stored status and kind codes
pub mod status;
