//! Entity module - Contains all SeaORM entity definitions for the catalog store.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod catalog_concept;
pub mod catalog_snapshot;
pub mod catalog_version;
pub mod concept_approval;
pub mod concept_revision;
pub mod contract;
pub mod estimation;
pub mod estimation_detail;
pub mod presettlement;
pub mod presettlement_detail;
pub mod progress_detail;
pub mod progress_report;

// Re-export specific types to avoid conflicts
pub use catalog_concept::{
    Column as CatalogConceptColumn, Entity as CatalogConcept, Model as CatalogConceptModel,
};
pub use catalog_snapshot::{
    Column as CatalogSnapshotColumn, Entity as CatalogSnapshot, Model as CatalogSnapshotModel,
};
pub use catalog_version::{
    Column as CatalogVersionColumn, Entity as CatalogVersion, Model as CatalogVersionModel,
};
pub use concept_approval::{
    Column as ConceptApprovalColumn, Entity as ConceptApproval, Model as ConceptApprovalModel,
};
pub use concept_revision::{
    Column as ConceptRevisionColumn, Entity as ConceptRevision, Model as ConceptRevisionModel,
};
pub use contract::{Column as ContractColumn, Entity as Contract, Model as ContractModel};
pub use estimation::{Column as EstimationColumn, Entity as Estimation, Model as EstimationModel};
pub use estimation_detail::{
    Column as EstimationDetailColumn, Entity as EstimationDetail, Model as EstimationDetailModel,
};
pub use presettlement::{
    Column as PresettlementColumn, Entity as Presettlement, Model as PresettlementModel,
};
pub use presettlement_detail::{
    Column as PresettlementDetailColumn, Entity as PresettlementDetail,
    Model as PresettlementDetailModel,
};
pub use progress_detail::{
    Column as ProgressDetailColumn, Entity as ProgressDetail, Model as ProgressDetailModel,
};
pub use progress_report::{
    Column as ProgressReportColumn, Entity as ProgressReport, Model as ProgressReportModel,
};
