//! Command-line interface - Parses arguments and dispatches to the core operations.
//!
//! Each subcommand produces text lines through [`crate::core::report`]; [`run`]
//! prints them.

use crate::{
    config::settings::Settings,
    core::{
        approval, catalog, consolidation, contract,
        estimation::{self, EstimationEntry, NewEstimation},
        presettlement, progress, report, snapshot,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sea_orm::DatabaseConnection;
use tracing::debug;

/// Contract catalog consolidation and pre-settlements
#[derive(Debug, Parser)]
#[command(name = "obra-catalog", version, about)]
pub struct Cli {
    /// Path of the TOML settings file
    #[arg(long, default_value = "config.toml")]
    pub config: String,
    /// Database URL, overrides the settings file and `DATABASE_URL`
    #[arg(long, env = "OBRA_DATABASE_URL")]
    pub database_url: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List contracts with their original totals
    Contracts,
    /// Print the consolidated base catalog of a contract
    Consolidate {
        #[arg(long)]
        contract: i64,
    },
    /// Store a snapshot of the base catalog if it changed
    Snapshot {
        #[arg(long)]
        contract: i64,
        /// Store a new snapshot even when the content is unchanged
        #[arg(long)]
        force: bool,
    },
    /// Break a version, or the base catalog, down by cost group
    Breakdown {
        #[arg(long)]
        contract: i64,
        /// Version to break down instead of the base catalog
        #[arg(long)]
        version: Option<i64>,
    },
    /// Generate a pre-settlement between two versions
    Presettle {
        #[arg(long)]
        contract: i64,
        #[arg(long)]
        original: i64,
        #[arg(long)]
        updated: i64,
    },
    /// List the pre-settlements of a contract, or show one with its details
    Presettlements {
        #[arg(long)]
        contract: i64,
        #[arg(long)]
        id: Option<i64>,
    },
    /// Compare the latest pre-settlement with the executed work
    Compare {
        #[arg(long)]
        contract: i64,
    },
    /// List extraordinary concepts and their approval state
    Extraordinaries {
        #[arg(long)]
        contract: i64,
    },
    /// Bill executed quantities of base catalog concepts as a new estimation
    Estimate {
        #[arg(long)]
        contract: i64,
        /// Issue date, today when omitted
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Billed quantity as `KEY=QUANTITY`, repeatable
        #[arg(long = "concept", value_parser = parse_entry, required = true)]
        entries: Vec<EstimationEntry>,
        #[arg(long)]
        comment: Option<String>,
    },
    /// List the estimations of a contract, or show one with its amortization
    Estimations {
        #[arg(long)]
        contract: i64,
        #[arg(long)]
        id: Option<i64>,
    },
    /// Store the advance amount an estimation amortizes
    Amortize {
        #[arg(long)]
        estimation: i64,
        #[arg(long)]
        amount: f64,
    },
}

/// Parses a `KEY=QUANTITY` estimation entry.
fn parse_entry(value: &str) -> std::result::Result<EstimationEntry, String> {
    let (key, quantity) = value
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=QUANTITY, got '{value}'"))?;
    let quantity = quantity
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid quantity in '{value}': {e}"))?;
    Ok(EstimationEntry {
        concept_key: key.trim().to_string(),
        quantity,
    })
}

/// Executes one subcommand and returns the lines to print.
pub async fn execute(
    command: &Command,
    db: &DatabaseConnection,
    settings: &Settings,
) -> Result<Vec<String>> {
    debug!("Executing {:?}", command);
    let vat_rate = settings.vat_rate;

    let lines = match *command {
        Command::Contracts => {
            let mut lines = Vec::new();
            for c in contract::list_contracts(db).await? {
                lines.push(report::format_contract_line(&c));
                let totals = contract::contract_totals(db, c.id, vat_rate).await?;
                lines.extend(
                    report::format_contract_totals(&totals)
                        .into_iter()
                        .map(|l| format!("  {l}")),
                );
            }
            lines
        }
        Command::Consolidate { contract } => {
            contract::require_contract(db, contract).await?;
            consolidation::consolidate(db, contract)
                .await?
                .iter()
                .map(report::format_consolidated_concept)
                .collect()
        }
        Command::Snapshot { contract, force } => {
            contract::require_contract(db, contract).await?;
            match snapshot::snapshot_if_changed(db, contract, force).await? {
                Some(stored) => vec![report::format_snapshot_line(&stored)],
                None => vec![format!("Contract {contract} has no catalog to snapshot")],
            }
        }
        Command::Breakdown { contract, version } => {
            let breakdown = match version {
                Some(version_id) => {
                    let owned = catalog::get_version(db, version_id).await?;
                    if owned.contract_id != contract {
                        return Err(Error::VersionNotFound { id: version_id });
                    }
                    catalog::version_breakdown(db, version_id, vat_rate).await?
                }
                None => catalog::base_catalog_breakdown(db, contract, vat_rate).await?,
            };
            report::format_breakdown(&breakdown)
        }
        Command::Presettle {
            contract,
            original,
            updated,
        } => {
            let generated = presettlement::generate(db, contract, original, updated).await?;
            vec![report::format_presettlement_summary(&generated)]
        }
        Command::Presettlements { contract, id } => match id {
            Some(presettlement_id) => {
                let loaded = presettlement::presettlement_with_details(db, presettlement_id).await?;
                let mut lines = vec![report::format_presettlement_summary(&loaded.presettlement)];
                lines.extend(loaded.details.iter().map(report::format_detail_line));
                lines
            }
            None => presettlement::list_presettlements(db, contract)
                .await?
                .iter()
                .map(report::format_presettlement_summary)
                .collect(),
        },
        Command::Compare { contract } => {
            let comparison = progress::compare_with_progress(db, contract, vat_rate).await?;
            report::format_progress_comparison(&comparison)
        }
        Command::Extraordinaries { contract } => approval::list_extraordinaries(db, contract)
            .await?
            .iter()
            .map(report::format_extraordinary_line)
            .collect(),
        Command::Estimate {
            contract,
            date,
            ref entries,
            ref comment,
        } => {
            let input = NewEstimation {
                comment: comment.clone(),
                ..NewEstimation::dated(
                    date.unwrap_or_else(|| chrono::Utc::now().date_naive()),
                    entries.clone(),
                )
            };
            let created = estimation::create_estimation(db, contract, input, vat_rate).await?;
            vec![report::format_estimation_line(&created)]
        }
        Command::Estimations { contract, id } => match id {
            Some(estimation_id) => {
                let summary = estimation::estimation_summary(db, estimation_id).await?;
                if summary.estimation.contract_id != contract {
                    return Err(Error::EstimationNotFound { id: estimation_id });
                }
                let position = estimation::amortization(db, estimation_id, vat_rate).await?;
                let mut lines = report::format_estimation_summary(&summary);
                lines.extend(report::format_amortization(&position));
                lines
            }
            None => estimation::list_estimations(db, contract)
                .await?
                .iter()
                .map(report::format_estimation_line)
                .collect(),
        },
        Command::Amortize {
            estimation: estimation_id,
            amount,
        } => {
            let updated = estimation::set_amortization(db, estimation_id, amount).await?;
            let position = estimation::amortization(db, updated.id, vat_rate).await?;
            let mut lines = vec![report::format_estimation_line(&updated)];
            lines.extend(report::format_amortization(&position));
            lines
        }
    };

    Ok(lines)
}

/// Executes a subcommand and prints its output.
pub async fn run(command: &Command, db: &DatabaseConnection, settings: &Settings) -> Result<()> {
    for line in execute(command, db, settings).await? {
        println!("{line}");
    }
    Ok(())
}
