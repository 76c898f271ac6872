//! Report formatting.
//!
//! Turns the structured results of the catalog operations into text lines. All
//! functions are pure so the CLI layer only decides where the lines go.

use crate::{
    core::{
        approval::ExtraordinaryConcept,
        catalog::CatalogBreakdown,
        consolidation::ConsolidatedConcept,
        contract::ContractTotals,
        estimation::{Amortization, EstimationSummary},
        progress::{ProgressComparison, ProgressRow},
    },
    entities::{catalog_snapshot, contract, estimation, presettlement, presettlement_detail},
};

/// Calculates how much of the catalog quantity has been executed.
///
/// # Returns
/// Percentage executed; 0 when the catalog quantity is zero
#[must_use]
pub fn calculate_progress(executed: f64, catalog: f64) -> f64 {
    if catalog == 0.0 {
        return 0.0;
    }

    (executed / catalog) * 100.0
}

/// Generates a progress bar string for visual representation.
///
/// Creates a text-based progress bar like: `[████████░░] 80.0%`
#[must_use]
pub fn format_progress_bar(progress_percent: f64, bar_length: Option<usize>) -> String {
    let length = bar_length.unwrap_or(10);
    let clamped_progress = progress_percent.clamp(0.0, 100.0);

    // Cast safety: clamped_progress ∈ [0, 100], length is small (10-20).
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let filled = ((clamped_progress / 100.0) * length as f64).round() as usize;
    let empty = length.saturating_sub(filled);

    let filled_str = "█".repeat(filled);
    let empty_str = "░".repeat(empty);

    format!("[{filled_str}{empty_str}] {progress_percent:.1}%")
}

/// Formats an amount as currency, like "$1,500.00".
#[must_use]
pub fn format_currency(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{sign}${grouped}.{cents}")
}

/// Formats a difference with an explicit sign, like "+$200.00" or "-$25.50".
#[must_use]
pub fn format_difference(amount: f64) -> String {
    if amount >= 0.0 {
        format!("+{}", format_currency(amount))
    } else {
        format_currency(amount)
    }
}

#[must_use]
pub fn format_contract_line(contract: &contract::Model) -> String {
    format!(
        "#{} {} | {} | {} | advance {:.1}%",
        contract.id, contract.code, contract.name, contract.state, contract.advance_percentage
    )
}

#[must_use]
pub fn format_contract_totals(totals: &ContractTotals) -> Vec<String> {
    vec![
        format!("Original subtotal: {}", format_currency(totals.subtotal)),
        format!("VAT: {}", format_currency(totals.vat)),
        format!("Total: {}", format_currency(totals.total)),
        format!(
            "Advance: {} + VAT {} = {}",
            format_currency(totals.advance_subtotal),
            format_currency(totals.advance_vat),
            format_currency(totals.advance_total)
        ),
    ]
}

/// One line per consolidated concept.
#[must_use]
pub fn format_consolidated_concept(concept: &ConsolidatedConcept) -> String {
    format!(
        "{} | {} | {} {} x {} = {} [{}]",
        concept.concept_key,
        concept.description,
        concept.quantity,
        concept.unit,
        format_currency(concept.unit_price),
        format_currency(concept.subtotal),
        concept.status
    )
}

#[must_use]
pub fn format_snapshot_line(snapshot: &catalog_snapshot::Model) -> String {
    format!(
        "Snapshot v{} of contract {} ({}, {})",
        snapshot.version,
        snapshot.contract_id,
        snapshot.generated_on,
        &snapshot.content_hash[..snapshot.content_hash.len().min(12)]
    )
}

#[must_use]
pub fn format_breakdown(breakdown: &CatalogBreakdown) -> Vec<String> {
    let mut lines = Vec::new();
    for group in &breakdown.groups {
        lines.push(format!(
            "{} {} | {}",
            group.group_number,
            group.group_name,
            format_currency(group.subtotal)
        ));
    }
    lines.push(format!("Subtotal: {}", format_currency(breakdown.subtotal)));
    lines.push(format!("VAT: {}", format_currency(breakdown.vat)));
    lines.push(format!("Total: {}", format_currency(breakdown.total)));
    lines
}

/// Generates the header line of a pre-settlement.
#[must_use]
pub fn format_presettlement_summary(presettlement: &presettlement::Model) -> String {
    format!(
        "Pre-settlement #{} ({}) versions {} -> {}: {} -> {} ({})",
        presettlement.id,
        presettlement.generated_on,
        presettlement.original_version_id,
        presettlement.updated_version_id,
        format_currency(presettlement.total_original),
        format_currency(presettlement.total_updated),
        format_difference(presettlement.total_difference)
    )
}

#[must_use]
pub fn format_detail_line(detail: &presettlement_detail::Model) -> String {
    format!(
        "{} | {} | {} | {} -> {} ({})",
        detail.concept_key,
        detail.change_type,
        detail.description,
        format_currency(detail.original_subtotal),
        format_currency(detail.updated_subtotal),
        format_difference(detail.subtotal_delta)
    )
}

#[must_use]
pub fn format_progress_row(row: &ProgressRow) -> String {
    let status = row.status.map(|s| s.to_string()).unwrap_or_default();
    format!(
        "{} | {} | {} of {} {} {} | pending {} {}",
        row.concept_key,
        row.description,
        row.progress_quantity,
        row.catalog_quantity,
        row.unit,
        format_progress_bar(calculate_progress(row.progress_quantity, row.catalog_quantity), None),
        format_currency(row.pending_subtotal),
        status
    )
    .trim_end()
    .to_string()
}

#[must_use]
pub fn format_progress_comparison(comparison: &ProgressComparison) -> Vec<String> {
    let mut lines = Vec::new();
    for group in &comparison.groups {
        lines.push(format!(
            "{}: catalog {} | executed {} | pending {}",
            group.group_name,
            format_currency(group.totals.catalog),
            format_currency(group.totals.progress),
            format_currency(group.totals.pending)
        ));
        lines.extend(group.rows.iter().map(|row| format!("  {}", format_progress_row(row))));
    }
    lines.push(format!(
        "Total with VAT: catalog {} | executed {} | pending {}",
        format_currency(comparison.totals.catalog),
        format_currency(comparison.totals.progress),
        format_currency(comparison.totals.pending)
    ));
    lines.push(format!(
        "Original contract amount: {} ({})",
        format_currency(comparison.original_contract_amount),
        format_difference(comparison.difference)
    ));
    lines
}

#[must_use]
pub fn format_extraordinary_line(concept: &ExtraordinaryConcept) -> String {
    format!(
        "{} | {} | {} | {} | {} revisions{}",
        concept.concept_key,
        concept.description,
        format_currency(concept.unit_price),
        concept.state,
        concept.revision_count,
        concept
            .comment
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(|c| format!(" | {c}"))
            .unwrap_or_default()
    )
}

/// Generates the header line of an estimation.
#[must_use]
pub fn format_estimation_line(estimation: &estimation::Model) -> String {
    let comment = estimation
        .comment
        .as_deref()
        .filter(|c| !c.is_empty())
        .map(|c| format!(" | {c}"))
        .unwrap_or_default();
    let amortization = estimation
        .amortization
        .map(|a| format!(" | amortizes {}", format_currency(a)))
        .unwrap_or_default();

    format!(
        "Estimation #{} ({}) | {} + VAT {} = {}{}{}",
        estimation.number,
        estimation.estimation_date,
        format_currency(estimation.subtotal),
        format_currency(estimation.vat),
        format_currency(estimation.total),
        comment,
        amortization
    )
}

#[must_use]
pub fn format_estimation_summary(summary: &EstimationSummary) -> Vec<String> {
    let mut lines = vec![format_estimation_line(&summary.estimation)];
    for group in &summary.groups {
        lines.push(format!(
            "{}: {} of original {}",
            group.group_name,
            format_currency(group.estimated_amount),
            format_currency(group.original_amount)
        ));
        for detail in &group.details {
            lines.push(format!(
                "  {} | {} | {} {} x {} = {}",
                detail.concept_key,
                detail.description,
                detail.quantity,
                detail.unit,
                format_currency(detail.unit_price),
                format_currency(detail.subtotal)
            ));
        }
    }
    lines
}

#[must_use]
pub fn format_amortization(position: &Amortization) -> Vec<String> {
    vec![
        format!(
            "Advance {:.1}%: {} + VAT {} = {}",
            position.advance_percentage,
            format_currency(position.advance_subtotal),
            format_currency(position.advance_vat),
            format_currency(position.advance_total)
        ),
        format!("Amortized before: {}", format_currency(position.amortized)),
        format!(
            "Balance: {} + VAT {} = {}",
            format_currency(position.balance),
            format_currency(position.balance_vat),
            format_currency(position.balance_total)
        ),
        format!(
            "Amortization: {} + VAT {} = {}",
            format_currency(position.amount),
            format_currency(position.amount_vat),
            format_currency(position.amount_total)
        ),
    ]
}
