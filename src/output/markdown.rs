//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of a sweep,
//! including run information, status breakdown, cost and unresolved URLs.

use crate::observation::ObservationStatus;
use crate::output::SweepSummary;
use std::fs;
use std::path::Path;

/// Writes a markdown summary
///
/// # Arguments
///
/// * `summary` - The sweep summary data
/// * `output_path` - Path where the markdown file should be written
pub fn write_markdown_summary(summary: &SweepSummary, output_path: &Path) -> std::io::Result<()> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output_path, format_markdown_summary(summary))?;
    tracing::info!("Wrote sweep summary to {}", output_path.display());
    Ok(())
}

/// Formats a sweep summary as markdown
pub fn format_markdown_summary(summary: &SweepSummary) -> String {
    let stats = &summary.statistics;
    let mut md = String::new();

    md.push_str("# Catalog Sweep Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Run ID**: {}\n", summary.run_id));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    if let Some(finished) = &summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished));
    }
    md.push_str(&format!("- **Config Hash**: {}\n\n", summary.config_hash));

    md.push_str("## Passes\n\n");
    md.push_str(&format!("- **Catalog URLs**: {}\n", summary.catalog_size));
    md.push_str(&format!("- **Retried URLs**: {}\n", summary.retried_urls));
    md.push_str(&format!("- **Observations**: {}\n", summary.observations));
    md.push_str(&format!(
        "- **Total Provider Cost**: {:.3}\n",
        stats.total_cost
    ));
    md.push_str(&format!("- **Resolved**: {:.2}%\n\n", stats.resolved_rate()));

    md.push_str("## Status Breakdown\n\n");
    md.push_str("| Status | Count |\n");
    md.push_str("|--------|-------|\n");
    for status in ObservationStatus::all_statuses() {
        md.push_str(&format!("| {} | {} |\n", status, stats.count(status)));
    }
    md.push('\n');

    if let Some(budget) = &summary.budget {
        md.push_str("## Provider Budget\n\n");
        md.push_str(&format!(
            "- **Remaining Credits**: {}\n",
            budget.remaining_credits
        ));
        if let (Some(start), Some(end)) = (&budget.period_start, &budget.period_end) {
            md.push_str(&format!("- **Billing Period**: {} to {}\n", start, end));
        }
        md.push('\n');
    }

    if !summary.unresolved.is_empty() {
        md.push_str(&format!(
            "## Unresolved URLs ({})\n\n",
            summary.unresolved.len()
        ));
        for (url, reason) in &summary.unresolved {
            md.push_str(&format!("- {} ({})\n", url, reason));
        }
        md.push('\n');
    }

    md
}
