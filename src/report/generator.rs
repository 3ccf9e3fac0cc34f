//! Sub-partner table rendering.
//!
//! Produces the dashboard table as plain text, Markdown or JSON, plus the
//! loading indicator shown while a fetch is in flight.

use crate::models::{StatsQuery, SubPartnerStat, BONUS_SHARE};
use anyhow::Result;
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

const TITLE: &str = "Your Sub-Partners";
const HEADERS: [&str; 3] = ["Username", "Total Clicks", "Bonus Clicks Earned"];
const EMPTY_MESSAGE: &str = "No sub-partners yet";

/// JSON document written by `--format json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonReport<'a> {
    pub partner_code: &'a str,
    pub limit: usize,
    pub generated_at: DateTime<Utc>,
    pub sub_partners: &'a [SubPartnerStat],
}

/// Spinner shown on stderr until the view is ready.
pub fn loading_spinner(partner_code: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.magenta} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Loading sub-partners for {}...", partner_code));
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Informational note, shown only when there is at least one row.
pub fn share_note() -> String {
    format!(
        "You earn {}% of all clicks from your sub-partners.",
        (BONUS_SHARE * 100.0).round() as u64
    )
}

/// Format a count with thousands separators (`1234567` -> `1,234,567`).
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out
}

fn row_cells(stat: &SubPartnerStat) -> [String; 3] {
    [
        format!("@{}", stat.username),
        format_count(stat.total_clicks),
        format_count(stat.bonus_clicks_earned),
    ]
}

/// Generate the plain-text table for terminals.
pub fn generate_text_table(stats: &[SubPartnerStat]) -> String {
    let rows: Vec<[String; 3]> = stats.iter().map(row_cells).collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let total_width = widths.iter().sum::<usize>() + 4;

    let mut output = String::new();
    output.push_str(TITLE);
    output.push('\n');
    output.push('\n');

    output.push_str(&format!(
        "{:<w0$}  {:>w1$}  {:>w2$}\n",
        HEADERS[0],
        HEADERS[1],
        HEADERS[2],
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2]
    ));
    output.push_str(&"-".repeat(total_width));
    output.push('\n');

    if rows.is_empty() {
        output.push_str(&format!("{:^w$}\n", EMPTY_MESSAGE, w = total_width));
    }

    for row in &rows {
        output.push_str(&format!(
            "{:<w0$}  {:>w1$}  {:>w2$}\n",
            row[0],
            row[1],
            row[2],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2]
        ));
    }

    if !rows.is_empty() {
        output.push('\n');
        output.push_str(&share_note());
        output.push('\n');
    }

    output
}

/// Generate the Markdown table.
pub fn generate_markdown_table(stats: &[SubPartnerStat]) -> String {
    let mut output = String::new();

    output.push_str(&format!("## {}\n\n", TITLE));
    output.push_str(&format!(
        "| {} | {} | {} |\n",
        HEADERS[0], HEADERS[1], HEADERS[2]
    ));
    output.push_str("|:---|---:|---:|\n");

    if stats.is_empty() {
        output.push_str(&format!("| {} | | |\n", EMPTY_MESSAGE));
        return output;
    }

    for stat in stats {
        let [username, total, bonus] = row_cells(stat);
        output.push_str(&format!("| {} | {} | {} |\n", username, total, bonus));
    }

    output.push('\n');
    output.push_str(&format!("*{}*\n", share_note()));

    output
}

/// Generate the JSON document.
pub fn generate_json_report(query: &StatsQuery, stats: &[SubPartnerStat]) -> Result<String> {
    let report = JsonReport {
        partner_code: query.partner_code(),
        limit: query.limit(),
        generated_at: Utc::now(),
        sub_partners: stats,
    };

    serde_json::to_string_pretty(&report).map_err(Into::into)
}
