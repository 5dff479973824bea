//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::ValidationResult;
use crate::history::{HistoryEntry, HistoryOutcome};
use crate::provisioning::{ExecutionResult, ExecutionStatus};
use crate::workflow::{ProposeResult, ProposeStatus};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// History row for table display.
#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "When")]
    when: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Code")]
    fingerprint: String,
    #[tabled(rename = "Operator")]
    operator: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the result of a proposal.
    #[must_use]
    pub fn format_proposal(&self, result: &ProposeResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Text => match result.status {
                ProposeStatus::PlanGenerated => {
                    let mut output = format!("\n{} Proposed plan\n\n", "📋".bold());
                    let _ = writeln!(output, "{}\n", result.description);
                    let _ = writeln!(output, "{}", "--- terraform ---".dimmed());
                    let _ = writeln!(output, "{}", result.code.trim_end());
                    let _ = writeln!(output, "{}", "-----------------".dimmed());
                    output
                }
                ProposeStatus::Error => {
                    format!("{} Plan generation failed: {}\n", "✗".red(), result.description)
                }
            },
        }
    }

    /// Formats the result of a confirm.
    #[must_use]
    pub fn format_execution(&self, result: &ExecutionResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Text => {
                let headline = match result.status {
                    ExecutionStatus::Success => format!("{} Apply complete", "✓".green()),
                    ExecutionStatus::Error => format!("{} Provisioning failed", "✗".red()),
                    ExecutionStatus::Cancelled => format!("{} Cancelled", "⚠".yellow()),
                };

                let mut output = format!("{headline}\n");
                let message = result.output.trim_end();
                if !message.is_empty() {
                    let _ = write!(output, "\n{message}\n");
                }
                output
            }
        }
    }

    /// Formats recorded history entries (newest first).
    #[must_use]
    pub fn format_history(&self, entries: &[HistoryEntry]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(entries).unwrap_or_default(),
            OutputFormat::Text => {
                if entries.is_empty() {
                    return String::from("   No history recorded yet.\n");
                }

                let rows: Vec<HistoryRow> = entries
                    .iter()
                    .map(|e| HistoryRow {
                        when: e.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                        outcome: Self::format_outcome(e.outcome),
                        description: Self::truncate(
                            e.description.lines().next().unwrap_or_default(),
                            50,
                        ),
                        fingerprint: e.short_fingerprint().to_string(),
                        operator: e.operator.clone(),
                    })
                    .collect();

                let mut output = format!("\n🕘 History ({} entries)\n\n", entries.len());
                output.push_str(&Table::new(rows).to_string());
                output.push('\n');
                output
            }
        }
    }

    /// Formats configuration validation findings.
    #[must_use]
    pub fn format_validation(&self, result: &ValidationResult) -> String {
        let mut output = String::new();
        for error in &result.errors {
            let _ = writeln!(output, "{} {}", "✗".red(), error);
        }
        for warning in &result.warnings {
            let _ = writeln!(output, "{} {}", "⚠".yellow(), warning);
        }
        output
    }

    /// Formats an outcome with color.
    fn format_outcome(outcome: HistoryOutcome) -> String {
        match outcome {
            HistoryOutcome::Success => "success".green().to_string(),
            HistoryOutcome::Error => "error".red().to_string(),
            HistoryOutcome::Cancelled => "cancelled".yellow().to_string(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}
