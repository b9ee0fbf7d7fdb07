//! Markdown report generation for Ascent progress reports.
//!
//! This module provides the [`MarkdownGenerator`] struct for converting a
//! [`ProgressReport`] into a human-readable Markdown document: a summary
//! table, the mastery ladder, the session timeline, hint spend, and
//! prioritized recommendations.

use std::fmt::Write;

use crate::{MasteryRow, ProgressReport, Recommendation, TimelineEntry};

/// Generates Markdown from an Ascent progress report.
pub struct MarkdownGenerator<'a> {
    report: &'a ProgressReport,
}

impl<'a> MarkdownGenerator<'a> {
    /// Creates a new Markdown generator for the given report.
    #[must_use]
    pub const fn new(report: &'a ProgressReport) -> Self {
        Self { report }
    }

    /// Generates the complete Markdown report.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();

        self.write_title(&mut output);
        self.write_summary(&mut output);
        self.write_mastery(&mut output);
        self.write_timeline(&mut output);
        self.write_hint_usage(&mut output);
        self.write_recommendations(&mut output);

        output
    }

    /// Writes the report title.
    fn write_title(&self, output: &mut String) {
        let _ = writeln!(
            output,
            "# Ascent Progress Report: {}\n",
            escape_markdown(&self.report.user)
        );
    }

    /// Writes the summary section with a metrics table.
    fn write_summary(&self, output: &mut String) {
        let summary = &self.report.summary;

        let _ = writeln!(output, "## Summary\n");
        let _ = writeln!(output, "| Metric | Value |");
        let _ = writeln!(output, "|--------|-------|");
        let _ = writeln!(output, "| Attempts | {} |", summary.attempts_total);
        let _ = writeln!(output, "| Completed | {} |", summary.completed);
        let _ = writeln!(output, "| Abandoned | {} |", summary.abandoned);
        let _ = writeln!(output, "| In progress | {} |", summary.in_progress);
        match summary.average_score {
            Some(avg) => {
                let _ = writeln!(output, "| Average score | {avg:.1} |");
            }
            None => {
                let _ = writeln!(output, "| Average score | - |");
            }
        }
        let _ = writeln!(output);
    }

    /// Writes the mastery ladder section.
    fn write_mastery(&self, output: &mut String) {
        let _ = writeln!(output, "## Mastery Ladder\n");

        if self.report.mastery.is_empty() {
            let _ = writeln!(output, "*No skills practiced yet.*\n");
            return;
        }

        let _ = writeln!(output, "| Pattern | Rung | Score | Attempts | Next rung |");
        let _ = writeln!(output, "|---------|------|-------|----------|-----------|");
        for row in &self.report.mastery {
            Self::write_mastery_row(output, row);
        }
        let _ = writeln!(output);
    }

    fn write_mastery_row(output: &mut String, row: &MasteryRow) {
        let unlock = if row.next_rung_unlocked {
            "unlocked"
        } else {
            "locked"
        };
        let _ = writeln!(
            output,
            "| {} | {} | {:.1} | {} | {} |",
            row.pattern.label(),
            row.rung,
            row.score,
            row.attempts_count,
            unlock
        );
    }

    /// Writes the session timeline.
    fn write_timeline(&self, output: &mut String) {
        let _ = writeln!(output, "## Timeline\n");

        if self.report.timeline.is_empty() {
            let _ = writeln!(output, "*No session activity recorded.*\n");
            return;
        }

        for entry in &self.report.timeline {
            Self::write_timeline_entry(output, entry);
        }
        let _ = writeln!(output);
    }

    fn write_timeline_entry(output: &mut String, entry: &TimelineEntry) {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S UTC");
        match &entry.details {
            Some(details) => {
                let _ = writeln!(
                    output,
                    "- `{timestamp}` [{}] {} ({})",
                    entry.attempt_id,
                    escape_markdown(&entry.event),
                    escape_markdown(details)
                );
            }
            None => {
                let _ = writeln!(
                    output,
                    "- `{timestamp}` [{}] {}",
                    entry.attempt_id,
                    escape_markdown(&entry.event)
                );
            }
        }
    }

    /// Writes the hint usage section.
    fn write_hint_usage(&self, output: &mut String) {
        let usage = &self.report.hint_usage;
        let _ = writeln!(output, "## Hint Usage\n");

        if usage.total_hints == 0 {
            let _ = writeln!(output, "*No hints used.*\n");
            return;
        }

        let _ = writeln!(
            output,
            "{} hints granted, {} budget points spent.\n",
            usage.total_hints, usage.total_points
        );
        for level_count in &usage.by_level {
            let _ = writeln!(
                output,
                "- {} x{}",
                level_count.level, level_count.count
            );
        }
        let _ = writeln!(output);
    }

    /// Writes the recommendations section.
    fn write_recommendations(&self, output: &mut String) {
        let _ = writeln!(output, "## Recommendations\n");

        if self.report.recommendations.is_empty() {
            let _ = writeln!(output, "*No recommendations.*\n");
            return;
        }

        for rec in &self.report.recommendations {
            Self::write_recommendation(output, rec);
        }
        let _ = writeln!(output);
    }

    fn write_recommendation(output: &mut String, rec: &Recommendation) {
        let _ = writeln!(
            output,
            "{}. **[{}]** {}",
            rec.priority,
            rec.category,
            escape_markdown(&rec.description)
        );
    }
}

/// Escapes Markdown special characters in user-provided text.
fn escape_markdown(text: &str) -> String {
    text.replace('|', "\\|").replace('*', "\\*")
}
