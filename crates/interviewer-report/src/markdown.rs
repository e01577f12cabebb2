//! Markdown report generation for finished interviews.
//!
//! This module provides the [`MarkdownGenerator`] struct for converting a [`Report`]
//! into a human-readable Markdown document for hiring reviewers. The generated
//! report includes:
//!
//! - A summary table with the score, tier, and timing
//! - A per-question breakdown with evaluations
//! - Overall strengths, weaknesses, and recommendations
//!
//! # Example
//!
//! ```rust
//! use interviewer_report::{MarkdownGenerator, Report};
//!
//! let report = Report::builder()
//!     .session_id("3f2a")
//!     .candidate("Ada", 3)
//!     .build()
//!     .unwrap();
//!
//! let markdown = MarkdownGenerator::new(&report).generate();
//! assert!(markdown.contains("# Interview Report: Ada"));
//! ```

use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::{QuestionAnswer, Report};

/// Generates Markdown reports from finished interviews.
pub struct MarkdownGenerator<'a> {
    report: &'a Report,
}

impl<'a> MarkdownGenerator<'a> {
    /// Creates a new Markdown generator for the given report.
    #[must_use]
    pub const fn new(report: &'a Report) -> Self {
        Self { report }
    }

    /// Generates the complete Markdown report.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();

        self.write_title(&mut output);
        self.write_summary(&mut output);
        self.write_questions(&mut output);
        self.write_feedback(&mut output);
        Self::write_footer(&mut output);

        output
    }

    /// Writes the report title.
    fn write_title(&self, output: &mut String) {
        let _ = writeln!(
            output,
            "# Interview Report: {}\n",
            escape_markdown(&self.report.candidate_name)
        );
    }

    /// Writes the summary section with metrics table.
    fn write_summary(&self, output: &mut String) {
        let report = self.report;

        let _ = writeln!(output, "## Summary\n");
        let _ = writeln!(output, "| Metric | Value |");
        let _ = writeln!(output, "|--------|-------|");
        let _ = writeln!(output, "| Session | {} |", escape_markdown(&report.session_id));
        let _ = writeln!(
            output,
            "| Experience | {} years |",
            report.candidate_experience
        );
        let _ = writeln!(output, "| Difficulty | {} |", report.difficulty);
        let _ = writeln!(
            output,
            "| Questions Answered | {} / {} |",
            report.answered_count(),
            report.total_questions
        );
        let _ = writeln!(output, "| Average Score | {:.1} / 10 |", report.average_score);
        let _ = writeln!(
            output,
            "| Recommendation | {} |",
            report.hire_recommendation
        );
        let _ = writeln!(
            output,
            "| Duration | {} |",
            format_duration(report.duration_seconds)
        );
        let _ = writeln!(output, "| Ended | {} |", format_timestamp(&report.ended_at));
        let _ = writeln!(output);

        if !report.summary.is_empty() {
            let _ = writeln!(output, "{}\n", escape_markdown(&report.summary));
        }
    }

    /// Writes one subsection per answered question.
    fn write_questions(&self, output: &mut String) {
        let _ = writeln!(output, "## Questions\n");

        if self.report.questions_and_answers.is_empty() {
            let _ = writeln!(output, "*No questions were answered.*\n");
            return;
        }

        for qa in &self.report.questions_and_answers {
            Self::write_question(output, qa);
        }
    }

    /// Writes a single question entry.
    fn write_question(output: &mut String, qa: &QuestionAnswer) {
        let _ = writeln!(
            output,
            "### Q{}: {}\n",
            qa.question_number,
            escape_markdown(&qa.question)
        );
        let _ = writeln!(output, "**Answer**: {}\n", escape_markdown(&qa.answer));
        let _ = writeln!(output, "**Score**: {:.1} / 10", qa.score);

        if !qa.evaluation.rationale.is_empty() {
            let _ = writeln!(
                output,
                "**Evaluation**: {}",
                escape_markdown(&qa.evaluation.rationale)
            );
        }
        write_inline_list(output, "Strengths", &qa.evaluation.strengths);
        write_inline_list(output, "Improvements", &qa.evaluation.improvements);
        let _ = writeln!(output);
    }

    /// Writes the overall feedback lists.
    fn write_feedback(&self, output: &mut String) {
        write_section(output, "Strengths", &self.report.strengths);
        write_section(output, "Weaknesses", &self.report.weaknesses);
        write_section(output, "Recommendations", &self.report.recommendations);
    }

    /// Writes the report footer.
    fn write_footer(output: &mut String) {
        let _ = writeln!(output, "---");
        let timestamp = format_timestamp(&Utc::now());
        let _ = writeln!(output, "*Generated by Interviewer at {timestamp}*");
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Writes a `## title` section containing a numbered list.
fn write_section(output: &mut String, title: &str, items: &[String]) {
    let _ = writeln!(output, "## {title}\n");

    if items.is_empty() {
        let _ = writeln!(output, "*None recorded.*\n");
        return;
    }

    for (index, item) in items.iter().enumerate() {
        let _ = writeln!(output, "{}. {}", index + 1, escape_markdown(item));
    }
    let _ = writeln!(output);
}

/// Writes `**label**: a; b; c` when `items` is non-empty.
fn write_inline_list(output: &mut String, label: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let joined = items
        .iter()
        .map(|item| escape_markdown(item))
        .collect::<Vec<_>>()
        .join("; ");
    let _ = writeln!(output, "**{label}**: {joined}");
}

/// Formats a duration in seconds to a human-readable string.
///
/// Examples: "45s", "2m 30s", "1h 5m 3s"
fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::new();

    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{secs}s"));
    }

    parts.join(" ")
}

/// Formats a timestamp for display.
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Escapes characters with special meaning in Markdown.
///
/// Newlines become `<br>` so multi-line answers stay inside table cells and
/// list items.
fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch {
            '*' | '_' | '`' | '#' | '[' | ']' | '(' | ')' | '!' | '\\' | '<' | '>' | '|' => {
                result.push('\\');
                result.push(ch);
            }
            '\n' => result.push_str("<br>"),
            _ => result.push(ch),
        }
    }

    result
}
