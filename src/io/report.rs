//! Markdown renderings of validated review data.

use crate::models::{AggregatedSummary, Analysis, Category, Classification};

fn bullet_list(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        return format!("- {}\n", empty);
    }
    let mut out = String::new();
    for item in items {
        out.push_str(&format!("- {}\n", item));
    }
    out
}

/// Per-file review report with a fixed section order
pub fn render_file_report(
    file_name: &str,
    summary: &str,
    classification: &Classification,
    analysis: &Analysis,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    parts.push(format!("# Code Review: {}\n", file_name));
    parts.push("## Summary\n".to_string());
    parts.push(format!("{}\n", summary.trim()));

    parts.push("## Issue Categories\n".to_string());
    for category in Category::ALL {
        parts.push(format!(
            "### {}\n\n{}",
            category.title(),
            bullet_list(classification.entries(category), "*(none detected)*")
        ));
    }

    parts.push("## Risks\n".to_string());
    parts.push(bullet_list(&analysis.risks, "*(none explicitly identified)*"));

    parts.push("## Assumptions\n".to_string());
    parts.push(bullet_list(
        &analysis.assumptions,
        "*(none explicitly identified)*",
    ));

    parts.push("## Refactor Suggestions (Optional / Future Work)\n".to_string());
    parts.push(
        "- This report does not include automated refactor output.\n\
         - Run with `--refactor` to generate a behavior-preserving rewrite.\n"
            .to_string(),
    );

    parts.join("\n")
}

/// Run-level summary report
pub fn render_run_summary(summary: &AggregatedSummary) -> String {
    let mut lines: Vec<String> = vec![
        "# Code Review Report".to_string(),
        String::new(),
        format!("- Run ID: `{}`", summary.run_id),
        format!("- Files scanned: **{}**", summary.scanned_files),
        format!(
            "- Overall risk score: **{}** / 100",
            summary.overall_risk_score
        ),
        String::new(),
    ];

    if !summary.red_flags.is_empty() {
        lines.push("## Red Flags (High/Critical)".to_string());
        lines.push(String::new());
        for flag in &summary.red_flags {
            lines.push(format!(
                "- **{}** in `{}` ({}): {}",
                flag.severity.as_str().to_uppercase(),
                flag.file,
                flag.code,
                flag.message
            ));
        }
        lines.push(String::new());
    }

    if !summary.checklist.is_empty() {
        lines.push("## Review Checklist".to_string());
        lines.push(String::new());
        for item in &summary.checklist {
            lines.push(format!("- [ ] {}", item));
        }
        lines.push(String::new());
    }

    if !summary.files.is_empty() {
        lines.push("## Per-File Highlights".to_string());
        lines.push(String::new());
        for file in &summary.files {
            lines.push(format!("### `{}`", file.path));
            lines.push(String::new());
            if !file.summary.is_empty() {
                lines.push(format!("**Summary:** {}", file.summary));
                lines.push(String::new());
            }
            if !file.issues.is_empty() {
                lines.push("**Issues:**".to_string());
                for issue in &file.issues {
                    lines.push(format!(
                        "- {} {}: {}",
                        issue.severity.as_str().to_uppercase(),
                        issue.code,
                        issue.message
                    ));
                }
                lines.push(String::new());
            }
            if !file.refactor_suggestions.is_empty() {
                lines.push("**Refactor Suggestions:**".to_string());
                for suggestion in &file.refactor_suggestions {
                    lines.push(format!("- {}", suggestion));
                }
                lines.push(String::new());
            }
        }
    }

    lines.join("\n")
}
