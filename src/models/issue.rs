use std::fmt;

use serde::{Deserialize, Serialize};

/// The seven fixed classification categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Performance,
    ErrorHandling,
    LogicCorrectness,
    Maintainability,
    Security,
    DataIntegrity,
    Uncertainty,
}

impl Category {
    /// All categories in report order
    pub const ALL: [Category; 7] = [
        Category::Performance,
        Category::ErrorHandling,
        Category::LogicCorrectness,
        Category::Maintainability,
        Category::Security,
        Category::DataIntegrity,
        Category::Uncertainty,
    ];

    /// Field name in the classification document
    pub fn key(&self) -> &'static str {
        match self {
            Self::Performance => "performance",
            Self::ErrorHandling => "error_handling",
            Self::LogicCorrectness => "logic_correctness",
            Self::Maintainability => "maintainability",
            Self::Security => "security",
            Self::DataIntegrity => "data_integrity",
            Self::Uncertainty => "uncertainty",
        }
    }

    /// Heading used in the per-file report
    pub fn title(&self) -> &'static str {
        match self {
            Self::Performance => "Performance",
            Self::ErrorHandling => "Error Handling",
            Self::LogicCorrectness => "Logic Correctness",
            Self::Maintainability => "Maintainability",
            Self::Security => "Security",
            Self::DataIntegrity => "Data Integrity",
            Self::Uncertainty => "Uncertainty / Open Questions",
        }
    }

    /// Default issue code: the uppercased category name
    pub fn default_code(&self) -> String {
        self.key().to_ascii_uppercase()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Issue severity. Anything absent or unrecognized defaults to `Medium`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Parse a severity label, case-insensitively
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Contribution of one issue to the risk score
    pub fn weight(&self) -> u32 {
        match self {
            Self::Low => 5,
            Self::Medium => 10,
            Self::High => 20,
            Self::Critical => 30,
        }
    }

    /// High and critical issues are surfaced as red flags
    pub fn is_red_flag(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One flagged concern derived from a classification entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub category: Category,
    pub severity: Severity,
    pub message: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl Issue {
    pub fn new(category: Category, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            category,
            severity,
            message: message.into(),
            code: category.default_code(),
            recommendation: None,
        }
    }

    /// Build an issue from a classification entry string.
    ///
    /// Accepted shapes: `[high] message`, `high: message`, and either form
    /// followed by `Recommendation: text`. Anything else is kept as message
    /// text at `Medium` severity.
    pub fn from_entry(category: Category, entry: &str) -> Self {
        let (severity, rest) = split_severity_tag(entry.trim());
        let (message, recommendation) = split_recommendation(rest);

        let mut issue = Issue::new(category, message, severity.unwrap_or_default());
        issue.recommendation = recommendation;
        issue
    }
}

/// Split off a leading severity tag. Only known labels count as tags.
fn split_severity_tag(text: &str) -> (Option<Severity>, &str) {
    if let Some(inner) = text.strip_prefix('[') {
        if let Some(end) = inner.find(']') {
            if let Some(severity) = Severity::parse(&inner[..end]) {
                return (Some(severity), inner[end + 1..].trim_start());
            }
        }
    }

    if let Some((label, rest)) = text.split_once(':') {
        if let Some(severity) = Severity::parse(label) {
            return (Some(severity), rest.trim_start());
        }
    }

    (None, text)
}

fn split_recommendation(text: &str) -> (String, Option<String>) {
    const MARKER: &str = "recommendation:";

    match text.to_ascii_lowercase().find(MARKER) {
        Some(idx) => {
            let message = text[..idx]
                .trim_end()
                .trim_end_matches(['.', ';', '-'])
                .trim_end();
            let recommendation = text[idx + MARKER.len()..].trim();
            let recommendation = (!recommendation.is_empty()).then(|| recommendation.to_string());
            (message.to_string(), recommendation)
        }
        None => (text.to_string(), None),
    }
}
