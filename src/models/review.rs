use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Category, Issue};

/// Classification stage document: one string list per category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub performance: Vec<String>,
    pub error_handling: Vec<String>,
    pub logic_correctness: Vec<String>,
    pub maintainability: Vec<String>,
    pub security: Vec<String>,
    pub data_integrity: Vec<String>,
    pub uncertainty: Vec<String>,
}

impl Classification {
    pub fn entries(&self, category: Category) -> &[String] {
        match category {
            Category::Performance => &self.performance,
            Category::ErrorHandling => &self.error_handling,
            Category::LogicCorrectness => &self.logic_correctness,
            Category::Maintainability => &self.maintainability,
            Category::Security => &self.security,
            Category::DataIntegrity => &self.data_integrity,
            Category::Uncertainty => &self.uncertainty,
        }
    }

    pub fn entries_mut(&mut self, category: Category) -> &mut Vec<String> {
        match category {
            Category::Performance => &mut self.performance,
            Category::ErrorHandling => &mut self.error_handling,
            Category::LogicCorrectness => &mut self.logic_correctness,
            Category::Maintainability => &mut self.maintainability,
            Category::Security => &mut self.security,
            Category::DataIntegrity => &mut self.data_integrity,
            Category::Uncertainty => &mut self.uncertainty,
        }
    }

    /// Flatten every category into issues, in category order
    pub fn issues(&self) -> Vec<Issue> {
        Category::ALL
            .iter()
            .flat_map(|&category| {
                self.entries(category)
                    .iter()
                    .map(move |entry| Issue::from_entry(category, entry))
            })
            .collect()
    }
}

/// Analysis stage document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub summary: String,
    pub risks: Vec<String>,
    pub assumptions: Vec<String>,
    /// Extra fields the service chose to add (e.g. `suggestions`)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// CI gate verdict over a build or deployment log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateVerdict {
    pub deploy_ok: bool,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default = "unknown_severity")]
    pub severity: String,
}

fn unknown_severity() -> String {
    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    #[test]
    fn test_issues_follow_category_order() {
        let classification = Classification {
            security: vec!["[high] SQL injection".to_string()],
            performance: vec!["N+1 query".to_string()],
            ..Default::default()
        };

        let issues = classification.issues();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].category, Category::Performance);
        assert_eq!(issues[1].category, Category::Security);
        assert_eq!(issues[1].severity, Severity::High);
        assert_eq!(issues[1].code, "SECURITY");
    }

    #[test]
    fn test_analysis_keeps_extra_fields() {
        let json = r#"{
            "summary": "Loads invoices",
            "risks": ["Deadlock under load"],
            "assumptions": [],
            "suggestions": ["Split the package"]
        }"#;

        let analysis: Analysis = serde_json::from_str(json).unwrap();
        assert_eq!(analysis.risks, vec!["Deadlock under load"]);
        assert!(analysis.extra.contains_key("suggestions"));

        let round = serde_json::to_value(&analysis).unwrap();
        assert_eq!(round["suggestions"][0], "Split the package");
    }

    #[test]
    fn test_gate_defaults() {
        let verdict: GateVerdict = serde_json::from_str(r#"{"deploy_ok": true}"#).unwrap();
        assert!(verdict.reasons.is_empty());
        assert_eq!(verdict.severity, "unknown");
    }
}
