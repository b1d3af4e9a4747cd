use serde_json::{Map, Value};
use tracing::warn;

use crate::error::ReviewError;
use crate::models::{Analysis, Category, Classification, GateVerdict, StageName};

/// Data-definition and data-manipulation markers that do not belong in a
/// behavioral summary
const SUMMARY_CODE_MARKERS: &[&str] = &[
    "CREATE TABLE",
    "ALTER TABLE",
    "DROP TABLE",
    "INSERT INTO",
    "DELETE FROM",
    "TRUNCATE TABLE",
];

/// Check a free-text summary.
///
/// Only emptiness is an error. Code markers are returned and logged as
/// advisory warnings.
pub fn validate_summary(summary: &str) -> Result<Vec<&'static str>, ReviewError> {
    if summary.trim().is_empty() {
        return Err(ReviewError::EmptyOutput {
            stage: StageName::Summary,
        });
    }

    let upper = summary.to_uppercase();
    let markers: Vec<&'static str> = SUMMARY_CODE_MARKERS
        .iter()
        .copied()
        .filter(|marker| upper.contains(marker))
        .collect();

    if !markers.is_empty() {
        warn!("Summary contains code-like content: {:?}", markers);
    }

    Ok(markers)
}

/// Validate a parsed classification document against its seven-category contract
pub fn validate_classification(value: &Value) -> Result<Classification, ReviewError> {
    let stage = StageName::Classification;
    let object = as_object(stage, value)?;

    let mut classification = Classification::default();
    for category in Category::ALL {
        *classification.entries_mut(category) = string_list(stage, object, category.key())?;
    }

    Ok(classification)
}

/// Validate a parsed analysis document: `summary`, `risks`, `assumptions`
pub fn validate_analysis(value: &Value) -> Result<Analysis, ReviewError> {
    let stage = StageName::Analysis;
    let object = as_object(stage, value)?;

    let summary = string_field(stage, object, "summary")?;
    let risks = string_list(stage, object, "risks")?;
    let assumptions = string_list(stage, object, "assumptions")?;

    let extra = object
        .iter()
        .filter(|(key, _)| !matches!(key.as_str(), "summary" | "risks" | "assumptions"))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok(Analysis {
        summary,
        risks,
        assumptions,
        extra,
    })
}

/// Validate a parsed gate verdict. `reasons` and `severity` are optional.
pub fn validate_gate(value: &Value) -> Result<GateVerdict, ReviewError> {
    let stage = StageName::Gate;
    let object = as_object(stage, value)?;

    let deploy_ok = match object.get("deploy_ok") {
        Some(Value::Bool(ok)) => *ok,
        Some(other) => {
            return Err(ReviewError::schema(
                stage,
                format!("'deploy_ok' must be a boolean, got {}", kind_of(other)),
            ));
        }
        None => return Err(ReviewError::schema(stage, "missing required key 'deploy_ok'")),
    };

    let reasons = if object.contains_key("reasons") {
        string_list(stage, object, "reasons")?
    } else {
        Vec::new()
    };

    let severity = if object.contains_key("severity") {
        string_field(stage, object, "severity")?
    } else {
        "unknown".to_string()
    };

    Ok(GateVerdict {
        deploy_ok,
        reasons,
        severity,
    })
}

fn as_object(stage: StageName, value: &Value) -> Result<&Map<String, Value>, ReviewError> {
    value.as_object().ok_or_else(|| {
        ReviewError::schema(stage, format!("expected a JSON object, got {}", kind_of(value)))
    })
}

fn string_field(
    stage: StageName,
    object: &Map<String, Value>,
    key: &str,
) -> Result<String, ReviewError> {
    match object.get(key) {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(other) => Err(ReviewError::schema(
            stage,
            format!("'{key}' must be a string, got {}", kind_of(other)),
        )),
        None => Err(ReviewError::schema(stage, format!("missing required key '{key}'"))),
    }
}

fn string_list(
    stage: StageName,
    object: &Map<String, Value>,
    key: &str,
) -> Result<Vec<String>, ReviewError> {
    let items = match object.get(key) {
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(ReviewError::schema(
                stage,
                format!("'{key}' must be a list, got {}", kind_of(other)),
            ));
        }
        None => return Err(ReviewError::schema(stage, format!("missing required key '{key}'"))),
    };

    items
        .iter()
        .map(|item| match item {
            Value::String(text) => Ok(text.clone()),
            other => Err(ReviewError::schema(
                stage,
                format!("entry in '{key}' is not a string: {other}"),
            )),
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
