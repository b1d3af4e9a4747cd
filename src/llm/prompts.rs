use crate::models::StageName;

/// An instruction/context pair sent to the completion service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRequest {
    pub system: String,
    pub user: String,
}

impl StageRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Canonical shape of the classification document
pub const CLASSIFICATION_TEMPLATE: &str = r#"{
  "performance": ["string"],
  "error_handling": ["string"],
  "logic_correctness": ["string"],
  "maintainability": ["string"],
  "security": ["string"],
  "data_integrity": ["string"],
  "uncertainty": ["string"]
}"#;

/// Canonical shape of the analysis document
pub const ANALYSIS_TEMPLATE: &str = r#"{
  "summary": "string",
  "risks": ["string"],
  "assumptions": ["string"]
}"#;

/// Canonical shape of the CI gate verdict
pub const GATE_TEMPLATE: &str = r#"{
  "deploy_ok": true,
  "reasons": ["string"],
  "severity": "low | medium | high"
}"#;

/// Template used by the correction pass for a structured stage
pub fn template_for(stage: StageName) -> Option<&'static str> {
    match stage {
        StageName::Classification => Some(CLASSIFICATION_TEMPLATE),
        StageName::Analysis => Some(ANALYSIS_TEMPLATE),
        StageName::Gate => Some(GATE_TEMPLATE),
        StageName::Summary | StageName::Refactor => None,
    }
}

const REVIEWER_RULES: &str = r#"- Stay strictly within what the code shows.
- Do not invent behavior, variables, objects, schema, or business rules.
- Do not infer functionality that is not explicitly present.
- If something is unclear, say so explicitly instead of guessing."#;

/// Build the request for a source-file stage
pub fn build_stage_request(stage: StageName, code: &str) -> StageRequest {
    match stage {
        StageName::Summary => build_summary_request(code),
        StageName::Classification => build_classification_request(code),
        StageName::Analysis => build_analysis_request(code),
        StageName::Refactor => build_refactor_request(code),
        StageName::Gate => build_gate_request(code),
    }
}

pub fn build_summary_request(code: &str) -> StageRequest {
    let system = "You are a principal code reviewer. You are literal and conservative, \
                  and you never guess. If the intent of the code is unclear you say so.";

    let user = format!(
        r#"[TASK]
Summarize only what the code below explicitly shows. Do not critique it.

[CONSTRAINTS]
{REVIEWER_RULES}
- Mark any unclear portion as "UNCERTAIN".

[OUTPUT]
One short paragraph of 3-5 sentences. No code, no examples, no commentary.

[INPUT CODE]
{code}"#
    );

    StageRequest::new(system, user)
}

pub fn build_classification_request(code: &str) -> StageRequest {
    let system = "You are a principal code reviewer. You identify potential issues and \
                  classify them into predefined categories without inventing anything.";

    let user = format!(
        r#"[TASK]
Identify potential issues in the code below and assign each one to exactly one category:
performance, error_handling, logic_correctness, maintainability, security, data_integrity, uncertainty.
Return an empty list for any category without issues.

[CONSTRAINTS]
{REVIEWER_RULES}
- If you are unsure whether something is an issue, put it under "uncertainty" and say why.
- Start each entry with a severity tag: [low], [medium], [high] or [critical].
- You may end an entry with "Recommendation: <short fix>".

[OUTPUT]
Return only a JSON object in exactly this structure:

{CLASSIFICATION_TEMPLATE}

Each entry must be a short, human-readable string. The JSON must be syntactically valid.

[INPUT CODE]
{code}"#
    );

    StageRequest::new(system, user)
}

pub fn build_analysis_request(code: &str) -> StageRequest {
    let system = "You are a senior code reviewer. You analyze the provided code and emit a \
                  JSON object with a summary, risks, and assumptions.";

    let user = format!(
        r#"[TASK]
Produce a concise summary of what the code does, the risks it may introduce, and the
assumptions it appears to make.

[CONSTRAINTS]
{REVIEWER_RULES}
- When context is missing, write "UNKNOWN: <what is missing>" inside a string value.
- Do not put comments (// or /* */) or any text outside the JSON.

[OUTPUT]
Return only a JSON object in exactly this structure:

{ANALYSIS_TEMPLATE}

Every item in "risks" and "assumptions" must be a plain JSON string.

[INPUT CODE]
{code}"#
    );

    StageRequest::new(system, user)
}

pub fn build_refactor_request(code: &str) -> StageRequest {
    let system = "You are a principal engineer. You refactor code for readability and \
                  maintainability while preserving its behavior exactly.";

    let user = format!(
        r#"[TASK]
Improve formatting, structure, and readability of the code below.

[CONSTRAINTS]
- Do not change business rules, conditions, statements, or error handling.
- Do not rename variables, parameters, or routines.
- Do not introduce new dependencies.
- If a change would alter behavior, keep the original structure.

[OUTPUT]
Return only the full refactored code. No explanations and no markdown fences.

[INPUT CODE]
{code}"#
    );

    StageRequest::new(system, user)
}

/// Build the gate request over a CI log
pub fn build_gate_request(log_text: &str) -> StageRequest {
    let system = "You are a deployment gatekeeper. You read CI logs and decide whether the \
                  build is safe to deploy. You answer strictly in JSON.";

    let user = format!(
        r#"[TASK]
Analyze the CI log below. Decide whether deployment should proceed and list the reasons.

[OUTPUT]
Return only a JSON object in exactly this structure:

{GATE_TEMPLATE}

[CI LOG]
{log_text}"#
    );

    StageRequest::new(system, user)
}

/// Build the correction request.
///
/// Only the malformed reply and the stage template are sent; the original
/// source text never is.
pub fn build_correction_request(raw: &str, template: &str) -> StageRequest {
    let system = "You are a strict JSON repair assistant. You turn malformed JSON into valid \
                  JSON matching a template without changing the meaning of any value.";

    let user = format!(
        r#"[TASK]
Fix only the syntax of the raw JSON-like text below so that it is valid JSON matching the template.

[CONSTRAINTS]
- Do not add, remove, or rename fields.
- Do not convert strings to other types.
- Do not include comments or any text outside the JSON.

[TEMPLATE]
{template}

[RAW_JSON]
{raw}"#
    );

    StageRequest::new(system, user)
}
