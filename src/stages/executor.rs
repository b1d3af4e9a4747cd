use serde_json::Value;
use tracing::{debug, warn};

use super::CorrectionState;
use crate::error::ReviewError;
use crate::llm::{
    CompletionService, StageRequest, build_correction_request, build_stage_request, template_for,
    validate_analysis, validate_classification, validate_gate, validate_summary,
};
use crate::models::{Analysis, Classification, GateVerdict, StageName, StageOutcome, StageResult};

/// Send one request and return the trimmed reply
async fn send<S: CompletionService>(
    service: &S,
    stage: StageName,
    request: &StageRequest,
) -> Result<String, ReviewError> {
    let reply = service
        .complete(request)
        .await
        .map_err(|source| ReviewError::Service { stage, source })?;
    Ok(reply.trim().to_string())
}

/// Run a free-text stage. An empty reply fails with `EmptyOutput`.
pub async fn run_text_stage<S: CompletionService>(
    service: &S,
    stage: StageName,
    request: &StageRequest,
) -> Result<StageOutcome<String>, ReviewError> {
    let raw = send(service, stage, request).await?;
    if raw.is_empty() {
        return Err(ReviewError::EmptyOutput { stage });
    }

    Ok(StageOutcome {
        value: raw.clone(),
        result: StageResult::text(stage, raw),
    })
}

/// Run a structured stage with at most one correction pass.
///
/// Schema validation happens after parsing and is never corrected: a
/// `SchemaViolation` from `validate` propagates as-is.
pub async fn run_structured_stage<S, T, F>(
    service: &S,
    stage: StageName,
    request: &StageRequest,
    validate: F,
) -> Result<StageOutcome<T>, ReviewError>
where
    S: CompletionService,
    F: FnOnce(&Value) -> Result<T, ReviewError>,
{
    let template = template_for(stage).ok_or_else(|| {
        ReviewError::schema(stage, "stage has no structured output contract")
    })?;

    let raw = send(service, stage, request).await?;

    let mut state = CorrectionState::start(&raw);
    if let CorrectionState::CorrectionRequested { raw, error } = &state {
        warn!("{} JSON malformed, attempting correction: {}", stage, error);
        let correction = build_correction_request(raw, template);
        let fixed = send(service, stage, &correction).await?;
        state = state.resolve(&fixed);
    }

    let (parsed, raw, corrected) = state.finish(stage)?;
    if corrected {
        debug!("{} JSON repaired by correction pass", stage);
    }

    let value = validate(&parsed)?;

    Ok(StageOutcome {
        value,
        result: StageResult::structured(stage, raw, parsed, corrected),
    })
}

/// Narrative summary of a source file
pub async fn run_summary_stage<S: CompletionService>(
    service: &S,
    code: &str,
) -> Result<StageOutcome<String>, ReviewError> {
    let request = build_stage_request(StageName::Summary, code);
    let outcome = run_text_stage(service, StageName::Summary, &request).await?;
    validate_summary(&outcome.value)?;
    Ok(outcome)
}

pub async fn run_classification_stage<S: CompletionService>(
    service: &S,
    code: &str,
) -> Result<StageOutcome<Classification>, ReviewError> {
    let request = build_stage_request(StageName::Classification, code);
    run_structured_stage(service, StageName::Classification, &request, validate_classification)
        .await
}

pub async fn run_analysis_stage<S: CompletionService>(
    service: &S,
    code: &str,
) -> Result<StageOutcome<Analysis>, ReviewError> {
    let request = build_stage_request(StageName::Analysis, code);
    run_structured_stage(service, StageName::Analysis, &request, validate_analysis).await
}

/// Behavior-preserving rewrite; only non-emptiness is checked
pub async fn run_refactor_stage<S: CompletionService>(
    service: &S,
    code: &str,
) -> Result<StageOutcome<String>, ReviewError> {
    let request = build_stage_request(StageName::Refactor, code);
    run_text_stage(service, StageName::Refactor, &request).await
}

/// Deploy verdict over a CI log
pub async fn run_gate_stage<S: CompletionService>(
    service: &S,
    log_text: &str,
) -> Result<StageOutcome<GateVerdict>, ReviewError> {
    let request = build_stage_request(StageName::Gate, log_text);
    run_structured_stage(service, StageName::Gate, &request, validate_gate).await
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use anyhow::Result;

    use crate::llm::{CompletionService, StageRequest};

    /// Replays canned replies in order and records every request
    pub struct ScriptedService {
        replies: Mutex<VecDeque<Result<String, String>>>,
        pub requests: Mutex<Vec<StageRequest>>,
    }

    impl ScriptedService {
        pub fn new<I, R>(replies: I) -> Self
        where
            I: IntoIterator<Item = R>,
            R: Into<String>,
        {
            Self {
                replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Queue a transport failure
        pub fn push_error(&self, message: &str) {
            self.replies
                .lock()
                .unwrap()
                .push_back(Err(message.to_string()));
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn remaining(&self) -> usize {
            self.replies.lock().unwrap().len()
        }
    }

    impl CompletionService for ScriptedService {
        async fn complete(&self, request: &StageRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(message)) => Err(anyhow::anyhow!(message)),
                None => Err(anyhow::anyhow!("no scripted reply left")),
            }
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }
}
