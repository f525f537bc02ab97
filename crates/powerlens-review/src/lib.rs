pub mod engine;
mod error;
mod parse;
pub mod prompt;
pub mod schema;

pub use error::ReviewError;
pub use parse::parse_analysis;

use powerlens_core::{AiSettings, AnalysisResult, SolutionType};

/// Review `code` with the configured model and return the parsed critique.
///
/// Blank input and unconfigured settings are rejected before any request is made.
pub async fn analyze(
    solution_type: SolutionType,
    code: &str,
    settings: &AiSettings,
) -> Result<AnalysisResult, ReviewError> {
    if code.trim().is_empty() {
        return Err(ReviewError::EmptyInput);
    }
    if !powerlens_core::ai_configured(settings) {
        return Err(ReviewError::NotConfigured);
    }

    let user_msg = prompt::user_message(solution_type, code);
    let format = schema::response_format()?;

    tracing::info!(
        provider = %settings.provider,
        model = %settings.model,
        solution = solution_type.id(),
        input_bytes = code.len(),
        "sending analysis request"
    );

    let raw = engine::generate(settings, prompt::SYSTEM_INSTRUCTION, &user_msg, format)
        .await
        .inspect_err(|e| tracing::error!("analysis request failed: {e}"))?;
    tracing::debug!("raw LLM output:\n{raw}");

    let result = parse_analysis(&raw).inspect_err(|e| tracing::error!("{e}"))?;
    tracing::info!(
        score = result.score,
        issues = result.issues.len(),
        "analysis complete"
    );
    Ok(result)
}
