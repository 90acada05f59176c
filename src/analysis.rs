//! Boundary to the remote vision-analysis collaborator.
//!
//! The engine never blocks persistence on analysis: a failed or absent
//! analyzer degrades a save to `analysis = None`. Concrete clients (the
//! hosted vision model call) live with the front ends; this crate only fixes
//! the contract and the prompt.

use thiserror::Error;

/// Prompt sent alongside the drawing snapshot.
pub const ANALYSIS_PROMPT: &str = "\
Analyze this hand-drawn image and:
1. Identify any geometric shapes present
2. Detect any mathematical expressions or equations
3. Describe any patterns or symbols
4. Provide a brief interpretation of what's drawn";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis request failed: {0}")]
    Request(String),
    #[error("analysis service rejected the credentials")]
    InvalidCredentials,
    #[error("analysis quota exhausted")]
    QuotaExhausted,
}

/// Interprets a PNG-encoded drawing into free-text commentary.
///
/// Calls may be slow and are always dispatched on a blocking worker by the
/// save orchestrator. Absence of a configured analyzer is a valid skip
/// state, not an error.
pub trait ImageAnalyzer: Send + Sync + 'static {
    fn analyze(&self, image_png: &[u8]) -> Result<String, AnalysisError>;
}
