use thiserror::Error;

/// Errors surfaced by the report pipeline.
///
/// Degenerate but structurally valid inputs (zero-cost clients, empty driver
/// lists, unmatched narrative rules) never error; they fall back to sentinel
/// values so the report always renders.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Malformed report request. Nothing runs after this.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Raw cost records inconsistent with the request. The pipeline aborts
    /// before producing any artifact.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Renderer-level failure, tagged with the stage that raised it.
    #[error("render failed in {stage}: {message}")]
    Render {
        stage: &'static str,
        message: String,
    },
}

impl ReportError {
    pub fn render(stage: &'static str, message: impl Into<String>) -> Self {
        ReportError::Render {
            stage,
            message: message.into(),
        }
    }
}
