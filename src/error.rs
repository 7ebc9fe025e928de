use crate::asset::DecodeError;
use axum::http::StatusCode;

/// Message shown when the form is submitted without an image.
pub const MISSING_INPUT_MESSAGE: &str = "Please upload an image to get a response.";

/// How a failure is presented to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Everything that can end an analysis without a response.
///
/// All variants are terminal for the current submission and are rendered to the
/// user; none of them stop the server.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    /// Submit was triggered without an image. No model call is made.
    #[error("Please upload an image to get a response.")]
    MissingInput,

    /// The uploaded bytes are not a usable JPEG or PNG.
    #[error("Error: {0}")]
    DecodeFailure(#[from] DecodeError),

    /// The external model call failed. Holds the underlying cause text.
    #[error("Error: {0}")]
    InferenceFailure(String),

    /// The multipart body itself could not be read.
    #[error("Error: invalid form submission: {0}")]
    InvalidForm(String),
}

impl AnalyzeError {
    /// Wraps a model error, keeping its message.
    pub fn inference(err: impl std::error::Error) -> Self {
        AnalyzeError::InferenceFailure(err.to_string())
    }

    pub fn severity(&self) -> Severity {
        match self {
            AnalyzeError::MissingInput => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AnalyzeError::MissingInput | AnalyzeError::InvalidForm(_) => StatusCode::BAD_REQUEST,
            AnalyzeError::DecodeFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AnalyzeError::InferenceFailure(_) => StatusCode::BAD_GATEWAY,
        }
    }
}
