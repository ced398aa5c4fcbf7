use serde::Serialize;

/// Everything that can go wrong between issuing the request and holding a
/// validated [`Forecast`](crate::model::Forecast).
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("provider returned HTTP {code}: {body}")]
    HttpStatus { code: u16, body: String },

    #[error("response body is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("response does not match the expected schema: {0}")]
    Schema(String),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Network(_) => FailureKind::Network,
            FetchError::HttpStatus { code, .. } => FailureKind::HttpStatus(*code),
            FetchError::Parse(_) => FailureKind::Parse,
            FetchError::Schema(_) => FailureKind::Schema,
        }
    }

    /// Whether trying again later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::HttpStatus { code, .. } => *code >= 500,
            FetchError::Parse(_) | FetchError::Schema(_) => false,
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        use serde_json::error::Category;

        match err.classify() {
            // Well-formed JSON that doesn't fit the expected shape.
            Category::Data => FetchError::Schema(err.to_string()),
            Category::Syntax | Category::Eof | Category::Io => FetchError::Parse(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    Network,
    HttpStatus(u16),
    Parse,
    Schema,
    /// The controller shut down before the fetch settled.
    Cancelled,
}

/// Cloneable record of a failed fetch, kept in [`FetchState::Error`](crate::controller::FetchState).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl FetchFailure {
    pub const USER_MESSAGE: &'static str = "Failed to fetch weather data. Please try again.";

    pub fn user_message(&self) -> &'static str {
        Self::USER_MESSAGE
    }

    pub fn cancelled() -> Self {
        Self { kind: FailureKind::Cancelled, detail: "fetch cancelled by shutdown".to_string() }
    }
}

impl From<&FetchError> for FetchFailure {
    fn from(err: &FetchError) -> Self {
        Self { kind: err.kind(), detail: err.to_string() }
    }
}
