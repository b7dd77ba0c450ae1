use thiserror::Error;

/// Failures that can abort an orchestration run or a packaging call.
#[derive(Error, Debug)]
pub enum GenesisError {
    #[error("{stage} stage returned unusable structured output: {reason}")]
    StructuredOutput { stage: &'static str, reason: String },
    #[error("provider error: {0}")]
    Provider(String),
    #[error("packaging failed: {0}")]
    Packaging(String),
}

impl GenesisError {
    pub fn structured(stage: &'static str, reason: impl Into<String>) -> Self {
        Self::StructuredOutput { stage, reason: reason.into() }
    }

    pub fn provider(msg: impl std::fmt::Display) -> Self {
        Self::Provider(msg.to_string())
    }
}

impl From<reqwest::Error> for GenesisError {
    fn from(e: reqwest::Error) -> Self {
        Self::Provider(e.to_string())
    }
}

impl From<zip::result::ZipError> for GenesisError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Packaging(e.to_string())
    }
}

impl From<std::io::Error> for GenesisError {
    fn from(e: std::io::Error) -> Self {
        Self::Packaging(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GenesisError>;
