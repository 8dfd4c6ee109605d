use thiserror::Error;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum EngineError {
    #[error("malformed version {input:?}: {reason}")]
    MalformedVersion { input: String, reason: String },
    #[error("unsupported version operator {0:?}")]
    UnsupportedOperator(String),
    #[error("malformed version range {0:?}")]
    MalformedRange(String),
}

impl EngineError {
    pub(crate) fn malformed_version(input: &str, reason: impl Into<String>) -> Self {
        EngineError::MalformedVersion {
            input: input.to_owned(),
            reason: reason.into(),
        }
    }
}
