use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("study not found: {0}")]
    StudyNotFound(String),

    #[error("patient not found: {0}")]
    PatientNotFound(String),

    #[error("study already exists: {0}")]
    DuplicateStudy(String),

    #[error("patient already exists: {0}")]
    DuplicatePatient(String),

    #[error("invalid record: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not valid: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error(transparent)]
    Generation(#[from] protocol_extract::ExtractError),
}
