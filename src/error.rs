use thiserror::Error;

/// One or more required columns are absent from the uploaded file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("missing required columns: {}", .missing.join(", "))]
pub struct SchemaError {
    pub missing: Vec<String>,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unknown field in config: {0}")]
    UnknownField(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
