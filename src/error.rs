use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeraldError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Delivery failed with status {status}: {message}")]
    Delivery { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid scenario: {0}")]
    Scenario(String),

    #[error("Build {0} has already completed")]
    AlreadyCompleted(String),
}

pub type Result<T> = std::result::Result<T, HeraldError>;
