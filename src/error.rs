use thiserror::Error;

/// Errors that can occur while fetching a health snapshot
///
/// Fetch errors are transient by nature: they are surfaced once per poll
/// cycle and never persisted or deduplicated.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Snapshot request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Snapshot endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed snapshot payload: {0}")]
    InvalidPayload(String),

    #[error("Snapshot source reported an error: {0}")]
    SourceError(String),
}

/// Errors that can occur when relaying an alert to an external channel
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Email relay request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Email relay returned status {status}")]
    Status { status: u16 },
}

/// Errors that can occur when constructing or controlling the poll loop
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Poll interval must be positive, got {0} ms")]
    InvalidInterval(u64),

    #[error("Poll loop is already running")]
    AlreadyRunning,
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}
