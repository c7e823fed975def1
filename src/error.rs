use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the threaded timer service. The timer itself never fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("timer service has shut down")]
    Stopped,

    #[error("timer worker panicked")]
    WorkerPanicked,
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file error: {0}")]
    File(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,

    #[error("'{0}' needs a subject id")]
    MissingSubject(String),

    #[error("'{command}' takes no argument, got '{argument}'")]
    UnexpectedArgument { command: String, argument: String },

    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
