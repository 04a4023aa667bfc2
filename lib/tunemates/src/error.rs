use thiserror::Error;

#[derive(Error, Debug)]
pub enum TunematesError {
    #[error("Rooms API base URL is not configured")]
    NotConfigured,

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Not authenticated, log in again")]
    Unauthenticated,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Finding common music failed, start it again")]
    JobFailed,

    #[error("No room is being synchronized")]
    NotStarted,

    #[error("Room synchronization was stopped")]
    Destroyed,
}

pub type Result<T> = std::result::Result<T, TunematesError>;
