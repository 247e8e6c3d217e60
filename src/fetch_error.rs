#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unexpected HTTP status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Failed to decode JSON response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Response is missing field '{0}'")]
    MissingField(&'static str),
}
