#[derive(thiserror::Error, Debug)]
pub enum ReplayError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed recording")]
    Json(#[from] serde_json::Error),

    #[error("recording has no steps")]
    EmptyRecording,

    #[error("unsupported architecture `{0}`")]
    UnsupportedArchitecture(String),
}
