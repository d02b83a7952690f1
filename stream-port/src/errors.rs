pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("stream '{0}' not found")]
    NotFound(String),
    #[error("stream '{name}' exists with shape {existing:?}, requested {requested:?}")]
    ShapeMismatch {
        name: String,
        existing: (usize, usize),
        requested: (usize, usize),
    },
    #[error("wait index {0} is not owned by this stream (max {1})")]
    InvalidWaitIndex(usize, usize),
    #[error("semaphore wait channel disconnected for stream '{0}'")]
    Disconnected(String),
}
