pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Types(#[from] ao_types::Error),
    #[error(transparent)]
    Stream(#[from] stream_port::Error),
    #[error("raw frame has {actual} pixels, expected {expected} for a {width}x{height} frame")]
    FrameShapeMismatch {
        expected: usize,
        actual: usize,
        width: u32,
        height: u32,
    },
    #[error("background frame has {actual} pixels, expected {expected}")]
    BackgroundShapeMismatch { expected: usize, actual: usize },
}
