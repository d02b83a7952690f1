pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Types(#[from] ao_types::Error),
    #[error(transparent)]
    Stream(#[from] stream_port::Error),
    #[error("wfs slot {slot} is selected by wfsflags but has no input stream configured")]
    MissingSlopeMapStream { slot: usize },
}
