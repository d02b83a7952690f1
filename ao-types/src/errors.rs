pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("subaperture window for index {index} ({x0}..{x0_end}, {y0}..{y0_end}) does not lie inside a {width}x{height} frame")]
    SubapOutOfBounds {
        index: usize,
        x0: i64,
        x0_end: i64,
        y0: i64,
        y0_end: i64,
        width: u32,
        height: u32,
    },
    #[error("flux map has length {actual}, expected {expected}")]
    FluxMapShapeMismatch { expected: usize, actual: usize },
    #[error("slope map has length {actual}, expected {expected}")]
    SlopeMapShapeMismatch { expected: usize, actual: usize },
    #[error("subaperture table arrays have mismatched lengths: x_center={x_len}, y_center={y_len}, valid={valid_len}")]
    SubapTableLengthMismatch {
        x_len: usize,
        y_len: usize,
        valid_len: usize,
    },
    #[error("wfs slot {0} is out of range for MAX_WFS={1}")]
    WfsSlotOutOfRange(usize, usize),
}
