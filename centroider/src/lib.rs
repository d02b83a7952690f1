//! Per-WFS thresholded center-of-gravity centroider.
//!
//! [`centroid::run_once`] is the hot path: it consumes one raw frame and a
//! background frame and produces a [`ao_types::SlopeMap`] and
//! [`ao_types::FluxMap`] for a single WFS. [`diagnostics::reduce`] folds
//! those two maps into a side-channel tip/tilt summary.

pub mod calibrator;
pub mod centroid;
pub mod diagnostics;
pub mod errors;
pub mod frame;
pub mod histogram;
pub mod params;
pub mod subap_source;

pub use centroid::run_once;
pub use diagnostics::{reduce, Diagnostics};
pub use errors::{Error, Result};
pub use frame::{BackgroundView, FrameView};
pub use histogram::CycleDurationHistogram;
pub use params::CentroiderParams;
pub use subap_source::load_subap_table;
