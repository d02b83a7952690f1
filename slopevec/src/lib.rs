//! Multi-WFS slope-vector synchronizer.
//!
//! [`Syncer::assemble_once`] collates each selected WFS's published
//! [`ao_types::SlopeMap`] into one global [`ao_types::SlopeVec`] under a
//! soft per-cycle deadline, tolerating WFSs that post late or not at all.

pub mod errors;
pub mod params;
pub mod syncer;

pub use errors::{Error, Result};
pub use params::SyncerParams;
pub use syncer::{CycleReport, SlopeMapSource, Syncer};
