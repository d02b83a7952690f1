use std::sync::Arc;
use std::time::{Duration, Instant};

use ao_types::{SlopeMap, SlopeVec, WfsMask, MAX_WFS};
use stream_port::SharedImage;

use crate::errors::{Error, Result};
use crate::params::SyncerParams;

/// Poll interval used while waiting for late WFSs. Keeps the loop from
/// busy-spinning at 100% CPU while still reacting promptly (spec.md §5,
/// "must not busy-spin at 100% CPU when no WFS is producing").
const POLL_INTERVAL: Duration = Duration::from_micros(10);

/// Per-selected-slot input: the WFS's published slope-map stream and the
/// wait index the syncer registered on it.
#[derive(Clone)]
pub struct SlopeMapSource {
    pub stream: Arc<SharedImage<f32>>,
    pub wait_index: usize,
}

/// Outcome of one [`Syncer::assemble_once`] cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// True if the deadline fired before every selected WFS posted.
    pub deadline_missed: bool,
    /// Bitmap (by slot) of WFSs whose slot was refreshed this cycle; a
    /// selected slot absent from this mask kept its prior value.
    pub slots_updated: u32,
}

impl CycleReport {
    pub fn slot_updated(&self, slot: usize) -> bool {
        slot < MAX_WFS && (self.slots_updated & (1 << slot)) != 0
    }
}

/// Assembles per-WFS [`SlopeMap`]s into a single [`SlopeVec`] under a soft
/// deadline (spec.md §4.3), grounded on `syncslopevec()` of the original
/// `slopevec.c`. Stateful across cycles: a slot that misses its deadline
/// keeps its previous contents (spec.md §7 "DeadlineExpired ... not
/// fatal", P7).
pub struct Syncer {
    mask: WfsMask,
    n_sub: usize,
    deadline: Duration,
    vec: SlopeVec,
}

impl Syncer {
    pub fn new(mask: WfsMask, params: &SyncerParams) -> Self {
        Self {
            mask,
            n_sub: params.n_sub(),
            deadline: Duration::from_secs_f64(params.deadline_us as f64 / 1_000_000.0),
            vec: SlopeVec::zeros(params.n_sub()),
        }
    }

    pub fn current(&self) -> &SlopeVec {
        &self.vec
    }

    /// Runs one collation cycle to completion: polls every selected slot's
    /// stream until all have posted since the cycle began, or until
    /// `deadline` has elapsed since the first arrival, whichever comes
    /// first (spec.md P6, P7).
    pub fn assemble_once(&mut self, sources: &[Option<SlopeMapSource>; MAX_WFS]) -> Result<CycleReport> {
        for slot in self.mask.selected_slots() {
            if sources[slot].is_none() {
                return Err(Error::MissingSlopeMapStream { slot });
            }
        }

        let mut ready = [false; MAX_WFS];
        let mut started: Option<Instant> = None;
        let mut slots_updated = 0u32;

        loop {
            if let Some(start) = started {
                if self.mask.selected_slots().all(|slot| ready[slot]) {
                    return Ok(CycleReport {
                        deadline_missed: false,
                        slots_updated,
                    });
                }
                if start.elapsed() > self.deadline {
                    return Ok(CycleReport {
                        deadline_missed: true,
                        slots_updated,
                    });
                }
            }

            let mut polled_any = false;
            for slot in self.mask.selected_slots() {
                if ready[slot] {
                    continue;
                }
                let source = sources[slot].as_ref().expect("checked above");
                if source.stream.sem_trywait(source.wait_index)? {
                    source.stream.sem_drain(source.wait_index)?;
                    let payload = source.stream.read();
                    let slope_map = SlopeMap::from_slice(self.n_sub, &payload)?;
                    self.vec.set_slot(slot, &slope_map)?;
                    ready[slot] = true;
                    slots_updated |= 1 << slot;
                    if started.is_none() {
                        started = Some(Instant::now());
                    }
                }
                polled_any = true;
            }

            if started.is_none() && !polled_any {
                // No WFS selected at all; nothing to wait for.
                return Ok(CycleReport::default());
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}
