/// Parameters for the slope-vector syncer (spec.md §4.3, §6.2).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncerParams {
    pub wfsflags: u32,
    pub nsubx: u32,
    pub nsuby: u32,
    pub deadline_us: f32,
}

impl SyncerParams {
    pub fn n_sub(&self) -> usize {
        (self.nsubx as usize) * (self.nsuby as usize)
    }
}

impl Default for SyncerParams {
    /// Matches the `CLICMDARGDEF` defaults of the original
    /// `ltaomod_centroider/slopevec.c`: WFS1..4 selected, a 32x32 grid, a
    /// 200 microsecond soft deadline.
    fn default() -> Self {
        Self {
            wfsflags: 30,
            nsubx: 32,
            nsuby: 32,
            deadline_us: 200.0,
        }
    }
}
