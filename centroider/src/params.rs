/// Parameters for one run of the centroider (spec.md §4.2, §6.2).
///
/// `cogthresh <= -1.0` disables thresholding (the original "unsafe" mode);
/// the `ε` stabilizer of [`ao_types::CENTROID_EPSILON`] still applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CentroiderParams {
    pub wfsnumber: u32,
    pub nsubx: u32,
    pub nsuby: u32,
    pub fovx: u32,
    pub fovy: u32,
    pub cogthresh: f32,
    pub bgnpix: u32,
    pub fluxthresh: f32,
}

impl CentroiderParams {
    pub fn n_sub(&self) -> usize {
        (self.nsubx as usize) * (self.nsuby as usize)
    }
}

impl Default for CentroiderParams {
    /// Matches the `CLICMDARGDEF` defaults of the original
    /// `ltaomod_centroider/centroider.c`.
    fn default() -> Self {
        Self {
            wfsnumber: 1,
            nsubx: 32,
            nsuby: 32,
            fovx: 6,
            fovy: 6,
            cogthresh: 0.0,
            bgnpix: 0,
            fluxthresh: 0.3,
        }
    }
}
