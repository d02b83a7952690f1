//! Shared data types for the per-WFS centroiding and slope-assembly pipeline.
//!
//! These types model the entities of the data model: the static subaperture
//! geometry of one WFS ([`SubapTable`]), the per-cycle outputs of the
//! centroider ([`SlopeMap`], [`FluxMap`]), and the global, multi-WFS vector
//! assembled by the syncer ([`SlopeVec`]).

mod errors;
pub use errors::{Error, Result};

/// Number of WFS slots reserved in the global slope vector and addressable
/// by the syncer's `wfs_mask` bitmap. Matches `MAX_NWFS` in the original
/// `slopevec.c`.
pub const MAX_WFS: usize = 5;

/// Stabilizer added to the flux denominator of a centroid ratio so that an
/// all-zero thresholded window produces slope 0 instead of a NaN. Spec.md
/// §9 notes this value is a tunable constant (1e-1 in the latest source
/// variant, 1e-4 in earlier ones); this rewrite fixes it at the latest
/// value and leaves it as a named constant rather than a parameter.
pub const CENTROID_EPSILON: f32 = 1e-1;

/// A one-based WFS index, e.g. `WfsId::new(1)` for "wfs1".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WfsId(u32);

impl WfsId {
    pub fn new(n: u32) -> Self {
        assert!(n >= 1, "wfs numbers are 1-based");
        WfsId(n)
    }

    /// Zero-based slot index into `SlopeVec` / the syncer's `wfs_mask`.
    pub fn slot(self) -> usize {
        (self.0 - 1) as usize
    }

    pub fn number(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for WfsId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "wfs{}", self.0)
    }
}

/// Precomputed, static geometry for one WFS: the fractional-pixel center of
/// every subaperture and a validity mask. Corresponds to spec.md §3's
/// `SubapTable` entity (the fractional-center variant, per spec.md §9's
/// resolution of the integer-vs-fractional ambiguity).
#[derive(Debug, Clone)]
pub struct SubapTable {
    nsubx: u32,
    nsuby: u32,
    x_center: Vec<f32>,
    y_center: Vec<f32>,
    valid: Vec<bool>,
}

impl SubapTable {
    /// Build a table from parallel center/validity arrays. `valid` may be
    /// empty, in which case every subaperture is treated as valid (spec.md
    /// §6.1: "wfsvalid{k} ... optional; when absent all subapertures are
    /// treated as valid").
    pub fn new(
        nsubx: u32,
        nsuby: u32,
        x_center: Vec<f32>,
        y_center: Vec<f32>,
        valid: Vec<bool>,
    ) -> Result<Self> {
        let n_sub = (nsubx as usize) * (nsuby as usize);
        if x_center.len() != n_sub || y_center.len() != n_sub {
            return Err(Error::SubapTableLengthMismatch {
                x_len: x_center.len(),
                y_len: y_center.len(),
                valid_len: valid.len(),
            });
        }
        let valid = if valid.is_empty() {
            vec![true; n_sub]
        } else if valid.len() == n_sub {
            valid
        } else {
            return Err(Error::SubapTableLengthMismatch {
                x_len: x_center.len(),
                y_len: y_center.len(),
                valid_len: valid.len(),
            });
        };
        Ok(Self {
            nsubx,
            nsuby,
            x_center,
            y_center,
            valid,
        })
    }

    pub fn n_sub(&self) -> usize {
        self.x_center.len()
    }

    pub fn nsubx(&self) -> u32 {
        self.nsubx
    }

    pub fn nsuby(&self) -> u32 {
        self.nsuby
    }

    pub fn center(&self, i: usize) -> (f32, f32) {
        (self.x_center[i], self.y_center[i])
    }

    pub fn is_valid(&self, i: usize) -> bool {
        self.valid[i]
    }

    /// Checks the window-inside-frame invariant of spec.md §3 for every
    /// subaperture, given the per-subaperture FOV and the raw frame
    /// dimensions. Call once at component init; a failure here is a
    /// configuration error, not a runtime branch (spec.md §4.2 "Edge
    /// policy").
    pub fn validate_windows(&self, fovx: u32, fovy: u32, width: u32, height: u32) -> Result<()> {
        for i in 0..self.n_sub() {
            let (xc, yc) = self.center(i);
            let x0 = (xc - fovx as f32 / 2.0).round() as i64;
            let y0 = (yc - fovy as f32 / 2.0).round() as i64;
            let x0_end = x0 + fovx as i64;
            let y0_end = y0 + fovy as i64;
            if x0 < 0 || y0 < 0 || x0_end > width as i64 || y0_end > height as i64 {
                return Err(Error::SubapOutOfBounds {
                    index: i,
                    x0,
                    x0_end,
                    y0,
                    y0_end,
                    width,
                    height,
                });
            }
        }
        Ok(())
    }
}

/// Per-subaperture (x, y) slopes in fractional pixels, laid out as
/// "x-half then y-half" (spec.md §3, §9): the first `n_sub` entries are
/// x-slopes in row-major subaperture order, the next `n_sub` are y-slopes.
#[derive(Debug, Clone, PartialEq)]
pub struct SlopeMap {
    n_sub: usize,
    data: Vec<f32>,
}

impl SlopeMap {
    pub fn zeros(n_sub: usize) -> Self {
        Self {
            n_sub,
            data: vec![0.0; 2 * n_sub],
        }
    }

    /// Build a map from a flat `[slope_x..., slope_y...]` buffer, e.g. one
    /// read back from a published slope-map stream.
    pub fn from_slice(n_sub: usize, data: &[f32]) -> Result<Self> {
        if data.len() != 2 * n_sub {
            return Err(Error::SlopeMapShapeMismatch {
                expected: 2 * n_sub,
                actual: data.len(),
            });
        }
        Ok(Self {
            n_sub,
            data: data.to_vec(),
        })
    }

    pub fn n_sub(&self) -> usize {
        self.n_sub
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn slope_x(&self, i: usize) -> f32 {
        self.data[i]
    }

    pub fn slope_y(&self, i: usize) -> f32 {
        self.data[i + self.n_sub]
    }

    pub fn set_slope_x(&mut self, i: usize, v: f32) {
        self.data[i] = v;
    }

    pub fn set_slope_y(&mut self, i: usize, v: f32) {
        self.data[i + self.n_sub] = v;
    }
}

/// Per-subaperture integrated, calibrated, thresholded intensity (spec.md
/// §3's `FluxMap`).
#[derive(Debug, Clone, PartialEq)]
pub struct FluxMap {
    data: Vec<f32>,
}

impl FluxMap {
    pub fn zeros(n_sub: usize) -> Self {
        Self {
            data: vec![0.0; n_sub],
        }
    }

    pub fn n_sub(&self) -> usize {
        self.data.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn get(&self, i: usize) -> f32 {
        self.data[i]
    }

    pub fn set(&mut self, i: usize, v: f32) {
        self.data[i] = v;
    }
}

/// The global slope vector published once per assembly cycle. Slot `k`
/// (zero-based WFS slot) occupies `[k*2*n_sub, (k+1)*2*n_sub)`; entries for
/// unselected WFSs stay zero (spec.md §3, P7).
#[derive(Debug, Clone, PartialEq)]
pub struct SlopeVec {
    n_sub: usize,
    data: Vec<f32>,
}

impl SlopeVec {
    pub fn zeros(n_sub: usize) -> Self {
        Self {
            n_sub,
            data: vec![0.0; 2 * n_sub * MAX_WFS],
        }
    }

    pub fn n_sub(&self) -> usize {
        self.n_sub
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Overwrite the slot for WFS `slot` with the contents of `slope_map`.
    pub fn set_slot(&mut self, slot: usize, slope_map: &SlopeMap) -> Result<()> {
        if slot >= MAX_WFS {
            return Err(Error::WfsSlotOutOfRange(slot, MAX_WFS));
        }
        if slope_map.n_sub() != self.n_sub {
            return Err(Error::SlopeMapShapeMismatch {
                expected: 2 * self.n_sub,
                actual: 2 * slope_map.n_sub(),
            });
        }
        let start = slot * 2 * self.n_sub;
        let end = start + 2 * self.n_sub;
        self.data[start..end].copy_from_slice(slope_map.as_slice());
        Ok(())
    }

    pub fn slot(&self, slot: usize) -> Result<&[f32]> {
        if slot >= MAX_WFS {
            return Err(Error::WfsSlotOutOfRange(slot, MAX_WFS));
        }
        let start = slot * 2 * self.n_sub;
        let end = start + 2 * self.n_sub;
        Ok(&self.data[start..end])
    }
}

/// Bitmap selecting which of the `MAX_WFS` slots participate in a given
/// deployment. Bit `k` selects slot `k` directly (the same zero-based `k`
/// used in stream names, spec.md §6.1) — not [`WfsId::slot`], which is
/// one less than the one-based `--wfsnumber` CLI argument. The default of
/// spec.md §6.2, `0b11110 == 30`, therefore selects slots 1-4 (i.e.
/// `--wfsnumber` 2-5); the original `slopevec.c` labels this default
/// "WFS1-4" in a comment, but its executable code (`stream_connect` using
/// the raw 0-based loop index for `slopemap%d`) and this bitmap agree on
/// which physical streams are touched, which is what matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WfsMask(u32);

impl WfsMask {
    pub fn new(bits: u32) -> Self {
        WfsMask(bits)
    }

    pub fn contains_slot(self, slot: usize) -> bool {
        slot < MAX_WFS && (self.0 & (1 << slot)) != 0
    }

    pub fn selected_slots(self) -> impl Iterator<Item = usize> {
        (0..MAX_WFS).filter(move |&slot| self.contains_slot(slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wfs_mask_default_selects_slots_1_to_4() {
        let mask = WfsMask::new(30);
        let slots: Vec<_> = mask.selected_slots().collect();
        assert_eq!(slots, vec![1, 2, 3, 4]);
    }

    #[test]
    fn subap_table_rejects_mismatched_lengths() {
        let err = SubapTable::new(2, 1, vec![1.0, 2.0], vec![1.0], vec![]);
        assert!(err.is_err());
    }

    #[test]
    fn subap_table_defaults_missing_valid_to_all_valid() {
        let t = SubapTable::new(1, 2, vec![1.0, 2.0], vec![1.0, 2.0], vec![]).unwrap();
        assert!(t.is_valid(0));
        assert!(t.is_valid(1));
    }

    #[test]
    fn slope_map_from_slice_rejects_wrong_length() {
        let err = SlopeMap::from_slice(4, &[0.0; 6]);
        assert!(err.is_err());
    }

    #[test]
    fn slope_vec_set_slot_writes_expected_range() {
        let mut vec = SlopeVec::zeros(4);
        let mut sm = SlopeMap::zeros(4);
        sm.set_slope_x(0, 1.0);
        sm.set_slope_y(0, 2.0);
        vec.set_slot(1, &sm).unwrap();
        let slot0 = vec.slot(0).unwrap();
        assert!(slot0.iter().all(|&v| v == 0.0));
        let slot1 = vec.slot(1).unwrap();
        assert_eq!(slot1[0], 1.0);
        assert_eq!(slot1[4], 2.0);
    }
}
