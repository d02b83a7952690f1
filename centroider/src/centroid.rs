use ao_types::{FluxMap, SlopeMap, SubapTable, CENTROID_EPSILON};

use crate::calibrator::compute_bg_row;
use crate::errors::Result;
use crate::frame::{BackgroundView, FrameView};
use crate::params::CentroiderParams;

/// Thresholded center-of-gravity centroider (spec.md §4.2, the hot inner
/// loop). Pure function of its inputs: no state survives between calls.
///
/// For each subaperture `i`, the window is anchored at
/// `x0 = round(xc - fovx/2)`, `y0 = round(yc - fovy/2)` and the centroid is
/// referenced to the subaperture center via the sub-pixel offsets
/// `(ox, oy)`, so a perfectly centered spot produces slope `(0, 0)`.
///
/// # Panics
/// Indexing a subaperture window outside the frame is a configuration
/// error the caller must rule out via [`SubapTable::validate_windows`]
/// before the first call (spec.md §4.2 "Edge policy"); this function does
/// not re-check bounds on every cycle.
#[tracing::instrument(level = "trace", skip_all)]
pub fn run_once(
    frame: &FrameView<'_>,
    bg: &BackgroundView<'_>,
    subap: &SubapTable,
    out_slope_map: &mut SlopeMap,
    out_flux_map: &mut FluxMap,
    params: &CentroiderParams,
) -> Result<()> {
    let bg_row = compute_bg_row(frame, bg, params.bgnpix);

    for i in 0..subap.n_sub() {
        let (xc, yc) = subap.center(i);
        let x0 = (xc - params.fovx as f32 / 2.0).round() as i64;
        let y0 = (yc - params.fovy as f32 / 2.0).round() as i64;
        let ox = xc - x0 as f32 - 0.5;
        let oy = yc - y0 as f32 - 0.5;

        let mut sx = 0.0f32;
        let mut sy = 0.0f32;
        let mut s = 0.0f32;

        for v in 0..params.fovy as i64 {
            let row = (y0 + v) as u32;
            let row_bg = bg_row[row as usize];
            for u in 0..params.fovx as i64 {
                let col = (x0 + u) as u32;
                let mut p = frame.pixel(row, col) - bg.pixel(row, col) - row_bg;
                if params.cogthresh > -1.0 {
                    p = (p - params.cogthresh).max(0.0);
                }
                sx += p * (u as f32 - ox);
                sy += p * (v as f32 - oy);
                s += p;
            }
        }

        out_flux_map.set(i, s);
        out_slope_map.set_slope_x(i, sx / (s + CENTROID_EPSILON));
        out_slope_map.set_slope_y(i, sy / (s + CENTROID_EPSILON));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_params(nsubx: u32, nsuby: u32, fov: u32, cogthresh: f32, bgnpix: u32) -> CentroiderParams {
        CentroiderParams {
            wfsnumber: 1,
            nsubx,
            nsuby,
            fovx: fov,
            fovy: fov,
            cogthresh,
            bgnpix,
            fluxthresh: 0.3,
        }
    }

    /// Scenario A — single bright pixel.
    #[test]
    fn scenario_a_single_bright_pixel() {
        let width = 6u32;
        let height = 6u32;
        let mut pixels = vec![0u16; (width * height) as usize];
        // frame[3, 2] = 100 (row 3, col 2).
        pixels[(3 * width + 2) as usize] = 100;
        let bg = vec![0.0f32; (width * height) as usize];
        let frame = FrameView {
            width,
            height,
            pixels: &pixels,
        };
        let bgv = BackgroundView {
            width,
            height,
            pixels: &bg,
        };
        let subap = SubapTable::new(1, 1, vec![2.0], vec![2.0], vec![]).unwrap();
        let params = make_params(1, 1, 4, 0.0, 0);

        let mut slope_map = SlopeMap::zeros(1);
        let mut flux_map = FluxMap::zeros(1);
        run_once(&frame, &bgv, &subap, &mut slope_map, &mut flux_map, &params).unwrap();

        assert_eq!(flux_map.get(0), 100.0);
        assert!((slope_map.slope_x(0) - 0.5).abs() < 1e-3);
        assert!((slope_map.slope_y(0) - 1.5).abs() < 1e-3);
    }

    /// Scenario B — thresholded noise floor.
    #[test]
    fn scenario_b_thresholded_noise_floor() {
        let width = 4u32;
        let height = 4u32;
        let mut pixels = vec![3u16; (width * height) as usize];
        for row in 1..3 {
            for col in 1..3 {
                pixels[(row * width + col) as usize] = 50;
            }
        }
        let bg = vec![0.0f32; (width * height) as usize];
        let frame = FrameView {
            width,
            height,
            pixels: &pixels,
        };
        let bgv = BackgroundView {
            width,
            height,
            pixels: &bg,
        };
        let subap = SubapTable::new(1, 1, vec![2.0], vec![2.0], vec![]).unwrap();
        let params = make_params(1, 1, 4, 5.0, 0);

        let mut slope_map = SlopeMap::zeros(1);
        let mut flux_map = FluxMap::zeros(1);
        run_once(&frame, &bgv, &subap, &mut slope_map, &mut flux_map, &params).unwrap();

        assert!((flux_map.get(0) - 180.0).abs() < 1e-3);
        assert!(slope_map.slope_x(0).abs() < 1e-6);
        assert!(slope_map.slope_y(0).abs() < 1e-6);
    }

    /// Scenario C — margin background.
    #[test]
    fn scenario_c_margin_background_matches_scenario_a() {
        let width = 6u32;
        let height = 6u32;
        let mut pixels = vec![0u16; (width * height) as usize];
        for row in 0..height {
            for col in 0..width {
                pixels[(row * width + col) as usize] = row as u16;
            }
        }
        pixels[(3 * width + 2) as usize] += 100;
        let bg = vec![0.0f32; (width * height) as usize];
        let frame = FrameView {
            width,
            height,
            pixels: &pixels,
        };
        let bgv = BackgroundView {
            width,
            height,
            pixels: &bg,
        };
        let subap = SubapTable::new(1, 1, vec![2.0], vec![2.0], vec![]).unwrap();
        let params = make_params(1, 1, 4, 0.0, 2);

        let mut slope_map = SlopeMap::zeros(1);
        let mut flux_map = FluxMap::zeros(1);
        run_once(&frame, &bgv, &subap, &mut slope_map, &mut flux_map, &params).unwrap();

        assert!((flux_map.get(0) - 100.0).abs() < 1e-3);
        assert!((slope_map.slope_x(0) - 0.5).abs() < 1e-3);
        assert!((slope_map.slope_y(0) - 1.5).abs() < 1e-3);
    }

    /// P2: flux non-negativity when thresh >= 0.
    #[test]
    fn flux_is_non_negative_with_threshold() {
        let width = 4u32;
        let height = 4u32;
        let pixels = vec![1u16; (width * height) as usize];
        let bg = vec![0.0f32; (width * height) as usize];
        let frame = FrameView {
            width,
            height,
            pixels: &pixels,
        };
        let bgv = BackgroundView {
            width,
            height,
            pixels: &bg,
        };
        let subap = SubapTable::new(1, 1, vec![2.0], vec![2.0], vec![]).unwrap();
        let params = make_params(1, 1, 4, 5.0, 0);

        let mut slope_map = SlopeMap::zeros(1);
        let mut flux_map = FluxMap::zeros(1);
        run_once(&frame, &bgv, &subap, &mut slope_map, &mut flux_map, &params).unwrap();
        assert!(flux_map.get(0) >= 0.0);
    }

    /// P1: determinism across repeated runs with identical inputs.
    #[test]
    fn deterministic_across_runs() {
        let width = 8u32;
        let height = 8u32;
        let pixels: Vec<u16> = (0..(width * height)).map(|i| (i % 17) as u16).collect();
        let bg = vec![0.5f32; (width * height) as usize];
        let frame = FrameView {
            width,
            height,
            pixels: &pixels,
        };
        let bgv = BackgroundView {
            width,
            height,
            pixels: &bg,
        };
        let subap = SubapTable::new(1, 1, vec![4.0], vec![4.0], vec![]).unwrap();
        let params = make_params(1, 1, 4, 1.0, 1);

        let mut slope_a = SlopeMap::zeros(1);
        let mut flux_a = FluxMap::zeros(1);
        run_once(&frame, &bgv, &subap, &mut slope_a, &mut flux_a, &params).unwrap();

        let mut slope_b = SlopeMap::zeros(1);
        let mut flux_b = FluxMap::zeros(1);
        run_once(&frame, &bgv, &subap, &mut slope_b, &mut flux_b, &params).unwrap();

        assert_eq!(slope_a.as_slice(), slope_b.as_slice());
        assert_eq!(flux_a.as_slice(), flux_b.as_slice());
    }

    /// P4: centering identity for a synthetic single-delta frame.
    #[test]
    fn centering_identity_for_synthetic_delta() {
        let width = 10u32;
        let height = 10u32;
        let mut pixels = vec![0u16; (width * height) as usize];
        let a = 1000u16;
        let (u_star, v_star) = (1i64, 2i64);
        let x0_nominal = 3i64;
        let y0_nominal = 3i64;
        pixels[((y0_nominal + v_star) as u32 * width + (x0_nominal + u_star) as u32) as usize] = a;
        let bg = vec![0.0f32; (width * height) as usize];
        let frame = FrameView {
            width,
            height,
            pixels: &pixels,
        };
        let bgv = BackgroundView {
            width,
            height,
            pixels: &bg,
        };
        // Center the subaperture so x0 == x0_nominal, y0 == y0_nominal with
        // zero sub-pixel offset.
        let fov = 6u32;
        let xc = x0_nominal as f32 + fov as f32 / 2.0 + 0.5;
        let yc = y0_nominal as f32 + fov as f32 / 2.0 + 0.5;
        let subap = SubapTable::new(1, 1, vec![xc], vec![yc], vec![]).unwrap();
        let params = make_params(1, 1, fov, 0.0, 0);

        let mut slope_map = SlopeMap::zeros(1);
        let mut flux_map = FluxMap::zeros(1);
        run_once(&frame, &bgv, &subap, &mut slope_map, &mut flux_map, &params).unwrap();

        let eps = ao_types::CENTROID_EPSILON;
        let bias_bound = 2.0 * eps / a as f32;
        assert!((slope_map.slope_x(0) - u_star as f32).abs() <= bias_bound + 1e-6);
        assert!((slope_map.slope_y(0) - v_star as f32).abs() <= bias_bound + 1e-6);
    }
}
