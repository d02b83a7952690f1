use ao_types::{FluxMap, SlopeMap, SubapTable};
use centroider::{diagnostics, run_once, BackgroundView, CentroiderParams, FrameView};

fn params(nsubx: u32, nsuby: u32, fov: u32, cogthresh: f32, bgnpix: u32, fluxthresh: f32) -> CentroiderParams {
    CentroiderParams {
        wfsnumber: 1,
        nsubx,
        nsuby,
        fovx: fov,
        fovy: fov,
        cogthresh,
        bgnpix,
        fluxthresh,
    }
}

/// Scenario F — diagnostics reduction.
#[test]
fn scenario_f_diagnostics_reduction() {
    let mut flux_map = FluxMap::zeros(4);
    for (i, v) in [10.0, 10.0, 1.0, 1.0].into_iter().enumerate() {
        flux_map.set(i, v);
    }
    let mut slope_map = SlopeMap::zeros(4);
    for (i, v) in [0.1, -0.1, 100.0, -100.0].into_iter().enumerate() {
        slope_map.set_slope_x(i, v);
    }

    let diag = diagnostics::reduce(&flux_map, &slope_map, 0.3);
    assert_eq!(diag.max_flux, 10.0);
    assert_eq!(diag.num_valid, 2);
    assert!((diag.tip - 0.0).abs() < 1e-6);
}

/// P3: slope boundedness — |slope| <= fov/2 + 1 for any single subaperture
/// frame, regardless of where within the window the flux lands.
#[test]
fn p3_slope_boundedness() {
    let fov = 8u32;
    let width = 16u32;
    let height = 16u32;
    let bg = vec![0.0f32; (width * height) as usize];
    let subap = SubapTable::new(1, 1, vec![8.0], vec![8.0], vec![]).unwrap();
    let p = params(1, 1, fov, 0.0, 0, 0.3);

    for row in 0..fov {
        for col in 0..fov {
            let mut pixels = vec![0u16; (width * height) as usize];
            let actual_row = 4 + row;
            let actual_col = 4 + col;
            pixels[(actual_row * width + actual_col) as usize] = 200;

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
            let mut slope_map = SlopeMap::zeros(1);
            let mut flux_map = FluxMap::zeros(1);
            run_once(&frame, &bgv, &subap, &mut slope_map, &mut flux_map, &p).unwrap();

            let bound = fov as f32 / 2.0 + 1.0;
            assert!(slope_map.slope_x(0).abs() <= bound);
            assert!(slope_map.slope_y(0).abs() <= bound);
        }
    }
}

/// P5: threshold idempotence — shifting a sub-threshold pixel by a delta
/// that keeps it below threshold leaves outputs invariant.
#[test]
fn p5_threshold_idempotence_below_threshold_shifts() {
    let width = 6u32;
    let height = 6u32;
    let bg = vec![0.0f32; (width * height) as usize];
    let subap = SubapTable::new(1, 1, vec![3.0], vec![3.0], vec![]).unwrap();
    let p = params(1, 1, 4, 10.0, 0, 0.3);

    let mut base = vec![0u16; (width * height) as usize];
    base[(3 * width + 2) as usize] = 100;
    base[(2 * width + 2) as usize] = 3; // below threshold

    let mut shifted = base.clone();
    shifted[(2 * width + 2) as usize] = 7; // still below threshold (< 10)

    let frame_base = FrameView {
        width,
        height,
        pixels: &base,
    };
    let frame_shifted = FrameView {
        width,
        height,
        pixels: &shifted,
    };
    let bgv = BackgroundView {
        width,
        height,
        pixels: &bg,
    };

    let mut slope_a = SlopeMap::zeros(1);
    let mut flux_a = FluxMap::zeros(1);
    run_once(&frame_base, &bgv, &subap, &mut slope_a, &mut flux_a, &p).unwrap();

    let mut slope_b = SlopeMap::zeros(1);
    let mut flux_b = FluxMap::zeros(1);
    run_once(&frame_shifted, &bgv, &subap, &mut slope_b, &mut flux_b, &p).unwrap();

    assert_eq!(flux_a.as_slice(), flux_b.as_slice());
    assert_eq!(slope_a.as_slice(), slope_b.as_slice());
}
