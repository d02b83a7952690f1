use ao_types::{FluxMap, SlopeMap};

/// Whole-frame summary statistics published alongside the slope and flux
/// maps each cycle (spec.md §4.5), grounded on `reducemeasurements()` of
/// the original `centroider.c`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diagnostics {
    pub max_flux: f32,
    pub num_valid: u32,
    pub tip: f32,
    pub tilt: f32,
}

/// Reduces one cycle's flux and slope maps to [`Diagnostics`].
///
/// A subaperture counts as valid when its flux is at or above
/// `fluxthresh * max_flux`; tip/tilt are the plain mean slope over the
/// valid subapertures, zero when none are valid.
pub fn reduce(flux_map: &FluxMap, slope_map: &SlopeMap, fluxthresh: f32) -> Diagnostics {
    let n_sub = flux_map.n_sub();
    let max_flux = (0..n_sub).map(|i| flux_map.get(i)).fold(0.0f32, f32::max);
    let threshold = fluxthresh * max_flux;

    let mut num_valid = 0u32;
    let mut tip = 0.0f32;
    let mut tilt = 0.0f32;

    for i in 0..n_sub {
        if flux_map.get(i) >= threshold {
            num_valid += 1;
            tip += slope_map.slope_x(i);
            tilt += slope_map.slope_y(i);
        }
    }

    if num_valid > 0 {
        tip /= num_valid as f32;
        tilt /= num_valid as f32;
    }

    Diagnostics {
        max_flux,
        num_valid,
        tip,
        tilt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_zero_flux_yields_zero_diagnostics() {
        let flux = FluxMap::zeros(4);
        let slope = SlopeMap::zeros(4);
        let d = reduce(&flux, &slope, 0.3);
        assert_eq!(d.max_flux, 0.0);
        assert_eq!(d.num_valid, 0);
        assert_eq!(d.tip, 0.0);
        assert_eq!(d.tilt, 0.0);
    }

    #[test]
    fn single_bright_subaperture_is_the_only_valid_one() {
        let mut flux = FluxMap::zeros(4);
        flux.set(0, 100.0);
        flux.set(1, 10.0);
        flux.set(2, 5.0);
        flux.set(3, 1.0);
        let mut slope = SlopeMap::zeros(4);
        slope.set_slope_x(0, 0.5);
        slope.set_slope_y(0, -0.25);

        let d = reduce(&flux, &slope, 0.3);
        assert_eq!(d.max_flux, 100.0);
        assert_eq!(d.num_valid, 1);
        assert!((d.tip - 0.5).abs() < 1e-6);
        assert!((d.tilt - (-0.25)).abs() < 1e-6);
    }

    #[test]
    fn plain_average_over_valid_subapertures() {
        let mut flux = FluxMap::zeros(2);
        flux.set(0, 90.0);
        flux.set(1, 10.0);
        let mut slope = SlopeMap::zeros(2);
        slope.set_slope_x(0, 1.0);
        slope.set_slope_x(1, -1.0);

        let d = reduce(&flux, &slope, 0.0);
        assert_eq!(d.num_valid, 2);
        assert!((d.tip - 0.0).abs() < 1e-6);
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let mut flux = FluxMap::zeros(2);
        flux.set(0, 100.0);
        flux.set(1, 30.0);
        let slope = SlopeMap::zeros(2);
        let d = reduce(&flux, &slope, 0.3);
        assert_eq!(d.num_valid, 2);
    }
}
