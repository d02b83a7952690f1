use tracing::{debug, warn};

const NUM_MSEC_BINS: usize = 100;
const WARN_THRESH_MSEC: usize = 10;

/// Per-cycle processing-duration histogram, logged periodically so an
/// operator can see whether the hot loop (spec.md §1 "tight latency
/// requirements") is keeping up without instrumenting every cycle.
/// Adapted from `flydra-feature-detector`'s `AcquisitionHistogram`.
pub struct CycleDurationHistogram {
    wfsnumber: u32,
    start: std::time::Instant,
    msec_bins: Vec<u32>,
    longest_cycle: u64,
    longest_secs: f64,
}

impl CycleDurationHistogram {
    pub fn new(wfsnumber: u32) -> Self {
        Self {
            wfsnumber,
            start: std::time::Instant::now(),
            msec_bins: vec![0; NUM_MSEC_BINS],
            longest_cycle: 0,
            longest_secs: 0.0,
        }
    }

    pub fn push_sample(&mut self, duration_secs: f64, cycle: u64) {
        if duration_secs.is_nan() || duration_secs < 0.0 {
            return;
        }
        let msecs = duration_secs * 1000.0;
        let bin = if msecs > NUM_MSEC_BINS as f64 {
            NUM_MSEC_BINS - 1
        } else {
            msecs as usize
        };
        self.msec_bins[bin] += 1;
        if duration_secs > self.longest_secs {
            self.longest_secs = duration_secs;
            self.longest_cycle = cycle;
        }
    }

    fn num_valid_samples(&self) -> u32 {
        self.msec_bins.iter().sum()
    }

    pub fn is_old(&self) -> bool {
        self.start.elapsed() > std::time::Duration::from_secs(10)
    }

    /// Logs mode/max of the accumulated samples, then resets the window.
    pub fn show_stats_and_reset(&mut self) {
        if self.num_valid_samples() >= 1 {
            let (mode, _count) = self
                .msec_bins
                .iter()
                .enumerate()
                .fold((0usize, 0u32), |acc, (idx, &count)| {
                    if count > acc.1 {
                        (idx, count)
                    } else {
                        acc
                    }
                });
            let max = self
                .msec_bins
                .iter()
                .enumerate()
                .filter(|&(_, &count)| count > 0)
                .map(|(msec, _)| msec)
                .max()
                .unwrap_or(0);

            let msg = format!(
                "wfs{} cycle duration statistics: mode {} msec, max {} msec (longest cycle: {})",
                self.wfsnumber, mode, max, self.longest_cycle
            );
            if max > WARN_THRESH_MSEC {
                warn!("{msg}");
            } else {
                debug!("{msg}");
            }
        }
        *self = Self::new(self.wfsnumber);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_and_nan_samples_are_ignored() {
        let mut h = CycleDurationHistogram::new(1);
        h.push_sample(-1.0, 0);
        h.push_sample(f64::NAN, 1);
        assert_eq!(h.num_valid_samples(), 0);
    }

    #[test]
    fn tracks_the_longest_cycle() {
        let mut h = CycleDurationHistogram::new(1);
        h.push_sample(0.001, 0);
        h.push_sample(0.050, 7);
        h.push_sample(0.002, 8);
        assert_eq!(h.longest_cycle, 7);
        assert_eq!(h.num_valid_samples(), 3);
    }
}
