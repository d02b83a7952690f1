use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use ao_types::{FluxMap, SlopeMap};
use centroider::{diagnostics, load_subap_table, run_once, BackgroundView, CentroiderParams, CycleDurationHistogram, FrameView};
use stream_port::LocalStreamPort;

/// Per-WFS thresholded center-of-gravity centroider. Triggered on updates
/// of "scmos{wfsnumber}_data", matching spec.md §6.2.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// WFS index this process owns (1-based).
    #[arg(long, default_value_t = 1)]
    wfsnumber: u32,

    /// Subaperture grid columns.
    #[arg(long, default_value_t = 32)]
    nsubx: u32,

    /// Subaperture grid rows.
    #[arg(long, default_value_t = 32)]
    nsuby: u32,

    /// Subaperture field-of-view width in pixels.
    #[arg(long, default_value_t = 6)]
    fovx: u32,

    /// Subaperture field-of-view height in pixels.
    #[arg(long, default_value_t = 6)]
    fovy: u32,

    /// Centroid threshold; values below -1.0 disable thresholding.
    #[arg(long, default_value_t = 0.0)]
    cogthresh: f32,

    /// Margin width (in pixels, each side) used for the per-row background estimate. 0 disables it.
    #[arg(long, default_value_t = 0)]
    bgnpix: u32,

    /// Flux-ratio threshold used by the diagnostics reducer.
    #[arg(long, default_value_t = 0.3)]
    fluxthresh: f32,

    /// Raw frame width in pixels.
    #[arg(long, default_value_t = 256)]
    frame_width: u32,

    /// Raw frame height in pixels.
    #[arg(long, default_value_t = 256)]
    frame_height: u32,

    /// Number of cycles to run before exiting; omit to run forever.
    #[arg(long)]
    cycles: Option<u64>,

    /// Real-time scheduler policy (e.g. 1 for SCHED_FIFO). Requires --sched-priority.
    #[cfg(feature = "posix_sched_fifo")]
    #[arg(long, requires = "sched_priority")]
    sched_policy: Option<i32>,

    /// Real-time scheduler priority. Requires --sched-policy.
    #[cfg(feature = "posix_sched_fifo")]
    #[arg(long, requires = "sched_policy")]
    sched_priority: Option<i32>,
}

impl Cli {
    fn params(&self) -> CentroiderParams {
        CentroiderParams {
            wfsnumber: self.wfsnumber,
            nsubx: self.nsubx,
            nsuby: self.nsuby,
            fovx: self.fovx,
            fovy: self.fovy,
            cogthresh: self.cogthresh,
            bgnpix: self.bgnpix,
            fluxthresh: self.fluxthresh,
        }
    }
}

fn main() -> Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "centroider=info,warn");
    }
    let _guard = env_tracing_logger::init();

    let cli = Cli::parse();
    let params = cli.params();

    #[cfg(feature = "posix_sched_fifo")]
    if let (Some(policy), Some(priority)) = (cli.sched_policy, cli.sched_priority) {
        posix_scheduler::sched_setscheduler(0, policy, priority)
            .context("setting real-time scheduler policy")?;
        info!(policy, priority, "applied POSIX real-time scheduler policy");
    }

    // Stream names use the zero-based WFS slot (spec.md §6.1's "k", 0 ≤ k
    // < MAX_WFS), not the one-based --wfsnumber CLI argument. The original
    // C sources name these inconsistently (`centroider.c` uses the 1-based
    // wfsnumber, `slopevec.c` uses a 0-based loop index for the same
    // streams); this rewrite follows spec.md §6.1's unified 0-based
    // convention so `centroider` and `slopevec` agree on stream names.
    let slot = ao_types::WfsId::new(params.wfsnumber).slot();
    let port = LocalStreamPort::new();
    let frame_name = format!("scmos{slot}_data");
    let bg_name = format!("scmos{slot}_bg");
    let slope_name = format!("slopemap{slot}");
    let flux_name = format!("flux{slot}");

    let subap = load_subap_table(&port, slot, params.nsubx, params.nsuby)
        .with_context(|| format!("loading subaperture geometry for wfs slot {slot}"))?;
    subap.validate_windows(params.fovx, params.fovy, cli.frame_width, cli.frame_height)?;

    // "scmos{k}_data"/"scmos{k}_bg" are Consumed streams (spec.md §6.1): a
    // required input must already exist, so a missing producer is a fatal
    // StreamNotFound at startup, not something this process fabricates.
    let frame_stream = port
        .open::<u16>(&frame_name)
        .with_context(|| format!("opening raw frame stream '{frame_name}'"))?;
    let bg_stream = port
        .open::<f32>(&bg_name)
        .with_context(|| format!("opening background stream '{bg_name}'"))?;

    let frame_shape = frame_stream.shape();
    if frame_shape != (cli.frame_width as usize, cli.frame_height as usize) {
        return Err(centroider::Error::FrameShapeMismatch {
            expected: (cli.frame_width * cli.frame_height) as usize,
            actual: frame_shape.0 * frame_shape.1,
            width: cli.frame_width,
            height: cli.frame_height,
        }
        .into());
    }
    let bg_shape = bg_stream.shape();
    if bg_shape != frame_shape {
        return Err(centroider::Error::BackgroundShapeMismatch {
            expected: frame_shape.0 * frame_shape.1,
            actual: bg_shape.0 * bg_shape.1,
        }
        .into());
    }

    // "flux{k}"/"slopemap{k}" are Produced streams this process owns.
    let slope_stream = port
        .create::<f32>(&slope_name, 2 * subap.n_sub(), 1, 0.0f32)
        .with_context(|| format!("opening slope map stream '{slope_name}'"))?;
    let flux_stream = port
        .create::<f32>(&flux_name, subap.n_sub(), 1, 0.0f32)
        .with_context(|| format!("opening flux map stream '{flux_name}'"))?;

    let wait_idx = frame_stream.get_wait_index();

    info!(
        wfsnumber = params.wfsnumber,
        n_sub = subap.n_sub(),
        "centroider started, waiting on '{}'",
        frame_name
    );

    let mut histogram = CycleDurationHistogram::new(params.wfsnumber);
    let mut cycle = 0u64;
    loop {
        if let Some(limit) = cli.cycles {
            if cycle >= limit {
                break;
            }
        }
        frame_stream
            .sem_wait(wait_idx)
            .with_context(|| format!("waiting on '{frame_name}'"))?;

        let cycle_start = std::time::Instant::now();
        let mut slope_map = SlopeMap::zeros(subap.n_sub());
        let mut flux_map = FluxMap::zeros(subap.n_sub());
        {
            let raw = frame_stream.read();
            let bg = bg_stream.read();
            let frame = FrameView {
                width: cli.frame_width,
                height: cli.frame_height,
                pixels: &raw,
            };
            let bgv = BackgroundView {
                width: cli.frame_width,
                height: cli.frame_height,
                pixels: &bg,
            };
            run_once(&frame, &bgv, &subap, &mut slope_map, &mut flux_map, &params)?;
        }

        {
            let mut w = slope_stream.begin_write();
            w.copy_from_slice(slope_map.as_slice());
        }
        {
            let mut w = flux_stream.begin_write();
            w.copy_from_slice(flux_map.as_slice());
        }

        let diag = diagnostics::reduce(&flux_map, &slope_map, params.fluxthresh);
        if diag.num_valid == 0 {
            warn!(cycle, "no valid subapertures this cycle");
        }
        tracing::trace!(
            cycle,
            max_flux = diag.max_flux,
            num_valid = diag.num_valid,
            tip = diag.tip,
            tilt = diag.tilt,
            "cycle complete"
        );

        histogram.push_sample(cycle_start.elapsed().as_secs_f64(), cycle);
        if histogram.is_old() {
            histogram.show_stats_and_reset();
        }

        cycle += 1;
    }

    info!(cycles = cycle, "centroider exiting cleanly");
    Ok(())
}
