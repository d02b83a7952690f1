use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use ao_types::{SlopeVec, WfsMask, MAX_WFS};
use slopevec::{SlopeMapSource, Syncer, SyncerParams};
use stream_port::LocalStreamPort;

/// Slope-vector syncer: collates per-WFS slope maps into one global
/// slope vector under a soft deadline (spec.md §6.2).
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Binary mask selecting which of the 5 WFS slots participate (e.g. WFS1-4 = 0b11110 = 30).
    #[arg(long, default_value_t = 30)]
    wfsflags: u32,

    /// Subaperture grid columns (shared by every selected WFS).
    #[arg(long, default_value_t = 32)]
    nsubx: u32,

    /// Subaperture grid rows (shared by every selected WFS).
    #[arg(long, default_value_t = 32)]
    nsuby: u32,

    /// Soft per-cycle deadline in microseconds, measured from the first WFS to post.
    #[arg(long, default_value_t = 200.0)]
    deadline_us: f32,

    /// Number of cycles to run before exiting; omit to run forever.
    #[arg(long)]
    cycles: Option<u64>,
}

impl Cli {
    fn params(&self) -> SyncerParams {
        SyncerParams {
            wfsflags: self.wfsflags,
            nsubx: self.nsubx,
            nsuby: self.nsuby,
            deadline_us: self.deadline_us,
        }
    }
}

fn main() -> Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "slopevec=info,warn");
    }
    let _guard = env_tracing_logger::init();

    let cli = Cli::parse();
    let params = cli.params();
    let mask = WfsMask::new(params.wfsflags);
    let n_sub = params.n_sub();

    let port = LocalStreamPort::new();

    // "slopemap{k}" is a Consumed stream (spec.md §6.1): each selected WFS's
    // centroider must already be running and have created it, so a missing
    // stream is a fatal StreamNotFound at startup, not something the syncer
    // fabricates.
    let mut sources: [Option<SlopeMapSource>; MAX_WFS] = Default::default();
    for slot in mask.selected_slots() {
        let name = format!("slopemap{slot}");
        let stream = port
            .open::<f32>(&name)
            .with_context(|| format!("opening slope map stream '{name}'"))?;
        let wait_index = stream.get_wait_index();
        sources[slot] = Some(SlopeMapSource { stream, wait_index });
    }

    // "slopevec" is Produced by the syncer itself.
    let slope_vec_stream = port
        .create::<f32>("slopevec", 2 * n_sub * MAX_WFS, 1, 0.0f32)
        .context("opening global slope vector stream")?;

    let mut syncer = Syncer::new(mask, &params);

    info!(wfsflags = params.wfsflags, n_sub, "syncer started");

    let mut cycle = 0u64;
    loop {
        if let Some(limit) = cli.cycles {
            if cycle >= limit {
                break;
            }
        }

        let report = syncer.assemble_once(&sources)?;
        if report.deadline_missed {
            warn!(cycle, "deadline expired before every selected WFS posted; publishing with stale slots");
        }

        publish(&slope_vec_stream, syncer.current());

        tracing::trace!(cycle, slots_updated = report.slots_updated, "cycle complete");
        cycle += 1;
    }

    info!(cycles = cycle, "syncer exiting cleanly");
    Ok(())
}

fn publish(stream: &stream_port::SharedImage<f32>, vec: &SlopeVec) {
    let mut w = stream.begin_write();
    w.copy_from_slice(vec.as_slice());
}
