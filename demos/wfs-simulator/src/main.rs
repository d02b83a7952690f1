//! Synthetic WFS frame generator, grounded on the rotating-spot shared-memory
//! writer of the original simulator reference code. Rather than one spot on
//! a 512x512 frame, this tiles one rotating spot per subaperture so the
//! generated stream exercises a full per-WFS centroiding cycle.
//!
//! [`stream_port::LocalStreamPort`] is process-local, so this binary plays
//! both roles in one process: a writer thread updates the raw frame stream
//! on a fixed tick, and the main thread runs the same centroiding pipeline
//! the `centroider` binary runs, printing diagnostics to the terminal. A
//! real deployment instead runs one `centroider` process per WFS against a
//! shared-memory transport external to this pipeline.

use std::f32::consts::PI;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use ao_types::{FluxMap, SlopeMap, SubapTable};
use centroider::{diagnostics, run_once, BackgroundView, CentroiderParams, FrameView};
use stream_port::{LocalStreamPort, SharedImage};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Subaperture grid columns.
    #[arg(long, default_value_t = 4)]
    nsubx: u32,

    /// Subaperture grid rows.
    #[arg(long, default_value_t = 4)]
    nsuby: u32,

    /// Subaperture field-of-view width and height in pixels.
    #[arg(long, default_value_t = 12)]
    fov: u32,

    /// Orbit radius of the simulated spot within each subaperture, in pixels.
    #[arg(long, default_value_t = 2.0)]
    radius: f32,

    /// Angular step applied to the spot's orbit every frame, in radians.
    #[arg(long, default_value_t = 0.1)]
    dangle: f32,

    /// Delay between generated frames.
    #[arg(long, default_value_t = 10)]
    frame_period_ms: u64,

    /// Number of frames to generate before exiting; omit to run forever.
    #[arg(long)]
    frames: Option<u64>,
}

/// Renders one raw frame with a rotating spot centered `radius` pixels off
/// each subaperture's nominal center, at orbital phase `angle`.
fn render_frame(width: u32, height: u32, subap: &SubapTable, fov: u32, radius: f32, angle: f32) -> Vec<u16> {
    let mut pixels = vec![0u16; (width * height) as usize];
    for i in 0..subap.n_sub() {
        let (cx, cy) = subap.center(i);
        let xc = cx + radius * angle.cos();
        let yc = cy + radius * angle.sin();
        let half = fov as f32 / 2.0;
        let row0 = (cy - half).round().max(0.0) as u32;
        let col0 = (cx - half).round().max(0.0) as u32;
        for row in row0..(row0 + fov).min(height) {
            for col in col0..(col0 + fov).min(width) {
                let dx = col as f32 - xc;
                let dy = row as f32 - yc;
                let v = (dx * 0.4).cos() * (dy * 0.4).cos() * (-0.05 * (dx * dx + dy * dy)).exp();
                let scaled = (v.max(0.0) * 2000.0) as u16;
                let idx = (row * width + col) as usize;
                pixels[idx] = pixels[idx].saturating_add(scaled);
            }
        }
    }
    pixels
}

/// Publishes a uniform grid of subaperture centers onto the `lutx{slot}`/
/// `luty{slot}` calibration streams, standing in for the external
/// calibration-file loader spec.md §6.1 assumes populates them. The
/// centroiding pipeline itself never fabricates this geometry; it always
/// reads it back via [`centroider::load_subap_table`], the same as the
/// `centroider` binary does.
fn publish_uniform_calibration(
    port: &LocalStreamPort,
    slot: usize,
    nsubx: u32,
    nsuby: u32,
    width: u32,
    height: u32,
) -> Result<()> {
    let n_sub = (nsubx as usize) * (nsuby as usize);
    let mut x_center = Vec::with_capacity(n_sub);
    let mut y_center = Vec::with_capacity(n_sub);
    let step_x = width as f32 / nsubx as f32;
    let step_y = height as f32 / nsuby as f32;
    for row in 0..nsuby {
        for col in 0..nsubx {
            x_center.push((col as f32 + 0.5) * step_x);
            y_center.push((row as f32 + 0.5) * step_y);
        }
    }

    let lutx = port
        .create::<f32>(&format!("lutx{slot}"), n_sub, 1, 0.0f32)
        .context("publishing lutx calibration stream")?;
    {
        let mut w = lutx.begin_write();
        w.copy_from_slice(&x_center);
    }
    let luty = port
        .create::<f32>(&format!("luty{slot}"), n_sub, 1, 0.0f32)
        .context("publishing luty calibration stream")?;
    {
        let mut w = luty.begin_write();
        w.copy_from_slice(&y_center);
    }
    Ok(())
}

fn main() -> Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "wfs_simulator=info,warn");
    }
    let _guard = env_tracing_logger::init();

    let cli = Cli::parse();
    let width = cli.nsubx * cli.fov * 2;
    let height = cli.nsuby * cli.fov * 2;

    let port = LocalStreamPort::new();
    publish_uniform_calibration(&port, 0, cli.nsubx, cli.nsuby, width, height)?;
    let subap = centroider::load_subap_table(&port, 0, cli.nsubx, cli.nsuby)
        .context("loading subaperture geometry")?;
    subap.validate_windows(cli.fov, cli.fov, width, height)?;

    let frame_stream: Arc<SharedImage<u16>> =
        port.create("scmos0_data", width as usize, height as usize, 0u16)?;
    let bg_stream: Arc<SharedImage<f32>> =
        port.create("scmos0_bg", width as usize, height as usize, 0.0f32)?;

    let wait_idx = frame_stream.get_wait_index();

    let writer_stream = frame_stream.clone();
    let writer_subap = subap.clone();
    let frames = cli.frames;
    let fov = cli.fov;
    let radius = cli.radius;
    let dangle = cli.dangle;
    let period = Duration::from_millis(cli.frame_period_ms);
    let writer = std::thread::spawn(move || {
        let mut angle = 0.0f32;
        let mut emitted = 0u64;
        loop {
            if let Some(limit) = frames {
                if emitted >= limit {
                    break;
                }
            }
            let data = render_frame(width, height, &writer_subap, fov, radius, angle);
            {
                let mut w = writer_stream.begin_write();
                w.copy_from_slice(&data);
            }
            angle += dangle;
            if angle > 2.0 * PI {
                angle -= 2.0 * PI;
            }
            emitted += 1;
            std::thread::sleep(period);
        }
    });

    let params = CentroiderParams {
        wfsnumber: 1,
        nsubx: cli.nsubx,
        nsuby: cli.nsuby,
        fovx: cli.fov,
        fovy: cli.fov,
        cogthresh: 0.0,
        bgnpix: 0,
        fluxthresh: 0.3,
    };

    info!(n_sub = subap.n_sub(), width, height, "wfs-simulator started");

    let mut cycle = 0u64;
    loop {
        if let Some(limit) = cli.frames {
            if cycle >= limit {
                break;
            }
        }
        frame_stream.sem_wait(wait_idx)?;

        let mut slope_map = SlopeMap::zeros(subap.n_sub());
        let mut flux_map = FluxMap::zeros(subap.n_sub());
        {
            let raw = frame_stream.read();
            let bg = bg_stream.read();
            let frame = FrameView {
                width,
                height,
                pixels: &raw,
            };
            let bgv = BackgroundView {
                width,
                height,
                pixels: &bg,
            };
            run_once(&frame, &bgv, &subap, &mut slope_map, &mut flux_map, &params)?;
        }

        let diag = diagnostics::reduce(&flux_map, &slope_map, params.fluxthresh);
        info!(
            cycle,
            num_valid = diag.num_valid,
            tip = diag.tip,
            tilt = diag.tilt,
            "frame centroided"
        );
        cycle += 1;
    }

    writer.join().expect("writer thread panicked");
    Ok(())
}
