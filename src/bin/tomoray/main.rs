use std::error::Error;
use std::f32::consts::PI;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use ndarray::Array3;

use tomoray::{
    art_update, AngleData, ExecutionContext, GpuOption, Grid, Model, RayKey, Scan, Settings, TaskContext,
    config::read_config_file,
    debug::dump_array,
    utils::{group_digits, timing::Progress},
};

mod cli;
use cli::Cli;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Cli::parse();

    if args.list_gpu_options {
        GpuOption::print_table();
        return Ok(());
    }

    // --- Settings: file, then environment --------------------------------------------
    let settings = match &args.config {
        Some(path) => read_config_file(path)?,
        None       => Settings::default(),
    }.with_env()?;
    info!("{settings:?}");
    let ctx = ExecutionContext::new(settings)?;

    // --- Acquisition geometry ------------------------------------------------------
    let (ry, rz) = args.grid;
    let slices = args.slices;
    let pixels = args.detector_pixels.unwrap_or(ry);
    let center = args.center.unwrap_or((pixels as f32 - 1.0) / 2.0);
    let grid = Grid::new(ry, rz, pixels, center)?;
    let theta: Vec<f32> = (0..args.angles).map(|p| p as f32 * PI / args.angles as f32).collect();
    let scan = Scan::new(&grid, &theta, pixels);
    let task = TaskContext::master();

    let mut progress = Progress::new();
    progress.start("Building phantom");
    let phantom = disc_phantom(&grid, slices);
    let model = Model::single(&grid, phantom.view())?;
    progress.done();

    // --- Forward projection, one slice at a time -----------------------------------
    let slice_rays = |s: usize| -> Vec<RayKey> {
        RayKey::sweep(1, theta.len(), pixels).map(|k| RayKey { s, ..k }).collect()
    };
    let mut simdata = Array3::zeros((slices, theta.len(), pixels));
    let bar = slice_bar(slices, "Simulating");
    for s in 0..slices {
        ctx.simulate(task, scan, &slice_rays(s), &model, simdata.view_mut())?;
        bar.inc(1);
    }
    bar.finish_and_clear();
    progress.done_with_message("Simulated projections");

    // --- Back-projection of normalized projections ---------------------------------
    let mut recon = Array3::zeros((slices, ry, rz));
    let mut n_rays = 0;
    let mut n_missed = 0;
    let bar = slice_bar(slices, "Back-projecting");
    for s in 0..slices {
        let rays = slice_rays(s);
        let traced = ctx.trace(task, scan, &rays)?;
        n_rays += traced.len();
        n_missed += traced.iter().filter(|r| r.is_empty()).count();
        let updates: Vec<f32> = traced.iter()
            .map(|r: &AngleData| art_update(simdata[[r.s, r.p, r.d]], 0.0, r.sum_dist_sqr))
            .collect();
        ctx.back_project(task, scan, &rays, &updates, recon.view_mut())?;
        if s == 0 {
            if let (Some(root), Some(first)) = (&args.dump, traced.first()) {
                dump_array(root, "indi", 0, first.key(), &first.indi);
                dump_array(root, "dist", 0, first.key(), &first.dist);
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();
    progress.done_with_message("Back-projected");

    println!("Rays traced: {} ({} missed the grid)", group_digits(n_rays), group_digits(n_missed));
    println!("Phantom total:         {:>12.3}", phantom.sum());
    println!("Projection total:      {:>12.3}", simdata.sum());
    println!("Back-projection total: {:>12.3}", recon.sum());
    Ok(())
}

/// Uniform disc with a hotter disc off-centre, identical in every slice
fn disc_phantom(grid: &Grid, slices: usize) -> Array3<f32> {
    let r = 0.4 * grid.ry.min(grid.rz) as f32;
    Array3::from_shape_fn((slices, grid.ry, grid.rz), |(_, ix, iy)| {
        let x = grid.gridx[ix] + 0.5;
        let y = grid.gridy[iy] + 0.5;
        let hot = (x - 0.3 * r).hypot(y) < 0.3 * r;
        if hot { 2.0 } else if x.hypot(y) < r { 1.0 } else { 0.0 }
    })
}

fn slice_bar(slices: usize, message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(slices as u64).with_message(message);
    if let Ok(style) = ProgressStyle::default_bar().template("{msg}: [{elapsed_precise}] {wide_bar} {pos}/{len} slices") {
        bar.set_style(style);
    }
    bar
}
