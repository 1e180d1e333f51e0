use std::path::PathBuf;

use tomoray::utils::parse_pair;

/// Command line interface for `tomoray` executable
#[derive(clap::Parser, Debug, Clone)]
#[clap(
    name = "tomoray",
    about = "Simulate projections of a synthetic phantom and back-project them",
)]
pub (super) struct Cli {
    /// TOML settings file. Environment variables take precedence over it
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// Number of pixels along each axis of the reconstruction grid
    #[clap(short, long, value_parser = parse_pair::<usize>, default_value = "64,64")]
    pub grid: (usize, usize),

    /// Number of projection angles, spread over half a turn
    #[clap(short, long, default_value = "90")]
    pub angles: usize,

    /// Number of slices
    #[clap(short, long, default_value = "1")]
    pub slices: usize,

    /// Number of detector pixels [default: number of grid rows]
    #[clap(short, long)]
    pub detector_pixels: Option<usize>,

    /// Rotation centre, in detector pixels [default: middle of detector]
    #[clap(long)]
    pub center: Option<f32>,

    /// Dump the weights of the first ray under this directory
    #[clap(long)]
    pub dump: Option<PathBuf>,

    /// Show the available GPU options and exit
    #[clap(long)]
    pub list_gpu_options: bool,
}
