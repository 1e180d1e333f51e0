use std::sync::{Mutex, PoisonError};

use log::{debug, info, warn};
use ndarray::{Array3, ArrayViewMut3};
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::{
    angle_data::{AngleData, RayKey, Scan},
    config::Settings,
    error::{Error, Result},
    gpu::GpuOption,
    projector::{self, Model},
    siddon::Siddon,
};

use super::{Backend, Device, RunManager, TaskContext};

/// A volume receiving concurrent accumulations, guarded by the update lock
#[derive(Debug)]
pub struct SharedVolume<'v> {
    volume: Mutex<ArrayViewMut3<'v, f32>>,
}

impl<'v> SharedVolume<'v> {

    pub fn new(volume: ArrayViewMut3<'v, f32>) -> Self { Self { volume: Mutex::new(volume) } }

    /// Apply `f` to the volume while holding the lock
    pub fn update<R>(&self, f: impl FnOnce(ArrayViewMut3<f32>) -> R) -> R {
        let mut volume = self.volume.lock().unwrap_or_else(PoisonError::into_inner);
        f(volume.view_mut())
    }

    pub fn into_inner(self) -> ArrayViewMut3<'v, f32> {
        self.volume.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// How a pass will be executed
#[derive(Clone, Copy, Debug)]
enum Strategy<'p> {
    /// Serially on the submitting thread
    Inline,
    Pool(&'p ThreadPool, Backend),
}

/// Everything needed to run projection passes: the settings, and one run
/// manager per device.
///
/// Created once by the caller and passed explicitly to whatever needs it.
#[derive(Debug)]
pub struct ExecutionContext {
    settings: Settings,
    gpu: GpuOption,
    cpu_manager: RunManager,
    gpu_manager: RunManager,
}

impl ExecutionContext {

    pub fn new(settings: Settings) -> Result<Self> {
        let gpu = GpuOption::select(&settings.gpu_type)?;
        if !gpu.is_host() {
            warn!("GPU option `{}` ({}) selected: no device kernels are available, host kernels will run on the GPU run manager",
                  gpu.key, gpu.description);
        }
        if settings.verbose_level > 0 {
            info!("backend: {:?}, GPU option: {}, threads: {}",
                  settings.backend(), gpu.key, settings.threads());
        }
        let verbose = settings.verbose_level;
        Ok(Self {
            settings,
            gpu,
            cpu_manager: RunManager::new(Device::Cpu, verbose),
            gpu_manager: RunManager::new(Device::Gpu, verbose),
        })
    }

    /// Context configured by defaults and the process environment
    pub fn from_env() -> Result<Self> { Self::new(Settings::from_env()?) }

    pub fn settings(&self) -> &Settings { &self.settings }

    pub fn gpu_option(&self) -> GpuOption { self.gpu }

    pub fn backend(&self) -> Backend { self.settings.backend() }

    /// The device on which passes run
    pub fn device(&self) -> Device {
        if self.gpu.is_host() { Device::Cpu } else { Device::Gpu }
    }

    pub fn run_manager(&self, device: Device) -> &RunManager {
        match device {
            Device::Cpu => &self.cpu_manager,
            Device::Gpu => &self.gpu_manager,
        }
    }

    /// Initialize the run manager of the selected device and return its pool
    pub fn initialize(&self) -> Result<&ThreadPool> {
        self.run_manager(self.device()).initialize(self.settings.threads())
    }

    /// Run `op` as a task on the worker pool, or inline if `task` is already
    /// inside a worker task. `op` receives the context of the new task.
    pub fn run<R: Send>(&self, task: TaskContext, op: impl FnOnce(TaskContext) -> R + Send) -> Result<R> {
        match self.strategy(task)? {
            Strategy::Inline        => Ok(op(task.enter())),
            Strategy::Pool(pool, _) => Ok(pool.install(|| op(task.enter()))),
        }
    }

    fn strategy(&self, task: TaskContext) -> Result<Strategy<'_>> {
        if task.within_task() {
            debug!("submission at task depth {}: running inline", task.depth());
            return Ok(Strategy::Inline);
        }
        Ok(Strategy::Pool(self.initialize()?, self.backend()))
    }

    /// Trace every ray in `rays`, returning their weights in the same order
    pub fn trace(&self, task: TaskContext, scan: Scan, rays: &[RayKey]) -> Result<Vec<AngleData>> {
        check_rays(scan, rays, usize::MAX)?;
        let grid = scan.grid;
        let trace_one = |siddon: &mut Siddon, key: &RayKey| scan.trace(*key, siddon);
        Ok(match self.strategy(task)? {
            Strategy::Inline => {
                let mut siddon = Siddon::new(grid);
                rays.iter().map(|key| trace_one(&mut siddon, key)).collect()
            }
            Strategy::Pool(pool, _) => pool.install(|| {
                rays.par_iter()
                    .with_min_len(self.settings.job_size)
                    .map_init(|| Siddon::new(grid), trace_one)
                    .collect()
            }),
        })
    }

    /// Forward-project `model` along every ray in `rays`, accumulating into
    /// `simdata` (indexed `[slice, angle, detector pixel]`)
    pub fn simulate(
        &self,
        task: TaskContext,
        scan: Scan,
        rays: &[RayKey],
        model: &Model,
        mut simdata: ArrayViewMut3<f32>,
    ) -> Result<()> {
        let (slices, angles, pixels) = simdata.dim();
        if (angles, pixels) != (scan.angles(), scan.pixels) {
            return Err(Error::VolumeShape {
                name: "simdata",
                found: vec![slices, angles, pixels],
                expected: vec![slices, scan.angles(), scan.pixels],
            });
        }
        check_rays(scan, rays, slices.min(model.slices()))?;

        let grid = scan.grid;
        let project = |siddon: &mut Siddon, key: &RayKey| {
            let ray = scan.trace(*key, siddon);
            (*key, model.ray_sum(grid, &ray))
        };
        let strategy = self.strategy(task)?;
        debug!("simulating {} rays: {strategy:?}", rays.len());
        match strategy {
            Strategy::Inline => {
                let mut siddon = Siddon::new(grid);
                for key in rays {
                    let (k, value) = project(&mut siddon, key);
                    simdata[[k.s, k.p, k.d]] += value;
                }
            }
            Strategy::Pool(pool, Backend::Chunked) => {
                let projections: Vec<(RayKey, f32)> = pool.install(|| {
                    rays.par_iter()
                        .with_min_len(self.settings.job_size)
                        .map_init(|| Siddon::new(grid), project)
                        .collect()
                });
                // Rays may share a cell: accumulate after all jobs are done
                for (k, value) in projections {
                    simdata[[k.s, k.p, k.d]] += value;
                }
            }
            Strategy::Pool(pool, Backend::WorkStealing) => {
                let shared = SharedVolume::new(simdata);
                pool.install(|| {
                    rays.par_iter()
                        .with_max_len(1)
                        .for_each_init(|| Siddon::new(grid), |siddon, key| {
                            let (k, value) = project(siddon, key);
                            shared.update(|mut data| data[[k.s, k.p, k.d]] += value);
                        })
                });
            }
        }
        Ok(())
    }

    /// Back-project `updates[i]` along `rays[i]` for every `i`, accumulating
    /// into `recon` (indexed `[slice, row, column]`)
    pub fn back_project(
        &self,
        task: TaskContext,
        scan: Scan,
        rays: &[RayKey],
        updates: &[f32],
        mut recon: ArrayViewMut3<f32>,
    ) -> Result<()> {
        let grid = scan.grid;
        let (slices, ry, rz) = recon.dim();
        if (ry, rz) != (grid.ry, grid.rz) {
            return Err(Error::VolumeShape {
                name: "recon",
                found: vec![slices, ry, rz],
                expected: vec![slices, grid.ry, grid.rz],
            });
        }
        if updates.len() != rays.len() {
            return Err(Error::VolumeShape { name: "updates", found: vec![updates.len()], expected: vec![rays.len()] });
        }
        check_rays(scan, rays, slices)?;

        let strategy = self.strategy(task)?;
        debug!("back-projecting {} rays: {strategy:?}", rays.len());
        match strategy {
            Strategy::Inline => {
                let mut siddon = Siddon::new(grid);
                for (key, &update) in rays.iter().zip(updates) {
                    let ray = scan.trace(*key, &mut siddon);
                    projector::back_project(grid, &ray, update, recon.view_mut());
                }
            }
            Strategy::Pool(pool, Backend::Chunked) => {
                let shape = recon.raw_dim();
                // Every job owns a whole volume: keep the number of jobs close
                // to the number of threads
                let job_size = self.settings.job_size
                    .max(rays.len().div_ceil(pool.current_num_threads()));
                let summed = pool.install(|| {
                    rays.par_iter()
                        .zip(updates)
                        .with_min_len(job_size)
                        .with_max_len(job_size)
                        .fold(|| (Array3::zeros(shape), Siddon::new(grid)),
                              |(mut volume, mut siddon), (key, &update)| {
                                  let ray = scan.trace(*key, &mut siddon);
                                  projector::back_project(grid, &ray, update, volume.view_mut());
                                  (volume, siddon)
                              })
                        .map(|(volume, _)| volume)
                        .reduce(|| Array3::zeros(shape), |a, b| a + b)
                });
                recon += &summed;
            }
            Strategy::Pool(pool, Backend::WorkStealing) => {
                let shared = SharedVolume::new(recon);
                pool.install(|| {
                    rays.par_iter()
                        .zip(updates)
                        .with_max_len(1)
                        .for_each_init(|| Siddon::new(grid), |siddon, (key, &update)| {
                            let ray = scan.trace(*key, siddon);
                            shared.update(|volume| projector::back_project(grid, &ray, update, volume));
                        })
                });
            }
        }
        Ok(())
    }
}

fn check_rays(scan: Scan, rays: &[RayKey], slices: usize) -> Result<()> {
    match rays.iter().find(|key| !scan.contains(**key, slices)) {
        Some(&key) => Err(Error::RayOutOfRange { key, bounds: [slices, scan.angles(), scan.pixels] }),
        None => Ok(()),
    }
}
