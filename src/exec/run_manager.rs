use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

use log::{debug, info, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::Result;

/// Where the work managed by a `RunManager` is meant to run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Device { Cpu, Gpu }

impl Device {
    fn name(self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
            Device::Gpu => "gpu",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend { Chunked, WorkStealing }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState { Uninitialized, Initializing, Ready }

const UNINITIALIZED: u8 = 0;
const INITIALIZING : u8 = 1;
const READY        : u8 = 2;

/// Owner of the worker pool for one device.
///
/// The pool is built on first use. Initialization may be requested
/// concurrently and repeatedly: exactly one pool is ever built, and later
/// requests return it unchanged.
#[derive(Debug)]
pub struct RunManager {
    device: Device,
    verbose: i32,
    state: AtomicU8,
    init_lock: Mutex<()>,
    pool: OnceLock<ThreadPool>,
}

impl RunManager {

    pub fn new(device: Device, verbose: i32) -> Self {
        Self {
            device,
            verbose,
            state: AtomicU8::new(UNINITIALIZED),
            init_lock: Mutex::new(()),
            pool: OnceLock::new(),
        }
    }

    pub fn device(&self) -> Device { self.device }

    pub fn state(&self) -> RunState {
        match self.state.load(Ordering::Acquire) {
            UNINITIALIZED => RunState::Uninitialized,
            INITIALIZING  => RunState::Initializing,
            _             => RunState::Ready,
        }
    }

    pub fn is_initialized(&self) -> bool { self.state() == RunState::Ready }

    /// The worker pool, if it has been built
    pub fn thread_pool(&self) -> Option<&ThreadPool> {
        if self.is_initialized() { self.pool.get() } else { None }
    }

    /// Number of workers in the pool; 0 before initialization
    pub fn num_threads(&self) -> usize {
        self.thread_pool().map_or(0, ThreadPool::current_num_threads)
    }

    /// Build the worker pool with `nthreads` workers, unless it already
    /// exists, and return it.
    pub fn initialize(&self, nthreads: usize) -> Result<&ThreadPool> {
        // Fast path: no locking once the pool exists
        if let Some(pool) = self.thread_pool() {
            return Ok(self.reuse(pool, nthreads));
        }
        let _guard = self.init_lock.lock().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have finished initializing while we waited
        if let Some(pool) = self.pool.get() {
            return Ok(self.reuse(pool, nthreads));
        }
        self.state.store(INITIALIZING, Ordering::Release);
        debug!("building {} worker pool with {nthreads} threads", self.device.name());
        let device = self.device.name();
        let built = ThreadPoolBuilder::new()
            .num_threads(nthreads)
            .thread_name(move |i| format!("tomoray-{device}-{i}"))
            .build();
        let pool = match built {
            Ok(pool) => self.pool.get_or_init(|| pool),
            Err(e) => {
                self.state.store(UNINITIALIZED, Ordering::Release);
                return Err(e.into());
            }
        };
        self.state.store(READY, Ordering::Release);
        if self.verbose > 0 {
            info!("{} run manager at {:p} owns thread pool at {:p} with {} threads",
                  device, self, pool, pool.current_num_threads());
        }
        Ok(pool)
    }

    fn reuse<'p>(&self, pool: &'p ThreadPool, nthreads: usize) -> &'p ThreadPool {
        let current = pool.current_num_threads();
        if nthreads != current {
            warn!("{} run manager already initialized with {current} threads: ignoring request for {nthreads}",
                  self.device.name());
        }
        pool
    }
}
