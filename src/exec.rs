//! Task-parallel execution of per-ray work.
//!
//! Rays are independent: each is traced and projected on its own, and only
//! the accumulation into shared volumes needs coordination. Two backends are
//! provided
//!
//! + `Chunked`: rays are folded in jobs of `job_size`, each job accumulating
//!   into a private buffer; buffers are summed once all jobs are done.
//!
//! + `WorkStealing`: one task per ray, each accumulating directly into the
//!   shared volume under the update lock.
//!
//! Both produce the same results up to floating-point summation order.

mod context;
mod run_manager;
mod task;

pub use context::{ExecutionContext, SharedVolume};
pub use run_manager::{Backend, Device, RunManager, RunState};
pub use task::TaskContext;
