//! Dumping intermediate per-ray arrays to disk, for comparison between runs.

use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::angle_data::RayKey;

/// Path of the file written by `dump_array`
pub fn dump_path(root: &Path, tag: &str, iteration: usize, RayKey { s, p, d }: RayKey) -> PathBuf {
    root.join("outputs").join("cpu").join(format!("{tag}_{iteration}_{s}_{p}_{d}.dat"))
}

/// Write `data` to `<root>/outputs/cpu/<tag>_<iteration>_<s>_<p>_<d>.dat`, one
/// `index value` pair per line.
///
/// This is a debugging aid: failure to write is reported at debug level and
/// otherwise ignored.
pub fn dump_array<T: Display>(root: &Path, tag: &str, iteration: usize, key: RayKey, data: &[T]) {
    let path = dump_path(root, tag, iteration, key);
    if let Err(e) = write_array(&path, data) {
        debug!("could not dump {}: {e}", path.display());
    }
}

fn write_array<T: Display>(path: &Path, data: &[T]) -> std::io::Result<()> {
    if let Some(dir) = path.parent() { fs::create_dir_all(dir)?; }
    let mut out = BufWriter::new(File::create(path)?);
    for (i, value) in data.iter().enumerate() {
        writeln!(out, "{i:>6} \t {value:>12}")?;
    }
    out.flush()
}
