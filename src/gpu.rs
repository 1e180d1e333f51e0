//! Registry of the GPU back ends which can be selected with `GPU_TYPE`.

use std::fmt;

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GpuOption {
    pub index: usize,
    pub key: &'static str,
    pub description: &'static str,
}

pub const GPU_OPTIONS: [GpuOption; 4] = [
    GpuOption { index: 0, key: "cpu" , description: "Run on CPU"              },
    GpuOption { index: 1, key: "acc" , description: "Run on GPU with OpenACC" },
    GpuOption { index: 2, key: "omp" , description: "Run on GPU with OpenMP"  },
    GpuOption { index: 3, key: "cuda", description: "Run on GPU with CUDA"    },
];

const SPACER_WIDTH: usize = 90;

impl GpuOption {

    /// Look up an option by index (`"3"`) or by key (`"cuda"`, any case)
    pub fn select(choice: &str) -> Result<Self> {
        let choice = choice.trim();
        let found = match choice.parse::<usize>() {
            Ok(index) => GPU_OPTIONS.iter().find(|o| o.index == index),
            Err(_)    => GPU_OPTIONS.iter().find(|o| o.key.eq_ignore_ascii_case(choice)),
        };
        found.copied().ok_or_else(|| Error::UnknownGpuOption(choice.into()))
    }

    /// Does this option run on the host?
    pub fn is_host(&self) -> bool { self.index == 0 }

    /// All options, formatted for display to the user
    pub fn table() -> String {
        let spacer = "=".repeat(SPACER_WIDTH);
        let mut table = format!("\n{spacer}\nAvailable GPU options:\n");
        table.push_str(&format!("\t{:<5}  \t{:<12}  {:<40}\n", "INDEX", "KEY", "DESCRIPTION"));
        for option in &GPU_OPTIONS {
            table.push_str(&format!("{option}\n"));
        }
        table.push_str("\nTo select an option for runtime, set GPU_TYPE environment variable\n");
        table.push_str("  to an INDEX or KEY above\n");
        table.push_str(&format!("{spacer}\n"));
        table
    }

    pub fn print_table() { print!("{}", Self::table()) }
}

impl fmt::Display for GpuOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\t{:>5}  \t{:<12}  {:<40}", self.index, self.key, self.description)
    }
}
