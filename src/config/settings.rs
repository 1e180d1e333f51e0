//! Runtime settings for the execution scaffold
//!
//! Settings come from an optional TOML file, overridden by environment
//! variables:
//!
//! + `USE_ALT_BACKEND`: select the work-stealing backend,
//!
//! + `GPU_TYPE`: index or key of an entry in the GPU registry,
//!
//! + `VERBOSE_LEVEL`: report run manager and thread pool identities when > 0,
//!
//! + `NUM_THREADS`: size of the worker pools.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::exec::Backend;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {

    /// Use the work-stealing backend instead of the chunked one
    #[serde(default)]
    pub use_alt_backend: bool,

    /// Index or key of the selected GPU option
    #[serde(default = "default_gpu_type")]
    pub gpu_type: String,

    #[serde(default)]
    pub verbose_level: i32,

    /// Number of worker threads. All available cores if not given.
    #[serde(default)]
    pub num_threads: Option<usize>,

    /// Minimum number of rays handled by one job of the chunked backend
    #[serde(default = "default_job_size")]
    pub job_size: usize,
}

fn default_gpu_type() -> String { "cpu".into() }
fn default_job_size() -> usize { 64 }

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_alt_backend: false,
            gpu_type: default_gpu_type(),
            verbose_level: 0,
            num_threads: None,
            job_size: default_job_size(),
        }
    }
}

impl Settings {

    /// Defaults, overridden by the process environment
    pub fn from_env() -> Result<Self> { Self::default().with_env() }

    /// Override with values found in the process environment
    pub fn with_env(self) -> Result<Self> {
        self.with_vars(|var| std::env::var(var).ok())
    }

    /// Override with values produced by `lookup`, which plays the role of the
    /// environment
    pub fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(value) = lookup("USE_ALT_BACKEND") {
            self.use_alt_backend = parse_flag("USE_ALT_BACKEND", &value)?;
        }
        if let Some(value) = lookup("GPU_TYPE") {
            let value = value.trim();
            if !value.is_empty() { self.gpu_type = value.to_string(); }
        }
        if let Some(value) = lookup("VERBOSE_LEVEL") {
            self.verbose_level = parse_number("VERBOSE_LEVEL", &value)?;
        }
        if let Some(value) = lookup("NUM_THREADS") {
            let n: usize = parse_number("NUM_THREADS", &value)?;
            self.num_threads = if n == 0 { None } else { Some(n) };
        }
        Ok(self)
    }

    pub fn backend(&self) -> Backend {
        if self.use_alt_backend { Backend::WorkStealing } else { Backend::Chunked }
    }

    /// Number of threads the worker pools should be built with
    pub fn threads(&self) -> usize {
        self.num_threads
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, usize::from))
    }
}

pub fn read_config_file(path: &Path) -> Result<Settings> {
    let text = fs::read_to_string(path)?;
    Ok(toml::from_str(&text)?)
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no"  | "off" => Ok(false),
             "1" | "true"  | "yes" | "on"  => Ok(true),
        _ => Err(Error::BadEnv { var, value: value.into() }),
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| Error::BadEnv { var, value: value.into() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    // ----- Some helpers to make the tests more concise ---------------------------------
    fn parse<'d, D: Deserialize<'d>>(input: &'d str) -> D {
        toml::from_str(input).unwrap()
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| vars.get(var).cloned()
    }

    //  ---  Macro for concise assertions about values of parsed fields -------------------
    macro_rules! check {
        ($type:ident($text:expr).$field:ident = $expected:expr) => {
            let config: $type = parse::<$type>($text);
            println!("DESERIALIZED: {config:?}");
            assert_eq!(config.$field, $expected);
        };
        ($type:ident($text:expr) fields: $($field:ident = $expected:expr);+$(;)?) => {
            let config: $type = parse::<$type>($text);
            println!("DESERIALIZED: {config:?}");
            $(assert_eq!(config.$field, $expected);)*
        }
    }

    // ----- Test deserializing of individual fields -------------------------------------
    #[test]
    fn empty_file_gives_defaults() {
        let config: Settings = parse("");
        assert_eq!(config, Settings::default());
        assert_eq!(config.backend(), Backend::Chunked);
    }

    #[test]
    fn settings_fields() {
        check!(Settings("use_alt_backend = true").use_alt_backend = true);
        check!{Settings(r#"
                 gpu_type = "cuda"
                 verbose_level = 2
                 num_threads = 3
                 job_size = 10
               "#) fields:
               gpu_type      = "cuda";
               verbose_level = 2;
               num_threads   = Some(3);
               job_size      = 10;
               use_alt_backend = false;
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: std::result::Result<Settings, _> = toml::from_str("unknown_field = 666");
        assert!(result.is_err());
    }

    // ----- Environment overrides -------------------------------------------------------
    #[test]
    fn environment_overrides_file() {
        let base: Settings = parse("gpu_type = \"acc\"\nnum_threads = 8");
        let settings = base.with_vars(env(&[
            ("USE_ALT_BACKEND", "1"),
            ("VERBOSE_LEVEL", "3"),
            ("NUM_THREADS", " 2 "),
        ])).unwrap();
        assert_eq!(settings.gpu_type, "acc");
        assert_eq!(settings.num_threads, Some(2));
        assert_eq!(settings.verbose_level, 3);
        assert_eq!(settings.backend(), Backend::WorkStealing);
        assert_eq!(settings.threads(), 2);
    }

    #[test]
    fn absent_environment_changes_nothing() {
        let settings = Settings::default().with_vars(env(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.threads() >= 1);
    }

    #[test]
    fn zero_threads_means_all_cores() {
        let settings = Settings { num_threads: Some(4), ..Settings::default() }
            .with_vars(env(&[("NUM_THREADS", "0")])).unwrap();
        assert_eq!(settings.num_threads, None);
    }

    #[test]
    fn unparsable_environment_is_an_error() {
        let bad = Settings::default().with_vars(env(&[("NUM_THREADS", "many")]));
        assert!(matches!(bad, Err(Error::BadEnv { var: "NUM_THREADS", .. })));
        let bad = Settings::default().with_vars(env(&[("USE_ALT_BACKEND", "maybe")]));
        assert!(matches!(bad, Err(Error::BadEnv { var: "USE_ALT_BACKEND", .. })));
    }

    // ----- Test an on-disk config file -------------------------------------------------
    #[test]
    fn read_settings_from_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "use_alt_backend = true\ngpu_type = \"2\"")?;
        let settings = read_config_file(file.path())?;
        assert!(settings.use_alt_backend);
        assert_eq!(settings.gpu_type, "2");
        Ok(())
    }

    #[test]
    fn missing_or_malformed_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(matches!(read_config_file(&missing), Err(Error::Io(_))));
        let malformed = dir.path().join("bad.toml");
        std::fs::write(&malformed, "job_size = \"lots\"").unwrap();
        assert!(matches!(read_config_file(&malformed), Err(Error::Config(_))));
    }
}
