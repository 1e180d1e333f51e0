pub mod settings;

pub use settings::{read_config_file, Settings};
