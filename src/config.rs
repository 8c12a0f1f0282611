//! Pipeline settings loaded from an optional TOML file.

mod defaults;
mod errors;
mod io;
mod types;

pub use errors::ConfigError;
pub use io::{DEFAULT_CONFIG_FILE, load_from, load_or_default, write_atomic};
pub use types::{ChurnSettings, DigitsBackend, DigitsSettings, SamplerKind, Settings};
