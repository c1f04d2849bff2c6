pub mod closure;
pub mod generate;
pub mod validate;

pub use closure::*;
pub use generate::*;
pub use validate::*;

use crate::error::CliError;
use serialgen_common::config::ConfigContext;
use serialgen_common::loader::{load_index, LoadedIndex};
use serialgen_common::vfs::Vfs;
use std::path::Path;
use tracing::debug;

/// Configuration plus the type index it points at
pub struct Workspace {
    pub config: ConfigContext,
    pub loaded: LoadedIndex,
}

impl Workspace {
    /// Resolve configuration from `explicit` or by discovery from `start_dir`,
    /// then load the type index it names.
    pub fn open(vfs: &dyn Vfs, explicit: Option<&Path>, start_dir: &Path) -> Result<Self, CliError> {
        let config = ConfigContext::resolve(explicit, start_dir).map_err(CliError::config)?;
        match &config.config_path {
            Some(path) => debug!("Using config {:?}", path),
            None => debug!("No config file found, using defaults at {:?}", config.root),
        }
        let loaded = load_index(vfs, &config.index_patterns())?;
        Ok(Self { config, loaded })
    }
}

fn current_dir() -> Result<std::path::PathBuf, CliError> {
    std::env::current_dir().map_err(|e| CliError::Config {
        message: format!("Cannot read current directory: {}", e),
    })
}
