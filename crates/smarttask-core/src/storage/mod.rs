mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::SmartTaskConfig;
use crate::error::{Result, SmartTaskError};

/// Durable key/value storage for the session mirror.
///
/// Access is synchronous and local. Implementations must tolerate being
/// shared between the session store and the gateway.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Create the durable store described by the configuration.
pub fn create_storage(config: &SmartTaskConfig) -> Result<Arc<dyn KeyValueStore>> {
    let path = match &config.session.path {
        Some(p) => PathBuf::from(p),
        None => default_session_path()?,
    };
    Ok(Arc::new(FileStorage::open(path)))
}

/// Default session file: `~/.config/smarttask/session.json`
fn default_session_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join("smarttask").join("session.json"))
        .ok_or_else(|| SmartTaskError::Config("cannot determine config directory".to_string()))
}
