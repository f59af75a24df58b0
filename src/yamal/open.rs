//! yamal/open: открытие файла (writer / read-only) с конфигом.

use std::fs::OpenOptions;
use std::path::Path;

use crate::config::YamalConfig;
use crate::error::{Result, YamalError};

use super::core::Yamal;

impl Yamal {
    /// Read-write open, creating the file if needed. Config comes from the environment.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, YamalConfig::from_env())
    }

    pub fn open_ro(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_ro_with_config(path, YamalConfig::from_env())
    }

    pub fn open_with_config(path: impl AsRef<Path>, cfg: YamalConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .map_err(|e| YamalError::io(format!("open {}", path.display()), e))?;
        Self::attach(file, false, cfg, path.display().to_string())
    }

    pub fn open_ro_with_config(path: impl AsRef<Path>, cfg: YamalConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .open(path)
            .map_err(|e| YamalError::io(format!("open {} (ro)", path.display()), e))?;
        Self::attach(file, true, cfg, path.display().to_string())
    }
}
