use anyhow::{Context, Result};
use std::path::PathBuf;

use yamal::{Yamal, YamalConfig};

pub fn exec(path: PathBuf, closable: bool) -> Result<()> {
    let existed = path.exists();
    let cfg = YamalConfig::from_env()
        .with_closable(closable)
        .with_aux_thread(false)
        .build();
    let y = Yamal::open_with_config(&path, cfg)
        .with_context(|| format!("init {}", path.display()))?;
    if existed {
        println!(
            "yamal file already initialised at {} ({})",
            path.display(),
            if y.closable() { "closable" } else { "unclosable" }
        );
    } else {
        println!(
            "Initialized yamal file at {} ({}, {} bytes on disk)",
            path.display(),
            if y.closable() { "closable" } else { "unclosable" },
            y.used_size()?
        );
    }
    Ok(())
}
