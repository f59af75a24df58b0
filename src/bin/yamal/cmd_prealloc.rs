use anyhow::Result;
use std::path::PathBuf;

use super::util::open_writer;

pub fn exec(path: PathBuf, size: u64) -> Result<()> {
    let y = open_writer(&path, false)?;
    let before = y.used_size()?;
    y.allocate(size)?;
    y.sync()?;
    println!(
        "Preallocated {}: {} -> {} bytes on disk ({} page(s) mapped)",
        path.display(),
        before,
        y.used_size()?,
        y.mapped_pages()
    );
    Ok(())
}
