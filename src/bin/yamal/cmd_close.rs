use anyhow::{anyhow, Result};
use std::path::PathBuf;

use super::util::{list_name, open_writer};

pub fn exec(path: PathBuf, list: usize) -> Result<()> {
    let y = open_writer(&path, false)?;
    if !y.closable() {
        return Err(anyhow!(
            "{} was created unclosable (use `yamal init --closable` for new files)",
            path.display()
        ));
    }
    let was_closed = y.closed(list)?;
    y.close(list)?;
    if was_closed {
        println!("list {} ({}) was already closed", list, list_name(list));
    } else {
        println!("closed list {} ({})", list, list_name(list));
    }
    Ok(())
}
