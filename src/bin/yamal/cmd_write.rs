use anyhow::Result;
use std::path::PathBuf;

use yamal::metrics;

use super::util::{list_name, open_writer, read_value};

pub fn exec(path: PathBuf, list: usize, value: String) -> Result<()> {
    let bytes = read_value(&value)?;
    let y = open_writer(&path, false)?;

    let mut r = y.reserve(bytes.len())?;
    r.data_mut().copy_from_slice(&bytes);
    let it = y.commit(r, list)?;
    let msg = y.read(it)?;
    let ms = metrics::snapshot();

    println!(
        "OK write: list={} ({}) seqno={} size={} B offset={} commit_retries={:.1}",
        list,
        list_name(list),
        msg.seqno,
        msg.data.len(),
        y.tell(y.next(it)?)?,
        ms.avg_commit_retries()
    );
    Ok(())
}
