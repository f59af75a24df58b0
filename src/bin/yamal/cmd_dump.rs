use anyhow::Result;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use super::util::{list_name, open_reader, Body};

const FOLLOW_POLL: Duration = Duration::from_millis(50);

pub fn exec(path: PathBuf, list: usize, hex: bool, follow: bool) -> Result<()> {
    let y = open_reader(&path)?;
    let mut msgs = y.messages(list)?;
    let mut printed = 0u64;

    loop {
        // Проверяем до вычитки: всё, что закоммичено до закрытия, успеет напечататься.
        let closed = follow && y.closed(list)?;
        for msg in msgs.by_ref() {
            let msg = msg?;
            let body = Body { data: msg.data, hex };
            println!("seqno={} size={} B -> {}", msg.seqno, msg.data.len(), body);
            printed += 1;
        }
        if !follow || closed {
            break;
        }
        thread::sleep(FOLLOW_POLL);
    }

    if printed == 0 {
        println!("(no messages in list {} ({}))", list, list_name(list));
    }
    Ok(())
}
