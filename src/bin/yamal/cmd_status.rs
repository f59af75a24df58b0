use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use yamal::consts::{LIST_COUNT, PAGE_SIZE};
use yamal::metrics;

use super::util::{list_name, open_reader};

#[derive(Debug, Serialize)]
struct ListStatus {
    index: usize,
    name: &'static str,
    messages: u64,
    last_seqno: Option<u64>,
    bytes: u64,
    closed: bool,
}

#[derive(Debug, Serialize)]
struct FileStatus {
    path: String,
    page_size: u64,
    reserved_size: u64,
    used_size: u64,
    closable: bool,
    mapped_pages: usize,
    lists: Vec<ListStatus>,
}

#[derive(Debug, Serialize)]
struct MetricsStatus {
    pages_mapped: u64,
    reservations: u64,
    commits: u64,
    commit_retries: u64,
    avg_commit_retries: f64,
    aux_errors: u64,
}

pub fn exec(path: PathBuf, json: bool) -> Result<()> {
    let y = open_reader(&path)?;

    let mut lists = Vec::with_capacity(LIST_COUNT);
    for index in 0..LIST_COUNT {
        let mut st = ListStatus {
            index,
            name: list_name(index),
            messages: 0,
            last_seqno: None,
            bytes: 0,
            closed: y.closed(index)?,
        };
        for msg in y.messages(index)? {
            let msg = msg?;
            st.messages += 1;
            st.bytes += msg.data.len() as u64;
            st.last_seqno = Some(msg.seqno);
        }
        lists.push(st);
    }

    let status = FileStatus {
        path: path.display().to_string(),
        page_size: PAGE_SIZE,
        reserved_size: y.reserved_size()?,
        used_size: y.used_size()?,
        closable: y.closable(),
        mapped_pages: y.mapped_pages(),
        lists,
    };

    if json {
        let ms = metrics::snapshot();
        let out = serde_json::json!({
            "file": status,
            "metrics": MetricsStatus {
                pages_mapped: ms.pages_mapped,
                reservations: ms.reservations,
                commits: ms.commits,
                commit_retries: ms.commit_retries,
                avg_commit_retries: ms.avg_commit_retries(),
                aux_errors: ms.aux_errors,
            },
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("yamal {}", status.path);
    println!("  page_size     = {}", status.page_size);
    println!("  reserved_size = {}", status.reserved_size);
    println!("  used_size     = {}", status.used_size);
    println!("  closable      = {}", status.closable);
    println!("  mapped_pages  = {}", status.mapped_pages);
    println!("Lists:");
    for l in &status.lists {
        println!(
            "  [{}] {:<4} messages={} bytes={} last_seqno={} closed={}",
            l.index,
            l.name,
            l.messages,
            l.bytes,
            l.last_seqno
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
            l.closed
        );
    }
    Ok(())
}
