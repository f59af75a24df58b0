//! yamal/core: структура Yamal, инициализация заголовка, размеры и Drop.
//!
//! - Shared: PageTable + конфиг; делится с фоновым потоком через Arc.
//! - Writer при открытии делает set-if-zero для magic/size/голов списков/closable,
//!   поэтому несколько процессов могут открыть новый файл одновременно.
//! - Reader только проверяет magic и ничего не пишет.
//! - impl Drop: сначала останавливаем и join'им фоновый поток, затем снимаем отображения.

use std::fs::File;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::info;

use crate::config::YamalConfig;
use crate::consts::{
    list_head_offset, CLOSABLE_NO, CLOSABLE_UNSET, CLOSABLE_YES, HDR_OFF_LISTS, HDR_SIZE,
    LIST_COUNT, MAGIC,
};
use crate::endian;
use crate::error::{Result, YamalError};
use crate::mmap::PageTable;

use super::background::AuxThread;
use super::layout::{HeaderRef, NodeRef};

pub(crate) struct Shared {
    pub(crate) pages: PageTable,
    pub(crate) cfg: YamalConfig,
}

impl Shared {
    pub(crate) fn header(&self) -> Result<HeaderRef<'_>> {
        HeaderRef::load(&self.pages)
    }

    pub(crate) fn reserved_size(&self) -> Result<u64> {
        Ok(self.header()?.reserved())
    }
}

// Ids of live and past handles in this process; never reused.
static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to one yamal file. Cheap to share between threads by reference.
pub struct Yamal {
    pub(crate) shared: Arc<Shared>,
    pub(crate) id: u64,
    pub(crate) closable: bool,
    aux: Option<AuxThread>,
}

fn describe_closable(v: u64) -> &'static str {
    match v {
        CLOSABLE_YES => "closable",
        CLOSABLE_NO => "unclosable",
        CLOSABLE_UNSET => "uninitialised",
        _ => "corrupt",
    }
}

impl Yamal {
    /// Attach to an already open file. `readonly` must match how `file` was opened.
    pub fn from_file(file: File, readonly: bool, cfg: YamalConfig) -> Result<Self> {
        Self::attach(file, readonly, cfg, "<fd>".to_string())
    }

    pub(crate) fn attach(
        file: File,
        readonly: bool,
        cfg: YamalConfig,
        label: String,
    ) -> Result<Self> {
        let pages = PageTable::new(file, readonly, label);
        let closable = if readonly {
            init_ro(&pages)?
        } else {
            init_rw(&pages, cfg.closable)?
        };

        let shared = Arc::new(Shared { pages, cfg });

        let aux = if readonly {
            None
        } else {
            let reserved = shared.reserved_size()?;
            shared
                .pages
                .prealloc_ahead(reserved, shared.cfg.prealloc_size)?;
            if shared.cfg.aux_thread {
                Some(AuxThread::spawn(Arc::clone(&shared))?)
            } else {
                None
            }
        };

        Ok(Self {
            shared,
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
            closable,
            aux,
        })
    }

    #[inline]
    pub fn readonly(&self) -> bool {
        self.shared.pages.readonly()
    }

    /// Whether lists of this file can be closed. Fixed by the first writer.
    #[inline]
    pub fn closable(&self) -> bool {
        self.closable
    }

    pub fn config(&self) -> &YamalConfig {
        &self.shared.cfg
    }

    /// Path (or `<fd>`) this handle was opened with.
    pub fn label(&self) -> &str {
        self.shared.pages.label()
    }

    /// Bytes handed out so far, header included.
    pub fn reserved_size(&self) -> Result<u64> {
        self.shared.reserved_size()
    }

    /// Bytes allocated on disk (length of the backing file).
    pub fn used_size(&self) -> Result<u64> {
        self.shared.pages.file_len()
    }

    pub fn mapped_pages(&self) -> usize {
        self.shared.pages.mapped_pages()
    }

    /// Whether this handle runs the background preallocation thread.
    pub fn has_aux_thread(&self) -> bool {
        self.aux.is_some()
    }

    // ----- eager allocation -----

    pub fn allocate_page(&self, index: usize) -> Result<()> {
        self.shared.pages.allocate_page(index)
    }

    pub fn allocate_pages(&self, first: usize, last: usize) -> Result<()> {
        self.shared.pages.allocate_pages(first, last)
    }

    pub fn allocate(&self, total_size: u64) -> Result<()> {
        self.shared.pages.allocate(total_size)
    }

    /// Start asynchronous write-back of all mapped pages.
    pub fn sync(&self) -> Result<usize> {
        self.shared.pages.sync()
    }

    #[inline]
    pub(crate) fn node(&self, off: u64) -> Result<NodeRef<'_>> {
        NodeRef::load(&self.shared.pages, off)
    }

    #[inline]
    pub(crate) fn header(&self) -> Result<HeaderRef<'_>> {
        self.shared.header()
    }

    #[inline]
    pub(crate) fn check_writable(&self, op: &'static str) -> Result<()> {
        if self.readonly() {
            return Err(YamalError::ReadOnly(op));
        }
        Ok(())
    }

    /// Nodes reserved through another handle (possibly of another file) are
    /// never linked through this one.
    pub(crate) fn check_owner(&self, owner: u64) -> Result<()> {
        if owner != self.id {
            return Err(YamalError::invalid(format!(
                "node was reserved through another handle than {}",
                self.label()
            )));
        }
        Ok(())
    }
}

impl Drop for Yamal {
    fn drop(&mut self) {
        if let Some(aux) = self.aux.take() {
            aux.stop();
        }
    }
}

fn init_rw(pages: &PageTable, closable: bool) -> Result<bool> {
    let hdr = HeaderRef::load(pages)?;

    let magic = endian::magic_value(MAGIC);
    let fresh = match endian::cas(hdr.magic, 0, magic) {
        Ok(_) => true,
        Err(v) if v == magic => false,
        Err(_) => {
            return Err(YamalError::InvalidFormat(format!(
                "{} is not a yamal file (bad magic number)",
                pages.label()
            )))
        }
    };

    let _ = endian::cas(hdr.size, 0, HDR_SIZE);
    for list in 0..LIST_COUNT {
        let head = NodeRef::load(pages, list_head_offset(list))?;
        head.init_tail_hint();
    }

    let want = if closable { CLOSABLE_YES } else { CLOSABLE_NO };
    if !endian::expect_or_init(hdr.closable, want) {
        return Err(YamalError::InvalidFormat(format!(
            "{} is {} but was opened as {}",
            pages.label(),
            describe_closable(endian::load(hdr.closable)),
            describe_closable(want)
        )));
    }

    if fresh {
        info!(
            "initialised yamal header in {} ({})",
            pages.label(),
            describe_closable(want)
        );
    }
    Ok(closable)
}

fn init_ro(pages: &PageTable) -> Result<bool> {
    let hdr = HeaderRef::load(pages)?;
    if endian::load(hdr.magic) != endian::magic_value(MAGIC) {
        return Err(YamalError::InvalidFormat(format!(
            "{} is not a yamal file (bad magic number)",
            pages.label()
        )));
    }
    Ok(endian::load(hdr.closable) == CLOSABLE_YES)
}

/// Offset of the node to start a tail walk from for `list`.
pub(crate) fn tail_hint(head: &NodeRef<'_>) -> u64 {
    let h = head.tail_hint();
    if h < HDR_OFF_LISTS {
        head.offset()
    } else {
        h
    }
}
