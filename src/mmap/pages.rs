//! mmap/pages: таблица отображённых страниц.
//!
//! Правила:
//! - Быстрый путь `page()`: без блокировок (OnceLock::get).
//! - Новое отображение создаётся только под `pa_mutex` (double-checked locking).
//! - Writer: файл растёт через posix_fallocate (fs2::FileExt::allocate) ДО отображения.
//! - Reader: длина файла должна уже покрывать страницу, иначе UnexpectedEof.
//! - Массовая аллокация идёт от последней страницы к первой, чтобы прерванный
//!   вызов не оставлял дыр в середине файла.

use std::fs::File;
use std::sync::{Mutex, OnceLock};

use fs2::FileExt;
use log::debug;
use memmap2::{MmapOptions, MmapRaw};

use crate::consts::{PAGE_COUNT_MAX, PAGE_SIZE};
use crate::error::{Result, YamalError};
use crate::metrics::record_page_mapped;

pub struct PageTable {
    file: File,
    label: String,
    readonly: bool,
    pages: Box<[OnceLock<MmapRaw>]>,
    pa_mutex: Mutex<()>,
}

impl PageTable {
    /// `label` is only used in error contexts and log lines (usually the path).
    pub fn new(file: File, readonly: bool, label: impl Into<String>) -> Self {
        let pages = (0..PAGE_COUNT_MAX)
            .map(|_| OnceLock::new())
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            file,
            label: label.into(),
            readonly,
            pages,
            pa_mutex: Mutex::new(()),
        }
    }

    #[inline]
    pub fn readonly(&self) -> bool {
        self.readonly
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current length of the backing file.
    pub fn file_len(&self) -> Result<u64> {
        self.file
            .metadata()
            .map(|m| m.len())
            .map_err(|e| YamalError::io(format!("stat {}", self.label), e))
    }

    /// Pointer to `len` bytes at file `offset`, mapping the page on first touch.
    /// The range must not cross a page boundary.
    pub fn get_mapped_memory(&self, offset: u64, len: u64) -> Result<*mut u8> {
        let in_page = offset % PAGE_SIZE;
        // len может прийти из повреждённого файла: без переполнений.
        if in_page.checked_add(len).map_or(true, |end| end > PAGE_SIZE) {
            return Err(YamalError::invalid(format!(
                "range of {} bytes at {} crosses a page boundary",
                len, offset
            )));
        }
        let page = self.page((offset / PAGE_SIZE) as usize)?;
        // in_page + len <= PAGE_SIZE == page.len()
        Ok(unsafe { page.as_mut_ptr().add(in_page as usize) })
    }

    #[inline]
    pub fn is_mapped(&self, index: usize) -> bool {
        self.pages.get(index).map_or(false, |s| s.get().is_some())
    }

    /// Number of pages currently mapped by this table.
    pub fn mapped_pages(&self) -> usize {
        self.pages.iter().filter(|s| s.get().is_some()).count()
    }

    /// Make sure page `index` is mapped. Idempotent.
    pub fn allocate_page(&self, index: usize) -> Result<()> {
        self.page(index).map(|_| ())
    }

    /// Map every page in `[first, last]`, last to first.
    pub fn allocate_pages(&self, first: usize, last: usize) -> Result<()> {
        if first > last {
            return Err(YamalError::invalid(format!(
                "page range {}..={} is empty",
                first, last
            )));
        }
        for index in (first..=last).rev() {
            self.allocate_page(index)?;
        }
        Ok(())
    }

    /// Map every page covering `[0, total_size)`.
    pub fn allocate(&self, total_size: u64) -> Result<()> {
        if total_size == 0 {
            return Ok(());
        }
        let last = ((total_size - 1) / PAGE_SIZE) as usize;
        self.allocate_pages(0, last)
    }

    /// Map the page holding `reserved + window` and every unmapped page between
    /// the last mapped one and it. Returns how many pages were newly mapped.
    pub fn prealloc_ahead(&self, reserved: u64, window: u64) -> Result<u64> {
        let target = (reserved.saturating_add(window) / PAGE_SIZE) as usize;
        let target = target.min(PAGE_COUNT_MAX - 1);
        if self.is_mapped(target) {
            return Ok(0);
        }
        let mut first = target;
        while first > 0 && !self.is_mapped(first - 1) {
            first -= 1;
        }
        let mut fresh = 0;
        for index in (first..=target).rev() {
            if !self.is_mapped(index) {
                self.allocate_page(index)?;
                fresh += 1;
            }
        }
        Ok(fresh)
    }

    /// Kick off write-back (MS_ASYNC) of every mapped page. Does not wait for
    /// durability. Returns the number of pages flushed.
    pub fn sync(&self) -> Result<usize> {
        if self.readonly {
            return Ok(0);
        }
        let mut flushed = 0;
        for (index, slot) in self.pages.iter().enumerate() {
            if let Some(m) = slot.get() {
                m.flush_async().map_err(|e| {
                    YamalError::io(format!("msync page {} of {}", index, self.label), e)
                })?;
                flushed += 1;
            }
        }
        Ok(flushed)
    }

    fn page(&self, index: usize) -> Result<&MmapRaw> {
        let slot = self.pages.get(index).ok_or_else(|| {
            YamalError::invalid(format!(
                "page index {} is out of range (max {})",
                index,
                PAGE_COUNT_MAX - 1
            ))
        })?;
        if let Some(m) = slot.get() {
            return Ok(m);
        }

        let _guard = self
            .pa_mutex
            .lock()
            .map_err(|_| YamalError::Poisoned("page allocation lock"))?;
        if let Some(m) = slot.get() {
            return Ok(m);
        }
        let mmap = self.map_page(index)?;
        Ok(slot.get_or_init(|| mmap))
    }

    // Called with pa_mutex held.
    fn map_page(&self, index: usize) -> Result<MmapRaw> {
        let start = index as u64 * PAGE_SIZE;
        let end = start + PAGE_SIZE;

        let mut opts = MmapOptions::new();
        opts.offset(start).len(PAGE_SIZE as usize);

        let mmap = if self.readonly {
            let file_len = self.file_len()?;
            if file_len < end {
                return Err(YamalError::UnexpectedEof {
                    page: index,
                    file_len,
                });
            }
            opts.map_raw_read_only(&self.file)
        } else {
            // posix_fallocate никогда не укорачивает файл.
            self.file.allocate(end).map_err(|e| {
                YamalError::io(format!("fallocate {} to {} bytes", self.label, end), e)
            })?;
            opts.map_raw(&self.file)
        }
        .map_err(|e| YamalError::io(format!("mmap page {} of {}", index, self.label), e))?;

        debug!(
            "mapped page {} of {} ({})",
            index,
            self.label,
            if self.readonly { "ro" } else { "rw" }
        );
        record_page_mapped();
        Ok(mmap)
    }
}
