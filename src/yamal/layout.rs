//! yamal/layout: типизированные представления заголовка и узлов поверх mmap.
//!
//! Все поля: `AtomicU64` в little-endian (см. crate::endian). Представления
//! заимствуют PageTable: страницы не снимаются с отображения, пока жива таблица.
//!
//! Поле узла по смещению 0 имеет две роли:
//! - до commit: `anchor`: смещение самого узла (или предыдущего звена sublist);
//! - после commit: `list_prev`: смещение предшественника в списке.

use std::sync::atomic::AtomicU64;

use crate::consts::{
    list_head_offset, HDR_OFF_CLOSABLE, HDR_OFF_LISTS, HDR_OFF_MAGIC, HDR_OFF_SIZE, HDR_SIZE,
    LIST_COUNT, NODE_HDR_SIZE, NODE_OFF_NEXT, NODE_OFF_PREV, NODE_OFF_SEQNO, NODE_OFF_SIZE,
};
use crate::endian;
use crate::error::{Result, YamalError};
use crate::mmap::PageTable;

#[inline]
fn word(pages: &PageTable, offset: u64) -> Result<&AtomicU64> {
    debug_assert_eq!(offset % 8, 0);
    let p = pages.get_mapped_memory(offset, 8)?;
    // Смещение выровнено на 8, страница выровнена системой.
    Ok(unsafe { &*(p as *const AtomicU64) })
}

/// Fixed header at offset 0.
#[derive(Clone, Copy)]
pub(crate) struct HeaderRef<'a> {
    pub magic: &'a AtomicU64,
    pub size: &'a AtomicU64,
    pub closable: &'a AtomicU64,
}

impl<'a> HeaderRef<'a> {
    pub fn load(pages: &'a PageTable) -> Result<Self> {
        Ok(Self {
            magic: word(pages, HDR_OFF_MAGIC)?,
            size: word(pages, HDR_OFF_SIZE)?,
            closable: word(pages, HDR_OFF_CLOSABLE)?,
        })
    }

    #[inline]
    pub fn reserved(&self) -> u64 {
        endian::load(self.size)
    }
}

/// Header fields of one node (list heads included).
#[derive(Clone, Copy)]
pub(crate) struct NodeRef<'a> {
    off: u64,
    words: &'a [AtomicU64; 4],
}

impl<'a> NodeRef<'a> {
    pub fn load(pages: &'a PageTable, off: u64) -> Result<Self> {
        if off % 8 != 0 || off < HDR_OFF_LISTS {
            return Err(YamalError::invalid(format!(
                "{} is not a valid node offset",
                off
            )));
        }
        let p = pages.get_mapped_memory(off, NODE_HDR_SIZE)?;
        Ok(Self {
            off,
            words: unsafe { &*(p as *const [AtomicU64; 4]) },
        })
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.off
    }

    #[inline]
    fn field(&self, at: u64) -> &'a AtomicU64 {
        &self.words[(at / 8) as usize]
    }

    // ----- prev (anchor / list_prev) -----

    #[inline]
    pub fn anchor(&self) -> u64 {
        endian::load(self.field(NODE_OFF_PREV))
    }

    #[inline]
    pub fn set_anchor(&self, v: u64) {
        endian::store(self.field(NODE_OFF_PREV), v)
    }

    #[inline]
    pub fn list_prev(&self) -> u64 {
        endian::load(self.field(NODE_OFF_PREV))
    }

    #[inline]
    pub fn set_list_prev(&self, v: u64) {
        endian::store(self.field(NODE_OFF_PREV), v)
    }

    // У головы списка то же слово хранит подсказку хвоста.

    #[inline]
    pub fn tail_hint(&self) -> u64 {
        endian::load(self.field(NODE_OFF_PREV))
    }

    #[inline]
    pub fn set_tail_hint(&self, v: u64) {
        endian::store(self.field(NODE_OFF_PREV), v)
    }

    /// Point an uninitialised head at itself.
    #[inline]
    pub fn init_tail_hint(&self) {
        let _ = endian::cas(self.field(NODE_OFF_PREV), 0, self.off);
    }

    // ----- next -----

    #[inline]
    pub fn next_field(&self) -> &'a AtomicU64 {
        self.field(NODE_OFF_NEXT)
    }

    #[inline]
    pub fn next(&self) -> u64 {
        endian::load(self.next_field())
    }

    /// Private chain link. Only valid while the node is not yet published.
    #[inline]
    pub fn set_next_private(&self, v: u64) {
        endian::store_relaxed(self.next_field(), v)
    }

    #[inline]
    pub fn cas_next(&self, current: u64, new: u64) -> std::result::Result<u64, u64> {
        endian::cas(self.next_field(), current, new)
    }

    // ----- seqno / size -----

    #[inline]
    pub fn seqno(&self) -> u64 {
        endian::load(self.field(NODE_OFF_SEQNO))
    }

    #[inline]
    pub fn set_seqno(&self, v: u64) {
        endian::store_relaxed(self.field(NODE_OFF_SEQNO), v)
    }

    #[inline]
    pub fn size(&self) -> u64 {
        endian::load(self.field(NODE_OFF_SIZE))
    }

    #[inline]
    pub fn set_size(&self, v: u64) {
        endian::store_relaxed(self.field(NODE_OFF_SIZE), v)
    }

    #[inline]
    pub fn payload_offset(&self) -> u64 {
        self.off + NODE_HDR_SIZE
    }
}

/// Index of the list whose head sentinel sits at `off`, if any.
pub(crate) fn head_list(off: u64) -> Option<usize> {
    if off < HDR_OFF_LISTS || off >= HDR_SIZE {
        return None;
    }
    let rel = off - HDR_OFF_LISTS;
    if rel % NODE_HDR_SIZE != 0 {
        return None;
    }
    let list = (rel / NODE_HDR_SIZE) as usize;
    debug_assert!(list < LIST_COUNT);
    debug_assert_eq!(list_head_offset(list), off);
    Some(list)
}

pub(crate) fn check_list(list: usize) -> Result<()> {
    if list >= LIST_COUNT {
        return Err(YamalError::invalid(format!(
            "list index {} is out of range (max {})",
            list,
            LIST_COUNT - 1
        )));
    }
    Ok(())
}
