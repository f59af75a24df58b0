//! yamal/reserve: выделение места под новый узел.
//!
//! Единственный писатель счётчика `size` в заголовке. Узел никогда не
//! пересекает границу страницы: если диапазон после fetch_add пересёк бы её,
//! хвост страницы бросается (остаётся дырой), а узел переезжает на начало
//! следующей страницы (или fetch_add повторяется при гонке).

use crate::consts::{word_ceil, NODE_HDR_SIZE, PAGE_SIZE};
use crate::endian;
use crate::error::{Result, YamalError};
use crate::metrics::record_reservation;

use super::core::Yamal;

/// A reserved, not yet committed node. Owned by the reserving caller until it
/// is handed to [`Yamal::commit`] or [`Yamal::sublist_commit`].
///
/// Committing consumes the reservation, so a node cannot be linked twice:
///
/// ```compile_fail
/// # fn twice(y: &yamal::Yamal) -> yamal::Result<()> {
/// let r = y.reserve(8)?;
/// y.commit(r, yamal::LIST_DATA)?;
/// y.commit(r, yamal::LIST_DATA)?;
/// # Ok(())
/// # }
/// ```
pub struct Reservation<'a> {
    off: u64,
    owner: u64,
    data: &'a mut [u8],
}

impl Reservation<'_> {
    /// File offset of the node.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.off
    }

    /// Id of the handle that made this reservation.
    #[inline]
    pub(crate) fn owner(&self) -> u64 {
        self.owner
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &*self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut *self.data
    }
}

impl std::fmt::Debug for Reservation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reservation")
            .field("offset", &self.off)
            .field("len", &self.data.len())
            .finish()
    }
}

impl Yamal {
    /// Claim space for a `size`-byte message. The payload comes back zeroed.
    pub fn reserve(&self, size: usize) -> Result<Reservation<'_>> {
        self.check_writable("reserve")?;
        if size == 0 {
            return Err(YamalError::invalid("cannot reserve an empty message"));
        }
        // Граница проверяется до любой арифметики над size.
        if size as u64 > PAGE_SIZE - NODE_HDR_SIZE {
            return Err(YamalError::invalid(format!(
                "message of {} bytes does not fit in a {} byte page",
                size, PAGE_SIZE
            )));
        }
        let node_size = word_ceil(NODE_HDR_SIZE + size as u64);

        let hdr = self.header()?;
        let mut skips = 0u64;
        let off = loop {
            let old = endian::fetch_add(hdr.size, node_size);
            let in_page = old % PAGE_SIZE;
            if in_page + node_size <= PAGE_SIZE {
                break old;
            }
            skips += 1;
            // [old, old + node_size) наш и заходит на следующую страницу: пробуем
            // сдвинуть его целиком на её начало. Не вышло (кто-то уже занял дальше): повтор.
            let page_end = old - in_page + PAGE_SIZE;
            if endian::cas(hdr.size, old + node_size, page_end + node_size).is_ok() {
                break page_end;
            }
        };

        let node = self.node(off)?;
        let p = self
            .shared
            .pages
            .get_mapped_memory(node.payload_offset(), size as u64)?;
        // Диапазон [off, off + node_size) принадлежит только этому вызову.
        let data = unsafe { std::slice::from_raw_parts_mut(p, size) };
        data.fill(0);

        node.set_next_private(0);
        node.set_seqno(0);
        node.set_size(size as u64);
        node.set_anchor(off);

        record_reservation(node_size, skips);
        Ok(Reservation {
            off,
            owner: self.id,
            data,
        })
    }
}
