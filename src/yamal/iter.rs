//! yamal/iter: итераторы, чтение, seek/tell.
//!
//! `Iter`: непрозрачная позиция: файловое смещение поля `next` некоторого узла
//! (или головы списка). Память по нему берётся только в момент использования.
//! Позиция терминальна, когда значение в ней меньше размера заголовка:
//! `0` (дальше пока ничего нет) или маркер закрытия списка.

use crate::consts::{list_head_offset, HDR_SIZE, NODE_OFF_NEXT};
use crate::error::{Result, YamalError};

use super::commit::Tail;
use super::core::Yamal;
use super::layout::{check_list, head_list, NodeRef};

/// Position in a list. `Copy`, stable across handles of the same file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Iter(u64);

impl Iter {
    #[inline]
    pub(crate) fn at(pos: u64) -> Self {
        Iter(pos)
    }

    /// File offset of the `next` field this position names.
    #[inline]
    pub fn position(&self) -> u64 {
        self.0
    }
}

/// One committed message, borrowed straight from the mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Message<'a> {
    pub seqno: u64,
    pub data: &'a [u8],
}

impl Message<'_> {
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Yamal {
    pub fn begin(&self, list: usize) -> Result<Iter> {
        check_list(list)?;
        Ok(Iter(list_head_offset(list) + NODE_OFF_NEXT))
    }

    /// Position after the last committed message (or at the closed marker).
    pub fn end(&self, list: usize) -> Result<Iter> {
        let tail = match self.find_tail(list)? {
            Tail::Open(t) | Tail::Closed(t) => t,
        };
        Ok(Iter(tail.offset() + NODE_OFF_NEXT))
    }

    /// True when nothing (yet) follows `it`.
    pub fn term(&self, it: Iter) -> Result<bool> {
        Ok(self.owner(it)?.next() < HDR_SIZE)
    }

    pub fn next(&self, it: Iter) -> Result<Iter> {
        let target = self.target(it)?;
        Ok(Iter(target + NODE_OFF_NEXT))
    }

    /// Step back. The position of a list head has nothing before it and is
    /// returned unchanged.
    pub fn prev(&self, it: Iter) -> Result<Iter> {
        let owner = self.owner(it)?;
        if head_list(owner.offset()).is_some() {
            return Ok(it);
        }
        Ok(Iter(owner.list_prev() + NODE_OFF_NEXT))
    }

    /// Message following `it`.
    pub fn read(&self, it: Iter) -> Result<Message<'_>> {
        let node = self.node(self.target(it)?)?;
        let size = node.size();
        let p = self
            .shared
            .pages
            .get_mapped_memory(node.payload_offset(), size)?;
        // Опубликованный узел неизменяем.
        let data = unsafe { std::slice::from_raw_parts(p as *const u8, size as usize) };
        Ok(Message {
            seqno: node.seqno(),
            data,
        })
    }

    /// Persistable offset for `it`: the list head or the committed node owning it.
    pub fn tell(&self, it: Iter) -> Result<u64> {
        let owner = self.owner(it)?;
        if head_list(owner.offset()).is_none() {
            self.check_committed(owner.offset())?;
        }
        Ok(owner.offset())
    }

    /// Inverse of [`tell`](Yamal::tell).
    pub fn seek(&self, offset: u64) -> Result<Iter> {
        if head_list(offset).is_none() {
            self.check_committed(offset)?;
        }
        Ok(Iter(offset + NODE_OFF_NEXT))
    }

    /// Committed messages of `list`, from the beginning.
    pub fn messages(&self, list: usize) -> Result<Messages<'_>> {
        Ok(self.messages_from(self.begin(list)?))
    }

    /// Committed messages following `it`. Returns `None` at the current end;
    /// calling `next()` again later picks up messages committed meanwhile.
    pub fn messages_from(&self, it: Iter) -> Messages<'_> {
        Messages {
            yamal: self,
            it,
            failed: false,
        }
    }

    fn owner(&self, it: Iter) -> Result<NodeRef<'_>> {
        let off = it
            .0
            .checked_sub(NODE_OFF_NEXT)
            .ok_or_else(|| YamalError::invalid(format!("{} is not a valid iterator", it.0)))?;
        self.node(off)
    }

    fn target(&self, it: Iter) -> Result<u64> {
        let target = self.owner(it)?.next();
        if target < HDR_SIZE {
            return Err(YamalError::invalid("iterator is at the end of its list"));
        }
        Ok(target)
    }

    fn check_committed(&self, off: u64) -> Result<()> {
        let not_committed =
            || YamalError::invalid(format!("{} is not the offset of a committed node", off));

        let reserved = self.reserved_size()?;
        if off % 8 != 0 || off < HDR_SIZE || off >= reserved {
            return Err(not_committed());
        }
        let node = self.node(off).map_err(|_| not_committed())?;
        let prev = node.list_prev();
        if prev % 8 != 0 || prev >= reserved || prev < list_head_offset(0) {
            return Err(not_committed());
        }
        let prev = self.node(prev).map_err(|_| not_committed())?;
        if prev.next() != off {
            return Err(not_committed());
        }
        Ok(())
    }
}

/// `Iterator` adapter over a list, see [`Yamal::messages`].
pub struct Messages<'a> {
    yamal: &'a Yamal,
    it: Iter,
    failed: bool,
}

impl<'a> Messages<'a> {
    /// Position of the next message to be returned.
    pub fn position(&self) -> Iter {
        self.it
    }

    fn step(yamal: &'a Yamal, it: Iter) -> Result<Option<(Message<'a>, Iter)>> {
        if yamal.term(it)? {
            return Ok(None);
        }
        let msg = yamal.read(it)?;
        let next = yamal.next(it)?;
        Ok(Some((msg, next)))
    }
}

impl<'a> Iterator for Messages<'a> {
    type Item = Result<Message<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match Self::step(self.yamal, self.it) {
            Ok(Some((msg, next))) => {
                self.it = next;
                Some(Ok(msg))
            }
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
