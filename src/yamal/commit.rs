//! yamal/commit: публикация узлов в список (CAS на `next` хвоста).
//!
//! Алгоритм:
//! 1) стартуем с подсказки хвоста (prev головы списка) и идём по `next` до узла
//!    с `next == 0`; встретили маркер закрытия: `Closed`;
//! 2) `list_prev` первого узла цепочки = найденный хвост, seqno проставляются
//!    подряд от `tail.seqno + 1` по всей приватной цепочке;
//! 3) CAS `tail.next: 0 -> first`; проигрыш гонки: повтор с шага 1 от того же хвоста;
//! 4) подсказка хвоста = последний узел цепочки.
//!
//! Подсказка может отставать (процесс убит между CAS и её записью): обход
//! всё равно доходит до настоящего хвоста.

use crate::consts::{list_head_offset, HDR_SIZE, NODE_OFF_NEXT};
use crate::error::{Result, YamalError};
use crate::metrics::record_commit;

use super::core::{tail_hint, Yamal};
use super::iter::Iter;
use super::layout::{check_list, NodeRef};
use super::reserve::Reservation;

/// Outcome of walking a list to its end.
pub(crate) enum Tail<'a> {
    /// Last node, `next == 0`.
    Open(NodeRef<'a>),
    /// Last node carries the list's closed marker.
    Closed(NodeRef<'a>),
}

/// A private chain of reserved nodes, published at once by
/// [`Yamal::sublist_finalize`].
#[derive(Debug, Default)]
pub struct Sublist {
    first: Option<u64>,
    last: u64,
    len: usize,
    owner: Option<u64>,
}

impl Sublist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes chained so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    /// Offset of the first chained node.
    pub fn first(&self) -> Option<u64> {
        self.first
    }

    /// Offset of the last chained node.
    pub fn last(&self) -> Option<u64> {
        self.first.map(|_| self.last)
    }
}

impl Yamal {
    /// Publish a reserved node at the tail of `list`.
    ///
    /// Returns the position whose [`read`](Yamal::read) yields the committed
    /// message. On `Closed` the node stays unlinked forever.
    pub fn commit(&self, r: Reservation<'_>, list: usize) -> Result<Iter> {
        self.check_writable("commit")?;
        self.check_owner(r.owner())?;
        let off = r.offset();
        self.publish(list, off, off)
    }

    /// Append a reserved node to a private chain without touching any list.
    /// All nodes of a chain must come from this handle.
    pub fn sublist_commit(&self, sub: &mut Sublist, r: Reservation<'_>) -> Result<()> {
        self.check_writable("commit")?;
        self.check_owner(r.owner())?;
        if let Some(owner) = sub.owner {
            self.check_owner(owner)?;
        }
        let off = r.offset();
        let node = self.node(off)?;
        match sub.first {
            None => sub.first = Some(off),
            Some(_) => {
                let last = self.node(sub.last)?;
                last.set_next_private(off);
                node.set_anchor(sub.last);
            }
        }
        sub.last = off;
        sub.len += 1;
        sub.owner = Some(self.id);
        Ok(())
    }

    /// Publish a whole private chain with one CAS. Its nodes get consecutive seqnos.
    pub fn sublist_finalize(&self, sub: Sublist, list: usize) -> Result<Iter> {
        self.check_writable("commit")?;
        let (Some(first), Some(owner)) = (sub.first, sub.owner) else {
            return Err(YamalError::invalid("cannot finalize an empty sublist"));
        };
        self.check_owner(owner)?;
        self.publish(list, first, sub.last)
    }

    // Callers have checked writability and node ownership.
    fn publish(&self, list: usize, first: u64, last: u64) -> Result<Iter> {
        check_list(list)?;

        let head = self.node(list_head_offset(list))?;
        let first_node = self.node(first)?;
        let mut from = tail_hint(&head);
        let mut retries = 0u64;

        let tail = loop {
            let tail = match self.walk_tail(list, from)? {
                Tail::Open(t) => t,
                Tail::Closed(_) => return Err(YamalError::Closed { list }),
            };

            first_node.set_list_prev(tail.offset());
            let mut seqno = tail.seqno() + 1;
            let mut cur = first_node;
            loop {
                cur.set_seqno(seqno);
                if cur.offset() == last {
                    break;
                }
                seqno += 1;
                cur = self.node(cur.next())?;
            }

            match tail.cas_next(0, first) {
                Ok(_) => break tail,
                Err(_) => {
                    retries += 1;
                    from = tail.offset();
                }
            }
        };

        head.set_tail_hint(last);
        record_commit(retries);
        Ok(Iter::at(tail.offset() + NODE_OFF_NEXT))
    }

    /// Follow `next` from the node at `from` to the end of `list`.
    pub(crate) fn walk_tail(&self, list: usize, from: u64) -> Result<Tail<'_>> {
        let marker = list_head_offset(list);
        let mut node = self.node(from)?;
        loop {
            let next = node.next();
            if next == 0 {
                return Ok(Tail::Open(node));
            }
            if next == marker {
                return Ok(Tail::Closed(node));
            }
            if next < HDR_SIZE {
                return Err(YamalError::InvalidFormat(format!(
                    "node {} of list {} links into the header ({})",
                    node.offset(),
                    list,
                    next
                )));
            }
            node = self.node(next)?;
        }
    }

    /// Walk `list` from its tail hint.
    pub(crate) fn find_tail(&self, list: usize) -> Result<Tail<'_>> {
        check_list(list)?;
        let head = self.node(list_head_offset(list))?;
        self.walk_tail(list, tail_hint(&head))
    }
}
