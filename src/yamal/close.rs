//! yamal/close: необратимое закрытие списка.
//!
//! Маркер закрытия списка L: смещение его головы. Он записывается CAS'ом в
//! `next` настоящего хвоста, после чего любой commit в L получает `Closed`.

use log::debug;

use crate::consts::list_head_offset;
use crate::error::{Result, YamalError};
use crate::metrics::record_list_closed;

use super::commit::Tail;
use super::core::{tail_hint, Yamal};
use super::layout::check_list;

impl Yamal {
    /// Close `list` for good. Closing an already closed list is a no-op.
    pub fn close(&self, list: usize) -> Result<()> {
        self.check_writable("close")?;
        if !self.closable() {
            return Err(YamalError::invalid(format!(
                "{} was created unclosable; lists cannot be closed",
                self.label()
            )));
        }
        check_list(list)?;

        let marker = list_head_offset(list);
        let mut from = tail_hint(&self.node(marker)?);
        loop {
            match self.walk_tail(list, from)? {
                Tail::Closed(_) => return Ok(()),
                Tail::Open(tail) => {
                    if tail.cas_next(0, marker).is_ok() {
                        debug!("closed list {} of {}", list, self.label());
                        record_list_closed();
                        return Ok(());
                    }
                    from = tail.offset();
                }
            }
        }
    }

    pub fn closed(&self, list: usize) -> Result<bool> {
        Ok(matches!(self.find_tail(list)?, Tail::Closed(_)))
    }
}
