//! yamal: lock-free multi-writer append log over a memory-mapped file.
//!
//! Разделение по подмодулям:
//! - core.rs: Yamal, инициализация заголовка, размеры, eager-аллокация, Drop
//! - open.rs: open/open_ro (+ _with_config)
//! - layout.rs: типизированные представления заголовка и узлов (HeaderRef/NodeRef)
//! - reserve.rs: reserve() и Reservation
//! - commit.rs: commit/sublist_commit/sublist_finalize, обход до хвоста
//! - iter.rs: begin/end/next/prev/term/read/seek/tell, Messages
//! - close.rs: close/closed
//! - background.rs: фоновый поток предаллокации и sync
//!
//! Typical use:
//!
//! ```no_run
//! use yamal::{Yamal, LIST_DATA};
//!
//! # fn main() -> yamal::Result<()> {
//! let y = Yamal::open("/tmp/log.ytp")?;
//! let mut r = y.reserve(5)?;
//! r.data_mut().copy_from_slice(b"hello");
//! y.commit(r, LIST_DATA)?;
//!
//! for msg in y.messages(LIST_DATA)? {
//!     let msg = msg?;
//!     println!("{} {:?}", msg.seqno, msg.data);
//! }
//! # Ok(())
//! # }
//! ```

mod background;
pub mod close;
pub mod commit;
pub mod core;
pub mod iter;
mod layout;
pub mod open;
pub mod reserve;

pub use commit::Sublist;
pub use core::Yamal;
pub use iter::{Iter, Message, Messages};
pub use reserve::Reservation;
