//! endian: кодек порядка байт на границе mmap.
//!
//! Every multi-byte field of the file is little-endian. Values are converted
//! here, right where they cross into or out of mapped memory, so the rest of
//! the crate works with host integers only.

use byteorder::{ByteOrder, LittleEndian};
use std::sync::atomic::{AtomicU64, Ordering};

#[inline]
pub fn to_disk(v: u64) -> u64 {
    v.to_le()
}

#[inline]
pub fn from_disk(v: u64) -> u64 {
    u64::from_le(v)
}

/// Host value of the 8-byte magic tag so that its stored bytes read "YAMAL001".
#[inline]
pub fn magic_value(tag: &[u8; 8]) -> u64 {
    LittleEndian::read_u64(tag)
}

#[inline]
pub fn load(a: &AtomicU64) -> u64 {
    from_disk(a.load(Ordering::Acquire))
}

#[inline]
pub fn store(a: &AtomicU64, v: u64) {
    a.store(to_disk(v), Ordering::Release);
}

#[inline]
pub fn store_relaxed(a: &AtomicU64, v: u64) {
    a.store(to_disk(v), Ordering::Relaxed);
}

/// Compare-and-swap on host values. `Err` carries the observed value.
#[inline]
pub fn cas(a: &AtomicU64, current: u64, new: u64) -> Result<u64, u64> {
    a.compare_exchange(
        to_disk(current),
        to_disk(new),
        Ordering::AcqRel,
        Ordering::Acquire,
    )
    .map(from_disk)
    .map_err(from_disk)
}

/// Set `a` to `v` if it is still zero; true when `a` now holds `v`
/// (either set here or already equal).
#[inline]
pub fn expect_or_init(a: &AtomicU64, v: u64) -> bool {
    match cas(a, 0, v) {
        Ok(_) => true,
        Err(actual) => actual == v,
    }
}

/// Atomic add returning the previous host value.
#[cfg(target_endian = "little")]
#[inline]
pub fn fetch_add(a: &AtomicU64, delta: u64) -> u64 {
    a.fetch_add(delta, Ordering::AcqRel)
}

#[cfg(not(target_endian = "little"))]
#[inline]
pub fn fetch_add(a: &AtomicU64, delta: u64) -> u64 {
    let mut expected = load(a);
    loop {
        match cas(a, expected, expected + delta) {
            Ok(prev) => return prev,
            Err(actual) => expected = actual,
        }
    }
}
