//! Общие константы формата yamal (header, lists, nodes, pages).

// -------- Magic --------
pub const MAGIC: &[u8; 8] = b"YAMAL001";

// -------- Pages --------
/// Размер страницы отображения (и единица роста файла).
pub const PAGE_SIZE: u64 = 8 * 1024 * 1024;
/// Максимальное число страниц в таблице отображений (512 GiB файла).
pub const PAGE_COUNT_MAX: usize = 64 * 1024;
/// Окно предаллокации вспомогательного потока по умолчанию.
pub const PREALLOC_SIZE: u64 = 3 * 1024 * 1024;
/// Период пробуждения вспомогательного потока по умолчанию (мс).
pub const AUX_PERIOD_MS: u64 = 10;

// -------- Lists --------
pub const LIST_COUNT: usize = 4;
pub const LIST_DATA: usize = 0;
pub const LIST_ANNS: usize = 1;
pub const LIST_SUBS: usize = 2;
pub const LIST_INDX: usize = 3;

// -------- Node --------
// Layout (LE):
// [prev u64]   -- anchor (reservation) / list predecessor (after commit)
// [next u64]   -- 0 = not linked; closed sentinel = offset of the list head
// [seqno u64]
// [size u64]   -- payload length
// [data ...]   -- word aligned total footprint
pub const NODE_OFF_PREV: u64 = 0;
pub const NODE_OFF_NEXT: u64 = 8;
pub const NODE_OFF_SEQNO: u64 = 16;
pub const NODE_OFF_SIZE: u64 = 24;
pub const NODE_HDR_SIZE: u64 = 32;

// -------- Header --------
// Layout (LE):
// [magic8="YAMAL001"][size u64][closable u64][lists: LIST_COUNT x node header]
pub const HDR_OFF_MAGIC: u64 = 0;
pub const HDR_OFF_SIZE: u64 = 8;
pub const HDR_OFF_CLOSABLE: u64 = 16;
pub const HDR_OFF_LISTS: u64 = 24;
pub const HDR_SIZE: u64 = HDR_OFF_LISTS + NODE_HDR_SIZE * LIST_COUNT as u64;

// Значения поля closable (0: ещё не инициализировано).
pub const CLOSABLE_UNSET: u64 = 0;
pub const CLOSABLE_NO: u64 = 1;
pub const CLOSABLE_YES: u64 = 2;

/// Offset of the head sentinel node of `list`. Doubles as the list's closed marker.
#[inline]
pub const fn list_head_offset(list: usize) -> u64 {
    HDR_OFF_LISTS + NODE_HDR_SIZE * list as u64
}

/// Round `n` up to the machine word (8 bytes).
#[inline]
pub const fn word_ceil(n: u64) -> u64 {
    (n + 7) & !7
}
