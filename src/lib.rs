// Базовые модули
pub mod consts;
pub mod error;
pub mod endian;
pub mod metrics;
pub mod config;

// Модульная раскладка (папки с mod.rs)
pub mod mmap;   // src/mmap/{mod,pages}.rs
pub mod yamal;  // src/yamal/{mod,core,open,layout,reserve,commit,iter,close,background}.rs

// Удобные реэкспорты
pub use config::{
    aux_thread_affinity, clear_aux_thread_affinity, set_aux_thread_affinity, YamalBuilder,
    YamalConfig,
};
pub use consts::{LIST_ANNS, LIST_COUNT, LIST_DATA, LIST_INDX, LIST_SUBS};
pub use error::{Result, YamalError};
pub use yamal::{Iter, Message, Messages, Reservation, Sublist, Yamal};
