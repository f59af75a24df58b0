//! mmap: постраничное отображение файла yamal в память.
//!
//! Подмодули:
//! - pages.rs: PageTable: ленивое отображение страниц, рост файла, prealloc и sync.
//!
//! Файл отображается страницами по `PAGE_SIZE` байт. Страница, однажды
//! отображённая, остаётся отображённой до уничтожения PageTable, поэтому
//! ссылки, выданные из неё, живут столько же, сколько сама таблица.

pub mod pages;

pub use pages::PageTable;
