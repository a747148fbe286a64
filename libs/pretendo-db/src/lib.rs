//! The database facade: store + persistence adapter + relationship expander
//! behind one API, plus a per-resource [`ResourceHandle`] view.

pub mod database;
pub mod handle;

pub use database::Database;
pub use handle::ResourceHandle;
