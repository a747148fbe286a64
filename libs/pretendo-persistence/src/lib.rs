//! Pluggable storage backends for collection snapshots: the [`Adapter`]
//! trait, an in-memory no-op, a JSON-file-backed adapter, and an autosave
//! helper.

pub mod adapter;
pub mod autosave;
pub mod file_json;
pub mod memory;

pub use adapter::{Adapter, AdapterStats, Snapshot};
pub use file_json::FileJsonAdapter;
pub use memory::MemoryAdapter;
