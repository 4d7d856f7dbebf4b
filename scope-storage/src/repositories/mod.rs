//! Repository implementations for detection records

pub mod memory;
pub mod record;

pub use memory::MemoryRecordStore;
pub use record::{RecordRow, RecordStore, SqliteRecordStore};
