//! Storage Adapter - 持久状态存储实现

mod file_storage;
mod memory_storage;

pub use file_storage::FileStateStorage;
pub use memory_storage::InMemoryStateStorage;
