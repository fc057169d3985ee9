mod store;
mod tools;

pub use store::{MemoryConfig, MemoryItem, MemoryStore, ScoredMemory};
pub use tools::{ManageMemory, SearchMemory};
