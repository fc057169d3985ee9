pub mod error;
pub mod memory;
pub mod models;
pub mod trait_client;

pub use error::{PersistError, Result};
pub use memory::{InMemoryPersistenceClient, DEFAULT_MAX_CHECKPOINTS};
pub use models::{Checkpoint, Thread, ThreadSearch, ThreadStatus};
pub use trait_client::PersistenceClient;
