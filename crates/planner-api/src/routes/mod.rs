pub mod assistants;
pub mod health;
pub mod runs;
pub mod threads;
