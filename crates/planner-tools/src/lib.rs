pub mod executor;
pub mod memory;
pub mod search;
pub mod tool;
pub mod web;

pub use executor::{research_tools, ToolExecutor};
pub use memory::{ManageMemory, MemoryConfig, MemoryItem, MemoryStore, ScoredMemory, SearchMemory};
pub use search::Search;
pub use tool::{Tool, ToolContext};
pub use web::{AnalyzeWebsite, ScrapeWebsite, WebFetcher};

/// Tool names the model sees
pub mod names {
    pub const SEARCH: &str = "Search";
    pub const SCRAPE_WEBSITE: &str = "ScrapeWebsite";
    pub const ANALYZE_WEBSITE: &str = "AnalyzeWebsite";
    pub const MANAGE_MEMORY: &str = "ManageMemory";
    pub const SEARCH_MEMORY: &str = "SearchMemory";

    pub const MEMORY_TOOLS: [&str; 2] = [MANAGE_MEMORY, SEARCH_MEMORY];

    pub fn is_memory_tool(name: &str) -> bool {
        MEMORY_TOOLS.contains(&name)
    }
}
