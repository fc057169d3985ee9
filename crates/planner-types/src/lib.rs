pub mod config;
pub mod events;
pub mod plan;
pub mod state;

pub use config::{GraphConfig, RunConfig, DEFAULT_MODEL};
pub use events::{agent_message_id, RunStatus, StreamEvent};
pub use plan::{BusinessOverview, CompetitorInsight, MarketingPlan, SuggestedAdCreative};
pub use state::{PlanReview, PlannerInput, PlannerState, ResearchProgress};
