//! Tools answered by the graph itself rather than by the tool executor

use planner_llm::Tool;
use planner_types::MarketingPlan;
use serde::Deserialize;
use serde_json::json;

pub const MARKETING_PLAN: &str = "MarketingPlan";
pub const ASK_USER_INPUT: &str = "AskUserInput";
pub const PLAN_REVIEW: &str = "MarketingPlanIsSatisfactory";

pub fn marketing_plan_tool() -> Tool {
    Tool::new(
        MARKETING_PLAN,
        "Call this when you have gathered all the relevant info",
        MarketingPlan::json_schema(),
    )
}

pub fn ask_user_input_tool() -> Tool {
    Tool::new(
        ASK_USER_INPUT,
        "Call this when you need specific information from the user to improve the marketing plan",
        json!({
            "type": "object",
            "properties": {
                "question": { "type": "string", "description": "A specific question to ask the user" },
                "context": { "type": "string", "description": "The context or reason for asking this question" },
                "options": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Optional list of suggested response options"
                }
            },
            "required": ["question"]
        }),
    )
}

pub fn plan_review_tool() -> Tool {
    Tool::new(
        PLAN_REVIEW,
        "Validate whether the current marketing plan is satisfactory and complete.",
        json!({
            "type": "object",
            "properties": {
                "reason": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "First, provide reasoning for why this is either good or bad as a final marketing plan. Must include at least 3 reasons."
                },
                "is_satisfactory": {
                    "type": "boolean",
                    "description": "After providing your reasoning, provide a value indicating whether the marketing plan is satisfactory. If not, you will continue researching."
                },
                "improvement_instructions": {
                    "type": "string",
                    "description": "If the plan is not satisfactory, provide clear and specific instructions on what needs to be improved or added."
                }
            },
            "required": ["reason", "is_satisfactory"]
        }),
    )
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AskUserInputArgs {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanVerdict {
    #[serde(default)]
    pub reason: Vec<String>,
    pub is_satisfactory: bool,
    #[serde(default)]
    pub improvement_instructions: Option<String>,
}
