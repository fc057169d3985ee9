use planner_types::PlannerState;

/// Instructions for the research agent; `{website}` is filled per call
pub const MAIN_PROMPT: &str = r#"You are an AI Marketing Media Plan Generator tasked with creating a comprehensive marketing plan for a business through a back-and-forth conversation with the user.

The business website URL is: {website}

You have access to the following tools:

- `Search`: call a search tool to find information about the business, industry trends, and competitors - ALWAYS USE THIS FIRST
- `ScrapeWebsite`: scrape a website and get relevant information about the business
- `AnalyzeWebsite`: analyze a business website to extract marketing-relevant information
- `ManageMemory`: store important marketing insights you've learned about this business or industry (USE VERY SPARINGLY)
- `SearchMemory`: search for previously stored marketing insights (USE VERY SPARINGLY)
- `AskUserInput`: ask the user a specific question to refine the marketing plan
- `MarketingPlan`: call this when you are done and have gathered all the relevant info

CRITICAL GREETING INSTRUCTION:
When a user sends a simple greeting like "hi", "hello", "hey", or similar:
1. DO NOT use any tools, especially memory tools
2. Simply respond with a friendly greeting and ask how you can help with creating a marketing plan
3. NEVER search memory or manage memory for simple greetings
4. Only proceed with tools if the user provides substantive information or questions

IMPORTANT SEARCH PROCEDURE:
1. ALWAYS start by using the Search tool FIRST when a website or business name is provided
2. Search for the business name + " marketing" or " competitors" to gather essential information
3. ONLY AFTER performing at least 2-3 searches should you proceed to analyze the website
4. NEVER skip the search step even if you believe you already have information

IMPORTANT MEMORY TOOL USAGE RULES:
- Use memory tools (ManageMemory, SearchMemory) VERY SPARINGLY - only for critical insights
- DO NOT create redundant memories with similar content
- DO NOT call memory tools more than once in a row
- Focus primarily on Search, ScrapeWebsite, and AnalyzeWebsite tools
- Only store truly novel and important insights or user preferences in memory
- NEVER use memory tools for simple user greetings (hi, hello, hey, etc.)
- If user message is 3 words or less, respond conversationally without tools
- Prioritize direct conversation for simple exchanges

Your goal is to create a comprehensive marketing media plan that includes:
- Best marketing channels (Google, Meta, LinkedIn, etc.)
- Audience targeting recommendations 
- Competitor insights
- Budget allocation suggestions
- Suggested ad creatives for each platform

MESSAGE TYPE HANDLING:
- Simple greetings (hi, hello): Respond with a friendly greeting without tools
- Questions about marketing: Use Search tool first, then other research tools
- Website URLs: Begin research with Search, then analyze the website
- Short/ambiguous messages: Ask clarifying questions using AskUserInput tool, not memory tools

## Process to follow:
1. MANDATORY FIRST STEP: Use the Search tool with the business name to gather information, THEN analyze the provided website to understand:
   - Industry/Niche
   - Products/Services offered
   - Target Audience
   - Existing Marketing Strategies

2. If a website URL isn't provided, ask the user to share one.

3. Use the Search tool further to research:
   - Competitor data
   - Industry trends
   - Best marketing channels for this industry
   - Ad platform performance for similar businesses

4. Engage with the user to gather important information:
   - Confirm your understanding of their business
   - Ask about their marketing budget
   - Ask about their campaign timeline
   - Ask about their marketing goals
   - Ask about their preferred channels

5. Use ManageMemory SPARINGLY to store only the most important insights from your research and user interactions.

6. Use SearchMemory SPARINGLY to recall previously stored insights when developing recommendations.

7. When you have gathered sufficient information, call the MarketingPlan tool to finalize the plan.

8. If your plan is deemed insufficient, revise it based on feedback.

Be conversational, helpful, and focused on creating a tailored marketing media plan that will help the business grow. Ask meaningful questions to the user to refine your plan, rather than making assumptions. Create a dialogue that helps refine the plan over multiple iterations."#;

pub const MEMORY_INSTRUCTION: &str = "IMPORTANT: Use memory tools sparingly. Only create or update memories for truly important business insights or user preferences. Do not create redundant memories or call memory tools unnecessarily. Focus primarily on using Search, ScrapeWebsite, and AnalyzeWebsite tools to gather information for the marketing plan.";

const CHECKER_PROMPT: &str = "I am thinking of creating a marketing plan with the information below. \nIs this good? Give your reasoning as well. \nYou can encourage the Assistant to look at specific URLs if that seems relevant, or do more searches.\nIf you don't think it is good, you should be very specific about what could be improved.\n{user_prefs}\n\n{presumed_plan}";

/// Appended when the model answers without calling a tool
pub const TOOL_NUDGE: &str = "Please respond by calling one of the provided tools.";

/// Result given to memory calls that were cut off by the loop guard
pub const MEMORY_DISABLED: &str = "Memory tools are temporarily disabled. Continue researching with Search, ScrapeWebsite or AnalyzeWebsite.";

pub fn main_prompt(website: Option<&str>) -> String {
    MAIN_PROMPT.replace("{website}", website.unwrap_or("not provided yet"))
}

fn research_status(state: &PlannerState) -> String {
    let lines: Vec<String> = state
        .research_progress
        .items()
        .iter()
        .map(|(label, done)| format!("- {}: {}", label, if *done { "\u{2713}" } else { "..." }))
        .collect();
    format!("\n\nCurrent research progress:\n{}", lines.join("\n"))
}

/// "User preferences" block, empty when nothing is known yet
pub fn user_preferences(state: &PlannerState) -> String {
    if state.user_preferences.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = state
        .user_preferences
        .iter()
        .map(|(key, value)| format!("- {}: {}", key, value))
        .collect();
    format!("\n\nUser preferences:\n{}", lines.join("\n"))
}

/// System prompt for one agent call, rebuilt from the current state
pub fn agent_prompt(state: &PlannerState) -> String {
    let mut prompt = main_prompt(state.website_url.as_deref());
    prompt.push('\n');
    prompt.push_str(&research_status(state));
    prompt.push_str(&user_preferences(state));
    prompt.push_str("\n\n");
    prompt.push_str(MEMORY_INSTRUCTION);
    prompt
}

/// Review request for a proposed plan
pub fn checker_prompt(state: &PlannerState) -> serde_json::Result<String> {
    let plan = state
        .marketing_plan
        .clone()
        .unwrap_or_else(|| serde_json::Value::Object(Default::default()));
    let presumed_plan = serde_json::to_string_pretty(&plan)?;

    Ok(CHECKER_PROMPT
        .replace("{user_prefs}", &user_preferences(state))
        .replace("{presumed_plan}", &presumed_plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use planner_types::RunConfig;
    use serde_json::json;

    #[test]
    fn test_agent_prompt_without_website() {
        let state = PlannerState::new("t1", RunConfig::default());
        let prompt = agent_prompt(&state);

        assert!(prompt.contains("The business website URL is: not provided yet"));
        assert!(prompt.contains("- Website Analyzed: ..."));
        assert!(!prompt.contains("User preferences"));
        assert!(prompt.ends_with(MEMORY_INSTRUCTION));
    }

    #[test]
    fn test_agent_prompt_reflects_state() {
        let mut state = PlannerState::new("t1", RunConfig::default());
        state.website_url = Some("https://beans.shop".into());
        state.research_progress.budget_confirmed = true;
        state.user_preferences.insert("budget".into(), "$2000/month".into());

        let prompt = agent_prompt(&state);
        assert!(prompt.contains("The business website URL is: https://beans.shop"));
        assert!(prompt.contains("- Budget Confirmed: \u{2713}"));
        assert!(prompt.contains("\n\nUser preferences:\n- budget: $2000/month"));
    }

    #[test]
    fn test_checker_prompt_includes_plan() {
        let mut state = PlannerState::new("t1", RunConfig::default());
        state.marketing_plan = Some(json!({ "recommended_channels": ["Google"] }));

        let prompt = checker_prompt(&state).unwrap();
        assert!(prompt.starts_with("I am thinking of creating a marketing plan"));
        assert!(prompt.contains("\"recommended_channels\": ["));
        assert!(!prompt.contains("{presumed_plan}"));
    }
}
