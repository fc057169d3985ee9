use std::io::{self, Write};

use anyhow::Result;
use planner_api::{
    bootstrap::{build_graph, build_persistence, init_logging},
    Config,
};
use planner_graph::{PersistenceContext, PlannerInput, RunStatus, StreamEvent};
use planner_llm::Message;
use planner_persist::PersistenceClient;
use planner_types::{MarketingPlan, PlannerState};

/// Tool results longer than this are cut in the transcript
const RESULT_PREVIEW_CHARS: usize = 120;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let mut config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    // Keep the terminal for the conversation unless RUST_LOG asks otherwise
    config.logging.level = "warn".to_string();
    init_logging(&config);

    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║            Marketing Media Planner - Terminal              ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();
    println!("Share your business website and goals; the planner researches,");
    println!("asks follow-up questions and proposes a marketing media plan.");
    println!("Model: {}", config.planner.model);
    println!();
    println!("Type 'exit' to quit");

    let persist = build_persistence(&config);
    let graph = build_graph(&config, persist.clone())?;
    let thread = persist.create_thread(None, Default::default()).await?;
    let thread_id = thread.thread_id;

    loop {
        print!("\n\x1b[1;36m You: \x1b[0m");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            println!("\nGoodbye!");
            break;
        }

        let prior = persist.get_thread(&thread_id).await?.and_then(|t| t.values);
        let planner_input = PlannerInput::new(thread_id.clone(), vec![Message::human(input)])
            .with_prior_state(prior)
            .with_config(config.planner.run_config());

        let mut event_rx = graph.spawn_run(planner_input, Some(PersistenceContext::new(&thread_id)));

        print!("\n\x1b[1;32mPlanner:\x1b[0m ");
        io::stdout().flush()?;

        let mut final_state: Option<Box<PlannerState>> = None;
        let mut final_status = RunStatus::Error;

        while let Some(event) = event_rx.recv().await {
            match event {
                StreamEvent::Message { content } => {
                    print!("{}", content);
                    io::stdout().flush()?;
                }

                StreamEvent::ToolResult {
                    tool_name,
                    result,
                    is_error,
                    duration_ms,
                    ..
                } => {
                    if is_error {
                        print!("\n\x1b[1;31m✗ {} failed ({}ms): {}\x1b[0m", tool_name, duration_ms, result);
                    } else if tool_name != "AskUserInput" {
                        print!(
                            "\n\x1b[1;33m→ {} ({}ms): {}\x1b[0m",
                            tool_name,
                            duration_ms,
                            preview(&result)
                        );
                    }
                    io::stdout().flush()?;
                }

                StreamEvent::AwaitingInput { question, options, .. } => {
                    print!("\n\x1b[1;35m? {}\x1b[0m", question);
                    for option in options {
                        print!("\n    - {}", option);
                    }
                }

                StreamEvent::PlanReviewed {
                    is_satisfactory,
                    revision,
                    ..
                } => {
                    let verdict = if is_satisfactory { "accepted" } else { "needs work" };
                    print!("\n\x1b[2m[plan revision {} {}]\x1b[0m", revision, verdict);
                }

                StreamEvent::Values { state } => final_state = Some(state),

                StreamEvent::Error { message, .. } => {
                    print!("\n\n\x1b[1;31mError: {}\x1b[0m", message);
                }

                StreamEvent::EndStream {
                    status,
                    total_duration_ms,
                } => {
                    print!("\n\n\x1b[2m[{} in {}ms]\x1b[0m", status, total_duration_ms);
                    final_status = status;
                }

                _ => {}
            }
        }

        if let Some(state) = final_state.filter(|_| final_status == RunStatus::Success) {
            if let Some(plan) = state.marketing_plan.as_ref() {
                match MarketingPlan::from_value(plan) {
                    Ok(plan) => println!("\n\n\x1b[1mMarketing plan\x1b[0m\n{}", plan.summary()),
                    Err(e) => tracing::warn!(error = %e, "plan did not match the expected shape"),
                }
            }
        }

        println!();
    }

    Ok(())
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(RESULT_PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
