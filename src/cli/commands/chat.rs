//! Interactive chat command with capability dispatch and artifact rendering.

use crate::artifact::{open_store, ArtifactReducer, ArtifactKind, ArtifactView};
use crate::capability::{standard_registry, InvocationOutcome, QuizPayload, StudyPlanPayload};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::error::Result;
use crate::orchestrator::{ChatMessage, Orchestrator, TurnEvent, TurnOptions};
use console::style;
use futures::StreamExt;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Run the interactive chat command.
pub async fn run_chat(
    model: Option<String>,
    no_capability: Vec<String>,
    owner: Option<String>,
    mut settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Chat, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'laer doctor' for detailed diagnostics.");
        return Err(e);
    }

    if let Some(model) = model {
        settings.chat.model = model;
    }

    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    let registry = Arc::new(standard_registry(&settings, &prompts)?);
    let store = open_store(&settings)?;
    let orchestrator = Arc::new(Orchestrator::new(
        &settings,
        prompts,
        registry,
        Some(store),
    ));

    let options = TurnOptions {
        exclude: no_capability.into_iter().collect(),
        owner,
    };
    let history_limit = settings.chat.history_limit;
    let mut history: Vec<ChatMessage> = Vec::new();

    println!("\n{}", style("Laer Chat").bold().cyan());
    println!(
        "{}\n",
        style("Ask anything, request a quiz or a study plan. 'exit' to quit, 'clear' to reset.")
            .dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            history.clear();
            Output::info("Conversation history cleared.");
            continue;
        }

        history.push(ChatMessage::user(input));

        let (reply, artifacts) =
            run_one_turn(orchestrator.clone(), history.clone(), options.clone()).await;

        if !reply.is_empty() {
            history.push(ChatMessage::assistant(reply));
        }
        trim_history(&mut history, history_limit);

        for view in &artifacts {
            render_artifact(view);
        }
    }

    Ok(())
}

/// Stream one turn, rendering events as they arrive.
///
/// Returns the assistant's text and the artifacts finished during the turn.
async fn run_one_turn(
    orchestrator: Arc<Orchestrator>,
    conversation: Vec<ChatMessage>,
    options: TurnOptions,
) -> (String, Vec<ArtifactView>) {
    let spinner = Output::spinner("Thinking...");
    let mut stream = orchestrator.stream_turn(conversation, options);

    let mut reducer = ArtifactReducer::new();
    let mut reply = String::new();
    let mut first = true;

    while let Some(event) = stream.next().await {
        if first {
            spinner.finish_and_clear();
            first = false;
        }

        match event {
            TurnEvent::Text { content } => {
                println!("\n{} {}\n", style("Laer:").cyan().bold(), content);
                if !reply.is_empty() {
                    reply.push('\n');
                }
                reply.push_str(&content);
            }
            TurnEvent::InvocationStarted { capability } => {
                print!("{}", style(format!("  [{}] ", capability)).dim());
                io::stdout().flush().ok();
            }
            TurnEvent::InvocationFinished { outcome } => match &outcome {
                InvocationOutcome::Success { .. } => println!("{}", style("ok").green()),
                InvocationOutcome::Failure { summary, .. } => {
                    println!("{}", style("failed").red());
                    println!("  {}", style(summary).dim());
                }
            },
            TurnEvent::Artifact { event } => {
                reducer.apply(event);
            }
            TurnEvent::Done {
                budget_exhausted, ..
            } => {
                if budget_exhausted {
                    Output::warning("Stopped: capability step budget exhausted for this turn.");
                }
            }
        }
    }

    if first {
        spinner.finish_and_clear();
    }

    if reducer.is_streaming() {
        // Finish never arrived; surface instead of pretending it completed.
        Output::warning("An artifact never finished streaming and was discarded.");
    }

    let artifacts = reducer.finished().into_iter().cloned().collect();
    (reply, artifacts)
}

fn trim_history(history: &mut Vec<ChatMessage>, max_messages: usize) {
    if history.len() > max_messages {
        let start = history.len() - max_messages;
        history.drain(..start);
    }
}

/// Pretty-print a finished artifact, falling back to raw content for kinds
/// without a dedicated renderer.
fn render_artifact(view: &ArtifactView) {
    match view.kind {
        Some(ArtifactKind::Quiz) => {
            if let Ok(quiz) = serde_json::from_str::<QuizPayload>(&view.content) {
                render_quiz(&quiz);
                return;
            }
        }
        Some(ArtifactKind::StudyPlan) => {
            if let Ok(plan) = serde_json::from_str::<StudyPlanPayload>(&view.content) {
                render_plan(&plan);
                return;
            }
        }
        _ => {}
    }
    render_generic(view);
}

fn render_quiz(quiz: &QuizPayload) {
    Output::header(&quiz.title);
    for (i, question) in quiz.questions.iter().enumerate() {
        println!("\n{}. {}", i + 1, style(&question.question).bold());
        for (j, option) in question.options.iter().enumerate() {
            let letter = (b'a' + j as u8) as char;
            println!("   {}) {}", letter, option);
        }
    }

    println!("\n{}", style("Answers").dim().underlined());
    for (i, question) in quiz.questions.iter().enumerate() {
        let letter = (b'a' + question.correct_answer as u8) as char;
        match &question.explanation {
            Some(explanation) => {
                println!("  {}. {} - {}", i + 1, letter, style(explanation).dim())
            }
            None => println!("  {}. {}", i + 1, letter),
        }
    }
    println!();
}

fn render_plan(plan: &StudyPlanPayload) {
    Output::header(&plan.title);
    for week in &plan.weeks {
        println!("\n{}", style(&week.title).bold());
        if !week.goals.is_empty() {
            println!("  {}", style("Goals:").dim());
            for goal in &week.goals {
                Output::list_item(goal);
            }
        }
        println!("  {}", style("Tasks:").dim());
        for task in &week.tasks {
            let mark = if task.done { "[x]" } else { "[ ]" };
            println!("  {} {} ({})", mark, task.description, task.duration);
        }
        if !week.resources.is_empty() {
            println!("  {}", style("Resources:").dim());
            for resource in &week.resources {
                Output::list_item(resource);
            }
        }
    }
    println!();
}

fn render_generic(view: &ArtifactView) {
    let kind = view
        .kind
        .as_ref()
        .map(|k| k.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    Output::header(&format!("{} ({})", view.title, kind));
    println!("{}\n", view.content);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_history_keeps_tail() {
        let mut history: Vec<ChatMessage> = (0..40)
            .map(|i| ChatMessage::user(format!("message {}", i)))
            .collect();
        trim_history(&mut history, 30);

        assert_eq!(history.len(), 30);
        assert_eq!(history[0].content, "message 10");
        assert_eq!(history.last().unwrap().content, "message 39");
    }
}
