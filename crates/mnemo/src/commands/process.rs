use crate::app::App;
use chrono::Utc;
use mnemo_core::{ContextSections, IngestReport, Message};
use mnemo_telemetry::{append_jsonl, InteractionRecord};
use std::io::Read;
use tracing::warn;

/// Parse a JSON array of `{role, content}`; blank input is an empty batch
pub fn parse_messages(input: &str) -> anyhow::Result<Vec<Message>> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(input)
        .map_err(|e| anyhow::anyhow!("expected a JSON array of {{role, content}}: {}", e))
}

fn read_input(file: Option<&str>) -> anyhow::Result<String> {
    match file {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            Ok(input)
        }
    }
}

fn interaction_record(
    thread_id: &str,
    report: &IngestReport,
    max_tokens: usize,
    context: &str,
) -> InteractionRecord {
    InteractionRecord {
        thread_id: thread_id.to_string(),
        timestamp: Utc::now(),
        messages: report.messages,
        tokens_before_reflection: report.tokens_before_reflection,
        tokens_after: report.tokens_after,
        max_tokens,
        merges: report.merges,
        observations_merged: report.observations_merged,
        over_budget: report.over_budget,
        observation_count: report.observation_count,
        context_chars: context.chars().count(),
    }
}

/// Ingest one batch and return the rendered context
pub fn process(
    app: &App,
    thread_id: &str,
    messages: &[Message],
    extras: Vec<(String, String)>,
) -> anyhow::Result<String> {
    let memory = app.memory()?;
    let extras: ContextSections = extras.into_iter().collect();

    let (context, report) = memory.process_interaction_with_report(thread_id, messages, extras)?;

    if report.appended {
        let record = interaction_record(thread_id, &report, memory.config().max_tokens, &context);
        if let Err(e) = append_jsonl(&app.paths.interactions_file(), &record) {
            warn!(error = %e, "failed to record interaction");
        }
    }
    Ok(context)
}

pub fn run(
    app: &App,
    thread_id: &str,
    file: Option<&str>,
    extras: Vec<(String, String)>,
) -> anyhow::Result<()> {
    let messages = parse_messages(&read_input(file)?)?;
    let context = process(app, thread_id, &messages, extras)?;
    println!("{}", context);
    Ok(())
}
