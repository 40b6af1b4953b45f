use crate::app::App;
use mnemo_telemetry::{read_jsonl, InteractionRecord};
use std::collections::HashSet;

const RECENT_LIMIT: usize = 20;

fn filter_records<'a>(
    records: &'a [InteractionRecord],
    thread: Option<&str>,
) -> Vec<&'a InteractionRecord> {
    records
        .iter()
        .filter(|r| thread.is_none_or(|t| r.thread_id == t))
        .collect()
}

fn compute_stats(records: &[&InteractionRecord]) -> String {
    if records.is_empty() {
        return "No interactions to analyze.".to_string();
    }
    let total = records.len();
    let threads: HashSet<&str> = records.iter().map(|r| r.thread_id.as_str()).collect();
    let merges: usize = records.iter().map(|r| r.merges).sum();
    let reflected = records.iter().filter(|r| r.merges > 0).count();
    let avg_reduction = records
        .iter()
        .filter(|r| r.merges > 0)
        .map(|r| r.reduction_ratio())
        .sum::<f64>()
        / reflected.max(1) as f64;
    let over_budget = records.iter().filter(|r| r.over_budget).count();

    format!(
        "Total interactions: {}\n\
         Threads: {}\n\
         Reflections: {} ({} merges)\n\
         Avg reduction when reflecting: {:.1}%\n\
         Over budget: {}",
        total,
        threads.len(),
        reflected,
        merges,
        avg_reduction * 100.0,
        over_budget
    )
}

fn format_record(record: &InteractionRecord) -> String {
    format!(
        "  {} | {} msgs:{} tokens:{}->{}/{} merges:{} obs:{}{}",
        record.timestamp.format("%Y-%m-%d %H:%M"),
        record.thread_id,
        record.messages,
        record.tokens_before_reflection,
        record.tokens_after,
        record.max_tokens,
        record.merges,
        record.observation_count,
        if record.over_budget { " OVER" } else { "" },
    )
}

pub fn run(app: &App, stats: bool, thread: Option<&str>) -> anyhow::Result<()> {
    let records: Vec<InteractionRecord> = read_jsonl(&app.paths.interactions_file())?;
    let filtered = filter_records(&records, thread);

    if filtered.is_empty() {
        println!("No interaction history");
        return Ok(());
    }

    if stats {
        println!("{}", compute_stats(&filtered));
        return Ok(());
    }

    let recent: Vec<_> = filtered.into_iter().rev().take(RECENT_LIMIT).collect();
    println!("Recent Interactions (last {})", recent.len());
    println!("============================");
    for record in &recent {
        println!("{}", format_record(record));
    }
    Ok(())
}
