use crate::app::App;

pub fn run(app: &App) -> anyhow::Result<()> {
    let memory = app.memory()?;
    let ids = memory.thread_ids();
    if ids.is_empty() {
        println!("No threads");
        return Ok(());
    }

    for id in &ids {
        let stats = memory.get_stats(id).observational_memory;
        println!(
            "  {} | observations:{} tokens:{}/{} messages:{}",
            id,
            stats.observation_count,
            stats.token_total,
            stats.max_tokens,
            stats.messages_processed
        );
    }
    Ok(())
}
