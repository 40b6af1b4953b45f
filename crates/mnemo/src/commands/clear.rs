use crate::app::App;

pub fn run(app: &App, thread_id: &str) -> anyhow::Result<()> {
    let memory = app.memory()?;
    memory.clear(thread_id);
    println!("Cleared thread '{}'", thread_id);
    Ok(())
}
