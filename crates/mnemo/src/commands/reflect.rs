use crate::app::App;

pub fn run(app: &App, thread_id: &str) -> anyhow::Result<()> {
    let memory = app.memory()?;
    println!("{}", memory.force_reflection(thread_id)?);
    Ok(())
}
