use crate::app::App;

pub fn run(app: &App, thread_id: &str) -> anyhow::Result<()> {
    let memory = app.memory()?;
    println!("{}", memory.get_context(thread_id));
    Ok(())
}
