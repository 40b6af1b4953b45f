use crate::app::App;

pub fn run(app: &App, thread_id: &str) -> anyhow::Result<()> {
    let memory = app.memory()?;
    let stats = memory.get_stats(thread_id);
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::app::App;
    use crate::cli::StoreKind;
    use mnemo_core::{ContextSections, Message};
    use mnemo_telemetry::Paths;
    use tempfile::TempDir;

    #[test]
    fn test_stats_serialize_sections() {
        let temp = TempDir::new().unwrap();
        let memory = App::at(Paths::at(temp.path()), StoreKind::Json)
            .memory()
            .unwrap();
        memory
            .process_interaction("t1", &[Message::user("hello")], ContextSections::new())
            .unwrap();

        let json = serde_json::to_value(memory.get_stats("t1")).unwrap();

        assert_eq!(json["observational_memory"]["observation_count"], 1);
        assert_eq!(json["observational_memory"]["estimator"], "heuristic");
        assert_eq!(json["semantic_memory"]["enabled"], false);
        assert!(json["timestamp"].is_string());
    }
}
