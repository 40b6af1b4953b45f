use crate::app::{App, ConfigFile};
use mnemo_telemetry::atomic_write;

pub fn run(app: &App) -> anyhow::Result<()> {
    let config_path = app.paths.config_file();
    std::fs::create_dir_all(app.paths.threads_dir())?;
    std::fs::create_dir_all(app.paths.telemetry_dir())?;

    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }

    let json = serde_json::to_string_pretty(&ConfigFile::default())?;
    atomic_write(&config_path, json.as_bytes())?;

    println!("✓ Wrote default config to {}", config_path.display());
    println!("\nState directories:");
    println!("  - {}", app.paths.threads_dir().display());
    println!("  - {}", app.paths.telemetry_dir().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, StoreKind};
    use clap::Parser;
    use mnemo_telemetry::Paths;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_init_writes_config_under_home() {
        let original_home = std::env::var("HOME").unwrap();
        let temp = TempDir::new().unwrap();

        // Override HOME for this test
        unsafe { std::env::set_var("HOME", temp.path()) };

        let cli = Cli::try_parse_from(["mnemo", "init"]).unwrap();
        let result = App::from_cli(&cli).and_then(|app| run(&app));

        // Restore HOME
        unsafe { std::env::set_var("HOME", &original_home) };

        assert!(result.is_ok());
        let mnemo_dir = temp.path().join(".mnemo");
        assert!(mnemo_dir.join("threads").is_dir());
        let content = fs::read_to_string(mnemo_dir.join("mnemo.json")).unwrap();
        assert!(content.contains("\"max_tokens\": 2000"));
        assert!(content.contains("\"merge_separator\""));
    }

    #[test]
    fn test_init_keeps_existing_config() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::at(temp.path());
        fs::write(paths.config_file(), r#"{"max_tokens": 50}"#).unwrap();

        run(&App::at(paths.clone(), StoreKind::Json)).unwrap();

        assert_eq!(
            fs::read_to_string(paths.config_file()).unwrap(),
            r#"{"max_tokens": 50}"#
        );
    }

    #[test]
    fn test_written_default_loads_back() {
        let temp = TempDir::new().unwrap();
        let app = App::at(Paths::at(temp.path()), StoreKind::Json);
        run(&app).unwrap();
        assert_eq!(app.config(), ConfigFile::default());
    }
}
