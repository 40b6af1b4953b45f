use crate::app::App;
use crate::cli::BackupAction;
use mnemo_storage::BackupManager;

pub fn run(app: &App, action: Option<BackupAction>) -> anyhow::Result<()> {
    let manager = BackupManager::new(app.paths.clone());

    match action.unwrap_or(BackupAction::List) {
        BackupAction::Create { name } => {
            let store = app.state_store()?;
            let backup = manager.create(store.as_ref(), name.as_deref())?;
            println!(
                "✓ Backup '{}': {} thread(s), {} observation(s), {} bytes",
                backup.name, backup.thread_count, backup.observation_count, backup.size_bytes
            );
            println!("  sha256 {}", backup.checksum);
        }
        BackupAction::List => {
            let backups = manager.list()?;
            if backups.is_empty() {
                println!("No backups");
                return Ok(());
            }
            for backup in &backups {
                println!(
                    "  {} | {} | threads:{} observations:{} {}B",
                    backup.name,
                    backup.created_at.format("%Y-%m-%d %H:%M:%S"),
                    backup.thread_count,
                    backup.observation_count,
                    backup.size_bytes
                );
            }
        }
        BackupAction::Restore { name, no_verify } => {
            let store = app.state_store()?;
            let summary = manager.restore(store.as_ref(), &name, !no_verify)?;
            println!(
                "✓ Restored {} thread(s) from '{}'{}{}",
                summary.threads,
                summary.name,
                if summary.config_restored { " with config" } else { "" },
                if summary.verified { "" } else { " (checksum not verified)" }
            );
        }
        BackupAction::Prune { keep } => {
            let removed = manager.prune(keep)?;
            println!("Removed {} backup(s), kept up to {}", removed, keep);
        }
    }
    Ok(())
}
