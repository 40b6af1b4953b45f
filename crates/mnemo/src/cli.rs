use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "mnemo")]
#[command(version)]
#[command(about = "Rolling conversational memory for LLM agents")]
pub struct Cli {
    /// Where thread state is kept
    #[arg(long, value_enum, global = true, default_value_t = StoreKind::Json)]
    pub store: StoreKind,

    /// Base URL of a semantic memory service (overrides the config file)
    #[arg(long, global = true)]
    pub semantic_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// One JSON file per thread under ~/.mnemo/threads
    Json,
    /// Single database at ~/.mnemo/observations.db
    Sqlite,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default config file to ~/.mnemo
    Init,

    /// Ingest a batch of messages and print the thread context
    Process {
        #[arg(short, long)]
        thread: String,

        /// JSON array of {role, content} (stdin if omitted)
        #[arg(short, long)]
        file: Option<String>,

        /// Extra context section, as name=text (repeatable)
        #[arg(long = "extra", value_parser = parse_extra)]
        extras: Vec<(String, String)>,
    },

    /// Print the current context of a thread
    Context {
        #[arg(short, long)]
        thread: String,
    },

    /// Print thread statistics as JSON
    Stats {
        #[arg(short, long)]
        thread: String,
    },

    /// Merge the oldest observations now
    Reflect {
        #[arg(short, long)]
        thread: String,
    },

    /// List known threads
    Threads,

    /// Drop all observations of a thread
    Clear {
        #[arg(short, long)]
        thread: String,
    },

    /// View interaction history
    History {
        /// Show statistics summary
        #[arg(long)]
        stats: bool,

        /// Only interactions of this thread
        #[arg(short, long)]
        thread: Option<String>,
    },

    /// Back up, list, restore or prune saved threads
    Backup {
        #[command(subcommand)]
        action: Option<BackupAction>,
    },

    /// Print version information
    Version,
}

#[derive(Subcommand)]
pub enum BackupAction {
    /// Archive every thread and the config file
    Create {
        #[arg(long)]
        name: Option<String>,
    },
    /// List backups, newest first
    List,
    /// Restore threads and config from a backup
    Restore {
        name: String,

        /// Skip the checksum check
        #[arg(long)]
        no_verify: bool,
    },
    /// Delete all but the newest backups
    Prune {
        #[arg(long, default_value_t = 10)]
        keep: usize,
    },
}

fn parse_extra(raw: &str) -> Result<(String, String), String> {
    let (name, text) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=text, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty section name in '{}'", raw));
    }
    Ok((name.to_string(), text.to_string()))
}
