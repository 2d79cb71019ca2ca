use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;
use crate::config::{ConfigLoader, ConfigPaths};
use crate::storage;

pub mod commands;

use self::commands::{DayArgs, ImportArgs, StateArgs};

#[derive(Parser, Debug)]
#[command(
    name = "daybook",
    version,
    about = "Endless-scroll terminal calendar for your journal"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file or directory (takes precedence over DAYBOOK_CONFIG)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding daybook.db (takes precedence over DAYBOOK_DATA)
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `daybook=trace`
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive calendar (default)
    Tui,
    /// Load journal entries from a JSON array
    Import(ImportArgs),
    /// Print the entries recorded on one date
    Day(DayArgs),
    /// Inspect or reset the saved calendar position
    State(StateArgs),
}

impl Cli {
    /// Where config and data live once the flags are applied.
    pub fn config_paths(&self) -> Result<ConfigPaths> {
        ConfigPaths::resolve(self.config.clone(), self.data_dir.clone())
    }

    pub fn execute(self) -> Result<()> {
        init_tracing(&self.log_level)
            .with_context(|| format!("initialising logging at level {}", self.log_level))?;

        let loader = ConfigLoader::with_paths(self.config_paths()?);
        let config = loader.load_or_init()?;
        tracing::debug!(
            config = %loader.paths().config_file.display(),
            database = %config.storage.database_path.display(),
            "configuration loaded"
        );
        let storage = storage::init(loader.paths(), &config.storage)?;

        match self.command.unwrap_or(Commands::Tui) {
            Commands::Tui => {
                let mut app = App::new(Arc::new(config), storage)?;
                commands::run_tui(&mut app)
            }
            Commands::Import(args) => commands::import_entries(&storage, args),
            Commands::Day(args) => commands::show_day(&storage, args),
            Commands::State(args) => commands::handle_state_command(&config, storage, args),
        }
    }
}

pub fn run() -> Result<()> {
    Cli::parse().execute()
}

fn init_tracing(filter: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::ffi::OsString;
    use tempfile::TempDir;

    #[test]
    fn path_flags_reach_config_paths() -> Result<()> {
        let temp = TempDir::new()?;
        let config = temp.path().join("conf/daybook.toml");
        let data = temp.path().join("data");
        let args: Vec<OsString> = vec![
            "daybook".into(),
            "--config".into(),
            config.clone().into(),
            "--data-dir".into(),
            data.clone().into(),
            "state".into(),
            "show".into(),
        ];
        let cli = Cli::try_parse_from(args)?;
        assert_matches!(cli.command, Some(Commands::State(_)));

        let paths = cli.config_paths()?;
        assert_eq!(paths.config_file, config);
        assert_eq!(paths.database_path, data.join("daybook.db"));
        Ok(())
    }

    #[test]
    fn bare_invocation_defaults_to_tui() -> Result<()> {
        let cli = Cli::try_parse_from(["daybook"])?;
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");
        Ok(())
    }
}
