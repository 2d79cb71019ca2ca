use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use crate::app::App;
use crate::config::AppConfig;
use crate::entries::{match_entries, parse_entries_json, parse_entry_date, EntryIndex};
use crate::persistence::{PersistenceAdapter, ViewPersistenceRecord};
use crate::storage::StorageHandle;

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// JSON file holding an array of entries. Reads stdin when omitted.
    #[arg()]
    pub path: Option<PathBuf>,
    /// Drop every stored entry before importing
    #[arg(long)]
    pub replace: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DayArgs {
    /// Date in DD/MM/YYYY form
    #[arg()]
    pub date: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum StateCommand {
    /// Print the saved month and scroll offset
    Show,
    /// Forget the saved position; the next launch starts at today
    Clear,
}

#[derive(Args, Debug, Clone)]
pub struct StateArgs {
    #[command(subcommand)]
    pub command: StateCommand,
}

pub fn run_tui(app: &mut App) -> Result<()> {
    app.run()
}

pub fn import_entries(storage: &StorageHandle, args: ImportArgs) -> Result<()> {
    let raw = match &args.path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("reading entries from {}", path.display()))?,
        None => match read_stdin()? {
            Some(raw) => raw,
            None => bail!("no input: pass a JSON file or pipe entries on stdin"),
        },
    };
    let output = run_import(storage, &raw, args.replace)?;
    print!("{output}");
    Ok(())
}

fn run_import(storage: &StorageHandle, raw: &str, replace: bool) -> Result<String> {
    let entries = parse_entries_json(raw).context("parsing entries JSON")?;
    let index = EntryIndex::build(&entries);
    let outcome = storage
        .import_entries(&entries, replace)
        .context("storing imported entries")?;
    tracing::info!(
        inserted = outcome.inserted,
        replaced = outcome.replaced,
        undated = index.skipped(),
        "imported journal entries"
    );

    let mut out = String::new();
    let _ = write!(
        &mut out,
        "Imported {} entr{} across {} day(s)",
        outcome.inserted,
        if outcome.inserted == 1 { "y" } else { "ies" },
        index.dated_days()
    );
    if replace {
        let _ = write!(&mut out, ", replacing {}", outcome.replaced);
    }
    out.push('\n');
    if index.skipped() > 0 {
        let _ = writeln!(
            &mut out,
            "Warning: {} entr{} with unreadable dates will not appear on the calendar",
            index.skipped(),
            if index.skipped() == 1 { "y" } else { "ies" }
        );
    }
    Ok(out)
}

pub fn show_day(storage: &StorageHandle, args: DayArgs) -> Result<()> {
    let output = describe_day(storage, &args.date)?;
    print!("{output}");
    Ok(())
}

fn describe_day(storage: &StorageHandle, raw_date: &str) -> Result<String> {
    let day = parse_entry_date(raw_date)?;
    let entries = storage.fetch_entries().context("loading journal entries")?;
    let matches = match_entries(&day, &entries);
    if matches.is_empty() {
        return Ok(format!("No entries on {day}.\n"));
    }
    let mut out = String::new();
    for (position, entry) in matches.iter().enumerate() {
        let _ = writeln!(
            &mut out,
            "#{}  {day}  {:.1} / 5.0",
            position + 1,
            entry.rating
        );
        if !entry.categories.is_empty() {
            let _ = writeln!(&mut out, "    tags    {}", entry.categories.join(", "));
        }
        if !entry.img_url.is_empty() {
            let _ = writeln!(&mut out, "    image   {}", entry.img_url);
        }
        for line in entry.description.lines() {
            let _ = writeln!(&mut out, "    {line}");
        }
        out.push('\n');
    }
    Ok(out)
}

pub fn handle_state_command(
    config: &AppConfig,
    storage: StorageHandle,
    args: StateArgs,
) -> Result<()> {
    let mut adapter = PersistenceAdapter::new(Box::new(storage), &config.persistence);
    let output = match args.command {
        StateCommand::Show => describe_state(&adapter),
        StateCommand::Clear => clear_state(&mut adapter)?,
    };
    print!("{output}");
    Ok(())
}

fn describe_state(adapter: &PersistenceAdapter) -> String {
    if !adapter.is_enabled() {
        return "View-state persistence is disabled.\n".to_string();
    }
    match adapter.load() {
        Some(record) => format_record(adapter.namespace(), &record),
        None => format!(
            "No saved position under '{}'; the calendar opens at today.\n",
            adapter.namespace()
        ),
    }
}

fn format_record(namespace: &str, record: &ViewPersistenceRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(&mut out, "namespace  {namespace}");
    let _ = writeln!(&mut out, "month      {}", record.visible_month());
    let _ = writeln!(&mut out, "scroll     {}", record.scroll_offset);
    out
}

fn clear_state(adapter: &mut PersistenceAdapter) -> Result<String> {
    let removed = adapter
        .clear()
        .with_context(|| format!("clearing view state '{}'", adapter.namespace()))?;
    Ok(if removed {
        format!("Cleared saved position under '{}'.\n", adapter.namespace())
    } else {
        format!("Nothing saved under '{}'.\n", adapter.namespace())
    })
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigPaths, StorageOptions};
    use crate::persistence::{StateProvider, DEFAULT_NAMESPACE};
    use crate::storage;
    use tempfile::TempDir;

    type TestResult<T = ()> = Result<T>;

    const SAMPLE: &str = r#"[
        {
            "date": "15/06/2024",
            "imgUrl": "",
            "rating": 4.5,
            "categories": ["walk"],
            "description": "Morning walk"
        },
        {"date": "15/06/2024", "rating": 3.0, "description": "Quiet evening"},
        {"date": "2024-06-16", "rating": 2.0, "description": "Wrong date format"}
    ]"#;

    fn setup_storage() -> TestResult<(TempDir, StorageHandle)> {
        let temp_dir = TempDir::new().context("creating temp dir")?;
        let paths = ConfigPaths::under(temp_dir.path());
        let options = StorageOptions {
            database_path: paths.database_path.clone(),
            seed_samples: false,
            ..StorageOptions::default()
        };
        let storage = storage::init(&paths, &options)?;
        Ok((temp_dir, storage))
    }

    #[test]
    fn cli_import_reports_counts_and_undated_entries() -> TestResult {
        let (_temp_dir, storage) = setup_storage()?;
        let output = run_import(&storage, SAMPLE, false)?;
        assert!(output.contains("Imported 3 entries across 1 day(s)"));
        assert!(output.contains("1 entry with unreadable dates"));
        assert_eq!(storage.count_entries()?, 3);

        let output = run_import(&storage, &SAMPLE.replace("Quiet", "Loud"), true)?;
        assert!(output.contains("replacing 3"));
        assert_eq!(storage.count_entries()?, 3);
        Ok(())
    }

    #[test]
    fn cli_import_rejects_malformed_json() -> TestResult {
        let (_temp_dir, storage) = setup_storage()?;
        assert!(run_import(&storage, "{\"date\": ", false).is_err());
        assert_eq!(storage.count_entries()?, 0);
        Ok(())
    }

    #[test]
    fn cli_day_lists_matching_entries_in_order() -> TestResult {
        let (_temp_dir, storage) = setup_storage()?;
        run_import(&storage, SAMPLE, false)?;

        let output = describe_day(&storage, "15/6/2024")?;
        let walk = output.find("Morning walk").expect("first entry listed");
        let evening = output.find("Quiet evening").expect("second entry listed");
        assert!(walk < evening);
        assert!(output.contains("#1  15/06/2024  4.5 / 5.0"));
        assert!(output.contains("tags    walk"));

        assert_eq!(describe_day(&storage, "16/06/2024")?, "No entries on 16/06/2024.\n");
        assert!(describe_day(&storage, "2024-06-16").is_err());
        Ok(())
    }

    #[test]
    fn cli_state_show_and_clear() -> TestResult {
        let (_temp_dir, mut storage) = setup_storage()?;
        let config = AppConfig::default();
        storage.set(
            DEFAULT_NAMESPACE,
            r#"{"currentMonth":5,"currentYear":2024,"scrollTop":42}"#,
        )?;

        let mut adapter = PersistenceAdapter::new(Box::new(storage.clone()), &config.persistence);
        let shown = describe_state(&adapter);
        assert!(shown.contains("month      June 2024"));
        assert!(shown.contains("scroll     42"));

        assert!(clear_state(&mut adapter)?.starts_with("Cleared"));
        assert!(clear_state(&mut adapter)?.starts_with("Nothing saved"));
        assert!(describe_state(&adapter).starts_with("No saved position"));
        assert!(storage.get(DEFAULT_NAMESPACE)?.is_none());
        Ok(())
    }
}
