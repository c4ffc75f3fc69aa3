mod display;
mod import;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::display::{
    display_batch, display_check, display_draws, display_generation, display_heatmap,
    display_import_summary, display_thresholds,
};
use crate::import::{import_records, parse_feed, read_source, DEFAULT_FEED_URL};
use lotpick_core::{analyze, generate_batch, spawn_generation, GenerationConfig};
use lotpick_db::db::{count_draws, db_path, fetch_draws, fetch_history, fetch_last_draws, find_draw, insert_draw, migrate, open_db};
use lotpick_db::models::{validate_draw, Block, Draw, DrawRecord, LUCKY_COUNT, MAIN_COUNT};
use lotpick_db::rusqlite::Connection;
use lotpick_db::snapshot::Snapshot;

#[derive(Parser)]
#[command(name = "lotpick", about = "Lottery history analyzer and constrained number generator")]
struct Cli {
    /// Database path (defaults to ./data/lotpick.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import draws from a CSV feed file
    Import {
        /// Path to the CSV feed
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Download the CSV feed and import it
    Fetch {
        #[arg(short, long, default_value = DEFAULT_FEED_URL)]
        url: String,

        /// Also write the fetched draws to this snapshot file
        #[arg(short, long)]
        snapshot: Option<PathBuf>,
    },

    /// Export or import a JSON snapshot of the history
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },

    /// Print the database path
    DbPath,

    /// List the latest draws
    List {
        /// Number of draws to show
        #[arg(short, long, default_value = "10")]
        last: u32,
    },

    /// Show the thresholds derived from the history
    Thresholds {
        /// Log the analyzer diagnostics at info level
        #[arg(long)]
        debug: bool,
    },

    /// Per-position frequency heatmap
    Heatmap {
        /// Show the lucky number range instead of the main range
        #[arg(long)]
        lucky: bool,

        #[arg(long)]
        min: Option<u8>,

        #[arg(long)]
        max: Option<u8>,
    },

    /// Generate a combination that fits the historical thresholds
    Generate(GenerateArgs),

    /// Check whether a combination was already drawn
    Check {
        /// 5 main numbers followed by 2 lucky numbers
        #[arg(num_args = 7, required = true)]
        numbers: Vec<String>,
    },

    /// Add a draw manually
    Add,
}

#[derive(Subcommand)]
enum SnapshotAction {
    /// Write every stored draw to a snapshot file
    Export {
        path: PathBuf,

        /// Source recorded in the document
        #[arg(long, default_value = "local")]
        source: String,
    },

    /// Insert the draws of a snapshot file
    Import { path: PathBuf },
}

#[derive(Args)]
struct GenerateArgs {
    /// JSON config file; missing fields take their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the effective config to this file
    #[arg(long)]
    save_config: Option<PathBuf>,

    #[arg(long)]
    min_score: Option<f64>,

    #[arg(long)]
    max_iterations: Option<u64>,

    #[arg(long)]
    cluster_max: Option<usize>,

    /// Independent runs, generated in parallel
    #[arg(short, long, default_value = "1")]
    runs: usize,

    /// Seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Log every rejected candidate
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let path = cli.db.unwrap_or_else(db_path);
    let conn = open_db(&path)?;
    migrate(&conn)?;

    match cli.command {
        Command::Import { file } => cmd_import(&conn, &file),
        Command::Fetch { url, snapshot } => cmd_fetch(&conn, &url, snapshot.as_deref()),
        Command::Snapshot { action } => match action {
            SnapshotAction::Export { path, source } => cmd_snapshot_export(&conn, &path, &source),
            SnapshotAction::Import { path } => cmd_snapshot_import(&conn, &path),
        },
        Command::DbPath => {
            println!("{}", path.display());
            Ok(())
        }
        Command::List { last } => cmd_list(&conn, last),
        Command::Thresholds { debug } => cmd_thresholds(&conn, debug),
        Command::Heatmap { lucky, min, max } => cmd_heatmap(&conn, lucky, min, max),
        Command::Generate(args) => cmd_generate(&conn, args),
        Command::Check { numbers } => cmd_check(&conn, &numbers),
        Command::Add => cmd_add(&conn),
    }
}

fn load_history(conn: &Connection) -> Result<Option<Vec<Draw>>> {
    if count_draws(conn)? == 0 {
        println!("Empty database. Run first: lotpick fetch (or lotpick import)");
        return Ok(None);
    }
    Ok(Some(fetch_history(conn)?))
}

fn cmd_import(conn: &Connection, file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file).with_context(|| format!("Cannot read {:?}", file))?;
    let feed = parse_feed(&text)?;
    let result = import_records(conn, &feed.records)?;
    display_import_summary(&result);
    Ok(())
}

fn cmd_fetch(conn: &Connection, url: &str, snapshot: Option<&Path>) -> Result<()> {
    let text = read_source(url)?;
    let feed = parse_feed(&text)?;
    let result = import_records(conn, &feed.records)?;
    display_import_summary(&result);

    if let Some(path) = snapshot {
        if Snapshot::new(url, &feed.records).save(path)? {
            println!("Snapshot written to {}", path.display());
        } else {
            println!("Snapshot unchanged, nothing written.");
        }
    }
    Ok(())
}

fn cmd_snapshot_export(conn: &Connection, path: &Path, source: &str) -> Result<()> {
    let records = fetch_draws(conn)?;
    if records.is_empty() {
        bail!("Nothing to export: the database is empty");
    }
    if Snapshot::new(source, &records).save(path)? {
        println!("Exported {} draws to {}", records.len(), path.display());
    } else {
        println!("Snapshot unchanged, nothing written.");
    }
    Ok(())
}

fn cmd_snapshot_import(conn: &Connection, path: &Path) -> Result<()> {
    let snapshot = Snapshot::load(path)?;
    log::info!("Snapshot from {} fetched at {}", snapshot.source, snapshot.fetched_at);
    let result = import_records(conn, &snapshot.records())?;
    display_import_summary(&result);
    Ok(())
}

fn cmd_list(conn: &Connection, last: u32) -> Result<()> {
    if count_draws(conn)? == 0 {
        println!("Empty database. Run first: lotpick fetch (or lotpick import)");
        return Ok(());
    }
    let records = fetch_last_draws(conn, last)?;
    display_draws(&records);
    Ok(())
}

fn cmd_thresholds(conn: &Connection, debug: bool) -> Result<()> {
    let Some(history) = load_history(conn)? else {
        return Ok(());
    };
    let thresholds = analyze(&history, debug)?;
    display_thresholds(&thresholds);
    Ok(())
}

fn cmd_heatmap(conn: &Connection, lucky: bool, min: Option<u8>, max: Option<u8>) -> Result<()> {
    let Some(history) = load_history(conn)? else {
        return Ok(());
    };
    let block = if lucky { Block::Lucky } else { Block::Main };
    let range = block.default_range();
    let (min, max) = (min.unwrap_or(*range.start()), max.unwrap_or(*range.end()));
    if min == 0 || min > max {
        bail!("Invalid range {}-{}", min, max);
    }
    let thresholds = analyze(&history, false)?;
    display_heatmap(&thresholds.heatmap_cells(min, max), min, max);
    Ok(())
}

fn load_config(path: &Path) -> Result<GenerationConfig> {
    let json = std::fs::read_to_string(path).with_context(|| format!("Cannot read config {:?}", path))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid config JSON in {:?}", path))
}

fn save_config(config: &GenerationConfig, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(config)? + "\n";
    std::fs::write(path, json).with_context(|| format!("Cannot write {:?}", path))?;
    println!("Config written to {}", path.display());
    Ok(())
}

fn cmd_generate(conn: &Connection, args: GenerateArgs) -> Result<()> {
    let Some(history) = load_history(conn)? else {
        return Ok(());
    };

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GenerationConfig::from_thresholds(&analyze(&history, args.debug)?),
    };
    if let Some(min_score) = args.min_score {
        config.min_score = min_score;
    }
    if let Some(max_iterations) = args.max_iterations {
        config.max_iterations = max_iterations;
    }
    if let Some(cluster_max) = args.cluster_max {
        config.cluster_max = cluster_max;
    }
    config.debug |= args.debug;
    config.validate()?;

    if let Some(path) = &args.save_config {
        save_config(&config, path)?;
    }

    if args.runs > 1 {
        println!("Generating {} combinations from {} draws...", args.runs, history.len());
        let configs = vec![config; args.runs];
        let results = generate_batch(&history, &configs, args.seed)
            .into_iter()
            .enumerate()
            .map(|(i, r)| r.map(|result| (i, result)))
            .collect::<Result<Vec<_>, _>>()?;
        display_batch(&results);
        return Ok(());
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("Searching over {} draws...", history.len()));

    let handle = spawn_generation(Arc::from(history), config.clone(), args.seed);
    let result = loop {
        if let Some(result) = handle.wait_timeout(Duration::from_millis(100)) {
            break result;
        }
        pb.tick();
    };
    pb.finish_and_clear();

    display_generation(&result?, &config);
    Ok(())
}

fn cmd_check(conn: &Connection, numbers: &[String]) -> Result<()> {
    let draw = Draw::parse_fields(numbers)?;
    validate_draw(&draw, &Block::Main.default_range(), &Block::Lucky.default_range())?;
    let found = find_draw(conn, &draw)?;
    display_check(&draw, found.as_deref());
    Ok(())
}

fn cmd_add(conn: &Connection) -> Result<()> {
    println!("Add a draw manually\n");

    let stdin = io::stdin();
    let mut input = stdin.lock();

    let raw_date = prompt(&mut input, "Date (YYYY-MM-DD, empty if unknown): ")?;
    let date = if raw_date.is_empty() {
        None
    } else {
        let parsed = chrono::NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")
            .with_context(|| format!("Invalid date: '{}'", raw_date))?;
        Some(parsed.format("%Y-%m-%d").to_string())
    };

    let main: [u8; MAIN_COUNT] = prompt_block(&mut input, Block::Main, |main| Draw::new(main, [1, 2]))?;
    let lucky: [u8; LUCKY_COUNT] = prompt_block(&mut input, Block::Lucky, |lucky| Draw::new(main, lucky))?;
    let record = DrawRecord {
        date,
        draw: Draw::new(main, lucky),
    };

    println!("\nDraw to insert:");
    display_draws(std::slice::from_ref(&record));

    let confirm = prompt(&mut input, "\nConfirm? (y/n): ")?;
    if confirm.eq_ignore_ascii_case("y") {
        if insert_draw(conn, &record)? {
            println!("Draw inserted.");
        } else {
            println!("This draw already exists (duplicate ignored).");
        }
    } else {
        println!("Cancelled.");
    }

    Ok(())
}

fn prompt(input: &mut impl BufRead, msg: &str) -> Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut line = String::new();
    let read = input.read_line(&mut line).context("Cannot read input")?;
    if read == 0 {
        bail!("Input closed before the draw was complete");
    }
    Ok(line.trim().to_string())
}

/// Asks until `N` numbers pass `validate_draw`; `place` puts them into a draw whose other
/// block is already valid.
fn prompt_block<const N: usize>(
    input: &mut impl BufRead,
    block: Block,
    place: impl Fn([u8; N]) -> Draw,
) -> Result<[u8; N]> {
    let range = block.default_range();
    loop {
        let line = prompt(
            input,
            &format!(
                "{} {} numbers (space separated, {}-{}): ",
                N,
                block.label(),
                range.start(),
                range.end()
            ),
        )?;
        let nums: Result<Vec<u8>, _> = line.split_whitespace().map(|s| s.parse::<u8>()).collect();
        match nums.ok().and_then(|v| <[u8; N]>::try_from(v).ok()) {
            Some(numbers) => {
                let check = validate_draw(
                    &place(numbers),
                    &Block::Main.default_range(),
                    &Block::Lucky.default_range(),
                );
                match check {
                    Ok(()) => return Ok(numbers),
                    Err(e) => println!("{}. Try again.", e),
                }
            }
            None => println!("Enter exactly {} numbers. Try again.", N),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_prompt_fails_on_closed_input() {
        let mut input = Cursor::new("");
        assert!(prompt(&mut input, "> ").is_err());
    }

    #[test]
    fn test_prompt_block_stops_at_end_of_input() {
        let mut input = Cursor::new("1 2 3\n");
        let result: Result<[u8; MAIN_COUNT]> =
            prompt_block(&mut input, Block::Main, |main| Draw::new(main, [1, 2]));
        assert!(result.is_err());
    }

    #[test]
    fn test_prompt_block_retries_until_valid() {
        // too few, duplicate, out of range, then valid
        let mut input = Cursor::new("1 2 3\n4 4 10 20 30\n4 9 10 20 51\n4 9 10 20 30\n");
        let main: [u8; MAIN_COUNT] =
            prompt_block(&mut input, Block::Main, |main| Draw::new(main, [1, 2])).unwrap();
        assert_eq!(main, [4, 9, 10, 20, 30]);
    }

    #[test]
    fn test_prompt_block_checks_lucky_range() {
        let mut input = Cursor::new("3 12\n3 11\n");
        let lucky: [u8; LUCKY_COUNT] =
            prompt_block(&mut input, Block::Lucky, |lucky| Draw::new([1, 2, 3, 4, 5], lucky)).unwrap();
        assert_eq!(lucky, [3, 11]);
    }
}
