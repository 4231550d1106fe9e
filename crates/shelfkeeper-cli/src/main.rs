use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

use shelfkeeper_core::{
    BookRecord, DuplicateDetector, ExitCode, LibraryQuery, LibrarySnapshot, ShelfConfig,
    ShelfError, SortSpec, analyze, books_with_issues, filter_and_sort, library_stats,
    load_snapshot, purge_candidates, save_snapshot, series_progress,
};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "shelfkeeper",
    about = "Inspect a book catalogue snapshot: health, duplicates, filtered views",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format. Also enabled by setting SHELFKEEPER_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Library snapshot to read (overrides config and SHELFKEEPER_LIBRARY).
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List active books, filtered by a query and sorted.
    List {
        /// Query, e.g. `dune @herbert #sf r:>=4 s:read sort:rating_desc`.
        #[arg(trailing_var_arg = true)]
        query: Vec<String>,
        /// Sort key such as `title_asc` or `updated_desc`.
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Report data-quality issues in the library.
    Health,

    /// Find likely duplicates of a book, or scan the whole library with --scan.
    Dupes {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        isbn: Option<String>,
        /// Include soft-deleted books in the search.
        #[arg(long)]
        include_deleted: bool,
        /// Group duplicates across the whole library.
        #[arg(long)]
        scan: bool,
    },

    /// Show library statistics.
    Stats,

    /// Show series progress (all series, or one by id).
    Series { id: Option<String> },

    /// List soft-deleted books past the retention window.
    Purge {
        /// Retention window in days (defaults to `retention.days`).
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
        days: Option<i64>,
        /// Rewrite the snapshot without the purged books.
        #[arg(long)]
        apply: bool,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Print the config file path.
    Path,
}

// ─── Main ────────────────────────────────────────────────────────────────────

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .finish();

    // Already set when running under tests.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli, &mut std::io::stdout().lock()) {
        let code = err
            .downcast_ref::<ShelfError>()
            .map_or(ExitCode::GeneralError, ShelfError::exit_code);
        eprintln!("error: {err:#}");
        std::process::exit(code as i32);
    }
}

fn run(cli: Cli, writer: &mut dyn Write) -> Result<()> {
    let start = Instant::now();
    let json_output = cli.json || std::env::var("SHELFKEEPER_JSON").as_deref() == Ok("1");

    let mut config = ShelfConfig::load()?;
    if let Ok(path) = std::env::var("SHELFKEEPER_LIBRARY") {
        config.set_snapshot_path(path.into());
    }
    if let Some(path) = cli.library {
        config.set_snapshot_path(path);
    }

    let mut out = Output { start, writer };

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                if json_output {
                    out.ok(serde_json::to_value(&config)?)?;
                } else {
                    println!("# {}", ShelfConfig::config_path().display());
                    print!("{}", config.to_toml()?);
                }
            }
            ConfigAction::Path => {
                let path = ShelfConfig::config_path();
                if json_output {
                    out.ok(serde_json::json!({ "path": path }))?;
                } else {
                    println!("{}", path.display());
                }
            }
        },

        Commands::List { query, sort, limit } => {
            let snapshot = open_snapshot(&config)?;
            let parsed = LibraryQuery::parse(&query.join(" "));
            let sort = match sort {
                Some(key) => key.parse::<SortSpec>().map_err(ShelfError::Config)?,
                None => parsed.sort.unwrap_or_else(|| config.default_sort()),
            };
            let limit = limit.unwrap_or(config.display.page_size);

            let view = filter_and_sort(&snapshot.books, &parsed.filter, &sort);
            let total = view.len();
            let page: Vec<&BookRecord> = view.into_iter().take(limit).collect();
            info!(total, shown = page.len(), sort = %sort, "listing books");

            if json_output {
                out.ok(serde_json::json!({
                    "items": page, "total": total, "sort": sort.to_string(),
                }))?;
            } else if page.is_empty() {
                println!("No books match.");
            } else {
                for book in &page {
                    let rating = book.rating.map(|r| "★".repeat(r as usize)).unwrap_or_default();
                    println!(
                        "{id:<12}  {title:<40}  {author:<25}  {rating}",
                        id = book.id,
                        title = book.title,
                        author = book.author,
                    );
                }
                if total > page.len() {
                    println!("… {} more", total - page.len());
                }
            }
        }

        Commands::Health => {
            let snapshot = open_snapshot(&config)?;
            let report = analyze(&snapshot.books, &snapshot.series);

            if json_output {
                out.ok(serde_json::json!({
                    "report": report,
                    "booksWithIssues": books_with_issues(&report),
                }))?;
            } else if report.is_healthy() {
                println!("All {} active books look healthy.", report.scanned);
            } else {
                println!("Scanned {} active books:", report.scanned);
                for (issue, count) in report.counts() {
                    if count > 0 {
                        println!("  {:<28} {count}", issue.label());
                    }
                }
                println!();
                for book in &report.affected {
                    let issues: Vec<String> = book.issues.iter().map(ToString::to_string).collect();
                    println!("  {}  {} ({})", book.id, book.title, issues.join(", "));
                }
            }
        }

        Commands::Dupes {
            title,
            author,
            isbn,
            include_deleted,
            scan,
        } => {
            let snapshot = open_snapshot(&config)?;
            let detector = DuplicateDetector::from_config(&config.duplicates)
                .include_deleted(include_deleted || config.duplicates.include_deleted);

            if scan {
                let groups = detector.find_groups(&snapshot.books);
                if json_output {
                    out.ok(serde_json::json!({ "groups": groups }))?;
                } else if groups.is_empty() {
                    println!("No duplicate groups found.");
                } else {
                    for group in &groups {
                        println!(
                            "{} [{}]: {}",
                            group.canonical,
                            group.confidence,
                            group.duplicates.join(", ")
                        );
                    }
                }
                return Ok(());
            }

            if title.is_none() && isbn.is_none() {
                bail!(ShelfError::Config("dupes needs --title or --isbn (or --scan)".to_string()));
            }
            let mut candidate = BookRecord::new("", title.unwrap_or_default(), author.unwrap_or_default());
            candidate.isbn = isbn;

            let matches = detector.find_duplicates(&candidate, &snapshot.books);
            if json_output {
                out.ok(serde_json::json!({ "matches": matches }))?;
            } else if matches.is_empty() {
                println!("No likely duplicates.");
            } else {
                for m in &matches {
                    let deleted = if m.record.is_deleted() { " (deleted)" } else { "" };
                    println!(
                        "{:<9} {}  {} by {}{deleted}",
                        m.confidence.to_string(),
                        m.record.id,
                        m.record.title,
                        m.record.author
                    );
                }
            }
        }

        Commands::Stats => {
            let snapshot = open_snapshot(&config)?;
            let stats = library_stats(&snapshot.books);
            if json_output {
                out.ok(serde_json::to_value(&stats)?)?;
            } else {
                println!("Books:       {} active, {} deleted", stats.active, stats.deleted);
                println!(
                    "Status:      {} unread, {} reading, {} read",
                    stats.unread, stats.reading, stats.read
                );
                println!("With ISBN:   {}", stats.with_isbn);
                println!("With cover:  {}", stats.with_cover);
                if let Some(avg) = stats.average_rating {
                    println!("Avg rating:  {avg:.2}");
                }
                println!("Pages read:  {}", stats.pages_read);
            }
        }

        Commands::Series { id } => {
            let snapshot = open_snapshot(&config)?;
            let selected = match id.as_deref() {
                Some(id) => vec![snapshot.series_by_id(id)?],
                None => snapshot.series.iter().collect(),
            };
            let progress: Vec<_> = selected
                .into_iter()
                .map(|series| series_progress(series, &snapshot.books))
                .collect();

            if json_output {
                out.ok(serde_json::json!({ "series": progress }))?;
            } else {
                for p in &progress {
                    let expected = p.expected.map(|n| n.to_string()).unwrap_or_else(|| "?".to_string());
                    println!("{}: {}/{expected} owned", p.series.name, p.owned.len());
                    for missing in &p.missing {
                        println!("    missing: {}", missing.title);
                    }
                }
            }
        }

        Commands::Purge { days, apply } => {
            let mut snapshot = open_snapshot(&config)?;
            let days = days.unwrap_or(config.retention.days);
            let ids = purge_candidates(&snapshot.books, chrono::Utc::now(), days);

            if apply && !ids.is_empty() {
                snapshot.books.retain(|book| !ids.contains(&book.id));
                save_snapshot(&config.snapshot_path(), &snapshot)?;
                info!(purged = ids.len(), "snapshot rewritten");
            }

            if json_output {
                out.ok(serde_json::json!({ "purgeable": ids, "applied": apply }))?;
            } else if ids.is_empty() {
                println!("Nothing to purge.");
            } else {
                let verb = if apply { "Purged" } else { "Purgeable" };
                println!("{verb}: {}", ids.join(", "));
            }
        }
    }

    Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// JSON envelope writer: `{status, data, meta: {duration_ms}}`.
struct Output<'w> {
    start: Instant,
    writer: &'w mut dyn Write,
}

impl Output<'_> {
    fn ok(&mut self, data: serde_json::Value) -> Result<()> {
        let envelope = serde_json::json!({
            "status": "ok",
            "data": data,
            "meta": { "duration_ms": self.start.elapsed().as_millis() as u64 }
        });
        print_json(self.writer, &envelope)
    }
}

fn print_json(writer: &mut dyn Write, val: &serde_json::Value) -> Result<()> {
    writeln!(writer, "{}", serde_json::to_string_pretty(val)?)?;
    Ok(())
}

fn open_snapshot(config: &ShelfConfig) -> Result<LibrarySnapshot> {
    let path = config.snapshot_path();
    debug!(path = %path.display(), "opening snapshot");
    let snapshot = load_snapshot(&path)
        .with_context(|| format!("failed to load library snapshot {}", path.display()))?;
    Ok(snapshot)
}
