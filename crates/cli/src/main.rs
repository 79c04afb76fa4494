// nvredit CLI - headless operations on AMISCE/SCEWIN NVRAM exports.
//
// File reading and writing happen here, at the application boundary. The
// engine and codec only ever see raw text.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use nvredit_engine::category::Category;
use nvredit_engine::history::History;
use nvredit_engine::search::SearchIndex;
use nvredit_engine::setting::Setting;
use nvredit_engine::store::SettingsStore;
use nvredit_io::{changeset, scewin};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;

#[derive(Parser)]
#[command(name = "nvredit")]
#[command(about = "Inspect and edit BIOS NVRAM exports (AMISCE/SCEWIN format)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Keep going past malformed setting blocks (they pass through
    /// verbatim and are reported on stderr)
    #[arg(long, global = true)]
    lenient: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List settings, optionally filtered and paged
    Show {
        /// NVRAM export file
        file: PathBuf,

        /// Only settings in this category (e.g. Memory, USB, Boot)
        #[arg(long)]
        category: Option<String>,

        /// Only settings whose value differs from the loaded one
        #[arg(long)]
        dirty: bool,

        /// Skip this many settings
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Page size
        #[arg(long, default_value_t = 50)]
        limit: usize,

        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },

    /// Print one setting by token
    Get {
        file: PathBuf,
        token: String,
        #[arg(long)]
        json: bool,
    },

    /// Ranked search over names, help text, tokens and option labels
    Search {
        file: PathBuf,
        query: String,

        /// Typo-tolerant matching instead of substring containment
        #[arg(long)]
        fuzzy: bool,

        /// Minimum fuzzy score (0-100)
        #[arg(long, default_value_t = 60)]
        threshold: u8,

        #[arg(long, default_value_t = 20)]
        limit: usize,

        #[arg(long)]
        json: bool,
    },

    /// Apply validated edits and write the results
    #[command(after_help = "\
Examples:
  nvredit set nvram.txt 0x014C=00 --out nvram_edited.txt
  nvredit set nvram.txt 0x0230=12 0x0301=01 --changeset import.txt
  nvredit set nvram.txt 0x014C=00        (dry run: prints the change plan)")]
    Set {
        file: PathBuf,

        /// Edits as TOKEN=VALUE pairs
        #[arg(required = true)]
        edits: Vec<String>,

        /// Write the full document here
        #[arg(long)]
        out: Option<PathBuf>,

        /// Write the minimal changeset (dirty settings only) here
        #[arg(long)]
        changeset: Option<PathBuf>,
    },

    /// Category population summary
    Categories { file: PathBuf },

    /// Report settings whose current value violates their own constraint
    Check { file: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Show {
            file,
            category,
            dirty,
            offset,
            limit,
            json,
        } => {
            let store = load_store(&file, cli.lenient)?;
            let category = match category {
                Some(name) => Some(
                    Category::from_name(&name)
                        .ok_or_else(|| format!("unknown category '{name}'"))?,
                ),
                None => None,
            };
            let page = store.page(offset, limit, |s| {
                (!dirty || s.is_dirty())
                    && category.map_or(true, |c| s.categories().contains(&c))
            });
            if json {
                let items: Vec<serde_json::Value> =
                    page.iter().map(|s| setting_json(s)).collect();
                println!("{}", serde_json::Value::Array(items));
            } else {
                for s in &page {
                    print_setting_line(s);
                }
                eprintln!("{} of {} settings", page.len(), store.len());
            }
            Ok(())
        }

        Commands::Get { file, token, json } => {
            let store = load_store(&file, cli.lenient)?;
            let setting = store
                .get(&token)
                .ok_or_else(|| format!("unknown token {token}"))?;
            if json {
                println!("{}", setting_json(setting));
            } else {
                print_setting_detail(setting);
            }
            Ok(())
        }

        Commands::Search {
            file,
            query,
            fuzzy,
            threshold,
            limit,
            json,
        } => {
            let store = load_store(&file, cli.lenient)?;
            let index = SearchIndex::build(&store);
            let hits = index.query(&store, &query, fuzzy, threshold);
            if json {
                let items: Vec<serde_json::Value> = hits
                    .iter()
                    .take(limit)
                    .map(|(s, score)| {
                        let mut v = setting_json(s);
                        v["score"] = serde_json::json!(score);
                        v
                    })
                    .collect();
                println!("{}", serde_json::Value::Array(items));
            } else {
                for (s, score) in hits.iter().take(limit) {
                    println!("{score:>3}  {}  {}", s.token, s.name);
                }
                if hits.is_empty() {
                    eprintln!("no matches");
                }
            }
            Ok(())
        }

        Commands::Set {
            file,
            edits,
            out,
            changeset: changeset_path,
        } => {
            let mut store = load_store(&file, cli.lenient)?;
            let edits = parse_edits(&edits)?;
            let mut history = History::new();
            let applied = history
                .apply(&mut store, &edits)
                .map_err(|e| e.to_string())?;

            match &applied {
                Some(set) => {
                    for record in set.records() {
                        println!("{}: {} -> {}", record.token, record.from, record.to);
                    }
                }
                None => println!("no effective changes"),
            }

            if let Some(path) = &changeset_path {
                let text = changeset::export(&store).map_err(|e| e.to_string())?;
                write_text(path, &text)?;
                println!("changeset written to {}", path.display());
            }
            if let Some(path) = &out {
                write_text(path, &scewin::serialize(store.document()))?;
                println!("document written to {}", path.display());
            }
            if out.is_none() && changeset_path.is_none() {
                println!("(dry run: pass --out or --changeset to write)");
            }
            Ok(())
        }

        Commands::Categories { file } => {
            let store = load_store(&file, cli.lenient)?;
            for category in Category::ALL {
                let count = store
                    .settings()
                    .filter(|s| s.categories().contains(&category))
                    .count();
                if count > 0 {
                    println!("{:<16} {count}", category.name());
                }
            }
            Ok(())
        }

        Commands::Check { file } => {
            let store = load_store(&file, cli.lenient)?;
            let bad: Vec<&Setting> = store.settings().filter(|s| !s.is_valid()).collect();
            if bad.is_empty() {
                println!("all {} settings satisfy their constraints", store.len());
                Ok(())
            } else {
                for s in &bad {
                    println!("{}  {}  current value '{}'", s.token, s.name, s.current_value());
                }
                Err(format!(
                    "{} setting(s) hold values outside their own constraints",
                    bad.len()
                ))
            }
        }
    }
}

fn load_store(path: &Path, lenient: bool) -> Result<SettingsStore, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let document = if lenient {
        let outcome = scewin::parse_with(&text, scewin::MalformedPolicy::Skip)
            .map_err(|e| e.to_string())?;
        for err in &outcome.skipped {
            eprintln!("warning: skipped {err}");
        }
        outcome.document
    } else {
        scewin::parse(&text).map_err(|e| e.to_string())?
    };
    Ok(SettingsStore::load(document))
}

fn parse_edits(args: &[String]) -> Result<Vec<(String, String)>, String> {
    args.iter()
        .map(|arg| {
            arg.split_once('=')
                .map(|(t, v)| (t.to_string(), v.to_string()))
                .filter(|(t, v)| !t.is_empty() && !v.is_empty())
                .ok_or_else(|| format!("expected TOKEN=VALUE, got '{arg}'"))
        })
        .collect()
}

fn write_text(path: &Path, text: &str) -> Result<(), String> {
    fs::write(path, text).map_err(|e| format!("cannot write {}: {e}", path.display()))
}

fn print_setting_line(s: &Setting) {
    let marker = if s.is_dirty() { "*" } else { " " };
    let value = match s.current_label() {
        Some(label) => format!("{} ({label})", s.current_value()),
        None => s.current_value().to_string(),
    };
    println!("{marker} {}  {:<12} {}  = {value}", s.token, s.kind.label(), s.name);
}

fn print_setting_detail(s: &Setting) {
    println!("Setup Question : {}", s.name);
    println!("Help String    : {}", s.description);
    println!("Token          : {}", s.token);
    println!("Kind           : {}", s.kind.label());
    println!("Current        : {}", s.current_value());
    if let Some(label) = s.current_label() {
        println!("Label          : {label}");
    }
    println!("Original       : {}", s.original_value());
    println!("Dirty          : {}", s.is_dirty());
    println!("Valid          : {}", s.is_valid());
    let categories: Vec<&str> = s.categories().iter().map(|c| c.name()).collect();
    println!("Categories     : {}", categories.join(", "));
    if let nvredit_engine::setting::SettingKind::Option { choices } = &s.kind {
        println!("Options        :");
        for c in choices {
            let star = if c.value == s.current_value() { "*" } else { " " };
            println!("  {star}[{}] {}", c.value, c.label);
        }
    }
}

fn setting_json(s: &Setting) -> serde_json::Value {
    serde_json::json!({
        "token": s.token,
        "name": s.name,
        "description": s.description,
        "kind": s.kind.label(),
        "value": s.current_value(),
        "label": s.current_label(),
        "original": s.original_value(),
        "dirty": s.is_dirty(),
        "valid": s.is_valid(),
        "categories": s.categories().iter().map(|c| c.name()).collect::<Vec<_>>(),
    })
}
