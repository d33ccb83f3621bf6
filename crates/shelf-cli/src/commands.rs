use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::{json, Value};
use shelf::{Kind, TypedStore};
use shelf_backend::{FileBackend, KvBackend};

use crate::cli::*;
use crate::config::ShelfConfig;

type Store = TypedStore<FileBackend>;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let store = open_store(&cli)?;
    let format = cli.format;
    match cli.command {
        Command::Get(args) => cmd_get(&store, &args.key, format),
        Command::Set(args) => cmd_set(&store, &args.key, &args.value, format),
        Command::Remove(args) => cmd_remove(&store, &args.key, format),
        Command::Clear(args) => cmd_clear(&store, args, format),
        Command::List => cmd_list(&store, format),
        Command::Metadata => cmd_metadata(&store, format),
        Command::Migrate => cmd_migrate(&store, format),
    }
}

fn open_store(cli: &Cli) -> anyhow::Result<Store> {
    let config = ShelfConfig::load(&cli.schema)?;
    let backend = FileBackend::open(&cli.data)
        .with_context(|| format!("cannot open store {}", cli.data.display()))?;
    let store = TypedStore::with_options(config.schema, Arc::new(backend), config.options)?;
    Ok(store)
}

fn ensure_declared(store: &Store, key: &str) -> anyhow::Result<Kind> {
    match store.schema().descriptor(key) {
        Some(d) => Ok(d.kind),
        None => bail!("key `{key}` is not declared in the schema"),
    }
}

/// Interpret a command-line value for a key of `kind`.
///
/// String keys take the text verbatim; other kinds parse it as JSON,
/// falling back to a plain string when it does not parse.
pub(crate) fn parse_value(kind: Kind, raw: &str) -> Value {
    if kind == Kind::String {
        return Value::String(raw.to_string());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub(crate) fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("{s:?}"),
        other => other.to_string(),
    }
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_get(store: &Store, key: &str, format: OutputFormat) -> anyhow::Result<()> {
    ensure_declared(store, key)?;
    let value = store.get(key);
    let stored = store.contains(key);
    match format {
        OutputFormat::Json => print_json(&json!({ "key": key, "value": value, "stored": stored })),
        OutputFormat::Text => {
            let note = if stored { "" } else { " (default)" };
            println!("{} = {}{}", key.bold(), render_value(&value).cyan(), note.dimmed());
            Ok(())
        }
    }
}

fn cmd_set(store: &Store, key: &str, raw: &str, format: OutputFormat) -> anyhow::Result<()> {
    let kind = ensure_declared(store, key)?;
    let value = parse_value(kind, raw);
    store.set(key, value.clone());

    // `set` never fails loudly; confirm by reading back.
    let read_back = store.get(key);
    let confirmed = read_back == value;
    match format {
        OutputFormat::Json => print_json(&json!({
            "key": key,
            "written": value,
            "value": read_back,
            "confirmed": confirmed,
        })),
        OutputFormat::Text => {
            if confirmed {
                println!("{} {} = {}", "✓".green().bold(), key.bold(), render_value(&value).cyan());
            } else {
                println!(
                    "{} {} reads back as {} (declared kind: {})",
                    "!".yellow().bold(),
                    key.bold(),
                    render_value(&read_back).cyan(),
                    kind.to_string().yellow(),
                );
            }
            Ok(())
        }
    }
}

fn cmd_remove(store: &Store, key: &str, format: OutputFormat) -> anyhow::Result<()> {
    ensure_declared(store, key)?;
    let existed = store.contains(key);
    store.remove(key);
    match format {
        OutputFormat::Json => print_json(&json!({ "key": key, "removed": existed })),
        OutputFormat::Text => {
            if existed {
                println!("{} Removed {}", "✓".green(), key.bold());
            } else {
                println!("{} was not set", key.bold());
            }
            Ok(())
        }
    }
}

fn cmd_clear(store: &Store, args: ClearArgs, format: OutputFormat) -> anyhow::Result<()> {
    if !args.yes {
        bail!("refusing to clear without --yes");
    }
    let count = store.backend().keys()?.len();
    store.clear();
    match format {
        OutputFormat::Json => print_json(&json!({ "cleared": count })),
        OutputFormat::Text => {
            println!("{} Cleared {} entries", "✓".green().bold(), count);
            Ok(())
        }
    }
}

fn cmd_list(store: &Store, format: OutputFormat) -> anyhow::Result<()> {
    let rows: Vec<(String, Kind, Value, bool)> = store
        .schema()
        .iter()
        .map(|(key, d)| (key.to_string(), d.kind, store.get(key), store.contains(key)))
        .collect();

    match format {
        OutputFormat::Json => {
            let entries: Vec<Value> = rows
                .iter()
                .map(|(key, kind, value, stored)| {
                    json!({ "key": key, "kind": kind, "value": value, "stored": stored })
                })
                .collect();
            print_json(&Value::Array(entries))
        }
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("Schema declares no keys.");
            }
            for (key, kind, value, stored) in &rows {
                let marker = if *stored { "●".green() } else { "○".dimmed() };
                println!(
                    "{} {} {} = {}",
                    marker,
                    key.bold(),
                    format!("[{kind}]").dimmed(),
                    render_value(value).cyan()
                );
            }
            Ok(())
        }
    }
}

fn cmd_metadata(store: &Store, format: OutputFormat) -> anyhow::Result<()> {
    let metadata = store.metadata()?;
    match format {
        OutputFormat::Json => print_json(&serde_json::to_value(&metadata)?),
        OutputFormat::Text => {
            if metadata.is_empty() {
                println!("No versioned keys recorded.");
            }
            for (key, version) in metadata.iter() {
                println!("{} @ {}", key.bold(), version.to_string().yellow());
            }
            Ok(())
        }
    }
}

fn cmd_migrate(store: &Store, format: OutputFormat) -> anyhow::Result<()> {
    let report = store.last_migration();
    match format {
        OutputFormat::Json => print_json(&json!({
            "invalidated": report.invalidated,
            "metadata": report.metadata,
        })),
        OutputFormat::Text => {
            if report.is_noop() {
                println!("{} All versioned keys up to date.", "✓".green().bold());
            } else {
                for key in &report.invalidated {
                    println!("  {} {}", "evicted:".yellow(), key);
                }
            }
            Ok(())
        }
    }
}
