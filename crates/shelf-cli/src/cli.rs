use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "shelf",
    about = "Shelf: inspect and edit schema-typed key-value stores",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Schema file (TOML) declaring keys and, optionally, a [store] table
    #[arg(short, long, global = true, default_value = "shelf.toml")]
    pub schema: PathBuf,

    /// Store document (JSON); created on first write
    #[arg(short, long, global = true, default_value = "shelf.json")]
    pub data: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print a key's value (default when unset)
    Get(GetArgs),
    /// Store a value; parsed as JSON, otherwise taken as a plain string
    Set(SetArgs),
    /// Delete a key's stored value
    Remove(RemoveArgs),
    /// Delete every entry, metadata included
    Clear(ClearArgs),
    /// Print every schema key with its current value
    List,
    /// Print the persisted schema-version record
    Metadata,
    /// Run the migration pass and report evicted keys
    Migrate,
}

#[derive(Args)]
pub struct GetArgs {
    pub key: String,
}

#[derive(Args)]
pub struct SetArgs {
    pub key: String,
    pub value: String,
}

#[derive(Args)]
pub struct RemoveArgs {
    pub key: String,
}

#[derive(Args)]
pub struct ClearArgs {
    /// Required; clearing cannot be undone
    #[arg(long)]
    pub yes: bool,
}
