//! Config command - manage configuration.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;

use docmem_core::DocmemConfig;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Write a fresh configuration file with the defaults
    Init(InitArgs),

    /// Get a specific configuration value
    Get {
        /// Configuration key (e.g., "oracle.ollama.model")
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// New value
        value: String,
    },

    /// Show configuration file path
    Path,
}

#[derive(Args)]
struct InitArgs {
    /// Where to write the file (default: the user config directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite an existing file
    #[arg(long)]
    force: bool,
}

pub async fn run(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => show(),
        ConfigCommand::Init(init) => init_file(init),
        ConfigCommand::Get { key } => get_value(&key),
        ConfigCommand::Set { key, value } => set_value(&key, &value),
        ConfigCommand::Path => show_path(),
    }
}

fn config_file() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("docmem").join("config.json")
}

fn load_or_default(path: &Path) -> anyhow::Result<DocmemConfig> {
    if path.exists() {
        Ok(DocmemConfig::from_file(path)?)
    } else {
        Ok(DocmemConfig::default())
    }
}

/// Maps a dotted key to a JSON pointer: "oracle.ollama.model" becomes
/// "/oracle/ollama/model". Config keys never contain '/' or '~', so no
/// pointer escaping is needed.
fn pointer_for(key: &str) -> String {
    format!("/{}", key.replace('.', "/"))
}

fn show() -> anyhow::Result<()> {
    let path = config_file();
    if !path.exists() {
        println!(
            "{} No config file at {}, showing the defaults.",
            style("ℹ").blue(),
            path.display()
        );
    }
    let config = load_or_default(&path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn init_file(args: InitArgs) -> anyhow::Result<()> {
    let path = args.output.unwrap_or_else(config_file);
    if path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists, pass --force to overwrite it",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    DocmemConfig::default().save(&path)?;
    println!(
        "{} Wrote default configuration to {}",
        style("✓").green(),
        path.display()
    );
    Ok(())
}

fn get_value(key: &str) -> anyhow::Result<()> {
    let config = load_or_default(&config_file())?;
    let json = serde_json::to_value(&config)?;
    let value = json
        .pointer(&pointer_for(key))
        .ok_or_else(|| anyhow::anyhow!("unknown configuration key '{key}'"))?;
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn set_value(key: &str, raw: &str) -> anyhow::Result<()> {
    let path = config_file();
    let config = load_or_default(&path)?;

    // Values that parse as JSON keep their type; anything else is a string.
    let value: serde_json::Value =
        serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));

    let mut json = serde_json::to_value(&config)?;
    let (parent_ptr, leaf) = match key.rsplit_once('.') {
        Some((parent, leaf)) => (pointer_for(parent), leaf),
        None => (String::new(), key),
    };
    let parent = json
        .pointer_mut(&parent_ptr)
        .and_then(|v| v.as_object_mut())
        .ok_or_else(|| anyhow::anyhow!("unknown configuration key '{key}'"))?;
    if !parent.contains_key(leaf) {
        anyhow::bail!("unknown configuration key '{key}'");
    }
    parent.insert(leaf.to_string(), value.clone());

    // Round-tripping through the typed config rejects values of the wrong
    // shape before anything is written.
    let config: DocmemConfig = serde_json::from_value(json)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    config.save(&path)?;

    println!(
        "{} {} = {}",
        style("✓").green(),
        key,
        serde_json::to_string(&value)?
    );
    Ok(())
}

fn show_path() -> anyhow::Result<()> {
    let path = config_file();
    println!("Configuration file: {}", path.display());

    if path.exists() {
        println!("Status: {}", style("exists").green());
    } else {
        println!("Status: {}", style("not created").yellow());
        println!();
        println!("Run 'docmem config init' to create one.");
    }

    Ok(())
}
