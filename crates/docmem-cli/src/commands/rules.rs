//! Rules command - inspect learned layout rules.

use clap::{Args, Subcommand};
use console::style;

use docmem_core::{LayoutSignature, RuleStore, SqliteRuleStore};

/// Arguments for the rules command.
#[derive(Args)]
pub struct RulesArgs {
    #[command(subcommand)]
    command: RulesCommand,
}

#[derive(Subcommand)]
enum RulesCommand {
    /// List learned layouts
    List,

    /// Show the rules stored for one layout
    Show {
        /// Layout signature (full, or an unambiguous prefix)
        signature: String,
    },
}

pub async fn run(args: RulesArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let store = SqliteRuleStore::open(&config.store.db_path).await?;

    match args.command {
        RulesCommand::List => list_layouts(&store).await,
        RulesCommand::Show { signature } => show_rules(&store, &signature).await,
    }
}

async fn list_layouts(store: &SqliteRuleStore) -> anyhow::Result<()> {
    let layouts = store.list_layouts().await?;

    if layouts.is_empty() {
        println!("No layouts learned yet. Process a few documents first.");
        return Ok(());
    }

    println!(
        "{}",
        style(format!("{:<14} {:<18} {:>5}", "SIGNATURE", "LEARNED", "RULES")).bold()
    );
    for layout in &layouts {
        let learned = chrono::DateTime::parse_from_rfc3339(&layout.created_at)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|_| layout.created_at.clone());
        println!(
            "{:<14} {:<18} {:>5}",
            &layout.signature[..12.min(layout.signature.len())],
            learned,
            layout.rule_count
        );
    }

    println!();
    println!("{} layouts total", layouts.len());

    Ok(())
}

async fn show_rules(store: &SqliteRuleStore, prefix: &str) -> anyhow::Result<()> {
    let layouts = store.list_layouts().await?;
    let matches: Vec<_> = layouts
        .iter()
        .filter(|l| l.signature.starts_with(prefix))
        .collect();

    let layout = match matches.as_slice() {
        [] => anyhow::bail!("No learned layout matches '{}'", prefix),
        [one] => *one,
        _ => anyhow::bail!(
            "Signature prefix '{}' is ambiguous ({} matches)",
            prefix,
            matches.len()
        ),
    };

    let signature = LayoutSignature::from_hex(layout.signature.clone());
    match store.find_rules(&signature).await? {
        Some(rules) => {
            println!("Layout {}", style(&layout.signature).bold());
            println!("Learned at {}", layout.created_at);
            println!();
            for (field, rule) in rules.iter() {
                println!("  {:<15} {}", format!("{field}:"), rule.pattern);
            }
        }
        None => {
            println!("Layout {} has no usable rules.", style(&layout.signature).bold());
            println!("Documents with this layout will be sent to the AI parser again.");
        }
    }

    Ok(())
}
