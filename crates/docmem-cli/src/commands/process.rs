//! Process command - extract data from a single document file.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::ProgressBar;
use tracing::debug;

use docmem_core::{DocField, DocumentResult, DocumentStatus, ParsedDocument};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF or DOCX)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Print the full interpretation log
    #[arg(long)]
    show_log: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = super::load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let pipeline = super::build_pipeline(config).await?;

    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Processing {}...", args.input.display()));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = pipeline.process_path(&args.input).await;

    pb.finish_and_clear();

    if args.show_log {
        eprintln!("{}", style("Interpretation log:").bold());
        for line in &result.log {
            eprintln!("  {}", line);
        }
        eprintln!();
    }

    println!("{} {}", style(&result.file_name).bold(), styled_status(result.status));

    let output = format_result(&result, args.format)?;
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else if !output.is_empty() {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    if !result.status.is_success() {
        anyhow::bail!("Processing ended with status: {}", result.status);
    }

    Ok(())
}

pub(super) fn styled_status(status: DocumentStatus) -> console::StyledObject<&'static str> {
    if status.is_success() {
        style(status.as_str()).green()
    } else if status == DocumentStatus::FatalError {
        style(status.as_str()).red()
    } else {
        style(status.as_str()).yellow()
    }
}

/// Format the parsed envelope. Failed documents produce no output; their
/// story is in the status line and the interpretation log.
pub(super) fn format_result(
    result: &DocumentResult,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let Some(parsed) = &result.parsed else {
        return Ok(String::new());
    };

    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(parsed)?),
        OutputFormat::Csv => format_csv(parsed),
        OutputFormat::Text => Ok(format_text(parsed)),
    }
}

fn format_csv(parsed: &ParsedDocument) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    // Write header
    let mut header = vec!["file_name", "parsing_method", "signature_used"];
    header.extend(DocField::ALL.iter().map(|f| f.as_str()));
    wtr.write_record(&header)?;

    // Write data
    let mut record = vec![
        parsed.metadata.file_name.clone(),
        parsed.metadata.parsing_method.as_str().to_string(),
        parsed.metadata.signature_used.clone(),
    ];
    for field in DocField::ALL {
        record.push(parsed.data.value(field).unwrap_or_default().to_string());
    }
    wtr.write_record(&record)?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(parsed: &ParsedDocument) -> String {
    let mut output = String::new();

    output.push_str(&format!("File: {}\n", parsed.metadata.file_name));
    output.push_str(&format!(
        "Method: {}\n",
        parsed.metadata.parsing_method.as_str()
    ));
    output.push_str(&format!("Signature: {}\n", parsed.metadata.signature_used));
    output.push('\n');

    output.push_str("Fields:\n");
    for (field, value) in parsed.data.iter() {
        match value {
            Some(v) => output.push_str(&format!("  {:<15} {}\n", format!("{field}:"), v)),
            None => output.push_str(&format!("  {:<15} (not found)\n", format!("{field}:"))),
        }
    }

    output
}
