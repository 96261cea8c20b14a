//! Batch processing command for multiple document files.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use docmem_core::{DocField, DocumentResult, RunStats};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory for per-file results
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: super::process::OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Print every document's interpretation log
    #[arg(long)]
    show_logs: bool,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = super::load_config(config_path)?;

    // Expand glob pattern
    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            matches!(ext.to_lowercase().as_str(), "pdf" | "docx")
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pipeline = super::build_pipeline(config).await?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );

    // Documents are processed one at a time on purpose: each AI-parsed
    // document teaches rules the next document of the same layout reuses.
    let mut results = Vec::with_capacity(files.len());
    let mut stats = RunStats::default();

    for path in &files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document");
        pb.set_message(name.to_string());

        let result = pipeline.process_path(path).await;
        stats.record(&result);

        if let (Some(_), Some(output_dir)) = (&result.parsed, &args.output_dir) {
            write_file_output(path, &result, output_dir, args.format)?;
        }

        results.push(result);
        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    if args.show_logs {
        for result in &results {
            println!();
            println!("{}", style(&result.file_name).bold());
            for line in &result.log {
                println!("  {}", line);
            }
        }
    }

    // Generate summary if requested
    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    // Print summary
    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} by rule, {} by AI, {} failed",
        style(stats.rule_count).green(),
        style(stats.ai_count).cyan(),
        style(stats.failed_count).red()
    );

    let failed: Vec<_> = results.iter().filter(|r| !r.status.is_success()).collect();
    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!("  - {}: {}", result.file_name, result.status);
        }
    }

    Ok(())
}

fn write_file_output(
    path: &PathBuf,
    result: &DocumentResult,
    output_dir: &PathBuf,
    format: super::process::OutputFormat,
) -> anyhow::Result<()> {
    let output_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");

    let extension = match format {
        super::process::OutputFormat::Json => "json",
        super::process::OutputFormat::Csv => "csv",
        super::process::OutputFormat::Text => "txt",
    };

    let output_path = output_dir.join(format!("{}_parsed.{}", output_name, extension));
    let content = super::process::format_result(result, format)?;

    fs::write(&output_path, content)?;
    debug!("Wrote output to {}", output_path.display());

    Ok(())
}

fn write_summary(path: &PathBuf, results: &[DocumentResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = vec!["file_name", "status", "parsing_method", "signature"];
    header.extend(DocField::ALL.iter().map(|f| f.as_str()));
    wtr.write_record(&header)?;

    for result in results {
        let mut record = vec![result.file_name.clone(), result.status.to_string()];

        match &result.parsed {
            Some(parsed) => {
                record.push(parsed.metadata.parsing_method.as_str().to_string());
                record.push(parsed.metadata.signature_used.clone());
                for field in DocField::ALL {
                    record.push(parsed.data.value(field).unwrap_or_default().to_string());
                }
            }
            None => {
                record.extend(std::iter::repeat_n(String::new(), 2 + DocField::ALL.len()));
            }
        }

        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}
