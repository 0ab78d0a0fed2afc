use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use report_cleaner::case::{self, locate, GroupShape};
use report_cleaner::settings::Settings;
use report_cleaner::text::RuleSet;
use report_cleaner::{CleanError, Pipeline};

#[derive(Parser)]
#[command(
    name = "report_cleaner",
    about = "Clean and fix Hebrew text extracted from medical report PDFs"
)]
struct Cli {
    /// Settings file (default: ./report_cleaner.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List case folders and whether their PDF was found, without processing
    Scan {
        mother: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Process every case folder of a mother folder
    Run {
        mother: PathBuf,
        /// Only these groups (base name or folder name); repeatable
        #[arg(long, num_args = 1..)]
        only: Vec<String>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
        /// Process groups one at a time
        #[arg(long)]
        sequential: bool,
        /// Worker threads
        #[arg(long)]
        threads: Option<usize>,
        /// No progress bar
        #[arg(short, long)]
        quiet: bool,
    },
    /// Process a single case folder
    Case {
        folder: PathBuf,
        /// Case name (default: the folder name)
        #[arg(long)]
        name: Option<String>,
        /// PDF file name inside the folder (default: <name>.pdf)
        #[arg(long)]
        pdf: Option<String>,
    },
    /// Print the normalization rule table
    Rules,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let t0 = Instant::now();
    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;

    let result = match cli.command {
        Commands::Scan { mother, json } => scan(&mother, json),
        Commands::Run {
            mother,
            only,
            json,
            sequential,
            threads,
            quiet,
        } => {
            let settings = Settings {
                parallel: settings.parallel && !sequential,
                threads: threads.or(settings.threads),
                progress: settings.progress && !quiet && !json,
            };
            run(&mother, &only, json, &settings)
        }
        Commands::Case { folder, name, pdf } => process_one(&folder, name, pdf),
        Commands::Rules => {
            println!("{}", serde_json::to_string_pretty(&RuleSet::default().table())?);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn scan(mother: &Path, json: bool) -> anyhow::Result<()> {
    let entries = case::survey(mother)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("No valid folders found!");
        println!("  Looking for folders named: 2 Hebrew letters + 3 digits (and optional Hebrew suffix)");
        println!("  Example: אה456, ננ449א, ננ449ב");
        return Ok(());
    }

    let folders: usize = entries.iter().map(|e| e.members.len()).sum();
    println!("Found {} folders in {} group(s):", folders, entries.len());
    for entry in &entries {
        let parts: Vec<String> = entry
            .members
            .iter()
            .map(|m| match m.document {
                Some(_) => m.name.clone(),
                None => format!("{} (no PDF)", m.name),
            })
            .collect();
        match entry.shape {
            GroupShape::Simple => println!("  • {}", parts.join(", ")),
            GroupShape::Split => println!("  • {} → [{}] (split)", entry.base, parts.join(", ")),
        }
    }

    let missing: usize = entries.iter().map(|e| e.missing_documents()).sum();
    if missing > 0 {
        println!("\n{missing} folder(s) without a matching PDF");
    }
    Ok(())
}

fn run(mother: &Path, only: &[String], json: bool, settings: &Settings) -> anyhow::Result<()> {
    if let Some(n) = settings.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .context("configuring worker threads")?;
    }

    let pipeline = Pipeline::pdf()?.parallel(settings.parallel);

    let pb = if settings.progress {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} group(s) done {msg}")?,
    );

    let summary = match pipeline.run_batch_with(mother, only, |report| {
        pb.set_message(report.base.clone());
        pb.inc(1);
    }) {
        Ok(summary) => summary,
        Err(e @ CleanError::NoCasesFound(_)) => {
            pb.finish_and_clear();
            if json {
                println!("{}", serde_json::to_string_pretty(&error_json(&e))?);
            } else {
                println!("{e}");
            }
            return Ok(());
        }
        Err(e) => {
            pb.finish_and_clear();
            return Err(e.into());
        }
    };
    pb.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        summary.print();
        if summary.success_groups > 0 {
            println!("\nCleaned files saved in their respective folders as [folder]_CLEANED.txt");
            println!("Merged split cases saved in the mother folder as [base]_cleaned_merged.txt");
        }
    }
    Ok(())
}

fn error_json(e: &CleanError) -> serde_json::Value {
    serde_json::json!({ "error": e.to_string(), "kind": e.kind() })
}

fn process_one(folder: &Path, name: Option<String>, pdf: Option<String>) -> anyhow::Result<()> {
    let name = match name {
        Some(n) => n,
        None => folder
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("cannot take a case name from {}", folder.display()))?,
    };
    if !folder.is_dir() {
        return Err(CleanError::NotFound(folder.to_path_buf()).into());
    }

    let pipeline = Pipeline::pdf()?;
    let output = match pdf {
        Some(file) => {
            let file = if file.to_lowercase().ends_with(".pdf") {
                file
            } else {
                format!("{file}.pdf")
            };
            let document = locate::locate_file(folder, &file).ok_or_else(|| {
                CleanError::DocumentNotFound {
                    folder: folder.to_path_buf(),
                    case: file[..file.len() - ".pdf".len()].to_string(),
                }
            })?;
            pipeline.process_document(folder, &name, &document)?
        }
        None => pipeline.process_case(folder, &name)?,
    };

    println!("Saved: {}", output.output.display());
    println!(
        "Stats: {} chars, {} lines ({} fixed, {} fell back)",
        output.chars, output.lines, output.repair.repaired, output.repair.fell_back
    );
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

// ── Tests ──
