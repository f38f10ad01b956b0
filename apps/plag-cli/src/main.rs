//! plagcheck - PDF plagiarism checker
//!
//! Compares a PDF against a corpus directory and prints a signed JSON
//! report. Reports go to stdout, logs to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use plag_core::{verify_json, PlagChecker, PlagConfig, ScanStore};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "plagcheck")]
#[command(version, about = "Check PDFs for plagiarism against a reference corpus")]
struct Args {
    /// Directory of reference PDFs (overrides PLAG_CORPUS_DIR)
    #[arg(long, global = true)]
    corpus_dir: Option<PathBuf>,

    /// Directory holding the keystore and master key (overrides PLAG_KEY_DIR)
    #[arg(long, global = true)]
    key_dir: Option<PathBuf>,

    /// Directory for scan artifacts (overrides PLAG_UPLOAD_DIR)
    #[arg(long, global = true)]
    upload_dir: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze, sign and store an upload as a sealed, highlighted scan
    Scan {
        pdf: PathBuf,
        /// Name recorded in the scan summary (default: the file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Analyze a PDF and print the signed report
    Analyze {
        pdf: PathBuf,
        /// Also write a highlighted copy to this path
        #[arg(long, value_name = "OUT")]
        annotate: Option<PathBuf>,
    },
    /// Write a copy of a PDF with corpus matches highlighted
    Annotate { pdf: PathBuf, output: PathBuf },
    /// Check the signature of a report JSON file
    Verify { report: PathBuf },
    /// Decrypt a sealed artifact
    Decrypt { input: PathBuf, output: PathBuf },
    /// List stored scans
    Scans,
    /// Print the signing public key, creating keys if needed
    Keys,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries reports only
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(args: &Args) -> Result<PlagConfig> {
    let mut config = PlagConfig::from_env().context("invalid environment configuration")?;
    if let Some(dir) = &args.corpus_dir {
        config = config.with_corpus_dir(dir);
    }
    if let Some(dir) = &args.key_dir {
        config = config.with_key_dir(dir);
    }
    if let Some(dir) = &args.upload_dir {
        config = config.with_upload_dir(dir);
    }
    Ok(config)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(args.json_logs);

    let config = load_config(&args)?;
    let checker = PlagChecker::new(config);

    match &args.command {
        Command::Scan { pdf, name } => {
            let name = name.clone().unwrap_or_else(|| file_name(pdf));
            let outcome = ScanStore::new(&checker)
                .run_scan(pdf, &name)
                .with_context(|| format!("scan of {} failed", pdf.display()))?;
            info!(scan_id = %outcome.summary.scan_id, path = %outcome.pdf_path.display(), "scan stored");
            print_json(&serde_json::json!({
                "scan": outcome.summary,
                "report": outcome.report,
            }))?;
        }
        Command::Analyze { pdf, annotate } => {
            let signed = checker
                .analyze_and_sign(pdf, annotate.as_deref())
                .with_context(|| format!("analysis of {} failed", pdf.display()))?;
            if let Some(output) = annotate {
                info!(path = %output.display(), "annotated PDF written");
            }
            print_json(&signed)?;
        }
        Command::Annotate { pdf, output } => {
            let written = checker
                .annotate(pdf, output)
                .with_context(|| format!("annotation of {} failed", pdf.display()))?;
            println!("{}", written.display());
        }
        Command::Verify { report } => {
            let json = std::fs::read_to_string(report)
                .with_context(|| format!("cannot read {}", report.display()))?;
            let verified = verify_json(&json)
                .with_context(|| format!("{} failed verification", report.display()))?;
            info!(file = %verified.file, "signature valid");
            println!("OK");
        }
        Command::Decrypt { input, output } => {
            plag_crypto::decrypt_file(checker.keys(), input, output)
                .with_context(|| format!("cannot decrypt {}", input.display()))?;
            println!("{}", output.display());
        }
        Command::Scans => {
            let scans = ScanStore::new(&checker).list_scans()?;
            let listing: Vec<serde_json::Value> = scans
                .iter()
                .map(|scan| {
                    serde_json::json!({
                        "scanId": scan.scan_id,
                        "path": scan.pdf_path.display().to_string(),
                        "summary": scan.summary,
                    })
                })
                .collect();
            print_json(&listing)?;
        }
        Command::Keys => {
            let (path, public_key) = checker.keys().ensure_keypair()?;
            let fingerprint = checker.keys().ensure_master_key()?.fingerprint();
            info!(keystore = %path.display(), master_key = %fingerprint, "keys ready");
            print!("{}", public_key);
        }
    }

    Ok(())
}
