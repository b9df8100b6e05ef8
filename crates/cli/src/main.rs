use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli::{eval, server};
use knn_guard_core::config::{self, AppConfig};
use knn_guard_core::{dataset, pipeline};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref()).context("load config")?;

    match cli.command {
        Commands::Serve { bind } => run_serve(cfg, bind).await,
        Commands::Classify { message, json } => run_classify(cfg, message, json).await,
        Commands::Eval { dataset, json } => run_eval(cfg, dataset, json).await,
    }
}

#[derive(Parser)]
#[command(name = "knn-guard")]
#[command(about = "Nearest-neighbor prompt injection classifier", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index and serve POST /check
    Serve {
        /// Address to bind (host:port); overrides server.bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Classify a single message and exit
    Classify {
        /// Message text to classify
        message: String,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Score the classifier against a held-out labeled dataset (CSV or JSONL)
    Eval {
        dataset: PathBuf,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

async fn run_serve(cfg: AppConfig, bind: Option<String>) -> Result<()> {
    let classifier = pipeline::build_classifier(&cfg).await?;
    let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
    server::serve(classifier, &bind).await
}

async fn run_classify(cfg: AppConfig, message: String, json: bool) -> Result<()> {
    let classifier = pipeline::build_classifier(&cfg).await?;
    let result = classifier.classify(&message).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "{}: {}/{} malicious neighbors",
            result.status.as_str(),
            result.malicious_votes,
            result.total_considered
        );
        if result.sanitization.changed {
            println!("  normalized to: {}", result.cleaned_text);
        }
        for e in &result.evidence {
            println!("  [{}] {:.4} {}", i64::from(e.label), e.score, e.text);
        }
    }
    Ok(())
}

async fn run_eval(cfg: AppConfig, path: PathBuf, json: bool) -> Result<()> {
    let classifier = pipeline::build_classifier(&cfg).await?;
    let cases = dataset::load(&path).with_context(|| format!("load {}", path.display()))?;
    let report = eval::evaluate(&classifier, &cases).await;
    if json {
        let out = serde_json::json!({
            "report": &report,
            "accuracy": report.accuracy(),
            "precision": report.precision(),
            "recall": report.recall(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!(
            "cases {}, accuracy {:.3}, precision {:.3}, recall {:.3}, unknown {}, errors {}",
            report.total,
            report.accuracy(),
            report.precision(),
            report.recall(),
            report.unknown,
            report.errors
        );
        println!(
            "tp {} fp {} tn {} fn {}",
            report.true_positive, report.false_positive, report.true_negative, report.false_negative
        );
    }
    Ok(())
}
