//! doclens CLI - Command-line interface
//!
//! Usage:
//!   doclens analyze "some text"
//!   doclens analyze --file report.txt --pretty
//!   cat report.txt | doclens analyze
//!   doclens labels
//!   doclens check

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use doclens_analyzer::{DocumentAnalyzer, DOCUMENT_TYPE_LABELS};
use doclens_core::{AppConfig, LoggingConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "doclens")]
#[command(about = "Extract entities, key phrases and document type from text")]
#[command(version)]
struct Cli {
    /// TOML configuration file (environment variables override it)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a text and print the result as JSON
    Analyze {
        /// Text to analyze (reads stdin when neither TEXT nor --file is given)
        text: Option<String>,

        /// Read the text from a file
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(short, long)]
        pretty: bool,
    },
    /// List the candidate document types
    Labels,
    /// Build the analyzer and probe both providers
    Check,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    Ok(config.with_env_override()?)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_input(text: Option<String>, file: Option<PathBuf>) -> anyhow::Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }

    if let Some(path) = file {
        return std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()));
    }

    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read stdin")?;
    Ok(buf)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;

    init_tracing(&config.logging);

    match cli.command {
        Commands::Analyze { text, file, pretty } => {
            let input = read_input(text, file)?;
            let analyzer = DocumentAnalyzer::from_config(&config).await?;
            let result = analyzer.analyze(&input).await?;

            let json = if pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            println!("{json}");
        }
        Commands::Labels => {
            for label in DOCUMENT_TYPE_LABELS {
                println!("{label}");
            }
        }
        Commands::Check => {
            config.analyzer.verify_providers = true;
            DocumentAnalyzer::from_config(&config).await?;
            println!(
                "ok: {} ({}) and {} are available",
                config.engine.model, config.engine.provider, config.classifier.model
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_args() {
        let cli = Cli::parse_from(["doclens", "analyze", "--pretty", "Phase 3 trial"]);
        match cli.command {
            Commands::Analyze { text, file, pretty } => {
                assert_eq!(text.as_deref(), Some("Phase 3 trial"));
                assert!(file.is_none());
                assert!(pretty);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_text_and_file_conflict() {
        let parsed = Cli::try_parse_from(["doclens", "analyze", "text", "--file", "a.txt"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_read_input_prefers_inline_text() {
        let input = read_input(Some("inline".to_string()), None).unwrap();
        assert_eq!(input, "inline");
    }
}
