use std::io::{self, BufRead};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use contentshield::analyzer::{AnalysisReport, AnalysisRequest, Analyzer, BATCH_LIMIT};
use contentshield::config::Config;
use contentshield::normalize::Language;

/// ContentShield: dual-model harmful content detection.
///
/// Combines a keyword prefilter, a Llama Guard safety check, and a
/// scoring model into a single explained verdict per text.
#[derive(Parser)]
#[command(name = "contentshield", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single text
    Analyze {
        /// The text to classify
        text: String,

        /// Language of the text: auto, ko, or en
        #[arg(long, default_value = "auto")]
        language: String,

        /// Use only the scoring model (skip the Llama Guard check)
        #[arg(long)]
        single: bool,

        /// Fail instead of degrading to rule-only mode when no API key is set
        #[arg(long)]
        strict: bool,

        /// Print the full JSON report instead of the summary
        #[arg(long)]
        json: bool,
    },

    /// Analyze one text per stdin line (capped at the API batch limit)
    Batch {
        /// Language of the texts: auto, ko, or en
        #[arg(long, default_value = "auto")]
        language: String,

        /// Use only the scoring model (skip the Llama Guard check)
        #[arg(long)]
        single: bool,
    },

    /// Show configured models and credential status
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("contentshield=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            text,
            language,
            single,
            strict,
            json,
        } => {
            let config = Config::load()?;
            if strict {
                config.require_credentials()?;
            }
            let language: Language = language.parse()?;
            let analyzer = Analyzer::from_config(&config)?;

            let request = AnalysisRequest::new(text, language, !single);
            let report = analyzer.analyze(&request).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }

        Commands::Batch { language, single } => {
            let config = Config::load()?;
            let language: Language = language.parse()?;
            let analyzer = Analyzer::from_config(&config)?;

            let texts: Vec<String> = io::stdin()
                .lock()
                .lines()
                .map_while(Result::ok)
                .filter(|line| !line.trim().is_empty())
                .collect();

            if texts.is_empty() {
                println!("No input lines to analyze.");
                return Ok(());
            }
            if texts.len() > BATCH_LIMIT {
                println!(
                    "{}",
                    format!(
                        "Read {} lines; analyzing the first {BATCH_LIMIT}.",
                        texts.len()
                    )
                    .dimmed()
                );
            }

            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::with_template("{spinner} {msg}").expect("valid spinner template"),
            );
            spinner.set_message(format!(
                "Analyzing {} texts...",
                texts.len().min(BATCH_LIMIT)
            ));
            spinner.enable_steady_tick(std::time::Duration::from_millis(120));

            let results = analyzer.analyze_batch(&texts, language, !single).await;
            spinner.finish_and_clear();

            for (text, result) in texts.iter().zip(&results) {
                let preview: String = text.chars().take(40).collect();
                match result {
                    Ok(report) => {
                        let label = if report.is_malicious {
                            report.category.as_str().red().bold()
                        } else {
                            report.category.as_str().green()
                        };
                        println!(
                            "{label:>14}  tox {:5.1}  conf {:5.1}  {preview}",
                            report.toxicity_score, report.confidence_score
                        );
                    }
                    Err(e) => println!("{:>14}  {preview} ({e})", "error".yellow()),
                }
            }
        }

        Commands::Info => {
            let config = Config::load()?;
            println!("ContentShield configuration");
            println!("  endpoint:       {}", config.api_url);
            println!("  guard model:    {}", config.guard_model);
            println!("  scoring model:  {}", config.scoring_model);
            println!("  cache capacity: {}", config.cache_capacity);
            if config.has_credentials() {
                println!("  credentials:    {}", "configured".green());
            } else {
                println!(
                    "  credentials:    {} (rule-only fallback mode)",
                    "missing".yellow()
                );
            }
        }
    }

    Ok(())
}

fn print_report(report: &AnalysisReport) {
    let verdict = if report.is_malicious {
        "MALICIOUS".red().bold()
    } else {
        "SAFE".green().bold()
    };
    println!("{verdict}  category: {}", report.category.as_str().bold());
    println!();
    println!("  toxicity:    {:6.2}", report.toxicity_score);
    println!("  hate speech: {:6.2}", report.hate_speech_score);
    println!("  profanity:   {:6.2}", report.profanity_score);
    println!("  threat:      {:6.2}", report.threat_score);
    println!("  violence:    {:6.2}", report.violence_score);
    println!("  sexual:      {:6.2}", report.sexual_score);
    println!("  confidence:  {:6.2}", report.confidence_score);

    if !report.detected_keywords.is_empty() {
        println!();
        println!("  blocked terms: {}", report.detected_keywords.join(", "));
    }
    if let Some(guard) = &report.guard_result {
        println!();
        let guard_line = if guard.is_safe {
            "safe".green().to_string()
        } else {
            format!(
                "{} [{}]",
                "unsafe".red(),
                guard.violated_categories.join(", ")
            )
        };
        println!("  guard verdict: {guard_line}");
    }
    if !report.reasoning.is_empty() {
        println!();
        println!("  {}", report.reasoning.dimmed());
    }
    println!();
    println!(
        "{}",
        format!(
            "{} · {:.2} ms · {}",
            report.ai_model_version, report.processing_time_ms, report.analyzed_at
        )
        .dimmed()
    );
}
