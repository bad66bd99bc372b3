//! Command-line interface for wisdomreel.
//!
//! Provides commands for rendering a video, checking whether the
//! companion server is reachable, and showing the resolved configuration.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{CompanionProcess, ProcessSupervisor};
use crate::config;
use crate::core::VideoGenerationOrchestrator;
use crate::domain::GenerationRequest;

/// wisdomreel - Video generation orchestrator for wisdom entries
#[derive(Parser, Debug)]
#[command(name = "wisdomreel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a video for one entry
    Generate {
        /// Entry title
        #[arg(short, long)]
        title: String,

        /// Entry text (reads --input or stdin if not provided)
        #[arg(short, long)]
        content: Option<String>,

        /// Input file holding the entry text
        #[arg(short, long, conflicts_with = "content")]
        input: Option<PathBuf>,

        /// Kind of entry
        #[arg(long, default_value = "quote")]
        content_type: String,

        /// Source label shown with the entry
        #[arg(short, long, default_value = "")]
        source: String,
    },

    /// Check whether the companion server is reachable (never starts it)
    Status,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Generate {
                title,
                content,
                input,
                content_type,
                source,
            } => {
                let content = read_content(content, input)?;
                let request = GenerationRequest::new(title, content, content_type, source);
                generate_video(&request).await
            }
            Commands::Status => show_status().await,
            Commands::Config => show_config(),
        }
    }
}

/// Resolve entry text from the flag, a file, or piped stdin
fn read_content(content: Option<String>, input_file: Option<PathBuf>) -> Result<String> {
    let text = if let Some(text) = content {
        text
    } else if let Some(path) = input_file {
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        buffer
    } else {
        anyhow::bail!("No content provided. Use --content, --input <file> or pipe to stdin");
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        anyhow::bail!("Content is empty");
    }

    Ok(text)
}

/// Render one video, then stop the companion
async fn generate_video(request: &GenerationRequest) -> Result<()> {
    let cfg = config::config()?;
    let orchestrator = VideoGenerationOrchestrator::from_config(cfg)?;

    let result = orchestrator.generate(request).await;

    // Shutdown path: the companion never outlives the command
    orchestrator.shutdown().await;

    match result {
        Ok(video) => {
            println!("{}", video.path().display());
            Ok(())
        }
        Err(e) => {
            eprintln!("\n[Video generation failed: {}]", e);
            std::process::exit(1);
        }
    }
}

/// Report whether the companion answers on its endpoint
async fn show_status() -> Result<()> {
    let cfg = config::config()?;
    let process = CompanionProcess::new(&cfg.generator.endpoint, cfg.companion.clone())?;

    let state = if process.is_running().await {
        "running"
    } else {
        "not running"
    };

    println!("Companion server: {}", state);
    println!("Endpoint:         {}", cfg.generator.endpoint);
    println!("Probe address:    {}", process.address());

    Ok(())
}

fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("wisdomreel configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!("Home:        {}", cfg.home.display());
    println!();
    println!("Generator:");
    println!("  Endpoint:        {}", cfg.generator.endpoint);
    println!("  Request timeout: {}s", cfg.generator.client_timeout.as_secs());
    println!("  Deadline:        {}s", cfg.generator.deadline.as_secs());
    println!("  Max attempts:    {}", cfg.generator.max_attempts);
    println!(
        "  Retry base:      {}ms",
        cfg.generator.retry_base_delay.as_millis()
    );
    println!();
    println!("Companion:");
    println!(
        "  Command:         {} {}",
        cfg.companion.command,
        cfg.companion.args.join(" ")
    );
    if let Some(dir) = &cfg.companion.working_dir {
        println!("  Working dir:     {}", dir.display());
    }
    if let Some(log) = &cfg.companion.log_file {
        println!("  Log file:        {}", log.display());
    }
    println!(
        "  Startup timeout: {}s",
        cfg.companion.startup_timeout.as_secs()
    );

    Ok(())
}
