//! sni CLI - Markdown to HTML with front matter extraction.
//!
//! Provides commands for:
//! - `render`: Render a document to HTML (or JSON with its metadata)
//! - `meta`: Print only the front matter of a document
//! - `tokens`: Dump the token stream of a document as JSON

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{MetaArgs, RenderArgs, TokensArgs};
use output::Output;

/// sni - Markdown to HTML with front matter extraction.
#[derive(Parser)]
#[command(name = "sni", version, about)]
struct Cli {
    /// Enable verbose output (info-level logs on stderr).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a markdown file.
    Render(RenderArgs),
    /// Print the front matter of a markdown file.
    Meta(MetaArgs),
    /// Print the token stream of a markdown file.
    Tokens(TokensArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Render(args) => args.execute(),
        Commands::Meta(args) => args.execute(&output),
        Commands::Tokens(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
