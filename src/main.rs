use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use md2epub::{
    pandoc_version, ConversionRequest, JobOutcome, OutputMode, PandocConverter, RunSummary,
};
use std::path::PathBuf;
use std::process;
use tokio::fs;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "md2epub")]
#[command(about = "CLI utility to turn Markdown files and folders into ePub books")]
#[command(version = "0.1.0")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert Markdown files to ePub, one book per file or one merged book
    Convert(ConvertArgs),
    /// Write the bundled e-book stylesheet for customization
    Css {
        /// Where to write the stylesheet
        #[arg(short, long, default_value = "style.css")]
        output: PathBuf,
    },
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Markdown files or directories containing them
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Combine all inputs into a single ePub instead of one per file
    #[arg(short, long)]
    merge: bool,

    /// Include subdirectories when scanning directories
    #[arg(short, long)]
    recursive: bool,

    /// Output directory for the generated books
    #[arg(short = 'o', long = "outDir")]
    out_dir: Option<PathBuf>,

    /// Author recorded in the book metadata (overrides frontmatter)
    #[arg(short, long)]
    author: Option<String>,

    /// Book title (overrides frontmatter)
    #[arg(short, long)]
    title: Option<String>,

    /// Language code (overrides frontmatter, defaults to "en")
    #[arg(short, long)]
    language: Option<String>,

    /// Description recorded in the book metadata
    #[arg(long)]
    description: Option<String>,

    /// Publisher recorded in the book metadata
    #[arg(long)]
    publisher: Option<String>,

    /// Publication date (YYYY-MM-DD)
    #[arg(long)]
    date: Option<String>,

    /// Stylesheet to embed (default: style.css in the working directory)
    #[arg(short, long)]
    css: Option<PathBuf>,

    /// Don't embed any stylesheet
    #[arg(long = "no-css")]
    no_css: bool,
}

async fn convert(args: ConvertArgs) -> Result<RunSummary> {
    match pandoc_version().await {
        Some(version) => info!("Pandoc detected: {}", version.green()),
        None => {
            error!("{}", "Pandoc is not installed!".red());
            error!("Installation instructions:");
            error!("  macOS:   {}", "brew install pandoc".cyan());
            error!("  Linux:   {}", "sudo apt install pandoc".cyan());
            error!(
                "  Windows: download from {}",
                "https://pandoc.org/installing.html".cyan()
            );
            anyhow::bail!("pandoc is required to generate ePub files");
        }
    }

    let stylesheet = if args.no_css {
        None
    } else {
        md2epub::resolve_stylesheet(args.css.as_deref(), false).await?
    };
    if let Some(path) = &stylesheet {
        info!("Using stylesheet: {}", path.display().to_string().blue());
    }

    let mode = resolve_mode(&args.inputs, args.merge).await?;

    let request = ConversionRequest {
        inputs: args.inputs,
        mode,
        title: args.title,
        author: args.author,
        language: args.language,
        description: args.description,
        publisher: args.publisher,
        date: args.date,
        stylesheet,
        out_dir: args.out_dir,
        recursive: args.recursive,
    };

    let converter = PandocConverter::default();
    let summary = md2epub::run(&request, &converter).await?;
    Ok(summary)
}

/// One markdown file means a single book; anything else is per-file batch
/// unless --merge asks for one combined book.
async fn resolve_mode(inputs: &[PathBuf], merge: bool) -> Result<OutputMode> {
    if merge {
        return Ok(OutputMode::Merge);
    }
    if inputs.len() == 1 && fs::metadata(&inputs[0]).await?.is_file() {
        return Ok(OutputMode::Single);
    }
    Ok(OutputMode::Batch)
}

fn report(summary: &RunSummary) {
    for outcome in &summary.outcomes {
        match outcome {
            JobOutcome::Succeeded { unit, artifact } => {
                info!(
                    "{} \"{}\" -> {}",
                    "✓".green(),
                    unit,
                    artifact.display().to_string().blue()
                );
            }
            JobOutcome::Failed {
                unit,
                sources,
                reason,
            } => {
                let origins: Vec<String> =
                    sources.iter().map(|p| p.display().to_string()).collect();
                error!(
                    "{} \"{}\" ({}): {}",
                    "✗".red(),
                    unit,
                    origins.join(", "),
                    reason
                );
            }
        }
    }

    info!(
        "Conversion complete: {}/{} unit(s) succeeded",
        summary.succeeded(),
        summary.outcomes.len()
    );
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::from_default_env().add_directive("md2epub=info".parse().unwrap());

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let args = Args::parse();

    let result = match args.command {
        Commands::Convert(convert_args) => match convert(convert_args).await {
            Ok(summary) => {
                report(&summary);
                if summary.is_success() {
                    Ok(())
                } else {
                    Err(anyhow::anyhow!("no unit was converted successfully"))
                }
            }
            Err(e) => Err(e),
        },
        Commands::Css { output } => md2epub::write_default(&output)
            .await
            .map_err(anyhow::Error::from),
    };

    if let Err(e) = result {
        error!("{}", format!("Error: {}", e).red());
        process::exit(1);
    }
}
