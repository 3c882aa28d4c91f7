use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a raw tool result and show how it would be rendered
    Parse {
        /// File holding the raw result; reads stdin when omitted
        file: Option<PathBuf>,
    },

    /// Insert cache markers into a conversation history file
    Annotate {
        /// Conversation JSON file
        file: PathBuf,

        /// Model whose capabilities apply (defaults to the configured model_id)
        #[arg(short, long)]
        model: Option<String>,

        /// Settings file (defaults to canvas.toml/canvas.json plus CANVAS_* variables)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Substitute image references in tool-call arguments
    Resolve {
        /// Tool-call arguments JSON file
        file: PathBuf,

        /// Register an image, e.g. --image image_1=person.png
        #[arg(short, long = "image", value_name = "NAME=PATH")]
        images: Vec<String>,
    },
}

fn initialize_logging(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_logging(cli.verbose);

    let output = match cli.command {
        Command::Parse { file } => commands::parse(file.as_deref())?,
        Command::Annotate {
            file,
            model,
            config,
        } => commands::annotate(&file, model.as_deref(), config.as_deref())?,
        Command::Resolve { file, images } => commands::resolve(&file, &images)?,
    };
    println!("{}", output);
    Ok(())
}
