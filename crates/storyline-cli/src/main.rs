use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "storyline")]
#[command(version)]
#[command(about = "Turn project creation events into a narrative timeline", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize a timeline through the narrative backend
    Synthesize {
        /// JSON array of creation events
        #[arg(long)]
        events: PathBuf,
        /// Project description
        #[arg(long)]
        project: String,
        /// TOML configuration file
        #[arg(long, env = "STORYLINE_CONFIG")]
        config: Option<PathBuf>,
        /// Replay a saved backend response instead of calling the backend
        #[arg(long)]
        fixture: Option<PathBuf>,
        /// Pretty-print the result
        #[arg(long)]
        pretty: bool,
    },
    /// Validate a saved backend response against its events, offline
    Validate {
        /// Backend output, raw JSON or fenced
        #[arg(long)]
        candidate: PathBuf,
        /// JSON array of creation events
        #[arg(long)]
        events: PathBuf,
        /// TOML configuration file
        #[arg(long, env = "STORYLINE_CONFIG")]
        config: Option<PathBuf>,
        /// Pretty-print the result
        #[arg(long)]
        pretty: bool,
    },
    /// Export JSON Schemas
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Export JSON Schema files for the wire types
    Export {
        /// Output directory (default: ./schemas)
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,
    },
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("storyline=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match dispatch(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Synthesize {
            events,
            project,
            config,
            fixture,
            pretty,
        } => {
            commands::synthesize(&commands::SynthesizeArgs {
                events,
                project,
                config,
                fixture,
                pretty,
            })
            .await
        }
        Commands::Validate {
            candidate,
            events,
            config,
            pretty,
        } => commands::validate(&candidate, &events, config.as_deref(), pretty),
        Commands::Schema { command } => match command {
            SchemaCommands::Export { out_dir } => {
                commands::schema_export(&out_dir)?;
                Ok(ExitCode::SUCCESS)
            }
        },
    }
}
