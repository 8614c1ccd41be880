use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use codeswarm::cli::commands;

#[derive(Parser)]
#[command(name = "codeswarm")]
#[command(
    version,
    about = "Quality-gated multi-agent code generation with a learning knowledge store"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Use this config file instead of the global/project chain
    #[arg(long, short, global = true, env = "CODESWARM_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, short, global = true, conflicts_with = "quiet")]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the multi-agent workflow for a task
    Run {
        #[arg(help = "Task description")]
        task: String,
        #[arg(long, help = "Image or mockup reference for the vision stage")]
        image: Option<String>,
        #[arg(long, help = "Quality threshold override (0-100)")]
        threshold: Option<f64>,
        #[arg(long = "max-iterations", help = "Workflow gate iterations override")]
        max_iterations: Option<u32>,
        #[arg(long, help = "Print the result as JSON")]
        json: bool,
    },

    /// Rate a stored pattern
    Feedback {
        #[arg(help = "Pattern ID")]
        pattern_id: String,
        #[arg(long = "code-quality", help = "Code quality rating (1-5)")]
        code_quality: u8,
        #[arg(long = "context-quality", help = "Context quality rating (1-5)")]
        context_quality: u8,
        #[arg(long, help = "Documentation URL that did not help (repeatable)")]
        unhelpful: Vec<String>,
        #[arg(long)]
        comment: Option<String>,
        #[arg(long = "retry-session", help = "Follow-up session started from this feedback")]
        retry_session: Option<String>,
    },

    /// Flag documentation as unhelpful under an existing feedback record
    FlagDoc {
        #[arg(help = "Feedback ID")]
        feedback_id: String,
        #[arg(required = true, help = "Documentation URL(s)")]
        urls: Vec<String>,
    },

    /// Attach a repository URL to a stored pattern
    LinkRepo {
        #[arg(help = "Pattern ID")]
        pattern_id: String,
        #[arg(help = "Repository URL")]
        url: String,
    },

    /// Show knowledge store statistics
    Stats {
        #[arg(long, help = "Print as JSON")]
        json: bool,
    },

    /// Manage the search cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Delete expired cache entries
    Purge,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(long, help = "Print as JSON instead of TOML")]
        json: bool,
    },
    /// Show configuration file paths
    Path,
    /// Write a default project configuration
    Init {
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Route panics through tracing before the default hook prints the backtrace
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        match panic_info.location() {
            Some(location) => tracing::error!(
                file = location.file(),
                line = location.line(),
                "codeswarm panicked: {}",
                message
            ),
            None => tracing::error!("codeswarm panicked: {}", message),
        }

        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    // Logs on stderr keep stdout clean for --json
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Run {
            task,
            image,
            threshold,
            max_iterations,
            json,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::run::run(commands::run::RunOptions {
                task,
                image,
                threshold,
                max_iterations,
                json,
                config_path: cli.config.clone(),
            }))?;
        }
        Commands::Feedback {
            pattern_id,
            code_quality,
            context_quality,
            unhelpful,
            comment,
            retry_session,
        } => {
            commands::feedback::run(
                commands::feedback::FeedbackOptions {
                    pattern_id,
                    code_quality,
                    context_quality,
                    unhelpful,
                    comment,
                    retry_session,
                },
                config_path,
            )?;
        }
        Commands::FlagDoc { feedback_id, urls } => {
            commands::feedback::flag_docs(&feedback_id, &urls, config_path)?;
        }
        Commands::LinkRepo { pattern_id, url } => {
            commands::repo::link(&pattern_id, &url, config_path)?;
        }
        Commands::Stats { json } => {
            commands::stats::run(json, config_path)?;
        }
        Commands::Cache { action } => match action {
            CacheAction::Purge => commands::cache::purge(config_path)?,
        },
        Commands::Config { action } => match action {
            ConfigAction::Show { json } => commands::config::show(json, config_path)?,
            ConfigAction::Path => commands::config::path()?,
            ConfigAction::Init { force } => commands::config::init(force)?,
        },
    }

    Ok(())
}
