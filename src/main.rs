use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use auzoom::config::Settings;
use auzoom::mcp::{ToolDispatcher, serve_stdio};

#[derive(Parser)]
#[command(name = "auzoom")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-resolution code navigation for LLM agents")]
struct Cli {
    /// Project root (defaults to the current working directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the navigation tools over stdio (default)
    Serve,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Config,

    /// Call one tool directly without a server (embedded mode)
    Mcp {
        /// Tool name: read, find, get_dependencies, get_calls, stats
        tool: String,

        /// Tool arguments as JSON
        #[arg(long)]
        args: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let project_root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("cannot determine working directory")?,
    };

    let settings = Settings::load(&project_root).unwrap_or_else(|e| {
        eprintln!("Warning: configuration error: {e}. Using defaults.");
        Settings::default()
    });
    auzoom::logging::init_with_config(&settings.logging);

    match cli.command {
        Some(Commands::Init { force }) => {
            let path = Settings::init_config_file(&project_root, force)
                .map_err(|e| anyhow::anyhow!(e))?;
            println!("Created configuration file at: {}", path.display());
            println!("Edit this file to customize your settings.");
            Ok(())
        }

        Some(Commands::Config) => {
            let toml_string =
                toml::to_string_pretty(&settings).context("cannot display configuration")?;
            println!("{toml_string}");
            Ok(())
        }

        Some(Commands::Mcp { tool, args }) => {
            let args: serde_json::Value = match args {
                Some(text) => serde_json::from_str(&text).context("invalid --args JSON")?,
                None => serde_json::json!({}),
            };

            // One-shot call: background warming would outlive its usefulness
            let mut settings = settings;
            settings.auto_warm = false;

            let dispatcher = ToolDispatcher::new(&project_root, Arc::new(settings))
                .context("cannot open project")?;
            let result = dispatcher.dispatch(&tool, &args);
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }

        Some(Commands::Serve) | None => {
            let dispatcher = ToolDispatcher::new(&project_root, Arc::new(settings))
                .context("cannot open project")?;
            tracing::info!(
                "Serving navigation tools for {} on stdio",
                dispatcher.project_root().display()
            );
            serve_stdio(dispatcher)
        }
    }
}
