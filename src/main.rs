//! Ormlet CLI - runs the mapping demonstrations against SQLite

use clap::{Parser, Subcommand};
use ormlet::config::{self, OrmletConfig};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{RunContext, Variant};

#[derive(Parser)]
#[command(name = "ormlet")]
#[command(version)]
#[command(about = "Minimal object-relational mapping over SQLite")]
#[command(long_about = r#"
Ormlet maps plain structs to SQLite tables and replays two demonstrations:
  • basic       one users table, two users, query all
  • relational  users with a 1:1 auth record and 1:N posts

Example usage:
  ormlet basic
  ormlet relational --json
  ormlet schema --variant relational
  ormlet --database ./demo.db relational
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log every SQL statement
    #[arg(long, global = true)]
    echo: bool,

    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file (defaults to ./ormlet.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file, or :memory: (default)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Single users table: insert two users and list them
    Basic,

    /// Users, auth records and posts: 1:1 and 1:N relationships
    Relational,

    /// Print the generated schema
    Schema {
        /// Which model set to print
        #[arg(long, value_enum, default_value = "relational")]
        variant: Variant,
    },

    /// Write a starter ormlet.toml
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        matches!(self, OutputMode::Human)
    }
}

/// Print a JSON success envelope
pub fn emit_success(
    output_mode: OutputMode,
    command: &str,
    data: serde_json::Value,
) -> anyhow::Result<()> {
    if output_mode == OutputMode::Json {
        let envelope = serde_json::json!({
            "ok": true,
            "command": command,
            "data": data,
        });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };

    if let Err(e) = run(cli, output_mode) {
        match output_mode {
            OutputMode::Human => ormlet::ui::error(&format!("{:#}", e)),
            OutputMode::Json => {
                let envelope = serde_json::json!({ "ok": false, "error": format!("{:#}", e) });
                println!("{}", envelope);
            }
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, output_mode: OutputMode) -> anyhow::Result<()> {
    let file_config = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    let echo = cli.echo || file_config.echo();

    // Initialize logging
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = if echo {
        EnvFilter::new(format!("{},ormlet::sql=debug", level))
    } else {
        EnvFilter::new(format!("{},ormlet::sql=info", level))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let ctx = RunContext {
        output_mode,
        database: file_config.database_path(cli.database.as_deref()),
    };

    match cli.command {
        Commands::Basic => commands::run_basic(&ctx),
        Commands::Relational => commands::run_relational(&ctx),
        Commands::Schema { variant } => commands::run_schema(&ctx, variant),
        Commands::Init { force } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            commands::run_init(&ctx, &path, &OrmletConfig::starter(), force)
        }
    }
}
