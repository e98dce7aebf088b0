use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use sqlweave::dialect::{self, DialectKind};
use sqlweave::execution::BoundQuery;
use sqlweave::ir::Node;
use sqlweave::sql;
use sqlweave::CompilerConfig;

/// Compile query IR to dialect SQL
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Format an IR tree (JSON) as SQL and print its parameters
    Format {
        /// JSON file holding a bound query or a bare node; `-` reads stdin
        input: PathBuf,

        /// Overrides the configured dialect
        #[arg(long, value_enum)]
        dialect: Option<DialectKind>,

        /// Skip the optimization pipeline
        #[arg(long)]
        no_optimize: bool,
    },
    /// List the optimization passes in pipeline order
    Passes,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Input {
    Query(BoundQuery),
    Node(Node),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = CompilerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Format {
            input,
            dialect: kind,
            no_optimize,
        } => {
            if let Some(kind) = kind {
                config.dialect = kind;
            }
            format_file(&config, &input, no_optimize)
        }
        Command::Passes => {
            for (name, description) in config.optimizer().describe() {
                println!("{:<28} {}", name, description);
            }
            Ok(())
        }
    }
}

fn format_file(config: &CompilerConfig, input: &Path, no_optimize: bool) -> Result<()> {
    let content = if input.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("reading stdin")?
    } else {
        std::fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?
    };
    let query = match serde_json::from_str::<Input>(&content)
        .with_context(|| format!("{} is not a query tree", input.display()))?
    {
        Input::Query(query) => query,
        Input::Node(node) => BoundQuery::new(node),
    };

    let dialect = config.dialect();
    let root = if no_optimize {
        query.root.clone()
    } else {
        config.optimizer().optimize(&query.root)
    };
    let amended = dialect::amend(dialect.as_ref(), &root);
    let formatted = sql::format(dialect.as_ref(), &amended)?;

    println!("{}", formatted.command_text);
    // Print bound values when the input supplies all of them, slots otherwise.
    match formatted.bind(&[], &query.parameters) {
        Ok(command) => println!("{}", serde_json::to_string_pretty(&command.parameters)?),
        Err(_) => println!("{}", serde_json::to_string_pretty(&formatted.parameters)?),
    }
    Ok(())
}
