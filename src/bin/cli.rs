//! CQL CLI - live GraphQL over JSON files.
//!
//! Usage:
//!   cql serve                    # Build the API, watch files, listen on .cql/cql.sock
//!   cql check                    # Build the API once and report what was found
//!   cql sdl                      # Print the synthesized schema
//!   cql query '<graphql>'        # Run a query (daemon if running, else one-shot)
//!   cql subscribe '<graphql>'    # Print subscription events as they arrive
//!   cql reload <collection>      # Ask the daemon to re-read a data file
//!   cql stop                     # Stop the daemon

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cql::daemon::{self, Request, Response};
use cql::{build_api, Config};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cql")]
#[command(about = "CQL - live GraphQL over a directory of JSON files", long_about = None)]
struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Directory holding the collection data files (overrides cql.toml)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Type descriptor document (default: <data-dir>/.schema.json)
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the API, watch data files, and serve on a Unix socket
    Serve {
        /// Do not watch data files for changes
        #[arg(long)]
        no_watch: bool,
    },

    /// Build the API once and report types and collections
    Check,

    /// Print the schema in SDL form
    Sdl,

    /// Execute a GraphQL query
    Query {
        /// Query document
        query: String,

        /// Variables as a JSON object
        #[arg(short, long)]
        variables: Option<String>,
    },

    /// Stream subscription events from the running daemon
    Subscribe {
        /// Subscription document, e.g. 'subscription { teamAdded { name } }'
        query: String,

        /// Exit after this many events
        #[arg(short, long)]
        count: Option<usize>,
    },

    /// Re-read a collection's data file in the running daemon
    Reload {
        /// Collection name (data file name without extension)
        collection: String,
    },

    /// Stop the running daemon
    Stop,
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let root = cli.root.canonicalize().unwrap_or(cli.root);
    let config = load_config(&root, cli.data_dir, cli.schema)?;

    match cli.command {
        Commands::Serve { no_watch } => {
            if daemon::is_daemon_running(&root) {
                bail!("daemon already running for {}", root.display());
            }
            let mut config = config;
            config.watch = config.watch && !no_watch;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(daemon::start_daemon(&root, config))
        }

        Commands::Check => {
            let api = build_api(&config)?;
            println!("Types: {}", api.registry.len());
            for object in api.registry.iter() {
                println!("  {} ({} fields)", object.type_name, object.fields().len());
            }
            println!("Collections:");
            for collection in api.loader.collections() {
                println!(
                    "  {} -> [{}] ({} records)",
                    collection.name(),
                    api.registry
                        .get(collection.singular())
                        .map(|t| t.type_name.as_str())
                        .unwrap_or("?"),
                    collection.snapshot().len()
                );
            }
            Ok(())
        }

        Commands::Sdl => {
            if daemon::is_daemon_running(&root) {
                let data = expect_ok(daemon::send_request(&root, Request::Sdl)?)?;
                println!("{}", data.as_str().unwrap_or_default());
            } else {
                println!("{}", build_api(&config)?.sdl());
            }
            Ok(())
        }

        Commands::Query { query, variables } => {
            let variables = variables
                .map(|v| serde_json::from_str::<serde_json::Value>(&v))
                .transpose()
                .context("variables must be a JSON object")?;

            if daemon::is_daemon_running(&root) {
                let data = expect_ok(daemon::send_request(&root, Request::Query { query, variables })?)?;
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                // No daemon: build once and answer from disk.
                let api = build_api(&config)?;
                let mut request = async_graphql::Request::new(query);
                if let Some(vars) = variables {
                    request = request.variables(async_graphql::Variables::from_json(vars));
                }
                let runtime = tokio::runtime::Runtime::new()?;
                let response = runtime.block_on(api.schema.execute(request));
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
            Ok(())
        }

        Commands::Subscribe { query, count } => {
            require_daemon(&root)?;
            let mut seen = 0usize;
            daemon::subscribe(&root, &query, |event| {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => eprintln!("Error: {}", e),
                }
                seen += 1;
                count.map_or(true, |limit| seen < limit)
            })
        }

        Commands::Reload { collection } => {
            require_daemon(&root)?;
            let data = expect_ok(daemon::send_request(&root, Request::Reload { collection })?)?;
            println!(
                "{}: {} records (+{} ~{} -{})",
                data["collection"].as_str().unwrap_or_default(),
                data["records"],
                data["added"],
                data["changed"],
                data["deleted"]
            );
            Ok(())
        }

        Commands::Stop => {
            require_daemon(&root)?;
            match daemon::send_request(&root, Request::Shutdown)? {
                Response::Goodbye => println!("daemon stopped"),
                other => bail!("unexpected response: {:?}", other),
            }
            Ok(())
        }
    }
}

/// `cql.toml` under the root, then command-line overrides.
fn load_config(root: &Path, data_dir: Option<PathBuf>, schema: Option<PathBuf>) -> Result<Config> {
    let mut config = Config::load(root)?;
    if let Some(dir) = data_dir {
        config.data_dir = root.join(dir);
    }
    if let Some(schema) = schema {
        config.schema_file = Some(root.join(schema));
    }
    Ok(config)
}

fn require_daemon(root: &Path) -> Result<()> {
    if !daemon::is_daemon_running(root) {
        bail!("no daemon running for {} (start one with `cql serve`)", root.display());
    }
    Ok(())
}

fn expect_ok(response: Response) -> Result<serde_json::Value> {
    match response {
        Response::Ok { data } => Ok(data),
        Response::Error { message } => bail!(message),
        other => bail!("unexpected response: {:?}", other),
    }
}
