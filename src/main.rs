//! kvadmin - An Administrative Shell for an Ordered Key-Value Store
//!
//! This is the main entry point for the kvadmin binary.
//! It opens the store, then either runs the arguments as one command or
//! starts the interactive prompt.

use anyhow::Context;
use kvadmin::commands::CommandHandler;
use kvadmin::protocol::join_tokens;
use kvadmin::repl::{run_once, ReplSession};
use kvadmin::storage::{KvStore, StorageEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Runtime configuration
struct Config {
    /// JSON snapshot backing the store
    data: PathBuf,
    /// Keep everything in memory and never touch `data`
    memory: bool,
    /// Remaining arguments; when non-empty they form a one-shot command
    command: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        let data = std::env::var_os(kvadmin::DATA_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(kvadmin::DEFAULT_DATA_FILE));

        Self {
            data,
            memory: false,
            command: Vec::new(),
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        Self::parse(std::env::args().skip(1).collect())
    }

    /// Flags are only recognized before the first command token.
    fn parse(args: Vec<String>) -> Self {
        let mut config = Config::default();

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--data" | "-d" => {
                    if i + 1 < args.len() {
                        config.data = PathBuf::from(&args[i + 1]);
                        i += 2;
                    } else {
                        eprintln!("Error: --data requires a value");
                        std::process::exit(1);
                    }
                }
                "--memory" => {
                    config.memory = true;
                    i += 1;
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("kvadmin version {}", kvadmin::VERSION);
                    std::process::exit(0);
                }
                "--" => {
                    i += 1;
                    break;
                }
                _ => break,
            }
        }

        config.command = args[i..].to_vec();
        config
    }
}

fn print_help() {
    println!(
        r#"
kvadmin - An Administrative Shell for an Ordered Key-Value Store

USAGE:
    kvadmin [OPTIONS] [COMMAND [ARGS...]]

OPTIONS:
    -d, --data <PATH>    JSON data file (default: $KVADMIN_DATA or kvadmin.json)
        --memory         Use a volatile in-memory store
    -v, --version        Print version information
        --help           Print this help message

COMMANDS:
    list [part ...]              List entries under a key prefix
    add <part ...> <JSON>        Store a JSON value
    get <part ...>               Print one value
    delete <part ...>            Remove one key
    dump [part ...]              Print entries under a prefix as JSON
    restore [file]               Load entries from a file or standard input
    clear [part ...]             Delete every key under a prefix
    exit                         Leave the prompt

EXAMPLES:
    kvadmin                                  # Interactive prompt
    kvadmin add users ada '{{"admin":true}}'   # One-shot command
    kvadmin dump users > users.json
    kvadmin restore < users.json

LOGGING:
    Set RUST_LOG (e.g. RUST_LOG=kvadmin=debug) to log to standard error.
"#
    );
}

/// Opens the store selected by the configuration.
async fn open_store(config: &Config) -> anyhow::Result<Arc<StorageEngine>> {
    if config.memory {
        info!("Using in-memory store");
        return Ok(Arc::new(StorageEngine::new()));
    }

    let engine = StorageEngine::open(&config.data)
        .await
        .with_context(|| format!("failed to open store at {}", config.data.display()))?;
    info!(path = %config.data.display(), keys = engine.len(), "Store opened");

    Ok(Arc::new(engine))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Set up logging; standard output is reserved for command replies
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // A store that cannot be opened is the only fatal startup error
    let storage = open_store(&config).await?;
    let store: Arc<dyn KvStore> = storage.clone();
    let handler = CommandHandler::new(store);

    if config.command.is_empty() {
        let mut session = ReplSession::new(
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            tokio::io::stderr(),
            handler,
        );
        if let Err(e) = session.run().await {
            error!("Session aborted: {}", e);
        }
    } else {
        let line = join_tokens(&config.command);
        let mut stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut stderr = tokio::io::stderr();
        if let Err(e) = run_once(&handler, &line, &mut stdin, &mut stdout, &mut stderr).await {
            error!("Failed to write reply: {}", e);
        }
    }

    let stats = storage.stats();
    debug!(
        keys = stats.keys,
        gets = stats.get_ops,
        sets = stats.set_ops,
        deletes = stats.del_ops,
        scans = stats.scan_ops,
        "Store statistics"
    );

    Ok(())
}
