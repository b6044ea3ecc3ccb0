//! Shardex CLI
//!
//! Runs one operation against an index directory, then flushes.

use std::process;

use clap::{Parser, Subcommand};
use shardex::{Config, Engine, Key};
use tracing_subscriber::{fmt, EnvFilter};

/// Shardex CLI
#[derive(Parser, Debug)]
#[command(name = "shardex-cli")]
#[command(about = "CLI for the Shardex multimap index")]
#[command(version)]
struct Args {
    /// Index directory
    #[arg(short, long, default_value = "./shardex_data")]
    data_dir: String,

    /// Treat keys as numbers instead of text
    #[arg(short, long)]
    numeric: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a value to a key
    Put {
        /// The key to add to
        key: String,

        /// The value to add
        value: String,
    },

    /// Print every value of a key
    Get {
        /// The key to look up
        key: String,
    },

    /// Delete a key and all its values
    Del {
        /// The key to delete
        key: String,
    },

    /// Replace every value of a key
    Update {
        /// The key to update
        key: String,

        /// The new value
        value: String,
    },

    /// List keys containing a substring
    Search {
        /// Substring to look for
        needle: String,
    },

    /// List every key
    Keys,

    /// Print the number of keys
    Size,

    /// Remove every key
    Clear,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,shardex=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder().data_dir(&args.data_dir).build();
    let engine = match Engine::open(config) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open index: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run(&engine, args.command, args.numeric) {
        tracing::error!("Command failed: {}", e);
        process::exit(1);
    }

    if let Err(e) = engine.flush(true) {
        tracing::error!("Flush failed: {}", e);
        process::exit(1);
    }
}

fn run(engine: &Engine, command: Commands, numeric: bool) -> shardex::Result<()> {
    let key_of = |raw: String| -> shardex::Result<Key> {
        if numeric {
            raw.parse::<f64>()
                .map(Key::Number)
                .map_err(|e| shardex::ShardexError::InvalidKey(format!("{}: {}", raw, e)))
        } else {
            Ok(Key::Text(raw))
        }
    };

    match command {
        Commands::Put { key, value } => engine.put(key_of(key)?, value)?,
        Commands::Get { key } => {
            for value in engine.get(key_of(key)?)? {
                println!("{}", value);
            }
        }
        Commands::Del { key } => {
            if !engine.delete(key_of(key)?)? {
                println!("(not found)");
            }
        }
        Commands::Update { key, value } => engine.update(key_of(key)?, value)?,
        Commands::Search { needle } => {
            for key in engine.search(&needle) {
                println!("{}", key);
            }
        }
        Commands::Keys => {
            for key in engine.keys() {
                println!("{}", key);
            }
        }
        Commands::Size => println!("{}", engine.size()),
        Commands::Clear => engine.clear()?,
    }
    Ok(())
}
