//! mimic CLI: generate chat-style phrases from a message database.
//!
//! Thin wrapper over the `mimic` library crate.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use corpus_store_sqlite::SqliteMessageSource;
use mimic::{
    AuthorId, ChainCache, Clock, Command, JsonDirStore, Mimic, MimicConfig, ScopeId,
    StoredMessage, SystemClock,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing_subscriber::EnvFilter;

/// mimic: imitate a chat's word-to-word statistics with Markov chains.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON config file (analytics_database, cache_dir, message_limit, freshness_secs).
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite database with the `messages` table. Overrides the config file.
    #[arg(long)]
    database: Option<PathBuf>,

    /// Directory for cached chains. Overrides the config file.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Cached chain lifetime in seconds. Overrides the config file.
    #[arg(long)]
    freshness_secs: Option<u64>,

    /// Most messages a chain is built from. Overrides the config file.
    #[arg(long)]
    message_limit: Option<usize>,

    /// PRNG seed for reproducible output.
    #[arg(long)]
    seed: Option<u64>,

    /// Log more (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Predicted phrase from everyone in a guild.
    Markov {
        #[arg(long)]
        guild: u64,
        /// Words to generate (1-50, otherwise 20).
        #[arg(long, allow_negative_numbers = true)]
        words: Option<i64>,
    },
    /// Predicted phrase starting with a given word.
    MarkovHint {
        #[arg(long)]
        guild: u64,
        start_word: String,
        #[arg(long, allow_negative_numbers = true)]
        words: Option<i64>,
    },
    /// Predicted phrase from one user.
    MarkovUser {
        #[arg(long)]
        guild: u64,
        #[arg(long)]
        user: u64,
        #[arg(long, allow_negative_numbers = true)]
        words: Option<i64>,
    },
    /// Predicted phrase from one user, starting with a given word.
    MarkovHintUser {
        #[arg(long)]
        guild: u64,
        #[arg(long)]
        user: u64,
        start_word: String,
        #[arg(long, allow_negative_numbers = true)]
        words: Option<i64>,
    },
    /// Punctuated phrase from everyone (15-25 words unless given).
    MarkovJoke {
        #[arg(long)]
        guild: u64,
        #[arg(long, allow_negative_numbers = true)]
        words: Option<i64>,
    },
    /// Punctuated phrase from one user (15-25 words unless given).
    MarkovJokeUser {
        #[arg(long)]
        guild: u64,
        #[arg(long)]
        user: u64,
        #[arg(long, allow_negative_numbers = true)]
        words: Option<i64>,
    },
    /// Store a message in the database, creating it if needed.
    Record {
        #[arg(long)]
        guild: u64,
        #[arg(long)]
        user: u64,
        /// Seconds since the Unix epoch. Default: now.
        #[arg(long)]
        timestamp: Option<f64>,
        text: String,
    },
}

impl Cmd {
    /// Split into the scope and the generation command, or `None` for `record`.
    fn into_generation(self) -> Option<(ScopeId, Command)> {
        let generation = match self {
            Cmd::Markov { guild, words } => (ScopeId(guild), Command::Markov { words }),
            Cmd::MarkovHint {
                guild,
                start_word,
                words,
            } => (ScopeId(guild), Command::MarkovHint { start_word, words }),
            Cmd::MarkovUser { guild, user, words } => (
                ScopeId(guild),
                Command::MarkovUser {
                    user: AuthorId(user),
                    words,
                },
            ),
            Cmd::MarkovHintUser {
                guild,
                user,
                start_word,
                words,
            } => (
                ScopeId(guild),
                Command::MarkovHintUser {
                    user: AuthorId(user),
                    start_word,
                    words,
                },
            ),
            Cmd::MarkovJoke { guild, words } => (ScopeId(guild), Command::MarkovJoke { words }),
            Cmd::MarkovJokeUser { guild, user, words } => (
                ScopeId(guild),
                Command::MarkovJokeUser {
                    user: AuthorId(user),
                    words,
                },
            ),
            Cmd::Record { .. } => return None,
        };
        Some(generation)
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Merge the config file (if any) with command-line overrides.
fn resolve_config(args: &Args) -> Result<MimicConfig> {
    let mut config = match &args.config {
        Some(path) => MimicConfig::load(path)?,
        None => MimicConfig::default(),
    };
    if let Some(ref db) = args.database {
        config.analytics_database = Some(db.clone());
    }
    if let Some(ref dir) = args.cache_dir {
        config.cache_dir = dir.clone();
    }
    if let Some(secs) = args.freshness_secs {
        config.freshness_secs = secs;
    }
    if let Some(limit) = args.message_limit {
        config.message_limit = limit;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = resolve_config(&args)?;
    tracing::debug!(?config, "resolved configuration");
    let database = config
        .analytics_database
        .clone()
        .context("no analytics database configured; pass --database or set it in --config")?;
    let source = SqliteMessageSource::new(database);

    if let Cmd::Record {
        guild,
        user,
        timestamp,
        ref text,
    } = args.command
    {
        source
            .create_schema()
            .await
            .with_context(|| format!("failed to prepare {}", source.path().display()))?;
        source
            .insert(StoredMessage {
                scope: ScopeId(guild),
                author: AuthorId(user),
                timestamp: timestamp.unwrap_or_else(|| SystemClock.now() as f64),
                contents: text.clone(),
            })
            .await
            .context("failed to record message")?;
        return Ok(());
    }

    let seed = args.seed.unwrap_or_else(|| SystemClock.now());
    let store = JsonDirStore::new(config.cache_dir.clone());
    let cache =
        ChainCache::new(Arc::new(source), Arc::new(store)).with_config(config.cache_config());
    let engine = Mimic::with_cache(cache, SmallRng::seed_from_u64(seed));

    let Some((scope, command)) = args.command.into_generation() else {
        return Ok(());
    };
    let text = engine
        .run(scope, &command)
        .await
        .context("failed to load messages")?;
    println!("{text}");

    Ok(())
}
