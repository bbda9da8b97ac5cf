use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::warn;

use optrie::{DEFAULT_MAX_MATCH_LEN, MatchConfig, OpTrie};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Template file (repeatable)
    #[arg(short = 't', long = "template", value_name = "FILE", required = true)]
    templates: Vec<PathBuf>,

    /// Dictionary file (repeatable)
    #[arg(short = 'd', long = "dict", value_name = "FILE")]
    dicts: Vec<PathBuf>,

    /// Longest input, in characters, that can match
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_MATCH_LEN)]
    max_len: usize,

    /// Print the trie before matching
    #[arg(long)]
    show: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Inputs to match; read from stdin, one per line, when none are given
    #[arg(value_name = "QUERY")]
    queries: Vec<String>,
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = MatchConfig::default().with_max_match_len(args.max_len);
    let loaded = OpTrie::load(&args.templates, &args.dicts, config)?;
    for diag in &loaded.diagnostics {
        warn!("{diag}");
    }
    let trie = loaded.trie;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.show {
        write!(out, "{}", trie.show())?;
    }

    let mut emit = |query: &str| -> Result<()> {
        let res = trie.match_str(query);
        let json = serde_json::to_string(&res).context("failed to encode match result")?;
        writeln!(out, "{json}")?;
        Ok(())
    };

    if args.queries.is_empty() {
        for line in io::stdin().lock().lines() {
            let line = line.context("failed to read query from stdin")?;
            emit(line.trim_end_matches('\r'))?;
        }
    } else {
        for query in &args.queries {
            emit(query)?;
        }
    }
    Ok(())
}
