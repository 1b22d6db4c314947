use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use pharma_search_core::{
    load_catalog_or_sample, CatalogSource, EngineConfig, SearchEngine, SearchFilters,
    SearchRequest, SortBy,
};
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Locations tried, in order, after `--catalog`.
const DEFAULT_CATALOG_PATHS: [&str; 3] = [
    "Stage1_Product_initial_dataset.csv",
    "../Stage1_Product_initial_dataset.csv",
    "data",
];

#[derive(Parser)]
#[command(name = "pharma-search", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Catalogue CSV file, or a folder searched recursively for one.
    #[arg(long, env = "PHARMA_CATALOG")]
    catalog: Option<PathBuf>,

    /// Number of distinct queries kept in the result cache (0 disables it).
    #[arg(long, env = "PHARMA_CACHE_CAPACITY", default_value_t = 1024)]
    cache_capacity: usize,

    /// Skip duplicate detection for faster startup.
    #[arg(long, env = "PHARMA_SKIP_DUPLICATES", default_value_t = false)]
    skip_duplicates: bool,

    /// Pretty-print JSON responses.
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Ranked free-text and symptom search.
    Search {
        /// Search query
        #[arg(long)]
        query: String,
        /// Keep only this packaging type.
        #[arg(long)]
        packaging_type: Option<String>,
        /// Keep only medicines marketed by this company.
        #[arg(long)]
        manufacturer: Option<String>,
        /// relevance, name, manufacturer, packaging or confidence.
        #[arg(long, default_value = "relevance")]
        sort_by: String,
    },
    /// Medicines most similar to the given one.
    Recommend {
        #[arg(long)]
        id: usize,
    },
    /// Engine and catalogue statistics.
    Analytics,
    /// Largest duplicate groups.
    Duplicates {
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Medicine names containing a fragment.
    Suggest {
        #[arg(long)]
        prefix: String,
    },
    /// Liveness report.
    Health,
    /// Read one JSON search request per stdin line and answer each.
    Serve,
}

fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "pharma-search boot"
    );

    let mut candidates: Vec<PathBuf> = cli.catalog.iter().cloned().collect();
    candidates.extend(DEFAULT_CATALOG_PATHS.iter().map(PathBuf::from));
    let (corpus, source) = load_catalog_or_sample(&candidates);
    if source == CatalogSource::Sample {
        warn!("serving the built-in sample catalogue");
    }

    let config = EngineConfig {
        cache_capacity: cli.cache_capacity,
        detect_duplicates: !cli.skip_duplicates,
        ..EngineConfig::default()
    };
    let engine = SearchEngine::build(corpus, config).context("building search engine")?;

    let response = match cli.command {
        Command::Search {
            query,
            packaging_type,
            manufacturer,
            sort_by,
        } => match sort_by.parse::<SortBy>() {
            Ok(sort_by) => {
                let filters = SearchFilters {
                    packaging_type,
                    manufacturer,
                    sort_by,
                };
                search_response(&engine, &query, &filters)
            }
            Err(error) => failure(&error),
        },
        Command::Recommend { id } => {
            let recommendations = engine.recommendations(id);
            json!({
                "success": true,
                "count": recommendations.len(),
                "recommendations": recommendations,
            })
        }
        Command::Analytics => json!({
            "success": true,
            "analytics": engine.analytics(),
        }),
        Command::Duplicates { limit } => {
            let groups = engine.duplicates(limit);
            json!({
                "success": true,
                "count": groups.len(),
                "duplicates": groups,
            })
        }
        Command::Suggest { prefix } => json!({
            "success": true,
            "suggestions": engine.suggestions(&prefix),
        }),
        Command::Health => serde_json::to_value(engine.health())?,
        Command::Serve => return serve(&engine, cli.pretty),
    };

    emit(&response, cli.pretty)
}

fn serve(engine: &SearchEngine, pretty: bool) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut answered = 0usize;
    for line in stdin.lock().lines() {
        let line = line.context("reading request")?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match SearchRequest::from_json(&line) {
            Ok(request) => search_response(engine, &request.query, &request.filters),
            Err(error) => {
                warn!(%error, "rejecting malformed request");
                failure(&error)
            }
        };
        emit(&response, pretty)?;
        answered += 1;
    }
    info!(answered, "request stream closed");
    Ok(())
}

fn search_response(engine: &SearchEngine, query: &str, filters: &SearchFilters) -> Value {
    let medicines = engine.search(query, filters);
    json!({
        "success": true,
        "count": medicines.len(),
        "medicines": medicines,
    })
}

fn failure(error: &dyn std::fmt::Display) -> Value {
    json!({
        "success": false,
        "error": error.to_string(),
    })
}

fn emit(response: &Value, pretty: bool) -> anyhow::Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(response)?
    } else {
        serde_json::to_string(response)?
    };
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    stdout.flush()?;
    Ok(())
}
