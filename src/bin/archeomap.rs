use std::{path::PathBuf, process::ExitCode, sync::Arc};

use archeomap::{
    backend::{BackendClient, BackendError},
    config::{ConfigError, ViewerConfig},
    core::state::ViewState,
    persist::MemoryStore,
    providers::EnvKeys,
    query::tile_url_template,
    search::SearchHits,
    style::{ComposeInput, compose_style},
    types::DataLayer,
    view_state::ViewStateCodec,
};
use clap::{Parser, Subcommand};
use thiserror::Error;
use url::Url;

/// Style and view-state utilities for the archaeological site map.
#[derive(Parser, Debug)]
#[command(name = "archeomap")]
struct Cli {
    /// Viewer configuration (TOML); defaults apply when omitted.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Selected subcommand.
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the composed style JSON for a view query.
    Style {
        /// View query string (leading `?` optional).
        #[arg(long, default_value = "")]
        query: String,
    },
    /// Print the normalized share URL for a view query.
    Share {
        /// Page URL the share link points at.
        #[arg(long)]
        base: String,
        /// View query string.
        #[arg(long, default_value = "")]
        query: String,
    },
    /// Print the tile URL template of one data layer.
    TileUrl {
        /// `sites`, `province` or `comuni`.
        #[arg(long)]
        layer: String,
        /// View query string.
        #[arg(long, default_value = "")]
        query: String,
    },
    /// Search sites, or geocode address-like text.
    Search {
        /// Free text or address.
        text: String,
        /// Maximum results; the configured limit when omitted.
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("unknown layer `{0}` (expected sites, province or comuni)")]
    UnknownLayer(String),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(out) => {
            println!("{out}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("archeomap: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<String, CliError> {
    let config = match &cli.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    let registry = Arc::new(config.registry(&EnvKeys));
    let codec = ViewStateCodec::with_namespace(Arc::clone(&registry), &config.view.storage_namespace);
    let decode = |query: &str| -> ViewState { codec.decode(query.trim_start_matches('?'), &MemoryStore::new()) };

    match cli.command {
        Commands::Style { query } => {
            let state = decode(&query);
            let tiles_base = config.tiles_base();
            let style = compose_style(&ComposeInput {
                tiles_base: &tiles_base,
                filters: &state.filters,
                visibility: state.fixed.visibility,
                opacity: state.fixed.opacity,
            });
            Ok(serde_json::to_string_pretty(&style)?)
        }
        Commands::Share { base, query } => {
            let base = Url::parse(&base)?;
            Ok(codec.share_url(&base, &decode(&query)).to_string())
        }
        Commands::TileUrl { layer, query } => {
            let layer = DataLayer::from_name(&layer).ok_or(CliError::UnknownLayer(layer))?;
            Ok(tile_url_template(&config.tiles_base(), layer, &decode(&query).filters))
        }
        Commands::Search { text, limit } => {
            let backend = BackendClient::new(config.backend_config(&EnvKeys)?)?;
            let hits = backend.search(&text, limit.unwrap_or(config.search_limit())).await?;
            Ok(render_hits(&hits))
        }
    }
}

fn render_hits(hits: &SearchHits) -> String {
    match hits {
        SearchHits::Empty => String::new(),
        SearchHits::Places(places) => places
            .iter()
            .map(|p| format!("{:.5},{:.5}\t{}", p.location.lng, p.location.lat, p.label))
            .collect::<Vec<_>>()
            .join("\n"),
        SearchHits::Sites(sites) => sites
            .iter()
            .map(|s| format!("{}\t{}", s.id, s.name))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
