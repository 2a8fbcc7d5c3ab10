use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use teamset_search::config::AppConfig;
use teamset_search::index::CardinalityIndex;
use teamset_search::models::{GameResult, GameSummary, Metric, TeamSet};
use teamset_search::search::{FilterCache, LiveRankedGameSearch, SearchGroup};
use teamset_search::storage::{jsonl, MemoryPageProvider, StorageConfig};
use teamset_search::vocab::GameType;

#[derive(Parser)]
#[command(name = "teamset-search")]
#[command(about = "Faceted search over tactics-game team sets")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a query and show its OR-groups and index filters
    Parse {
        /// Game type whose vocabulary to use
        #[arg(long)]
        game_type: String,

        /// Query text
        query: String,
    },

    /// Search stored team sets
    Search {
        #[arg(long)]
        game_type: String,

        /// Ranking metric (rating, games, players, updated)
        #[arg(long, default_value = "rating")]
        metric: String,

        #[arg(long, default_value = "0")]
        offset: usize,

        /// Results to show (default from config)
        #[arg(long)]
        limit: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Query text (empty matches everything)
        #[arg(default_value = "")]
        query: String,
    },

    /// Show cardinality index entries
    IndexStats {
        #[arg(long)]
        game_type: String,

        /// Rebuild from stored team sets instead of the saved snapshot
        #[arg(long)]
        rebuild: bool,

        /// Save the index snapshot after building
        #[arg(long)]
        save: bool,
    },

    /// List rated games of a team set
    Games {
        #[arg(long)]
        game_type: String,

        /// Team set id
        #[arg(long)]
        set: String,

        /// Opposing team set id
        #[arg(long)]
        vs: Option<String>,

        /// Result for the set's team (win, loss, draw)
        #[arg(long)]
        result: Option<String>,

        #[arg(long, default_value = "0")]
        offset: usize,

        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        AppConfig::from_file(&cli.config)
            .with_context(|| format!("Failed to load config {:?}", cli.config))?
    } else {
        AppConfig::default()
    };
    if let Some(data_dir) = cli.data_dir.clone() {
        config.data_dir = data_dir;
    }
    let log_level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::debug!("Starting teamset-search v{}", env!("CARGO_PKG_VERSION"));

    let storage = StorageConfig::new(config.data_dir.clone());

    match cli.command {
        Commands::Parse { game_type, query } => {
            let game_type = load_game_type(&storage, &game_type)?;
            let index = load_index(&storage, &game_type, false)?;

            let groups = game_type.grammar().parse(&query)?;
            let filters = index.get_filters_from_query(&game_type, &groups)?;

            println!("Query: {:?}\n", query);
            for (i, (group, paths)) in groups.iter().zip(&filters).enumerate() {
                let selection = index.select_index(&game_type, paths)?;
                println!("Branch {}: {:?}", i + 1, group);
                println!("  filters: {}", paths.join(" "));
                println!(
                    "  scans:   {} (~{} sets)",
                    selection.path(),
                    selection.approximate_count()
                );
            }
        }

        Commands::Search {
            game_type,
            metric,
            offset,
            limit,
            json,
            query,
        } => {
            let metric: Metric = metric.parse()?;
            let limit = limit.unwrap_or(config.search.default_limit);
            let game_type = Arc::new(load_game_type(&storage, &game_type)?);
            let index = load_index(&storage, &game_type, false)?;
            let provider = Arc::new(MemoryPageProvider::from_storage(
                &storage,
                game_type.id(),
                config.search.page_size,
                config.search.max_scan_pages,
            )?);
            let cache = Arc::new(FilterCache::new(
                game_type.id(),
                config.search.filter_cache_capacity,
            ));

            let mut group = SearchGroup::from_query(
                &index,
                Arc::clone(&game_type),
                metric,
                &query,
                provider,
                cache,
            )?;
            let results = group.get_results(offset, limit).await?;
            let total = group.get_total();

            if json {
                let sets: Vec<&TeamSet> = results.iter().map(|s| s.as_ref()).collect();
                let body = serde_json::json!({ "total": total, "results": sets });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!(
                    "{}{} sets{}\n",
                    if total.fuzzy { "~" } else { "" },
                    total.count,
                    if total.truncated { " (scan truncated)" } else { "" }
                );
                for (i, set) in results.iter().enumerate() {
                    println!(
                        "  #{} {} {} ({} {:.0}, {} games, {} players)",
                        offset + i + 1,
                        set.id,
                        set.name.as_deref().unwrap_or("-"),
                        metric,
                        metric.value(&set.stats),
                        set.stats.game_count,
                        set.stats.player_count
                    );
                }
            }
        }

        Commands::IndexStats {
            game_type,
            rebuild,
            save,
        } => {
            let game_type = load_game_type(&storage, &game_type)?;
            let index = load_index(&storage, &game_type, rebuild)?;

            let enabled = index.entries().filter(|e| !e.disabled).count();
            println!("Game type: {}", index.game_type_id());
            println!("Sets:      {}", index.root_count());
            println!("Indexes:   {} ({} enabled)\n", index.len(), enabled);
            for entry in index.entries() {
                println!(
                    "  {:>8}  {}{}",
                    entry.count,
                    entry.path,
                    if entry.disabled { "  [disabled]" } else { "" }
                );
            }

            if save {
                let path = storage.save_index(&index)?;
                println!("\nSaved snapshot to {}", path.display());
            }
        }

        Commands::Games {
            game_type,
            set,
            vs,
            result,
            offset,
            limit,
        } => {
            let result = result
                .map(|r| r.parse::<GameResult>())
                .transpose()
                .map_err(anyhow::Error::msg)?;
            let limit = limit.unwrap_or(config.search.default_limit);

            let mut history = jsonl::read_games(&storage, &game_type)?;
            history.sort_by(|a, b| {
                let rating = |g: &GameSummary| g.rating.unwrap_or(f64::NEG_INFINITY);
                rating(b)
                    .total_cmp(&rating(a))
                    .then_with(|| a.id.cmp(&b.id))
            });

            let mut search = LiveRankedGameSearch::new(set.into(), vs.map(Into::into), result);
            search.push_page(history, true);

            println!("{} rated games\n", search.len());
            for (i, game) in search.get_results(offset, limit).iter().enumerate() {
                let teams: Vec<String> = game
                    .teams
                    .iter()
                    .map(|t| format!("{} ({})", t.set_id, t.player_id))
                    .collect();
                println!(
                    "  #{} {} rating {:.0}: {}{}",
                    offset + i + 1,
                    game.id,
                    game.rating.unwrap_or_default(),
                    teams.join(" vs "),
                    game.winner
                        .map(|w| format!(", team {} won", w + 1))
                        .unwrap_or_else(|| ", draw".to_string())
                );
            }
        }
    }

    Ok(())
}

/// Load a game type's vocabulary and designer sets.
fn load_game_type(storage: &StorageConfig, id: &str) -> Result<GameType> {
    let path = storage.vocab_path(id);
    let game_type = GameType::from_file(&path)
        .with_context(|| format!("Failed to load vocabulary {:?}", path))?;
    let predefined = jsonl::read_predefined_sets(storage, id)?;
    Ok(game_type.with_sets(predefined))
}

/// Load the saved index snapshot, or build one from stored sets.
fn load_index(storage: &StorageConfig, game_type: &GameType, rebuild: bool) -> Result<CardinalityIndex> {
    if !rebuild {
        if let Some(index) = storage.load_index(game_type.id())? {
            return Ok(index);
        }
    }

    let sets = jsonl::read_team_sets(storage, game_type.id())?;
    let mut index = CardinalityIndex::new(game_type.id());
    for set in &sets {
        index.apply_set(set)?;
    }
    index.optimize();
    tracing::info!(
        "Built index for {} from {} sets in {}",
        game_type.id(),
        sets.len(),
        storage.game_type_dir(game_type.id()).display()
    );
    Ok(index)
}
