use actix_web::{web, App, HttpServer};
use clap::{Parser, Subcommand};
use litrec::{
    clamp_top_n, parse_genres, server::AppState, Agent, Config, RecommendError, Refresher, Result, Snapshot,
};
use std::path::Path;
use tracing::info;

#[derive(Parser)]
#[command(name = "litrec")]
#[command(version, about = "Recommend literary agents by genre and location", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "litrec.toml")]
    pub config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "litrec.toml")]
        output: String,
    },

    /// Rebuild the model from the roster, even if it looks up-to-date
    Build,

    /// Print recommendations for one author
    Recommend {
        /// Comma-separated genres, e.g. "Fantasy,Sci-Fi"
        #[arg(short, long, default_value = "")]
        genres: String,

        /// Author location, e.g. "New York"
        #[arg(short, long)]
        location: String,

        /// Number of agents to show
        #[arg(short = 'n', long)]
        top_n: Option<i64>,
    },

    /// Start the HTTP API
    Serve {
        /// Listen address, overrides the config file
        #[arg(long)]
        bind: Option<String>,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Init { output } => init(&config, &output),
        Commands::Build => build(&config).map(|_| ()),
        Commands::Recommend { genres, location, top_n } => {
            recommend(&config, &genres, &location, top_n).map(|_| ())
        }
        Commands::Serve { bind } => serve(&config, bind).await,
    }
}

fn init(config: &Config, output: &str) -> Result<()> {
    if Path::new(output).exists() {
        return Err(RecommendError::Config(format!("'{}' already exists", output)));
    }

    config.save(output)?;
    println!("Configuration written to '{}'", output);
    Ok(())
}

/// Always rebuilds; the staleness check only applies to `recommend` and `serve`.
fn build(config: &Config) -> Result<Snapshot> {
    let roster = litrec::load_roster(&config.roster.path, config.roster.genre_delimiter)?;
    let snapshot = Snapshot::build(roster)?;
    snapshot.save(&config.model.artifact_path)?;

    println!(
        "Model saved to '{}' ({} agents, {} genres, {} locations)",
        config.model.artifact_path.display(),
        snapshot.roster().len(),
        snapshot.encoder().genres().len(),
        snapshot.encoder().locations().len(),
    );
    Ok(snapshot)
}

fn recommend(config: &Config, genres: &str, location: &str, top_n: Option<i64>) -> Result<Vec<(Agent, f32)>> {
    let snapshot = Refresher::from_config(config).load_or_build()?;

    let genres = parse_genres(genres, ',');
    let top_n = clamp_top_n(top_n.unwrap_or(config.model.default_top_n), snapshot.roster().len());
    let results: Vec<(Agent, f32)> = snapshot
        .recommend(&genres, location.trim(), top_n, config.model.unseen)?
        .into_iter()
        .map(|(agent, score)| (agent.clone(), score))
        .collect();

    println!("Top {} agents:", results.len());
    for (rank, (agent, score)) in results.iter().enumerate() {
        println!("{}. {} ({}), {}, [{}], Score: {:.4}",
            rank + 1, agent.name, agent.agency, agent.location, agent.genres.join(", "), score);
    }
    Ok(results)
}

async fn serve(config: &Config, bind: Option<String>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let state = web::Data::new(AppState::from_config(config)?);

    info!("Serving {} agents on {}", state.handle.snapshot().roster().len(), bind);

    HttpServer::new(move || App::new().app_data(state.clone()).configure(litrec::server::config))
        .bind(&bind)
        .map_err(|e| RecommendError::Config(format!("cannot bind '{}': {}", bind, e)))?
        .run()
        .await
        .map_err(|e| RecommendError::Config(format!("server error: {}", e)))
}
