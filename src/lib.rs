//! # litrec - Literary Agent Recommender
//!
//! litrec matches an author's genres and location against a roster of
//! literary agents. Each agent becomes a vector with a multi-hot genre block
//! and a one-hot location block; queries are encoded in the same space and
//! agents are ranked by cosine similarity.
//!
//! ## Example
//!
//! ```
//! use litrec::{Agent, Snapshot, UnseenPolicy};
//!
//! let snapshot = Snapshot::build(vec![
//!     Agent::new("fantasy_ny", "NY", &["Fantasy"]),
//!     Agent::new("romance_ny", "NY", &["Romance"]),
//!     Agent::new("fantasy_la", "LA", &["Fantasy"]),
//! ]).unwrap();
//!
//! let genres = vec!["Fantasy".to_string()];
//! let results = snapshot.recommend(&genres, "NY", 2, UnseenPolicy::Ignore).unwrap();
//! assert_eq!(results[0].0.name, "fantasy_ny"); // Most similar agent
//! assert_eq!(results.len(), 2);
//! ```

pub mod vector;
pub mod server;
mod config;
mod encoder;
mod error;
mod model;
mod ranker;
mod refresh;
mod roster;

pub use config::{Config, ModelConfig, RosterConfig, ServerConfig};
pub use encoder::{AgentMatrix, FeatureEncoder, UnseenPolicy, Vocabulary};
pub use error::{RecommendError, Result};
pub use model::Snapshot;
pub use ranker::{clamp_top_n, rank};
pub use refresh::{ModelHandle, RefreshOutcome, RefreshState, Refresher};
pub use roster::{load_roster, parse_genres, parse_roster, Agent};
