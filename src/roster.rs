//! The roster module
//! Load and validate agent records from a CSV source

use crate::error::{RecommendError, Result};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::Read, path::Path};
use tracing::{debug, info};

/// One literary agent as listed in the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub name: String,
    pub agency: String,
    pub location: String,
    /// De-duplicated, first-seen order
    pub genres: Vec<String>,
    pub website: String,
}

impl Agent {
    /// Builds an agent with empty agency and website, handy for tests and demos.
    pub fn new(name: &str, location: &str, genres: &[&str]) -> Agent {
        Agent {
            name: name.to_string(),
            agency: String::new(),
            location: location.to_string(),
            genres: dedup_labels(genres.iter().map(|g| g.to_string())),
            website: String::new(),
        }
    }
}

#[derive(Deserialize)]
struct RosterRow {
    name: String,
    #[serde(default)]
    agency: String,
    location: String,
    #[serde(default)]
    genres: String,
    #[serde(default)]
    website: String,
}

/// Loads the roster from a CSV file with header `name,agency,location,genres,website`.
///
/// A missing or unreadable file is reported as [`RecommendError::ArtifactUnavailable`].
pub fn load_roster(path: impl AsRef<Path>, genre_delimiter: char) -> Result<Vec<Agent>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| RecommendError::unavailable(path, e))?;

    let roster = parse_roster(file, genre_delimiter)?;
    info!(path = %path.display(), agents = roster.len(), "Loaded roster");

    Ok(roster)
}

/// Parses roster rows from any CSV reader, keeping row order.
pub fn parse_roster<R: Read>(reader: R, genre_delimiter: char) -> Result<Vec<Agent>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut roster = Vec::new();
    // Line 1 is the header
    for (index, result) in reader.deserialize::<RosterRow>().enumerate() {
        let row_num = index + 2;
        let row = result.map_err(|e| RecommendError::InvalidRoster {
            row: row_num,
            message: e.to_string(),
        })?;

        if row.location.is_empty() {
            return Err(RecommendError::InvalidRoster {
                row: row_num,
                message: format!("agent '{}' has an empty location", row.name),
            });
        }

        let genres = parse_genres(&row.genres, genre_delimiter);
        debug!(row = row_num, name = %row.name, genres = genres.len(), "Parsed roster row");

        roster.push(Agent {
            name: row.name,
            agency: row.agency,
            location: row.location,
            genres,
            website: row.website,
        });
    }

    Ok(roster)
}

/// Splits a delimited genre cell into labels.
///
/// Also accepts a list literal such as `['Fantasy', 'Sci-Fi']`.
pub fn parse_genres(raw: &str, delimiter: char) -> Vec<String> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(trimmed);

    dedup_labels(
        inner
            .split(delimiter)
            .map(|g| g.trim().trim_matches(|c| c == '\'' || c == '"').trim().to_string()),
    )
}

fn dedup_labels(labels: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for label in labels {
        if !label.is_empty() && !out.contains(&label) {
            out.push(label);
        }
    }
    out
}
