//! The model module
//! Bundle a fitted encoder, its matrix and the roster into one immutable snapshot

use crate::encoder::{AgentMatrix, FeatureEncoder, UnseenPolicy};
use crate::error::{RecommendError, Result};
use crate::ranker::rank;
use crate::roster::Agent;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

/// Everything needed to answer a recommendation request.
///
/// A snapshot never changes after it is built. Refreshing the roster produces
/// a new snapshot instead of mutating this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    roster: Vec<Agent>,
    encoder: FeatureEncoder,
    matrix: AgentMatrix,
}

impl Snapshot {
    /// Fits the encoder on `roster` and keeps all three pieces together.
    ///
    /// # Examples
    ///
    /// ```
    /// use litrec::{Agent, Snapshot, UnseenPolicy};
    ///
    /// let snapshot = Snapshot::build(vec![
    ///     Agent::new("fantasy_ny", "NY", &["Fantasy"]),
    ///     Agent::new("fantasy_la", "LA", &["Fantasy"]),
    /// ]).unwrap();
    ///
    /// let results = snapshot
    ///     .recommend(&["Fantasy".to_string()], "LA", 1, UnseenPolicy::Ignore)
    ///     .unwrap();
    /// assert_eq!(results[0].0.name, "fantasy_la");
    /// ```
    pub fn build(roster: Vec<Agent>) -> Result<Snapshot> {
        let (encoder, matrix) = FeatureEncoder::fit(&roster)?;
        Ok(Snapshot { roster, encoder, matrix })
    }

    /// Encodes the query and ranks the roster against it.
    pub fn recommend(
        &self,
        genres: &[String],
        location: &str,
        top_n: usize,
        policy: UnseenPolicy,
    ) -> Result<Vec<(&Agent, f32)>> {
        let query = self.encoder.encode_query_with_policy(genres, location, policy)?;
        rank(&self.matrix, &query, &self.roster, top_n)
    }

    pub fn roster(&self) -> &[Agent] {
        &self.roster
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn matrix(&self) -> &AgentMatrix {
        &self.matrix
    }

    /// Saves the snapshot to `path` using bincode serialization.
    ///
    /// The bytes go to a temporary sibling file first, which is renamed over
    /// `path` only once fully written. A failed save leaves any previous
    /// artifact at `path` untouched.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let tmp = staging_path(path);

        let result = self.write_to(&tmp)
            .and_then(|()| fs::rename(&tmp, path).map_err(|e| RecommendError::unavailable(path, e)));

        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }

        result
    }

    fn write_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .map_err(|e| RecommendError::unavailable(path, format!("Fail to create file for saving: {}", e)))?;

        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, self)
            .map_err(|e| RecommendError::unavailable(path, format!("Serialization failed: {}", e)))?;
        writer.flush()
            .map_err(|e| RecommendError::unavailable(path, e))?;

        Ok(())
    }

    /// Loads a snapshot previously saved with [`save`](Snapshot::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Snapshot> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RecommendError::unavailable(path, "File not found"));
        }

        let file = File::open(path)
            .map_err(|e| RecommendError::unavailable(path, e))?;

        let reader = BufReader::new(file);
        let snapshot: Snapshot = bincode::deserialize_from(reader)
            .map_err(|e| RecommendError::unavailable(path, format!("Deserialization failed: {}", e)))?;

        if snapshot.roster.len() != snapshot.matrix.rows() {
            return Err(RecommendError::unavailable(path, "Roster and matrix are out of step"));
        }

        Ok(snapshot)
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
