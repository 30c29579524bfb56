use std::path::Path;

use tracing::debug;

use crate::error::IndexError;
use crate::fuzzy::{combine_scores, field_norm, MatchOptions, Pattern};
use crate::model::{IndexEntry, SearchHit, SearchRequest, SearchResponse};

/// Identifier and description carry equal weight, normalised to sum to one.
const DESCRIPTION_WEIGHT: f64 = 0.5;
const ID_WEIGHT: f64 = 0.5;

/// The identifier → description mapping, in file order.
#[derive(Debug, Clone, Default)]
pub struct DescriptionIndex {
    entries: Vec<IndexEntry>,
}

impl DescriptionIndex {
    /// Read and parse the whole index file. Nothing is cached between calls.
    pub async fn load(path: &Path) -> Result<Self, IndexError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| IndexError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let index = Self::from_json(&raw)?;
        debug!(path = %path.display(), entries = index.len(), "description index loaded");
        Ok(index)
    }

    /// Parse a JSON object of `"<id>": "<description>"` pairs.
    pub fn from_json(raw: &str) -> Result<Self, IndexError> {
        let map: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(raw).map_err(|e| IndexError::Malformed(e.to_string()))?;

        let mut entries = Vec::with_capacity(map.len());
        for (pdb_id, value) in map {
            let serde_json::Value::String(description) = value else {
                return Err(IndexError::Malformed(format!(
                    "description for {pdb_id} is not a string"
                )));
            };
            entries.push(IndexEntry {
                pdb_id,
                description,
            });
        }
        Ok(Self { entries })
    }

    #[cfg(test)]
    pub fn from_entries(entries: Vec<IndexEntry>) -> Self {
        Self { entries }
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry within the threshold, closest first; ties keep file order.
    pub fn matches(&self, query: &str, options: MatchOptions) -> Vec<SearchHit> {
        let pattern = Pattern::new(query, options);

        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .filter_map(|entry| {
                score_entry(&pattern, entry).map(|score| SearchHit {
                    pdb_id: entry.pdb_id.clone(),
                    description: entry.description.clone(),
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| a.score.total_cmp(&b.score));
        hits
    }

    /// One page of matches for `request`.
    pub fn search(
        &self,
        request: &SearchRequest,
        options: MatchOptions,
    ) -> Result<SearchResponse, IndexError> {
        if request.query.is_empty() {
            return Err(IndexError::InvalidQuery);
        }

        let hits = self.matches(&request.query, options);
        let total = hits.len();
        let results = hits
            .into_iter()
            .skip(request.offset())
            .take(request.limit)
            .collect();

        Ok(SearchResponse { results, total })
    }
}

fn score_entry(pattern: &Pattern, entry: &IndexEntry) -> Option<f64> {
    let fields: Vec<(f64, f64, f64)> = [
        (entry.description.as_str(), DESCRIPTION_WEIGHT),
        (entry.pdb_id.as_str(), ID_WEIGHT),
    ]
    .into_iter()
    .filter(|(text, _)| !text.trim().is_empty())
    .filter_map(|(text, weight)| {
        pattern
            .score(text)
            .map(|score| (score, weight, field_norm(text)))
    })
    .collect();

    if fields.is_empty() {
        return None;
    }
    Some(combine_scores(fields))
}
