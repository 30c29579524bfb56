use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_LIMIT: usize = 5;

/// One row of the description index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub pdb_id: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub pdb_id: String,
    pub description: String,
    /// Combined fuzzy score; lower is closer.
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    /// Matches across all pages, not just this one.
    pub total: usize,
}

/// Normalised paging parameters for a description search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub page: usize,
    pub limit: usize,
}

impl SearchRequest {
    /// `0` or absent page/limit fall back to defaults; `limit` is capped at `max_limit`.
    pub fn new(query: &str, page: Option<usize>, limit: Option<usize>, max_limit: usize) -> Self {
        let page = page.filter(|&p| p > 0).unwrap_or(DEFAULT_PAGE);
        let limit = limit
            .filter(|&l| l > 0)
            .unwrap_or(DEFAULT_LIMIT)
            .min(max_limit.max(1));
        Self {
            query: query.trim().to_string(),
            page,
            limit,
        }
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// A residue from the per-structure JSON side-car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidueAnnotation {
    pub resid: i64,
    pub restype: String,
    /// Binding probability as written by the scoring pipeline.
    pub pbind: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
