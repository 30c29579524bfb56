use std::net::SocketAddr;
use std::path::PathBuf;

use bindsite_common::fuzzy::{MatchOptions, DEFAULT_THRESHOLD};

use crate::error::AppError;

const DEFAULT_INDEX_PATH: &str = "pdbid_uniprot_descriptions.json";
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5002";
const DEFAULT_MAX_LIMIT: usize = 50;
const DEFAULT_MAX_AGE_SECS: u64 = 86_400;

/// Server configuration loaded explicitly from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the prediction tree (`AF-<id>-F1-model_v4/...`).
    pub pred_dir: PathBuf,
    /// JSON object mapping identifiers to descriptions.
    pub index_path: PathBuf,
    pub listen_addr: SocketAddr,
    /// Fuzzy match threshold in `[0, 1]`; lower is stricter.
    pub search_threshold: f64,
    pub search_max_limit: usize,
    /// `max-age` sent with every artifact; the files never change once written.
    pub artifact_max_age_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `STRUCTS_PRED_DIR`: directory holding the prediction tree
    ///
    /// Optional:
    /// - `STRUCTS_INDEX_PATH` (default: "pdbid_uniprot_descriptions.json")
    /// - `STRUCTS_LISTEN_ADDR` (default: "0.0.0.0:5002")
    /// - `SEARCH_THRESHOLD` (default: 0.3)
    /// - `SEARCH_MAX_LIMIT` (default: 50)
    /// - `ARTIFACT_MAX_AGE_SECS` (default: 86400)
    pub fn from_env() -> Result<Self, AppError> {
        let pred_dir = std::env::var("STRUCTS_PRED_DIR").map_err(|_| {
            AppError::Config("STRUCTS_PRED_DIR environment variable is required".to_string())
        })?;
        let pred_dir = PathBuf::from(pred_dir);
        if !pred_dir.is_dir() {
            return Err(AppError::Config(format!(
                "prediction directory not found: {}",
                pred_dir.display()
            )));
        }

        let index_path = std::env::var("STRUCTS_INDEX_PATH")
            .unwrap_or_else(|_| DEFAULT_INDEX_PATH.to_string());

        let listen_addr = std::env::var("STRUCTS_LISTEN_ADDR")
            .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_addr.parse::<SocketAddr>().map_err(|e| {
            AppError::Config(format!("invalid STRUCTS_LISTEN_ADDR {listen_addr}: {e}"))
        })?;

        let search_threshold = parse_var("SEARCH_THRESHOLD")?.unwrap_or(DEFAULT_THRESHOLD);
        if !(0.0..=1.0).contains(&search_threshold) {
            return Err(AppError::Config(format!(
                "SEARCH_THRESHOLD must be within [0, 1], got {search_threshold}"
            )));
        }

        let search_max_limit = parse_var::<usize>("SEARCH_MAX_LIMIT")?
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_MAX_LIMIT);

        let artifact_max_age_secs =
            parse_var("ARTIFACT_MAX_AGE_SECS")?.unwrap_or(DEFAULT_MAX_AGE_SECS);

        Ok(Self {
            pred_dir,
            index_path: PathBuf::from(index_path),
            listen_addr,
            search_threshold,
            search_max_limit,
            artifact_max_age_secs,
        })
    }

    /// Configuration for a given file store, with every other value at its default.
    #[cfg(test)]
    pub fn for_paths(pred_dir: &std::path::Path, index_path: &std::path::Path) -> Self {
        Self {
            pred_dir: pred_dir.to_path_buf(),
            index_path: index_path.to_path_buf(),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 5002)),
            search_threshold: DEFAULT_THRESHOLD,
            search_max_limit: DEFAULT_MAX_LIMIT,
            artifact_max_age_secs: DEFAULT_MAX_AGE_SECS,
        }
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions::with_threshold(self.search_threshold)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, AppError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("invalid {name} {raw:?}: {e}"))),
        Err(_) => Ok(None),
    }
}
