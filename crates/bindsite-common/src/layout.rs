use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::identifier::Identifier;

/// Which precomputed file to fetch for an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Structure with binding probabilities written into the B-factor column.
    ProcessedStructure,
    /// Structure as predicted, before post-processing.
    RawStructure,
    /// JSON side-car of `{resid, restype, pbind}` records.
    ResidueAnnotations,
}

impl ArtifactKind {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::ProcessedStructure | Self::RawStructure => "text/plain",
            Self::ResidueAnnotations => "application/json",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ProcessedStructure => "PDB",
            Self::RawStructure => "vanilla PDB",
            Self::ResidueAnnotations => "JSON",
        }
    }

    /// Path segment(s) after `/file/<id>/` on the HTTP surface.
    pub fn route(self) -> &'static str {
        match self {
            Self::ProcessedStructure => "pdb",
            Self::RawStructure => "pdb/vanilla",
            Self::ResidueAnnotations => "json",
        }
    }

    fn file_suffix(self) -> &'static str {
        match self {
            Self::ProcessedStructure => ".pdb",
            Self::RawStructure => "_vanilla.pdb",
            Self::ResidueAnnotations => ".json",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Naming convention of the prediction tree:
///
/// ```text
/// <root>/AF-<id>-F1-model_v4/AF-<id>.pdb
/// <root>/AF-<id>-F1-model_v4/AF-<id>_vanilla.pdb
/// <root>/AF-<id>-F1-model_v4/AF-<id>.json
/// ```
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn model_dir(&self, id: &Identifier) -> PathBuf {
        self.root.join(format!("AF-{id}-F1-model_v4"))
    }

    pub fn path_for(&self, id: &Identifier, kind: ArtifactKind) -> PathBuf {
        self.model_dir(id)
            .join(format!("AF-{id}{}", kind.file_suffix()))
    }
}
