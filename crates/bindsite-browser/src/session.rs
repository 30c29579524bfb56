//! Search-and-view state.
//!
//! A selection issues three requests (metadata, annotations, structure) that
//! may complete in any order. Each request carries the [`Ticket`] it was
//! issued under; responses for an older selection or an older display
//! variant are dropped instead of overwriting what is on screen.

use std::fmt::Display;

use tracing::debug;

use bindsite_common::alphafold::StructureMetadata;
use bindsite_common::identifier::Identifier;
use bindsite_common::layout::ArtifactKind;
use bindsite_common::model::{ResidueAnnotation, SearchHit, SearchResponse};

/// Which structure file the viewer shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StructureVariant {
    #[default]
    Processed,
    Raw,
}

impl StructureVariant {
    pub fn kind(self) -> ArtifactKind {
        match self {
            Self::Processed => ArtifactKind::ProcessedStructure,
            Self::Raw => ArtifactKind::RawStructure,
        }
    }
}

/// Stamp identifying which selection and variant a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    selection: u64,
    variant: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Current,
    Stale,
}

#[derive(Debug, Default)]
struct Loading {
    metadata: bool,
    annotations: bool,
    structure: bool,
}

#[derive(Debug, Default)]
pub struct Session {
    query: String,
    results: Vec<SearchHit>,
    total: usize,
    selected: Option<Identifier>,
    metadata: Option<StructureMetadata>,
    annotations: Option<Vec<ResidueAnnotation>>,
    structure: Option<String>,
    variant: StructureVariant,
    loading: Loading,
    error: Option<String>,
    selection_gen: u64,
    variant_gen: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[SearchHit] {
        &self.results
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn selected(&self) -> Option<&Identifier> {
        self.selected.as_ref()
    }

    pub fn metadata(&self) -> Option<&StructureMetadata> {
        self.metadata.as_ref()
    }

    pub fn annotations(&self) -> Option<&[ResidueAnnotation]> {
        self.annotations.as_deref()
    }

    pub fn structure(&self) -> Option<&str> {
        self.structure.as_deref()
    }

    pub fn variant(&self) -> StructureVariant {
        self.variant
    }

    pub fn is_loading(&self) -> bool {
        self.loading.metadata || self.loading.annotations || self.loading.structure
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// A blank query clears the previous results.
    pub fn set_query(&mut self, query: &str) {
        self.query = query.trim().to_string();
        self.error = None;
        if self.query.is_empty() {
            self.results.clear();
            self.total = 0;
        }
    }

    pub fn apply_search<E: Display>(&mut self, result: Result<SearchResponse, E>) {
        match result {
            Ok(resp) => {
                self.total = resp.total;
                self.results = resp.results;
                self.error = None;
            }
            Err(e) => {
                self.results.clear();
                self.total = 0;
                self.error = Some(e.to_string());
            }
        }
    }

    /// Start viewing `id`; everything shown for a previous selection is cleared.
    pub fn select(&mut self, id: Identifier) -> Ticket {
        self.selection_gen += 1;
        self.variant_gen += 1;
        self.selected = Some(id);
        self.metadata = None;
        self.annotations = None;
        self.structure = None;
        self.error = None;
        self.loading = Loading {
            metadata: true,
            annotations: true,
            structure: true,
        };
        self.ticket()
    }

    /// Switch the displayed structure. Returns a ticket when a refetch is needed.
    pub fn set_variant(&mut self, variant: StructureVariant) -> Option<Ticket> {
        if variant == self.variant {
            return None;
        }
        self.variant = variant;
        if self.selected.is_none() {
            return None;
        }
        self.variant_gen += 1;
        self.structure = None;
        self.loading.structure = true;
        Some(self.ticket())
    }

    pub fn apply_metadata<E: Display>(
        &mut self,
        ticket: Ticket,
        result: Result<StructureMetadata, E>,
    ) -> Applied {
        if !self.is_current_selection(ticket) {
            return self.stale("metadata");
        }
        self.loading.metadata = false;
        match result {
            Ok(meta) => self.metadata = Some(meta),
            Err(e) => self.error = Some(e.to_string()),
        }
        Applied::Current
    }

    pub fn apply_annotations<E: Display>(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<ResidueAnnotation>, E>,
    ) -> Applied {
        if !self.is_current_selection(ticket) {
            return self.stale("annotations");
        }
        self.loading.annotations = false;
        match result {
            Ok(rows) => self.annotations = Some(rows),
            Err(e) => self.error = Some(e.to_string()),
        }
        Applied::Current
    }

    pub fn apply_structure<E: Display>(
        &mut self,
        ticket: Ticket,
        result: Result<String, E>,
    ) -> Applied {
        if !self.is_current_selection(ticket) || ticket.variant != self.variant_gen {
            return self.stale("structure");
        }
        self.loading.structure = false;
        match result {
            Ok(text) => self.structure = Some(text),
            Err(e) => self.error = Some(e.to_string()),
        }
        Applied::Current
    }

    /// The `n` residues most likely to bind, highest probability first.
    pub fn top_residues(&self, n: usize) -> Vec<&ResidueAnnotation> {
        let mut rows: Vec<&ResidueAnnotation> =
            self.annotations().unwrap_or_default().iter().collect();
        rows.sort_by(|a, b| b.pbind.total_cmp(&a.pbind));
        rows.truncate(n);
        rows
    }

    fn ticket(&self) -> Ticket {
        Ticket {
            selection: self.selection_gen,
            variant: self.variant_gen,
        }
    }

    fn is_current_selection(&self, ticket: Ticket) -> bool {
        ticket.selection == self.selection_gen
    }

    fn stale(&self, what: &str) -> Applied {
        debug!(what, "dropping response for a superseded request");
        Applied::Stale
    }
}
