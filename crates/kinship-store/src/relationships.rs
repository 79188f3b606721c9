//! Relationship cache trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kinship_core::{CitizenId, RelationshipEdge, RelationshipSource};

use crate::error::Result;

/// Which of a citizen's existing edges a replace removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceScope {
    /// Only edges from this source.
    Source(RelationshipSource),
    /// Every edge regardless of source.
    All,
}

impl ReplaceScope {
    pub fn covers(&self, source: RelationshipSource) -> bool {
        match self {
            Self::Source(s) => *s == source,
            Self::All => true,
        }
    }
}

/// Persistent cache of directed relationship edges.
#[async_trait]
pub trait RelationshipCache: Send + Sync {
    /// Unexpired edges originating at `citizen`, highest confidence first.
    async fn active_edges(
        &self,
        citizen: &CitizenId,
        now: DateTime<Utc>,
    ) -> Result<Vec<RelationshipEdge>>;

    /// Atomically delete the citizen's edges selected by `scope` and insert
    /// `edges`. Returns the number of rows inserted.
    ///
    /// Edges not originating at `citizen` are ignored. An edge whose
    /// (from, to, type) key survives the delete is skipped, so the
    /// surviving row wins. Concurrent replaces for the same citizen are
    /// serialised.
    async fn replace_edges(
        &self,
        citizen: &CitizenId,
        scope: ReplaceScope,
        edges: &[RelationshipEdge],
    ) -> Result<usize>;

    /// Delete every edge whose expiry lies before `now`. Edges without an
    /// expiry are never removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}
