//! Relationship cache synchronization.
//!
//! Mirrors the graph store into the relationship cache one citizen at a
//! time, removes expired rows, and applies operator overrides. Every write
//! goes through [`RelationshipCache::replace_edges`], so each citizen's rows
//! are swapped atomically.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use kinship_core::{
    CitizenId, EdgeKey, RelationshipAssertion, RelationshipEdge, RelationshipSource,
};
use kinship_graph::FamilyNetworkSource;
use kinship_store::{CitizenStore, RelationshipCache, ReplaceScope};

use crate::error::{ResolveError, Result};
use crate::mapping;

/// Writes relationship cache rows from the graph store and from operators.
#[derive(Clone)]
pub struct CacheSynchronizer {
    graph: Arc<dyn FamilyNetworkSource>,
    citizens: Arc<dyn CitizenStore>,
    cache: Arc<dyn RelationshipCache>,
    graph_enabled: bool,
    ttl: TimeDelta,
}

impl CacheSynchronizer {
    pub fn new(
        graph: Arc<dyn FamilyNetworkSource>,
        citizens: Arc<dyn CitizenStore>,
        cache: Arc<dyn RelationshipCache>,
        graph_enabled: bool,
        ttl: std::time::Duration,
    ) -> Self {
        Self {
            graph,
            citizens,
            cache,
            graph_enabled,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::hours(1)),
        }
    }

    /// Replace `citizen`'s GRAPH rows with the edges the graph store
    /// currently reports from that citizen. Returns the number of rows
    /// written; 0 when the graph store is disabled.
    pub async fn sync_from_graph_store(&self, citizen: &CitizenId, depth: u32) -> Result<usize> {
        if !self.graph_enabled {
            tracing::debug!(citizen_id = %citizen, "Graph store disabled, skipping sync");
            return Ok(0);
        }

        let root = self
            .citizens
            .get(citizen)
            .await?
            .ok_or(ResolveError::CitizenNotFound(*citizen))?;

        let network = mapping::fetch_network(self.graph.as_ref(), &root, depth).await?;
        let nodes = mapping::map_nodes(self.citizens.as_ref(), &network.nodes).await?;
        let edges =
            mapping::graph_edges_for_root(&root.id, &network, &nodes, Utc::now(), self.ttl);

        let written = self
            .cache
            .replace_edges(
                &root.id,
                ReplaceScope::Source(RelationshipSource::Graph),
                &edges,
            )
            .await?;

        tracing::info!(
            citizen_id = %root.id,
            depth,
            nodes = network.nodes.len(),
            unmapped = nodes.unmapped,
            written,
            "Relationship cache synced from graph store"
        );
        Ok(written)
    }

    /// Delete every cache row whose expiry has passed. Rows without an
    /// expiry are kept.
    pub async fn cleanup_expired_cache(&self) -> Result<u64> {
        let deleted = self.cache.delete_expired(Utc::now()).await?;
        tracing::info!(deleted, "Expired relationship cache rows removed");
        Ok(deleted)
    }

    /// Replace every cache row for `citizen` with verified, non-expiring
    /// rows built from `assertions`. Assertions naming an unknown national
    /// id, or the citizen themselves, are skipped. Returns the number of
    /// rows saved.
    pub async fn update_relationships_manually(
        &self,
        citizen: &CitizenId,
        assertions: &[RelationshipAssertion],
    ) -> Result<usize> {
        let root = self
            .citizens
            .get(citizen)
            .await?
            .ok_or(ResolveError::CitizenNotFound(*citizen))?;

        let now = Utc::now();
        let mut keys: HashSet<EdgeKey> = HashSet::new();
        let mut edges = Vec::with_capacity(assertions.len());
        let mut skipped = 0usize;

        for assertion in assertions {
            let national_id = assertion.related_citizen_national_id.trim();
            let related = match self.citizens.find_by_national_id(national_id).await? {
                Some(record) if record.id != root.id => record,
                Some(_) => {
                    tracing::warn!(citizen_id = %root.id, "Ignoring self-referencing assertion");
                    skipped += 1;
                    continue;
                }
                None => {
                    tracing::warn!(
                        citizen_id = %root.id,
                        national_id,
                        "Skipping assertion for unknown citizen"
                    );
                    skipped += 1;
                    continue;
                }
            };

            let key = EdgeKey {
                from: root.id,
                to: related.id,
                relationship_type: assertion.relationship_type,
            };
            if !keys.insert(key) {
                continue;
            }

            let label = match assertion.label.trim() {
                "" => assertion.relationship_type.label().to_string(),
                label => label.to_string(),
            };
            edges.push(RelationshipEdge {
                from_citizen_id: root.id,
                to_citizen_id: related.id,
                relationship_type: assertion.relationship_type,
                label,
                confidence: assertion.confidence.min(100),
                verified: true,
                source: RelationshipSource::Manual,
                depth: 1,
                synced_at: now,
                expires_at: None,
            });
        }

        let saved = self
            .cache
            .replace_edges(&root.id, ReplaceScope::All, &edges)
            .await?;

        tracing::info!(
            citizen_id = %root.id,
            asserted = assertions.len(),
            skipped,
            saved,
            "Manual relationships saved"
        );
        Ok(saved)
    }
}
