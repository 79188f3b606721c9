//! kinship-resolve: Family graph resolution for citizen profiles.
//!
//! Resolves a citizen's family from three tiers in strict priority order:
//! the authoritative graph store, the relational relationship cache, and
//! heuristic inference over address, age, and gender. Also hosts the job
//! that keeps the cache in sync with the graph store.

pub mod candidates;
pub mod cap;
pub mod error;
pub mod heuristic;
pub mod mapping;
pub mod scheduler;
pub mod sync;

pub use error::ResolveError;
pub use scheduler::CleanupScheduler;
pub use sync::CacheSynchronizer;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{NaiveDate, Utc};
use kinship_core::config::ResolutionSettings;
use kinship_core::{
    CitizenId, CitizenRecord, FamilyGraphResult, FamilyLink, FamilyMember, KinshipConfig,
    ResolutionTier,
};
use kinship_graph::FamilyNetworkSource;
use kinship_store::{CitizenStore, RelationshipCache, StoreError};
use tokio::task::JoinSet;

use crate::cap::{enforce_member_cap, pin_root};

/// The family graph resolution engine.
pub struct FamilyResolver {
    citizens: Arc<dyn CitizenStore>,
    graph: Arc<dyn FamilyNetworkSource>,
    cache: Arc<dyn RelationshipCache>,
    settings: ResolutionSettings,
    graph_enabled: bool,
    synchronizer: CacheSynchronizer,
    /// Cache syncs started after graph hits, not yet drained.
    background: Mutex<JoinSet<()>>,
}

impl FamilyResolver {
    pub fn new(
        citizens: Arc<dyn CitizenStore>,
        graph: Arc<dyn FamilyNetworkSource>,
        cache: Arc<dyn RelationshipCache>,
        config: &KinshipConfig,
    ) -> Self {
        let synchronizer = CacheSynchronizer::new(
            graph.clone(),
            citizens.clone(),
            cache.clone(),
            config.neo4j.enabled,
            config.cache.ttl(),
        );
        Self {
            citizens,
            graph,
            cache,
            settings: config.resolution.clone(),
            graph_enabled: config.neo4j.enabled,
            synchronizer,
            background: Mutex::new(JoinSet::new()),
        }
    }

    /// The cache synchronizer sharing this resolver's stores.
    pub fn synchronizer(&self) -> &CacheSynchronizer {
        &self.synchronizer
    }

    /// Resolve the family graph of `citizen`.
    ///
    /// Orchestrates: load root → graph store → relationship cache →
    /// heuristic inference → member cap. A missing root citizen is the only
    /// error; graph and cache failures fall through to the next tier.
    pub async fn resolve_family_graph(
        &self,
        citizen: &CitizenId,
        depth: u32,
    ) -> error::Result<FamilyGraphResult> {
        let start = std::time::Instant::now();
        let depth = self.settings.clamp_depth(depth);
        let today = Utc::now().date_naive();

        let root = self
            .citizens
            .get(citizen)
            .await?
            .ok_or(ResolveError::CitizenNotFound(*citizen))?;

        let mut result = match self.from_graph(&root, depth, today).await {
            Some(result) => {
                self.spawn_sync(root.id, depth);
                result
            }
            None => match self.from_cache(&root, today).await {
                Some(result) => result,
                None => self.from_heuristics(&root, today).await,
            },
        };

        pin_root(&mut result, FamilyMember::root(&root, today));
        let trimmed = enforce_member_cap(&mut result, self.settings.max_members);

        tracing::info!(
            citizen_id = %root.id,
            tier = ?result.tier,
            members = result.member_count(),
            links = result.links.len(),
            trimmed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Family graph resolved"
        );
        Ok(result)
    }

    /// Tier 1. `None` when the graph store is disabled, unreachable, or
    /// knows nothing beyond the root.
    async fn from_graph(
        &self,
        root: &CitizenRecord,
        depth: u32,
        today: NaiveDate,
    ) -> Option<FamilyGraphResult> {
        if !self.graph_enabled {
            return None;
        }

        let network = match mapping::fetch_network(self.graph.as_ref(), root, depth).await {
            Ok(network) => network,
            Err(e) => {
                tracing::warn!(
                    citizen_id = %root.id,
                    error = %e,
                    "Graph store unavailable, falling back"
                );
                return None;
            }
        };
        if network.is_empty() {
            return None;
        }

        let nodes = match mapping::map_nodes(self.citizens.as_ref(), &network.nodes).await {
            Ok(nodes) => nodes,
            Err(e) => {
                tracing::warn!(citizen_id = %root.id, error = %e, "Failed to map graph nodes");
                return None;
            }
        };

        let result = mapping::network_to_family_graph(root, &network, &nodes, today);
        mapping::is_usable(&result).then_some(result)
    }

    /// Tier 2. `None` when the cache holds no live rows that resolve to
    /// known citizens, or cannot be read.
    async fn from_cache(
        &self,
        root: &CitizenRecord,
        today: NaiveDate,
    ) -> Option<FamilyGraphResult> {
        match self.cached_family(root, today).await {
            Ok(result) if result.member_count() > 1 => Some(result),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(
                    citizen_id = %root.id,
                    error = %e,
                    "Relationship cache unavailable, falling back"
                );
                None
            }
        }
    }

    async fn cached_family(
        &self,
        root: &CitizenRecord,
        today: NaiveDate,
    ) -> Result<FamilyGraphResult, StoreError> {
        let edges = self.cache.active_edges(&root.id, Utc::now()).await?;
        let mut result = FamilyGraphResult::self_only(root, ResolutionTier::Cache, today);
        let mut seen: HashSet<CitizenId> = HashSet::from([root.id]);

        for edge in edges.iter().filter(|e| e.to_citizen_id != root.id) {
            if !seen.contains(&edge.to_citizen_id) {
                let Some(related) = self.citizens.get(&edge.to_citizen_id).await? else {
                    tracing::warn!(
                        citizen_id = %root.id,
                        related_id = %edge.to_citizen_id,
                        "Cached relationship points at unknown citizen"
                    );
                    continue;
                };
                seen.insert(related.id);
                result.members.push(FamilyMember {
                    citizen_id: related.id,
                    name: related.full_name.clone(),
                    relationship: edge.label.clone(),
                    age: related.age_on(today),
                    gender: related.gender,
                    confidence: edge.confidence,
                });
            }
            result.links.push(FamilyLink {
                from: edge.from_citizen_id,
                to: edge.to_citizen_id,
                relationship: edge.label.clone(),
                confidence: edge.confidence,
            });
        }

        Ok(result)
    }

    /// Tier 3. Always yields a result; a failed candidate lookup leaves
    /// only the root.
    async fn from_heuristics(&self, root: &CitizenRecord, today: NaiveDate) -> FamilyGraphResult {
        match candidates::build_candidate_pool(self.citizens.as_ref(), root, today).await {
            Ok(pool) => heuristic::infer_family(root, &pool, today, self.settings.max_members),
            Err(e) => {
                tracing::warn!(citizen_id = %root.id, error = %e, "Candidate lookup failed");
                FamilyGraphResult::self_only(root, ResolutionTier::Heuristic, today)
            }
        }
    }

    /// Refresh the cache in the background after a graph hit. The caller
    /// does not wait; [`drain_background`](Self::drain_background) does.
    fn spawn_sync(&self, citizen: CitizenId, depth: u32) {
        if !self.settings.sync_on_resolve {
            return;
        }
        let synchronizer = self.synchronizer.clone();
        let mut background = self.background_tasks();
        while let Some(finished) = background.try_join_next() {
            log_background_exit(finished);
        }
        background.spawn(async move {
            if let Err(e) = synchronizer.sync_from_graph_store(&citizen, depth).await {
                tracing::warn!(citizen_id = %citizen, error = %e, "Background cache sync failed");
            }
        });
    }

    /// Wait for every background cache sync started so far.
    ///
    /// Call before the runtime shuts down; tasks still pending at shutdown
    /// are cancelled.
    pub async fn drain_background(&self) {
        let mut pending = {
            let mut tasks = self.background_tasks();
            std::mem::take(&mut *tasks)
        };
        let count = pending.len();
        while let Some(finished) = pending.join_next().await {
            log_background_exit(finished);
        }
        if count > 0 {
            tracing::debug!(count, "Background cache syncs drained");
        }
    }

    fn background_tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.background
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn log_background_exit(finished: Result<(), tokio::task::JoinError>) {
    if let Err(e) = finished {
        tracing::error!(error = %e, "Background cache sync task panicked");
    }
}
