//! Shared fixtures for resolver tests: a scripted graph source and store
//! wrappers that count calls.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use kinship_core::{
    AddressTier, CitizenId, CitizenRecord, Gender, KinshipConfig, RelationshipEdge,
};
use kinship_graph::{FamilyNetwork, FamilyNetworkSource, GraphError, NetworkEdge, NetworkNode};
use kinship_resolve::FamilyResolver;
use kinship_store::error::Result as StoreResult;
use kinship_store::{
    CitizenStore, InMemoryCitizenStore, InMemoryRelationshipCache, RelationshipCache,
    ReplaceScope,
};

// ── Graph source ──────────────────────────────────────────────────

/// Graph source answering from a fixed identifier → network table.
#[derive(Default)]
pub struct ScriptedGraph {
    networks: Mutex<HashMap<String, FamilyNetwork>>,
    unavailable: AtomicBool,
    latency_ms: AtomicU64,
    pub calls: AtomicUsize,
}

impl ScriptedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(&self, identifier: impl Into<String>, network: FamilyNetwork) {
        self.networks
            .lock()
            .unwrap()
            .insert(identifier.into(), network);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay every answer by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FamilyNetworkSource for ScriptedGraph {
    async fn family_network(
        &self,
        identifier: &str,
        _depth: u32,
    ) -> Result<FamilyNetwork, GraphError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GraphError::Connection("connection refused".to_string()));
        }
        Ok(self
            .networks
            .lock()
            .unwrap()
            .get(identifier)
            .cloned()
            .unwrap_or_default())
    }
}

// ── Counting stores ───────────────────────────────────────────────

/// Citizen store that counts candidate-pool queries.
pub struct CountingCitizens {
    pub inner: InMemoryCitizenStore,
    candidate_calls: AtomicUsize,
}

impl CountingCitizens {
    pub fn new(records: Vec<CitizenRecord>) -> Self {
        Self {
            inner: InMemoryCitizenStore::new(records),
            candidate_calls: AtomicUsize::new(0),
        }
    }

    pub fn candidate_calls(&self) -> usize {
        self.candidate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CitizenStore for CountingCitizens {
    async fn get(&self, id: &CitizenId) -> StoreResult<Option<CitizenRecord>> {
        self.inner.get(id).await
    }

    async fn find_by_national_id(&self, national_id: &str) -> StoreResult<Option<CitizenRecord>> {
        self.inner.find_by_national_id(national_id).await
    }

    async fn find_candidates(
        &self,
        root: &CitizenRecord,
        tier: AddressTier,
        limit: usize,
    ) -> StoreResult<Vec<CitizenRecord>> {
        self.candidate_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_candidates(root, tier, limit).await
    }
}

/// Relationship cache that counts reads.
#[derive(Default)]
pub struct CountingCache {
    pub inner: InMemoryRelationshipCache,
    reads: AtomicUsize,
}

impl CountingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelationshipCache for CountingCache {
    async fn active_edges(
        &self,
        citizen: &CitizenId,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<RelationshipEdge>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.active_edges(citizen, now).await
    }

    async fn replace_edges(
        &self,
        citizen: &CitizenId,
        scope: ReplaceScope,
        edges: &[RelationshipEdge],
    ) -> StoreResult<usize> {
        self.inner.replace_edges(citizen, scope, edges).await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        self.inner.delete_expired(now).await
    }
}

// ── Harness ───────────────────────────────────────────────────────

pub struct Harness {
    pub graph: Arc<ScriptedGraph>,
    pub citizens: Arc<CountingCitizens>,
    pub cache: Arc<CountingCache>,
    pub resolver: FamilyResolver,
}

impl Harness {
    pub fn new(records: Vec<CitizenRecord>) -> Self {
        Self::with_config(records, test_config())
    }

    pub fn with_config(records: Vec<CitizenRecord>, config: KinshipConfig) -> Self {
        let graph = Arc::new(ScriptedGraph::new());
        let citizens = Arc::new(CountingCitizens::new(records));
        let cache = Arc::new(CountingCache::new());
        let resolver = FamilyResolver::new(citizens.clone(), graph.clone(), cache.clone(), &config);
        Self {
            graph,
            citizens,
            cache,
            resolver,
        }
    }
}

/// Default settings with background sync off so tests stay deterministic.
pub fn test_config() -> KinshipConfig {
    let mut config = KinshipConfig::default();
    config.resolution.sync_on_resolve = false;
    config
}

// ── Fixtures ──────────────────────────────────────────────────────

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// A date of birth giving `age` completed years today.
pub fn born(age: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(today().year() - age as i32, 1, 1).unwrap()
}

pub fn citizen(name: &str, gender: Gender, age: u32, address: &str) -> CitizenRecord {
    let id = CitizenId::new();
    CitizenRecord {
        id,
        full_name: name.to_string(),
        date_of_birth: Some(born(age)),
        gender: Some(gender),
        address_line: address.to_string(),
        city: "Vijayawada".to_string(),
        district: "Krishna".to_string(),
        national_id: Some(format!("NID-{name}-{id}")),
    }
}

pub fn node(node_id: i64, record: &CitizenRecord) -> NetworkNode {
    NetworkNode {
        node_id,
        citizen_id: Some(record.id.to_string()),
        national_id: record.national_id.clone(),
        name: Some(record.full_name.clone()),
        age: record.age_on(today()),
        gender: record.gender.map(|g| g.as_str().to_string()),
    }
}

pub fn edge(from_node: i64, to_node: i64, rel_type: &str, weight: Option<f64>) -> NetworkEdge {
    NetworkEdge {
        from_node,
        to_node,
        rel_type: rel_type.to_string(),
        weight,
    }
}
