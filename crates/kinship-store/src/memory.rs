//! In-memory store implementations.
//!
//! Mirror the Postgres semantics (ordering, replace atomicity, expiry) so
//! the resolver can be exercised without a database.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kinship_core::{AddressTier, CitizenId, CitizenRecord, EdgeKey, RelationshipEdge};
use tokio::sync::RwLock;

use crate::citizens::CitizenStore;
use crate::error::Result;
use crate::relationships::{RelationshipCache, ReplaceScope};

/// Citizen records held in a vector.
#[derive(Default)]
pub struct InMemoryCitizenStore {
    records: RwLock<Vec<CitizenRecord>>,
}

impl InMemoryCitizenStore {
    pub fn new(records: Vec<CitizenRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait]
impl CitizenStore for InMemoryCitizenStore {
    async fn get(&self, id: &CitizenId) -> Result<Option<CitizenRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| &r.id == id).cloned())
    }

    async fn find_by_national_id(&self, national_id: &str) -> Result<Option<CitizenRecord>> {
        let national_id = national_id.trim();
        if national_id.is_empty() {
            return Ok(None);
        }
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|r| r.national_id.as_deref() == Some(national_id))
            .cloned())
    }

    async fn find_candidates(
        &self,
        root: &CitizenRecord,
        tier: AddressTier,
        limit: usize,
    ) -> Result<Vec<CitizenRecord>> {
        let records = self.records.read().await;
        let mut matches: Vec<CitizenRecord> = records
            .iter()
            .filter(|r| r.id != root.id)
            .filter(|r| r.gender.is_some() && r.date_of_birth.is_some())
            .filter(|r| root.shares(r, tier))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.full_name.cmp(&b.full_name).then(a.id.cmp(&b.id)));
        matches.truncate(limit);
        Ok(matches)
    }
}

/// Relationship edges held in insertion order behind one lock.
#[derive(Default)]
pub struct InMemoryRelationshipCache {
    rows: RwLock<Vec<RelationshipEdge>>,
}

impl InMemoryRelationshipCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored row, expired or not, in insertion order.
    pub async fn snapshot(&self) -> Vec<RelationshipEdge> {
        self.rows.read().await.clone()
    }

    /// Insert rows directly, bypassing replace semantics.
    pub async fn seed(&self, edges: impl IntoIterator<Item = RelationshipEdge>) {
        self.rows.write().await.extend(edges);
    }
}

#[async_trait]
impl RelationshipCache for InMemoryRelationshipCache {
    async fn active_edges(
        &self,
        citizen: &CitizenId,
        now: DateTime<Utc>,
    ) -> Result<Vec<RelationshipEdge>> {
        let rows = self.rows.read().await;
        let mut edges: Vec<RelationshipEdge> = rows
            .iter()
            .filter(|e| &e.from_citizen_id == citizen && !e.is_expired(now))
            .cloned()
            .collect();
        // Stable, so equal confidences keep insertion order.
        edges.sort_by(|a, b| b.confidence.cmp(&a.confidence));
        Ok(edges)
    }

    async fn replace_edges(
        &self,
        citizen: &CitizenId,
        scope: ReplaceScope,
        edges: &[RelationshipEdge],
    ) -> Result<usize> {
        // The write guard spans delete and insert.
        let mut rows = self.rows.write().await;
        rows.retain(|e| !(&e.from_citizen_id == citizen && scope.covers(e.source)));

        let mut keys: HashSet<EdgeKey> = rows
            .iter()
            .filter(|e| &e.from_citizen_id == citizen)
            .map(RelationshipEdge::key)
            .collect();

        let mut inserted = 0;
        for edge in edges.iter().filter(|e| &e.from_citizen_id == citizen) {
            if keys.insert(edge.key()) {
                rows.push(edge.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|e| !e.is_expired(now));
        Ok((before - rows.len()) as u64)
    }
}
