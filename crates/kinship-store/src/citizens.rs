//! Citizen record store trait.

use async_trait::async_trait;
use kinship_core::{AddressTier, CitizenId, CitizenRecord};

use crate::error::Result;

/// Read access to canonical citizen records.
#[async_trait]
pub trait CitizenStore: Send + Sync {
    async fn get(&self, id: &CitizenId) -> Result<Option<CitizenRecord>>;

    async fn find_by_national_id(&self, national_id: &str) -> Result<Option<CitizenRecord>>;

    /// Other citizens sharing `root`'s address field at `tier`, restricted to
    /// records with a known gender and date of birth, at most `limit` of them.
    ///
    /// Ordered by name then id so repeated calls return the same pool.
    async fn find_candidates(
        &self,
        root: &CitizenRecord,
        tier: AddressTier,
        limit: usize,
    ) -> Result<Vec<CitizenRecord>>;
}
