//! Candidate pool construction for heuristic inference.
//!
//! Address tiers are consulted from most to least specific, and a wider
//! tier is only queried while the pool is still nearly empty so a large
//! city or district never floods the pool with unrelated residents.

use std::collections::HashSet;

use chrono::NaiveDate;
use kinship_core::{AddressTier, CitizenId, CitizenRecord};
use kinship_store::{CitizenStore, StoreError};

use crate::heuristic::Candidate;

pub const EXACT_ADDRESS_LIMIT: usize = 15;
pub const CITY_LIMIT: usize = 15;
pub const DISTRICT_LIMIT: usize = 8;
pub const MAX_POOL_SIZE: usize = 15;

/// Query the city tier while the pool holds at most this many candidates.
const CITY_WIDEN_THRESHOLD: usize = 2;
/// Query the district tier while the pool holds at most this many candidates.
const DISTRICT_WIDEN_THRESHOLD: usize = 1;

pub fn should_widen_to_city(pool_len: usize) -> bool {
    pool_len <= CITY_WIDEN_THRESHOLD
}

pub fn should_widen_to_district(pool_len: usize) -> bool {
    pool_len <= DISTRICT_WIDEN_THRESHOLD
}

/// Build the candidate pool for `root`, at most [`MAX_POOL_SIZE`] long.
pub async fn build_candidate_pool(
    citizens: &dyn CitizenStore,
    root: &CitizenRecord,
    today: NaiveDate,
) -> Result<Vec<Candidate>, StoreError> {
    let mut pool = citizens
        .find_candidates(root, AddressTier::Exact, EXACT_ADDRESS_LIMIT)
        .await?;
    let exact = pool.len();

    if should_widen_to_city(pool.len()) {
        let city = citizens
            .find_candidates(root, AddressTier::City, CITY_LIMIT)
            .await?;
        merge_unique(&mut pool, city);
    }
    let through_city = pool.len();

    if should_widen_to_district(pool.len()) {
        let district = citizens
            .find_candidates(root, AddressTier::District, DISTRICT_LIMIT)
            .await?;
        merge_unique(&mut pool, district);
    }

    pool.truncate(MAX_POOL_SIZE);

    tracing::debug!(
        citizen_id = %root.id,
        exact,
        through_city,
        total = pool.len(),
        "Built candidate pool"
    );

    Ok(pool
        .into_iter()
        .map(|record| Candidate::new(root, record, today))
        .filter(|c| c.tier != AddressTier::NoMatch)
        .collect())
}

fn merge_unique(pool: &mut Vec<CitizenRecord>, more: Vec<CitizenRecord>) {
    let mut seen: HashSet<CitizenId> = pool.iter().map(|r| r.id).collect();
    pool.extend(more.into_iter().filter(|r| seen.insert(r.id)));
}
