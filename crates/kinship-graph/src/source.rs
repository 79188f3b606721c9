//! The graph-store seam used by the resolver and the sync job.

use async_trait::async_trait;

use crate::client::{GraphClient, GraphError, LazyGraphClient};
use crate::queries::FamilyNetwork;

/// Anything that can answer a bounded family-network query.
///
/// "Not found" is an empty [`FamilyNetwork`]; errors are reserved for the
/// store being unreachable.
#[async_trait]
pub trait FamilyNetworkSource: Send + Sync {
    async fn family_network(&self, identifier: &str, depth: u32)
        -> Result<FamilyNetwork, GraphError>;
}

#[async_trait]
impl FamilyNetworkSource for GraphClient {
    async fn family_network(
        &self,
        identifier: &str,
        depth: u32,
    ) -> Result<FamilyNetwork, GraphError> {
        self.query_family_network(identifier, depth).await
    }
}

#[async_trait]
impl FamilyNetworkSource for LazyGraphClient {
    async fn family_network(
        &self,
        identifier: &str,
        depth: u32,
    ) -> Result<FamilyNetwork, GraphError> {
        self.client()
            .await?
            .query_family_network(identifier, depth)
            .await
    }
}
