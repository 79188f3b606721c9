//! Family-network traversal over the graph store.

use neo4rs::query;

use crate::client::{GraphClient, GraphError};

/// Relationship types followed by the family traversal.
const FAMILY_REL_TYPES: &str = "SPOUSE|CHILD|PARENT|SIBLING|CO_RESIDENT|SAME_HOUSEHOLD";

/// Upper bound on traversal hops regardless of the requested depth.
pub const MAX_TRAVERSAL_DEPTH: u32 = 6;

/// A citizen node as returned by the graph store.
///
/// `node_id` is Neo4j's internal id; it is only meaningful within one
/// query result.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NetworkNode {
    pub node_id: i64,
    /// Internal citizen UUID carried on the node, if any.
    pub citizen_id: Option<String>,
    pub national_id: Option<String>,
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
}

/// A directed relationship between two nodes of the same result.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NetworkEdge {
    pub from_node: i64,
    pub to_node: i64,
    pub rel_type: String,
    /// Relationship weight in `[0, 1]`, when the graph records one.
    pub weight: Option<f64>,
}

/// Result of a family-network query. Empty when the root is unknown.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FamilyNetwork {
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<NetworkEdge>,
}

impl FamilyNetwork {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl GraphClient {
    /// Traverse up to `depth` family hops from the citizen identified by
    /// `identifier` (internal citizen id or national id).
    ///
    /// Returns an empty network when no node matches.
    pub async fn query_family_network(
        &self,
        identifier: &str,
        depth: u32,
    ) -> Result<FamilyNetwork, GraphError> {
        let depth = depth.clamp(1, MAX_TRAVERSAL_DEPTH);

        let node_query = query(&format!(
            "MATCH (root:Citizen)
             WHERE root.citizen_id = $identifier OR root.national_id = $identifier
             WITH root LIMIT 1
             OPTIONAL MATCH (root)-[:{FAMILY_REL_TYPES}*1..{depth}]-(rel:Citizen)
             WITH root, collect(DISTINCT rel) AS relatives
             UNWIND [root] + relatives AS n
             WITH DISTINCT n
             RETURN id(n) AS node_id, n.citizen_id AS citizen_id,
                    n.national_id AS national_id, n.name AS name,
                    n.age AS age, n.gender AS gender
             ORDER BY node_id"
        ))
        .param("identifier", identifier.to_string());

        let rows = self.query_rows(node_query).await?;
        let mut nodes = Vec::with_capacity(rows.len());
        for row in rows {
            let node_id: i64 = row.get("node_id").map_err(|e| {
                GraphError::Serialization(format!("Failed to read node id: {e}"))
            })?;
            nodes.push(NetworkNode {
                node_id,
                citizen_id: non_empty(row.get::<String>("citizen_id").ok()),
                national_id: non_empty(row.get::<String>("national_id").ok()),
                name: non_empty(row.get::<String>("name").ok()),
                age: row
                    .get::<i64>("age")
                    .ok()
                    .and_then(|a| u32::try_from(a).ok()),
                gender: non_empty(row.get::<String>("gender").ok()),
            });
        }

        if nodes.is_empty() {
            tracing::debug!(identifier, "No graph node for identifier");
            return Ok(FamilyNetwork::default());
        }

        let ids: Vec<i64> = nodes.iter().map(|n| n.node_id).collect();
        let edge_query = query(&format!(
            "MATCH (a:Citizen)-[r:{FAMILY_REL_TYPES}]->(b:Citizen)
             WHERE id(a) IN $ids AND id(b) IN $ids
             RETURN id(a) AS from_node, id(b) AS to_node,
                    type(r) AS rel_type, r.weight AS weight
             ORDER BY from_node, to_node, rel_type"
        ))
        .param("ids", ids);

        let rows = self.query_rows(edge_query).await?;
        let mut edges = Vec::with_capacity(rows.len());
        for row in rows {
            let from_node: i64 = row.get("from_node").map_err(|e| {
                GraphError::Serialization(format!("Failed to read edge source: {e}"))
            })?;
            let to_node: i64 = row.get("to_node").map_err(|e| {
                GraphError::Serialization(format!("Failed to read edge target: {e}"))
            })?;
            edges.push(NetworkEdge {
                from_node,
                to_node,
                rel_type: row.get::<String>("rel_type").unwrap_or_default(),
                weight: row.get::<f64>("weight").ok(),
            });
        }

        tracing::debug!(
            identifier,
            depth,
            nodes = nodes.len(),
            edges = edges.len(),
            "Family network fetched"
        );

        Ok(FamilyNetwork { nodes, edges })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
