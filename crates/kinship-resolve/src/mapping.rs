//! Mapping graph-store results onto citizen identities.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use kinship_core::types::FAMILY_MEMBER_LABEL;
use kinship_core::{
    CitizenId, CitizenRecord, EdgeKey, FamilyGraphResult, FamilyLink, FamilyMember, Gender,
    RelationshipEdge, RelationshipSource, RelationshipType, ResolutionTier,
};
use kinship_graph::{FamilyNetwork, FamilyNetworkSource, GraphError, NetworkNode};
use kinship_store::{CitizenStore, StoreError};

/// Confidence of a graph relationship that carries no weight.
pub const DEFAULT_GRAPH_CONFIDENCE: u8 = 85;

/// Graph node ids resolved to citizen ids.
#[derive(Debug, Default)]
pub struct NodeMapping {
    pub citizens: HashMap<i64, CitizenId>,
    pub unmapped: usize,
}

impl NodeMapping {
    pub fn get(&self, node_id: i64) -> Option<CitizenId> {
        self.citizens.get(&node_id).copied()
    }
}

/// Query the graph for `root`, first by citizen id and then, if that finds
/// nothing, by national id.
pub async fn fetch_network(
    graph: &dyn FamilyNetworkSource,
    root: &CitizenRecord,
    depth: u32,
) -> Result<FamilyNetwork, GraphError> {
    let network = graph.family_network(&root.id.to_string(), depth).await?;
    if !network.is_empty() {
        return Ok(network);
    }
    match root.national_id.as_deref().filter(|n| !n.trim().is_empty()) {
        Some(national_id) => graph.family_network(national_id, depth).await,
        None => Ok(network),
    }
}

/// Resolve every node to a citizen id: the embedded citizen UUID when it
/// parses, otherwise a national-id lookup. Nodes matching neither are
/// counted as unmapped and dropped.
pub async fn map_nodes(
    citizens: &dyn CitizenStore,
    nodes: &[NetworkNode],
) -> Result<NodeMapping, StoreError> {
    let mut mapping = NodeMapping::default();

    for node in nodes {
        if let Some(id) = node
            .citizen_id
            .as_deref()
            .and_then(|raw| raw.parse::<CitizenId>().ok())
        {
            mapping.citizens.insert(node.node_id, id);
            continue;
        }

        let by_national_id = match node.national_id.as_deref() {
            Some(national_id) => citizens.find_by_national_id(national_id).await?,
            None => None,
        };
        match by_national_id {
            Some(record) => {
                mapping.citizens.insert(node.node_id, record.id);
            }
            None => {
                tracing::warn!(
                    node_id = node.node_id,
                    national_id = ?node.national_id,
                    "Skipping graph node with no matching citizen"
                );
                mapping.unmapped += 1;
            }
        }
    }

    Ok(mapping)
}

/// Graph weight in `[0, 1]` scaled to a 0–100 confidence.
pub fn confidence_from_weight(weight: Option<f64>) -> u8 {
    match weight {
        Some(w) if w.is_finite() => (w * 100.0).round().clamp(0.0, 100.0) as u8,
        _ => DEFAULT_GRAPH_CONFIDENCE,
    }
}

/// Build the tier-1 family graph from a mapped network.
///
/// Links are every typed edge whose endpoints both mapped, de-duplicated by
/// (from, to, type). Members keep graph order after the root; a member's
/// label is its relationship to the root when they are directly linked and
/// "Family Member" otherwise.
pub fn network_to_family_graph(
    root: &CitizenRecord,
    network: &FamilyNetwork,
    mapping: &NodeMapping,
    today: NaiveDate,
) -> FamilyGraphResult {
    let mut result = FamilyGraphResult::self_only(root, ResolutionTier::Graph, today);
    let mut keys: HashSet<EdgeKey> = HashSet::new();
    let mut direct: HashMap<CitizenId, (&'static str, u8)> = HashMap::new();
    let mut best: HashMap<CitizenId, u8> = HashMap::new();

    for edge in &network.edges {
        let (Some(from), Some(to)) = (mapping.get(edge.from_node), mapping.get(edge.to_node)) else {
            continue;
        };
        let Some(relationship_type) = RelationshipType::parse(&edge.rel_type) else {
            tracing::debug!(rel_type = %edge.rel_type, "Ignoring unknown relationship type");
            continue;
        };
        if from == to || !keys.insert(EdgeKey { from, to, relationship_type }) {
            continue;
        }

        let confidence = confidence_from_weight(edge.weight);
        if from == root.id {
            direct
                .entry(to)
                .or_insert((relationship_type.label(), confidence));
        } else if to == root.id {
            direct
                .entry(from)
                .or_insert((relationship_type.inverse_label(), confidence));
        }
        for id in [from, to] {
            let entry = best.entry(id).or_insert(confidence);
            *entry = (*entry).max(confidence);
        }

        result.links.push(FamilyLink {
            from,
            to,
            relationship: relationship_type.label().to_string(),
            confidence,
        });
    }

    for node in &network.nodes {
        let Some(id) = mapping.get(node.node_id) else {
            continue;
        };
        if result.contains(&id) {
            continue;
        }
        let (relationship, confidence) = direct.get(&id).copied().unwrap_or_else(|| {
            (
                FAMILY_MEMBER_LABEL,
                best.get(&id).copied().unwrap_or(DEFAULT_GRAPH_CONFIDENCE),
            )
        });
        result.members.push(FamilyMember {
            citizen_id: id,
            name: node.name.clone().unwrap_or_else(|| "Unknown".to_string()),
            relationship: relationship.to_string(),
            age: node.age,
            gender: node.gender.as_deref().and_then(Gender::parse),
            confidence,
        });
    }

    result
}

/// Whether a tier-1 result carries anything beyond the root itself.
pub fn is_usable(result: &FamilyGraphResult) -> bool {
    !result.links.is_empty() || result.members.len() > 1
}

/// Cache rows for every graph edge that starts at the root.
pub fn graph_edges_for_root(
    root: &CitizenId,
    network: &FamilyNetwork,
    mapping: &NodeMapping,
    synced_at: DateTime<Utc>,
    ttl: TimeDelta,
) -> Vec<RelationshipEdge> {
    let mut keys: HashSet<EdgeKey> = HashSet::new();
    let mut edges = Vec::new();

    for edge in &network.edges {
        if mapping.get(edge.from_node) != Some(*root) {
            continue;
        }
        let Some(to) = mapping.get(edge.to_node) else {
            continue;
        };
        let Some(relationship_type) = RelationshipType::parse(&edge.rel_type) else {
            continue;
        };
        if to == *root
            || !keys.insert(EdgeKey {
                from: *root,
                to,
                relationship_type,
            })
        {
            continue;
        }

        edges.push(RelationshipEdge {
            from_citizen_id: *root,
            to_citizen_id: to,
            relationship_type,
            label: relationship_type.label().to_string(),
            confidence: confidence_from_weight(edge.weight),
            verified: false,
            source: RelationshipSource::Graph,
            depth: 1,
            synced_at,
            expires_at: Some(synced_at + ttl),
        });
    }

    edges
}
