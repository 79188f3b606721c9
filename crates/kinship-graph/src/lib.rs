//! kinship-graph: Neo4j adapter for the authoritative family graph.
//!
//! This crate is the only reader of the graph store. It exposes a bounded
//! family-network traversal behind the [`FamilyNetworkSource`] trait so the
//! resolver can be driven by a live Neo4j instance or a scripted source.

pub mod client;
pub mod queries;
pub mod source;

pub use client::{GraphClient, GraphConfig, GraphError, LazyGraphClient};
pub use queries::{FamilyNetwork, NetworkEdge, NetworkNode};
pub use source::FamilyNetworkSource;
