//! Error types for the kinship-resolve crate.

use kinship_core::CitizenId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Citizen not found: {0}")]
    CitizenNotFound(CitizenId),

    #[error("Graph error: {0}")]
    Graph(#[from] kinship_graph::GraphError),

    #[error("Store error: {0}")]
    Store(#[from] kinship_store::StoreError),
}

pub type Result<T> = std::result::Result<T, ResolveError>;
