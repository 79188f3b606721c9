//! kinship-core: Shared types, configuration, and error handling for
//! family relationship resolution.
//!
//! This crate provides the foundational types used across all kinship crates:
//! - Citizen records and address tiers
//! - Relationship edges, types, and sources for the relationship cache
//! - Family graph results returned to callers
//! - Layered configuration
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::KinshipConfig;
pub use error::KinshipError;
pub use types::{
    AddressTier, CitizenId, CitizenRecord, EdgeKey, FamilyGraphResult, FamilyLink, FamilyMember,
    Gender, RelationshipAssertion, RelationshipEdge, RelationshipSource, RelationshipType,
    ResolutionTier,
};
