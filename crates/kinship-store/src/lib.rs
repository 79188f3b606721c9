//! kinship-store: Relational persistence for kinship resolution.
//!
//! Two stores live here:
//! - the citizen record store (canonical attributes, read-only to the
//!   resolver) used for id / national-id lookups and candidate pools;
//! - the relationship cache, a table of directed relationship edges with
//!   confidence, source, and expiry.
//!
//! Each is a trait with a Postgres implementation ([`PgStore`]) and an
//! in-memory implementation for tests and local runs.

pub mod citizens;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod relationships;

pub use citizens::CitizenStore;
pub use error::StoreError;
pub use memory::{InMemoryCitizenStore, InMemoryRelationshipCache};
pub use postgres::PgStore;
pub use relationships::{RelationshipCache, ReplaceScope};
