//! Postgres implementation of the citizen store and relationship cache.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use kinship_core::config::DatabaseSettings;
use kinship_core::{
    AddressTier, CitizenId, CitizenRecord, Gender, RelationshipEdge, RelationshipSource,
    RelationshipType,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::citizens::CitizenStore;
use crate::error::{Result, StoreError};
use crate::relationships::{RelationshipCache, ReplaceScope};

const CITIZEN_COLUMNS: &str =
    "id, full_name, date_of_birth, gender, address_line, city, district, national_id";

const EDGE_COLUMNS: &str = "from_citizen_id, to_citizen_id, relationship_type, label, confidence, \
                            verified, source, depth, synced_at, expires_at";

/// Postgres-backed store. Clone is cheap (the pool is shared).
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool with the given settings.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect(&settings.url)
            .await?;
        tracing::info!(max_connections = settings.max_connections, "Connected to Postgres");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CitizenStore for PgStore {
    async fn get(&self, id: &CitizenId) -> Result<Option<CitizenRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {CITIZEN_COLUMNS} FROM citizens WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_citizen).transpose()
    }

    async fn find_by_national_id(&self, national_id: &str) -> Result<Option<CitizenRecord>> {
        let national_id = national_id.trim();
        if national_id.is_empty() {
            return Ok(None);
        }

        let row = sqlx::query(&format!(
            "SELECT {CITIZEN_COLUMNS} FROM citizens WHERE national_id = $1 LIMIT 1"
        ))
        .bind(national_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_citizen).transpose()
    }

    async fn find_candidates(
        &self,
        root: &CitizenRecord,
        tier: AddressTier,
        limit: usize,
    ) -> Result<Vec<CitizenRecord>> {
        let (column, value) = match tier {
            AddressTier::Exact => ("address_line", root.address_line.as_str()),
            AddressTier::City => ("city", root.city.as_str()),
            AddressTier::District => ("district", root.district.as_str()),
            AddressTier::NoMatch => return Ok(Vec::new()),
        };
        if value.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(&format!(
            "SELECT {CITIZEN_COLUMNS} FROM citizens
             WHERE id <> $1
               AND gender IS NOT NULL
               AND date_of_birth IS NOT NULL
               AND lower(trim({column})) = lower(trim($2))
             ORDER BY full_name, id
             LIMIT $3"
        ))
        .bind(root.id.0)
        .bind(value)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_citizen).collect()
    }
}

#[async_trait]
impl RelationshipCache for PgStore {
    async fn active_edges(
        &self,
        citizen: &CitizenId,
        now: DateTime<Utc>,
    ) -> Result<Vec<RelationshipEdge>> {
        let rows = sqlx::query(&format!(
            "SELECT {EDGE_COLUMNS} FROM family_relationships
             WHERE from_citizen_id = $1
               AND (expires_at IS NULL OR expires_at >= $2)
             ORDER BY confidence DESC, id"
        ))
        .bind(citizen.0)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_edge).collect()
    }

    async fn replace_edges(
        &self,
        citizen: &CitizenId,
        scope: ReplaceScope,
        edges: &[RelationshipEdge],
    ) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        // Serialise replaces for this citizen until commit.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(citizen.to_string())
            .execute(&mut *tx)
            .await?;

        let deleted = match scope {
            ReplaceScope::Source(source) => {
                sqlx::query(
                    "DELETE FROM family_relationships
                     WHERE from_citizen_id = $1 AND source = $2",
                )
                .bind(citizen.0)
                .bind(source.as_str())
                .execute(&mut *tx)
                .await?
            }
            ReplaceScope::All => {
                sqlx::query("DELETE FROM family_relationships WHERE from_citizen_id = $1")
                    .bind(citizen.0)
                    .execute(&mut *tx)
                    .await?
            }
        };

        let mut inserted = 0usize;
        for edge in edges.iter().filter(|e| e.from_citizen_id == *citizen) {
            let result = sqlx::query(
                "INSERT INTO family_relationships
                    (from_citizen_id, to_citizen_id, relationship_type, label, confidence,
                     verified, source, depth, synced_at, expires_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                 ON CONFLICT (from_citizen_id, to_citizen_id, relationship_type) DO NOTHING",
            )
            .bind(edge.from_citizen_id.0)
            .bind(edge.to_citizen_id.0)
            .bind(edge.relationship_type.as_str())
            .bind(&edge.label)
            .bind(i16::from(edge.confidence.min(100)))
            .bind(edge.verified)
            .bind(edge.source.as_str())
            .bind(edge.depth as i32)
            .bind(edge.synced_at)
            .bind(edge.expires_at)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected() as usize;
        }

        tx.commit().await?;

        tracing::debug!(
            citizen_id = %citizen,
            scope = ?scope,
            deleted = deleted.rows_affected(),
            inserted,
            "Replaced relationship edges"
        );
        Ok(inserted)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM family_relationships
             WHERE expires_at IS NOT NULL AND expires_at < $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

fn row_to_citizen(row: &PgRow) -> Result<CitizenRecord> {
    let id: Uuid = row.try_get("id")?;
    let gender: Option<String> = row.try_get("gender")?;
    let date_of_birth: Option<NaiveDate> = row.try_get("date_of_birth")?;

    Ok(CitizenRecord {
        id: CitizenId(id),
        full_name: row.try_get("full_name")?,
        date_of_birth,
        gender: gender.as_deref().and_then(Gender::parse),
        address_line: row.try_get("address_line")?,
        city: row.try_get("city")?,
        district: row.try_get("district")?,
        national_id: row.try_get("national_id")?,
    })
}

fn row_to_edge(row: &PgRow) -> Result<RelationshipEdge> {
    let relationship_type: String = row.try_get("relationship_type")?;
    let relationship_type =
        RelationshipType::parse(&relationship_type).ok_or_else(|| StoreError::InvalidRow {
            table: "family_relationships",
            reason: format!("unknown relationship type {relationship_type:?}"),
        })?;

    let source: String = row.try_get("source")?;
    let source = RelationshipSource::parse(&source).ok_or_else(|| StoreError::InvalidRow {
        table: "family_relationships",
        reason: format!("unknown source {source:?}"),
    })?;

    let confidence: i16 = row.try_get("confidence")?;
    let depth: i32 = row.try_get("depth")?;

    Ok(RelationshipEdge {
        from_citizen_id: CitizenId(row.try_get("from_citizen_id")?),
        to_citizen_id: CitizenId(row.try_get("to_citizen_id")?),
        relationship_type,
        label: row.try_get("label")?,
        confidence: confidence.clamp(0, 100) as u8,
        verified: row.try_get("verified")?,
        source,
        depth: depth.max(0) as u32,
        synced_at: row.try_get("synced_at")?,
        expires_at: row.try_get("expires_at")?,
    })
}
