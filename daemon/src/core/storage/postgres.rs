use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info};
use promodraw_common::models::{Draw, DrawSource, PrizeStructure, PrizeTier, Winner};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

use super::{PastWinsByTier, Storage, StorageError};

// Schema bootstrap, applied idempotently at connect time. The partial unique
// index on draw_date is what serializes concurrent non-rerun executions:
// the first commit wins, the second surfaces as DuplicateDrawDate.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS prize_structures (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        effective_date DATE NOT NULL,
        eligible_days TEXT[] NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS prize_tiers (
        id UUID PRIMARY KEY,
        prize_structure_id UUID NOT NULL REFERENCES prize_structures(id) ON DELETE CASCADE,
        tier_name TEXT NOT NULL,
        amount BIGINT NOT NULL,
        quantity INT NOT NULL DEFAULT 1,
        runner_up_count INT NOT NULL DEFAULT 0,
        order_index INT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_prize_tiers_structure
        ON prize_tiers (prize_structure_id, order_index)",
    "CREATE TABLE IF NOT EXISTS draws (
        id UUID PRIMARY KEY,
        draw_date DATE NOT NULL,
        prize_structure_id UUID NOT NULL REFERENCES prize_structures(id),
        total_entries BIGINT NOT NULL DEFAULT 0,
        admin_user_id UUID NOT NULL,
        source TEXT NOT NULL,
        is_rerun BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_draws_unique_date
        ON draws (draw_date) WHERE is_rerun = FALSE",
    "CREATE TABLE IF NOT EXISTS winners (
        id UUID PRIMARY KEY,
        draw_id UUID NOT NULL REFERENCES draws(id) ON DELETE CASCADE,
        prize_tier_id UUID NOT NULL REFERENCES prize_tiers(id),
        msisdn TEXT NOT NULL,
        position INT NOT NULL,
        is_runner_up BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE INDEX IF NOT EXISTS idx_winners_draw ON winners (draw_id)",
];

#[derive(FromRow)]
struct StructureRow {
    id: Uuid,
    name: String,
    effective_date: NaiveDate,
    eligible_days: Vec<String>,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct TierRow {
    id: Uuid,
    prize_structure_id: Uuid,
    tier_name: String,
    amount: i64,
    quantity: i32,
    runner_up_count: i32,
    order_index: i32,
}

#[derive(FromRow)]
struct DrawRow {
    id: Uuid,
    draw_date: NaiveDate,
    prize_structure_id: Uuid,
    total_entries: i64,
    admin_user_id: Uuid,
    source: String,
    is_rerun: bool,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct WinnerRow {
    id: Uuid,
    draw_id: Uuid,
    prize_tier_id: Uuid,
    msisdn: String,
    position: i32,
    is_runner_up: bool,
    created_at: DateTime<Utc>,
    tier_name: String,
}

impl From<TierRow> for PrizeTier {
    fn from(row: TierRow) -> Self {
        PrizeTier {
            id: row.id,
            prize_structure_id: row.prize_structure_id,
            tier_name: row.tier_name,
            amount: row.amount,
            quantity: row.quantity,
            runner_up_count: row.runner_up_count,
            order_index: row.order_index,
        }
    }
}

impl From<DrawRow> for Draw {
    fn from(row: DrawRow) -> Self {
        Draw {
            id: row.id,
            draw_date: row.draw_date,
            prize_structure_id: row.prize_structure_id,
            total_entries: row.total_entries,
            admin_user_id: row.admin_user_id,
            source: row.source.parse().unwrap_or(DrawSource::PostHog),
            is_rerun: row.is_rerun,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL-backed storage over a shared connection pool. The draw
/// transaction borrows one connection for its whole duration.
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Open the pool and apply the schema bootstrap.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        info!("database schema ready");

        Ok(Self { pool })
    }

    async fn tiers_of(&self, structure_id: Uuid) -> Result<Vec<PrizeTier>, StorageError> {
        let rows = sqlx::query_as::<_, TierRow>(
            "SELECT id, prize_structure_id, tier_name, amount, quantity, runner_up_count, order_index
             FROM prize_tiers WHERE prize_structure_id = $1 ORDER BY order_index ASC",
        )
        .bind(structure_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PrizeTier::from).collect())
    }

    fn structure_from(row: StructureRow, tiers: Vec<PrizeTier>) -> PrizeStructure {
        PrizeStructure {
            id: row.id,
            name: row.name,
            effective_date: row.effective_date,
            eligible_days: row.eligible_days,
            tiers,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn get_prize_structure(&self, id: Uuid) -> Result<Option<PrizeStructure>, StorageError> {
        let row = sqlx::query_as::<_, StructureRow>(
            "SELECT id, name, effective_date, eligible_days, created_at
             FROM prize_structures WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let tiers = self.tiers_of(row.id).await?;
                Ok(Some(Self::structure_from(row, tiers)))
            }
            None => Ok(None),
        }
    }

    async fn list_prize_structures(&self) -> Result<Vec<PrizeStructure>, StorageError> {
        let rows = sqlx::query_as::<_, StructureRow>(
            "SELECT id, name, effective_date, eligible_days, created_at
             FROM prize_structures ORDER BY effective_date DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut structures = Vec::with_capacity(rows.len());
        for row in rows {
            let tiers = self.tiers_of(row.id).await?;
            structures.push(Self::structure_from(row, tiers));
        }
        Ok(structures)
    }

    async fn find_draw_by_date(&self, date: NaiveDate) -> Result<Option<Draw>, StorageError> {
        let row = sqlx::query_as::<_, DrawRow>(
            "SELECT id, draw_date, prize_structure_id, total_entries, admin_user_id, source, is_rerun, created_at
             FROM draws WHERE draw_date = $1 AND is_rerun = FALSE",
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Draw::from))
    }

    async fn get_draw(&self, id: Uuid) -> Result<Option<Draw>, StorageError> {
        let row = sqlx::query_as::<_, DrawRow>(
            "SELECT id, draw_date, prize_structure_id, total_entries, admin_user_id, source, is_rerun, created_at
             FROM draws WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Draw::from))
    }

    async fn list_draws(&self) -> Result<Vec<Draw>, StorageError> {
        let rows = sqlx::query_as::<_, DrawRow>(
            "SELECT id, draw_date, prize_structure_id, total_entries, admin_user_id, source, is_rerun, created_at
             FROM draws ORDER BY draw_date DESC, created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Draw::from).collect())
    }

    async fn get_winners(&self, draw_id: Uuid) -> Result<Vec<(Winner, String)>, StorageError> {
        let rows = sqlx::query_as::<_, WinnerRow>(
            "SELECT w.id, w.draw_id, w.prize_tier_id, w.msisdn, w.position, w.is_runner_up,
                    w.created_at, t.tier_name
             FROM winners w
             JOIN prize_tiers t ON t.id = w.prize_tier_id
             WHERE w.draw_id = $1
             ORDER BY t.order_index ASC, w.is_runner_up ASC, w.position ASC",
        )
        .bind(draw_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let tier_name = row.tier_name.clone();
                (
                    Winner {
                        id: row.id,
                        draw_id: row.draw_id,
                        prize_tier_id: row.prize_tier_id,
                        msisdn: row.msisdn,
                        position: row.position,
                        is_runner_up: row.is_runner_up,
                        created_at: row.created_at,
                    },
                    tier_name,
                )
            })
            .collect())
    }

    async fn load_past_wins(&self) -> Result<PastWinsByTier, StorageError> {
        let rows = sqlx::query_as::<_, (String, Uuid)>(
            "SELECT msisdn, prize_tier_id FROM winners",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut past = PastWinsByTier::new();
        for (msisdn, tier_id) in rows {
            past.entry(msisdn).or_default().insert(tier_id);
        }
        debug!("loaded past wins for {} msisdns", past.len());
        Ok(past)
    }

    async fn commit_draw(&self, draw: &Draw, winners: &[Winner]) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO draws (id, draw_date, prize_structure_id, total_entries, admin_user_id, source, is_rerun, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(draw.id)
        .bind(draw.draw_date)
        .bind(draw.prize_structure_id)
        .bind(draw.total_entries)
        .bind(draw.admin_user_id)
        .bind(draw.source.as_str())
        .bind(draw.is_rerun)
        .bind(draw.created_at)
        .execute(&mut *tx)
        .await;

        if let Err(err) = inserted {
            // dropping the transaction rolls it back
            if is_unique_violation(&err) {
                return Err(StorageError::DuplicateDrawDate(draw.draw_date));
            }
            return Err(err.into());
        }

        for winner in winners {
            sqlx::query(
                "INSERT INTO winners (id, draw_id, prize_tier_id, msisdn, position, is_runner_up, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(winner.id)
            .bind(winner.draw_id)
            .bind(winner.prize_tier_id)
            .bind(winner.msisdn.as_str())
            .bind(winner.position)
            .bind(winner.is_runner_up)
            .bind(winner.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(
            "committed draw {} for {} with {} winners",
            draw.id,
            draw.draw_date,
            winners.len()
        );
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
