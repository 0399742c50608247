mod postgres;

pub use postgres::PgStorage;

use async_trait::async_trait;
use chrono::NaiveDate;
use promodraw_common::models::{Draw, PrizeStructure, Winner};
use thiserror::Error;
use uuid::Uuid;

use super::draw::PastWinsByTier;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("a non-rerun draw already exists for {0}")]
    DuplicateDrawDate(NaiveDate),
}

/// Persistence contract of the draw service.
///
/// Backed by PostgreSQL in production ([`PgStorage`]); tests use an
/// in-memory implementation.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Load a prize structure with its tiers in ascending order index.
    /// Returns None when the id is unknown.
    async fn get_prize_structure(&self, id: Uuid) -> Result<Option<PrizeStructure>, StorageError>;

    /// List every stored prize structure, tiers ordered.
    async fn list_prize_structures(&self) -> Result<Vec<PrizeStructure>, StorageError>;

    /// Find the non-rerun draw committed for a calendar date.
    async fn find_draw_by_date(&self, date: NaiveDate) -> Result<Option<Draw>, StorageError>;

    /// Load one draw by id.
    async fn get_draw(&self, id: Uuid) -> Result<Option<Draw>, StorageError>;

    /// All draws, most recent draw date first.
    async fn list_draws(&self) -> Result<Vec<Draw>, StorageError>;

    /// Winners of one draw with their tier names, ordered by tier order
    /// index, runner-up flag and position.
    async fn get_winners(&self, draw_id: Uuid) -> Result<Vec<(Winner, String)>, StorageError>;

    /// Aggregate every historical winner into `msisdn -> set of won tiers`.
    /// Read before the draw transaction opens.
    async fn load_past_wins(&self) -> Result<PastWinsByTier, StorageError>;

    /// Insert a draw and all of its winners inside a single transaction.
    ///
    /// # Errors
    /// * `DuplicateDrawDate` - a concurrent non-rerun draw for the same date
    ///   committed first (partial unique index violation)
    async fn commit_draw(&self, draw: &Draw, winners: &[Winner]) -> Result<(), StorageError>;
}
