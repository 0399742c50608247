pub mod draw;
pub mod entries;
pub mod error;
pub mod sampler;
pub mod storage;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use chrono::{Datelike, FixedOffset, NaiveDate, Utc, Weekday};
use log::{info, warn};
use promodraw_common::{
    crypto::RandomSource,
    models::{Draw, EligibleEntry, PrizeStructure, Winner},
    window::eligibility_window,
};
use uuid::Uuid;

use self::{
    draw::{draw_winners, WinnerResult},
    entries::{resolve_entries, EntryProvider},
    error::DrawError,
    storage::Storage,
};

/// The result of a committed draw: the persisted row plus the selections in
/// selection order (tier order index, mains before runner-ups, position).
#[derive(Debug, Clone)]
pub struct DrawOutcome {
    pub draw: Draw,
    pub winners: Vec<WinnerResult>,
}

/// The draw controller: validates inputs, composes the entry source, the
/// engine and the storage layer, and owns the execute/rerun protocol.
pub struct DrawService<S: Storage> {
    storage: S,
    rng: Arc<dyn RandomSource>,
    analytics: Arc<dyn EntryProvider>,
    zone: FixedOffset,
}

impl<S: Storage> DrawService<S> {
    pub fn new(
        storage: S,
        rng: Arc<dyn RandomSource>,
        analytics: Arc<dyn EntryProvider>,
        zone: FixedOffset,
    ) -> Self {
        Self {
            storage,
            rng,
            analytics,
            zone,
        }
    }

    /// Execute the draw for a calendar date. Fails with `AlreadyExecuted`
    /// when a non-rerun draw for that date has committed before.
    pub async fn execute_draw(
        &self,
        draw_date: NaiveDate,
        prize_structure_id: Uuid,
        inline_entries: Option<Vec<EligibleEntry>>,
        admin_user_id: Uuid,
    ) -> Result<DrawOutcome, DrawError> {
        if let Some(existing) = self.storage.find_draw_by_date(draw_date).await? {
            return Err(DrawError::AlreadyExecuted {
                draw_id: existing.id,
            });
        }

        let structure = self.load_structure(prize_structure_id).await?;
        check_eligible_day(&structure, draw_date)?;

        self.run_draw(draw_date, structure, inline_entries, admin_user_id, false)
            .await
    }

    /// Re-execute a prior draw: a brand new draw row is committed with
    /// `is_rerun` set, for the original date and structure. The original
    /// draw is left untouched and the one-per-date guard does not apply.
    pub async fn rerun_draw(
        &self,
        original_draw_id: Uuid,
        inline_entries: Option<Vec<EligibleEntry>>,
        admin_user_id: Uuid,
    ) -> Result<DrawOutcome, DrawError> {
        let original = self
            .storage
            .get_draw(original_draw_id)
            .await?
            .ok_or(DrawError::DrawNotFound(original_draw_id))?;

        let structure = self.load_structure(original.prize_structure_id).await?;
        info!(
            "rerunning draw {} of {}",
            original_draw_id, original.draw_date
        );

        self.run_draw(
            original.draw_date,
            structure,
            inline_entries,
            admin_user_id,
            true,
        )
        .await
    }

    pub async fn list_draws(&self) -> Result<Vec<Draw>, DrawError> {
        Ok(self.storage.list_draws().await?)
    }

    /// Winners of one committed draw with their tier names, in the stored
    /// audit order.
    pub async fn list_winners(&self, draw_id: Uuid) -> Result<Vec<(Winner, String)>, DrawError> {
        self.storage
            .get_draw(draw_id)
            .await?
            .ok_or(DrawError::DrawNotFound(draw_id))?;
        Ok(self.storage.get_winners(draw_id).await?)
    }

    pub async fn get_prize_structure(&self, id: Uuid) -> Result<PrizeStructure, DrawError> {
        self.load_structure(id).await
    }

    pub async fn list_prize_structures(&self) -> Result<Vec<PrizeStructure>, DrawError> {
        Ok(self.storage.list_prize_structures().await?)
    }

    async fn load_structure(&self, id: Uuid) -> Result<PrizeStructure, DrawError> {
        self.storage
            .get_prize_structure(id)
            .await?
            .ok_or(DrawError::PrizeStructureNotFound(id))
    }

    async fn run_draw(
        &self,
        draw_date: NaiveDate,
        structure: PrizeStructure,
        inline_entries: Option<Vec<EligibleEntry>>,
        admin_user_id: Uuid,
        is_rerun: bool,
    ) -> Result<DrawOutcome, DrawError> {
        validate_inline_entries(inline_entries.as_deref())?;

        let window = eligibility_window(draw_date, self.zone);
        let (entries, source) =
            resolve_entries(inline_entries, self.analytics.as_ref(), &window).await?;

        let total_entries: u64 = entries.iter().map(|e| u64::from(e.points)).sum();
        if total_entries == 0 {
            return Err(DrawError::EmptyPool);
        }

        // All historical winners are read before the transaction opens
        let past_wins = self.storage.load_past_wins().await?;

        let results = draw_winners(
            self.rng.as_ref(),
            &entries,
            &structure.tiers,
            &past_wins,
        )?;

        let now = Utc::now();
        let draw = Draw {
            id: Uuid::new_v4(),
            draw_date,
            prize_structure_id: structure.id,
            total_entries: i64::try_from(total_entries)
                .map_err(|_| DrawError::InvalidInput("entry points overflow".to_string()))?,
            admin_user_id,
            source,
            is_rerun,
            created_at: now,
        };
        let winners: Vec<Winner> = results
            .iter()
            .map(|result| Winner {
                id: Uuid::new_v4(),
                draw_id: draw.id,
                prize_tier_id: result.prize_tier_id,
                msisdn: result.msisdn.clone(),
                position: result.position,
                is_runner_up: result.is_runner_up,
                created_at: now,
            })
            .collect();

        match self.storage.commit_draw(&draw, &winners).await {
            Ok(()) => {}
            Err(storage::StorageError::DuplicateDrawDate(date)) => {
                // lost the race against a concurrent execution for this date
                warn!("concurrent draw for {} committed first", date);
                let existing = self.storage.find_draw_by_date(date).await?;
                return match existing {
                    Some(existing) => Err(DrawError::AlreadyExecuted {
                        draw_id: existing.id,
                    }),
                    None => Err(storage::StorageError::DuplicateDrawDate(date).into()),
                };
            }
            Err(err) => return Err(err.into()),
        }

        info!(
            "draw {} committed: {} winners across {} tiers, {} total tickets",
            draw.id,
            winners.len(),
            structure.tiers.len(),
            draw.total_entries
        );

        Ok(DrawOutcome {
            draw,
            winners: results,
        })
    }
}

fn validate_inline_entries(entries: Option<&[EligibleEntry]>) -> Result<(), DrawError> {
    let Some(entries) = entries else {
        return Ok(());
    };
    for entry in entries {
        if entry.msisdn.trim().is_empty() {
            return Err(DrawError::InvalidInput(
                "entry msisdn must not be empty".to_string(),
            ));
        }
        if entry.points == 0 {
            return Err(DrawError::InvalidInput(format!(
                "entry {} must hold at least 1 point",
                entry.msisdn
            )));
        }
    }
    Ok(())
}

/// A structure with a non-empty eligible-day set only draws on those days.
/// Day names parse leniently ("Monday", "monday" and "Mon" all match).
fn check_eligible_day(structure: &PrizeStructure, draw_date: NaiveDate) -> Result<(), DrawError> {
    if structure.eligible_days.is_empty() {
        return Ok(());
    }
    let weekday = draw_date.weekday();
    let allowed = structure
        .eligible_days
        .iter()
        .any(|day| day.parse::<Weekday>().is_ok_and(|parsed| parsed == weekday));
    if allowed {
        return Ok(());
    }
    Err(DrawError::InvalidInput(format!(
        "structure '{}' does not draw on {}",
        structure.name, weekday
    )))
}
