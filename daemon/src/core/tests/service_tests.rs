// Draw controller tests over the in-memory mock storage.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, Utc};
use promodraw_common::{
    crypto::Csprng,
    models::{DrawSource, EligibleEntry, PrizeStructure, PrizeTier, Winner},
    window::EligibilityWindow,
};
use uuid::Uuid;

use super::mock_storage::MockStorage;
use crate::{
    core::{entries::EntryProvider, error::DrawError, DrawService},
    posthog::EntrySourceError,
};

struct CannedProvider(Vec<EligibleEntry>);

#[async_trait]
impl EntryProvider for CannedProvider {
    async fn fetch_eligible_entries(
        &self,
        _window: &EligibilityWindow,
    ) -> Result<Vec<EligibleEntry>, EntrySourceError> {
        Ok(self.0.clone())
    }
}

struct FailingProvider;

#[async_trait]
impl EntryProvider for FailingProvider {
    async fn fetch_eligible_entries(
        &self,
        _window: &EligibilityWindow,
    ) -> Result<Vec<EligibleEntry>, EntrySourceError> {
        Err(EntrySourceError::UnexpectedPayload(
            "analytics is down".to_string(),
        ))
    }
}

fn entry(msisdn: &str, points: u32) -> EligibleEntry {
    EligibleEntry {
        msisdn: msisdn.to_string(),
        points,
    }
}

fn structure(eligible_days: &[&str], tiers: Vec<(i32, i32)>) -> PrizeStructure {
    let id = Uuid::new_v4();
    PrizeStructure {
        id,
        name: "Daily Draw".to_string(),
        effective_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        eligible_days: eligible_days.iter().map(|d| d.to_string()).collect(),
        tiers: tiers
            .into_iter()
            .enumerate()
            .map(|(i, (quantity, runner_up_count))| PrizeTier {
                id: Uuid::new_v4(),
                prize_structure_id: id,
                tier_name: format!("Tier {}", i + 1),
                amount: 50_000,
                quantity,
                runner_up_count,
                order_index: (i + 1) as i32,
            })
            .collect(),
        created_at: Utc::now(),
    }
}

fn service_with(
    storage: MockStorage,
    provider: impl EntryProvider + 'static,
) -> DrawService<MockStorage> {
    DrawService::new(
        storage,
        Arc::new(Csprng::from_entropy().unwrap()),
        Arc::new(provider),
        FixedOffset::east_opt(3600).unwrap(),
    )
}

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

#[tokio::test]
async fn test_inline_entries_tag_the_draw_as_csv() {
    let storage = MockStorage::new();
    let ps = structure(&[], vec![(1, 0)]);
    let ps_id = ps.id;
    storage.insert_structure(ps);
    let service = service_with(storage.clone(), CannedProvider(vec![]));

    let outcome = service
        .execute_draw(
            monday(),
            ps_id,
            Some(vec![entry("08012345678", 3), entry("08087654321", 2)]),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.draw.source, DrawSource::Csv);
    // total entries is the sum of points, not the record count
    assert_eq!(outcome.draw.total_entries, 5);
    assert_eq!(outcome.winners.len(), 1);
}

#[tokio::test]
async fn test_analytics_entries_tag_the_draw_as_posthog() {
    let storage = MockStorage::new();
    let ps = structure(&[], vec![(1, 0)]);
    let ps_id = ps.id;
    storage.insert_structure(ps);
    let service = service_with(
        storage.clone(),
        CannedProvider(vec![entry("08011111111", 4)]),
    );

    let outcome = service
        .execute_draw(monday(), ps_id, None, Uuid::new_v4())
        .await
        .unwrap();

    assert_eq!(outcome.draw.source, DrawSource::PostHog);
    assert_eq!(outcome.draw.total_entries, 4);
}

#[tokio::test]
async fn test_second_draw_for_same_date_conflicts() {
    let storage = MockStorage::new();
    let ps = structure(&[], vec![(1, 0)]);
    let ps_id = ps.id;
    storage.insert_structure(ps);
    let service = service_with(storage.clone(), CannedProvider(vec![]));

    let first = service
        .execute_draw(monday(), ps_id, Some(vec![entry("A", 1)]), Uuid::new_v4())
        .await
        .unwrap();

    let err = service
        .execute_draw(monday(), ps_id, Some(vec![entry("A", 1)]), Uuid::new_v4())
        .await
        .unwrap_err();

    match err {
        DrawError::AlreadyExecuted { draw_id } => assert_eq!(draw_id, first.draw.id),
        other => panic!("expected AlreadyExecuted, got {:?}", other),
    }
    assert_eq!(storage.draws().len(), 1);
}

#[tokio::test]
async fn test_rerun_coexists_with_the_original() {
    let storage = MockStorage::new();
    let ps = structure(&[], vec![(1, 0)]);
    let ps_id = ps.id;
    storage.insert_structure(ps);
    let service = service_with(storage.clone(), CannedProvider(vec![]));

    let original = service
        .execute_draw(monday(), ps_id, Some(vec![entry("A", 1)]), Uuid::new_v4())
        .await
        .unwrap();

    let rerun = service
        .rerun_draw(
            original.draw.id,
            Some(vec![entry("B", 1)]),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    assert!(rerun.draw.is_rerun);
    assert_eq!(rerun.draw.draw_date, original.draw.draw_date);
    assert_eq!(rerun.draw.prize_structure_id, ps_id);
    assert_ne!(rerun.draw.id, original.draw.id);

    // both rows persisted, the original untouched
    let draws = storage.draws();
    assert_eq!(draws.len(), 2);
    let stored_original = draws.iter().find(|d| d.id == original.draw.id).unwrap();
    assert_eq!(stored_original, &original.draw);
}

#[tokio::test]
async fn test_rerun_of_unknown_draw_fails() {
    let storage = MockStorage::new();
    let service = service_with(storage, CannedProvider(vec![]));

    let missing = Uuid::new_v4();
    let err = service
        .rerun_draw(missing, None, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, DrawError::DrawNotFound(id) if id == missing));
}

#[tokio::test]
async fn test_unknown_structure_fails() {
    let storage = MockStorage::new();
    let service = service_with(storage, CannedProvider(vec![]));

    let missing = Uuid::new_v4();
    let err = service
        .execute_draw(monday(), missing, Some(vec![entry("A", 1)]), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, DrawError::PrizeStructureNotFound(id) if id == missing));
}

#[tokio::test]
async fn test_no_entries_is_an_empty_pool() {
    let storage = MockStorage::new();
    let ps = structure(&[], vec![(1, 0)]);
    let ps_id = ps.id;
    storage.insert_structure(ps);
    let service = service_with(storage.clone(), CannedProvider(vec![]));

    let err = service
        .execute_draw(monday(), ps_id, None, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, DrawError::EmptyPool));
    // nothing was persisted
    assert!(storage.draws().is_empty());
}

#[tokio::test]
async fn test_zero_point_inline_entry_is_invalid() {
    let storage = MockStorage::new();
    let ps = structure(&[], vec![(1, 0)]);
    let ps_id = ps.id;
    storage.insert_structure(ps);
    let service = service_with(storage, CannedProvider(vec![]));

    let err = service
        .execute_draw(monday(), ps_id, Some(vec![entry("A", 0)]), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, DrawError::InvalidInput(_)));
}

#[tokio::test]
async fn test_analytics_failure_surfaces() {
    let storage = MockStorage::new();
    let ps = structure(&[], vec![(1, 0)]);
    let ps_id = ps.id;
    storage.insert_structure(ps);
    let service = service_with(storage.clone(), FailingProvider);

    let err = service
        .execute_draw(monday(), ps_id, None, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, DrawError::EntrySource(_)));
    assert!(storage.draws().is_empty());
}

#[tokio::test]
async fn test_eligible_day_gate_rejects_other_weekdays() {
    let storage = MockStorage::new();
    let ps = structure(&["Saturday"], vec![(1, 0)]);
    let ps_id = ps.id;
    storage.insert_structure(ps);
    let service = service_with(storage, CannedProvider(vec![]));

    // 2025-06-02 is a Monday
    let err = service
        .execute_draw(monday(), ps_id, Some(vec![entry("A", 1)]), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, DrawError::InvalidInput(_)));
}

#[tokio::test]
async fn test_eligible_day_gate_accepts_listed_weekday() {
    let storage = MockStorage::new();
    let ps = structure(&["Monday", "Saturday"], vec![(1, 0)]);
    let ps_id = ps.id;
    storage.insert_structure(ps);
    let service = service_with(storage, CannedProvider(vec![]));

    let outcome = service
        .execute_draw(monday(), ps_id, Some(vec![entry("A", 1)]), Uuid::new_v4())
        .await
        .unwrap();
    assert_eq!(outcome.winners.len(), 1);
}

#[tokio::test]
async fn test_past_winner_of_tier_never_wins_it_again() {
    let storage = MockStorage::new();
    let ps = structure(&[], vec![(1, 0)]);
    let ps_id = ps.id;
    let tier_id = ps.tiers[0].id;
    storage.insert_structure(ps);

    // a previous draw recorded A as a winner of this tier
    storage.insert_winner(Winner {
        id: Uuid::new_v4(),
        draw_id: Uuid::new_v4(),
        prize_tier_id: tier_id,
        msisdn: "A".to_string(),
        position: 1,
        is_runner_up: false,
        created_at: Utc::now(),
    });

    let service = service_with(storage.clone(), CannedProvider(vec![]));
    let outcome = service
        .execute_draw(
            monday(),
            ps_id,
            Some(vec![entry("A", 1), entry("B", 1)]),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.winners.len(), 1);
    assert_eq!(outcome.winners[0].msisdn, "B");
}

#[tokio::test]
async fn test_committed_winner_rows_match_results() {
    let storage = MockStorage::new();
    let ps = structure(&[], vec![(2, 1), (3, 0)]);
    let ps_id = ps.id;
    storage.insert_structure(ps);
    let service = service_with(storage.clone(), CannedProvider(vec![]));

    let entries: Vec<EligibleEntry> = (0..12)
        .map(|i| entry(&format!("080111111{:02}", i), 1))
        .collect();
    let outcome = service
        .execute_draw(monday(), ps_id, Some(entries), Uuid::new_v4())
        .await
        .unwrap();

    let rows = storage.winners();
    assert_eq!(rows.len(), outcome.winners.len());
    // 2 mains + 2 runner-ups in tier 1, 3 mains in tier 2
    assert_eq!(rows.len(), 7);
    assert!(rows.iter().all(|w| w.draw_id == outcome.draw.id));

    // stored rows mirror the selection order exactly
    for (row, result) in rows.iter().zip(outcome.winners.iter()) {
        assert_eq!(row.msisdn, result.msisdn);
        assert_eq!(row.position, result.position);
        assert_eq!(row.is_runner_up, result.is_runner_up);
        assert_eq!(row.prize_tier_id, result.prize_tier_id);
    }
}

#[tokio::test]
async fn test_list_draws_orders_by_date_descending() {
    let storage = MockStorage::new();
    let ps = structure(&[], vec![(1, 0)]);
    let ps_id = ps.id;
    storage.insert_structure(ps);
    let service = service_with(storage, CannedProvider(vec![]));

    let admin = Uuid::new_v4();
    service
        .execute_draw(monday(), ps_id, Some(vec![entry("A", 1)]), admin)
        .await
        .unwrap();
    service
        .execute_draw(
            NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
            ps_id,
            Some(vec![entry("B", 1)]),
            admin,
        )
        .await
        .unwrap();

    let draws = service.list_draws().await.unwrap();
    assert_eq!(draws.len(), 2);
    assert!(draws[0].draw_date > draws[1].draw_date);
}

#[tokio::test]
async fn test_list_winners_requires_existing_draw() {
    let storage = MockStorage::new();
    let service = service_with(storage, CannedProvider(vec![]));

    let missing = Uuid::new_v4();
    let err = service.list_winners(missing).await.unwrap_err();
    assert!(matches!(err, DrawError::DrawNotFound(id) if id == missing));
}
