//! REST handlers. The handlers stay thin: extract, call the service, mask.
//!
//! Authentication and role gating live in front of this service; the
//! already-verified admin identity arrives in the `X-Admin-Id` header.

use actix_web::{
    web::{Data, Json, Path},
    HttpRequest, HttpResponse,
};
use promodraw_common::{
    api::{
        DrawResponse, ExecuteDrawRequest, ListDrawsResponse, ListWinnersResponse,
        RerunDrawRequest, WinnerEntry,
    },
    utils::mask_msisdn,
};
use uuid::Uuid;

use crate::core::{error::DrawError, storage::Storage, DrawOutcome, DrawService};

fn admin_id(request: &HttpRequest) -> Uuid {
    request
        .headers()
        .get("X-Admin-Id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())
        .unwrap_or_else(Uuid::nil)
}

fn draw_response(outcome: DrawOutcome) -> DrawResponse {
    DrawResponse {
        draw_id: outcome.draw.id,
        draw_date: outcome.draw.draw_date,
        source: outcome.draw.source,
        is_rerun: outcome.draw.is_rerun,
        total_entries: outcome.draw.total_entries,
        winners: outcome
            .winners
            .into_iter()
            .map(|winner| WinnerEntry {
                prize_tier: winner.tier_name,
                position: winner.position,
                masked_msisdn: mask_msisdn(&winner.msisdn),
                is_runner_up: winner.is_runner_up,
            })
            .collect(),
    }
}

/// `POST /draws/execute`
pub async fn execute_draw<S: Storage>(
    service: Data<DrawService<S>>,
    request: HttpRequest,
    body: Json<ExecuteDrawRequest>,
) -> Result<HttpResponse, DrawError> {
    let body = body.into_inner();
    let outcome = service
        .execute_draw(
            body.draw_date,
            body.prize_structure_id,
            body.msisdn_entries,
            admin_id(&request),
        )
        .await?;
    Ok(HttpResponse::Ok().json(draw_response(outcome)))
}

/// `POST /draws/rerun/{id}`
pub async fn rerun_draw<S: Storage>(
    service: Data<DrawService<S>>,
    request: HttpRequest,
    path: Path<Uuid>,
    body: Json<RerunDrawRequest>,
) -> Result<HttpResponse, DrawError> {
    let original_draw_id = path.into_inner();
    let outcome = service
        .rerun_draw(
            original_draw_id,
            body.into_inner().msisdn_entries,
            admin_id(&request),
        )
        .await?;
    Ok(HttpResponse::Ok().json(draw_response(outcome)))
}

/// `GET /draws`
pub async fn list_draws<S: Storage>(
    service: Data<DrawService<S>>,
) -> Result<HttpResponse, DrawError> {
    let draws = service.list_draws().await?;
    Ok(HttpResponse::Ok().json(ListDrawsResponse { draws }))
}

/// `GET /draws/{id}/winners`
pub async fn list_winners<S: Storage>(
    service: Data<DrawService<S>>,
    path: Path<Uuid>,
) -> Result<HttpResponse, DrawError> {
    let draw_id = path.into_inner();
    let winners = service.list_winners(draw_id).await?;
    Ok(HttpResponse::Ok().json(ListWinnersResponse {
        draw_id,
        winners: winners
            .into_iter()
            .map(|(winner, tier_name)| WinnerEntry {
                prize_tier: tier_name,
                position: winner.position,
                masked_msisdn: mask_msisdn(&winner.msisdn),
                is_runner_up: winner.is_runner_up,
            })
            .collect(),
    }))
}

/// `GET /prize-structures`
pub async fn list_prize_structures<S: Storage>(
    service: Data<DrawService<S>>,
) -> Result<HttpResponse, DrawError> {
    let structures = service.list_prize_structures().await?;
    Ok(HttpResponse::Ok().json(structures))
}

/// `GET /prize-structures/{id}`
pub async fn get_prize_structure<S: Storage>(
    service: Data<DrawService<S>>,
    path: Path<Uuid>,
) -> Result<HttpResponse, DrawError> {
    let structure = service.get_prize_structure(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(structure))
}
