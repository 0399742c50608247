use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use promodraw_common::crypto::RngError;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::{sampler::SamplerError, storage::StorageError};
use crate::posthog::EntrySourceError;

/// Failures of the draw operations, with their HTTP disposition.
///
/// Candidate exhaustion inside a tier is recovered by the engine (the tier
/// is truncated and the draw commits) and deliberately has no variant here.
#[derive(Debug, Error)]
pub enum DrawError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("a draw has already been executed for this date")]
    AlreadyExecuted { draw_id: Uuid },

    #[error("prize structure {0} was not found")]
    PrizeStructureNotFound(Uuid),

    #[error("draw {0} was not found")]
    DrawNotFound(Uuid),

    #[error("no eligible entries with points for this draw")]
    EmptyPool,

    #[error("entry source failure: {0}")]
    EntrySource(#[from] EntrySourceError),

    #[error("random generator failure: {0}")]
    Rng(#[from] RngError),

    #[error("sampler invariant violation: {0}")]
    Sampler(#[from] SamplerError),

    #[error("persistence failure: {0}")]
    Storage(#[from] StorageError),
}

impl ResponseError for DrawError {
    fn status_code(&self) -> StatusCode {
        match self {
            DrawError::InvalidInput(_)
            | DrawError::PrizeStructureNotFound(_)
            | DrawError::DrawNotFound(_)
            | DrawError::EmptyPool => StatusCode::BAD_REQUEST,
            DrawError::AlreadyExecuted { .. } => StatusCode::CONFLICT,
            DrawError::EntrySource(_)
            | DrawError::Rng(_)
            | DrawError::Sampler(_)
            | DrawError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Build the JSON body manually instead of using json!() to avoid unwrap
        let mut body = serde_json::Map::new();
        body.insert("error".to_string(), Value::String(format!("{:#}", self)));
        if let DrawError::AlreadyExecuted { draw_id } = self {
            body.insert("rerun_eligible".to_string(), Value::Bool(true));
            body.insert("draw_id".to_string(), Value::String(draw_id.to_string()));
        }
        HttpResponse::build(self.status_code()).json(Value::Object(body))
    }
}
