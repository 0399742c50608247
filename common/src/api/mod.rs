//! Request and response shapes of the HTTP surface.
//!
//! MSISDNs never leave the service unmasked through these types; handlers
//! apply [`crate::utils::mask_msisdn`] when building winner entries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Draw, DrawSource, EligibleEntry};

/// Body of `POST /draws/execute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteDrawRequest {
    pub draw_date: NaiveDate,
    pub prize_structure_id: Uuid,
    /// Inline entry list; a non-empty list switches the entry source to CSV.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msisdn_entries: Option<Vec<EligibleEntry>>,
}

/// Body of `POST /draws/rerun/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RerunDrawRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msisdn_entries: Option<Vec<EligibleEntry>>,
}

/// One winner as it appears in responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerEntry {
    pub prize_tier: String,
    pub position: i32,
    pub masked_msisdn: String,
    pub is_runner_up: bool,
}

/// Response of a successful execute or rerun.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawResponse {
    pub draw_id: Uuid,
    pub draw_date: NaiveDate,
    pub source: DrawSource,
    pub is_rerun: bool,
    pub total_entries: i64,
    pub winners: Vec<WinnerEntry>,
}

/// Response of `GET /draws`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDrawsResponse {
    pub draws: Vec<Draw>,
}

/// Response of `GET /draws/{id}/winners`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListWinnersResponse {
    pub draw_id: Uuid,
    pub winners: Vec<WinnerEntry>,
}
