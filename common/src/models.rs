use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One participant's accumulated weight for a draw window.
///
/// The source may emit several records for the same MSISDN; they are
/// coalesced by summation before sampling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibleEntry {
    pub msisdn: String,
    pub points: u32,
}

/// How the eligible entries of a draw were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawSource {
    #[serde(rename = "PostHog")]
    PostHog,
    #[serde(rename = "CSV")]
    Csv,
}

impl DrawSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrawSource::PostHog => "PostHog",
            DrawSource::Csv => "CSV",
        }
    }
}

impl fmt::Display for DrawSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrawSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PostHog" => Ok(DrawSource::PostHog),
            "CSV" => Ok(DrawSource::Csv),
            other => Err(format!("unknown draw source '{}'", other)),
        }
    }
}

/// One prize category within a structure.
///
/// `quantity` is the number of main winners; `runner_up_count` is the number
/// of runner-ups drawn per main winner. Tiers are consumed in ascending
/// `order_index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeTier {
    pub id: Uuid,
    pub prize_structure_id: Uuid,
    pub tier_name: String,
    pub amount: i64,
    pub quantity: i32,
    pub runner_up_count: i32,
    pub order_index: i32,
}

/// A named set of prize tiers, immutable once referenced by any draw.
///
/// `eligible_days` holds weekday names; an empty set means the structure may
/// be drawn on any day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeStructure {
    pub id: Uuid,
    pub name: String,
    pub effective_date: NaiveDate,
    pub eligible_days: Vec<String>,
    pub tiers: Vec<PrizeTier>,
    pub created_at: DateTime<Utc>,
}

/// One execution of a draw. At most one non-rerun draw exists per
/// `draw_date`; reruns coexist with the original for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draw {
    pub id: Uuid,
    pub draw_date: NaiveDate,
    pub prize_structure_id: Uuid,
    /// Sum of points across the eligible entries actually used.
    pub total_entries: i64,
    pub admin_user_id: Uuid,
    pub source: DrawSource,
    pub is_rerun: bool,
    pub created_at: DateTime<Utc>,
}

/// A persisted winning selection (main winner or runner-up).
///
/// Positions are assigned in selection order within a tier and restart at 1
/// for runner-ups. The full MSISDN is stored for audit; everything leaving
/// the service is masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    pub id: Uuid,
    pub draw_id: Uuid,
    pub prize_tier_id: Uuid,
    pub msisdn: String,
    pub position: i32,
    pub is_runner_up: bool,
    pub created_at: DateTime<Utc>,
}
