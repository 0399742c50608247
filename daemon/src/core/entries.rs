//! Entry source adapter.
//!
//! A draw takes its entries either from an inline list carried by the
//! request (CSV mode) or from the analytics provider queried over the
//! eligibility window (PostHog mode). A non-empty inline list wins;
//! otherwise the provider is asked.

use async_trait::async_trait;
use log::{debug, info};
use promodraw_common::{
    models::{DrawSource, EligibleEntry},
    window::EligibilityWindow,
};

use crate::posthog::EntrySourceError;

/// Supplier of eligible entries for a draw window.
#[async_trait]
pub trait EntryProvider: Send + Sync {
    /// Fetch all `(msisdn, points)` records with activity inside the window.
    /// Returns an empty list when no activity occurred.
    async fn fetch_eligible_entries(
        &self,
        window: &EligibilityWindow,
    ) -> Result<Vec<EligibleEntry>, EntrySourceError>;
}

/// Resolve the entries for one draw and tag where they came from.
pub async fn resolve_entries(
    inline: Option<Vec<EligibleEntry>>,
    provider: &dyn EntryProvider,
    window: &EligibilityWindow,
) -> Result<(Vec<EligibleEntry>, DrawSource), EntrySourceError> {
    if let Some(entries) = inline {
        if !entries.is_empty() {
            debug!("using {} inline entries", entries.len());
            return Ok((entries, DrawSource::Csv));
        }
    }

    let entries = provider.fetch_eligible_entries(window).await?;
    info!(
        "analytics returned {} entries for window {} .. {}",
        entries.len(),
        window.start,
        window.end
    );
    Ok((entries, DrawSource::PostHog))
}
