//! Dashboard aggregation and renewal rules.

use chrono::{Days, NaiveDate};

use crate::models::{DashboardStats, Lead};
use crate::pipeline::PipelineStage;

pub const DEFAULT_RENEWAL_WINDOW_DAYS: u64 = 365;

/// Largest accepted renewal window (about a century).
pub const MAX_RENEWAL_WINDOW_DAYS: u64 = 36_500;

/// Number of recent leads listed on the dashboard.
pub const RECENT_LEADS_LIMIT: usize = 5;

/// Last expiration date that still counts as "renewal soon".
pub fn renewal_deadline(today: NaiveDate, window_days: u64) -> NaiveDate {
    today
        .checked_add_days(Days::new(window_days))
        .unwrap_or(NaiveDate::MAX)
}

/// An issued certificate expiring on or before the deadline.
///
/// Already expired certificates are included; leads without an expiration
/// date never are.
pub fn is_renewal_due(lead: &Lead, today: NaiveDate, window_days: u64) -> bool {
    lead.status == PipelineStage::Issued
        && lead
            .expiration_date
            .is_some_and(|date| date <= renewal_deadline(today, window_days))
}

/// Funnel counters for the dashboard header.
pub fn compute_stats(leads: &[Lead], today: NaiveDate, window_days: u64) -> DashboardStats {
    let count = |stage: PipelineStage| leads.iter().filter(|l| l.status == stage).count();

    DashboardStats {
        total_leads: leads.len(),
        pending_docs: count(PipelineStage::WaitingDocs),
        scheduled: count(PipelineStage::Scheduled),
        issued: count(PipelineStage::Issued),
        renewals_soon: leads
            .iter()
            .filter(|l| is_renewal_due(l, today, window_days))
            .count(),
    }
}
