use std::collections::BTreeMap;

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Utc};

use crate::access::{Caller, Operation};
use crate::engine::gate;
use crate::error::AppError;
use crate::models::analytics::DailySummary;
use crate::models::request::{RequestStatus, ServiceRequest};
use crate::state::AppState;

pub const DEFAULT_WINDOW_DAYS: u32 = 7;
pub const MAX_WINDOW_DAYS: u32 = 366;

pub fn daily_summary(
    state: &AppState,
    caller: &Caller,
    window_days: u32,
) -> Result<Vec<DailySummary>, AppError> {
    gate(state, caller, Operation::ViewAnalytics)?;

    if !(1..=MAX_WINDOW_DAYS).contains(&window_days) {
        return Err(AppError::field("days", "range"));
    }

    let snapshot = state.requests.snapshot();
    Ok(summarize(
        snapshot.iter().map(|record| record.request()),
        Utc::now(),
        state.settings.reference_offset,
        window_days,
    ))
}

/// Buckets requests by creation date in `offset`, over the `window_days`
/// calendar days ending on `now`'s date. Days without requests are omitted;
/// the result is ordered oldest first.
pub fn summarize<'a, I>(
    requests: I,
    now: DateTime<Utc>,
    offset: FixedOffset,
    window_days: u32,
) -> Vec<DailySummary>
where
    I: IntoIterator<Item = &'a ServiceRequest>,
{
    let today = now.with_timezone(&offset).date_naive();
    let first_day = today
        .checked_sub_days(Days::new(u64::from(window_days.saturating_sub(1))))
        .unwrap_or(NaiveDate::MIN);

    let mut buckets: BTreeMap<NaiveDate, DailySummary> = BTreeMap::new();
    for request in requests {
        let day = request.created_at.with_timezone(&offset).date_naive();
        if day < first_day || day > today {
            continue;
        }

        let bucket = buckets
            .entry(day)
            .or_insert_with(|| DailySummary::empty(day));
        bucket.total_requests += 1;
        match request.status() {
            RequestStatus::Approved => bucket.approved_count += 1,
            RequestStatus::Rejected => bucket.rejected_count += 1,
            RequestStatus::Scheduled => bucket.scheduled_count += 1,
            RequestStatus::Pending => {}
        }
    }

    buckets.into_values().collect()
}
