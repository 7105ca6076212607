use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_requests: u64,
    pub approved_count: u64,
    pub rejected_count: u64,
    pub scheduled_count: u64,
}

impl DailySummary {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_requests: 0,
            approved_count: 0,
            rejected_count: 0,
            scheduled_count: 0,
        }
    }
}
